//! Configuration module for Critic.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{CritiquePrompts, Prompts};
pub use settings::{
    AgentSettings, GeminiSettings, GeneralSettings, PromptSettings, ReadinessSettings,
    SearchSettings, ServerSettings, Settings, VideoSettings,
};
