//! Critic - AI-powered media critique
//!
//! Upload an image or a video and receive creative feedback from a Gemini
//! model that can research references with a web search tool.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `session` - Credential and critique mode
//! - `media` - Upload validation and staging
//! - `gemini` - Gemini REST client (content generation and file service)
//! - `readiness` - Waiting for uploaded videos to finish processing
//! - `search` - DuckDuckGo web search
//! - `agent` - The critique agent and its per-credential factory
//! - `critique` - Request pipeline
//! - `ui` - axum web UI
//! - `cli` - Command line front end
//!
//! # Example
//!
//! ```rust,no_run
//! use critic::agent::{AgentCache, AgentFactory, GeminiAgentBuilder};
//! use critic::config::{Prompts, Settings};
//! use critic::critique::{CritiqueRequest, CritiqueService};
//! use critic::media::MediaUpload;
//! use critic::session::{Credential, CritiqueMode};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::default();
//!     let factory = AgentFactory::new(
//!         Arc::new(GeminiAgentBuilder::new(settings.clone(), prompts.clone())),
//!         AgentCache::new(),
//!     );
//!     let agent = factory.get_or_init(&Credential::new("AIza...")?)?;
//!
//!     let request = CritiqueRequest {
//!         mode: CritiqueMode::Image,
//!         upload: MediaUpload::from_path("artwork.png".as_ref()).await?,
//!         prompt: "Analyze the composition, lighting, and mood".to_string(),
//!     };
//!     let outcome = CritiqueService::new(&settings, prompts)
//!         .critique(&agent, &request, &CancellationToken::new())
//!         .await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod critique;
pub mod error;
pub mod gemini;
pub mod media;
pub mod readiness;
pub mod search;
pub mod session;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CriticError, Result};
