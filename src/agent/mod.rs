//! Critique agent: a Gemini model plus a web search tool.
//!
//! The agent receives the media and the user's request, may call
//! `web_search` to research references, and answers with critique text.
//! Agents are built through an [`AgentFactory`] that memoizes them per
//! credential in an injected [`AgentCache`].

mod factory;
mod runner;
mod tools;

pub use factory::{AgentBuilder, AgentCache, AgentFactory, GeminiAgentBuilder};
pub use runner::{AgentResponse, CritiqueAgent, ToolCallRecord};
pub use tools::{parse_tool_call, tool_definitions, ToolCall, ToolContext};
