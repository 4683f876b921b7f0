//! Web search used by the critique agent for research.

mod duckduckgo;

pub use duckduckgo::DuckDuckGo;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Trait for web search providers.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web and return at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}
