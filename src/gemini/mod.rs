//! Gemini REST API access.
//!
//! Only the parts the critic needs: `generateContent` for critiques and the
//! Files API for video uploads. Both sit behind traits so the agent and the
//! critique pipeline can be exercised without the network.

mod client;
mod files;
mod types;

pub use client::GeminiClient;
pub use files::{FileState, FileStatus, RemoteFile};
pub use types::{
    Blob, Candidate, Content, FileData, FunctionCall, FunctionDeclaration, FunctionResponse,
    GenerateContentRequest, GenerateContentResponse, Part, PromptFeedback, Tool,
};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Create an HTTP client with the given request timeout.
pub fn create_http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("critic/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// A model that turns a request into generated content.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// Remote storage for media the model reads by reference.
#[async_trait]
pub trait RemoteFiles: Send + Sync {
    /// Upload a local file. The returned file may still be processing.
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile>;

    /// Fetch the current status of a file by resource name.
    async fn get_file(&self, name: &str) -> Result<RemoteFile>;

    async fn delete_file(&self, name: &str) -> Result<()>;
}
