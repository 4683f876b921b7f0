//! Error types for Critic.

use thiserror::Error;

/// Library-level error type for Critic operations.
#[derive(Error, Debug)]
pub enum CriticError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("An API key is required to initialize the AI agent")]
    MissingCredential,

    #[error("A prompt describing the feedback you want is required")]
    EmptyPrompt,

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Gemini API error ({status}): {message}")]
    Gemini { status: u16, message: String },

    #[error("File upload failed: {0}")]
    Upload(String),

    #[error("Remote file was still processing after {attempts} status checks")]
    ReadinessTimeout { attempts: u32 },

    #[error("Remote file processing failed: {0}")]
    RemoteProcessingFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Critic operations.
pub type Result<T> = std::result::Result<T, CriticError>;
