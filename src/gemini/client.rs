//! HTTP client for the Generative Language API.

use super::{
    create_http_client_with_timeout, GenerateContentRequest, GenerateContentResponse,
    GenerativeModel, RemoteFile, RemoteFiles,
};
use crate::config::GeminiSettings;
use crate::error::{CriticError, Result};
use crate::session::Credential;
use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini client bound to one credential and one model.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    model: String,
    credential: Credential,
}

impl GeminiClient {
    /// Create a client from settings.
    pub fn new(credential: Credential, settings: &GeminiSettings) -> Result<Self> {
        let http = create_http_client_with_timeout(Duration::from_secs(settings.timeout_secs))?;
        Self::with_http_client(http, credential, &settings.base_url, &settings.model)
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http_client(
        http: reqwest::Client,
        credential: Credential,
        base_url: &str,
        model: &str,
    ) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            model: model.trim_start_matches("models/").to_string(),
            credential,
        })
    }

    fn model_url(&self, method: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("v1beta/models/{}:{}", self.model, method))?)
    }

    fn file_url(&self, name: &str) -> Result<Url> {
        let id = name.strip_prefix("files/").unwrap_or(name);
        Ok(self.base_url.join(&format!("v1beta/files/{}", id))?)
    }

    fn upload_url(&self) -> Result<Url> {
        Ok(self.base_url.join("upload/v1beta/files")?)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a non-success response into a `CriticError::Gemini`.
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(CriticError::Gemini {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, turns = request.contents.len()))]
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.model_url("generateContent")?;
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.credential.expose())
            .json(request)
            .send()
            .await?;

        let response = check_response(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteFiles for GeminiClient {
    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile> {
        let bytes = tokio::fs::read(path).await?;

        #[derive(Serialize)]
        struct Metadata<'a> {
            file: FileMetadata<'a>,
        }

        #[derive(Serialize)]
        struct FileMetadata<'a> {
            display_name: &'a str,
        }

        // Start a resumable upload session
        let start = self
            .http
            .post(self.upload_url()?)
            .header(API_KEY_HEADER, self.credential.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&Metadata {
                file: FileMetadata { display_name },
            })
            .send()
            .await?;
        let start = check_response(start).await?;

        let session_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                CriticError::Upload("response is missing the X-Goog-Upload-URL header".to_string())
            })?
            .to_string();

        debug!("Uploading {} bytes", bytes.len());

        #[derive(Deserialize)]
        struct UploadResponse {
            file: RemoteFile,
        }

        let finish = self
            .http
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let finish = check_response(finish).await?;

        let uploaded: UploadResponse = finish.json().await?;
        debug!("Uploaded as {} ({})", uploaded.file.name, uploaded.file.state);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .http
            .get(self.file_url(name)?)
            .header(API_KEY_HEADER, self.credential.expose())
            .send()
            .await?;

        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.file_url(name)?)
            .header(API_KEY_HEADER, self.credential.expose())
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }
}
