//! Critique pipeline.
//!
//! Coordinates one critique request: stage the upload, make it reachable by the
//! model (inline for images, uploaded and awaited for videos), run the agent and
//! clean up. Failures before the model is involved are returned as errors, as
//! is cancellation; everything after is folded into a [`CritiqueOutcome`].

use crate::agent::CritiqueAgent;
use crate::config::{Prompts, Settings};
use crate::error::{CriticError, Result};
use crate::gemini::Part;
use crate::media::{MediaUpload, StagedMedia};
use crate::readiness::{wait_until_ready, ReadinessPolicy};
use crate::session::CritiqueMode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// One user request.
#[derive(Debug, Clone)]
pub struct CritiqueRequest {
    pub mode: CritiqueMode,
    pub upload: MediaUpload,
    /// What the user wants feedback on.
    pub prompt: String,
}

/// Result of a critique attempt that reached the model.
#[derive(Debug, Clone, PartialEq)]
pub enum CritiqueOutcome {
    /// The model produced critique text.
    Success(String),
    /// The remote service or the agent failed.
    UpstreamError(String),
    /// The model answered without any text.
    EmptyResponse,
}

impl CritiqueOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CritiqueOutcome::Success(_))
    }

    /// Banner text for a failed outcome, `None` on success.
    pub fn failure_message(&self, mode: CritiqueMode) -> Option<String> {
        match self {
            CritiqueOutcome::Success(_) => None,
            CritiqueOutcome::EmptyResponse => Some(format!(
                "Failed to generate a critique. The AI might not have processed the {} correctly.",
                mode.noun()
            )),
            CritiqueOutcome::UpstreamError(detail) => Some(format!(
                "An error occurred during {} analysis: {}",
                mode.noun(),
                detail
            )),
        }
    }
}

/// Shown when no API key was provided.
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "An API key is required to initialize the AI agent. Please enter your API key above.";

/// Banner text for a request rejected before the model was called.
pub fn rejection_message(mode: CritiqueMode, error: &CriticError) -> String {
    match error {
        CriticError::MissingCredential => MISSING_CREDENTIAL_MESSAGE.to_string(),
        CriticError::EmptyPrompt => format!(
            "Please describe what you would like critiqued about the {}.",
            mode.noun()
        ),
        other => format!(
            "An error occurred while processing the {}: {}",
            mode.noun(),
            other
        ),
    }
}

/// Runs critique requests against an agent.
#[derive(Clone)]
pub struct CritiqueService {
    prompts: Prompts,
    policy: ReadinessPolicy,
    temp_dir: PathBuf,
    delete_remote_after: bool,
}

impl CritiqueService {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        Self {
            prompts,
            policy: ReadinessPolicy::from(&settings.readiness),
            temp_dir: settings.temp_dir(),
            delete_remote_after: settings.video.delete_remote_after,
        }
    }

    /// Override the readiness policy.
    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override where uploads are staged.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// The task text sent to the model for `mode`.
    pub fn task_prompt(&self, mode: CritiqueMode, user_prompt: &str) -> String {
        let template = match mode {
            CritiqueMode::Image => &self.prompts.critique.image,
            CritiqueMode::Video => &self.prompts.critique.video,
        };
        let vars = HashMap::from([("task".to_string(), user_prompt.trim().to_string())]);
        self.prompts.render_with_custom(template, &vars)
    }

    /// Run one critique.
    ///
    /// Returns `Err` when the request is rejected before any remote call
    /// (empty prompt, unsupported file, staging failure) or when `cancel` trips
    /// during the readiness wait. The staged file is removed on every path,
    /// including when this future is dropped.
    #[instrument(skip(self, agent, request, cancel), fields(mode = %request.mode, file = %request.upload.file_name))]
    pub async fn critique(
        &self,
        agent: &CritiqueAgent,
        request: &CritiqueRequest,
        cancel: &CancellationToken,
    ) -> Result<CritiqueOutcome> {
        if request.prompt.trim().is_empty() {
            return Err(CriticError::EmptyPrompt);
        }

        let staged = StagedMedia::stage(&request.upload, request.mode, &self.temp_dir)?;
        let task = self.task_prompt(request.mode, &request.prompt);

        let outcome = match request.mode {
            CritiqueMode::Image => self.critique_image(agent, &staged, &task).await,
            CritiqueMode::Video => self.critique_video(agent, &staged, &task, cancel).await,
        };

        staged.close();

        let outcome = outcome?;
        match &outcome {
            CritiqueOutcome::Success(text) => info!("Critique complete ({} chars)", text.len()),
            CritiqueOutcome::EmptyResponse => warn!("Model returned an empty critique"),
            CritiqueOutcome::UpstreamError(detail) => warn!("Critique failed: {}", detail),
        }
        Ok(outcome)
    }

    async fn critique_image(
        &self,
        agent: &CritiqueAgent,
        staged: &StagedMedia,
        task: &str,
    ) -> Result<CritiqueOutcome> {
        let bytes = staged.read().await?;
        let part = Part::inline(staged.mime_type(), STANDARD.encode(bytes));
        Ok(run_agent(agent, task, part).await)
    }

    async fn critique_video(
        &self,
        agent: &CritiqueAgent,
        staged: &StagedMedia,
        task: &str,
        cancel: &CancellationToken,
    ) -> Result<CritiqueOutcome> {
        let files = agent.files();

        let uploaded = match files
            .upload_file(staged.path(), staged.mime_type(), staged.display_name())
            .await
        {
            Ok(file) => file,
            Err(e) => return Ok(CritiqueOutcome::UpstreamError(e.to_string())),
        };
        let name = uploaded.name.clone();

        let outcome = match wait_until_ready(files, uploaded, &self.policy, cancel).await {
            Ok(ready) => {
                let mime = ready.mime_type.as_deref().unwrap_or(staged.mime_type());
                Ok(run_agent(agent, task, Part::file(mime, &ready.uri)).await)
            }
            Err(CriticError::Cancelled) => Err(CriticError::Cancelled),
            Err(e) => Ok(CritiqueOutcome::UpstreamError(e.to_string())),
        };

        if self.delete_remote_after {
            if let Err(e) = files.delete_file(&name).await {
                warn!("Failed to delete remote file {}: {}", name, e);
            }
        }

        outcome
    }
}

async fn run_agent(agent: &CritiqueAgent, task: &str, media: Part) -> CritiqueOutcome {
    match agent.run(task, vec![media]).await {
        Ok(response) => {
            debug!(
                "Agent finished after {} model call(s) and {} tool call(s)",
                response.iterations,
                response.tool_calls.len()
            );
            for call in &response.tool_calls {
                debug!("Tool call: {}", call);
            }
            match response.content {
                Some(text) => CritiqueOutcome::Success(text),
                None => CritiqueOutcome::EmptyResponse,
            }
        }
        Err(e) => CritiqueOutcome::UpstreamError(e.to_string()),
    }
}
