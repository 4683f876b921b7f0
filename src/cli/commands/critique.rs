//! Critique command implementation.

use crate::agent::{AgentCache, AgentFactory, CritiqueAgent, GeminiAgentBuilder};
use crate::cli::preflight;
use crate::cli::{format_size, Output};
use crate::config::{Prompts, Settings};
use crate::critique::{rejection_message, CritiqueOutcome, CritiqueRequest, CritiqueService};
use crate::error::CriticError;
use crate::media::MediaUpload;
use crate::session::CritiqueMode;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run the critique command.
pub async fn run_critique(
    file: &str,
    prompt: &str,
    mode: Option<&str>,
    api_key: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let path = Settings::expand_path(file);

    let credential = match preflight::credential(api_key) {
        Ok(credential) => credential,
        Err(e) => {
            Output::error("An API key is required to initialize the AI agent.");
            Output::info("Pass --api-key or set GOOGLE_API_KEY. Run 'critic doctor' for details.");
            return Err(e.into());
        }
    };

    let mode = match preflight::resolve_mode(&path, mode) {
        Ok(mode) => mode,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let service = CritiqueService::new(&settings, prompts.clone());
    let factory = AgentFactory::new(
        Arc::new(GeminiAgentBuilder::new(settings.clone(), prompts)),
        AgentCache::new(),
    );
    let agent = factory.get_or_init(&credential)?;

    let upload = MediaUpload::from_path(&path).await?;
    Output::header(mode.label());
    Output::kv("File", &format!("{} ({})", path.display(), format_size(upload.bytes.len())));
    Output::kv("Model", agent.model_name());
    Output::kv("Key", &credential.masked());
    println!();

    let request = CritiqueRequest {
        mode,
        upload,
        prompt: prompt.to_string(),
    };

    let spinner = Output::spinner(match mode {
        CritiqueMode::Image => "Analyzing image...",
        CritiqueMode::Video => "Analyzing video and researching...",
    });

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = critique_until(&service, &agent, &request, interrupt).await;
    spinner.finish_and_clear();

    match result {
        Ok(CritiqueOutcome::Success(text)) => {
            Output::header("Critique:");
            println!("\n{}\n", text);
            Ok(())
        }
        Ok(outcome) => {
            let message = outcome.failure_message(mode).unwrap_or_default();
            Output::error(&message);
            Err(anyhow::anyhow!(message))
        }
        Err(CriticError::Cancelled) => {
            Output::warning("Critique cancelled.");
            Err(CriticError::Cancelled.into())
        }
        Err(e) => {
            Output::error(&rejection_message(mode, &e));
            Err(e.into())
        }
    }
}

/// Run the critique until it finishes or `interrupt` resolves.
///
/// On interrupt the token is cancelled and the critique future dropped, which
/// removes the staged file.
async fn critique_until(
    service: &CritiqueService,
    agent: &CritiqueAgent,
    request: &CritiqueRequest,
    interrupt: impl Future<Output = ()>,
) -> crate::Result<CritiqueOutcome> {
    let cancel = CancellationToken::new();
    tokio::select! {
        result = service.critique(agent, request, &cancel) => result,
        _ = interrupt => {
            cancel.cancel();
            Err(CriticError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::FileState;
    use crate::readiness::ReadinessPolicy;
    use crate::testing::{text_response, ScriptedFiles, ScriptedModel};
    use std::time::Duration;

    #[tokio::test]
    async fn test_interrupt_stops_video_wait() {
        let dir = tempfile::tempdir().unwrap();
        let service = CritiqueService::new(&Settings::default(), Prompts::default())
            .with_temp_dir(dir.path().to_path_buf())
            .with_policy(ReadinessPolicy {
                interval: Duration::from_secs(60),
                max_attempts: 10,
                deadline: None,
            });
        let model = Arc::new(ScriptedModel::new(vec![Ok(text_response("unused"))]));
        let files = Arc::new(ScriptedFiles::new(FileState::Processing, &[]));
        let agent = CritiqueAgent::new("AI Media Critic", model.clone(), files.clone());
        let request = CritiqueRequest {
            mode: CritiqueMode::Video,
            upload: MediaUpload::new("clip.mp4", vec![0u8; 64]),
            prompt: "pacing".to_string(),
        };

        let result = critique_until(
            &service,
            &agent,
            &request,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

        assert!(matches!(result, Err(CriticError::Cancelled)));
        assert_eq!(files.uploads.lock().unwrap().len(), 1);
        assert_eq!(model.call_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_finished_critique_wins_over_idle_interrupt() {
        let dir = tempfile::tempdir().unwrap();
        let service = CritiqueService::new(&Settings::default(), Prompts::default())
            .with_temp_dir(dir.path().to_path_buf());
        let model = Arc::new(ScriptedModel::new(vec![Ok(text_response("Balanced."))]));
        let agent = CritiqueAgent::new(
            "AI Media Critic",
            model.clone(),
            Arc::new(crate::testing::NoFiles),
        );
        let request = CritiqueRequest {
            mode: CritiqueMode::Image,
            upload: MediaUpload::new("photo.png", b"png".to_vec()),
            prompt: "balance".to_string(),
        };

        let result = critique_until(&service, &agent, &request, std::future::pending()).await;

        assert_eq!(result.unwrap(), CritiqueOutcome::Success("Balanced.".to_string()));
        assert_eq!(model.call_count(), 1);
    }
}
