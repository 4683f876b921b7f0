//! Web UI server.

use crate::agent::{AgentCache, AgentFactory, GeminiAgentBuilder};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::critique::CritiqueService;
use crate::ui::{self, AppState};
use std::sync::Arc;
use tracing::info;

/// Run the web UI server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or(settings.server.host.as_str()).to_string();
    let port = port.unwrap_or(settings.server.port);
    std::fs::create_dir_all(settings.temp_dir())?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let service = CritiqueService::new(&settings, prompts.clone());
    let factory = AgentFactory::new(
        Arc::new(GeminiAgentBuilder::new(settings.clone(), prompts)),
        AgentCache::with_capacity(settings.agent.cache_capacity),
    );

    let upload_limit = settings.server.max_upload_mb;
    let model = settings.gemini.model.clone();
    let app = ui::router(AppState::new(settings, service, factory));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("AI Media Critic");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    Output::kv("Model", &model);
    Output::kv("Upload limit", &format!("{} MB", upload_limit));
    println!();
    println!("Endpoints:");
    Output::kv("Web UI", "GET  /");
    Output::kv("Critique (form)", "POST /critique");
    Output::kv("Critique (JSON)", "POST /api/critique");
    Output::kv("Health", "GET  /health");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
