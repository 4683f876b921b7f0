//! Web UI: an HTML form for critique requests plus a JSON endpoint.
//!
//! The HTML form remembers the API key per browser through a session cookie;
//! the JSON endpoint expects the key on every request. Agents are looked up
//! through the shared [`AgentFactory`], and the critique itself runs on a
//! spawned task whose cancellation token is tripped if the client goes away.

mod page;
mod sessions;

pub use page::{escape_html, render_markdown, render_page, PageResult, PageView};
pub use sessions::{session_cookie, session_id, SessionStore, SESSION_COOKIE};

use crate::agent::AgentFactory;
use crate::config::Settings;
use crate::critique::{rejection_message, CritiqueOutcome, CritiqueRequest, CritiqueService};
use crate::error::CriticError;
use crate::media::{mime_for_extension, MediaUpload};
use crate::session::{Credential, CritiqueMode};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    service: Arc<CritiqueService>,
    factory: AgentFactory,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(settings: Settings, service: CritiqueService, factory: AgentFactory) -> Self {
        let sessions = SessionStore::new(settings.server.max_sessions);
        Self {
            settings: Arc::new(settings),
            service: Arc::new(service),
            factory,
            sessions,
        }
    }

    /// Page skeleton for `mode`, showing the saved key if there is one.
    fn view(&self, mode: CritiqueMode, credential: Option<&Credential>) -> PageView {
        let view = PageView::new(&self.settings.agent.name, mode);
        match credential {
            Some(credential) => view.with_saved_key(
                credential.masked(),
                self.factory.cache().contains(credential),
            ),
            None => view,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/critique", post(critique_page))
        .route("/api/critique", post(critique_api))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(state.settings.server.max_upload_bytes()))
        .layer(cors)
        .with_state(state)
}

// === Form handling ===

#[derive(Deserialize)]
struct IndexQuery {
    mode: Option<String>,
}

/// Fields of a submitted critique form.
#[derive(Debug, Default)]
struct CritiqueForm {
    api_key: Option<String>,
    mode: CritiqueMode,
    prompt: String,
    upload: Option<MediaUpload>,
}

async fn read_form(mut multipart: Multipart) -> Result<CritiqueForm, String> {
    let mut form = CritiqueForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "api_key" => form.api_key = Some(field.text().await.map_err(|e| e.to_string())?),
            "mode" => {
                let value = field.text().await.map_err(|e| e.to_string())?;
                form.mode = value.parse()?;
            }
            "prompt" => form.prompt = field.text().await.map_err(|e| e.to_string())?,
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                // Browsers send an empty part when no file was chosen
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if form.upload.is_some() {
                    return Err("Please upload exactly one file.".to_string());
                }
                form.upload = Some(MediaUpload::new(file_name, bytes.to_vec()));
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(form)
}

/// How a submitted form was resolved.
enum Verdict {
    /// Turned away before the model was called.
    Rejected(String),
    /// The critique ran.
    Completed(CritiqueOutcome),
}

async fn run_critique(
    state: &AppState,
    credential: crate::error::Result<Credential>,
    form: CritiqueForm,
) -> Verdict {
    let mode = form.mode;

    let credential = match credential {
        Ok(credential) => credential,
        Err(e) => return Verdict::Rejected(rejection_message(mode, &e)),
    };

    let Some(upload) = form.upload else {
        return Verdict::Rejected(match mode {
            CritiqueMode::Image => "Please upload an image to critique.".to_string(),
            CritiqueMode::Video => "Please upload a video to critique.".to_string(),
        });
    };

    let agent = match state.factory.get_or_init(&credential) {
        Ok(agent) => agent,
        Err(e) => return Verdict::Rejected(format!("Failed to initialize the AI agent: {}", e)),
    };

    let request = CritiqueRequest {
        mode,
        upload,
        prompt: form.prompt,
    };

    let cancel = CancellationToken::new();
    let _disconnect = cancel.clone().drop_guard();

    let service = state.service.clone();
    let handle = tokio::spawn(
        async move { service.critique(&agent, &request, &cancel).await }.in_current_span(),
    );

    match handle.await {
        Ok(Ok(outcome)) => Verdict::Completed(outcome),
        Ok(Err(e)) => Verdict::Rejected(rejection_message(mode, &e)),
        Err(e) => {
            warn!("Critique task ended abnormally: {}", e);
            Verdict::Completed(CritiqueOutcome::UpstreamError(e.to_string()))
        }
    }
}

/// Inline preview for an image upload that passes validation.
fn image_preview(upload: &MediaUpload) -> Option<String> {
    let ext = upload.validate(CritiqueMode::Image).ok()?;
    Some(format!(
        "data:{};base64,{}",
        mime_for_extension(&ext),
        STANDARD.encode(&upload.bytes)
    ))
}

// === Handlers ===

async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
    headers: HeaderMap,
) -> Html<String> {
    let mode = query
        .mode
        .and_then(|m| m.parse().ok())
        .unwrap_or_default();

    let credential = session_id(&headers).and_then(|id| state.sessions.get(&id));
    let mut init_error = None;
    if let Some(credential) = &credential {
        if let Err(e) = state.factory.get_or_init(credential) {
            init_error = Some(format!("Failed to initialize the AI agent: {}", e));
        }
    }

    let view = state.view(mode, credential.as_ref());
    let view = match init_error {
        Some(message) => view.with_result(PageResult::Error(message)),
        None => view,
    };
    Html(render_page(&view))
}

async fn critique_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("critique_page", %request_id);

    async move {
        let form = match read_form(multipart).await {
            Ok(form) => form,
            Err(e) => {
                let view = PageView::new(&state.settings.agent.name, CritiqueMode::default())
                    .with_result(PageResult::Error(format!("Invalid form submission: {}", e)));
                return (StatusCode::BAD_REQUEST, Html(render_page(&view))).into_response();
            }
        };

        // A key typed into the form replaces the one remembered for this browser
        let session = session_id(&headers);
        let typed = form
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let mut new_session = None;
        let credential = match typed {
            Some(raw) => Credential::new(raw).inspect(|credential| {
                let id = session.unwrap_or_else(Uuid::new_v4);
                state.sessions.insert(id, credential.clone());
                new_session = Some(id);
            }),
            None => session
                .and_then(|id| state.sessions.get(&id))
                .ok_or(CriticError::MissingCredential),
        };

        let mode = form.mode;
        let prompt = form.prompt.clone();
        let preview = match mode {
            CritiqueMode::Image => form.upload.as_ref().and_then(image_preview),
            CritiqueMode::Video => None,
        };
        let saved = credential.as_ref().ok().cloned();

        let result = match run_critique(&state, credential, form).await {
            Verdict::Rejected(message) => PageResult::Error(message),
            Verdict::Completed(CritiqueOutcome::Success(text)) => PageResult::Critique(text),
            Verdict::Completed(outcome) => {
                PageResult::Error(outcome.failure_message(mode).unwrap_or_default())
            }
        };

        let view = state.view(mode, saved.as_ref()).with_prompt(&prompt);
        let view = match preview {
            Some(preview) => view.with_preview(preview),
            None => view,
        };

        let page = render_page(&view.with_result(result));
        let mut response = (StatusCode::OK, Html(page)).into_response();
        if let Some(id) = new_session {
            response
                .headers_mut()
                .insert(header::SET_COOKIE, session_cookie(&id));
        }
        response
    }
    .instrument(span)
    .await
}

/// JSON body of `/api/critique`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn invalid(message: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                status: "invalid_request".to_string(),
                critique: None,
                error: Some(message),
            }),
        )
    }
}

async fn critique_api(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let span = info_span!("critique_api", %request_id);

    async move {
        let form = match read_form(multipart).await {
            Ok(form) => form,
            Err(e) => return ApiResponse::invalid(e),
        };
        let mode = form.mode;
        let credential = Credential::from_option(form.api_key.as_deref());

        match run_critique(&state, credential, form).await {
            Verdict::Rejected(message) => ApiResponse::invalid(message),
            Verdict::Completed(CritiqueOutcome::Success(text)) => (
                StatusCode::OK,
                Json(ApiResponse {
                    status: "success".to_string(),
                    critique: Some(text),
                    error: None,
                }),
            ),
            Verdict::Completed(outcome) => {
                let (status, code) = match &outcome {
                    CritiqueOutcome::EmptyResponse => ("empty_response", StatusCode::OK),
                    _ => ("upstream_error", StatusCode::BAD_GATEWAY),
                };
                (
                    code,
                    Json(ApiResponse {
                        status: status.to_string(),
                        critique: None,
                        error: outcome.failure_message(mode),
                    }),
                )
            }
        }
    }
    .instrument(span)
    .await
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
