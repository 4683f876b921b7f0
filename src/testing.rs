//! Test doubles shared by unit tests across modules.

use crate::agent::{AgentBuilder, CritiqueAgent};
use crate::error::{CriticError, Result};
use crate::gemini::{
    Candidate, Content, FileState, GenerateContentRequest, GenerateContentResponse,
    GenerativeModel, Part, RemoteFile, RemoteFiles,
};
use crate::session::Credential;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Model that replays scripted responses and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<GenerateContentResponse>>>,
    pub requests: Mutex<Vec<GenerateContentRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<GenerateContentResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
    }
}

/// A response whose first candidate holds one text part.
pub fn text_response(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content::model(vec![Part::text(text)])),
            finish_reason: Some("STOP".to_string()),
        }],
        prompt_feedback: None,
    }
}

/// Remote storage whose status checks follow a script.
///
/// Uploads start in `upload_state`; each `get_file` pops the next state and
/// falls back to `PROCESSING` once the script runs out.
pub struct ScriptedFiles {
    upload_state: FileState,
    states: Mutex<VecDeque<FileState>>,
    pub uploads: Mutex<Vec<PathBuf>>,
    pub status_checks: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
    /// Set when a status check happens while the model has been called.
    model: Option<Arc<ScriptedModel>>,
    pub checks_after_model_call: AtomicUsize,
}

impl ScriptedFiles {
    pub fn new(upload_state: FileState, states: &[FileState]) -> Self {
        Self {
            upload_state,
            states: Mutex::new(states.iter().copied().collect()),
            uploads: Mutex::new(Vec::new()),
            status_checks: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
            model: None,
            checks_after_model_call: AtomicUsize::new(0),
        }
    }

    /// Watch `model` so tests can assert no status check follows a model call.
    pub fn watching(mut self, model: Arc<ScriptedModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }
}

pub fn remote_file(name: &str, state: FileState) -> RemoteFile {
    RemoteFile {
        name: name.to_string(),
        uri: format!("https://generativelanguage.googleapis.com/v1beta/{}", name),
        mime_type: Some("video/mp4".to_string()),
        state,
        ..Default::default()
    }
}

#[async_trait]
impl RemoteFiles for ScriptedFiles {
    async fn upload_file(&self, path: &Path, _mime: &str, _name: &str) -> Result<RemoteFile> {
        if !path.exists() {
            return Err(CriticError::Upload(format!("{} is missing", path.display())));
        }
        self.uploads.lock().unwrap().push(path.to_path_buf());
        Ok(remote_file("files/scripted", self.upload_state))
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        if self.model.as_ref().is_some_and(|m| m.call_count() > 0) {
            self.checks_after_model_call.fetch_add(1, Ordering::SeqCst);
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FileState::Processing);
        Ok(remote_file(name, state))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Storage that refuses everything.
pub struct NoFiles;

#[async_trait]
impl RemoteFiles for NoFiles {
    async fn upload_file(&self, _: &Path, _: &str, _: &str) -> Result<RemoteFile> {
        Err(CriticError::Upload("no remote storage in this test".to_string()))
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        Err(CriticError::Upload(format!("{} does not exist", name)))
    }

    async fn delete_file(&self, _: &str) -> Result<()> {
        Ok(())
    }
}

/// Builder that counts constructions and wires in a scripted model.
pub struct CountingBuilder {
    builds: AtomicUsize,
    model: Arc<ScriptedModel>,
    files: Arc<dyn RemoteFiles>,
}

impl CountingBuilder {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        Self::with_files(model, Arc::new(NoFiles))
    }

    pub fn with_files(model: Arc<ScriptedModel>, files: Arc<dyn RemoteFiles>) -> Self {
        Self {
            builds: AtomicUsize::new(0),
            model,
            files,
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl AgentBuilder for CountingBuilder {
    fn build(&self, _credential: &Credential) -> Result<CritiqueAgent> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(CritiqueAgent::new(
            "AI Media Critic",
            self.model.clone(),
            self.files.clone(),
        ))
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_for(condition: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
