//! Browser sessions for the web UI.
//!
//! A session remembers the API key a browser entered so that switching mode or
//! submitting another file does not ask for it again. Only an opaque id travels
//! in the `critic_session` cookie; the key itself stays on the server.

use crate::session::Credential;
use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "critic_session";

#[derive(Default)]
struct Entries {
    credentials: HashMap<Uuid, Credential>,
    /// Oldest first.
    order: VecDeque<Uuid>,
}

/// In-memory session table, bounded to `capacity` sessions.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<Entries>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries::default())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &Uuid) -> Option<Credential> {
        self.lock().credentials.get(id).cloned()
    }

    /// Remember `credential` under `id`, dropping the oldest session when full.
    pub fn insert(&self, id: Uuid, credential: Credential) {
        let mut entries = self.lock();
        if entries.credentials.insert(id, credential).is_none() {
            entries.order.push_back(id);
        }

        while entries.credentials.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.credentials.remove(&oldest);
            debug!("Dropped session {}", oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session id from the request's `Cookie` headers, if present and well formed.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value binding the browser to session `id`.
pub fn session_cookie(id: &Uuid) -> HeaderValue {
    // A hyphenated uuid is always a valid header value
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE, id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(""))
}
