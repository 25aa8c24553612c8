//! In-process registry of live draft timetables.
//!
//! Every `POST /draft` opens a separate session with its own
//! [`AssignmentEngine`] and draft id, so two operators editing the same
//! notification never share state. Each engine remembers the version it was
//! loaded from; whichever session saves second gets `StaleDraft` from the
//! store's version check.

use std::collections::HashMap;
use std::sync::Arc;

use examcell_core::assignment::AssignmentEngine;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Shared handle to one draft session's engine.
pub type DraftHandle = Arc<Mutex<AssignmentEngine>>;

struct DraftSession {
    notification_code: String,
    engine: DraftHandle,
}

#[derive(Default)]
pub struct DraftRegistry {
    sessions: RwLock<HashMap<Uuid, DraftSession>>,
}

impl DraftRegistry {
    /// Register `engine` as a new session and return its id.
    pub async fn open(&self, engine: AssignmentEngine) -> (Uuid, DraftHandle) {
        let id = Uuid::new_v4();
        let session = DraftSession {
            notification_code: engine.notification_code().to_string(),
            engine: Arc::new(Mutex::new(engine)),
        };
        let handle = Arc::clone(&session.engine);
        self.sessions.write().await.insert(id, session);
        (id, handle)
    }

    /// The session `id`, provided it belongs to notification `code`.
    pub async fn get(&self, code: &str, id: Uuid) -> Option<DraftHandle> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|s| s.notification_code == code)
            .map(|s| Arc::clone(&s.engine))
    }

    /// Drop one session. Returns `false` if it was not open for `code`.
    pub async fn discard(&self, code: &str, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            Some(s) if s.notification_code == code => sessions.remove(&id).is_some(),
            _ => false,
        }
    }

    /// Drop every session of `code`, returning how many were open.
    pub async fn discard_notification(&self, code: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.notification_code != code);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
