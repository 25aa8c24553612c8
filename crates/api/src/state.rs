use std::sync::Arc;

use examcell_core::notification::NotificationService;
use examcell_core::publication::PublicationGate;
use examcell_core::store::ExamStore;
use examcell_core::subject_pool::SubjectPoolResolver;

use crate::config::ServerConfig;
use crate::drafts::DraftRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistent storage (PostgreSQL in production, in-memory in tests).
    pub store: Arc<dyn ExamStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live draft timetables, one per notification being edited.
    pub drafts: Arc<DraftRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn ExamStore>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            drafts: Arc::new(DraftRegistry::default()),
        }
    }

    pub fn notifications(&self) -> NotificationService<dyn ExamStore> {
        NotificationService::new(Arc::clone(&self.store))
    }

    pub fn resolver(&self) -> SubjectPoolResolver<dyn ExamStore> {
        SubjectPoolResolver::new(Arc::clone(&self.store))
    }

    pub fn publication_gate(&self) -> PublicationGate<dyn ExamStore> {
        PublicationGate::new(Arc::clone(&self.store))
    }
}
