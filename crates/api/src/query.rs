//! Query parameter types for API handlers.

use examcell_core::notification::NotificationStatus;
use serde::Deserialize;

/// `?status=` filter for the notification list.
#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<NotificationStatus>,
}
