//! Exam timetable API server library.
//!
//! Exposes config, state, error handling, the draft registry and the route
//! tree so integration tests and the binary entrypoint share them.

pub mod config;
pub mod drafts;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
