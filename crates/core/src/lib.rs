//! Exam timetable scheduling core.
//!
//! Domain building blocks shared by the persistence and HTTP crates:
//!
//! - [`notification`]: exam notifications and their status state machine.
//! - [`subject_pool`]: the subjects a notification's scope must schedule.
//! - [`slot_grid`]: the ordered (date, session) grid of assignable slots.
//! - [`assignment::AssignmentEngine`]: the in-progress draft timetable.
//! - [`conflict`]: room, invigilator and duplicate-subject detection.
//! - [`publication::PublicationGate`]: the conflict-checked path to `Published`.
//! - [`store`]: async storage traits plus an in-memory implementation.

pub mod assignment;
pub mod conflict;
pub mod error;
pub mod notification;
pub mod publication;
pub mod slot_grid;
pub mod store;
pub mod subject_pool;
pub mod timetable;
pub mod types;

pub use error::CoreError;
