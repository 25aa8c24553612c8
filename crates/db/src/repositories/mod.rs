//! Zero-sized repository structs. Reads take `&PgPool`; writes that must
//! share a transaction take `&mut PgConnection`.

pub mod notification_repo;
pub mod status_log_repo;
pub mod subject_repo;
pub mod timetable_entry_repo;

pub use notification_repo::ExamNotificationRepo;
pub use status_log_repo::StatusLogRepo;
pub use subject_repo::{EnrollmentRepo, SubjectRepo};
pub use timetable_entry_repo::TimetableEntryRepo;
