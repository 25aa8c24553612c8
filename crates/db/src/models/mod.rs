pub mod notification;
pub mod status_log;
pub mod subject;
pub mod timetable_entry;
