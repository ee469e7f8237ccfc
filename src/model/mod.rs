pub mod attendance;
pub mod attendance_log;
pub mod student;
pub mod teacher;
