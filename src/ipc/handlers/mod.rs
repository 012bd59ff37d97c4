pub mod ai_tools;
pub mod announcements;
pub mod assignments;
pub mod attendance;
pub mod core;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod games;
pub mod grades;
pub mod messages;
pub mod users;
