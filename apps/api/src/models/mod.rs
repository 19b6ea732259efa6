pub mod dream;
pub mod gamification;
pub mod report;
pub mod usage;
pub mod user;
pub mod visa;
