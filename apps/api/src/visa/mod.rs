pub mod analysis;
pub mod catalog;
pub mod handlers;
pub mod matcher;
pub mod questionnaire;
