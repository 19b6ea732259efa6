pub mod chat;
pub mod generator;
pub mod handlers;
pub mod prompts;
