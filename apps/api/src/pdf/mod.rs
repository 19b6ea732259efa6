// Layout and rendering are synchronous; export.rs runs them inside
// tokio::task::spawn_blocking.
pub mod document;
pub mod export;
pub mod handlers;
pub mod layout;
pub mod metrics;
pub mod render;
