use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::usage::tracker::UsageTracker;
use crate::visa::matcher::VisaMatcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Monthly quota counters, backed by Redis.
    pub usage: UsageTracker,
    /// Object storage for PDF exports.
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Pluggable visa matcher. Default: RuleBasedMatcher.
    pub visa_matcher: Arc<dyn VisaMatcher>,
}
