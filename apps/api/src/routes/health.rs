//! Unversioned status endpoints. The `/api/dreams` and `/api/visa-match`
//! placeholders predate the `/api/v1` API and are kept for old clients.

use axum::{extract::OriginalUri, http::StatusCode, Json};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "LifeWay USA API";

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/status
pub async fn status_handler() -> Json<Value> {
    Json(json!({
        "message": "LifeWay USA API is running",
        "endpoints": [
            "/health",
            "/api/status",
            "/api/dreams",
            "/api/visa-match",
            "/api/v1",
        ],
        "status": "active",
    }))
}

/// GET /api/dreams
pub async fn dreams_placeholder() -> Json<Value> {
    Json(json!({
        "message": "Dreams endpoint - coming soon",
        "dreams": [],
        "status": "placeholder",
    }))
}

/// GET /api/visa-match
pub async fn visa_match_placeholder() -> Json<Value> {
    Json(json!({
        "message": "Visa match endpoint - coming soon",
        "matches": [],
        "status": "placeholder",
    }))
}

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the LifeWay USA API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "status": "/api/status",
            "dreams": "/api/dreams",
            "visa_match": "/api/visa-match",
        },
    }))
}

/// Catch-all for unknown paths.
pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
        })),
    )
}
