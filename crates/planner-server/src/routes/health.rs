//! Liveness check. Open to anonymous callers.
//!
//! Reports which backends the two stores run on, so a deployment that
//! silently fell back to memory is visible from outside.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Backend of boards, members and groups.
    pub relational: &'static str,
    /// Backend of notes.
    pub documents: &'static str,
}

fn backend(url: Option<&String>) -> &'static str {
    if url.is_some() { "postgres" } else { "memory" }
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.config();
    Json(HealthResponse {
        status: "ok",
        relational: backend(config.database_url.as_ref()),
        documents: backend(config.document_database_url.as_ref()),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
