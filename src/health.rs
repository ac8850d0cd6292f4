use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::{db, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub openai_available: bool,
    pub payments_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Always 200; a dead database shows up in the body.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match db::ping(&state.db).await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "health check database ping failed");
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "healthy",
        database,
        openai_available: state.generator.is_live(),
        payments_enabled: state.config.payments.enabled,
        timestamp: OffsetDateTime::now_utc(),
    })
}
