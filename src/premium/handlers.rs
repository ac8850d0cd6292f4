use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use subtle::ConstantTimeEq;
use tracing::{instrument, warn};

use crate::{
    auth::jwt::MaybeUser,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiQuery},
    premium::{
        dto::{
            CheckoutBody, CheckoutResponse, MembershipStatusResponse, StatusQuery, WebhookBody,
            WebhookResponse,
        },
        services,
    },
    state::AppState,
};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub fn premium_routes() -> Router<AppState> {
    Router::new()
        .route("/premium/create-checkout", post(create_checkout))
        .route("/premium/webhook", post(webhook))
        .route("/premium/status", get(membership_status))
}

/// POST /premium/create-checkout { user_id, plan?, phone_number }
#[instrument(skip(state, body))]
pub async fn create_checkout(
    State(state): State<AppState>,
    MaybeUser(token_user): MaybeUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> AppResult<(StatusCode, Json<CheckoutResponse>)> {
    let user_id = body
        .user_id
        .or(token_user)
        .ok_or_else(|| AppError::validation("User ID required"))?;
    let resp =
        services::create_checkout(&state, user_id, body.plan.as_deref(), &body.phone_number).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|v| bool::from(v.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false)
}

#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<WebhookBody>,
) -> AppResult<Json<WebhookResponse>> {
    if let Some(secret) = state.config.payments.webhook_secret.as_deref() {
        if !secret_matches(&headers, secret) {
            warn!("webhook secret mismatch");
            return Err(AppError::Unauthorized("Invalid webhook secret".into()));
        }
    }
    let resp = services::apply_webhook(&state, &body.reference, &body.status).await?;
    Ok(Json(resp))
}

#[instrument(skip(state))]
pub async fn membership_status(
    State(state): State<AppState>,
    MaybeUser(token_user): MaybeUser,
    ApiQuery(q): ApiQuery<StatusQuery>,
) -> AppResult<Json<MembershipStatusResponse>> {
    let user_id = q
        .user_id
        .or(token_user)
        .ok_or_else(|| AppError::validation("User ID required"))?;
    Ok(Json(services::membership_status(&state, user_id).await?))
}
