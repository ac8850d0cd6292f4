use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::premium::repo_types::PaymentStatus;
use crate::recipes::dto::lenient_id;

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub mock: bool,
}

/// Provider callback. `status` is the provider's own wording.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: String,
    pub reference: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MembershipStatusResponse {
    pub user_id: i64,
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_body_accepts_string_user_id() {
        let body: CheckoutBody =
            serde_json::from_str(r#"{"user_id": "3", "phone_number": "+15550100"}"#).unwrap();
        assert_eq!(body.user_id, Some(3));
        assert_eq!(body.plan, None);
    }

    #[test]
    fn membership_status_without_expiry() {
        let json = serde_json::to_value(MembershipStatusResponse {
            user_id: 1,
            is_premium: false,
            expires_at: None,
        })
        .unwrap();
        assert_eq!(json["is_premium"], false);
        assert!(json["expires_at"].is_null());
    }
}
