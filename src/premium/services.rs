use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::repo_types::User,
    db::{now_unix, to_datetime},
    error::{AppError, AppResult},
    premium::{
        checkout::CheckoutRequest,
        dto::{CheckoutResponse, MembershipStatusResponse, WebhookResponse},
        repo::{self, NewPayment},
        repo_types::{PaymentStatus, Plan},
    },
    state::AppState,
};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
// payments.phone_number column width
pub const MAX_PHONE_LEN: usize = 32;

pub fn new_reference() -> String {
    format!("RCP-{}", Uuid::new_v4().simple()).to_uppercase()
}

/// New expiry for a successful payment. Renewing an unexpired membership
/// extends it from its current end.
pub fn extended_expiry(current: Option<i64>, now: i64, plan: Plan) -> i64 {
    let base = current.filter(|exp| *exp > now).unwrap_or(now);
    base + plan.duration_days() * SECONDS_PER_DAY
}

pub async fn create_checkout(
    state: &AppState,
    user_id: i64,
    plan: Option<&str>,
    phone_number: &str,
) -> AppResult<CheckoutResponse> {
    let phone_number = phone_number.trim();
    if phone_number.is_empty() {
        return Err(AppError::validation("Phone number required"));
    }
    if phone_number.chars().count() > MAX_PHONE_LEN {
        return Err(AppError::validation("Phone number too long"));
    }
    let plan = Plan::parse(plan.unwrap_or_default())
        .ok_or_else(|| AppError::validation("Unsupported plan"))?;

    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let cfg = &state.config.payments;
    let reference = new_reference();
    let payment = repo::insert_payment(
        &state.db,
        &NewPayment {
            user_id,
            reference: &reference,
            plan,
            amount_cents: cfg.monthly_price_cents,
            currency: &cfg.currency,
            phone_number,
        },
        now_unix(),
    )
    .await?;

    let request = CheckoutRequest {
        reference: reference.clone(),
        amount_cents: payment.amount_cents,
        currency: payment.currency.clone(),
        phone_number: payment.phone_number.clone(),
        callback_url: format!(
            "{}/api/premium/webhook",
            cfg.public_base_url.trim_end_matches('/')
        ),
    };

    let session = match state.checkout.create_checkout(&request).await {
        Ok(s) => s,
        Err(e) => {
            repo::set_payment_status(&state.db, payment.id, PaymentStatus::Failed, now_unix())
                .await?;
            return Err(AppError::PaymentProvider(format!("{:#}", e)));
        }
    };

    info!(user_id, %reference, mock = session.mock, "checkout created");
    Ok(CheckoutResponse {
        checkout_url: session.checkout_url,
        reference,
        amount: payment.amount_cents,
        currency: payment.currency,
        mock: session.mock,
    })
}

/// Reconciles a provider callback with the stored payment.
///
/// Success is applied once: the payment flips to succeeded and the membership
/// is extended in the same transaction. A succeeded payment never goes back.
pub async fn apply_webhook(
    state: &AppState,
    reference: &str,
    provider_status: &str,
) -> AppResult<WebhookResponse> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(AppError::validation("Reference required"));
    }
    let incoming = PaymentStatus::from_provider(provider_status);
    let now = now_unix();

    let mut tx = state.db.begin().await?;
    let payment = repo::find_payment_by_reference_tx(&mut tx, reference)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;

    let status = match (payment.status(), incoming) {
        (PaymentStatus::Succeeded, _) => {
            info!(%reference, "payment already succeeded");
            PaymentStatus::Succeeded
        }
        (_, PaymentStatus::Succeeded) => {
            let flipped =
                repo::transition_payment_tx(&mut tx, payment.id, PaymentStatus::Succeeded, now)
                    .await?;
            if flipped {
                let plan = Plan::parse(&payment.plan).unwrap_or_default();
                let current = repo::find_membership_tx(&mut tx, payment.user_id)
                    .await?
                    .and_then(|m| if m.active != 0 { m.expires_at } else { None });
                let expires_at = extended_expiry(current, now, plan);
                repo::activate_membership_tx(&mut tx, payment.user_id, expires_at, now).await?;
                info!(%reference, user_id = payment.user_id, expires_at, "membership activated");
            } else {
                info!(%reference, "payment succeeded concurrently");
            }
            PaymentStatus::Succeeded
        }
        (_, PaymentStatus::Failed) => {
            if repo::transition_payment_tx(&mut tx, payment.id, PaymentStatus::Failed, now).await? {
                warn!(%reference, provider_status, "payment failed");
            }
            PaymentStatus::Failed
        }
        (current, PaymentStatus::Pending) => current,
    };
    tx.commit().await?;

    Ok(WebhookResponse {
        message: "Webhook processed".into(),
        reference: reference.to_string(),
        status,
    })
}

pub async fn membership_status(state: &AppState, user_id: i64) -> AppResult<MembershipStatusResponse> {
    let membership = repo::find_membership(&state.db, user_id).await?;
    let now = now_unix();
    Ok(MembershipStatusResponse {
        user_id,
        is_premium: membership.as_ref().map_or(false, |m| m.is_premium_at(now)),
        expires_at: membership.and_then(|m| m.expires_at).map(to_datetime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_format() {
        let r = new_reference();
        assert!(r.starts_with("RCP-"));
        assert_eq!(r.len(), 4 + 32);
        assert_ne!(r, new_reference());
    }

    #[test]
    fn expiry_starts_now_or_extends() {
        let month = 30 * SECONDS_PER_DAY;
        assert_eq!(extended_expiry(None, 1_000, Plan::Monthly), 1_000 + month);
        // lapsed membership restarts from now
        assert_eq!(extended_expiry(Some(500), 1_000, Plan::Monthly), 1_000 + month);
        assert_eq!(extended_expiry(Some(5_000), 1_000, Plan::Monthly), 5_000 + month);
    }
}
