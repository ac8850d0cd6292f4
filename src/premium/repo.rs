use sqlx::{Any, AnyPool, Transaction};

use crate::db::last_insert_id;
use crate::premium::repo_types::{Membership, Payment, PaymentStatus, Plan};

const PAYMENT_COLUMNS: &str = "id, user_id, reference, plan, amount_cents, currency, phone_number, \
                               status, created_at, updated_at";

pub struct NewPayment<'a> {
    pub user_id: i64,
    pub reference: &'a str,
    pub plan: Plan,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub phone_number: &'a str,
}

pub async fn find_membership(db: &AnyPool, user_id: i64) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        "SELECT user_id, active, expires_at, updated_at FROM memberships WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn is_premium(db: &AnyPool, user_id: i64, now: i64) -> Result<bool, sqlx::Error> {
    Ok(find_membership(db, user_id)
        .await?
        .map_or(false, |m| m.is_premium_at(now)))
}

pub async fn insert_payment(
    db: &AnyPool,
    new: &NewPayment<'_>,
    now: i64,
) -> Result<Payment, sqlx::Error> {
    let status = PaymentStatus::Pending;
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO payments
            (user_id, reference, plan, amount_cents, currency, phone_number, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.user_id)
    .bind(new.reference)
    .bind(new.plan.as_str())
    .bind(new.amount_cents)
    .bind(new.currency)
    .bind(new.phone_number)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let id = last_insert_id(&mut tx).await?;
    tx.commit().await?;

    Ok(Payment {
        id,
        user_id: new.user_id,
        reference: new.reference.to_string(),
        plan: new.plan.as_str().to_string(),
        amount_cents: new.amount_cents,
        currency: new.currency.to_string(),
        phone_number: new.phone_number.to_string(),
        status: status.as_str().to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn find_payment_by_reference(
    db: &AnyPool,
    reference: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = ?"
    ))
    .bind(reference)
    .fetch_optional(db)
    .await
}

pub async fn find_payment_by_reference_tx(
    tx: &mut Transaction<'_, Any>,
    reference: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = ?"
    ))
    .bind(reference)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn set_payment_status(
    db: &AnyPool,
    payment_id: i64,
    status: PaymentStatus,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(payment_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Moves a payment to `status` unless it already succeeded. Returns whether
/// this call made the change, so only one of several racing callbacks acts
/// on it.
pub async fn transition_payment_tx(
    tx: &mut Transaction<'_, Any>,
    payment_id: i64,
    status: PaymentStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = ?, updated_at = ? \
         WHERE id = ? AND status <> 'succeeded' AND status <> ?",
    )
    .bind(status.as_str())
    .bind(now)
    .bind(payment_id)
    .bind(status.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_membership_tx(
    tx: &mut Transaction<'_, Any>,
    user_id: i64,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        "SELECT user_id, active, expires_at, updated_at FROM memberships WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Marks the membership active until `expires_at`, creating the row if needed.
/// Select-then-write keeps it portable (no `ON CONFLICT` / `ON DUPLICATE KEY`).
pub async fn activate_membership_tx(
    tx: &mut Transaction<'_, Any>,
    user_id: i64,
    expires_at: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    let sql = if find_membership_tx(tx, user_id).await?.is_some() {
        "UPDATE memberships SET active = 1, expires_at = ?, updated_at = ? WHERE user_id = ?"
    } else {
        "INSERT INTO memberships (expires_at, updated_at, user_id, active) VALUES (?, ?, ?, 1)"
    };
    sqlx::query(sql)
        .bind(expires_at)
        .bind(now)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
