use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub user_id: i64,
    pub active: i64,             // 0 or 1; portable across backends
    pub expires_at: Option<i64>, // unix seconds, NULL = no expiry
    pub updated_at: i64,
}

impl Membership {
    pub fn is_premium_at(&self, now: i64) -> bool {
        self.active != 0 && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub reference: String,
    pub plan: String,
    pub amount_cents: i64,
    pub currency: String,
    pub phone_number: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_db(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Providers spell outcomes differently; anything unrecognised stays pending.
    pub fn from_provider(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "success" | "successful" | "succeeded" | "completed" | "complete" | "paid" => {
                Self::Succeeded
            }
            "failed" | "failure" | "cancelled" | "canceled" | "declined" | "expired" => {
                Self::Failed
            }
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Monthly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "monthly" | "premium" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn duration_days(&self) -> i64 {
        match self {
            Self::Monthly => 30,
        }
    }
}
