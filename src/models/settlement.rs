//! Settlement model: an out-of-band payment between two group members

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a settlement was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Upi,
    Paypal,
    Venmo,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Upi => "upi",
            Self::Paypal => "paypal",
            Self::Venmo => "venmo",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "upi" => Some(Self::Upi),
            "paypal" => Some(Self::Paypal),
            "venmo" => Some(Self::Venmo),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Settlement status. Created as `settled` in the common path (recording an
/// already-completed payment); the remaining states are descriptive overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Settled,
    Overdue,
    Disputed,
    Verified,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
            Self::Overdue => "overdue",
            Self::Disputed => "disputed",
            Self::Verified => "verified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "settled" => Some(Self::Settled),
            "overdue" => Some(Self::Overdue),
            "disputed" => Some(Self::Disputed),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }
}

/// Settlement record. Never mutated after creation; deleted only when its
/// group is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: Uuid,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub payment_method: String,
    pub payment_date: NaiveDateTime,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl Settlement {
    pub fn status_enum(&self) -> SettlementStatus {
        SettlementStatus::from_str(&self.status).unwrap_or(SettlementStatus::Settled)
    }

    pub fn is_settled(&self) -> bool {
        self.status == SettlementStatus::Settled.as_str()
    }

    /// Whether the given user paid or received this settlement
    pub fn direction_for(&self, user_id: Uuid) -> &'static str {
        if self.payer_id == user_id {
            "paid"
        } else {
            "received"
        }
    }
}
