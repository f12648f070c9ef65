//! Expense and split models, the records balances are derived from

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How an expense is divided among group members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Custom,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "equal" => Some(Self::Equal),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Expense category (fixed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Utilities,
    Shopping,
    Health,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Entertainment => "Entertainment",
            Self::Utilities => "Utilities",
            Self::Shopping => "Shopping",
            Self::Health => "Health",
            Self::General => "General",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Food" => Some(Self::Food),
            "Transport" => Some(Self::Transport),
            "Entertainment" => Some(Self::Entertainment),
            "Utilities" => Some(Self::Utilities),
            "Shopping" => Some(Self::Shopping),
            "Health" => Some(Self::Health),
            "General" => Some(Self::General),
            _ => None,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

/// Supported currencies. Tracked as independent buckets, never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Inr,
    Cad,
    Aud,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Jpy => "JPY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "INR" => Some(Self::Inr),
            "CAD" => Some(Self::Cad),
            "AUD" => Some(Self::Aud),
            "JPY" => Some(Self::Jpy),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::Inr
    }
}

/// One member's owed share of an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Split {
    pub user_id: Uuid,
    pub amount: f64,
}

impl Split {
    pub fn new(user_id: Uuid, amount: f64) -> Self {
        Self { user_id, amount }
    }
}

/// Expense record: who paid, how much, and how it is split.
///
/// At creation/edit time the splits sum to `amount` within 0.01. Split
/// retirement later reduces individual split amounts without rewriting
/// `amount`, so the sum invariant binds only at creation and edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub category: String,
    pub payer_id: Uuid,
    pub split_type: String,
    pub receipt_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Loaded separately from expense_splits, in allocation order
    #[sqlx(skip)]
    pub splits: Vec<Split>,
}

impl Expense {
    pub fn split_type_enum(&self) -> SplitType {
        SplitType::from_str(&self.split_type).unwrap_or(SplitType::Equal)
    }

    /// The split belonging to the given user, if any
    pub fn split_for(&self, user_id: Uuid) -> Option<&Split> {
        self.splits.iter().find(|s| s.user_id == user_id)
    }
}
