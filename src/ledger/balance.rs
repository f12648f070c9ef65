//! Balance resolver: derives the net owed amount between two users from the
//! group's expense history and prior settled settlements.
//!
//! Sign convention, used consistently everywhere: a positive balance between
//! (a, b) means `a` owes `b`. Resolving (b, a) yields the additive inverse.
//!
//! Balances are recomputed fresh on every read, never cached or maintained
//! incrementally, because expenses can be edited or deleted at any time.

use crate::models::Expense;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{round2, AMOUNT_EPSILON};

/// The two inputs the outstanding balance is derived from, kept separate so
/// validation errors can report the breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairBalance {
    /// Net debt from expense splits: positive means the first user owes the
    /// second from expenses alone.
    pub expense_balance: f64,
    /// Net amount already settled from the first user to the second.
    pub settled_net: f64,
}

impl PairBalance {
    pub fn new(expense_balance: f64, settled_net: f64) -> Self {
        Self {
            expense_balance,
            settled_net,
        }
    }

    /// Outstanding amount still owed by the first user to the second
    pub fn outstanding(&self) -> f64 {
        self.expense_balance - self.settled_net
    }

    /// Magnitudes below the epsilon count as fully settled
    pub fn is_settled(&self) -> bool {
        self.outstanding().abs() < AMOUNT_EPSILON
    }
}

/// Which way the outstanding balance points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceDirection {
    #[serde(rename = "A_owes_B")]
    AOwesB,
    #[serde(rename = "B_owes_A")]
    BOwesA,
    #[serde(rename = "settled")]
    Settled,
}

/// User-facing balance between an ordered pair, rounded at presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub amount: f64,
    pub direction: BalanceDirection,
}

impl BalanceSummary {
    pub fn from_outstanding(outstanding: f64) -> Self {
        if outstanding.abs() < AMOUNT_EPSILON {
            Self {
                amount: 0.0,
                direction: BalanceDirection::Settled,
            }
        } else if outstanding > 0.0 {
            Self {
                amount: round2(outstanding),
                direction: BalanceDirection::AOwesB,
            }
        } else {
            Self {
                amount: round2(-outstanding),
                direction: BalanceDirection::BOwesA,
            }
        }
    }
}

/// Net debt from `user_a` to `user_b` across the given expenses.
///
/// An expense paid by `user_a` with a split for `user_b` is a debt from
/// `user_b` back to `user_a`, so it decreases the a-owes-b balance; the
/// symmetric case increases it. A payer's own split in their own expense
/// does not move the pair balance.
pub fn expense_balance(expenses: &[Expense], user_a: Uuid, user_b: Uuid) -> f64 {
    let mut balance = 0.0;

    for expense in expenses {
        if expense.payer_id == user_a {
            if let Some(split) = expense.split_for(user_b) {
                balance -= split.amount;
            }
        }

        if expense.payer_id == user_b {
            if let Some(split) = expense.split_for(user_a) {
                balance += split.amount;
            }
        }
    }

    balance
}

/// A user's overall position in a group: total they fronted minus total they
/// owe across all splits (their own shares included). This is the single
/// source for the `your_balance` figure every view shows.
pub fn member_position(expenses: &[Expense], user_id: Uuid) -> f64 {
    let paid: f64 = expenses
        .iter()
        .filter(|e| e.payer_id == user_id)
        .map(|e| e.amount)
        .sum();

    let owed: f64 = expenses
        .iter()
        .filter_map(|e| e.split_for(user_id))
        .map(|s| s.amount)
        .sum();

    paid - owed
}

/// Sum of expense amounts: the group's `total_spent`, derived
pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}
