//! The balance ledger core: split allocation, balance resolution, and
//! settlement validation.
//!
//! Everything in this module is a pure function over in-memory records,
//! with no persistence and no side effects, so the algorithmic heart of the
//! system is testable without a database.

pub mod balance;
pub mod split;
pub mod validate;

pub use balance::{BalanceDirection, BalanceSummary, PairBalance};
pub use split::{allocate, round2, SplitError};
pub use validate::{validate_settlement, SettlementError};

/// Absolute tolerance for all amount comparisons. Amount math is carried at
/// full f64 precision internally; magnitudes below this are treated as fully
/// settled, and sums reconcile within it.
pub const AMOUNT_EPSILON: f64 = 0.01;
