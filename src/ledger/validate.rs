//! Settlement validator: gates a proposed settlement against the resolved
//! outstanding balance. Pure function of its inputs; no side effects.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::balance::PairBalance;
use super::{round2, AMOUNT_EPSILON};

/// Validator rejections. `WrongDirection` and `ExceedsOutstanding` carry the
/// correction the caller needs to retry successfully.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SettlementError {
    #[error("No outstanding balance between these users")]
    NoOutstandingBalance,

    #[error(
        "Invalid settlement direction: the receiver owes the payer {amount:.2}, not the other way around"
    )]
    WrongDirection {
        suggested_payer: Uuid,
        suggested_receiver: Uuid,
        amount: f64,
    },

    #[error(
        "Settlement amount ({amount:.2}) exceeds outstanding balance ({max_amount:.2})"
    )]
    ExceedsOutstanding {
        amount: f64,
        max_amount: f64,
        expense_balance: f64,
        settled_balance: f64,
    },
}

/// Validate a proposed settlement of `amount` from `payer` to `receiver`
/// against the pair's resolved balance (payer's debt to receiver).
pub fn validate_settlement(
    payer: Uuid,
    receiver: Uuid,
    amount: f64,
    balance: &PairBalance,
) -> Result<(), SettlementError> {
    let outstanding = balance.outstanding();

    if outstanding <= -AMOUNT_EPSILON {
        // The debt runs the other way; hand back the corrected direction.
        return Err(SettlementError::WrongDirection {
            suggested_payer: receiver,
            suggested_receiver: payer,
            amount: round2(outstanding.abs()),
        });
    }

    if outstanding < AMOUNT_EPSILON {
        return Err(SettlementError::NoOutstandingBalance);
    }

    if amount > outstanding + AMOUNT_EPSILON {
        return Err(SettlementError::ExceedsOutstanding {
            amount,
            max_amount: round2(outstanding),
            expense_balance: balance.expense_balance,
            settled_balance: balance.settled_net,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_partial_and_full_settlement() {
        let payer = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let balance = PairBalance::new(40.0, 0.0);

        assert!(validate_settlement(payer, receiver, 10.0, &balance).is_ok());
        assert!(validate_settlement(payer, receiver, 40.0, &balance).is_ok());
        // Within tolerance just above the outstanding amount
        assert!(validate_settlement(payer, receiver, 40.005, &balance).is_ok());
    }

    #[test]
    fn test_zero_balance_always_rejected() {
        let payer = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let balance = PairBalance::new(25.0, 25.0);

        assert_eq!(
            validate_settlement(payer, receiver, 5.0, &balance),
            Err(SettlementError::NoOutstandingBalance)
        );
    }

    #[test]
    fn test_wrong_direction_suggests_exact_reversal() {
        let payer = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        // receiver actually owes payer 30
        let balance = PairBalance::new(-30.0, 0.0);

        let err = validate_settlement(payer, receiver, 30.0, &balance).unwrap_err();
        assert_eq!(
            err,
            SettlementError::WrongDirection {
                suggested_payer: receiver,
                suggested_receiver: payer,
                amount: 30.0,
            }
        );
    }

    #[test]
    fn test_exceeds_outstanding_reports_max_and_breakdown() {
        let payer = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let balance = PairBalance::new(60.0, 20.0);

        let err = validate_settlement(payer, receiver, 50.0, &balance).unwrap_err();
        match err {
            SettlementError::ExceedsOutstanding {
                amount,
                max_amount,
                expense_balance,
                settled_balance,
            } => {
                assert_eq!(amount, 50.0);
                assert_eq!(max_amount, 40.0);
                assert_eq!(expense_balance, 60.0);
                assert_eq!(settled_balance, 20.0);
            }
            other => panic!("expected ExceedsOutstanding, got {:?}", other),
        }
    }

    #[test]
    fn test_sub_epsilon_negative_counts_as_settled() {
        let payer = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let balance = PairBalance::new(0.0, 0.005);

        assert_eq!(
            validate_settlement(payer, receiver, 1.0, &balance),
            Err(SettlementError::NoOutstandingBalance)
        );
    }
}
