//! Split allocator: turns an expense total into per-member owed shares.

use crate::models::{Split, SplitType};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::AMOUNT_EPSILON;

/// Allocator failures. Each variant carries enough structured detail for the
/// caller to correct its input.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SplitError {
    #[error("No members to split between")]
    NoMembers,

    #[error("Custom splits are required when split type is 'custom'")]
    CustomSplitsRequired,

    #[error(
        "Custom split total ({split_total:.2}) does not match expense amount ({expense_amount:.2}); difference {difference:.2}"
    )]
    SplitMismatch {
        split_total: f64,
        expense_amount: f64,
        difference: f64,
    },

    #[error("User {0} is not a member of this group")]
    InvalidMember(Uuid),

    #[error("Split amount must be positive for user {0}")]
    NonPositiveSplit(Uuid),
}

/// Round to 2 decimal places (presentation and equal-share rounding only;
/// comparisons always go through AMOUNT_EPSILON).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Allocate `total` across `members`.
///
/// Equal split: every member gets `round2(total / n)` except the last, who
/// absorbs the rounding remainder so the shares sum to exactly `total`. The
/// iteration order of `members` is significant: the same order always
/// produces the same shares, with the remainder on the last member.
///
/// Custom split: the caller-supplied shares are validated (members only,
/// positive, summing to `total` within 0.01) and returned in caller order.
///
/// Zero-amount entries never appear in the result.
pub fn allocate(
    total: f64,
    members: &[Uuid],
    split_type: SplitType,
    custom: Option<&[Split]>,
) -> Result<Vec<Split>, SplitError> {
    if members.is_empty() {
        return Err(SplitError::NoMembers);
    }

    let splits = match split_type {
        SplitType::Equal => {
            let count = members.len();
            let share = round2(total / count as f64);

            members
                .iter()
                .enumerate()
                .map(|(index, &user_id)| {
                    let amount = if index == count - 1 {
                        round2(total - share * (count - 1) as f64)
                    } else {
                        share
                    };
                    Split::new(user_id, amount)
                })
                .collect::<Vec<_>>()
        }
        SplitType::Custom => {
            let custom = match custom {
                Some(splits) if !splits.is_empty() => splits,
                _ => return Err(SplitError::CustomSplitsRequired),
            };

            let split_total: f64 = custom.iter().map(|s| s.amount).sum();
            if (split_total - total).abs() > AMOUNT_EPSILON {
                return Err(SplitError::SplitMismatch {
                    split_total,
                    expense_amount: total,
                    difference: (split_total - total).abs(),
                });
            }

            for split in custom {
                if !members.contains(&split.user_id) {
                    return Err(SplitError::InvalidMember(split.user_id));
                }
                if split.amount <= 0.0 {
                    return Err(SplitError::NonPositiveSplit(split.user_id));
                }
            }

            custom.to_vec()
        }
    };

    Ok(splits.into_iter().filter(|s| s.amount > 0.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_equal_split_three_members_100() {
        let m = members(3);
        let splits = allocate(100.0, &m, SplitType::Equal, None).unwrap();

        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0].amount, 33.33);
        assert_eq!(splits[1].amount, 33.33);
        assert_eq!(splits[2].amount, 33.34);
        assert_eq!(splits[2].user_id, m[2]);

        let sum: f64 = splits.iter().map(|s| s.amount).sum();
        assert_eq!(sum, 100.0);
    }

    #[test]
    fn test_equal_split_sum_invariant_across_member_counts() {
        for count in 1..=50 {
            let m = members(count);
            let splits = allocate(97.53, &m, SplitType::Equal, None).unwrap();
            let sum: f64 = splits.iter().map(|s| s.amount).sum();
            assert!(
                (sum - 97.53).abs() <= AMOUNT_EPSILON,
                "sum {} off for {} members",
                sum,
                count
            );
        }
    }

    #[test]
    fn test_equal_split_deterministic() {
        let m = members(7);
        let a = allocate(250.10, &m, SplitType::Equal, None).unwrap();
        let b = allocate(250.10, &m, SplitType::Equal, None).unwrap();
        assert_eq!(a, b);

        // Remainder lands on the last member of the given order
        let shares: Vec<f64> = a.iter().map(|s| s.amount).collect();
        for share in &shares[..shares.len() - 1] {
            assert_eq!(*share, shares[0]);
        }
    }

    #[test]
    fn test_equal_split_no_members() {
        assert_eq!(
            allocate(100.0, &[], SplitType::Equal, None),
            Err(SplitError::NoMembers)
        );
    }

    #[test]
    fn test_custom_split_ok() {
        let m = members(3);
        let custom = vec![
            Split::new(m[0], 50.0),
            Split::new(m[1], 30.0),
            Split::new(m[2], 20.0),
        ];
        let splits = allocate(100.0, &m, SplitType::Custom, Some(&custom)).unwrap();
        assert_eq!(splits, custom);
    }

    #[test]
    fn test_custom_split_mismatch_reports_difference() {
        let m = members(2);
        let custom = vec![Split::new(m[0], 60.0), Split::new(m[1], 35.0)];
        let err = allocate(100.0, &m, SplitType::Custom, Some(&custom)).unwrap_err();

        match err {
            SplitError::SplitMismatch {
                split_total,
                expense_amount,
                difference,
            } => {
                assert_eq!(split_total, 95.0);
                assert_eq!(expense_amount, 100.0);
                assert!((difference - 5.0).abs() < 1e-9);
            }
            other => panic!("expected SplitMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_split_within_tolerance_accepted() {
        let m = members(2);
        let custom = vec![Split::new(m[0], 50.0), Split::new(m[1], 49.995)];
        assert!(allocate(100.0, &m, SplitType::Custom, Some(&custom)).is_ok());
    }

    #[test]
    fn test_custom_split_non_member_rejected() {
        let m = members(2);
        let outsider = Uuid::new_v4();
        let custom = vec![Split::new(m[0], 50.0), Split::new(outsider, 50.0)];
        assert_eq!(
            allocate(100.0, &m, SplitType::Custom, Some(&custom)),
            Err(SplitError::InvalidMember(outsider))
        );
    }

    #[test]
    fn test_custom_split_non_positive_rejected() {
        let m = members(2);
        let custom = vec![Split::new(m[0], 100.0), Split::new(m[1], 0.0)];
        assert_eq!(
            allocate(100.0, &m, SplitType::Custom, Some(&custom)),
            Err(SplitError::NonPositiveSplit(m[1]))
        );
    }

    #[test]
    fn test_custom_split_missing_splits() {
        let m = members(2);
        assert_eq!(
            allocate(100.0, &m, SplitType::Custom, None),
            Err(SplitError::CustomSplitsRequired)
        );
        assert_eq!(
            allocate(100.0, &m, SplitType::Custom, Some(&[])),
            Err(SplitError::CustomSplitsRequired)
        );
    }

    #[test]
    fn test_tiny_total_drops_zero_shares() {
        let m = members(3);
        let splits = allocate(0.01, &m, SplitType::Equal, None).unwrap();
        // 0.01 / 3 rounds to 0.00 per head; the last member absorbs it all
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].user_id, m[2]);
        assert_eq!(splits[0].amount, 0.01);
    }
}
