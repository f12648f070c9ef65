mod helpers;

use helpers::*;
use quicksplit_backend::error::AppError;
use quicksplit_backend::ledger::{BalanceDirection, SettlementError};
use quicksplit_backend::models::*;
use uuid::Uuid;

#[tokio::test]
async fn test_settlement_reduces_balance_by_exact_amount() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    // Alice pays 100 split equally; bob owes alice 33.33
    create_equal_expense(&db, f.group.id, f.alice.id, 100.0).await;

    let before = db
        .settlement_service
        .resolve_balance(f.group.id, f.bob.id, f.bob.id, f.alice.id)
        .await
        .expect("resolve failed");
    assert_eq!(before.direction, BalanceDirection::AOwesB);
    assert_amount_eq(before.amount, 33.33);

    let outcome = db
        .settlement_service
        .create_settlement(
            f.bob.id,
            new_settlement(f.group.id, f.bob.id, f.alice.id, 20.0),
        )
        .await
        .expect("settlement failed");
    assert_amount_eq(outcome.remaining_balance, 13.33);
    assert!(outcome.settlement.is_settled());

    let after = db
        .settlement_service
        .resolve_balance(f.group.id, f.bob.id, f.bob.id, f.alice.id)
        .await
        .expect("resolve failed");
    assert_eq!(after.direction, BalanceDirection::AOwesB);
    assert_amount_eq(after.amount, before.amount - 20.0);
}

#[tokio::test]
async fn test_full_settlement_settles_pair() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    create_equal_expense(&db, f.group.id, f.alice.id, 100.0).await;

    let outcome = db
        .settlement_service
        .create_settlement(
            f.bob.id,
            new_settlement(f.group.id, f.bob.id, f.alice.id, 33.33),
        )
        .await
        .expect("settlement failed");
    assert_amount_eq(outcome.remaining_balance, 0.0);

    let after = db
        .settlement_service
        .resolve_balance(f.group.id, f.bob.id, f.bob.id, f.alice.id)
        .await
        .expect("resolve failed");
    assert_eq!(after.direction, BalanceDirection::Settled);
    assert_eq!(after.amount, 0.0);
}

#[tokio::test]
async fn test_zero_balance_settle_rejected() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    // No expenses at all
    let result = db
        .settlement_service
        .create_settlement(
            f.bob.id,
            new_settlement(f.group.id, f.bob.id, f.alice.id, 10.0),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::Settlement(SettlementError::NoOutstandingBalance))
    ));
}

#[tokio::test]
async fn test_wrong_direction_suggests_exact_reversal() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    // Bob owes alice; alice attempts to pay bob
    create_equal_expense(&db, f.group.id, f.alice.id, 100.0).await;

    let result = db
        .settlement_service
        .create_settlement(
            f.alice.id,
            new_settlement(f.group.id, f.alice.id, f.bob.id, 33.33),
        )
        .await;

    match result {
        Err(AppError::Settlement(SettlementError::WrongDirection {
            suggested_payer,
            suggested_receiver,
            amount,
        })) => {
            assert_eq!(suggested_payer, f.bob.id);
            assert_eq!(suggested_receiver, f.alice.id);
            assert_amount_eq(amount, 33.33);
        }
        other => panic!("expected WrongDirection, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_exceeding_settlement_reports_max_amount() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    // Outstanding balance of exactly 40 from bob to alice
    create_custom_expense(
        &db,
        f.group.id,
        f.alice.id,
        80.0,
        vec![Split::new(f.alice.id, 40.0), Split::new(f.bob.id, 40.0)],
    )
    .await;

    let result = db
        .settlement_service
        .create_settlement(
            f.bob.id,
            new_settlement(f.group.id, f.bob.id, f.alice.id, 50.0),
        )
        .await;

    match result {
        Err(AppError::Settlement(SettlementError::ExceedsOutstanding {
            amount,
            max_amount,
            expense_balance,
            settled_balance,
        })) => {
            assert_amount_eq(amount, 50.0);
            assert_amount_eq(max_amount, 40.0);
            assert_amount_eq(expense_balance, 40.0);
            assert_amount_eq(settled_balance, 0.0);
        }
        other => panic!("expected ExceedsOutstanding, got {:?}", other.err()),
    }

    // No settlement persisted
    let settlements = db
        .settlement_repo
        .find_for_user(f.bob.id, None, None)
        .await
        .expect("query failed");
    assert!(settlements.is_empty());
}

#[tokio::test]
async fn test_split_retirement_walks_expenses_in_order() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    // Bob owes 20 on the first expense and 15 on the second
    let first = create_custom_expense(
        &db,
        f.group.id,
        f.alice.id,
        40.0,
        vec![Split::new(f.alice.id, 20.0), Split::new(f.bob.id, 20.0)],
    )
    .await;
    let second = create_custom_expense(
        &db,
        f.group.id,
        f.alice.id,
        30.0,
        vec![Split::new(f.alice.id, 15.0), Split::new(f.bob.id, 15.0)],
    )
    .await;

    let mut input = new_settlement(f.group.id, f.bob.id, f.alice.id, 30.0);
    input.expense_ids = Some(vec![first.id, second.id]);

    let outcome = db
        .settlement_service
        .create_settlement(f.bob.id, input)
        .await
        .expect("settlement failed");
    assert_eq!(outcome.settled_expense_ids, vec![first.id, second.id]);

    // First expense exhausted, second partially retired
    let first_after = db
        .expense_repo
        .find_by_id(first.id)
        .await
        .expect("query failed")
        .expect("expense missing");
    assert_amount_eq(first_after.split_for(f.bob.id).expect("split missing").amount, 0.0);

    let second_after = db
        .expense_repo
        .find_by_id(second.id)
        .await
        .expect("query failed")
        .expect("expense missing");
    assert_amount_eq(second_after.split_for(f.bob.id).expect("split missing").amount, 5.0);

    // Alice's own splits untouched
    assert_amount_eq(first_after.split_for(f.alice.id).expect("split missing").amount, 20.0);

    // Retirement order was recorded
    let ids = db
        .settlement_repo
        .expense_ids_for(outcome.settlement.id)
        .await
        .expect("query failed");
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn test_retirement_skips_missing_expense() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    let expense = create_custom_expense(
        &db,
        f.group.id,
        f.alice.id,
        40.0,
        vec![Split::new(f.alice.id, 20.0), Split::new(f.bob.id, 20.0)],
    )
    .await;

    let mut input = new_settlement(f.group.id, f.bob.id, f.alice.id, 10.0);
    input.expense_ids = Some(vec![Uuid::new_v4(), expense.id]);

    db.settlement_service
        .create_settlement(f.bob.id, input)
        .await
        .expect("settlement failed");

    let after = db
        .expense_repo
        .find_by_id(expense.id)
        .await
        .expect("query failed")
        .expect("expense missing");
    assert_amount_eq(after.split_for(f.bob.id).expect("split missing").amount, 10.0);
}

#[tokio::test]
async fn test_concurrent_full_settlements_admit_exactly_one() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    create_equal_expense(&db, f.group.id, f.alice.id, 100.0).await;

    let service = db.settlement_service.clone();
    let a = service.create_settlement(
        f.bob.id,
        new_settlement(f.group.id, f.bob.id, f.alice.id, 33.33),
    );
    let b = service.create_settlement(
        f.bob.id,
        new_settlement(f.group.id, f.bob.id, f.alice.id, 33.33),
    );

    let (ra, rb) = tokio::join!(a, b);
    let successes = [ra.is_ok(), rb.is_ok()].iter().filter(|&&ok| ok).count();
    assert_eq!(successes, 1, "exactly one of two competing settlements must win");

    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(
        loser,
        Err(AppError::Settlement(SettlementError::NoOutstandingBalance))
    ));
}

#[tokio::test]
async fn test_caller_must_be_party_to_settlement() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    create_equal_expense(&db, f.group.id, f.alice.id, 100.0).await;

    let result = db
        .settlement_service
        .create_settlement(
            f.carol.id,
            new_settlement(f.group.id, f.bob.id, f.alice.id, 10.0),
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_self_settlement_rejected() {
    let db = TestDatabase::new().await;
    let f = TestFixtures::create(&db).await;

    let result = db
        .settlement_service
        .create_settlement(
            f.bob.id,
            new_settlement(f.group.id, f.bob.id, f.bob.id, 10.0),
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}
