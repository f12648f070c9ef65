use quicksplit_backend::database::run_migrations;
use quicksplit_backend::models::*;
use quicksplit_backend::receipts::ReceiptStore;
use quicksplit_backend::repositories::*;
use quicksplit_backend::services::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

const TEST_MAX_AMOUNT: f64 = 1_000_000.0;

/// Test database: a fresh in-memory SQLite instance per test, with the full
/// repository and service stack wired up.
pub struct TestDatabase {
    pub pool: SqlitePool,
    pub user_repo: Arc<UserRepository>,
    pub group_repo: Arc<GroupRepository>,
    pub member_repo: Arc<GroupMemberRepository>,
    pub expense_repo: Arc<ExpenseRepository>,
    pub settlement_repo: Arc<SettlementRepository>,
    pub group_service: Arc<GroupService>,
    pub expense_service: Arc<ExpenseService>,
    pub settlement_service: Arc<SettlementService>,
}

impl TestDatabase {
    /// Create a new in-memory test database and run migrations.
    ///
    /// The pool is pinned to a single connection with no idle/lifetime
    /// reaping: an in-memory SQLite database lives and dies with its
    /// connection, and each pooled connection would otherwise get its own
    /// empty database.
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("Failed to parse test database URL")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("Failed to create test database pool");

        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self::from_pool(pool)
    }

    /// Wire up repositories and services from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let group_repo = Arc::new(GroupRepository::new(pool.clone()));
        let member_repo = Arc::new(GroupMemberRepository::new(pool.clone()));
        let expense_repo = Arc::new(ExpenseRepository::new(pool.clone()));
        let settlement_repo = Arc::new(SettlementRepository::new(pool.clone()));

        let receipt_dir = std::env::temp_dir().join(format!("quicksplit-test-{}", Uuid::new_v4()));
        let receipt_store = Arc::new(ReceiptStore::new(receipt_dir));

        let group_service = Arc::new(GroupService::new(
            group_repo.clone(),
            user_repo.clone(),
            member_repo.clone(),
            expense_repo.clone(),
        ));

        let expense_service = Arc::new(ExpenseService::new(
            expense_repo.clone(),
            group_repo.clone(),
            member_repo.clone(),
            user_repo.clone(),
            receipt_store,
            TEST_MAX_AMOUNT,
        ));

        let settlement_service = Arc::new(SettlementService::new(
            settlement_repo.clone(),
            expense_repo.clone(),
            group_repo.clone(),
            member_repo.clone(),
            user_repo.clone(),
            TEST_MAX_AMOUNT,
        ));

        Self {
            pool,
            user_repo,
            group_repo,
            member_repo,
            expense_repo,
            settlement_repo,
            group_service,
            expense_service,
            settlement_service,
        }
    }
}

/// Test data fixtures: three users and a group with all of them as members.
/// Member order is alice (admin), bob, carol; carol is last and absorbs any
/// equal-split rounding remainder.
pub struct TestFixtures {
    pub alice: User,
    pub bob: User,
    pub carol: User,
    pub group: Group,
}

impl TestFixtures {
    pub async fn create(db: &TestDatabase) -> Self {
        let alice = db
            .user_repo
            .create("Alice", "alice@example.com")
            .await
            .expect("Failed to create alice");
        let bob = db
            .user_repo
            .create("Bob", "bob@example.com")
            .await
            .expect("Failed to create bob");
        let carol = db
            .user_repo
            .create("Carol", "carol@example.com")
            .await
            .expect("Failed to create carol");

        let group = db
            .group_service
            .create_group(
                alice.id,
                "Trip",
                Some("Test trip"),
                &[bob.email.clone(), carol.email.clone()],
            )
            .await
            .expect("Failed to create group");

        Self {
            alice,
            bob,
            carol,
            group,
        }
    }
}

/// Create an expense split equally among all group members
pub async fn create_equal_expense(
    db: &TestDatabase,
    group_id: Uuid,
    payer_id: Uuid,
    amount: f64,
) -> Expense {
    db.expense_service
        .create_expense(
            payer_id,
            NewExpense {
                group_id,
                payer_id,
                amount,
                description: "Test expense".to_string(),
                category: Category::General,
                currency: Currency::Inr,
                split_type: SplitType::Equal,
                splits: None,
                receipt: None,
            },
        )
        .await
        .expect("Failed to create equal expense")
}

/// Create an expense with caller-supplied splits
pub async fn create_custom_expense(
    db: &TestDatabase,
    group_id: Uuid,
    payer_id: Uuid,
    amount: f64,
    splits: Vec<Split>,
) -> Expense {
    db.expense_service
        .create_expense(
            payer_id,
            NewExpense {
                group_id,
                payer_id,
                amount,
                description: "Test expense".to_string(),
                category: Category::General,
                currency: Currency::Inr,
                split_type: SplitType::Custom,
                splits: Some(splits),
                receipt: None,
            },
        )
        .await
        .expect("Failed to create custom expense")
}

/// Record a settlement from payer to receiver, no retirement list
pub fn new_settlement(
    group_id: Uuid,
    payer_id: Uuid,
    receiver_id: Uuid,
    amount: f64,
) -> NewSettlement {
    NewSettlement {
        group_id,
        payer_id,
        receiver_id,
        amount,
        description: None,
        payment_method: PaymentMethod::Upi,
        payment_date: None,
        notes: None,
        currency: None,
        expense_ids: None,
    }
}

/// Assert two amounts are equal within the ledger tolerance
pub fn assert_amount_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.005,
        "expected {expected}, got {actual}"
    );
}
