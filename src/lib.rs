//! QuickSplit Backend Library
//!
//! Shared-expense ledger: groups, expenses with equal/custom splits,
//! pairwise balance resolution, and settlement recording with split
//! retirement. This module exposes the backend components for use by tests
//! and other consumers.

pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod models;
pub mod receipts;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use receipts::ReceiptStore;
use repositories::*;
use services::{ExpenseService, GroupService, SettlementService};
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub user_repo: Arc<UserRepository>,
    pub group_repo: Arc<GroupRepository>,
    pub member_repo: Arc<GroupMemberRepository>,
    pub expense_repo: Arc<ExpenseRepository>,
    pub settlement_repo: Arc<SettlementRepository>,
    pub receipt_store: Arc<ReceiptStore>,
    pub group_service: Arc<GroupService>,
    pub expense_service: Arc<ExpenseService>,
    pub settlement_service: Arc<SettlementService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::SqlitePool, config: &AppConfig) -> Self {
        let database = Database::new(pool.clone());

        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let group_repo = Arc::new(GroupRepository::new(pool.clone()));
        let member_repo = Arc::new(GroupMemberRepository::new(pool.clone()));
        let expense_repo = Arc::new(ExpenseRepository::new(pool.clone()));
        let settlement_repo = Arc::new(SettlementRepository::new(pool));

        let receipt_store = Arc::new(ReceiptStore::new(config.receipt_dir.clone()));

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
            receipt_store.clone(),
            config.max_amount,
        ));

        let settlement_service = Arc::new(SettlementService::new(
            settlement_repo.clone(),
            expense_repo.clone(),
            group_repo.clone(),
            member_repo.clone(),
            user_repo.clone(),
            config.max_amount,
        ));

        Self {
            database,
            user_repo,
            group_repo,
            member_repo,
            expense_repo,
            settlement_repo,
            receipt_store,
            group_service,
            expense_service,
            settlement_service,
        }
    }
}
