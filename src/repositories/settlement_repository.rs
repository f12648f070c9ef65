//! Repository for settlement records.
//!
//! Settlement creation and split retirement share one transaction: either
//! the settlement lands together with every split reduction, or nothing
//! does.

use crate::error::RepositoryError;
use crate::models::{Settlement, SettlementStatus};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a settlement and retire the payer's splits on the referenced
    /// expenses, in the given order, until the settlement amount is
    /// exhausted.
    ///
    /// The expense-id order is the caller's and is authoritative (typically
    /// chronological). A missing expense is skipped with a warning; it only
    /// means later balance reads see one fewer reduced split, never corrupt
    /// state. Split amounts never go below zero, and the group's
    /// `total_spent` is deliberately untouched: it records money spent, not
    /// money owed.
    pub async fn create_settled(
        &self,
        settlement: &Settlement,
        expense_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO settlements
                (id, group_id, payer_id, receiver_id, amount, currency, description,
                 payment_method, payment_date, notes, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(settlement.id)
        .bind(settlement.group_id)
        .bind(settlement.payer_id)
        .bind(settlement.receiver_id)
        .bind(settlement.amount)
        .bind(&settlement.currency)
        .bind(&settlement.description)
        .bind(&settlement.payment_method)
        .bind(settlement.payment_date)
        .bind(&settlement.notes)
        .bind(&settlement.status)
        .bind(settlement.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, expense_id) in expense_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO settlement_expenses (settlement_id, expense_id, position)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(settlement.id)
            .bind(expense_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        let mut remaining = settlement.amount;

        for &expense_id in expense_ids {
            if remaining <= 0.0 {
                break;
            }

            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM expenses WHERE id = ?1")
                .bind(expense_id)
                .fetch_optional(&mut *tx)
                .await?;

            if exists.is_none() {
                warn!(
                    settlement_id = %settlement.id,
                    expense_id = %expense_id,
                    "skipping missing expense during split retirement"
                );
                continue;
            }

            let split_amount: Option<f64> = sqlx::query_scalar(
                r#"
                SELECT amount
                FROM expense_splits
                WHERE expense_id = ?1 AND user_id = ?2
                "#,
            )
            .bind(expense_id)
            .bind(settlement.payer_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(split_amount) = split_amount else {
                continue;
            };

            let reduce = split_amount.min(remaining);
            if reduce <= 0.0 {
                continue;
            }

            sqlx::query(
                r#"
                UPDATE expense_splits
                SET amount = amount - ?3
                WHERE expense_id = ?1 AND user_id = ?2
                "#,
            )
            .bind(expense_id)
            .bind(settlement.payer_id)
            .bind(reduce)
            .execute(&mut *tx)
            .await?;

            remaining -= reduce;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Total settled amount paid from `payer` to `receiver` within a group
    pub async fn sum_settled_between(
        &self,
        group_id: Uuid,
        payer_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<f64, RepositoryError> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0.0)
            FROM settlements
            WHERE group_id = ?1 AND payer_id = ?2 AND receiver_id = ?3 AND status = ?4
            "#,
        )
        .bind(group_id)
        .bind(payer_id)
        .bind(receiver_id)
        .bind(SettlementStatus::Settled.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Find a settlement by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Settlement>, RepositoryError> {
        let settlement = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT id, group_id, payer_id, receiver_id, amount, currency, description,
                   payment_method, payment_date, notes, status, created_at
            FROM settlements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settlement)
    }

    /// Settlements where the user is payer or receiver, newest first,
    /// optionally narrowed to one group and/or status
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        group_id: Option<Uuid>,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, RepositoryError> {
        let settlements = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT id, group_id, payer_id, receiver_id, amount, currency, description,
                   payment_method, payment_date, notes, status, created_at
            FROM settlements
            WHERE (payer_id = ?1 OR receiver_id = ?1)
              AND (?2 IS NULL OR group_id = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(settlements)
    }

    /// The expense ids a settlement was recorded against, in retirement order
    pub async fn expense_ids_for(&self, settlement_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT expense_id
            FROM settlement_expenses
            WHERE settlement_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(settlement_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
