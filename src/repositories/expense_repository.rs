//! Repository for expense records and their splits.
//!
//! Every mutation that touches both an expense and its group's `total_spent`
//! runs inside one transaction. The balance resolver reads these rows as
//! ground truth, so a partially applied update would corrupt every derived
//! balance in the group.

use crate::error::RepositoryError;
use crate::models::{Expense, Split};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new expense with its splits and add its amount to the
    /// owning group's total, atomically.
    pub async fn create(&self, expense: &Expense) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO expenses
                (id, group_id, amount, currency, description, category, payer_id,
                 split_type, receipt_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(expense.id)
        .bind(expense.group_id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(expense.payer_id)
        .bind(&expense.split_type)
        .bind(&expense.receipt_url)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_splits(&mut tx, expense.id, &expense.splits).await?;
        adjust_total_spent(&mut tx, expense.group_id, expense.amount).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Replace an expense's mutable fields and splits, reconciling group
    /// totals. When the expense moved groups the old group loses the old
    /// amount and the new group gains the new one; otherwise the owning
    /// group absorbs the delta. All of it commits or none of it does.
    pub async fn update(
        &self,
        expense: &Expense,
        old_group_id: Uuid,
        old_amount: f64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE expenses
            SET group_id = ?2, amount = ?3, currency = ?4, description = ?5,
                category = ?6, split_type = ?7, receipt_url = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(expense.id)
        .bind(expense.group_id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(&expense.split_type)
        .bind(&expense.receipt_url)
        .bind(expense.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM expense_splits WHERE expense_id = ?1")
            .bind(expense.id)
            .execute(&mut *tx)
            .await?;
        insert_splits(&mut tx, expense.id, &expense.splits).await?;

        if expense.group_id != old_group_id {
            adjust_total_spent(&mut tx, old_group_id, -old_amount).await?;
            adjust_total_spent(&mut tx, expense.group_id, expense.amount).await?;
        } else {
            let delta = expense.amount - old_amount;
            if delta != 0.0 {
                adjust_total_spent(&mut tx, expense.group_id, delta).await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Delete an expense and subtract its amount from the group total,
    /// atomically. Splits cascade with the expense row.
    pub async fn delete(&self, expense: &Expense) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(expense.id)
            .execute(&mut *tx)
            .await?;

        adjust_total_spent(&mut tx, expense.group_id, -expense.amount).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Find an expense by id, splits attached
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, group_id, amount, currency, description, category, payer_id,
                   split_type, receipt_url, created_at, updated_at
            FROM expenses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut expense) = expense else {
            return Ok(None);
        };

        expense.splits = sqlx::query_as::<_, Split>(
            r#"
            SELECT user_id, amount
            FROM expense_splits
            WHERE expense_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(expense))
    }

    /// All expenses in a group in chronological order, splits attached
    pub async fn find_by_group(&self, group_id: Uuid) -> Result<Vec<Expense>, RepositoryError> {
        let mut expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, group_id, amount, currency, description, category, payer_id,
                   split_type, receipt_url, created_at, updated_at
            FROM expenses
            WHERE group_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        // One query for every split in the group, then fan out
        #[derive(sqlx::FromRow)]
        struct SplitRow {
            expense_id: Uuid,
            user_id: Uuid,
            amount: f64,
        }

        let rows = sqlx::query_as::<_, SplitRow>(
            r#"
            SELECT s.expense_id, s.user_id, s.amount
            FROM expense_splits s
            JOIN expenses e ON e.id = s.expense_id
            WHERE e.group_id = ?1
            ORDER BY s.position ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_expense: HashMap<Uuid, Vec<Split>> = HashMap::new();
        for row in rows {
            by_expense
                .entry(row.expense_id)
                .or_default()
                .push(Split::new(row.user_id, row.amount));
        }

        for expense in &mut expenses {
            if let Some(splits) = by_expense.remove(&expense.id) {
                expense.splits = splits;
            }
        }

        Ok(expenses)
    }

    /// Number of expenses in a group
    pub async fn count_by_group(&self, group_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE group_id = ?1")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_splits(
    tx: &mut Transaction<'_, Sqlite>,
    expense_id: Uuid,
    splits: &[Split],
) -> Result<(), RepositoryError> {
    for (position, split) in splits.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO expense_splits (expense_id, user_id, amount, position)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(expense_id)
        .bind(split.user_id)
        .bind(split.amount)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn adjust_total_spent(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: Uuid,
    delta: f64,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE expense_groups
        SET total_spent = total_spent + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(group_id)
    .bind(delta)
    .bind(chrono::Utc::now().naive_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
