//! Expense orchestration: validation, authorization, split allocation, and
//! transactional persistence.

use crate::error::{AppError, AppResult};
use crate::ledger;
use crate::models::{Category, Currency, Expense, Split, SplitType};
use crate::receipts::{ReceiptStore, ReceiptUpload};
use crate::repositories::{
    ExpenseRepository, GroupMemberRepository, GroupRepository, UserRepository,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const MAX_DESCRIPTION_LEN: usize = 200;

/// Input for creating an expense
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub group_id: Uuid,
    pub payer_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: Category,
    pub currency: Currency,
    pub split_type: SplitType,
    pub splits: Option<Vec<Split>>,
    #[serde(skip)]
    pub receipt: Option<ReceiptUpload>,
}

/// Input for updating an expense. `group_id` is the target group; it may
/// differ from the expense's current group, which moves the expense.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseUpdate {
    pub group_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: Category,
    pub currency: Currency,
    pub split_type: SplitType,
    pub splits: Option<Vec<Split>>,
}

/// Service for managing expense records
pub struct ExpenseService {
    expense_repo: Arc<ExpenseRepository>,
    group_repo: Arc<GroupRepository>,
    member_repo: Arc<GroupMemberRepository>,
    user_repo: Arc<UserRepository>,
    receipt_store: Arc<ReceiptStore>,
    max_amount: f64,
}

impl ExpenseService {
    pub fn new(
        expense_repo: Arc<ExpenseRepository>,
        group_repo: Arc<GroupRepository>,
        member_repo: Arc<GroupMemberRepository>,
        user_repo: Arc<UserRepository>,
        receipt_store: Arc<ReceiptStore>,
        max_amount: f64,
    ) -> Self {
        Self {
            expense_repo,
            group_repo,
            member_repo,
            user_repo,
            receipt_store,
            max_amount,
        }
    }

    /// Create an expense. The caller must be a member of the group, the payer
    /// must be a member, and the splits (allocated here) must reconcile with
    /// the amount. Persisting the expense and bumping the group's
    /// `total_spent` happen in one transaction.
    pub async fn create_expense(&self, caller_id: Uuid, input: NewExpense) -> AppResult<Expense> {
        let group = self
            .group_repo
            .find_by_id(input.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        if !self.member_repo.is_member(group.id, caller_id).await? {
            return Err(AppError::Forbidden(
                "You are not a member of this group".to_string(),
            ));
        }

        if !self.member_repo.is_member(group.id, input.payer_id).await? {
            return Err(AppError::Validation(
                "Specified payer is not a member of this group".to_string(),
            ));
        }

        let payer = self
            .user_repo
            .find_by_id(input.payer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Specified payer not found".to_string()))?;

        self.validate_amount(input.amount)?;
        let description = sanitize_description(&input.description)?;

        let member_ids = self.member_repo.member_ids(group.id).await?;
        let splits = ledger::allocate(
            input.amount,
            &member_ids,
            input.split_type,
            input.splits.as_deref(),
        )?;

        let receipt_url = match &input.receipt {
            Some(receipt) => Some(self.receipt_store.upload(receipt).await?),
            None => None,
        };

        let now = chrono::Utc::now().naive_utc();
        let expense = Expense {
            id: Uuid::new_v4(),
            group_id: group.id,
            amount: input.amount,
            currency: input.currency.as_str().to_string(),
            description,
            category: input.category.as_str().to_string(),
            payer_id: payer.id,
            split_type: input.split_type.as_str().to_string(),
            receipt_url,
            created_at: now,
            updated_at: now,
            splits,
        };

        self.expense_repo.create(&expense).await?;

        info!(
            expense_id = %expense.id,
            group_id = %group.id,
            payer = %payer.id,
            amount = expense.amount,
            split_type = %expense.split_type,
            "expense created"
        );

        Ok(expense)
    }

    /// Update an expense. Only the original payer or the group admin may do
    /// this. Splits are re-allocated against the target group's members; if
    /// the expense moves groups, both groups' totals are reconciled in the
    /// same transaction.
    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        caller_id: Uuid,
        input: ExpenseUpdate,
    ) -> AppResult<Expense> {
        let expense = self
            .expense_repo
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        let group = self
            .group_repo
            .find_by_id(expense.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        if expense.payer_id != caller_id && group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only expense payer or group admin can update this expense".to_string(),
            ));
        }

        let target_group = self
            .group_repo
            .find_by_id(input.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Target group not found".to_string()))?;

        if !self.member_repo.is_member(target_group.id, caller_id).await? {
            return Err(AppError::Forbidden(
                "Not a member of target group".to_string(),
            ));
        }

        if input.split_type == SplitType::Equal
            && input.splits.as_ref().is_some_and(|s| !s.is_empty())
        {
            return Err(AppError::Validation(
                "Splits should not be provided when split type is 'equal'".to_string(),
            ));
        }

        self.validate_amount(input.amount)?;
        let description = sanitize_description(&input.description)?;

        let member_ids = self.member_repo.member_ids(target_group.id).await?;
        let splits = ledger::allocate(
            input.amount,
            &member_ids,
            input.split_type,
            input.splits.as_deref(),
        )?;

        let old_group_id = expense.group_id;
        let old_amount = expense.amount;

        let updated = Expense {
            group_id: target_group.id,
            amount: input.amount,
            currency: input.currency.as_str().to_string(),
            description,
            category: input.category.as_str().to_string(),
            split_type: input.split_type.as_str().to_string(),
            updated_at: chrono::Utc::now().naive_utc(),
            splits,
            ..expense
        };

        self.expense_repo
            .update(&updated, old_group_id, old_amount)
            .await?;

        info!(
            expense_id = %updated.id,
            group_id = %updated.group_id,
            moved = old_group_id != updated.group_id,
            amount = updated.amount,
            "expense updated"
        );

        Ok(updated)
    }

    /// Delete an expense. Only the original payer or the group admin may do
    /// this. A failed receipt deletion is logged and does not block the
    /// operation.
    pub async fn delete_expense(&self, expense_id: Uuid, caller_id: Uuid) -> AppResult<()> {
        let expense = self
            .expense_repo
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        let group = self
            .group_repo
            .find_by_id(expense.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        if expense.payer_id != caller_id && group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only expense payer or group admin can delete this expense".to_string(),
            ));
        }

        if let Some(url) = &expense.receipt_url {
            if let Err(e) = self.receipt_store.delete(url).await {
                warn!(expense_id = %expense.id, receipt = %url, error = %e,
                    "failed to delete receipt, continuing with expense deletion");
            }
        }

        self.expense_repo.delete(&expense).await?;

        info!(expense_id = %expense.id, group_id = %group.id, amount = expense.amount,
            "expense deleted");

        Ok(())
    }

    /// Fetch one expense; caller must be a member of its group
    pub async fn get_expense(&self, expense_id: Uuid, caller_id: Uuid) -> AppResult<Expense> {
        let expense = self
            .expense_repo
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        if !self.member_repo.is_member(expense.group_id, caller_id).await? {
            return Err(AppError::Forbidden("Not a group member".to_string()));
        }

        Ok(expense)
    }

    /// All expenses in a group; caller must be a member
    pub async fn list_group_expenses(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<Vec<Expense>> {
        if !self.member_repo.is_member(group_id, caller_id).await? {
            return Err(AppError::Forbidden("Not a group member".to_string()));
        }

        Ok(self.expense_repo.find_by_group(group_id).await?)
    }

    fn validate_amount(&self, amount: f64) -> AppResult<()> {
        if amount <= 0.0 {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }
        if amount > self.max_amount {
            return Err(AppError::Validation("Amount too large".to_string()));
        }
        Ok(())
    }
}

fn sanitize_description(raw: &str) -> AppResult<String> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '<' && *c != '>').collect();

    if cleaned.is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    if cleaned.len() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be less than {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }

    Ok(cleaned)
}
