//! Settlement orchestration: balance resolution, validation, and settlement
//! recording with split retirement.
//!
//! Concurrent settlements for the same debtor pair are serialized with an
//! in-process lock held from the balance read through the commit, so two
//! simultaneous requests cannot both settle the same outstanding amount.

use crate::error::{AppError, AppResult};
use crate::ledger::{self, round2, BalanceSummary, PairBalance, AMOUNT_EPSILON};
use crate::models::{Currency, PaymentMethod, Settlement, SettlementStatus};
use crate::repositories::{
    ExpenseRepository, GroupMemberRepository, GroupRepository, SettlementRepository,
    UserRepository,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;
use uuid::Uuid;

/// Input for recording a settlement
#[derive(Debug, Clone, Deserialize)]
pub struct NewSettlement {
    pub group_id: Uuid,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: f64,
    pub description: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub currency: Option<Currency>,
    /// Expenses to retire against, in the order retirement should walk them
    /// (typically oldest first). When absent the settlement only moves the
    /// settled total; no splits are touched.
    pub expense_ids: Option<Vec<Uuid>>,
}

/// Result of a recorded settlement
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub settlement: Settlement,
    /// Expenses the settlement was applied against, in retirement order
    pub settled_expense_ids: Vec<Uuid>,
    /// What the payer still owes the receiver after this settlement
    pub remaining_balance: f64,
}

/// One settlement in a user's history, tagged with their side of it
#[derive(Debug, Clone, Serialize)]
pub struct SettlementEntry {
    #[serde(flatten)]
    pub settlement: Settlement,
    pub direction: &'static str,
}

/// An unsettled debt between the user and one other group member
#[derive(Debug, Clone, Serialize)]
pub struct OutstandingEntry {
    pub group_id: Uuid,
    pub group_name: String,
    pub counterparty_id: Uuid,
    pub counterparty_name: String,
    pub balance: BalanceSummary,
    /// The pair's debt-relevant expenses, oldest first, ready to hand back
    /// as a settlement's `expense_ids`
    pub expense_ids: Vec<Uuid>,
}

/// Cross-group settlement dashboard for one user
#[derive(Debug, Clone, Serialize)]
pub struct SettlementsOverview {
    pub settlements: Vec<SettlementEntry>,
    pub outstanding: Vec<OutstandingEntry>,
    /// Total the user still owes others
    pub total_you_owe: f64,
    /// Total others still owe the user
    pub total_owed_to_you: f64,
    pub settled_count: usize,
}

type PairKey = (Uuid, Uuid, Uuid);

pub struct SettlementService {
    settlement_repo: Arc<SettlementRepository>,
    expense_repo: Arc<ExpenseRepository>,
    group_repo: Arc<GroupRepository>,
    member_repo: Arc<GroupMemberRepository>,
    user_repo: Arc<UserRepository>,
    max_amount: f64,
    pair_locks: Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>,
}

impl SettlementService {
    pub fn new(
        settlement_repo: Arc<SettlementRepository>,
        expense_repo: Arc<ExpenseRepository>,
        group_repo: Arc<GroupRepository>,
        member_repo: Arc<GroupMemberRepository>,
        user_repo: Arc<UserRepository>,
        max_amount: f64,
    ) -> Self {
        Self {
            settlement_repo,
            expense_repo,
            group_repo,
            member_repo,
            user_repo,
            max_amount,
            pair_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the current balance between two group members. Caller must be
    /// a member of the group; the summary reads as "user_a owes user_b" when
    /// the direction is `A_owes_B`.
    pub async fn resolve_balance(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<BalanceSummary> {
        if !self.member_repo.is_member(group_id, caller_id).await? {
            return Err(AppError::Forbidden(
                "You are not a member of this group".to_string(),
            ));
        }

        let balance = self.pair_balance(group_id, user_a, user_b).await?;
        Ok(BalanceSummary::from_outstanding(balance.outstanding()))
    }

    /// Record a settlement. The caller must be one of the two parties, both
    /// must be group members, and the amount must clear the validator against
    /// the freshly resolved balance. Persisting the settlement and retiring
    /// the payer's splits happen in one transaction; the pair lock covers the
    /// whole read-validate-write sequence.
    pub async fn create_settlement(
        &self,
        caller_id: Uuid,
        input: NewSettlement,
    ) -> AppResult<SettlementOutcome> {
        if caller_id != input.payer_id && caller_id != input.receiver_id {
            return Err(AppError::Forbidden(
                "You can only record settlements you are part of".to_string(),
            ));
        }

        if input.payer_id == input.receiver_id {
            return Err(AppError::Validation(
                "Payer and receiver must be different users".to_string(),
            ));
        }

        if input.amount <= 0.0 {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }
        if input.amount > self.max_amount {
            return Err(AppError::Validation("Amount too large".to_string()));
        }

        let group = self
            .group_repo
            .find_by_id(input.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

        for user_id in [input.payer_id, input.receiver_id] {
            if !self.member_repo.is_member(group.id, user_id).await? {
                return Err(AppError::Validation(
                    "Both users must be members of this group".to_string(),
                ));
            }
        }

        let lock = self.pair_lock(group.id, input.payer_id, input.receiver_id);
        let _guard = lock.lock().await;

        let expenses = self.expense_repo.find_by_group(group.id).await?;
        let balance = self
            .settled_pair_balance(group.id, input.payer_id, input.receiver_id, &expenses)
            .await?;

        ledger::validate_settlement(input.payer_id, input.receiver_id, input.amount, &balance)?;

        let settled_expense_ids = input.expense_ids.unwrap_or_default();

        let now = chrono::Utc::now().naive_utc();
        let settlement = Settlement {
            id: Uuid::new_v4(),
            group_id: group.id,
            payer_id: input.payer_id,
            receiver_id: input.receiver_id,
            amount: input.amount,
            currency: input.currency.unwrap_or_default().as_str().to_string(),
            description: input
                .description
                .unwrap_or_else(|| "Settlement payment".to_string()),
            payment_method: input.payment_method.as_str().to_string(),
            payment_date: input.payment_date.unwrap_or(now),
            notes: input.notes,
            status: SettlementStatus::Settled.as_str().to_string(),
            created_at: now,
        };

        self.settlement_repo
            .create_settled(&settlement, &settled_expense_ids)
            .await?;

        let remaining_balance = round2((balance.outstanding() - input.amount).max(0.0));

        info!(
            settlement_id = %settlement.id,
            group_id = %group.id,
            payer = %settlement.payer_id,
            receiver = %settlement.receiver_id,
            amount = settlement.amount,
            remaining = remaining_balance,
            "settlement recorded"
        );

        Ok(SettlementOutcome {
            settlement,
            settled_expense_ids,
            remaining_balance,
        })
    }

    /// Fetch one settlement; caller must be a member of its group
    pub async fn get_settlement(
        &self,
        settlement_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<Settlement> {
        let settlement = self
            .settlement_repo
            .find_by_id(settlement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Settlement not found".to_string()))?;

        if !self
            .member_repo
            .is_member(settlement.group_id, caller_id)
            .await?
        {
            return Err(AppError::Forbidden("Not a group member".to_string()));
        }

        Ok(settlement)
    }

    /// Cross-group dashboard: the user's settlement history (optionally
    /// filtered by group and/or status) plus every unsettled pairwise balance
    /// they are part of.
    pub async fn overview_for_user(
        &self,
        user_id: Uuid,
        group_filter: Option<Uuid>,
        status_filter: Option<SettlementStatus>,
    ) -> AppResult<SettlementsOverview> {
        let history = self
            .settlement_repo
            .find_for_user(user_id, group_filter, status_filter)
            .await?;
        let settled_count = history.iter().filter(|s| s.is_settled()).count();

        let settlements = history
            .into_iter()
            .map(|settlement| {
                let direction = settlement.direction_for(user_id);
                SettlementEntry {
                    settlement,
                    direction,
                }
            })
            .collect();

        let mut outstanding = Vec::new();
        let mut total_you_owe = 0.0;
        let mut total_owed_to_you = 0.0;

        for group in self.group_repo.find_for_user(user_id).await? {
            let expenses = self.expense_repo.find_by_group(group.id).await?;
            let member_ids = self.member_repo.member_ids(group.id).await?;

            for other_id in member_ids.into_iter().filter(|&id| id != user_id) {
                let balance = self
                    .settled_pair_balance(group.id, user_id, other_id, &expenses)
                    .await?;

                let amount = balance.outstanding();
                if amount.abs() < AMOUNT_EPSILON {
                    continue;
                }

                if amount > 0.0 {
                    total_you_owe += amount;
                } else {
                    total_owed_to_you += -amount;
                }

                let counterparty_name = self
                    .user_repo
                    .find_by_id(other_id)
                    .await?
                    .map(|u| u.name)
                    .unwrap_or_default();

                let expense_ids = expenses
                    .iter()
                    .filter(|e| e.payer_id == user_id || e.payer_id == other_id)
                    .map(|e| e.id)
                    .collect();

                outstanding.push(OutstandingEntry {
                    group_id: group.id,
                    group_name: group.name.clone(),
                    counterparty_id: other_id,
                    counterparty_name,
                    balance: BalanceSummary::from_outstanding(amount),
                    expense_ids,
                });
            }
        }

        Ok(SettlementsOverview {
            settlements,
            outstanding,
            total_you_owe: round2(total_you_owe),
            total_owed_to_you: round2(total_owed_to_you),
            settled_count,
        })
    }

    /// Resolve the pair balance from scratch: expense history plus the net of
    /// prior settled settlements in both directions.
    async fn pair_balance(
        &self,
        group_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<PairBalance> {
        let expenses = self.expense_repo.find_by_group(group_id).await?;
        self.settled_pair_balance(group_id, user_a, user_b, &expenses)
            .await
    }

    async fn settled_pair_balance(
        &self,
        group_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
        expenses: &[crate::models::Expense],
    ) -> AppResult<PairBalance> {
        let expense_balance = ledger::balance::expense_balance(expenses, user_a, user_b);

        let paid_forward = self
            .settlement_repo
            .sum_settled_between(group_id, user_a, user_b)
            .await?;
        let paid_back = self
            .settlement_repo
            .sum_settled_between(group_id, user_b, user_a)
            .await?;

        Ok(PairBalance::new(expense_balance, paid_forward - paid_back))
    }

    /// One lock per (group, unordered pair); the key orders the pair so both
    /// directions map to the same mutex.
    fn pair_lock(&self, group_id: Uuid, a: Uuid, b: Uuid) -> Arc<AsyncMutex<()>> {
        let key = if a <= b {
            (group_id, a, b)
        } else {
            (group_id, b, a)
        };

        let mut locks = self
            .pair_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key).or_default().clone()
    }
}
