//! Service for managing groups and their membership.

use crate::error::{AppError, AppResult};
use crate::ledger;
use crate::models::{Expense, Group, MemberRole, User};
use crate::repositories::{
    ExpenseRepository, GroupMemberRepository, GroupRepository, UserRepository,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A group as shown in a user's group list, with the derived aggregates every
/// view shares. `total_spent` and `your_balance` both come out of the ledger
/// module so no caller re-derives them independently.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOverview {
    pub group: Group,
    pub member_count: i64,
    pub total_spent: f64,
    pub your_balance: f64,
}

/// Member-only detail view of one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub group: Group,
    pub members: Vec<User>,
    pub expenses: Vec<Expense>,
    pub total_expenses: i64,
    pub total_amount: f64,
}

/// Report returned by a cascade delete
#[derive(Debug, Clone, Serialize)]
pub struct GroupDeletion {
    pub deleted_expenses: i64,
    pub affected_members: i64,
}

pub struct GroupService {
    group_repo: Arc<GroupRepository>,
    user_repo: Arc<UserRepository>,
    member_repo: Arc<GroupMemberRepository>,
    expense_repo: Arc<ExpenseRepository>,
}

impl GroupService {
    pub fn new(
        group_repo: Arc<GroupRepository>,
        user_repo: Arc<UserRepository>,
        member_repo: Arc<GroupMemberRepository>,
        expense_repo: Arc<ExpenseRepository>,
    ) -> Self {
        Self {
            group_repo,
            user_repo,
            member_repo,
            expense_repo,
        }
    }

    /// Create a group. Every member email must belong to a registered user;
    /// the admin is always a member.
    pub async fn create_group(
        &self,
        admin_id: Uuid,
        name: &str,
        description: Option<&str>,
        member_emails: &[String],
    ) -> AppResult<Group> {
        let admin = self
            .user_repo
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Group name is required".to_string()));
        }

        let mut emails: Vec<String> = member_emails.to_vec();
        emails.sort();
        emails.dedup();
        emails.retain(|e| *e != admin.email);

        let members = self.user_repo.find_by_emails(&emails).await?;
        if members.len() != emails.len() {
            return Err(AppError::Validation(
                "One or more members are not registered users".to_string(),
            ));
        }

        let group = Group::new(name, description.map(|d| d.to_string()), admin.id);
        self.group_repo.create(&group).await?;

        // Admin is the first member; the rest follow in email order
        self.member_repo
            .add_member(group.id, admin.id, MemberRole::Admin)
            .await?;
        for member in &members {
            self.member_repo
                .add_member(group.id, member.id, MemberRole::Member)
                .await?;
        }

        info!(group_id = %group.id, name = %group.name, admin = %admin.id,
            members = members.len() + 1, "group created");

        Ok(group)
    }

    /// Update group name/description (admin only)
    pub async fn update_group(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Group> {
        let group = self.require_group(group_id).await?;

        if group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only group admin can update group details".to_string(),
            ));
        }

        self.group_repo
            .update_details(group_id, name, description)
            .await?;

        Ok(self.require_group(group_id).await?)
    }

    /// Add members by email (admin only). Emails that do not resolve to
    /// registered users, or that are already members, are rejected.
    pub async fn add_members(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
        emails: &[String],
    ) -> AppResult<Vec<User>> {
        let group = self.require_group(group_id).await?;

        if group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only group admin can add members".to_string(),
            ));
        }

        let users = self.user_repo.find_by_emails(emails).await?;
        if users.is_empty() {
            return Err(AppError::Validation(
                "No valid users found for the provided emails".to_string(),
            ));
        }

        let mut added = Vec::new();
        for user in users {
            if self.member_repo.is_member(group_id, user.id).await? {
                continue;
            }
            self.member_repo
                .add_member(group_id, user.id, MemberRole::Member)
                .await?;
            added.push(user);
        }

        if added.is_empty() {
            return Err(AppError::Validation(
                "All provided users are already group members".to_string(),
            ));
        }

        info!(group_id = %group_id, added = added.len(), "members added");

        Ok(added)
    }

    /// Remove members (admin only). The admin cannot be removed.
    pub async fn remove_members(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
        user_ids: &[Uuid],
    ) -> AppResult<u64> {
        let group = self.require_group(group_id).await?;

        if group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only group admin can remove members".to_string(),
            ));
        }

        if user_ids.contains(&group.admin_id) {
            return Err(AppError::Validation(
                "Group admin cannot be removed".to_string(),
            ));
        }

        let mut removed = 0;
        for &user_id in user_ids {
            if self.member_repo.remove_member(group_id, user_id).await? {
                removed += 1;
            }
        }

        info!(group_id = %group_id, removed, "members removed");

        Ok(removed)
    }

    /// Delete a group and everything in it (admin only). Expenses, splits,
    /// memberships, and settlements cascade with the group row in a single
    /// statement's transaction.
    pub async fn delete_group(&self, group_id: Uuid, caller_id: Uuid) -> AppResult<GroupDeletion> {
        let group = self.require_group(group_id).await?;

        if group.admin_id != caller_id {
            return Err(AppError::Forbidden(
                "Only group admin can delete the group".to_string(),
            ));
        }

        let deleted_expenses = self.expense_repo.count_by_group(group_id).await?;
        let affected_members = self.member_repo.count_by_group(group_id).await?;

        self.group_repo.delete(group_id).await?;

        info!(group_id = %group_id, deleted_expenses, affected_members, "group deleted");

        Ok(GroupDeletion {
            deleted_expenses,
            affected_members,
        })
    }

    /// Member-only detail view with expenses and derived statistics
    pub async fn get_group(&self, group_id: Uuid, caller_id: Uuid) -> AppResult<GroupDetail> {
        let group = self.require_group(group_id).await?;

        if !self.member_repo.is_member(group_id, caller_id).await? {
            return Err(AppError::Forbidden(
                "You are not a member of this group".to_string(),
            ));
        }

        let memberships = self.member_repo.find_by_group(group_id).await?;
        let mut members = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            if let Some(user) = self.user_repo.find_by_id(membership.user_id).await? {
                members.push(user);
            }
        }

        let expenses = self.expense_repo.find_by_group(group_id).await?;
        let total_expenses = expenses.len() as i64;
        let total_amount = ledger::balance::total_spent(&expenses);

        Ok(GroupDetail {
            group,
            members,
            expenses,
            total_expenses,
            total_amount,
        })
    }

    /// All groups the user belongs to, with the shared derived aggregates
    pub async fn list_groups(&self, user_id: Uuid) -> AppResult<Vec<GroupOverview>> {
        let groups = self.group_repo.find_for_user(user_id).await?;

        let mut overviews = Vec::with_capacity(groups.len());
        for group in groups {
            let expenses = self.expense_repo.find_by_group(group.id).await?;
            let member_count = self.member_repo.count_by_group(group.id).await?;

            let total_spent = ledger::balance::total_spent(&expenses);
            let your_balance = ledger::balance::member_position(&expenses, user_id);

            overviews.push(GroupOverview {
                group,
                member_count,
                total_spent,
                your_balance,
            });
        }

        Ok(overviews)
    }

    async fn require_group(&self, group_id: Uuid) -> AppResult<Group> {
        self.group_repo
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
    }
}
