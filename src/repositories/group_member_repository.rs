use crate::models::{GroupMember, MemberRole};
use sqlx::{Result as SqlxResult, SqlitePool};
use uuid::Uuid;

/// Repository for group member data access
pub struct GroupMemberRepository {
    pool: SqlitePool,
}

impl GroupMemberRepository {
    /// Create a new GroupMemberRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a member to a group
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> SqlxResult<GroupMember> {
        let member = GroupMember::new(group_id, user_id, role);

        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (group_id, user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(member.group_id)
        .bind(member.user_id)
        .bind(&member.role)
        .bind(member.joined_at)
        .execute(&self.pool)
        .await?;

        Ok(member)
    }

    /// Remove a member from a group
    pub async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> SqlxResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM group_members
            WHERE group_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Find all members of a group in canonical order
    pub async fn find_by_group(&self, group_id: Uuid) -> SqlxResult<Vec<GroupMember>> {
        sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT group_id, user_id, role, joined_at
            FROM group_members
            WHERE group_id = ?1
            ORDER BY joined_at ASC, rowid ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Member ids in canonical order (insertion order). This is the order the
    /// equal-split allocator iterates, so the last member here is the one who
    /// absorbs the rounding remainder.
    pub async fn member_ids(&self, group_id: Uuid) -> SqlxResult<Vec<Uuid>> {
        let members = self.find_by_group(group_id).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    /// Get the role of a member in a group
    pub async fn find_role(&self, group_id: Uuid, user_id: Uuid) -> SqlxResult<Option<MemberRole>> {
        let role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT role
            FROM group_members
            WHERE group_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.and_then(|r| MemberRole::from_str(&r).ok()))
    }

    /// Check if a user is a member of a group
    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> SqlxResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1
            FROM group_members
            WHERE group_id = ?1 AND user_id = ?2
            LIMIT 1
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Get member count for a group
    pub async fn count_by_group(&self, group_id: Uuid) -> SqlxResult<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM group_members
            WHERE group_id = ?1
            "#,
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
    }
}
