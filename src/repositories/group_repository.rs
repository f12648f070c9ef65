use crate::models::Group;
use sqlx::{Result as SqlxResult, SqlitePool};
use uuid::Uuid;

/// Repository for group data access
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
    /// Create a new GroupRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a group
    pub async fn create(&self, group: &Group) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO expense_groups (id, name, description, admin_id, total_spent, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.admin_id)
        .bind(group.total_spent)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a group by id
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Group>> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT id, name, description, admin_id, total_spent, created_at, updated_at
            FROM expense_groups
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find all groups the user is a member of, most recently updated first
    pub async fn find_for_user(&self, user_id: Uuid) -> SqlxResult<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.description, g.admin_id, g.total_spent, g.created_at, g.updated_at
            FROM expense_groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?1
            ORDER BY g.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Update name and/or description
    pub async fn update_details(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> SqlxResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE expense_groups
            SET name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(chrono::Utc::now().naive_utc())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Delete a group. Members, expenses, splits, and settlements go with it
    /// via ON DELETE CASCADE.
    pub async fn delete(&self, id: Uuid) -> SqlxResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM expense_groups WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
