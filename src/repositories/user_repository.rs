use crate::models::User;
use sqlx::{Result as SqlxResult, SqlitePool};
use uuid::Uuid;

/// Repository for user data access
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user
    pub async fn create(&self, name: &str, email: &str) -> SqlxResult<User> {
        let user = User::new(name, email);

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find users matching any of the given emails
    pub async fn find_by_emails(&self, emails: &[String]) -> SqlxResult<Vec<User>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=emails.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, name, email, created_at FROM users WHERE email IN ({})",
            placeholders
        );

        let mut query = sqlx::query_as::<_, User>(&sql);
        for email in emails {
            query = query.bind(email);
        }

        query.fetch_all(&self.pool).await
    }
}
