use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group of users sharing expenses.
///
/// `total_spent` is a denormalized running sum of the group's expense
/// amounts, maintained transactionally by every expense mutation. It records
/// money spent, not money owed; settlements never touch it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub admin_id: Uuid,
    pub total_spent: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Group {
    /// Create a new Group owned by the given admin
    pub fn new(name: impl Into<String>, description: Option<String>, admin_id: Uuid) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            admin_id,
            total_spent: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}
