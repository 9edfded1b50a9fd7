use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::lang::Language;

#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub response: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// One completed exchange. Written once, never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub response: String,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationRow> for ConversationRecord {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            language: Language::from_code(&row.language).unwrap_or_default(),
            message: row.message,
            response: row.response,
            created_at: row.created_at,
        }
    }
}
