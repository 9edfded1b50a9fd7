pub mod models;

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::lang::Language;
use models::{ConversationRecord, ConversationRow};

/// Append-only conversation log in a local SQLite file.
#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Private in-memory database, kept alive by a single pinned connection.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                language TEXT NOT NULL,
                created_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Conversation Log ───────────────────────────────────────────

    pub async fn insert_record(
        &self,
        user_id: i64,
        message: &str,
        response: &str,
        language: Language,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (user_id, message, response, language, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(response)
        .bind(language.code())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Append an exchange. Failures are logged, never returned.
    pub async fn record(&self, user_id: i64, message: &str, response: &str, language: Language) {
        if let Err(e) = self.insert_record(user_id, message, response, language).await {
            tracing::error!("Failed to record conversation for user {}: {}", user_id, e);
        }
    }

    /// The user's last `limit` exchanges, oldest first.
    pub async fn recent(&self, user_id: i64, limit: i64) -> anyhow::Result<Vec<ConversationRecord>> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, user_id, message, response, language, created_at
            FROM conversations
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().rev().map(ConversationRecord::from).collect())
    }

    /// Recent exchanges as alternating turns, or an empty string.
    pub async fn history(&self, user_id: i64, limit: i64) -> String {
        match self.recent(user_id, limit).await {
            Ok(records) => format_history(&records),
            Err(e) => {
                tracing::error!("Failed to load history for user {}: {}", user_id, e);
                String::new()
            }
        }
    }
}

pub fn format_history(records: &[ConversationRecord]) -> String {
    records
        .iter()
        .map(|r| format!("User: {}\nZiya: {}", r.message, r.response))
        .collect::<Vec<_>>()
        .join("\n")
}
