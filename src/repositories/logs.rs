use crate::entities::{LogStatus, RewriteLog};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

/// Audit row to append; session-level events carry no article fields.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub site_id: i64,
    pub article_id: Option<i64>,
    pub article_title: Option<String>,
    pub status: LogStatus,
    pub message: String,
    pub original_content: Option<String>,
    pub cleaned_content: Option<String>,
    pub rewritten_content: Option<String>,
}

impl NewLogEntry {
    pub fn session(site_id: i64, status: LogStatus, message: impl Into<String>) -> Self {
        Self {
            site_id,
            article_id: None,
            article_title: None,
            status,
            message: message.into(),
            original_content: None,
            cleaned_content: None,
            rewritten_content: None,
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: NewLogEntry) -> Result<()>;
    async fn recent(&self, site_id: i64, limit: i64) -> Result<Vec<RewriteLog>>;
}

pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, entry: NewLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rewrite_logs
                (site_id, article_id, article_title, status, message,
                 original_content, cleaned_content, rewritten_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.site_id)
        .bind(entry.article_id)
        .bind(entry.article_title)
        .bind(entry.status)
        .bind(entry.message)
        .bind(entry.original_content)
        .bind(entry.cleaned_content)
        .bind(entry.rewritten_content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, site_id: i64, limit: i64) -> Result<Vec<RewriteLog>> {
        let rows = sqlx::query_as::<_, RewriteLog>(
            r#"
            SELECT * FROM rewrite_logs
            WHERE site_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(site_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
