use crate::entities::AiSetting;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The active AI configuration row; the lowest id wins.
    async fn ai_settings(&self) -> Result<Option<AiSetting>>;
}

pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn ai_settings(&self) -> Result<Option<AiSetting>> {
        let row = sqlx::query_as::<_, AiSetting>("SELECT * FROM ai_settings ORDER BY id LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
