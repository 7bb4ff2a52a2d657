use crate::entities::{RewriteLink, RewriteLinkUsage};
use crate::links;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn all_links(&self) -> Result<Vec<RewriteLink>>;
    async fn usages_for_site(&self, site_id: i64) -> Result<Vec<RewriteLinkUsage>>;
    async fn record_usage(&self, site_id: i64, link_id: i64, article_id: i64) -> Result<()>;
    async fn add_link(&self, url: &str, anchor: Option<&str>) -> Result<RewriteLink>;
}

pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn all_links(&self) -> Result<Vec<RewriteLink>> {
        let rows = sqlx::query_as::<_, RewriteLink>("SELECT * FROM rewrite_links ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn usages_for_site(&self, site_id: i64) -> Result<Vec<RewriteLinkUsage>> {
        let rows = sqlx::query_as::<_, RewriteLinkUsage>(
            "SELECT * FROM rewrite_link_usages WHERE site_id = $1",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_usage(&self, site_id: i64, link_id: i64, article_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rewrite_link_usages (site_id, rewrite_link_id, article_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(site_id)
        .bind(link_id)
        .bind(article_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_link(&self, url: &str, anchor: Option<&str>) -> Result<RewriteLink> {
        let domain = links::domain_of(url);
        let row = sqlx::query_as::<_, RewriteLink>(
            r#"
            INSERT INTO rewrite_links (url, domain, anchor)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(domain)
        .bind(anchor)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
