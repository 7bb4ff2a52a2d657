use anyhow::Context;
use recast::ai::AiClient;
use recast::config::Config;
use recast::remote::{ArticleFilters, RemoteClient};
use recast::repositories::{PgLinkStore, PgLogStore, PgSettingsStore, PgSiteStore};
use recast::rewriter::Rewriter;
use recast::stop::StopFlags;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url())
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let site_id: i64 = env::var("SITE_ID")
        .context("SITE_ID is required")?
        .parse()
        .context("SITE_ID must be an integer")?;
    let filters = ArticleFilters {
        author: env::var("AUTHOR_ID").ok().and_then(|v| v.parse().ok()),
        category: env::var("CATEGORY_ID").ok().and_then(|v| v.parse().ok()),
        ..ArticleFilters::default()
    };
    let limit: Option<u64> = env::var("LIMIT").ok().and_then(|v| v.parse().ok());

    let site = PgSiteStore::new(pool.clone())
        .get(site_id)
        .await?
        .with_context(|| format!("site {site_id} not found"))?;
    info!(site = site.id, name = %site.name, "starting rewrite run");

    let remote = RemoteClient::new(&site.url, config.remote_api_key().map(str::to_owned));
    let ai = AiClient::new(config.ai_base_url());
    let stop = StopFlags::new();
    stop.clear(site.id);

    let rewriter = Rewriter::new(
        site,
        remote,
        ai,
        Arc::new(PgLinkStore::new(pool.clone())),
        Arc::new(PgLogStore::new(pool.clone())),
        Arc::new(PgSettingsStore::new(pool)),
        stop,
    );

    let results = rewriter.run(&filters, limit).await?;
    info!(
        processed = results.processed,
        skipped = results.skipped,
        errors = results.errors,
        target = results.target,
        "rewrite run complete"
    );
    Ok(())
}
