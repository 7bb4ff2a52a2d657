//! Bulk rewrite orchestration.
//!
//! A run pages through the remote catalogue in fixed-size batches and drives
//! each article through sanitize, rewrite, interlink and write-back, with an
//! append-only audit trail. The catalogue shrinks while it is being paged
//! (every processed article drops out of the unprocessed filter), so paging
//! tracks attempted ids rather than trusting offsets alone.

use crate::ai::{AiClient, AiConfig, AiError, Rewrite};
use crate::entities::{LogStatus, Site};
use crate::links;
use crate::remote::{ArticleFilters, ArticleSummary, RemoteClient, RemoteError};
use crate::repositories::{LinkStore, LogStore, NewLogEntry, SettingsStore};
use crate::sanitizer;
use crate::stop::StopFlags;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

const BATCH_SIZE: usize = 20;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("AI settings are incomplete: missing {0}")]
    NotConfigured(&'static str),

    #[error("remote API error: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Counters for a completed bulk run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunResults {
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub target: u64,
}

enum Outcome {
    Processed,
    Skipped,
    Error,
}

/// Result category of a single-article step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Processed,
    Skipped,
    Error,
    Done,
}

/// Outcome of processing the next pending article, for step-at-a-time
/// drivers.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub status: StepStatus,
    pub message: String,
    pub article_id: Option<i64>,
    pub article_title: Option<String>,
    pub has_more: bool,
    pub total: u64,
}

struct RunSettings {
    ai: AiConfig,
    domain_limit: i64,
}

/// Per-site rewrite pipeline over a remote catalogue.
pub struct Rewriter {
    site: Site,
    site_host: String,
    remote: RemoteClient,
    ai: AiClient,
    links: Arc<dyn LinkStore>,
    logs: Arc<dyn LogStore>,
    settings: Arc<dyn SettingsStore>,
    stop: StopFlags,
}

impl Rewriter {
    pub fn new(
        site: Site,
        remote: RemoteClient,
        ai: AiClient,
        links: Arc<dyn LinkStore>,
        logs: Arc<dyn LogStore>,
        settings: Arc<dyn SettingsStore>,
        stop: StopFlags,
    ) -> Self {
        let site_host = site.host();
        Self {
            site,
            site_host,
            remote,
            ai,
            links,
            logs,
            settings,
            stop,
        }
    }

    /// Process the catalogue matching `filters`, up to `limit` articles when
    /// given. Individual article failures are logged and counted; catalogue
    /// and configuration failures abort the run.
    #[instrument(skip_all, fields(site = self.site.id))]
    pub async fn run(
        &self,
        filters: &ArticleFilters,
        limit: Option<u64>,
    ) -> Result<RunResults, RewriteError> {
        let settings = self.load_settings().await?;

        let total = self.remote.count(filters).await?;
        if total == 0 {
            self.log_session(LogStatus::Skipped, "No articles to process")
                .await;
            return Ok(RunResults::default());
        }

        let target = limit.unwrap_or(total);
        // The unprocessed filter shrinks the catalogue underneath the paging,
        // so iterations are bounded rather than offset-driven alone.
        let max_iterations = total.div_ceil(BATCH_SIZE as u64) + 10;

        let mut results = RunResults {
            target,
            ..RunResults::default()
        };
        let mut attempted: HashSet<i64> = HashSet::new();
        let mut offset: usize = 0;

        'run: for _ in 0..max_iterations {
            if results.processed >= target {
                break;
            }
            if self.stop.is_stopped(self.site.id) {
                info!("stop requested, ending run");
                self.log_session(LogStatus::Skipped, "Run stopped by user")
                    .await;
                break;
            }

            let page = self.remote.list(filters, BATCH_SIZE, offset).await?;
            if page.is_empty() {
                break;
            }

            let fresh: Vec<ArticleSummary> = page
                .into_iter()
                .filter(|a| !attempted.contains(&a.id))
                .collect();
            if fresh.is_empty() {
                // Whole page already attempted; move past it.
                offset += BATCH_SIZE;
                continue;
            }

            for summary in fresh {
                if results.processed >= target {
                    break 'run;
                }
                if self.stop.is_stopped(self.site.id) {
                    info!("stop requested, ending run");
                    self.log_session(LogStatus::Skipped, "Run stopped by user")
                        .await;
                    break 'run;
                }

                attempted.insert(summary.id);
                match self.process_article(&settings, &summary).await {
                    Ok(Outcome::Processed) => results.processed += 1,
                    Ok(Outcome::Skipped) => results.skipped += 1,
                    Ok(Outcome::Error) => results.errors += 1,
                    Err(err) => {
                        results.errors += 1;
                        error!(article = summary.id, error = %err, "article failed");
                        self.log_article(
                            &summary,
                            LogStatus::Error,
                            format!("Error: {err}"),
                            None,
                            None,
                            None,
                        )
                        .await;
                    }
                }
            }

            offset += BATCH_SIZE;
            if offset as u64 >= total {
                break;
            }
        }

        info!(
            processed = results.processed,
            skipped = results.skipped,
            errors = results.errors,
            "run finished"
        );
        Ok(results)
    }

    /// Process exactly one pending article at `offset` into the filtered
    /// catalogue, reporting the outcome instead of failing the caller. The
    /// stop flag is not consulted: a single step is its own bound.
    #[instrument(skip_all, fields(site = self.site.id, offset))]
    pub async fn run_one(&self, filters: &ArticleFilters, offset: usize) -> StepReport {
        let settings = match self.load_settings().await {
            Ok(settings) => settings,
            Err(err) => return StepReport::failure(err.to_string()),
        };

        let total = match self.remote.count(filters).await {
            Ok(total) => total,
            Err(err) => return StepReport::failure(format!("remote API error: {err}")),
        };
        if total == 0 {
            return StepReport::done("No articles to process", 0);
        }

        let page = match self.remote.list(filters, 1, offset).await {
            Ok(page) => page,
            Err(err) => return StepReport::failure(format!("remote API error: {err}")),
        };
        let Some(summary) = page.into_iter().next() else {
            return StepReport::done("No more articles", total);
        };

        let (status, message) = match self.process_article(&settings, &summary).await {
            Ok(Outcome::Processed) => (StepStatus::Processed, "Article processed".to_string()),
            Ok(Outcome::Skipped) => (StepStatus::Skipped, "Article skipped".to_string()),
            Ok(Outcome::Error) => (StepStatus::Error, "Article failed".to_string()),
            Err(err) => {
                error!(article = summary.id, error = %err, "article failed");
                self.log_article(
                    &summary,
                    LogStatus::Error,
                    format!("Error: {err}"),
                    None,
                    None,
                    None,
                )
                .await;
                (StepStatus::Error, format!("Error: {err}"))
            }
        };

        StepReport {
            status,
            message,
            article_id: Some(summary.id),
            article_title: Some(summary.title),
            has_more: total > 1,
            total,
        }
    }

    async fn load_settings(&self) -> Result<RunSettings, RewriteError> {
        let row = self
            .settings
            .ai_settings()
            .await?
            .ok_or(RewriteError::NotConfigured("settings row"))?;
        let api_key = row
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(RewriteError::NotConfigured("api key"))?;
        let prompt = row
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or(RewriteError::NotConfigured("prompt"))?;
        Ok(RunSettings {
            ai: AiConfig {
                api_key,
                prompt,
                temperature: row.temperature.unwrap_or(0.7),
            },
            domain_limit: row.domain_usage_limit,
        })
    }

    async fn process_article(
        &self,
        settings: &RunSettings,
        summary: &ArticleSummary,
    ) -> Result<Outcome, AiError> {
        let article = match self.remote.get(summary.id).await {
            Ok(Some(article)) => article,
            Ok(None) | Err(_) => {
                warn!(article = summary.id, "article content unavailable");
                self.log_article(
                    summary,
                    LogStatus::Error,
                    "Failed to fetch article content",
                    None,
                    None,
                    None,
                )
                .await;
                return Ok(Outcome::Error);
            }
        };

        let content = format!("{}{}", article.introtext, article.fulltext);

        if self.site.skip_external_links && sanitizer::has_external_link(&content, &self.site_host)
        {
            info!(article = summary.id, "external link found, skipping");
            self.log_article(
                summary,
                LogStatus::Skipped,
                "Article contains external links",
                Some(content),
                None,
                None,
            )
            .await;
            // Marked so it stops reappearing in the unprocessed catalogue.
            self.remote.mark_processed(summary.id).await;
            return Ok(Outcome::Skipped);
        }

        let cleaned = sanitizer::clean(
            &content,
            &self.site.tag_allow_list(),
            &self.site.attribute_allow_list(),
        );
        let cleaned_title = sanitizer::strip_tags(&summary.title);

        let rewrite = self
            .ai
            .rewrite(&settings.ai, &cleaned_title, &cleaned)
            .await?;

        let body = self
            .interlink(settings, summary.id, rewrite.body.clone())
            .await;

        // The snapshot records what was actually written back, interlink
        // included.
        let final_result = Rewrite {
            title: rewrite.title.clone(),
            description: rewrite.description.clone(),
            body: body.clone(),
        };
        let snapshot =
            serde_json::to_string_pretty(&final_result).unwrap_or_else(|_| body.clone());

        if !self
            .remote
            .update(summary.id, &rewrite.title, &body, &rewrite.description)
            .await
        {
            self.log_article(
                summary,
                LogStatus::Error,
                "Failed to write article back",
                Some(content),
                Some(cleaned),
                Some(snapshot),
            )
            .await;
            return Ok(Outcome::Error);
        }

        self.remote.mark_processed(summary.id).await;
        self.log_article(
            summary,
            LogStatus::Success,
            "Article processed",
            Some(content),
            Some(cleaned),
            Some(snapshot),
        )
        .await;
        info!(article = summary.id, "article processed");
        Ok(Outcome::Processed)
    }

    /// Weave one interlink into `body` when a candidate is available. The
    /// usage row is recorded before the weave: a failed weave still consumes
    /// the link, and two racing runs may select the same candidate before
    /// either records it (the unique constraint then fails the loser's
    /// recording, and its article proceeds without the link).
    async fn interlink(&self, settings: &RunSettings, article_id: i64, body: String) -> String {
        let pool = match self.links.all_links().await {
            Ok(pool) => pool,
            Err(err) => {
                warn!(error = %err, "link pool unavailable, skipping interlink");
                return body;
            }
        };
        let usages = match self.links.usages_for_site(self.site.id).await {
            Ok(usages) => usages,
            Err(err) => {
                warn!(error = %err, "link usages unavailable, skipping interlink");
                return body;
            }
        };

        let Some(link) = links::allocate(&pool, &usages, &self.site_host, settings.domain_limit)
        else {
            return body;
        };

        if let Err(err) = self
            .links
            .record_usage(self.site.id, link.id, article_id)
            .await
        {
            warn!(link = link.id, error = %err, "could not record link usage, skipping interlink");
            return body;
        }

        self.ai.weave_link(&settings.ai, &body, &link.url).await
    }

    async fn log_session(&self, status: LogStatus, message: &str) {
        let entry = NewLogEntry::session(self.site.id, status, message);
        if let Err(err) = self.logs.append(entry).await {
            error!(error = %err, "failed to append audit log");
        }
    }

    async fn log_article(
        &self,
        summary: &ArticleSummary,
        status: LogStatus,
        message: impl Into<String>,
        original: Option<String>,
        cleaned: Option<String>,
        rewritten: Option<String>,
    ) {
        let entry = NewLogEntry {
            site_id: self.site.id,
            article_id: Some(summary.id),
            article_title: Some(summary.title.clone()),
            status,
            message: message.into(),
            original_content: original,
            cleaned_content: cleaned,
            rewritten_content: rewritten,
        };
        if let Err(err) = self.logs.append(entry).await {
            error!(error = %err, "failed to append audit log");
        }
    }
}

impl StepReport {
    fn failure(message: String) -> Self {
        Self {
            status: StepStatus::Error,
            message,
            article_id: None,
            article_title: None,
            has_more: false,
            total: 0,
        }
    }

    fn done(message: &str, total: u64) -> Self {
        Self {
            status: StepStatus::Done,
            message: message.to_string(),
            article_id: None,
            article_title: None,
            has_more: false,
            total,
        }
    }
}
