use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tag allow-list applied when a site has no override configured.
pub const DEFAULT_ALLOWED_TAGS: &str =
    "p,h2,h3,h4,h5,img,br,li,ul,ol,i,em,table,tr,td,u,th,thead,tbody";
/// Attribute allow-list applied when a site has no override configured.
pub const DEFAULT_ALLOWED_ATTRIBUTES: &str = "src";

/// --- PostgreSQL Enums ---
#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(type_name = "log_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
    Skipped,
}

/// --- Tables ---

/// A remote content site the rewriter runs against.
#[derive(Debug, Clone, FromRow)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub skip_external_links: bool,
    pub allowed_tags: Option<String>,       // comma-separated override
    pub allowed_attributes: Option<String>, // comma-separated override
    pub created_at: DateTime<Utc>,
}

impl Site {
    /// Host component of the site URL, empty when the URL does not parse.
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_default()
    }

    pub fn tag_allow_list(&self) -> Vec<String> {
        parse_list(self.allowed_tags.as_deref(), DEFAULT_ALLOWED_TAGS)
    }

    pub fn attribute_allow_list(&self) -> Vec<String> {
        parse_list(self.allowed_attributes.as_deref(), DEFAULT_ALLOWED_ATTRIBUTES)
    }
}

fn parse_list(value: Option<&str>, default: &str) -> Vec<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Reusable external URL available for interlinking.
#[derive(Debug, Clone, FromRow)]
pub struct RewriteLink {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub anchor: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One use of a link on a site; at most one row per (site, link).
#[derive(Debug, Clone, FromRow)]
pub struct RewriteLinkUsage {
    pub id: i64,
    pub site_id: i64,
    pub rewrite_link_id: i64,
    pub article_id: i64, // remote article id
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row, one per processed article or session-level event.
#[derive(Debug, Clone, FromRow)]
pub struct RewriteLog {
    pub id: i64,
    pub site_id: i64,
    pub article_id: Option<i64>, // None for session-level events
    pub article_title: Option<String>,
    pub status: LogStatus,
    pub message: String,
    pub original_content: Option<String>,
    pub cleaned_content: Option<String>,
    pub rewritten_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// AI rewriting configuration; the first row wins.
#[derive(Debug, Clone, FromRow)]
pub struct AiSetting {
    pub id: i64,
    pub api_key: Option<String>,
    pub prompt: Option<String>,
    pub temperature: Option<f64>,
    pub domain_usage_limit: i64,
}
