use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use recast::entities::{AiSetting, RewriteLink, RewriteLinkUsage, RewriteLog, Site};
use recast::repositories::{LinkStore, LogStore, NewLogEntry, SettingsStore};
use std::sync::Mutex;

pub fn test_site(url: &str) -> Site {
    Site {
        id: 1,
        name: "Test Site".to_string(),
        url: url.to_string(),
        skip_external_links: true,
        allowed_tags: None,
        allowed_attributes: None,
        created_at: Utc::now(),
    }
}

/// Builds a chat-completion SSE body streaming `fragments` as separate delta
/// events, terminated by the done sentinel.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let event = serde_json::json!({
            "choices": [{"delta": {"content": fragment}}]
        });
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[derive(Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<NewLogEntry>>,
}

impl MemoryLogStore {
    pub fn entries(&self) -> Vec<NewLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: NewLogEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn recent(&self, site_id: i64, limit: i64) -> Result<Vec<RewriteLog>> {
        let entries = self.entries.lock().unwrap();
        let rows = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.site_id == site_id)
            .rev()
            .take(limit as usize)
            .map(|(i, e)| RewriteLog {
                id: i as i64 + 1,
                site_id: e.site_id,
                article_id: e.article_id,
                article_title: e.article_title.clone(),
                status: e.status,
                message: e.message.clone(),
                original_content: e.original_content.clone(),
                cleaned_content: e.cleaned_content.clone(),
                rewritten_content: e.rewritten_content.clone(),
                created_at: Utc::now(),
            })
            .collect();
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryLinkStore {
    links: Vec<RewriteLink>,
    usages: Mutex<Vec<RewriteLinkUsage>>,
}

impl MemoryLinkStore {
    pub fn with_links(urls: &[(&str, &str)]) -> Self {
        let links = urls
            .iter()
            .enumerate()
            .map(|(i, (url, domain))| RewriteLink {
                id: i as i64 + 1,
                url: url.to_string(),
                domain: domain.to_string(),
                anchor: None,
                created_at: Utc::now(),
            })
            .collect();
        Self {
            links,
            usages: Mutex::new(Vec::new()),
        }
    }

    pub fn usages(&self) -> Vec<RewriteLinkUsage> {
        self.usages.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn all_links(&self) -> Result<Vec<RewriteLink>> {
        Ok(self.links.clone())
    }

    async fn usages_for_site(&self, site_id: i64) -> Result<Vec<RewriteLinkUsage>> {
        Ok(self
            .usages
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.site_id == site_id)
            .cloned()
            .collect())
    }

    async fn record_usage(&self, site_id: i64, link_id: i64, article_id: i64) -> Result<()> {
        let mut usages = self.usages.lock().unwrap();
        let id = usages.len() as i64 + 1;
        usages.push(RewriteLinkUsage {
            id,
            site_id,
            rewrite_link_id: link_id,
            article_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn add_link(&self, url: &str, _anchor: Option<&str>) -> Result<RewriteLink> {
        Ok(RewriteLink {
            id: self.links.len() as i64 + 1,
            url: url.to_string(),
            domain: recast::links::domain_of(url),
            anchor: None,
            created_at: Utc::now(),
        })
    }
}

pub struct MemorySettingsStore {
    setting: Option<AiSetting>,
}

impl MemorySettingsStore {
    pub fn configured() -> Self {
        Self {
            setting: Some(AiSetting {
                id: 1,
                api_key: Some("test-key".to_string()),
                prompt: Some("Rewrite this article as JSON.".to_string()),
                temperature: Some(0.7),
                domain_usage_limit: 1,
            }),
        }
    }

    pub fn empty() -> Self {
        Self { setting: None }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn ai_settings(&self) -> Result<Option<AiSetting>> {
        Ok(self.setting.clone())
    }
}
