use crate::remote::errors::RemoteError;
use crate::remote::types::{
    Article, ArticleEnvelope, ArticleFilters, ArticleSummary, ArticlesEnvelope, CategoriesEnvelope,
    CountEnvelope, RemoteCategory, RemoteUser, StatusEnvelope, UsersEnvelope,
};
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{instrument, warn};

const API_PATH: &str = "/index.php";
const COMPONENT: &str = "com_api";
const API_KEY_HEADER: &str = "X-Api-Key";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
});

/// Typed wrapper for the remote content API. Every call targets the site's
/// `<base>/index.php` with `option=com_api&task=<op>` query parameters and,
/// when a key is configured, an `X-Api-Key` header.
pub struct RemoteClient {
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteClient {
    pub fn new(site_url: &str, api_key: Option<String>) -> Self {
        Self {
            endpoint: format!("{}{}", site_url.trim_end_matches('/'), API_PATH),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Catalogue page of unprocessed article summaries.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, limit, offset))]
    pub async fn list(
        &self,
        filters: &ArticleFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ArticleSummary>, RemoteError> {
        let mut params = task_params("articles");
        push_filters(&mut params, filters);
        params.push(("limit".into(), limit.to_string()));
        if offset > 0 {
            params.push(("offset".into(), offset.to_string()));
        }
        let env: ArticlesEnvelope = self.get_json(&params).await?;
        ensure_ok(&env.status, env.message.as_deref())?;
        Ok(env.articles)
    }

    /// Total number of articles matching the filters.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn count(&self, filters: &ArticleFilters) -> Result<u64, RemoteError> {
        let mut params = task_params("articles_count");
        push_filters(&mut params, filters);
        let env: CountEnvelope = self.get_json(&params).await?;
        ensure_ok(&env.status, env.message.as_deref())?;
        Ok(env.count)
    }

    /// Full content of a single article. A response the remote refuses to
    /// serve (`status != ok`) reads as `None`; transport failures propagate.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, id))]
    pub async fn get(&self, id: i64) -> Result<Option<Article>, RemoteError> {
        let mut params = task_params("article");
        params.push(("id".into(), id.to_string()));
        let env: ArticleEnvelope = self.get_json(&params).await?;
        if env.status != "ok" {
            return Ok(None);
        }
        Ok(env.article)
    }

    /// Write the rewritten title/body/description back. Non-fatal: failures
    /// are logged and reported as `false`.
    pub async fn update(&self, id: i64, title: &str, body: &str, description: &str) -> bool {
        let mut params = task_params("article_update");
        params.push(("id".into(), id.to_string()));

        let mut payload = serde_json::json!({
            "title": title,
            "introtext": body,
        });
        if !description.is_empty() {
            payload["metadesc"] = serde_json::Value::String(description.to_string());
        }

        match self.post_json::<StatusEnvelope>(&params, &payload).await {
            Ok(env) if env.status == "ok" => true,
            Ok(env) => {
                warn!(article = id, status = %env.status, "article update rejected");
                false
            }
            Err(err) => {
                warn!(article = id, error = %err, "article update failed");
                false
            }
        }
    }

    /// Stamp the remote processed marker on an article. Non-fatal, like
    /// [`update`](Self::update).
    pub async fn mark_processed(&self, id: i64) -> bool {
        let mut params = task_params("article_mark_processed");
        params.push(("id".into(), id.to_string()));

        match self
            .post_json::<StatusEnvelope>(&params, &serde_json::json!({}))
            .await
        {
            Ok(env) if env.status == "ok" => true,
            Ok(env) => {
                warn!(article = id, status = %env.status, "mark-processed rejected");
                false
            }
            Err(err) => {
                warn!(article = id, error = %err, "mark-processed failed");
                false
            }
        }
    }

    /// Author accounts on the remote site, for filter selection.
    pub async fn list_authors(&self) -> Result<Vec<RemoteUser>, RemoteError> {
        let env: UsersEnvelope = self.get_json(&task_params("getusers")).await?;
        ensure_ok(&env.status, env.message.as_deref())?;
        Ok(env.users)
    }

    /// Content categories on the remote site, for filter selection.
    pub async fn list_categories(&self) -> Result<Vec<RemoteCategory>, RemoteError> {
        let env: CategoriesEnvelope = self.get_json(&task_params("getcategories")).await?;
        ensure_ok(&env.status, env.message.as_deref())?;
        Ok(env.categories)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(String, String)],
    ) -> Result<T, RemoteError> {
        let mut request = HTTP_CLIENT.get(&self.endpoint).query(params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Http(status));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        params: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<T, RemoteError> {
        let mut request = HTTP_CLIENT.post(&self.endpoint).query(params).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Http(status));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn task_params(task: &str) -> Vec<(String, String)> {
    vec![
        ("option".into(), COMPONENT.into()),
        ("task".into(), task.into()),
    ]
}

fn push_filters(params: &mut Vec<(String, String)>, filters: &ArticleFilters) {
    params.push((
        "onlyUnprocessed".into(),
        if filters.only_unprocessed { "1" } else { "0" }.into(),
    ));
    if let Some(author) = filters.author {
        params.push(("author".into(), author.to_string()));
    }
    if let Some(category) = filters.category {
        params.push(("category".into(), category.to_string()));
    }
}

fn ensure_ok(status: &str, message: Option<&str>) -> Result<(), RemoteError> {
    if status == "ok" {
        Ok(())
    } else {
        Err(RemoteError::Api {
            status: status.to_string(),
            message: message.unwrap_or_default().to_string(),
        })
    }
}
