use serde::Deserialize;

/// Catalogue filters forwarded to the remote API.
#[derive(Debug, Clone)]
pub struct ArticleFilters {
    pub author: Option<i64>,
    pub category: Option<i64>,
    /// Excludes articles already carrying the remote processed marker.
    pub only_unprocessed: bool,
}

impl Default for ArticleFilters {
    fn default() -> Self {
        Self {
            author: None,
            category: None,
            only_unprocessed: true,
        }
    }
}

/// Catalogue entry returned by the `articles` task.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Full article returned by the `article` task.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub introtext: String,
    #[serde(default)]
    pub fulltext: String,
    #[serde(default)]
    pub metadata: ArticleMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default)]
    pub catid: Option<i64>,
    #[serde(default)]
    pub created_by: Option<i64>,
}

/// Author account on the remote site (`getusers` task).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

/// Content category on the remote site (`getcategories` task).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub level: Option<i64>,
}

/// --- Response envelopes ---

#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArticlesEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<ArticleSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArticleEnvelope {
    pub status: String,
    #[serde(flatten)]
    pub article: Option<Article>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub users: Vec<RemoteUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub categories: Vec<RemoteCategory>,
}
