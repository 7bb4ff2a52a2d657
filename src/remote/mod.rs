pub mod client;
pub mod errors;
pub mod types;

pub use client::RemoteClient;
pub use errors::RemoteError;
pub use types::{Article, ArticleFilters, ArticleSummary, RemoteCategory, RemoteUser};
