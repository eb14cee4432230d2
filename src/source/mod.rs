//! Content source - access to the external document store

mod prismic;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::content::{Cursor, Page, PostDetail};

pub use prismic::PrismicClient;

/// Errors raised while talking to the content source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid content endpoint {0:?}")]
    InvalidEndpoint(String),

    #[error("cursor does not point at the content API: {0}")]
    ForeignCursor(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no answer for {what} within {after:?}")]
    TimedOut { what: String, after: Duration },

    #[error("the repository has no master ref")]
    MissingMasterRef,

    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

/// Read access to post documents
///
/// A `None` from `get_by_slug` means the document does not exist; errors
/// are reserved for failures to reach or understand the source.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of posts in the source's default order
    async fn query_posts_page(&self, page_size: usize) -> Result<Page, SourceError>;

    /// Page found at a continuation cursor
    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, SourceError>;

    /// Single post lookup
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostDetail>, SourceError>;

    /// Slugs of every post, used to enumerate detail pages ahead of time
    async fn list_all_slugs(&self) -> Result<Vec<String>, SourceError>;
}
