//! Request-time post lookup with a loading state
//!
//! The first request for a slug starts one lookup task and waits a short
//! while for it. Requests arriving while that lookup is still running get
//! `Resolution::Loading`. Found posts are kept; misses and failures are
//! forgotten so the next request asks the source again. A lookup that
//! outlives its limit counts as a failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::content::PostDetail;
use crate::source::{ContentSource, SourceError};

#[derive(Debug, Clone)]
pub enum Resolution {
    Ready(Arc<PostDetail>),
    Loading,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone)]
enum Entry {
    Loading,
    Ready(Arc<PostDetail>),
}

type Entries = Arc<RwLock<HashMap<String, Entry>>>;

pub struct PostResolver {
    source: Arc<dyn ContentSource>,
    entries: Entries,
    wait: Duration,
    limit: Duration,
}

impl PostResolver {
    /// `wait` is how long a request blocks on a fresh lookup, `limit` how
    /// long the lookup may run at all
    pub fn new(source: Arc<dyn ContentSource>, wait: Duration, limit: Duration) -> Self {
        Self {
            source,
            entries: Arc::new(RwLock::new(HashMap::new())),
            wait,
            limit,
        }
    }

    pub async fn resolve(&self, slug: &str) -> Resolution {
        if let Some(known) = self.known(slug).await {
            return known;
        }

        {
            let mut entries = self.entries.write().await;
            match entries.get(slug) {
                Some(Entry::Ready(post)) => return Resolution::Ready(post.clone()),
                Some(Entry::Loading) => return Resolution::Loading,
                None => {
                    entries.insert(slug.to_string(), Entry::Loading);
                }
            }
        }

        let handle = tokio::spawn(lookup(
            self.source.clone(),
            self.entries.clone(),
            slug.to_string(),
            self.limit,
        ));

        match tokio::time::timeout(self.wait, handle).await {
            Ok(Ok(Ok(Some(post)))) => Resolution::Ready(post),
            Ok(Ok(Ok(None))) => Resolution::NotFound,
            Ok(Ok(Err(e))) => Resolution::Failed(e.to_string()),
            Ok(Err(e)) => {
                tracing::error!("Lookup task for {} failed: {}", slug, e);
                self.entries.write().await.remove(slug);
                Resolution::Failed(e.to_string())
            }
            Err(_) => {
                tracing::debug!("Post {} still loading after {:?}", slug, self.wait);
                Resolution::Loading
            }
        }
    }

    async fn known(&self, slug: &str) -> Option<Resolution> {
        match self.entries.read().await.get(slug) {
            Some(Entry::Ready(post)) => Some(Resolution::Ready(post.clone())),
            Some(Entry::Loading) => Some(Resolution::Loading),
            None => None,
        }
    }

    /// Resolve every slug up front; the first failure is returned
    pub async fn warm(&self, slugs: &[String]) -> Result<usize, SourceError> {
        let mut ready = 0;
        for slug in slugs {
            match bounded_lookup(self.source.as_ref(), slug, self.limit).await? {
                Some(post) => {
                    self.entries
                        .write()
                        .await
                        .insert(slug.clone(), Entry::Ready(Arc::new(post)));
                    ready += 1;
                }
                None => tracing::warn!("Enumerated post {} could not be found", slug),
            }
        }
        Ok(ready)
    }

    /// Number of posts held ready
    #[cfg(test)]
    pub async fn ready_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }
}

async fn lookup(
    source: Arc<dyn ContentSource>,
    entries: Entries,
    slug: String,
    limit: Duration,
) -> Result<Option<Arc<PostDetail>>, SourceError> {
    let result = bounded_lookup(source.as_ref(), &slug, limit).await;
    let mut entries = entries.write().await;

    match result {
        Ok(Some(post)) => {
            let post = Arc::new(post);
            entries.insert(slug, Entry::Ready(post.clone()));
            Ok(Some(post))
        }
        Ok(None) => {
            entries.remove(&slug);
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch post {}: {}", slug, e);
            entries.remove(&slug);
            Err(e)
        }
    }
}

async fn bounded_lookup(
    source: &dyn ContentSource,
    slug: &str,
    limit: Duration,
) -> Result<Option<PostDetail>, SourceError> {
    match tokio::time::timeout(limit, source.get_by_slug(slug)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::TimedOut {
            what: format!("post {}", slug),
            after: limit,
        }),
    }
}
