//! Listing controller - the paginated post list
//!
//! The controller is created from the first page and grows by following
//! the source's continuation cursor. Loads are queued behind a per-instance
//! gate so each one sees the cursor left by the previous load, and results
//! are appended in the order the source returned them.

use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::SiteConfig;
use crate::content::{Cursor, Page, PostSummary};
use crate::helpers::{listing_url, DateFormatter};
use crate::source::{ContentSource, SourceError};
use crate::templates::{PostCard, TemplateRenderer};

/// Result of a successful `load_more`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many posts were appended
    Appended(usize),
    /// There was no cursor left; nothing changed
    Exhausted,
    /// The controller was dropped before the page arrived
    Discarded,
}

#[derive(Debug)]
struct ListingState {
    posts: Vec<PostSummary>,
    next_cursor: Option<Cursor>,
    pages_loaded: usize,
}

/// A point-in-time copy of the visible list
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    pub posts: Vec<PostSummary>,
    pub has_more: bool,
    pub pages_loaded: usize,
}

impl ListingSnapshot {
    /// Render the list, linking to the listing page that loads one more page
    pub fn render(
        &self,
        config: &SiteConfig,
        renderer: &TemplateRenderer,
    ) -> anyhow::Result<String> {
        let cards: Vec<PostCard> = self
            .posts
            .iter()
            .map(|post| PostCard::from_summary(config, post))
            .collect();
        let next_href = self
            .has_more
            .then(|| listing_url(config, self.pages_loaded + 1));
        renderer.listing_page(&cards, next_href.as_deref())
    }
}

pub struct ListingController {
    source: Arc<dyn ContentSource>,
    formatter: DateFormatter,
    state: Arc<RwLock<ListingState>>,
    gate: Arc<Mutex<()>>,
}

impl ListingController {
    /// Seed the list with the first page
    pub fn initialize(
        source: Arc<dyn ContentSource>,
        formatter: DateFormatter,
        seed: Page,
    ) -> Self {
        let more = !seed.is_last();
        let posts = localize(&formatter, seed.results);
        tracing::debug!(
            "Listing initialized with {} posts (more: {})",
            posts.len(),
            more
        );

        Self {
            source,
            formatter,
            state: Arc::new(RwLock::new(ListingState {
                posts,
                next_cursor: seed.next_cursor,
                pages_loaded: 1,
            })),
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn posts(&self) -> Vec<PostSummary> {
        self.state.read().await.posts.clone()
    }

    pub async fn next_cursor(&self) -> Option<Cursor> {
        self.state.read().await.next_cursor.clone()
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.next_cursor.is_some()
    }

    pub async fn pages_loaded(&self) -> usize {
        self.state.read().await.pages_loaded
    }

    pub async fn snapshot(&self) -> ListingSnapshot {
        let state = self.state.read().await;
        ListingSnapshot {
            posts: state.posts.clone(),
            has_more: state.next_cursor.is_some(),
            pages_loaded: state.pages_loaded,
        }
    }

    /// Fetch the page at the pending cursor and append it
    ///
    /// On failure the list and cursor are left as they were.
    pub async fn load_more(&self) -> Result<LoadOutcome, SourceError> {
        self.task().run().await
    }

    /// Start a load in the background
    ///
    /// The task does not keep the list alive: if the controller is dropped
    /// while the fetch is in flight the page is thrown away.
    pub fn spawn_load_more(&self) -> JoinHandle<Result<LoadOutcome, SourceError>> {
        tokio::spawn(self.task().run())
    }

    fn task(&self) -> LoadTask {
        LoadTask {
            source: self.source.clone(),
            formatter: self.formatter.clone(),
            state: Arc::downgrade(&self.state),
            gate: self.gate.clone(),
        }
    }
}

struct LoadTask {
    source: Arc<dyn ContentSource>,
    formatter: DateFormatter,
    state: Weak<RwLock<ListingState>>,
    gate: Arc<Mutex<()>>,
}

impl LoadTask {
    async fn run(self) -> Result<LoadOutcome, SourceError> {
        let _turn = self.gate.lock().await;

        let cursor = match self.state.upgrade() {
            Some(state) => {
                let cursor = state.read().await.next_cursor.clone();
                cursor
            }
            None => return Ok(LoadOutcome::Discarded),
        };
        let Some(cursor) = cursor else {
            return Ok(LoadOutcome::Exhausted);
        };

        let page = match self.source.fetch_page(&cursor).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to load more posts: {}", e);
                return Err(e);
            }
        };

        let Some(state) = self.state.upgrade() else {
            tracing::debug!("Listing dropped while loading, discarding page");
            return Ok(LoadOutcome::Discarded);
        };

        let results = localize(&self.formatter, page.results);
        let appended = results.len();
        let mut state = state.write().await;
        state.posts.extend(results);
        state.next_cursor = page.next_cursor;
        state.pages_loaded += 1;
        tracing::debug!(
            "Appended {} posts (total {}, page {})",
            appended,
            state.posts.len(),
            state.pages_loaded
        );

        Ok(LoadOutcome::Appended(appended))
    }
}

fn localize(formatter: &DateFormatter, mut posts: Vec<PostSummary>) -> Vec<PostSummary> {
    for post in &mut posts {
        post.display_date = formatter.format_optional(post.first_publication_date.as_ref());
    }
    posts
}
