//! In-memory content source for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ContentSource, SourceError};
use crate::content::{
    richtext::TextBlock, ContentSection, Cursor, Page, PostDetail, PostSummary, RichTextNode,
};
use crate::helpers::parse_publication_date;

#[derive(Default)]
pub struct MemorySource {
    first: Page,
    pages: HashMap<Cursor, Page>,
    posts: HashMap<String, PostDetail>,
    failing: Mutex<HashSet<Cursor>>,
    delay: Option<Duration>,
    pub page_fetches: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl MemorySource {
    /// A chain of pages, each linked to the next by cursor `c1`, `c2`, ...
    pub fn with_pages(pages: Vec<Vec<PostSummary>>) -> Self {
        let count = pages.len();
        let mut source = Self::default();
        for (i, results) in pages.into_iter().enumerate() {
            let next = (i + 1 < count).then(|| Cursor::new(format!("c{}", i + 1)));
            let page = Page::new(results, next);
            if i == 0 {
                source.first = page;
            } else {
                source.pages.insert(Cursor::new(format!("c{}", i)), page);
            }
        }
        source
    }

    pub fn with_post(mut self, post: PostDetail) -> Self {
        self.posts.insert(post.uid.clone(), post);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_cursor(&self, cursor: &str) {
        self.failing.lock().unwrap().insert(Cursor::new(cursor));
    }

    pub fn heal_cursor(&self, cursor: &str) {
        self.failing.lock().unwrap().remove(&Cursor::new(cursor));
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query_posts_page(&self, _page_size: usize) -> Result<Page, SourceError> {
        self.pause().await;
        Ok(self.first.clone())
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing.lock().unwrap().contains(cursor) {
            return Err(SourceError::Unavailable(format!("cursor {} failed", cursor)));
        }
        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| SourceError::ForeignCursor(cursor.to_string()))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostDetail>, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if slug == "broken" {
            return Err(SourceError::Unavailable("lookup failed".to_string()));
        }
        Ok(self.posts.get(slug).cloned())
    }

    async fn list_all_slugs(&self) -> Result<Vec<String>, SourceError> {
        let mut slugs: Vec<String> = self.posts.keys().cloned().collect();
        slugs.sort();
        Ok(slugs)
    }
}

pub fn summary(uid: &str) -> PostSummary {
    PostSummary {
        first_publication_date: parse_publication_date("2022-01-05T12:00:00+0000"),
        author: "Joseph Oliveira".to_string(),
        subtitle: format!("About {}", uid),
        ..PostSummary::new(uid, &format!("Post {}", uid))
    }
}

pub fn detail(uid: &str, body: &str) -> PostDetail {
    PostDetail {
        uid: uid.to_string(),
        first_publication_date: parse_publication_date("2022-01-05T12:00:00+0000"),
        title: format!("Post {}", uid),
        subtitle: String::new(),
        author: "Danilo Vieira".to_string(),
        banner_url: "https://images.prismic.io/banner.png".to_string(),
        content: vec![ContentSection {
            heading: "Intro".to_string(),
            body: vec![RichTextNode::Paragraph(TextBlock::plain(body))],
        }],
    }
}
