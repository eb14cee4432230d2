//! Generator module - renders every page to static HTML files

use anyhow::{Context as _, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::detail::DetailController;
use crate::helpers::{is_safe_slug, post_output_path, DateFormatter};
use crate::listing::{ListingController, LoadOutcome};
use crate::source::ContentSource;
use crate::templates::TemplateRenderer;
use crate::Blog;

/// Counts reported after a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerateStats {
    pub listing_pages: usize,
    pub post_pages: usize,
    pub skipped: usize,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: Arc<TemplateRenderer>,
    formatter: DateFormatter,
    detail: DetailController,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let renderer = Arc::new(TemplateRenderer::new(&blog.config)?);
        let formatter = DateFormatter::from_config(&blog.config)?;
        let detail = DetailController::new(
            renderer.clone(),
            formatter.clone(),
            blog.config.words_per_minute,
        );

        Ok(Self {
            blog: blog.clone(),
            source,
            renderer,
            formatter,
            detail,
        })
    }

    /// Generate the entire site
    ///
    /// Any failure to reach the content source aborts the run.
    pub async fn generate(&self) -> Result<GenerateStats> {
        fs::create_dir_all(&self.blog.public_dir)?;

        let listing_pages = self.generate_listing_pages().await?;
        let (post_pages, skipped) = self.generate_post_pages().await?;
        self.generate_not_found_page()?;

        Ok(GenerateStats {
            listing_pages,
            post_pages,
            skipped,
        })
    }

    /// Write the seed page to `index.html` and every following state of the
    /// list to `page/{n}/index.html`
    async fn generate_listing_pages(&self) -> Result<usize> {
        let config = &self.blog.config;
        let seed = self
            .source
            .query_posts_page(config.per_page)
            .await
            .context("Failed to fetch the first page of posts")?;
        let listing =
            ListingController::initialize(self.source.clone(), self.formatter.clone(), seed);

        let mut written = 0;
        loop {
            let snapshot = listing.snapshot().await;
            let html = snapshot.render(config, &self.renderer)?;
            let output = if snapshot.pages_loaded == 1 {
                "index.html".to_string()
            } else {
                format!(
                    "{}/{}/index.html",
                    config.pagination_dir, snapshot.pages_loaded
                )
            };
            self.write(&output, &html)?;
            written += 1;

            if !snapshot.has_more {
                break;
            }
            match listing
                .load_more()
                .await
                .context("Failed to load the next page of posts")?
            {
                LoadOutcome::Appended(_) => {}
                LoadOutcome::Exhausted | LoadOutcome::Discarded => break,
            }
        }

        tracing::info!("Generated {} listing pages", written);
        Ok(written)
    }

    /// Render every post the source enumerates
    async fn generate_post_pages(&self) -> Result<(usize, usize)> {
        let slugs = self
            .source
            .list_all_slugs()
            .await
            .context("Failed to enumerate posts")?;

        let mut written = 0;
        let mut skipped = 0;
        for slug in &slugs {
            if !is_safe_slug(slug) {
                tracing::warn!("Skipping post with unusable slug {:?}", slug);
                skipped += 1;
                continue;
            }

            let post = self
                .source
                .get_by_slug(slug)
                .await
                .with_context(|| format!("Failed to fetch post {}", slug))?;
            let Some(post) = post else {
                tracing::warn!("Post {} disappeared before it could be rendered", slug);
                skipped += 1;
                continue;
            };

            let html = self.detail.render(&post)?;
            self.write(&post_output_path(slug), &html)?;
            written += 1;
        }

        tracing::info!("Generated {} post pages", written);
        Ok((written, skipped))
    }

    fn generate_not_found_page(&self) -> Result<()> {
        let html = self.renderer.not_found_page()?;
        self.write("404.html", &html)
    }

    fn write(&self, relative: &str, html: &str) -> Result<()> {
        let output_path: PathBuf = self.blog.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}
