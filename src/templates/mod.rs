//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on for every
//! `.html` template; only markup produced by the rich text renderer and
//! URLs built by the URL helpers are marked safe.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::helpers::{date_xml, post_url, DateFormatter};

/// Seconds after which the loading page asks the browser to retry
const LOADING_RETRY_SECS: u64 = 2;

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("loading.html", include_str!("site/loading.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            site: SiteData::from_config(config),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    /// The post list, with a link to the next listing page if any
    pub fn listing_page(&self, posts: &[PostCard], next_href: Option<&str>) -> Result<String> {
        let mut context = self.base_context();
        context.insert("posts", posts);
        context.insert("next_href", &next_href);
        self.render("index.html", &context)
    }

    pub fn post_page(&self, post: &PostView) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", post);
        self.render("post.html", &context)
    }

    pub fn loading_page(&self) -> Result<String> {
        let mut context = self.base_context();
        context.insert("retry_after", &LOADING_RETRY_SECS);
        self.render("loading.html", &context)
    }

    pub fn not_found_page(&self) -> Result<String> {
        self.render("not_found.html", &self.base_context())
    }

    pub fn error_page(&self, message: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("message", message);
        self.render("error.html", &context)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub root: String,
    pub lang: String,
}

impl SiteData {
    fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            root: crate::helpers::url_for(config, ""),
            lang: config.language.replace('_', "-"),
        }
    }
}

/// A post entry in the listing
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
}

impl PostCard {
    pub fn from_summary(config: &SiteConfig, post: &PostSummary) -> Self {
        Self {
            href: post_url(config, &post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post.display_date.clone(),
            datetime: post
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
        }
    }
}

/// A fully rendered post
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub author: String,
    pub banner_url: String,
    pub date: String,
    pub datetime: String,
    pub reading_time: usize,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    /// Rich text already rendered and escaped
    pub html: String,
}

/// Format a date for a view, keeping the raw value for `datetime`
pub fn view_dates(
    formatter: &DateFormatter,
    date: Option<&chrono::DateTime<chrono::FixedOffset>>,
) -> (String, String) {
    (
        formatter.format_optional(date),
        date.map(date_xml).unwrap_or_default(),
    )
}
