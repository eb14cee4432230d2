//! Detail controller - a single post page

use anyhow::Result;
use std::sync::Arc;

use crate::content::{richtext, PostDetail};
use crate::helpers::{css_url, DateFormatter};
use crate::templates::{view_dates, PostView, SectionView, TemplateRenderer};

/// Reading speed used for the reading-time estimate
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Minutes needed to read a post, rounded up
///
/// A post without words takes zero minutes.
pub fn reading_time(post: &PostDetail, words_per_minute: usize) -> usize {
    post.word_count().div_ceil(words_per_minute.max(1))
}

/// What a detail route currently knows about its slug
#[derive(Debug, Clone)]
pub enum DetailState {
    /// The lookup has not finished yet
    Loading,
    /// The source has no document with this slug
    NotFound,
    Ready(Arc<PostDetail>),
}

pub struct DetailController {
    renderer: Arc<TemplateRenderer>,
    formatter: DateFormatter,
    words_per_minute: usize,
}

impl DetailController {
    pub fn new(
        renderer: Arc<TemplateRenderer>,
        formatter: DateFormatter,
        words_per_minute: usize,
    ) -> Self {
        Self {
            renderer,
            formatter,
            words_per_minute,
        }
    }

    /// Build the view of a post
    pub fn view(&self, post: &PostDetail) -> PostView {
        let (date, datetime) = view_dates(&self.formatter, post.first_publication_date.as_ref());
        PostView {
            uid: post.uid.clone(),
            title: post.title.clone(),
            author: post.author.clone(),
            banner_url: css_url(&post.banner_url),
            date,
            datetime,
            reading_time: reading_time(post, self.words_per_minute),
            sections: post
                .content
                .iter()
                .map(|section| SectionView {
                    heading: section.heading.clone(),
                    html: richtext::as_html(&section.body),
                })
                .collect(),
        }
    }

    /// Render a post page
    pub fn render(&self, post: &PostDetail) -> Result<String> {
        self.renderer.post_page(&self.view(post))
    }

    pub fn render_state(&self, state: &DetailState) -> Result<String> {
        match state {
            DetailState::Loading => self.renderer.loading_page(),
            DetailState::NotFound => self.renderer.not_found_page(),
            DetailState::Ready(post) => self.render(post),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::source::testing::detail;

    fn controller() -> DetailController {
        let config = SiteConfig::default();
        DetailController::new(
            Arc::new(TemplateRenderer::new(&config).unwrap()),
            DateFormatter::from_config(&config).unwrap(),
            DEFAULT_WORDS_PER_MINUTE,
        )
    }

    #[test]
    fn test_five_words_take_one_minute() {
        let post = detail("a", "one two three four five");
        assert_eq!(reading_time(&post, 200), 1);
    }

    #[test]
    fn test_empty_content_takes_zero_minutes() {
        let mut post = detail("a", "");
        post.content.clear();
        assert_eq!(reading_time(&post, 200), 0);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let words = vec!["word"; 401].join(" ");
        assert_eq!(reading_time(&detail("a", &words), 200), 3);
        assert_eq!(reading_time(&detail("a", &vec!["w"; 400].join(" ")), 200), 2);
    }

    #[test]
    fn test_view() {
        let view = controller().view(&detail("a", "one <b>two</b>"));
        assert_eq!(view.date, "05 jan 2022");
        assert_eq!(view.reading_time, 1);
        assert_eq!(view.sections[0].heading, "Intro");
        assert_eq!(view.sections[0].html, "<p>one &lt;b&gt;two&lt;/b&gt;</p>");
    }

    #[test]
    fn test_banner_cannot_escape_style() {
        let mut post = detail("a", "x");
        post.banner_url = "https://x.io/a.png');}body{display:none}/*".to_string();
        let html = controller().render(&post).unwrap();
        assert!(html.contains("a.png%27%29;}body{display:none}"));
        assert!(!html.contains("a.png&#x27;"));

        post.banner_url = "javascript:alert(1)".to_string();
        let html = controller().render(&post).unwrap();
        assert!(!html.contains("background-image"));
    }

    #[test]
    fn test_render_post() {
        let html = controller().render(&detail("a", "hello")).unwrap();
        assert!(html.contains("<h1>Post a</h1>"));
        assert!(html.contains("<p>hello</p>"));
        assert!(html.contains("1 min"));
        assert!(html.contains("Danilo Vieira"));
    }

    #[test]
    fn test_render_states() {
        let controller = controller();
        let loading = controller.render_state(&DetailState::Loading).unwrap();
        assert!(loading.contains("Carregando..."));
        let missing = controller.render_state(&DetailState::NotFound).unwrap();
        assert!(missing.contains("Post não encontrado"));
        let ready = controller
            .render_state(&DetailState::Ready(Arc::new(detail("b", "x"))))
            .unwrap();
        assert!(ready.contains("Post b"));
    }
}
