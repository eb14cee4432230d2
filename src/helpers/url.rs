//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a URL placed inside CSS `url('...')`
const CSS_URL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'\\')
    .add(b'<')
    .add(b'>');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Link to the detail page of a post
pub fn post_url(config: &SiteConfig, slug: &str) -> String {
    url_for(
        config,
        &format!("post/{}", utf8_percent_encode(slug, SEGMENT)),
    )
}

/// Link to the n-th listing page (1-based)
pub fn listing_url(config: &SiteConfig, page: usize) -> String {
    if page <= 1 {
        url_for(config, "")
    } else {
        url_for(config, &format!("{}/{}/", config.pagination_dir, page))
    }
}

/// Make an image URL safe to embed in an inline `url('...')`
///
/// Only http(s) URLs are kept; anything else becomes an empty string.
pub fn css_url(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("https://") || lower.starts_with("http://")) {
        return String::new();
    }
    utf8_percent_encode(url, CSS_URL).to_string()
}

/// Output path of a post relative to the public directory
pub fn post_output_path(slug: &str) -> String {
    format!("post/{}/index.html", slug)
}

/// Whether a slug can be used as a single path segment on disk
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_root(root: &str) -> SiteConfig {
        SiteConfig {
            root: root.to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_url_for() {
        let config = config_with_root("/blog/");
        assert_eq!(url_for(&config, "/post/a"), "/blog/post/a");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_post_url_encodes_slug() {
        let config = config_with_root("/");
        assert_eq!(post_url(&config, "hello-world"), "/post/hello-world");
        assert_eq!(post_url(&config, "a b/c"), "/post/a%20b%2Fc");
    }

    #[test]
    fn test_listing_url() {
        let config = config_with_root("/");
        assert_eq!(listing_url(&config, 1), "/");
        assert_eq!(listing_url(&config, 3), "/page/3/");
    }

    #[test]
    fn test_css_url() {
        assert_eq!(
            css_url("https://images.prismic.io/a%20b.png?auto=compress"),
            "https://images.prismic.io/a%20b.png?auto=compress"
        );
        assert_eq!(
            css_url("https://x.io/a.png');background:red;('"),
            "https://x.io/a.png%27%29;background:red;%28%27"
        );
        assert_eq!(css_url("javascript:alert(1)"), "");
        assert_eq!(css_url("data:image/png;base64,AAAA"), "");
    }

    #[test]
    fn test_is_safe_slug() {
        assert!(is_safe_slug("como-utilizar-hooks"));
        assert!(!is_safe_slug(""));
        assert!(!is_safe_slug(".."));
        assert!(!is_safe_slug("a/b"));
    }
}
