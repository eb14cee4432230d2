//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub root: String,

    // Directory
    pub public_dir: String,

    // Display
    pub date_format: String,
    pub words_per_minute: usize,

    // Pagination
    pub per_page: usize,
    pub pagination_dir: String,

    // Content source
    #[serde(default)]
    pub prismic: PrismicConfig,

    // Server
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt_BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "dd MMM yyyy".to_string(),
            words_per_minute: 200,

            per_page: 1,
            pagination_dir: "page".to_string(),

            prismic: PrismicConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using content endpoint from {}", ENDPOINT_ENV);
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = access_token.filter(|v| !v.trim().is_empty()) {
            self.prismic.access_token = Some(token);
        }
    }
}

/// Prismic repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. `https://repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the post documents
    pub document_type: String,
    /// Page size used when enumerating every slug
    pub enumerate_page_size: usize,
    /// Upper bound for a single HTTP request to the API
    pub request_timeout_ms: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            enumerate_page_size: 100,
            request_timeout_ms: 10_000,
        }
    }
}

/// Request-time rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// How long a detail request waits for an unresolved slug before
    /// answering with the loading placeholder
    pub fallback_wait_ms: u64,
    /// Resolve every known slug before accepting requests
    pub prerender: bool,
    /// A post lookup still running after this long is abandoned and
    /// reported as a failure
    pub lookup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            fallback_wait_ms: 1500,
            prerender: false,
            lookup_timeout_ms: 15_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.date_format, "dd MMM yyyy");
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.per_page, 1);
        assert_eq!(config.prismic.document_type, "posts");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
per_page: 5
prismic:
  endpoint: https://blog.cdn.prismic.io/api/v2
server:
  prerender: true
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.per_page, 5);
        assert_eq!(config.prismic.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.document_type, "posts");
        assert!(config.server.prerender);
        assert_eq!(config.server.fallback_wait_ms, 1500);
        assert_eq!(config.server.lookup_timeout_ms, 15_000);
        assert_eq!(config.prismic.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = SiteConfig::default();
        config.prismic.endpoint = "https://a.cdn.prismic.io/api/v2".to_string();
        config.apply_overrides(Some("  ".to_string()), Some("secret".to_string()));
        assert_eq!(config.prismic.endpoint, "https://a.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.access_token.as_deref(), Some("secret"));
    }
}
