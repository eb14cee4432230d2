//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
language: pt_BR
timezone: America/Sao_Paulo

# URL
root: /

# Directory
public_dir: public

# Display
date_format: dd MMM yyyy
words_per_minute: 200

# Pagination
per_page: 1
pagination_dir: page

# Content source
# PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override these values
prismic:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  enumerate_page_size: 100
  request_timeout_ms: 10000

# Server
server:
  fallback_wait_ms: 1500
  prerender: false
  lookup_timeout_ms: 15000
"#;

/// Write a default `_config.yml` into the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, DEFAULT_CONFIG)?;
    tracing::debug!("Created {:?}", config_path);

    Ok(())
}
