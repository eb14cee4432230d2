//! spacetraveling: a blog front-end for a headless CMS
//!
//! Posts are read from a Prismic repository and rendered with embedded Tera
//! templates, either ahead of time into a public directory or on request
//! by the built-in server.

pub mod commands;
pub mod config;
pub mod content;
pub mod detail;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::source::{ContentSource, PrismicClient};

/// Name of the configuration file in the base directory
pub const CONFIG_FILE: &str = "_config.yml";

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new instance from a directory, reading `_config.yml` and
    /// the `PRISMIC_*` environment variables
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)
                .with_context(|| format!("Failed to load {:?}", config_path))?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// Connect to the configured content repository
    pub fn source(&self) -> Result<Arc<dyn ContentSource>> {
        let client = PrismicClient::new(&self.config.prismic).with_context(|| {
            format!(
                "Set prismic.endpoint in {} or the {} environment variable",
                CONFIG_FILE,
                config::ENDPOINT_ENV
            )
        })?;
        Ok(Arc::new(client))
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
