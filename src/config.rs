use anyhow::{Context, Result};
use product_search_core::indexing::StorefrontPermissions;
use product_search_core::settings::SearchSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub solr: SolrConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SolrConfig {
    /// Base URL of the Solr instance, e.g. `http://localhost:8983/solr`.
    pub url: String,
    #[serde(default = "default_core")]
    pub core: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl SolrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `{url}/{core}` without duplicate slashes.
    pub fn core_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.core.trim_matches('/')
        )
    }
}

fn default_core() -> String {
    "products".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Deadline for one search, covering both phases and every Solr retry.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// JSON catalog file with languages, resources, taxonomy and products.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexingConfig {
    #[serde(default)]
    pub permissions: StorefrontPermissions,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Solr
    if !(config.solr.url.starts_with("http://") || config.solr.url.starts_with("https://")) {
        anyhow::bail!(
            "solr.url must start with http:// or https:// (got '{}')",
            config.solr.url
        );
    }
    if config.solr.core.trim_matches('/').is_empty() {
        anyhow::bail!("solr.core must not be empty");
    }
    if config.solr.timeout_secs == 0 {
        anyhow::bail!("solr.timeout_secs must be >= 1");
    }
    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be >= 1");
    }

    // Search
    let search = &config.search;
    if search.max_returned_documents == 0 {
        anyhow::bail!("search.max_returned_documents must be >= 1");
    }
    if search.default_language.trim().is_empty() {
        anyhow::bail!("search.default_language must not be empty");
    }
    if search.default_language.contains('-') {
        anyhow::bail!(
            "search.default_language must be a short language key like 'en' (got '{}')",
            search.default_language
        );
    }
    if search.wildcard.min_length == 0 {
        anyhow::bail!("search.wildcard.min_length must be >= 1");
    }
    if search.fuzzy.min_length == 0 {
        anyhow::bail!("search.fuzzy.min_length must be >= 1");
    }

    Ok(())
}
