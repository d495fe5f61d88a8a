//! TOML configuration parsing and validation.
//!
//! A minimal configuration only needs the data directory and the metadata
//! database path; search is disabled unless `[search] enabled = true`.
//!
//! ```toml
//! data_dir = "./shelf/data"
//!
//! [db]
//! path = "./shelf/internal/shelf.sqlite"
//!
//! [search]
//! enabled = true
//! url = "http://localhost:9200"
//! index_name = "dataobj"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root of the content file store.
    pub data_dir: PathBuf,
    pub db: DbConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ask the backend to make each write visible to search immediately.
    #[serde(default = "default_refresh")]
    pub refresh: bool,
    /// Index settings and mappings passed verbatim to `bootstrap()`.
    #[serde(default = "default_schema")]
    pub schema: serde_json::Value,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            index_name: default_index_name(),
            timeout_secs: default_timeout_secs(),
            refresh: default_refresh(),
            schema: default_schema(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_index_name() -> String {
    "dataobj".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_refresh() -> bool {
    true
}

/// Name of the custom analyzer declared by [`default_schema`].
pub const ANALYZER: &str = "rebuilt_standard";

/// Built-in index definition: a standard tokenizer with lowercase folding,
/// stemming, trimming and duplicate-token removal applied to every
/// searchable field.
pub fn default_schema() -> serde_json::Value {
    json!({
        "settings": {
            "highlight": { "max_analyzed_offset": 100_000_000 },
            "analysis": {
                "analyzer": {
                    ANALYZER: {
                        "stopwords": "_english_",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "kstem", "trim", "unique"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "title": {
                    "type": "text",
                    "analyzer": ANALYZER,
                    "term_vector": "with_positions_offsets"
                },
                "tags": { "type": "text", "analyzer": ANALYZER },
                "body": { "type": "text", "analyzer": ANALYZER },
                "kind": { "type": "keyword" },
                "url": { "type": "keyword" }
            }
        }
    })
}

impl Config {
    /// Config rooted at `root`, with search disabled. Used by tests and `init`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            data_dir: root.join("data"),
            db: DbConfig {
                path: root.join("internal").join("shelf.sqlite"),
            },
            search: SearchConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.data_dir.as_os_str().is_empty() {
        anyhow::bail!("data_dir must not be empty");
    }

    let search = &config.search;
    if search.index_name.is_empty() {
        anyhow::bail!("search.index_name must not be empty");
    }
    if search.index_name != search.index_name.to_lowercase() {
        anyhow::bail!(
            "search.index_name must be lowercase (got '{}')",
            search.index_name
        );
    }
    if search.timeout_secs == 0 {
        anyhow::bail!("search.timeout_secs must be > 0");
    }
    if search.enabled && !(search.url.starts_with("http://") || search.url.starts_with("https://"))
    {
        anyhow::bail!(
            "search.url must start with http:// or https:// when search is enabled (got '{}')",
            search.url
        );
    }
    if !search.schema.is_object() {
        anyhow::bail!("search.schema must be a table");
    }

    Ok(())
}
