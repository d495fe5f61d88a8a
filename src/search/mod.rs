//! Search engine abstraction and implementations.
//!
//! Defines the [`SearchEngine`] trait and concrete implementations:
//! - **[`DisabledSearch`]**: every operation is a no-op; used when
//!   `search.enabled = false`. Never touches the network.
//! - **[`ElasticSearch`]**: a remote Elasticsearch-compatible service
//!   reached over HTTP.
//! - **[`MemorySearch`]**: an in-process index, handy for tests and for
//!   single-user setups that do not want to run a search service.
//!
//! The search index is a derived cache of the content files. Callers treat
//! every write to it as best-effort and rebuild it with a full reindex
//! when it drifts.
//!
//! # Engine Selection
//!
//! Use [`create_engine`] to instantiate the engine named by the config:
//!
//! ```rust,no_run
//! # use shelf::config::SearchConfig;
//! # use shelf::search::create_engine;
//! let config = SearchConfig::default(); // enabled = false
//! let engine = create_engine(&config).unwrap();
//! assert_eq!(engine.name(), "disabled");
//! ```

mod disabled;
mod elastic;
mod memory;

pub use disabled::DisabledSearch;
pub use elastic::ElasticSearch;
pub use memory::MemorySearch;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::error::{Error, SearchError};
use crate::models::{SearchDocument, SearchHit};

/// Cluster status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterHealth {
    Green,
    /// Reachable but degraded (e.g. replicas unassigned).
    Yellow,
    /// Reachable but some primary data is unavailable.
    Red,
}

impl ClusterHealth {
    pub fn is_degraded(self) -> bool {
        !matches!(self, ClusterHealth::Green)
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "green" => Some(ClusterHealth::Green),
            "yellow" => Some(ClusterHealth::Yellow),
            "red" => Some(ClusterHealth::Red),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClusterHealth::Green => "green",
            ClusterHealth::Yellow => "yellow",
            ClusterHealth::Red => "red",
        })
    }
}

/// Contract every search backend implements.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`health`](SearchEngine::health) | Reachability and cluster status, checked once at startup |
/// | [`bootstrap`](SearchEngine::bootstrap) | Create the index and schema; an existing index is success |
/// | [`add`](SearchEngine::add) | Upsert a document by id |
/// | [`remove`](SearchEngine::remove) | Delete a document by id; an absent document is success |
/// | [`query`](SearchEngine::query) | Ranked hits; failures degrade to an empty list |
/// | [`cleanup`](SearchEngine::cleanup) | Release resources at shutdown |
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Short identifier used in logs (e.g. `"elasticsearch"`).
    fn name(&self) -> &str;

    async fn health(&self) -> Result<ClusterHealth, SearchError>;

    async fn bootstrap(&self) -> Result<(), SearchError>;

    async fn add(&self, doc: &SearchDocument) -> Result<(), SearchError>;

    async fn remove(&self, id: u64) -> Result<(), SearchError>;

    /// Hits in backend relevance order. Never fails: a backend error or
    /// timeout is logged and yields an empty list.
    async fn query(&self, text: &str) -> Vec<SearchHit>;

    async fn cleanup(&self) {}
}

/// Build the engine selected by `config`.
pub fn create_engine(config: &SearchConfig) -> Result<Arc<dyn SearchEngine>, Error> {
    if !config.enabled {
        return Ok(Arc::new(DisabledSearch));
    }
    Ok(Arc::new(ElasticSearch::new(config)?))
}

/// Tokens as the built-in engines see them: lowercase alphanumeric runs.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
