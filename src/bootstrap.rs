//! Startup sequencing.
//!
//! [`start`] opens the metadata store, selects the search engine, and, when
//! search is enabled, refuses to return until the backend has answered a
//! health check and the index exists. Nothing is written before that.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::files::LocalFileStore;
use crate::hooks::HookRegistry;
use crate::ids::IdAllocator;
use crate::meta::MetaStore;
use crate::search::{self, SearchEngine};
use crate::sync::ContentSync;
use crate::users::{self, User};

/// A started knowledge base: metadata store plus synchronizer.
pub struct Shelf {
    meta: MetaStore,
    sync: ContentSync,
}

impl Shelf {
    pub fn sync(&self) -> &ContentSync {
        &self.sync
    }

    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    pub async fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
        users::create_user(&self.meta, self.sync.hooks(), username, password, is_admin).await
    }

    /// Release the search engine and the metadata store.
    pub async fn close(self) {
        self.sync.engine().cleanup().await;
        self.meta.close().await;
    }
}

/// Start with the engine selected by `config.search`.
pub async fn start(config: &Config, hooks: HookRegistry) -> Result<Shelf> {
    let engine = search::create_engine(&config.search)?;
    if config.search.enabled {
        prepare_search(config, engine.as_ref()).await?;
    } else {
        info!("search disabled; skipping backend checks");
    }
    assemble(config, engine, hooks).await
}

/// Start with a caller-supplied engine; it gets the same health check and
/// bootstrap as the configured one.
pub async fn start_with_engine(
    config: &Config,
    engine: Arc<dyn SearchEngine>,
    hooks: HookRegistry,
) -> Result<Shelf> {
    prepare_search(config, engine.as_ref()).await?;
    assemble(config, engine, hooks).await
}

/// Health check followed by index bootstrap. Unreachable is fatal,
/// degraded is a warning.
pub async fn prepare_search(config: &Config, engine: &dyn SearchEngine) -> Result<()> {
    let url = &config.search.url;

    match engine.health().await {
        Ok(health) if health.is_degraded() => {
            warn!(engine = engine.name(), url = %url, %health, "search backend is degraded; continuing");
        }
        Ok(health) => {
            info!(engine = engine.name(), url = %url, %health, "search backend is healthy");
        }
        Err(source) => {
            error!(
                engine = engine.name(),
                url = %url,
                error = %source,
                "cannot reach the search backend. Either start it at {} or set `search.enabled = false` in the config",
                url
            );
            return Err(Error::SearchUnavailable {
                url: url.clone(),
                source,
            });
        }
    }

    engine.bootstrap().await.map_err(|source| {
        error!(engine = engine.name(), error = %source, "failed to create the search index");
        Error::SearchUnavailable {
            url: url.clone(),
            source,
        }
    })
}

async fn assemble(
    config: &Config,
    engine: Arc<dyn SearchEngine>,
    hooks: HookRegistry,
) -> Result<Shelf> {
    std::fs::create_dir_all(&config.data_dir).map_err(|source| Error::FileWrite {
        path: config.data_dir.clone(),
        source,
    })?;

    let meta = MetaStore::open(config).await?;
    let sync = ContentSync::new(
        IdAllocator::new(meta.clone()),
        Box::new(LocalFileStore::new(&config.data_dir)),
        engine,
        hooks,
        &config.data_dir,
    );
    Ok(Shelf { meta, sync })
}
