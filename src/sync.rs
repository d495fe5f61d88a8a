//! Content object synchronizer.
//!
//! Keeps the three storage surfaces in step:
//!
//! ```text
//!   create ──▶ before_create ──▶ next_id ──▶ write file ──▶ index ──▶ on_create
//!   update ──▶ read file ──▶ patch ──▶ rewrite file ──▶ index ──▶ on_edit
//!   delete ──▶ unindex ──▶ delete file
//! ```
//!
//! The file write (or delete) is the authoritative step: its failure fails
//! the operation. Index writes are best-effort; their failures are logged
//! and repaired later by [`ContentSync::reindex`]. Allocated ids are never
//! returned, so a failed create leaves a gap rather than risking reuse.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::files::FileStore;
use crate::frontmatter;
use crate::hooks::HookRegistry;
use crate::ids::IdAllocator;
use crate::models::{ContentObject, ContentPatch, NewContent, SearchHit};
use crate::search::SearchEngine;

/// Outcome of a full reindex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

pub struct ContentSync {
    ids: IdAllocator,
    files: Box<dyn FileStore>,
    engine: Arc<dyn SearchEngine>,
    hooks: HookRegistry,
    data_dir: PathBuf,
}

impl ContentSync {
    pub fn new(
        ids: IdAllocator,
        files: Box<dyn FileStore>,
        engine: Arc<dyn SearchEngine>,
        hooks: HookRegistry,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ids,
            files,
            engine,
            hooks,
            data_dir: data_dir.into(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn create(&self, new: NewContent) -> Result<ContentObject> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }

        let now = Utc::now();
        let mut obj = ContentObject {
            id: 0,
            title: title.to_string(),
            body: new.body,
            tags: new.tags,
            kind: new.kind,
            url: new.url,
            created_at: now,
            updated_at: now,
        };
        self.hooks.before_create(&mut obj);

        obj.id = self.ids.next_id().await?;
        let path = obj.path_in(&self.data_dir);
        let raw = frontmatter::render(&obj)?;
        if let Err(e) = self.files.write_new(&path, &raw) {
            error!(id = obj.id, path = %path.display(), error = %e, "create failed; id is abandoned");
            return Err(e);
        }
        info!(id = obj.id, kind = %obj.kind, path = %path.display(), "created content object");

        self.index(&obj).await;
        self.hooks.on_create(&obj);
        Ok(obj)
    }

    pub async fn get(&self, id: u64) -> Result<ContentObject> {
        let path = self.locate(id)?;
        self.read_object(&path)
    }

    pub async fn update(&self, id: u64, mut patch: ContentPatch) -> Result<ContentObject> {
        if let Some(title) = patch.title.as_mut() {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidInput("title must not be empty".to_string()));
            }
            *title = trimmed.to_string();
        }

        let path = self.locate(id)?;
        let mut obj = self.read_object(&path)?;
        patch.apply(&mut obj);
        obj.updated_at = Utc::now();

        self.files.write(&path, &frontmatter::render(&obj)?)?;
        info!(id, path = %path.display(), "updated content object");

        self.index(&obj).await;
        self.hooks.on_edit(&obj);
        Ok(obj)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        if let Err(e) = self.engine.remove(id).await {
            warn!(id, engine = self.engine.name(), error = %e, "failed to remove content object from search index");
        }

        let path = self.locate(id)?;
        self.files.delete(&path)?;
        info!(id, path = %path.display(), "deleted content object");
        Ok(())
    }

    /// Every readable content object, ordered by id. Unreadable files are
    /// logged and skipped.
    pub async fn list(&self) -> Result<Vec<ContentObject>> {
        let mut objects = Vec::new();
        for path in self.files.list("**/*.md")? {
            match self.read_object(&path) {
                Ok(obj) => objects.push(obj),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable content file"),
            }
        }
        objects.sort_by_key(|o| o.id);
        Ok(objects)
    }

    /// Push every content file into the search index.
    pub async fn reindex(&self) -> Result<ReindexReport> {
        let mut report = ReindexReport::default();
        for path in self.files.list("**/*.md")? {
            let obj = match self.read_object(&path) {
                Ok(obj) => obj,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot reindex unreadable content file");
                    report.failed += 1;
                    continue;
                }
            };
            match self.engine.add(&obj.to_search_document()).await {
                Ok(()) => {
                    debug!(id = obj.id, title = %obj.title, "reindexed");
                    report.indexed += 1;
                }
                Err(e) => {
                    warn!(id = obj.id, error = %e, "failed to reindex content object");
                    report.failed += 1;
                }
            }
        }
        info!(
            indexed = report.indexed,
            failed = report.failed,
            engine = self.engine.name(),
            "reindex finished"
        );
        Ok(report)
    }

    pub async fn search(&self, text: &str) -> Vec<SearchHit> {
        self.engine.query(text).await
    }

    /// Path of the file holding object `id`.
    pub fn locate(&self, id: u64) -> Result<PathBuf> {
        let mut matches = self.files.list(&format!("**/{}.md", id))?;
        if matches.len() > 1 {
            warn!(id, count = matches.len(), "several files claim the same id; using the first");
        }
        if matches.is_empty() {
            return Err(Error::NotFound(id));
        }
        Ok(matches.swap_remove(0))
    }

    fn read_object(&self, path: &Path) -> Result<ContentObject> {
        let raw = self.files.read(path)?;
        frontmatter::parse(path, &raw)
    }

    async fn index(&self, obj: &ContentObject) {
        if let Err(e) = self.engine.add(&obj.to_search_document()).await {
            warn!(
                id = obj.id,
                engine = self.engine.name(),
                error = %e,
                "failed to index content object; run `shelf reindex` to repair"
            );
        }
    }
}
