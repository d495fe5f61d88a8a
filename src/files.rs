//! Content file store.
//!
//! The synchronizer only needs raw reads, writes, deletes, and a glob
//! listing; parsing the bytes is the job of [`crate::frontmatter`].

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub trait FileStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<String>;

    /// Create or replace the file at `path`.
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Create the file at `path`, failing if something already exists there.
    fn write_new(&self, path: &Path, content: &str) -> Result<()>;

    fn delete(&self, path: &Path) -> Result<()>;

    /// Files under the store root whose root-relative path matches `pattern`,
    /// sorted.
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// [`FileStore`] over a directory on the local file system.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

impl FileStore for LocalFileStore {
    fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, content).map_err(|source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_new(&self, path: &Path, content: &str) -> Result<()> {
        ensure_parent(path)?;
        let to_err = |source: std::io::Error| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(to_err)?;
        file.write_all(content.as_bytes()).map_err(to_err)?;
        file.sync_all().map_err(to_err)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|source| Error::FileDelete {
            path: path.to_path_buf(),
            source,
        })
    }

    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let matcher = build_globset(&[pattern])?;

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| Error::FileRead {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if matcher.is_match(relative) {
                paths.push(path.to_path_buf());
            }
        }

        // Sort for deterministic ordering
        paths.sort();
        Ok(paths)
    }
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::InvalidInput(format!("bad glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::InvalidInput(format!("bad glob set: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_new_refuses_existing_file() {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::new(tmp.path());
        let path = tmp.path().join("notes/1.md");

        store.write_new(&path, "first").unwrap();
        let err = store.write_new(&path, "second").unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
        assert_eq!(store.read(&path).unwrap(), "first");

        store.write(&path, "third").unwrap();
        assert_eq!(store.read(&path).unwrap(), "third");
    }

    #[test]
    fn test_list_matches_relative_glob() {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::new(tmp.path());
        store.write(&tmp.path().join("notes/1.md"), "a").unwrap();
        store.write(&tmp.path().join("bookmarks/2.md"), "b").unwrap();
        store.write(&tmp.path().join("notes/readme.txt"), "c").unwrap();

        let all = store.list("**/*.md").unwrap();
        assert_eq!(all.len(), 2);

        let two = store.list("*/2.md").unwrap();
        assert_eq!(two, vec![tmp.path().join("bookmarks/2.md")]);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::new(tmp.path().join("nope"));
        assert!(store.list("**/*.md").unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::new(tmp.path());
        let err = store.delete(&tmp.path().join("notes/9.md")).unwrap_err();
        assert!(matches!(err, Error::FileDelete { .. }));
    }
}
