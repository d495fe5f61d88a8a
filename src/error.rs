//! Error types for the content, metadata, and search surfaces.
//!
//! Failures of the authoritative stores (content files, metadata database)
//! surface as [`Error`] and always reach the caller. Failures of the derived
//! search index surface as [`SearchError`] and are normally absorbed by the
//! synchronizer after being logged.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The metadata store could not be reached or returned garbage.
    #[error("metadata store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("content object {0} not found")]
    NotFound(u64),

    #[error("malformed content file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Search is enabled but the backend could not be reached at startup.
    #[error("search backend unavailable at {url}: {source}")]
    SearchUnavailable {
        url: String,
        #[source]
        source: SearchError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::StoreUnavailable(format!("corrupt document: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Transport-level failure: refused connection, DNS, timeout.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("index {0} already exists")]
    IndexAlreadyExists(String),

    #[error("document {0} not found in index")]
    DocumentNotFound(u64),

    #[error("query failed: {0}")]
    Query(String),

    /// Any other non-success answer from the backend.
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::ConnectionFailure(err.to_string())
        } else {
            Self::Query(err.to_string())
        }
    }
}
