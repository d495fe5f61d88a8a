//! # Shelf
//!
//! A personal knowledge base core that keeps three storage surfaces
//! consistent: Markdown content files on disk, a document-oriented metadata
//! store, and an optional full-text search index.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   CLI / API ──▶ │ ContentSync  │──▶ hooks (before_create, on_create, ...)
//!                 └──┬────┬────┬─┘
//!                    │    │    │
//!          ┌─────────┘    │    └───────────┐
//!          ▼              ▼                ▼
//!   ┌────────────┐  ┌───────────┐   ┌──────────────┐
//!   │ IdAllocator│  │ FileStore │   │ SearchEngine │
//!   │ (MetaStore)│  │ *.md + FM │   │ ES / memory  │
//!   └────────────┘  └───────────┘   └──────────────┘
//! ```
//!
//! Content files are authoritative. The search index is derived state and
//! can always be rebuilt with `shelf reindex`.
//!
//! ## Quick Start
//!
//! ```bash
//! shelf init
//! shelf new note "Meeting Notes" --body "Discuss roadmap" --tag work
//! shelf search roadmap
//! shelf delete 1
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bootstrap`] | Startup sequencing and the [`bootstrap::Shelf`] handle |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite connection pool |
//! | [`error`] | Error taxonomy |
//! | [`files`] | Content file store |
//! | [`frontmatter`] | YAML front matter encoding |
//! | [`hooks`] | Lifecycle hook registry |
//! | [`ids`] | Monotonic content id allocation |
//! | [`meta`] | Schemaless metadata store |
//! | [`migrate`] | Schema migrations |
//! | [`models`] | Core data types |
//! | [`search`] | Search engine abstraction and backends |
//! | [`sync`] | Content object synchronizer |
//! | [`users`] | User records |

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod frontmatter;
pub mod hooks;
pub mod ids;
pub mod meta;
pub mod migrate;
pub mod models;
pub mod search;
pub mod sync;
pub mod users;
