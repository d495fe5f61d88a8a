//! # Shelf CLI (`shelf`)
//!
//! ## Usage
//!
//! ```bash
//! shelf --config ./config/shelf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shelf init` | Create the data directory and the metadata database |
//! | `shelf health` | Report the search backend's cluster health |
//! | `shelf new <kind> <title>` | Create a note or bookmark |
//! | `shelf edit <id>` | Change the title, body, tags or url of an object |
//! | `shelf delete <id>` | Remove an object from disk and from the index |
//! | `shelf show <id>` | Print one object |
//! | `shelf list` | List every object |
//! | `shelf search "<query>"` | Full-text search |
//! | `shelf reindex` | Rebuild the search index from the content files |
//! | `shelf create-admin <username>` | Create an administrator account |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use shelf::bootstrap::{self, Shelf};
use shelf::config::{self, Config};
use shelf::hooks::HookRegistry;
use shelf::migrate;
use shelf::models::{ContentKind, ContentObject, ContentPatch, NewContent};
use shelf::search;

/// Shelf: notes and bookmarks kept as Markdown files, with full-text search.
#[derive(Parser)]
#[command(name = "shelf", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/shelf.toml")]
    config: PathBuf,

    /// Log at debug level. `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and the metadata database. Idempotent.
    Init,

    /// Check that the search backend is reachable.
    Health,

    /// Create a content object.
    New {
        /// `note`, `bookmark`, or another lowercase kind name.
        kind: ContentKind,
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Edit an existing content object.
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Replaces the whole tag set. Repeatable.
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        #[arg(long)]
        url: Option<String>,
        /// Drop the url.
        #[arg(long, conflicts_with = "url")]
        clear_url: bool,
    },

    /// Delete a content object.
    Delete { id: u64 },

    /// Print a content object.
    Show { id: u64 },

    /// List all content objects.
    List,

    /// Search content objects.
    Search { query: String },

    /// Rebuild the search index from the content files.
    Reindex,

    /// Create an administrator account.
    CreateAdmin {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "shelf=debug" } else { "shelf=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open(cfg: &Config) -> anyhow::Result<Shelf> {
    bootstrap::start(cfg, HookRegistry::new())
        .await
        .context("Failed to start")
}

fn print_object(obj: &ContentObject) {
    println!("#{} [{}] {}", obj.id, obj.kind, obj.title);
    if let Some(url) = &obj.url {
        println!("url:     {}", url);
    }
    if !obj.tags.is_empty() {
        let tags: Vec<&str> = obj.tags.iter().map(String::as_str).collect();
        println!("tags:    {}", tags.join(", "));
    }
    println!("created: {}", obj.created_at.to_rfc3339());
    println!("updated: {}", obj.updated_at.to_rfc3339());
    if !obj.body.is_empty() {
        println!();
        println!("{}", obj.body);
    }
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&cfg.data_dir).with_context(|| {
                format!("Failed to create data dir: {}", cfg.data_dir.display())
            })?;
            migrate::run_migrations(&cfg).await?;
            println!("Initialized data dir {}", cfg.data_dir.display());
            println!("Initialized database {}", cfg.db.path.display());
        }
        Commands::Health => {
            if !cfg.search.enabled {
                println!("search: disabled");
                return Ok(());
            }
            let engine = search::create_engine(&cfg.search)?;
            let health = engine
                .health()
                .await
                .with_context(|| format!("Search backend at {} is unreachable", cfg.search.url))?;
            println!("search: {} ({})", health, cfg.search.url);
        }
        Commands::New {
            kind,
            title,
            body,
            tags,
            url,
        } => {
            let shelf = open(&cfg).await?;
            let obj = shelf
                .sync()
                .create(NewContent {
                    title,
                    body,
                    tags: tags.into_iter().collect(),
                    kind,
                    url,
                })
                .await?;
            println!("Created #{} at {}", obj.id, obj.path_in(&cfg.data_dir).display());
            shelf.close().await;
        }
        Commands::Edit {
            id,
            title,
            body,
            tags,
            url,
            clear_url,
        } => {
            let patch = ContentPatch {
                title,
                body,
                tags: tags.map(|t| t.into_iter().collect()),
                url: if clear_url { Some(None) } else { url.map(Some) },
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change: pass at least one of --title, --body, --tag, --url, --clear-url");
            }
            let shelf = open(&cfg).await?;
            let obj = shelf.sync().update(id, patch).await?;
            println!("Updated #{}", obj.id);
            shelf.close().await;
        }
        Commands::Delete { id } => {
            let shelf = open(&cfg).await?;
            shelf.sync().delete(id).await?;
            println!("Deleted #{}", id);
            shelf.close().await;
        }
        Commands::Show { id } => {
            let shelf = open(&cfg).await?;
            print_object(&shelf.sync().get(id).await?);
            shelf.close().await;
        }
        Commands::List => {
            let shelf = open(&cfg).await?;
            let objects = shelf.sync().list().await?;
            if objects.is_empty() {
                println!("No content yet.");
            }
            for obj in &objects {
                println!("{:>5}  {:<9} {}", obj.id, obj.kind.as_str(), obj.title);
            }
            shelf.close().await;
        }
        Commands::Search { query } => {
            if !cfg.search.enabled {
                println!("Search must be enabled for this command.");
                return Ok(());
            }
            let shelf = open(&cfg).await?;
            let hits = shelf.sync().search(&query).await;
            if hits.is_empty() {
                println!("No results.");
            }
            for hit in &hits {
                println!("{:>5}  {}", hit.id, hit.title);
                if !hit.snippet.is_empty() {
                    println!("       {}", hit.snippet);
                }
            }
            shelf.close().await;
        }
        Commands::Reindex => {
            if !cfg.search.enabled {
                println!("Search must be enabled for this command.");
                return Ok(());
            }
            let shelf = open(&cfg).await?;
            let report = shelf.sync().reindex().await?;
            println!(
                "Reindexed {} objects ({} failed)",
                report.indexed, report.failed
            );
            shelf.close().await;
        }
        Commands::CreateAdmin { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let shelf = open(&cfg).await?;
            let user = shelf.create_user(&username, &password, true).await?;
            println!("Created admin '{}' (id {})", user.username, user.id);
            shelf.close().await;
        }
    }

    Ok(())
}
