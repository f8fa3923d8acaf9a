//! shelf-discover - Discover search command-line front end
//!
//! Runs searches through the cached pipeline and inspects or prunes the
//! persistent feed cache in `<root>/shelf.db`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use shelf_discover::db::{FeedCacheStore, SqliteFeedCache};
use shelf_discover::services::decode_volume_detail;
use shelf_discover::{Category, DiscoverConfig};

/// Environment variable naming the Shelf root folder
const ROOT_FOLDER_ENV_VAR: &str = "SHELF_ROOT_FOLDER";

#[derive(Parser, Debug)]
#[command(name = "shelf-discover")]
#[command(about = "Search the Books API through the Shelf discover cache")]
#[command(version)]
struct Args {
    /// Root folder holding shelf.db
    #[arg(long, global = true)]
    root_folder: Option<String>,

    /// Discover config file (default: ~/.config/shelf/discover.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search volumes and print them as JSON
    Search {
        query: String,

        /// Category id the results are cached under
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        max_results: Option<u32>,
    },
    /// Fetch a single volume by id
    Detail { id: String },
    /// List persisted feed rows for a category
    Cached { category_id: String },
    /// Delete persisted feed rows older than the retention window
    Prune {
        #[arg(long)]
        older_than_hours: Option<i64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = DiscoverConfig::load(args.config.as_deref())
        .context("Failed to load discover configuration")?;

    if let Command::Detail { id } = &args.command {
        let client = shelf_discover::build_books_client(&config)?;
        let body = client.detail(id).await?;
        let record = decode_volume_detail(&body)?;
        return print_json(&record);
    }

    let root_folder = shelf_common::config::resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV_VAR,
        Some(shelf_discover::config::MODULE_NAME),
    );
    let db_path = shelf_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = shelf_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Search {
            query,
            category,
            max_results,
        } => {
            let repository = shelf_discover::build_search_repository(&config, pool)?;
            let category = category.map(|id| Category::new(id.clone(), id));
            let records = repository
                .search(Some(&query), category.as_ref(), max_results)
                .await?;
            print_json(&records)?;
        }
        Command::Cached { category_id } => {
            let rows = SqliteFeedCache::new(pool).fetch(&category_id, "").await?;
            print_json(&rows)?;
        }
        Command::Prune { older_than_hours } => {
            let cutoff = config
                .prune_cutoff(shelf_common::time::now(), older_than_hours)
                .context("Invalid prune window")?;
            let removed = SqliteFeedCache::new(pool).prune(cutoff).await?;
            info!(removed, "Pruned discover feed cache");
        }
        Command::Detail { .. } => {}
    }

    Ok(())
}
