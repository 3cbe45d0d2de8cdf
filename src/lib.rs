pub mod config;
pub mod engine;
pub mod error;
pub mod iiif;
pub mod load;
pub mod search;
pub mod server;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;

use config::{AnnoSearchConfig, ConfigError};
use engine::index_config::{annotations_index_config, autocomplete_index_config};
use engine::{QuickwitClient, annotations_index, autocomplete_index};
use iiif::SourceKind;
use load::{HttpFetcher, Loader};
use search::{SearchClient, SearchParams};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "annosearch",
    version,
    about = "IIIF Content Search 2.0 over a Quickwit engine"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to $ANNOSEARCH_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the engine indexes for a logical index
    Init {
        #[arg(long)]
        index: String,
    },
    /// Crawl a Manifest, Collection or AnnotationCollection into an index
    Load {
        #[arg(long)]
        index: String,

        /// URI of the entry document
        #[arg(long)]
        uri: String,

        /// Declared type of the entry document
        #[arg(long = "type", value_enum, default_value_t = SourceKind::Manifest)]
        kind: SourceKind,

        /// Force the engine to commit every batch immediately
        #[arg(long)]
        commit: bool,
    },
    /// Delete the engine indexes of a logical index
    Delete {
        #[arg(long)]
        index: String,
    },
    /// Run a search and print the highlighted AnnotationPage
    Search {
        #[arg(long)]
        index: String,

        #[arg(long, short)]
        query: String,

        #[arg(long)]
        motivation: Option<String>,

        /// Space-separated `start/end` RFC 3339 ranges
        #[arg(long)]
        date: Option<String>,

        /// Space-separated creator URIs
        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        page: i64,
    },
    /// Run an autocomplete query and print the TermPage
    Autocomplete {
        #[arg(long)]
        index: String,

        #[arg(long, short)]
        query: String,
    },
    /// Serve the search API over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Allowed CORS origin, or `*`
        #[arg(long)]
        cors: Option<String>,
    },
    /// Print the version as JSON
    Version,
}

/// Defaults, then the config file, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AnnoSearchConfig, ConfigError> {
    let mut config = match path {
        Some(path) => AnnoSearchConfig::load_from(path)?,
        None => match AnnoSearchConfig::config_path() {
            Some(path) => AnnoSearchConfig::load_from(&path)?,
            None => AnnoSearchConfig::default(),
        },
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

pub async fn run(cli: Cli, config: AnnoSearchConfig) -> Result<()> {
    let result = match cli.command {
        Commands::Init { index } => run_init(&config, &index).await,
        Commands::Load {
            index,
            uri,
            kind,
            commit,
        } => run_load(&config, &index, &uri, kind, commit).await,
        Commands::Delete { index } => run_delete(&config, &index).await,
        Commands::Search {
            index,
            query,
            motivation,
            date,
            user,
            page,
        } => {
            let params = SearchParams {
                q: query,
                motivation,
                date,
                user,
                page,
            };
            run_search(&config, &index, &params).await
        }
        Commands::Autocomplete { index, query } => run_autocomplete(&config, &index, &query).await,
        Commands::Serve { host, port, cors } => {
            let mut config = config;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(cors) = cors {
                config.cors_origin = cors;
            }
            server::serve(&config).await
        }
        Commands::Version => print_json(&json!({ "version": env!("CARGO_PKG_VERSION") })),
    };

    if let Err(err) = &result {
        err.log();
    }
    Ok(result?)
}

fn print_json<T: Serialize>(value: &T) -> error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_index(index: &str) -> error::Result<()> {
    search::sanitize::validate_index_id(index)
}

async fn run_init(config: &AnnoSearchConfig, index: &str) -> error::Result<()> {
    require_index(index)?;
    let engine = QuickwitClient::from_config(config)?;
    let annotations = engine.create_index(&annotations_index_config(index)).await?;
    let autocomplete = engine.create_index(&autocomplete_index_config(index)).await?;
    tracing::info!(index, "indexes created");
    print_json(&json!({ "annotations": annotations, "autocomplete": autocomplete }))
}

async fn run_delete(config: &AnnoSearchConfig, index: &str) -> error::Result<()> {
    require_index(index)?;
    let engine = QuickwitClient::from_config(config)?;
    let annotations = engine.delete_index(&annotations_index(index)).await?;
    let autocomplete = engine.delete_index(&autocomplete_index(index)).await?;
    tracing::info!(index, "indexes deleted");
    print_json(&json!({ "annotations": annotations, "autocomplete": autocomplete }))
}

fn load_progress() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {pos} annotations ingested {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

async fn run_load(
    config: &AnnoSearchConfig,
    index: &str,
    uri: &str,
    kind: SourceKind,
    commit: bool,
) -> error::Result<()> {
    let engine = QuickwitClient::from_config(config)?;
    let fetcher = HttpFetcher::new(engine.http().clone());
    let summary = Loader::new(&fetcher, &engine, index, commit)
        .with_progress(load_progress())
        .run(uri, kind)
        .await?;
    print_json(&summary)
}

async fn run_search(config: &AnnoSearchConfig, index: &str, params: &SearchParams) -> error::Result<()> {
    require_index(index)?;
    let client = SearchClient::from_config(config)?;
    print_json(&client.search_index(index, params).await?)
}

async fn run_autocomplete(config: &AnnoSearchConfig, index: &str, query: &str) -> error::Result<()> {
    require_index(index)?;
    let client = SearchClient::from_config(config)?;
    print_json(&client.search_autocomplete(index, query, &[]).await?)
}
