//! Digidex - incremental catalog loader with a persistent local cache.
//!
//! # Usage
//!
//! ```bash
//! # Warm the cache for the unfiltered catalog
//! digidex
//!
//! # Warm one filter configuration and resolve a search on top
//! digidex --attribute Data --level Adult --search greymon
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use digidex_client::{CatalogClientConfig, HttpCatalogClient, StaticNameIndex};
use digidex_core::metrics::init_metrics;
use digidex_core::models::{Attribute, CatalogId, FilterState, Level};
use digidex_core::ports::RecordStore;
use digidex_core::services::{CatalogView, ViewConfig, DEFAULT_PAGE_SIZE};
use digidex_storage::{Database, DatabaseConfig, SqliteRecordStore};

/// Digidex CLI - catalog cache warmer and inspector.
#[derive(Parser, Debug)]
#[command(name = "digidex")]
#[command(about = "Digidex - incremental catalog loader & cache")]
#[command(version)]
struct Cli {
    /// Catalog API base URL.
    #[arg(
        long,
        env = "CATALOG_API_URL",
        default_value = "https://digi-api.com/api/v1"
    )]
    api_url: String,

    /// SQLite cache URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://digidex.db")]
    database_url: String,

    /// Path to the static name-index asset (JSON array of {id, name}).
    #[arg(long, env = "NAME_INDEX", default_value = "data/name_index.json")]
    name_index: PathBuf,

    /// Attribute filter (Vaccine, Data, Virus, Free, Variable, Unknown).
    #[arg(long)]
    attribute: Option<Attribute>,

    /// Level filter (Baby I, Baby II, Child, Adult, Perfect, Ultimate, Armor, Hybrid).
    #[arg(long)]
    level: Option<Level>,

    /// Resolve a search term against the name index after the warm run.
    #[arg(long)]
    search: Option<String>,

    /// Show the full detail record for one identifier and exit.
    #[arg(long)]
    detail: Option<CatalogId>,

    /// Minimal-index entries resolved per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all cached records and exit.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => match PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
        {
            Ok(()) => init_metrics(),
            Err(e) => {
                warn!(
                    "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                    e
                );
            }
        },
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
        }
    }

    info!("🗂️  Starting Digidex");
    debug!(api_url = %cli.api_url, "Catalog endpoint");
    debug!(database_url = %cli.database_url, "Cache endpoint");

    let db_config = DatabaseConfig::for_url(&cli.database_url);
    let db = Database::connect(&db_config)
        .await
        .context("Failed to open the record cache")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Record cache ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let store = Arc::new(SqliteRecordStore::new(&db));

    let name_index = StaticNameIndex::from_path(&cli.name_index)
        .context("Failed to load the name index asset")?;
    info!(entries = name_index.len(), "🔎 Name index loaded");

    let client_config = CatalogClientConfig {
        base_url: cli.api_url.clone(),
        ..Default::default()
    };
    let source =
        Arc::new(HttpCatalogClient::new(client_config).context("Failed to build API client")?);

    let view = CatalogView::new(
        store.clone(),
        source,
        Arc::new(name_index),
        ViewConfig {
            page_size: cli.page_size,
            ..Default::default()
        },
    );

    // Detail mode short-circuits the warm run.
    if let Some(id) = cli.detail {
        return show_detail(&view, id).await;
    }

    let filter = FilterState {
        attribute: cli.attribute,
        level: cli.level,
    };

    if filter.is_empty() {
        info!("📖 Computing minimal index (unfiltered)...");
    } else {
        info!(?filter, "📖 Computing minimal index...");
    }
    view.set_filter(filter).await;
    info!(
        entries = view.index_len(),
        loaded = view.loaded().len(),
        "📖 Minimal index ready"
    );

    // Page through the whole index, the same path a scroll-proximity
    // signal would drive. Ctrl+C stops between pages; everything resolved
    // so far is already in the cache.
    let mut interrupted = false;
    while !view.is_exhausted() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("🛑 Interrupted, stopping after the in-flight page");
                interrupted = true;
                break;
            }
            merged = view.load_next_page() => {
                if merged {
                    debug!(loaded = view.loaded().len(), "Page merged");
                }
            }
        }
    }

    if let Some(term) = &cli.search
        && !interrupted
    {
        view.search_now(term).await;
        let matches = view.visible(term);
        info!(term = %term, matches = matches.len(), "🔎 Search resolved");
        for record in &matches {
            info!("   #{} {}", record.id, record.name);
        }
    }

    let cached = store.len().await.map(|n| n.to_string()).unwrap_or_else(|_| "?".into());
    info!("✅ Warm run complete");
    info!("   📇 Index entries: {}", view.index_len());
    info!("   📦 Loaded set:    {}", view.loaded().len());
    info!("   🗄️  Cached records: {}", cached);

    db.close().await;
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Show the full detail record for one identifier.
async fn show_detail(view: &CatalogView, id: CatalogId) -> Result<()> {
    match view.detail(id).await {
        Some(record) => {
            info!("📄 #{} {}", record.id, record.name);
            if let Some(levels) = &record.levels {
                let levels: Vec<&str> = levels.iter().map(|l| l.level.as_str()).collect();
                info!("   Level:     {}", levels.join(", "));
            }
            if let Some(attributes) = &record.attributes {
                let attrs: Vec<&str> = attributes.iter().map(|a| a.attribute.as_str()).collect();
                info!("   Attribute: {}", attrs.join(", "));
            }
            if let Some(skills) = &record.skills {
                info!("   Skills:    {}", skills.len());
            }
            Ok(())
        }
        None => {
            warn!("❌ Record {} is unavailable (not cached, remote reports missing)", id);
            Ok(())
        }
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL cached records!");
    warn!("   - Schema and migrations will be preserved");
    warn!("   - The cache repopulates lazily on the next run");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge the cache? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging cache...");
    let stats = db.purge().await.context("Failed to purge the cache")?;

    info!("✅ Cache purged successfully");
    info!("   📦 Records removed: {}", stats.records_removed);

    Ok(())
}
