use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use feedflow::config::Config;
use feedflow::pipeline::{http_client, reconvert_pages, shutdown_signal, Pipeline};
use feedflow::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(
    name = "feedflow",
    about = "Continuous feed ingestion with readable page extraction"
)]
struct Args {
    /// Config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "feedflow.toml")]
    config: PathBuf,

    /// SQLite database, overrides `database_path`
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Number of extraction workers, overrides `workers`
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Register a feed and exit
    #[arg(long, value_name = "URL", requires = "slug")]
    add_feed: Option<String>,

    /// Slug for the feed passed to --add-feed
    #[arg(long, value_name = "SLUG")]
    slug: Option<String>,

    /// Refresh interval for the feed passed to --add-feed
    #[arg(long, value_name = "SECS", requires = "add_feed")]
    refresh_secs: Option<u64>,

    /// Re-run markdown conversion over every stored page and exit
    #[arg(long, conflicts_with = "add_feed")]
    reconvert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(path) = args.database.clone() {
        config.database_path = path;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate().context("Invalid configuration")?;

    let db_path = config
        .database_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!("Error: {} is locked by another process.", db_path);
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database {}: {}", db_path, e)),
    };

    if let (Some(url), Some(slug)) = (&args.add_feed, &args.slug) {
        let result = add_feed(&db, slug, url, args.refresh_secs).await;
        db.close().await;
        return result;
    }

    if args.reconvert {
        let report = reconvert_pages(&db).await;
        db.close().await;
        let report = report?;
        println!(
            "Reconverted {} of {} pages ({} failed)",
            report.updated, report.pages, report.failed
        );
        return Ok(());
    }

    let client = http_client(&config)?;
    let pipeline = Pipeline::start(db.clone(), client, &config).await?;
    if pipeline.poller_count() == 0 {
        tracing::warn!("No feeds registered; add one with --add-feed <URL> --slug <SLUG>");
    }

    if let Err(e) = shutdown_signal().await {
        tracing::error!(error = %e, "Failed to listen for signals, shutting down");
    }

    let stats = pipeline.shutdown().await;
    db.close().await;
    println!(
        "Stopped: {} extracted, {} skipped, {} failed",
        stats.extracted, stats.skipped, stats.failed
    );
    Ok(())
}

async fn add_feed(db: &Database, slug: &str, url: &str, refresh_secs: Option<u64>) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid feed URL: {}", url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Feed URL must use http or https: {}", url);
    }
    if slug.trim().is_empty() {
        anyhow::bail!("Feed slug must not be empty");
    }

    if let Some(existing) = db.find_feed_by_url(url).await? {
        println!("Feed already registered as '{}' ({})", existing.slug, existing.id);
        return Ok(());
    }

    let refresh = refresh_secs.filter(|&s| s > 0).map(Duration::from_secs);
    let id = db
        .add_feed(slug, url, refresh)
        .await
        .with_context(|| format!("Failed to add feed '{}'", slug))?;
    tracing::info!(feed = %slug, id = %id, url = %url, "Feed registered");
    println!("Added feed '{}' ({})", slug, id);
    Ok(())
}
