use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use headline::{Aggregator, Config, FileCacheStore, HttpClient};

const DEFAULT_LIMIT: usize = 20;

/// Get the config directory path (~/.config/headline/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("headline"))
}

/// Get the cache directory path (~/.cache/headline/)
fn get_cache_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".cache").join("headline"))
}

/// Creates `dir` if needed and restricts it to the current user on Unix.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(dir, perms) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to set directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to read directory metadata"
                );
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "headline",
    about = "Aggregate, score and deduplicate news from feeds and APIs"
)]
struct Args {
    /// Config file (default: ~/.config/headline/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print ranked news items (the default)
    News {
        /// Bypass the cache and fetch every source
        #[arg(long)]
        refresh: bool,

        /// Maximum number of items
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Only items from this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the highest-ranked item
    Top,
    /// Print counts by category and source
    Stats,
    /// Delete the cached results
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    let cache_path = match &config.cache_path {
        Some(path) => path.clone(),
        None => {
            let dir = get_cache_dir()?;
            ensure_private_dir(&dir)?;
            dir.join("news.json")
        }
    };

    let http = HttpClient::new(config.http_timeout(), config.retry_policy())
        .context("Failed to build HTTP client")?;
    let cache = Arc::new(FileCacheStore::new(cache_path, config.cache_ttl()));
    let aggregator = Aggregator::new(http, config.registry()?, cache)
        .with_scorer(config.scorer())
        .with_settings(config.settings());

    let command = args.command.unwrap_or(Command::News {
        refresh: false,
        limit: DEFAULT_LIMIT,
        category: None,
    });

    match command {
        Command::News {
            refresh,
            limit,
            category: None,
        } => {
            let aggregation = aggregator.aggregate_with_report(refresh, limit).await;
            if aggregation.report.is_degraded() {
                eprintln!("Warning: every source failed; no news could be fetched");
                for (source, error) in &aggregation.report.sources_failed {
                    eprintln!("  {source}: {error}");
                }
            }
            print_json(&aggregation.items)?;
        }
        Command::News {
            refresh,
            limit,
            category: Some(category),
        } => {
            let items = aggregator
                .get_by_category_with(&category, limit, refresh)
                .await;
            print_json(&items)?;
        }
        Command::Top => match aggregator.get_top_story().await {
            Some(item) => print_json(&item)?,
            None => {
                eprintln!("No relevant news found");
                std::process::exit(1);
            }
        },
        Command::Stats => print_json(&aggregator.get_stats().await)?,
        Command::ClearCache => {
            if aggregator.clear_cache() {
                println!("Cache cleared.");
            } else {
                println!("No cache to clear.");
            }
        }
    }

    Ok(())
}
