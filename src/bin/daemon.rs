//! Galdex daemon for periodic re-indexing.
//!
//! Rescans the whole media folder on an interval and merges the result
//! through the write queue, so it can run next to the CLI or a gallery
//! server sharing the same index.
//!
//! ## Usage
//!
//! ```bash
//! galdex-daemon              # Run in foreground
//! galdex-daemon --once       # Rescan once and exit
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use galdex::db::Database;
use galdex::{logging, Config, IndexingManager};

struct DaemonArgs {
    /// Seconds between rescans, overriding the config file
    interval: Option<u64>,
    once: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> DaemonArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = DaemonArgs {
        interval: None,
        once: false,
        config_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" | "-1" => {
                parsed.once = true;
            }
            "--interval" | "-i" => {
                if i + 1 < args.len() {
                    if let Ok(interval) = args[i + 1].parse() {
                        parsed.interval = Some(interval);
                    }
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"galdex-daemon - periodic re-indexer for Galdex

USAGE:
    galdex-daemon [OPTIONS]

OPTIONS:
    --once, -1          Rescan once and exit
    --interval, -i N    Seconds between rescans (default: daemon.interval_secs)
    --config, -c PATH   Path to config file
    --help, -h          Show this help message

ENVIRONMENT:
    GALDEX_CONFIG       Path to config file (overrides default location)
    GALDEX_LOG          Log filter (trace, debug, info, warn, error)

Hours of operation are read from daemon.hours_start / daemon.hours_end.
"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    logging::init(None)?;
    info!("Galdex daemon starting...");

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let config = Arc::new(config);
    info!(media = %config.media.folder.display(), "Config loaded");

    let db = Database::open(&config.db_path).context("Failed to open database")?;
    db.initialize()?;
    info!("Database opened at {:?}", config.db_path);

    let indexing = IndexingManager::new(Arc::new(db), Arc::clone(&config));

    if args.once {
        info!("Running in single-shot mode");
        rescan(&indexing).await?;
    } else {
        let interval = args.interval.unwrap_or(config.daemon.interval_secs);
        info!("Running in daemon mode, rescanning every {} seconds", interval);
        tokio::select! {
            _ = run_loop(&indexing, &config, interval) => {}
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
    }

    info!("Galdex daemon stopped");
    Ok(())
}

async fn run_loop(indexing: &IndexingManager, config: &Config, interval: u64) {
    loop {
        if config.daemon.is_active_at(Local::now().time()) {
            if let Err(e) = rescan(indexing).await {
                error!(error = %e, "Rescan failed");
            }
        } else {
            info!("Outside hours of operation, skipping this cycle");
        }

        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}

async fn rescan(indexing: &IndexingManager) -> Result<()> {
    let started = std::time::Instant::now();
    let tree = indexing.index_directory(".", true).await?;

    let mut directories = 0usize;
    let mut media = 0usize;
    tree.walk(&mut |dir| {
        directories += 1;
        media += dir.media_count as usize;
    });
    info!(
        directories,
        media,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Rescan complete"
    );
    Ok(())
}
