use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use galdex::albums::AlbumManager;
use galdex::db::Database;
use galdex::{logging, Config, GalleryManager, IndexingManager};

enum Command {
    Index { dir: String, deep: bool },
    List { dir: String },
    Albums,
    Reset,
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut deep = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("galdex {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--deep" | "-d" => deep = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let name = positional.next();
    let dir = positional.next().unwrap_or_else(|| ".".to_string());
    if let Some(extra) = positional.next() {
        eprintln!("Unexpected argument: {}", extra);
        std::process::exit(1);
    }

    let command = match name.as_deref() {
        Some("index") => Command::Index { dir, deep },
        Some("list") => Command::List { dir },
        Some("albums") => Command::Albums,
        Some("reset") => Command::Reset,
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        config_path,
        command,
    }
}

fn print_help() {
    println!(
        r#"galdex - media folder indexer

USAGE:
    galdex [OPTIONS] <COMMAND> [DIR]

COMMANDS:
    index [DIR]         Scan DIR (relative to the media folder) and store it
    list [DIR]          Show DIR from the index, re-indexing it when stale
    albums              Show albums from saved-search files
    reset               Delete the whole index

OPTIONS:
    --deep, -d          With index: scan the whole subtree
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    GALDEX_CONFIG       Path to config file (overrides default location)
    GALDEX_LOG          Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/galdex/config.toml

See also: galdex-daemon --help"#
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    if let Err(e) = logging::init_stderr() {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    let config = match args.config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    let config = Arc::new(config);

    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening index at {}", config.db_path.display()))?;
    db.initialize()?;
    let db = Arc::new(db);

    let indexing = IndexingManager::new(Arc::clone(&db), Arc::clone(&config));

    match args.command {
        Command::Index { dir, deep } => {
            let tree = indexing.index_directory(&dir, deep).await?;
            print_json(&tree)?;
        }
        Command::List { dir } => {
            let gallery = GalleryManager::new(indexing);
            let listing = gallery.list_directory(&dir, None, None).await?;
            print_json(&listing)?;
        }
        Command::Albums => {
            let albums = AlbumManager::new(db).get_albums().await?;
            print_json(&albums)?;
        }
        Command::Reset => {
            indexing.reset_db().await?;
            println!("Index reset");
        }
    }

    Ok(())
}
