//! aim-memory CLI - inspect, migrate and convert knowledge graph storage

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use aim_memory::config::{self, AimConfig};
use aim_memory::storage::{sqlite_path_for, StorageKind};
use aim_memory::{create_backend, ui, GraphStore, SqliteStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "aim-memory")]
#[command(version)]
#[command(about = "Knowledge graph storage - line-oriented JSON or embedded SQLite")]
#[command(long_about = r#"
aim-memory persists a knowledge graph of entities, observations and relations.

Storage is selected with --storage or the AIM_STORAGE_TYPE environment
variable (jsonl or sqlite, default jsonl). The SQLite file lives next to the
JSONL file with a .db extension.

Example usage:
  aim-memory show --memory-path ./memory.jsonl
  aim-memory migrate --memory-path ./memory.jsonl
  aim-memory stats --storage sqlite
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the JSONL graph file
    #[arg(short, long, global = true)]
    memory_path: Option<PathBuf>,

    /// Storage backend (jsonl, sqlite)
    #[arg(short, long, global = true)]
    storage: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole graph as JSON
    Show,

    /// Show entity, observation and relation counts
    Stats,

    /// Import the JSONL file into the SQLite database (runs once)
    Migrate {
        /// JSONL file to import (defaults to the memory path)
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Copy the graph from the configured backend into another one
    Convert {
        /// Target backend (jsonl, sqlite)
        #[arg(long)]
        to: String,
    },

    /// Write a config file with the current settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = config::load_config(cli.config.as_deref())?;
    let env_storage = config::storage_from_env();
    let settings = config::resolve(
        cli.memory_path.as_deref(),
        cli.storage.as_deref(),
        env_storage.as_deref(),
        file_config.as_ref(),
    );
    tracing::info!(
        "Using {} storage for {}",
        settings.storage,
        settings.memory_path.display()
    );

    match cli.command {
        Commands::Show => {
            let mut backend = create_backend(&settings.memory_path, settings.storage);
            let graph = backend.load_graph()?;
            backend.close()?;
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }

        Commands::Stats => {
            let mut backend = create_backend(&settings.memory_path, settings.storage);
            let graph = backend.load_graph()?;
            let location = backend
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            backend.close()?;

            ui::header(&format!("aim-memory statistics ({})", settings.storage));
            ui::info("Location", &location);
            println!("{}", ui::stats_table(&graph.stats()));
        }

        Commands::Migrate { from } => {
            let source = from.unwrap_or_else(|| settings.memory_path.clone());
            let db_path = sqlite_path_for(&settings.memory_path);

            ui::header("Migrating JSONL into SQLite");
            ui::info("Source", &source.display().to_string());
            ui::info("Database", &db_path.display().to_string());

            let mut store = SqliteStore::new(&db_path);
            let outcome = store.migrate_from_jsonl(&source)?;
            store.close()?;
            ui::success(&outcome.to_string());
        }

        Commands::Convert { to } => {
            let target_kind = StorageKind::from_setting(&to);
            if target_kind == settings.storage {
                ui::warn(&format!("Source and target are both {}, nothing to do", target_kind));
                return Ok(());
            }

            let mut source = create_backend(&settings.memory_path, settings.storage);
            let graph = source.load_graph()?;
            source.close()?;

            let mut target = create_backend(&settings.memory_path, target_kind);
            target.save_graph(&graph)?;
            let location = target
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            target.close()?;

            let stats = graph.stats();
            ui::success(&format!(
                "Copied {} entities and {} relations from {} to {} ({})",
                stats.entities, stats.relations, settings.storage, target_kind, location
            ));
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let new_config = AimConfig {
                memory_path: Some(settings.memory_path.display().to_string()),
                storage: Some(settings.storage.to_string()),
            };
            config::write_config(&path, &new_config, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}
