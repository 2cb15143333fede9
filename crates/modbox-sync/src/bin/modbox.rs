//! # ModBox Console
//!
//! Lists workshop modules and syncs them into the local mods directory.
//!
//! ## Usage
//! ```bash
//! # Show the catalog
//! cargo run -p modbox-sync --bin modbox -- list
//!
//! # Sync every module that is not installed yet (Ctrl-C cancels)
//! cargo run -p modbox-sync --bin modbox -- sync
//!
//! # Use a specific config file
//! cargo run -p modbox-sync --bin modbox -- --config ./box.toml sync
//! ```
//!
//! Paths come from `box.toml` or `MODBOX_*` environment variables; see
//! [`modbox_sync::BoxConfig`].

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use modbox_core::CatalogSnapshot;
use modbox_sync::{
    BoxConfig, CatalogStore, LogSink, RefreshStatus, SyncCoordinator, WorkshopBackend,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut command = Command::List;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "list" => command = Command::List,
            "sync" => command = Command::Sync,
            "--help" | "-h" => {
                println!("ModBox workshop sync");
                println!();
                println!("Usage: modbox [OPTIONS] [list|sync]");
                println!();
                println!("Commands:");
                println!("  list               Show workshop modules (default)");
                println!("  sync               Install every module not yet synced");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let config = BoxConfig::load(config_path)?;
    let backend = WorkshopBackend::from_config(&config)?;
    info!(
        workshop = %backend.workshop_dir().display(),
        mods = %backend.mods_dir().display(),
        game = ?config.paths.game,
        "Starting ModBox"
    );

    let store = Arc::new(CatalogStore::new(Arc::new(backend), Arc::new(LogSink)));
    let coordinator = Arc::new(
        SyncCoordinator::new(Arc::clone(&store)).with_item_timeout(config.sync.item_timeout()),
    );

    match coordinator.refresh().await {
        RefreshStatus::Listed(_) => {}
        status => {
            error!(?status, "Could not list workshop modules");
            std::process::exit(1);
        }
    }
    print_catalog(&coordinator.snapshot());

    if command == Command::List {
        return Ok(());
    }

    let mut running = coordinator.spawn_sync();
    let result = tokio::select! {
        result = &mut running => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("Cancelling...");
            coordinator.cancel();
            running.await?
        }
    };

    match result {
        Ok(report) => {
            println!();
            println!("Session {}: {}", report.session_id, report.summary());
            for failure in &report.failed {
                println!("  ✗ {} ({})", failure.title, failure.id);
                for cause in &failure.causes {
                    println!("      {}", cause);
                }
            }
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Err(reason) => println!("{}", reason),
    }

    Ok(())
}

fn print_catalog(snapshot: &CatalogSnapshot) {
    println!("{} modules, {} to sync", snapshot.tasks.len(), snapshot.eligible_count());
    for task in &snapshot.tasks {
        let mark = if task.module.synced { "✓" } else { " " };
        println!(
            "  [{}] {:<12} {:<40} {}",
            mark, task.module.id, task.module.title, task.module.version
        );
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=modbox_sync=trace` - Trace the sync engine only
/// - Default: INFO, DEBUG for the sync engine
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,modbox_sync=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
