//! Ops Dashboard
//!
//! HTTP JSON API for a personal daily-task tracker, plus maintenance
//! subcommands.

use anyhow::Result;
use clap::Parser;
use ops_dashboard::cli::{Cli, Command};
use ops_dashboard::clock::Clock;
use ops_dashboard::config::{Config, ConfigLoader, ConfigPaths};
use ops_dashboard::dashboard::{DashboardServer, start_server};
use ops_dashboard::db::Database;
use ops_dashboard::logging::{self, LogTarget};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    // An explicit --config replaces the directory tiers
    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_explicit(config_path);
    }
    let mut loader = ConfigLoader::load_with_paths(paths)?;
    if let Some(path) = loader.config_path() {
        info!("Using config file {}", path.display());
    }

    // CLI flags win over every config tier
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    match cli.command {
        Some(Command::Export(args)) => {
            let db = open_database(&config)?;
            args.write(&db.export_all()?)?;
        }
        Some(Command::Templates) => {
            let db = open_database(&config)?;
            print_templates(&db)?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Open the store with the configured clock, seeding templates if enabled.
fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    let clock = Clock::with_offset_hours(config.clock.utc_offset_hours)?;
    let db = Database::open(&config.server.db_path, &config.store)?.with_clock(clock);

    if config.store.seed_defaults {
        db.seed_default_templates()?;
    }
    Ok(db)
}

fn print_templates(db: &Database) -> Result<()> {
    for template in db.list_templates(None)? {
        println!(
            "{:>4}  {:<8}  {:<15}  {}{}",
            template.id,
            template.category.to_string(),
            template.weekdays.to_string(),
            template.name,
            if template.is_system { "" } else { "  (custom)" }
        );
    }
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!("Starting Ops Dashboard v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);
    info!("Civil time offset: UTC{:+}", config.clock.utc_offset_hours);

    let db = Arc::new(open_database(&config)?);
    info!(today = %db.clock().today_key(), "Database initialized successfully");

    if config.admin.token.is_none() {
        warn!("No admin token configured; template management is disabled");
    }

    let state = DashboardServer::new(db, config.admin.token.clone());
    let (shutdown_tx, addr) = start_server(state, &config.server.bind, config.server.port).await?;
    info!("Dashboard available at http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    let _ = shutdown_tx.send(());

    Ok(())
}
