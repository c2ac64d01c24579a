//! CLI command definitions for ops-dashboard
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;

use clap::{Parser, Subcommand};
use export::ExportArgs;

/// Daily task tracker: HTTP API and maintenance commands
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces project and user config)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// HTTP port (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API (default if no subcommand given)
    Serve,

    /// Dump the whole store as JSON
    Export(ExportArgs),

    /// Print the task templates
    Templates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::parse_from(["ops-dashboard"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ops-dashboard", "export", "-o", "out.json", "--database", "x.db"]);
        assert_eq!(cli.database.as_deref(), Some("x.db"));
        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.output.unwrap().to_str(), Some("out.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
