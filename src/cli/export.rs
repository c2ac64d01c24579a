//! Export subcommand
//!
//! Dumps every table to pretty-printed JSON on stdout or into a file.

use crate::db::export::ExportBundle;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    /// Write the bundle where the arguments point.
    pub fn write(&self, bundle: &ExportBundle) -> Result<()> {
        let json = serde_json::to_string_pretty(bundle)?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, &json)?;
                eprintln!("Exported to {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(json.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}
