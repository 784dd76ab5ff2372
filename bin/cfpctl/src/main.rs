//! ---
//! cfp_section: "05-networking-external-interfaces"
//! cfp_subsection: "binary"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Command-line tool for one-off footprint calculations and table checks."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Result};
use cfp_common::config::{AppConfig, TablesConfig};
use cfp_common::logging::init_console;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

mod calculate;
mod check;

#[derive(Debug, Parser)]
#[command(author, version, about = "Carbon footprint calculator", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, help = "Log progress at info level")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Calculate the footprint of a usage record")]
    Calculate(calculate::CalculateArgs),
    #[command(about = "Load the emission tables strictly and report inconsistencies")]
    CheckConfig(check::CheckArgs),
}

/// Table locations shared by every subcommand.
#[derive(Debug, Args)]
pub struct TableOptions {
    /// Application config to read table paths from.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Emission factor table, overriding the config.
    #[arg(long, value_name = "FILE")]
    pub factors: Option<PathBuf>,
    /// Material ratio table, overriding the config.
    #[arg(long, value_name = "FILE")]
    pub ratios: Option<PathBuf>,
}

impl TableOptions {
    pub fn resolve(&self) -> Result<TablesConfig> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.config {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            candidates.push(path.clone());
        }
        candidates.push(PathBuf::from("configs/cfpd.toml"));
        candidates.push(PathBuf::from("configs/cfpd.example.toml"));

        let loaded = AppConfig::load_with_source(&candidates)?;
        if let Some(source) = &loaded.source {
            debug!(config_path = %source.display(), "configuration loaded");
        }
        let mut tables = loaded.config.tables;
        if let Some(factors) = &self.factors {
            tables.factors = factors.clone();
        }
        if let Some(ratios) = &self.ratios {
            tables.ratios = ratios.clone();
        }
        tables.validate()?;
        Ok(tables)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_console(if cli.verbose { "info" } else { "warn" });
    match cli.command {
        Commands::Calculate(args) => calculate::run(args)?,
        Commands::CheckConfig(args) => check::run(args)?,
    }
    Ok(())
}
