//! ---
//! cfp_section: "05-networking-external-interfaces"
//! cfp_subsection: "binary"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Binary entrypoint for the carbon footprint HTTP service."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cfp_calc_engine::api::{router, ApiState, RouterOptions};
use cfp_calc_engine::{Category, FootprintTables};
use cfp_common::cli::CliAttribution;
use cfp_common::config::AppConfig;
use cfp_common::logging::init_tracing;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Carbon footprint calculation service", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the listen address")]
    listen: Option<SocketAddr>,

    #[arg(long, value_enum, help = "Override raw material attribution")]
    attribution: Option<CliAttribution>,

    #[arg(long, value_name = "FILE", help = "Override the emission factor table")]
    factors: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Override the material ratio table")]
    ratios: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        if !path.exists() {
            bail!("configuration file {} does not exist", path.display());
        }
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/cfpd.toml"));
    candidates.push(PathBuf::from("configs/cfpd.example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    if let Some(attribution) = cli.attribution {
        config.tables.attribution = attribution.into();
    }
    if let Some(factors) = cli.factors {
        config.tables.factors = factors;
    }
    if let Some(ratios) = cli.ratios {
        config.tables.ratios = ratios;
    }
    config.validate()?;
    init_tracing("cfpd", &config.logging)?;

    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => warn!("no configuration file found; using defaults"),
    }

    let tables = FootprintTables::load_or_empty(&config.tables.factors, &config.tables.ratios);
    info!(
        energy_sources = tables.factors.category(Category::EnergySources).len(),
        raw_materials = tables.factors.category(Category::RawMaterials).len(),
        intermediate_products = tables.factors.category(Category::IntermediateProducts).len(),
        ratio_products = tables.ratios.products().count(),
        attribution = %config.tables.attribution,
        "emission tables ready"
    );
    for issue in tables.audit() {
        warn!(%issue, "emission table inconsistency");
    }

    let state = ApiState::new(tables.factors, tables.ratios, config.tables.attribution);
    let options = RouterOptions {
        cors_origins: config.api.cors_origins.clone(),
        request_timeout: config.api.request_timeout,
    };
    let app = router(state, &options);

    let listener = TcpListener::bind(config.api.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.api.listen))?;
    info!(address = %config.api.listen, "api server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("api server terminated unexpectedly")?;
    info!("cfpd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}
