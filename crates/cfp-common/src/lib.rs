//! ---
//! cfp_section: "01-core-functionality"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Shared primitives and utilities for the carbon footprint binaries."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
//! Configuration loading and tracing setup shared by `cfpd` and `cfpctl`.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::CliAttribution;
pub use config::{ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, TablesConfig};
pub use logging::{init_console, init_tracing, LogFormat};
