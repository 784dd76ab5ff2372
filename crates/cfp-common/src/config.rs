//! ---
//! cfp_section: "01-core-functionality"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Shared primitives and utilities for the carbon footprint binaries."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cfp_calc_engine::io::{DEFAULT_FACTORS_FILE, DEFAULT_RATIOS_FILE};
use cfp_calc_engine::AttributionPolicy;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn default_factors_path() -> PathBuf {
    PathBuf::from("configs").join(DEFAULT_FACTORS_FILE)
}

fn default_ratios_path() -> PathBuf {
    PathBuf::from("configs").join(DEFAULT_RATIOS_FILE)
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the calculator service and CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "CFP_CONFIG";

    /// Load configuration from disk, respecting the `CFP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = Self::load_with_source(candidates)?;
        loaded.source.map(|_| loaded.config).ok_or_else(|| {
            anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    /// Load configuration together with the effective source path, falling
    /// back to defaults when none of the candidates exist.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.tables.validate()?;
        self.api.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_factors_path")]
    pub factors: PathBuf,
    #[serde(default = "default_ratios_path")]
    pub ratios: PathBuf,
    #[serde(default)]
    pub attribution: AttributionPolicy,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            factors: default_factors_path(),
            ratios: default_ratios_path(),
            attribution: AttributionPolicy::default(),
        }
    }
}

impl TablesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.factors.as_os_str().is_empty() {
            return Err(anyhow!("tables.factors must name a file"));
        }
        if self.ratios.as_os_str().is_empty() {
            return Err(anyhow!("tables.ratios must name a file"));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
            cors_origins: Vec::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() || self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(anyhow!(
                "api.request_timeout must be between 1 and {} seconds",
                MAX_REQUEST_TIMEOUT.as_secs()
            ));
        }
        if let Some(origin) = self.cors_origins.iter().find(|o| o.trim().is_empty()) {
            return Err(anyhow!("api.cors_origins contains an empty entry {:?}", origin));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config.tables.factors, PathBuf::from("configs/carbon_footprint_config.json"));
        assert_eq!(config.tables.attribution, AttributionPolicy::Legacy);
        assert_eq!(config.api.listen.port(), 5000);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn documented_defaults_match_code() {
        let documented = AppConfig::from_str(
            r#"
            [tables]
            factors = "configs/carbon_footprint_config.json"
            ratios = "configs/material_ratios.json"
            attribution = "legacy"

            [api]
            listen = "127.0.0.1:5000"
            cors_origins = []
            request_timeout = 30

            [logging]
            directory = "target/logs"
            format = "structured-json"
            "#,
        )
        .unwrap();
        let defaults = AppConfig::default();
        assert_eq!(documented.tables.factors, defaults.tables.factors);
        assert_eq!(documented.tables.ratios, defaults.tables.ratios);
        assert_eq!(documented.api.listen, defaults.api.listen);
        assert_eq!(documented.api.request_timeout, defaults.api.request_timeout);
        assert_eq!(documented.logging.directory, defaults.logging.directory);
        assert_eq!(documented.logging.format, defaults.logging.format);
        assert_eq!(defaults.logging.format, LogFormat::StructuredJson);
        assert!(defaults.logging.file_prefix.is_none());
    }

    #[test]
    fn parses_full_document() {
        let config = AppConfig::from_str(
            r#"
            [tables]
            factors = "/srv/cfp/factors.yaml"
            ratios = "/srv/cfp/ratios.yaml"
            attribution = "claiming-owner"

            [api]
            listen = "0.0.0.0:8080"
            cors_origins = ["http://localhost:5173"]
            request_timeout = 5

            [logging]
            directory = "/var/log/cfp"
            format = "pretty"
            file_prefix = "calc"
            "#,
        )
        .unwrap();
        assert_eq!(config.tables.attribution, AttributionPolicy::ClaimingOwner);
        assert_eq!(config.api.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(config.api.request_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.file_prefix.as_deref(), Some("calc"));
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let err = AppConfig::from_str("[api]\nrequest_timeout = 0\n").unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
        assert!(AppConfig::from_str("[api]\nrequest_timeout = 301\n").is_err());
    }

    #[test]
    fn rejects_unknown_attribution_policy() {
        assert!(AppConfig::from_str("[tables]\nattribution = \"proportional\"\n").is_err());
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("cfpd.toml");
        fs::write(&present, "[api]\nlisten = \"127.0.0.1:9000\"\n").unwrap();
        let candidates = [dir.path().join("missing.toml"), present.clone()];
        let loaded = AppConfig::load_with_source(&candidates).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(present.as_path()));
        assert_eq!(loaded.config.api.listen.port(), 9000);
    }

    #[test]
    fn strict_load_requires_a_file() {
        let dir = tempdir().unwrap();
        let err = AppConfig::load(&[dir.path().join("absent.toml")]).unwrap_err();
        assert!(err.to_string().contains("no configuration files found"));
    }
}
