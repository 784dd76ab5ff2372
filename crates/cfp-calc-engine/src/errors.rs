//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse JSON document {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not parse YAML document {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid usage record: {0}")]
    InvalidUsage(#[from] crate::api::RequestError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("csv export failed: {0}")]
    CsvExport(#[from] csv::Error),
}

impl CalcEngineError {
    /// True when the underlying file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CalcEngineError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
