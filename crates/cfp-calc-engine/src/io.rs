//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::{
    api::parse_usage,
    errors::{CalcEngineError, Result},
    model::{EmissionFactorsTable, MaterialRatioTable, UsageRecord},
};

pub const DEFAULT_FACTORS_FILE: &str = "carbon_footprint_config.json";
pub const DEFAULT_RATIOS_FILE: &str = "material_ratios.json";

/// Reads a JSON document, or YAML when the text does not open with `{`.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "reading document");
    let data = fs::read_to_string(path).map_err(|source| CalcEngineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if data.trim_start().starts_with('{') {
        serde_json::from_str(&data).map_err(|source| CalcEngineError::JsonParse {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&data).map_err(|source| CalcEngineError::YamlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn load_emission_factors(path: impl AsRef<Path>) -> Result<EmissionFactorsTable> {
    read_document(path.as_ref())
}

pub fn load_material_ratios(path: impl AsRef<Path>) -> Result<MaterialRatioTable> {
    read_document(path.as_ref())
}

/// Loads a usage record and applies the same category checks as the HTTP handler.
pub fn load_usage_record(path: impl AsRef<Path>) -> Result<UsageRecord> {
    let value: serde_json::Value = read_document(path.as_ref())?;
    Ok(parse_usage(value)?)
}

/// Like [`load_emission_factors`], but a missing or malformed file yields an
/// empty table so every item falls through to the missing-factor path.
pub fn load_emission_factors_or_empty(path: impl AsRef<Path>) -> EmissionFactorsTable {
    let path = path.as_ref();
    or_empty(path, "emission factors", load_emission_factors(path))
}

pub fn load_material_ratios_or_empty(path: impl AsRef<Path>) -> MaterialRatioTable {
    let path = path.as_ref();
    or_empty(path, "material ratios", load_material_ratios(path))
}

fn or_empty<T: Default>(path: &Path, table: &str, loaded: Result<T>) -> T {
    match loaded {
        Ok(value) => value,
        Err(err) if err.is_not_found() => {
            error!(path = %path.display(), table, "file not found; continuing with an empty table");
            T::default()
        }
        Err(err) => {
            error!(path = %path.display(), table, error = %err, "could not parse file; continuing with an empty table");
            T::default()
        }
    }
}
