//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{emissions::EmissionsBreakdown, errors::Result};

pub const JSON_REPORT_FILE: &str = "emissions.json";
pub const CSV_REPORT_FILE: &str = "emissions.csv";

#[derive(Debug)]
pub struct ReportExporter<'a> {
    breakdown: &'a EmissionsBreakdown,
    report_id: Uuid,
    generated_at: DateTime<Utc>,
}

impl<'a> ReportExporter<'a> {
    pub fn new(breakdown: &'a EmissionsBreakdown) -> Self {
        Self {
            breakdown,
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
        }
    }

    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        self.export_json(output_dir)?;
        self.export_csv(output_dir)?;
        info!(report_id = %self.report_id, "reports exported to {}", output_dir.display());
        Ok(())
    }

    pub fn export_json(&self, output_dir: &Path) -> Result<PathBuf> {
        ensure_dir(output_dir)?;
        let timestamp = self.generated_at.to_rfc3339();
        let envelope = ReportEnvelope {
            report_id: self.report_id,
            timestamp: &timestamp,
            attribution: self.breakdown.policy,
            schema: breakdown_schema(),
            data: self.breakdown,
        };
        let path = output_dir.join(JSON_REPORT_FILE);
        fs::write(&path, serde_json::to_string_pretty(&envelope)?)?;
        Ok(path)
    }

    /// One `item,kg_co2e` row per line, reserved keys last.
    pub fn export_csv(&self, output_dir: &Path) -> Result<PathBuf> {
        ensure_dir(output_dir)?;
        let path = output_dir.join(CSV_REPORT_FILE);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["item", "kg_co2e"])?;
        for (item, value) in self.breakdown.to_flat_map() {
            writer.write_record([item, value.to_string()])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

fn ensure_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a> {
    report_id: Uuid,
    timestamp: &'a str,
    attribution: crate::emissions::AttributionPolicy,
    schema: serde_json::Value,
    data: &'a EmissionsBreakdown,
}

fn breakdown_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "EmissionsBreakdown",
        "description": "Emissions per item in kg CO2e with total and equivalents",
        "type": "object",
        "properties": {
            "total": {"type": "number"},
            "tree_equivalent": {"type": "number"},
            "person_equivalent": {"type": "number"}
        },
        "additionalProperties": {"type": "number"},
        "required": ["total", "tree_equivalent", "person_equivalent"]
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::emissions::compute;
    use crate::model::{Category, EmissionFactorsTable, MaterialRatioTable, UsageRecord};

    fn breakdown() -> EmissionsBreakdown {
        let factors = EmissionFactorsTable::default()
            .with_factor(Category::EnergySources, "electricity", 0.5);
        let usage = UsageRecord::new().with(Category::EnergySources, "electricity", 42.0);
        compute(&usage, &factors, &MaterialRatioTable::new())
    }

    #[test]
    fn writes_json_envelope() {
        let dir = tempdir().unwrap();
        let breakdown = breakdown();
        let exporter = ReportExporter::new(&breakdown);
        let path = exporter.export_json(&dir.path().join("nested")).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["report_id"], exporter.report_id().to_string());
        assert_eq!(value["data"]["electricity"], 21.0);
        assert_eq!(value["data"]["total"], 21.0);
        assert_eq!(value["data"]["tree_equivalent"], 1.0);
        assert_eq!(value["attribution"], "legacy");
    }

    #[test]
    fn writes_csv_rows() {
        let dir = tempdir().unwrap();
        let breakdown = breakdown();
        ReportExporter::new(&breakdown).export_all(dir.path()).unwrap();
        let csv = fs::read_to_string(dir.path().join(CSV_REPORT_FILE)).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "item,kg_co2e");
        assert_eq!(lines[1], "electricity,21");
        assert_eq!(lines[2], "total,21");
        assert!(lines[3].starts_with("tree_equivalent,1"));
        assert!(dir.path().join(JSON_REPORT_FILE).exists());
    }
}
