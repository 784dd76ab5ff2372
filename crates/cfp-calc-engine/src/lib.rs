//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
pub mod api;
pub mod emissions;
pub mod equivalents;
pub mod errors;
pub mod io;
pub mod model;
pub mod reports;

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::reports::ReportExporter;

pub use emissions::{
    compute, compute_with_policy, AttributionPolicy, Diagnostic, DiagnosticKind,
    EmissionsBreakdown,
};
pub use equivalents::{equivalents, Equivalents};
pub use errors::{CalcEngineError, Result};
pub use model::{Category, EmissionFactorsTable, MaterialRatioTable, UsageRecord};

/// Factor and ratio tables loaded together for repeated calculations.
#[derive(Debug, Clone, Default)]
pub struct FootprintTables {
    pub factors: EmissionFactorsTable,
    pub ratios: MaterialRatioTable,
}

impl FootprintTables {
    /// Loads both tables, failing on the first unreadable or malformed file.
    pub fn load(factors: impl AsRef<Path>, ratios: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            factors: io::load_emission_factors(factors)?,
            ratios: io::load_material_ratios(ratios)?,
        })
    }

    /// Loads both tables, substituting an empty table for any file that
    /// cannot be read.
    pub fn load_or_empty(factors: impl AsRef<Path>, ratios: impl AsRef<Path>) -> Self {
        Self {
            factors: io::load_emission_factors_or_empty(factors),
            ratios: io::load_material_ratios_or_empty(ratios),
        }
    }

    pub fn compute(&self, usage: &UsageRecord, policy: AttributionPolicy) -> EmissionsBreakdown {
        compute_with_policy(usage, &self.factors, &self.ratios, policy)
    }

    /// Entries that load fine but can never contribute as written.
    pub fn audit(&self) -> Vec<TableIssue> {
        let mut issues = Vec::new();
        for category in Category::ALL {
            for (item, factor) in self.factors.category(category) {
                if *factor < 0.0 || !factor.is_finite() {
                    issues.push(TableIssue::InvalidFactor {
                        category,
                        item: item.clone(),
                        factor: *factor,
                    });
                }
            }
        }
        for (product, materials) in self.ratios.products() {
            if !self.factors.intermediate_products.contains_key(product) {
                issues.push(TableIssue::UnknownProduct {
                    product: product.to_owned(),
                });
            }
            for (material, ratio) in materials {
                if !self.factors.raw_materials.contains_key(material) {
                    issues.push(TableIssue::UnknownMaterial {
                        product: product.to_owned(),
                        material: material.clone(),
                    });
                }
                if *ratio < 0.0 || !ratio.is_finite() {
                    issues.push(TableIssue::InvalidRatio {
                        product: product.to_owned(),
                        material: material.clone(),
                        ratio: *ratio,
                    });
                }
            }
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableIssue {
    InvalidFactor {
        category: Category,
        item: String,
        factor: f64,
    },
    /// Ratio entry for a product with no intermediate-product factor.
    UnknownProduct { product: String },
    /// Ratio entry naming a raw material with no factor.
    UnknownMaterial { product: String, material: String },
    InvalidRatio {
        product: String,
        material: String,
        ratio: f64,
    },
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableIssue::InvalidFactor {
                category,
                item,
                factor,
            } => write!(f, "{category}.{item} has invalid factor {factor}"),
            TableIssue::UnknownProduct { product } => write!(
                f,
                "ratios for {product} are unused: no intermediate_products factor"
            ),
            TableIssue::UnknownMaterial { product, material } => write!(
                f,
                "{product} consumes {material}, which has no raw_materials factor"
            ),
            TableIssue::InvalidRatio {
                product,
                material,
                ratio,
            } => write!(f, "{product} -> {material} has invalid ratio {ratio}"),
        }
    }
}

/// Computes a footprint and, when `output_dir` is given, writes the JSON and
/// CSV reports there.
pub fn calculate_footprint(
    tables: &FootprintTables,
    usage: &UsageRecord,
    policy: AttributionPolicy,
    output_dir: Option<&Path>,
) -> Result<EmissionsBreakdown> {
    info!(?policy, "calculating carbon footprint");
    let breakdown = tables.compute(usage, policy);
    if let Some(dir) = output_dir {
        ReportExporter::new(&breakdown).export_all(dir)?;
    }
    Ok(breakdown)
}
