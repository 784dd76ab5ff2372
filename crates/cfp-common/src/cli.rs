//! ---
//! cfp_section: "01-core-functionality"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Shared primitives and utilities for the carbon footprint binaries."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use cfp_calc_engine::AttributionPolicy;
use clap::ValueEnum;

/// `--attribution` values accepted by both binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliAttribution {
    Legacy,
    ClaimingOwner,
}

impl From<CliAttribution> for AttributionPolicy {
    fn from(value: CliAttribution) -> Self {
        match value {
            CliAttribution::Legacy => AttributionPolicy::Legacy,
            CliAttribution::ClaimingOwner => AttributionPolicy::ClaimingOwner,
        }
    }
}
