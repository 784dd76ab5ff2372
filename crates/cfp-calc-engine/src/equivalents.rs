//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// kg CO2e a single tree absorbs in a year.
pub const TREE_ABSORPTION_KG_PER_YEAR: f64 = 21.0;

/// Approximate kg CO2e emitted per person per day.
pub const PERSON_EMISSION_KG_PER_DAY: f64 = 10.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equivalents {
    pub tree_years: f64,
    pub person_years: f64,
}

pub fn equivalents(total_kg: f64) -> Equivalents {
    Equivalents {
        tree_years: total_kg / TREE_ABSORPTION_KG_PER_YEAR,
        person_years: total_kg / PERSON_EMISSION_KG_PER_DAY,
    }
}
