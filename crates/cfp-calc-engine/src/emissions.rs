//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
//! Aggregation of usage quantities into an emissions breakdown.
//!
//! The calculation runs three ordered passes (energy sources, raw materials
//! consumed directly, intermediate products) as a fold over an explicit ledger value.
//! Raw materials implied by intermediate products are billed at most once:
//! the first pass or product to consume a material claims it, and later
//! consumers are skipped.
use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::equivalents::{equivalents, Equivalents};
use crate::model::{Category, EmissionFactorsTable, ItemMap, MaterialRatioTable, UsageRecord};

pub const TOTAL_KEY: &str = "total";
pub const TREE_EQUIVALENT_KEY: &str = "tree_equivalent";
pub const PERSON_EQUIVALENT_KEY: &str = "person_equivalent";
pub const RESERVED_KEYS: [&str; 3] = [TOTAL_KEY, TREE_EQUIVALENT_KEY, PERSON_EQUIVALENT_KEY];

/// How emissions of product-derived raw materials are reported per line.
///
/// Billing into the total is the same under both policies. They differ only
/// in which breakdown line shows a derived material's emission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionPolicy {
    /// Each product line adds every linked material's consumed emission,
    /// whoever claimed it, and claimed materials also keep their own line.
    #[default]
    Legacy,
    /// A derived material is shown only on the line of the product that
    /// claimed it, so the breakdown lines add up to the total.
    ClaimingOwner,
}

impl AttributionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributionPolicy::Legacy => "legacy",
            AttributionPolicy::ClaimingOwner => "claiming-owner",
        }
    }
}

impl fmt::Display for AttributionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(AttributionPolicy::Legacy),
            "claiming-owner" | "claiming_owner" => Ok(AttributionPolicy::ClaimingOwner),
            other => Err(format!("unknown attribution policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Emitted,
    ZeroQuantity,
    MissingFactor,
    InvalidQuantity,
    DerivedFromProduct,
    AlreadyAccounted,
}

/// One processed or skipped item, in the order the calculator met it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: Category,
    pub item: String,
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission: Option<f64>,
    /// Intermediate product that implied this raw material, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl Diagnostic {
    fn new(category: Category, item: &str, kind: DiagnosticKind) -> Self {
        Self {
            category,
            item: item.to_owned(),
            kind,
            quantity: None,
            emission: None,
            product: None,
        }
    }

    fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    fn emission(mut self, emission: f64) -> Self {
        self.emission = Some(emission);
        self
    }

    fn product(mut self, product: &str) -> Self {
        self.product = Some(product.to_owned());
        self
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::MissingFactor | DiagnosticKind::InvalidQuantity
        )
    }

    fn emit(&self) {
        let category = self.category.key();
        let item = self.item.as_str();
        let product = self.product.as_deref().unwrap_or("");
        let quantity = self.quantity.unwrap_or_default();
        let emission = self.emission.unwrap_or_default();
        match self.kind {
            DiagnosticKind::Emitted => {
                info!(category, item, quantity, emission, "emission recorded")
            }
            DiagnosticKind::DerivedFromProduct => {
                info!(category, item, product, quantity, emission, "raw material consumed by intermediate product")
            }
            DiagnosticKind::ZeroQuantity => debug!(category, item, product, "zero quantity recorded"),
            DiagnosticKind::AlreadyAccounted => {
                debug!(category, item, product, quantity, "raw material already accounted for")
            }
            DiagnosticKind::MissingFactor => {
                warn!(category, item, product, quantity, "no emission factor found")
            }
            DiagnosticKind::InvalidQuantity => {
                warn!(category, item, product, quantity, "quantity is not a valid amount; item skipped")
            }
        }
    }
}

/// Per-item emissions in kg CO2e plus the total and its equivalents.
///
/// Serializes as one flat object: item names followed by `total`,
/// `tree_equivalent` and `person_equivalent`. Diagnostics are not part of
/// the serialized form.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsBreakdown {
    pub items: ItemMap,
    pub total: f64,
    pub equivalents: Equivalents,
    pub policy: AttributionPolicy,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmissionsBreakdown {
    /// Looks up an item line or one of the reserved keys.
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            TOTAL_KEY => Some(self.total),
            TREE_EQUIVALENT_KEY => Some(self.equivalents.tree_years),
            PERSON_EQUIVALENT_KEY => Some(self.equivalents.person_years),
            _ => self.items.get(key).copied(),
        }
    }

    pub fn itemized_sum(&self) -> f64 {
        self.items.values().sum()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Item lines followed by the reserved keys. An item named like a
    /// reserved key is shadowed by it.
    pub fn to_flat_map(&self) -> ItemMap {
        let mut flat: ItemMap = self
            .items
            .iter()
            .filter(|(name, _)| !RESERVED_KEYS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        flat.insert(TOTAL_KEY.to_owned(), self.total);
        flat.insert(TREE_EQUIVALENT_KEY.to_owned(), self.equivalents.tree_years);
        flat.insert(PERSON_EQUIVALENT_KEY.to_owned(), self.equivalents.person_years);
        flat
    }
}

impl Serialize for EmissionsBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat = self.to_flat_map();
        let mut map = serializer.serialize_map(Some(flat.len()))?;
        for (key, value) in &flat {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Fold state threaded through the three passes.
#[derive(Debug, Default)]
struct Ledger {
    breakdown: ItemMap,
    consumed_raw_materials: ItemMap,
    /// Raw material -> intermediate product that claimed it.
    claims: IndexMap<String, String>,
    product_direct: ItemMap,
    /// Names the usage record itself set to zero; the final merge keeps them at 0.
    zero_usage: IndexSet<String>,
    total: f64,
    diagnostics: Vec<Diagnostic>,
}

enum Usage {
    Billable(f64),
    Zero,
    MissingFactor,
    Invalid,
}

fn classify(quantity: f64, factor: Option<f64>) -> Usage {
    if quantity == 0.0 {
        Usage::Zero
    } else if quantity < 0.0 || !quantity.is_finite() {
        Usage::Invalid
    } else {
        match factor {
            Some(factor) => Usage::Billable(factor),
            None => Usage::MissingFactor,
        }
    }
}

impl Ledger {
    fn note(mut self, diagnostic: Diagnostic) -> Self {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
        self
    }

    /// Shared handling of the zero, unknown and invalid branches. Returns the
    /// factor when the item is billable.
    fn triage(
        mut self,
        category: Category,
        name: &str,
        quantity: f64,
        factors: &EmissionFactorsTable,
    ) -> (Self, Option<f64>) {
        match classify(quantity, factors.factor(category, name)) {
            Usage::Billable(factor) => (self, Some(factor)),
            Usage::Zero => {
                self.breakdown.insert(name.to_owned(), 0.0);
                self.zero_usage.insert(name.to_owned());
                let diagnostic =
                    Diagnostic::new(category, name, DiagnosticKind::ZeroQuantity).quantity(0.0);
                (self.note(diagnostic), None)
            }
            Usage::MissingFactor => {
                let diagnostic =
                    Diagnostic::new(category, name, DiagnosticKind::MissingFactor).quantity(quantity);
                (self.note(diagnostic), None)
            }
            Usage::Invalid => {
                let diagnostic =
                    Diagnostic::new(category, name, DiagnosticKind::InvalidQuantity).quantity(quantity);
                (self.note(diagnostic), None)
            }
        }
    }

    fn energy_source(self, name: &str, quantity: f64, factors: &EmissionFactorsTable) -> Self {
        let category = Category::EnergySources;
        let (mut ledger, factor) = self.triage(category, name, quantity, factors);
        let Some(factor) = factor else {
            return ledger;
        };
        let emission = quantity * factor;
        ledger.breakdown.insert(name.to_owned(), emission);
        ledger.total += emission;
        ledger.note(
            Diagnostic::new(category, name, DiagnosticKind::Emitted)
                .quantity(quantity)
                .emission(emission),
        )
    }

    fn raw_material(self, name: &str, quantity: f64, factors: &EmissionFactorsTable) -> Self {
        let category = Category::RawMaterials;
        let (mut ledger, factor) = self.triage(category, name, quantity, factors);
        let Some(factor) = factor else {
            return ledger;
        };
        let emission = quantity * factor;
        ledger.consumed_raw_materials.insert(name.to_owned(), emission);
        ledger.total += emission;
        ledger.note(
            Diagnostic::new(category, name, DiagnosticKind::Emitted)
                .quantity(quantity)
                .emission(emission),
        )
    }

    fn intermediate_product(
        self,
        name: &str,
        quantity: f64,
        factors: &EmissionFactorsTable,
        ratios: &MaterialRatioTable,
    ) -> Self {
        let category = Category::IntermediateProducts;
        let (mut ledger, factor) = self.triage(category, name, quantity, factors);
        let Some(factor) = factor else {
            return ledger;
        };
        let direct = quantity * factor;
        ledger.total += direct;
        ledger.product_direct.insert(name.to_owned(), direct);
        let ledger = ledger.note(
            Diagnostic::new(category, name, DiagnosticKind::Emitted)
                .quantity(quantity)
                .emission(direct),
        );
        ratios
            .materials_for(name)
            .fold(ledger, |ledger, (material, ratio)| {
                ledger.derived_material(name, material, quantity * ratio, factors)
            })
    }

    fn derived_material(
        mut self,
        product: &str,
        material: &str,
        required: f64,
        factors: &EmissionFactorsTable,
    ) -> Self {
        let category = Category::RawMaterials;
        if required == 0.0 {
            self.breakdown.entry(material.to_owned()).or_insert(0.0);
            return self.note(
                Diagnostic::new(category, material, DiagnosticKind::ZeroQuantity)
                    .quantity(0.0)
                    .product(product),
            );
        }
        if required < 0.0 || !required.is_finite() {
            return self.note(
                Diagnostic::new(category, material, DiagnosticKind::InvalidQuantity)
                    .quantity(required)
                    .product(product),
            );
        }
        let Some(factor) = factors.factor(category, material) else {
            return self.note(
                Diagnostic::new(category, material, DiagnosticKind::MissingFactor)
                    .quantity(required)
                    .product(product),
            );
        };
        if self.consumed_raw_materials.contains_key(material) {
            return self.note(
                Diagnostic::new(category, material, DiagnosticKind::AlreadyAccounted)
                    .quantity(required)
                    .product(product),
            );
        }
        let emission = required * factor;
        self.consumed_raw_materials.insert(material.to_owned(), emission);
        self.claims.insert(material.to_owned(), product.to_owned());
        self.total += emission;
        self.note(
            Diagnostic::new(category, material, DiagnosticKind::DerivedFromProduct)
                .quantity(required)
                .emission(emission)
                .product(product),
        )
    }

    fn settle(self, ratios: &MaterialRatioTable, policy: AttributionPolicy) -> EmissionsBreakdown {
        let Ledger {
            mut breakdown,
            consumed_raw_materials,
            claims,
            product_direct,
            zero_usage,
            total,
            diagnostics,
        } = self;

        for (product, direct) in &product_direct {
            let embodied: f64 = match policy {
                AttributionPolicy::Legacy => ratios
                    .materials_for(product)
                    .filter_map(|(material, _)| consumed_raw_materials.get(material))
                    .sum(),
                AttributionPolicy::ClaimingOwner => claims
                    .iter()
                    .filter(|(_, owner)| *owner == product)
                    .filter_map(|(material, _)| consumed_raw_materials.get(material))
                    .sum(),
            };
            breakdown.insert(product.clone(), direct + embodied);
        }

        for (material, emission) in consumed_raw_materials {
            if policy == AttributionPolicy::ClaimingOwner && claims.contains_key(&material) {
                continue;
            }
            if zero_usage.contains(&material) {
                continue;
            }
            breakdown.insert(material, emission);
        }

        info!(total, items = breakdown.len(), ?policy, "emissions calculated");
        EmissionsBreakdown {
            items: breakdown,
            total,
            equivalents: equivalents(total),
            policy,
            diagnostics,
        }
    }
}

/// Computes the breakdown with [`AttributionPolicy::Legacy`].
pub fn compute(
    usage: &UsageRecord,
    factors: &EmissionFactorsTable,
    ratios: &MaterialRatioTable,
) -> EmissionsBreakdown {
    compute_with_policy(usage, factors, ratios, AttributionPolicy::Legacy)
}

pub fn compute_with_policy(
    usage: &UsageRecord,
    factors: &EmissionFactorsTable,
    ratios: &MaterialRatioTable,
    policy: AttributionPolicy,
) -> EmissionsBreakdown {
    let ledger = usage
        .energy_sources
        .iter()
        .fold(Ledger::default(), |ledger, (name, quantity)| {
            ledger.energy_source(name, *quantity, factors)
        });
    let ledger = usage
        .raw_materials
        .iter()
        .fold(ledger, |ledger, (name, quantity)| {
            ledger.raw_material(name, *quantity, factors)
        });
    let ledger = usage
        .intermediate_products
        .iter()
        .fold(ledger, |ledger, (name, quantity)| {
            ledger.intermediate_product(name, *quantity, factors, ratios)
        });
    ledger.settle(ratios, policy)
}
