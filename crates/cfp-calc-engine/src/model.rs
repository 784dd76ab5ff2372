//! ---
//! cfp_section: "02-emissions-calculation"
//! cfp_subsection: "module"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Emission factor tables and footprint aggregation routines."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Item name to quantity or factor, kept in document order.
pub type ItemMap = IndexMap<String, f64>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EnergySources,
    RawMaterials,
    IntermediateProducts,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::EnergySources,
        Category::RawMaterials,
        Category::IntermediateProducts,
    ];

    /// Key used for the category in factor tables and usage documents.
    pub fn key(&self) -> &'static str {
        match self {
            Category::EnergySources => "energy_sources",
            Category::RawMaterials => "raw_materials",
            Category::IntermediateProducts => "intermediate_products",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// kg CO2e per unit for every known item, grouped by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmissionFactorsTable {
    #[serde(default)]
    pub energy_sources: ItemMap,
    #[serde(default)]
    pub raw_materials: ItemMap,
    #[serde(default)]
    pub intermediate_products: ItemMap,
}

impl EmissionFactorsTable {
    pub fn category(&self, category: Category) -> &ItemMap {
        match category {
            Category::EnergySources => &self.energy_sources,
            Category::RawMaterials => &self.raw_materials,
            Category::IntermediateProducts => &self.intermediate_products,
        }
    }

    pub fn factor(&self, category: Category, item: &str) -> Option<f64> {
        self.category(category).get(item).copied()
    }

    pub fn with_factor(mut self, category: Category, item: impl Into<String>, factor: f64) -> Self {
        let map = match category {
            Category::EnergySources => &mut self.energy_sources,
            Category::RawMaterials => &mut self.raw_materials,
            Category::IntermediateProducts => &mut self.intermediate_products,
        };
        map.insert(item.into(), factor);
        self
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.category(*c).is_empty())
    }
}

/// Raw-material units consumed per unit of intermediate product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MaterialRatioTable {
    products: IndexMap<String, ItemMap>,
}

impl MaterialRatioTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ratio(
        mut self,
        product: impl Into<String>,
        material: impl Into<String>,
        ratio: f64,
    ) -> Self {
        self.products
            .entry(product.into())
            .or_default()
            .insert(material.into(), ratio);
        self
    }

    /// Raw materials linked to `product`, in table order.
    pub fn materials_for<'a>(&'a self, product: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.products
            .get(product)
            .into_iter()
            .flat_map(|materials| materials.iter().map(|(name, ratio)| (name.as_str(), *ratio)))
    }

    pub fn ratio(&self, product: &str, material: &str) -> f64 {
        self.products
            .get(product)
            .and_then(|materials| materials.get(material))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn products(&self) -> impl Iterator<Item = (&str, &ItemMap)> {
        self.products.iter().map(|(name, materials)| (name.as_str(), materials))
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Quantities consumed, mirroring the categories of [`EmissionFactorsTable`].
///
/// All three categories are required on the wire; presence is checked by
/// [`crate::api::parse_usage`] before the record reaches the calculator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub energy_sources: ItemMap,
    pub raw_materials: ItemMap,
    pub intermediate_products: ItemMap,
}

impl UsageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, item: impl Into<String>, quantity: f64) -> Self {
        let map = match category {
            Category::EnergySources => &mut self.energy_sources,
            Category::RawMaterials => &mut self.raw_materials,
            Category::IntermediateProducts => &mut self.intermediate_products,
        };
        map.insert(item.into(), quantity);
        self
    }

    pub fn category(&self, category: Category) -> &ItemMap {
        match category {
            Category::EnergySources => &self.energy_sources,
            Category::RawMaterials => &self.raw_materials,
            Category::IntermediateProducts => &self.intermediate_products,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_lookup_defaults_to_zero() {
        let ratios = MaterialRatioTable::new().with_ratio("steel_sheets", "steel", 1.05);
        assert_eq!(ratios.ratio("steel_sheets", "steel"), 1.05);
        assert_eq!(ratios.ratio("steel_sheets", "aluminium"), 0.0);
        assert_eq!(ratios.ratio("aluminium_foil", "aluminium"), 0.0);
        assert_eq!(ratios.materials_for("aluminium_foil").count(), 0);
    }

    #[test]
    fn factor_table_tolerates_missing_categories() {
        let table: EmissionFactorsTable =
            serde_json::from_str(r#"{"energy_sources": {"electricity": 0.5}}"#).unwrap();
        assert_eq!(table.factor(Category::EnergySources, "electricity"), Some(0.5));
        assert!(table.raw_materials.is_empty());
        assert!(!table.is_empty());
    }

    #[test]
    fn ratio_table_preserves_document_order() {
        let ratios: MaterialRatioTable = serde_json::from_str(
            r#"{"cans": {"tin": 0.1, "aluminium": 0.9, "lacquer": 0.01}}"#,
        )
        .unwrap();
        let names: Vec<_> = ratios.materials_for("cans").map(|(name, _)| name).collect();
        assert_eq!(names, ["tin", "aluminium", "lacquer"]);
    }

    #[test]
    fn category_keys_match_wire_names() {
        for category in Category::ALL {
            let encoded = serde_json::to_string(&category).unwrap();
            assert_eq!(encoded, format!("\"{}\"", category.key()));
        }
    }
}
