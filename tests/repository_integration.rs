//! ---
//! cfp_section: "15-testing-qa-runbook"
//! cfp_subsection: "integration-tests"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Integration and validation tests for the carbon footprint stack."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

fn root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn read(path: &str) -> String {
    let full = root().join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

fn rust_sources(dir: &Path, found: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_sources(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn sources_carry_frontmatter() {
    let mut sources = Vec::new();
    for dir in ["crates", "bin", "tests"] {
        rust_sources(&root().join(dir), &mut sources);
    }
    assert!(!sources.is_empty());
    for source in sources {
        let content = fs::read_to_string(&source).unwrap();
        assert!(
            content.starts_with("//! ---\n//! cfp_section:"),
            "{} must start with the frontmatter header",
            source.display()
        );
    }
}

#[test]
fn shipped_tables_use_the_three_categories() {
    let factors: serde_json::Value =
        serde_json::from_str(&read("configs/carbon_footprint_config.json")).unwrap();
    for category in ["energy_sources", "raw_materials", "intermediate_products"] {
        assert!(
            factors[category].is_object(),
            "factor table must define {category}"
        );
    }
}

#[test]
fn example_config_documents_every_section() {
    let config = read("configs/cfpd.example.toml");
    for section in ["[tables]", "[api]", "[logging]"] {
        assert!(config.contains(section), "example config lacks {section}");
    }
}
