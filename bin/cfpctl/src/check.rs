//! ---
//! cfp_section: "05-networking-external-interfaces"
//! cfp_subsection: "binary"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Command-line tool for one-off footprint calculations and table checks."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use cfp_calc_engine::{Category, FootprintTables};
use clap::Args;

use crate::TableOptions;

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub tables: TableOptions,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let settings = args.tables.resolve()?;
    let tables = FootprintTables::load(&settings.factors, &settings.ratios)
        .context("emission tables failed to load")?;

    println!("Factors: {}", settings.factors.display());
    for category in Category::ALL {
        println!("  {}: {}", category, tables.factors.category(category).len());
    }
    println!("Ratios: {}", settings.ratios.display());
    println!("  products: {}", tables.ratios.products().count());

    let issues = tables.audit();
    if issues.is_empty() {
        println!("No issues found");
    } else {
        println!("Issues:");
        for issue in &issues {
            println!("  {}", issue);
        }
    }
    Ok(())
}
