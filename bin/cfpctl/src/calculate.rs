//! ---
//! cfp_section: "05-networking-external-interfaces"
//! cfp_subsection: "binary"
//! cfp_type: "source"
//! cfp_scope: "code"
//! cfp_description: "Command-line tool for one-off footprint calculations and table checks."
//! cfp_version: "v0.1.0"
//! cfp_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cfp_calc_engine::emissions::RESERVED_KEYS;
use cfp_calc_engine::io::load_usage_record;
use cfp_calc_engine::{calculate_footprint, EmissionsBreakdown, FootprintTables};
use cfp_common::cli::CliAttribution;
use clap::Args;

use crate::TableOptions;

#[derive(Debug, Args)]
pub struct CalculateArgs {
    /// Usage record (JSON or YAML) with all three categories.
    #[arg(long, value_name = "FILE")]
    pub usage: PathBuf,
    #[command(flatten)]
    pub tables: TableOptions,
    /// Override the configured raw material attribution.
    #[arg(long, value_enum)]
    pub attribution: Option<CliAttribution>,
    /// Print the flat JSON breakdown instead of text.
    #[arg(long)]
    pub json: bool,
    /// Also write emissions.json and emissions.csv to this directory.
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,
}

pub fn run(args: CalculateArgs) -> Result<()> {
    let settings = args.tables.resolve()?;
    let tables = FootprintTables::load_or_empty(&settings.factors, &settings.ratios);
    let usage = load_usage_record(&args.usage)
        .with_context(|| format!("failed to load usage record {}", args.usage.display()))?;
    let policy = args
        .attribution
        .map(Into::into)
        .unwrap_or(settings.attribution);

    let breakdown = calculate_footprint(&tables, &usage, policy, args.report_dir.as_deref())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &breakdown)?;
        writeln!(out)?;
    } else {
        render(&mut out, &breakdown)?;
    }
    if let Some(dir) = &args.report_dir {
        eprintln!("Reports written to {}", dir.display());
    }
    Ok(())
}

fn render(out: &mut impl Write, breakdown: &EmissionsBreakdown) -> io::Result<()> {
    writeln!(out, "Individual carbon emissions:")?;
    for (name, emission) in &breakdown.items {
        if RESERVED_KEYS.contains(&name.as_str()) {
            continue;
        }
        writeln!(out, "{}: {:.2} kg CO₂e", name, emission)?;
    }
    writeln!(out, "Total carbon footprint: {:.2} kg CO₂e", breakdown.total)?;
    writeln!(
        out,
        "Tree equivalent: {:.2} tree-years",
        breakdown.equivalents.tree_years
    )?;
    writeln!(
        out,
        "Person equivalent: {:.2} person-years",
        breakdown.equivalents.person_years
    )?;
    Ok(())
}
