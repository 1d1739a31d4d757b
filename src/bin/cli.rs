//! Dealer Exposure CLI
//!
//! Runs one ingest → recompute cycle and prints the exposure curve, totals
//! and Gamma Flip.
//!
//! ```text
//! dealer-exposure                          # synthetic chain, default config
//! dealer-exposure --records chain.json     # JSON contract records
//! dealer-exposure --preset zero-dte --json # print the published entry as JSON
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dealer_exposure::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    ZeroDte,
    FlowWeighted,
}

/// Dealer Greek exposure and Gamma Flip from an option chain
#[derive(Parser)]
#[command(name = "dealer-exposure")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML engine configuration (overrides --preset)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in configuration preset
    #[arg(short, long, value_enum, default_value = "default")]
    preset: Preset,

    /// JSON array of contract records; synthetic chain when omitted
    #[arg(short, long)]
    records: Option<String>,

    /// Seed for the synthetic chain
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Underlying price override
    #[arg(long)]
    spot: Option<f64>,

    /// Also print one curve per expiry
    #[arg(long)]
    slices: bool,

    /// Print the published series entry as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).with_context(|| format!("loading config {}", path))?,
        None => match cli.preset {
            Preset::Default => EngineConfig::default(),
            Preset::ZeroDte => EngineConfig::zero_dte(),
            Preset::FlowWeighted => EngineConfig::flow_weighted(),
        },
    };

    let mut source: Box<dyn ChainSource> = match &cli.records {
        Some(path) => Box::new(RecordFileSource::new(path)),
        None => Box::new(SyntheticChainSource::new(cli.seed)),
    };

    let as_of = Utc::now();
    let chain = source
        .fetch(as_of)
        .with_context(|| format!("fetching chain from {} source", source.name()))?;
    let spot = cli.spot.unwrap_or(chain.underlying_price);

    let engine = ExposureEngine::try_with_config(config)?;
    let report = engine.ingest_chain(&chain);
    for rejected in &report.rejected {
        eprintln!("rejected {}: {}", rejected.key, rejected.error);
    }
    for error in &report.malformed {
        eprintln!("malformed record: {}", error);
    }

    let entry = match engine.recompute(spot, as_of)? {
        CycleOutcome::Published(entry) => entry,
        CycleOutcome::Unchanged(version) => bail!("book {} was already published", version),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(entry.as_ref())?);
        return Ok(());
    }

    println!("Dealer Exposure ({} source, {})", source.name(), engine.config().convention.label());
    println!("==========================================\n");
    println!(
        "Book {}: {} contracts accepted, {} skipped, {} superseded",
        report.version,
        report.accepted,
        report.skipped(),
        report.superseded
    );
    println!("Spot: {:.2}\n", spot);

    print_curve(&entry.curve);

    println!("\nTotals:");
    println!("  Net Gamma: {:>16.2}", entry.curve.total_gamma());
    println!("  Net GEX:   {:>16.0}", entry.curve.total_gex());
    println!("  Net Vanna: {:>16.2}", entry.curve.total_vanna());
    println!("  Net Charm: {:>16.2}", entry.curve.total_charm());

    println!("\nGamma Flip:");
    println!("  {}", entry.flip.summary());
    if let Some(distance) = entry.flip.distance_from_spot() {
        match entry.curve.typical_strike_step() {
            Some(step) => println!(
                "  Distance from spot: {:+.2} ({:+.1} strikes)",
                distance,
                distance / step
            ),
            None => println!("  Distance from spot: {:+.2}", distance),
        }
    }
    if entry.flip.ambiguous {
        println!("  All crossings: {:?}", entry.flip.crossings);
    }

    if cli.slices {
        for slice in engine.expiry_slices(as_of)? {
            println!("\nExpiry {}:", slice.expiry);
            print_curve(&slice.curve);
        }
    }

    Ok(())
}

fn print_curve(curve: &ExposureCurve) {
    if curve.is_empty() {
        println!("  (no contributing strikes)");
        return;
    }

    println!(
        "  {:>10} {:>14} {:>16} {:>14} {:>14} {:>5}",
        "Strike", "Net Gamma", "Net GEX", "Net Vanna", "Net Charm", "N"
    );
    for p in &curve.points {
        println!(
            "  {:>10.2} {:>14.2} {:>16.0} {:>14.2} {:>14.2} {:>5}",
            p.strike, p.net_gamma, p.net_gex, p.net_vanna, p.net_charm, p.contributing_count
        );
    }
    if curve.stale_excluded > 0 {
        println!("  ({} stale entries excluded)", curve.stale_excluded);
    }
}
