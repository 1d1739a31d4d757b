//! Example: Gamma Flip tracking across update cycles
//!
//! Run with: cargo run --example gamma_flip

use chrono::{Duration, Utc};
use dealer_exposure::prelude::*;

fn main() -> ExposureResult<()> {
    let start = Utc::now();
    let engine = ExposureEngine::new();

    // Full resync from a synthetic chain
    let mut source = SyntheticChainSource::new(7);
    let chain = source.fetch(start)?;
    let report = engine.ingest_chain(&chain);
    println!("=== Full Resync ===\n");
    println!("Book {}: {} contracts", report.version, report.accepted);

    engine.recompute(chain.underlying_price, start)?;

    // Stream in heavier put open interest below spot, one contract at a time
    println!("\n=== Incremental Updates ===\n");
    let puts: Vec<ContractSnapshot> = chain
        .contracts
        .iter()
        .filter(|c| c.option_type == OptionType::Put && c.strike_f64() < chain.underlying_price)
        .cloned()
        .collect();

    for (i, put) in puts.iter().enumerate().take(5) {
        let at = start + Duration::seconds(10 * (i as i64 + 1));
        let update = ContractSnapshot {
            open_interest: put.open_interest * 5,
            timestamp: at,
            ..put.clone()
        };
        engine.apply_incremental(&update)?;

        if let CycleOutcome::Published(entry) = engine.recompute(chain.underlying_price, at)? {
            println!("{} {:>10} -> {}", entry.version, update.key().to_string(), entry.flip.summary());
        }
    }

    // Replay the series the way a downstream consumer would
    println!("\n=== Series ===\n");
    let range = engine.store().range(start, start + Duration::minutes(5));
    for entry in &range {
        println!(
            "{} @ {}  net GEX {:>14.0}  flip {:?}",
            entry.version,
            entry.timestamp.format("%H:%M:%S"),
            entry.curve.total_gex(),
            entry.flip.flip_strike.map(|k| (k * 100.0).round() / 100.0)
        );
    }

    Ok(())
}
