//! Batch damage report for the reference encounter.
//!
//! Demonstrates: compose a profile → BatchRunner → per-iteration
//! summaries → aggregate report, then a single traced run.
//!
//! Set `RUST_LOG=rotor_engine=debug` to see rejected casts and hook
//! failures as they happen.

use std::sync::Arc;

use rotor_bench::{
    reference_bundles, reference_composer, reference_config, reference_metadata,
    reference_rotation, reference_state,
};
use rotor_core::{SimTime, UnitId};
use rotor_engine::{BatchRunner, Simulation};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Rotor Batch Report ===\n");

    let fight = SimTime(180_000);
    let composer = Arc::new(reference_composer());

    // --- Baseline: no profile ---
    let baseline = BatchRunner::new(
        Arc::new(reference_metadata()),
        reference_rotation(),
        reference_state,
        reference_config(42),
        fight,
    )
    .unwrap();
    let base = baseline.run(20).unwrap();
    println!("Baseline ({} iterations, {} fight)", base.iterations.len(), fight);
    println!(
        "  mean={:>10.1}  min={:>8}  max={:>8}",
        base.mean_damage, base.min_damage, base.max_damage
    );

    // --- Profiled: every bundle applied ---
    let profiled = BatchRunner::new(
        Arc::new(reference_metadata()),
        reference_rotation(),
        reference_state,
        reference_config(42),
        fight,
    )
    .unwrap()
    .with_profile(Arc::clone(&composer), reference_bundles());
    let report = profiled.run(20).unwrap();
    println!("\nProfiled with {:?}", reference_bundles());
    println!(
        "  mean={:>10.1}  min={:>8}  max={:>8}",
        report.mean_damage, report.min_damage, report.max_damage
    );
    println!(
        "  gain={:>+9.2}%  (profile resolved {} time(s))",
        (report.mean_damage / base.mean_damage - 1.0) * 100.0,
        composer.resolutions()
    );

    println!("\nFirst iterations:");
    for summary in report.iterations.iter().take(5) {
        println!(
            "  sim {:>2}: damage={:>8}  events={:>6}  hash={:016x}",
            summary.sim_id, summary.damage_done, summary.events_processed, summary.final_hash
        );
    }

    // --- One run with snapshot streaming ---
    let id = UnitId::new("p");
    let mut sim = Simulation::new(
        reference_state(&id),
        Arc::new(reference_metadata()),
        reference_config(7),
    )
    .unwrap();
    let snapshots = sim.subscribe();
    let result = sim.run(reference_rotation(), SimTime(30_000)).unwrap();
    let published = snapshots.try_iter().count();

    println!("\nSingle 30s run:");
    println!(
        "  events={}  casts={}  rejected={}  projectiles={}/{}  snapshots={}",
        result.events_processed,
        result.metrics.casts,
        result.metrics.rejected_casts,
        result.metrics.projectiles_resolved,
        result.metrics.projectiles_launched,
        published,
    );
    println!("  damage={}", result.final_state.units[&id].damage_done);
}
