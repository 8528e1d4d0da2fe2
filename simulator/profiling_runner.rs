// Profiling Runner - Scenario runner with timing instrumentation
//
// Usage:
//   cargo run --bin profiling_runner --release scenarios/inverter.yaml

mod staircase;

use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use pelca::{HazardModel, ResultAggregator, StaircaseRunner};

use staircase::{ScenarioFile, StaircaseReport};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml>", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} scenarios/inverter.yaml", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  PROFILING RUNNER                                      ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let total_start = Instant::now();

    // Time: Loading and parsing YAML
    let load_start = Instant::now();
    println!("Loading scenario from: {}", path.display());

    let scenario = ScenarioFile::load(path).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let load_time = load_start.elapsed();
    println!("  ✓ Scenario loaded: {:?}", load_time);

    // Time: Validation
    let config_start = Instant::now();
    let config = scenario.build_config(None).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    let config_time = config_start.elapsed();
    println!("  ✓ Config validated: {:?}", config_time);

    // Time: Hazard tables on their own; the runner builds its own copy
    let hazard_start = Instant::now();
    let hazard = HazardModel::build(&config).unwrap_or_else(|e| {
        eprintln!("Cannot build hazard model: {}", e);
        std::process::exit(1);
    });
    let hazard_time = hazard_start.elapsed();
    println!("  ✓ Hazard tables ({} x {}): {:?}", hazard.time_steps(), hazard.num_units(), hazard_time);

    let steps = config.time_steps();
    let trials = config.num_trials();
    let units = config.num_units();

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SIMULATION                                            ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let sim_start = Instant::now();
    let runner = StaircaseRunner::new(config).unwrap_or_else(|e| {
        eprintln!("Cannot create runner: {}", e);
        std::process::exit(1);
    });
    let history = runner.run();
    let sim_time = sim_start.elapsed();

    // Time: Aggregation
    let aggregate_start = Instant::now();
    let aggregator = ResultAggregator::new(&history);
    let _bands = aggregator.bands(pelca::ImpactSeries::Total);
    let report = StaircaseReport::from_history(&scenario.display_name(), scenario.unit_names(), &history);
    let aggregate_time = aggregate_start.elapsed();

    report.print_summary();

    let total_time = total_start.elapsed();

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  PROFILING RESULTS                                     ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    println!("Time Breakdown:");
    print_timing("  Load + parse", load_time, total_time);
    print_timing("  Validation", config_time, total_time);
    print_timing("  Hazard tables", hazard_time, total_time);
    print_timing("  Simulation", sim_time, total_time);
    print_timing("  Aggregation", aggregate_time, total_time);
    println!("  ─────────────────────────────────────────");
    println!("  Total:           {:>10.3?}  (100.0%)", total_time);

    let entries = steps * trials * units;
    println!("\nSimulation Metrics:");
    println!("  Steps:           {:>10}", steps);
    println!("  Trials:          {:>10}", trials);
    println!("  Units:           {:>10}", units);
    println!("  Faults:          {:>10}", history.total_faults());
    println!();

    if sim_time.as_nanos() > 0 {
        let steps_per_sec = steps as f64 / sim_time.as_secs_f64();
        println!("Performance:");
        println!("  Steps/sec:       {:>10.1}", steps_per_sec);
        println!("  Time/step:       {:>10.3?}", sim_time / steps.max(1) as u32);
        if entries > 0 {
            let ns_per_entry = sim_time.as_nanos() / entries as u128;
            println!("  Time/entry:      {:>10}ns", ns_per_entry);
        }
    }

    println!("\n✓ Profiling complete!\n");
}

fn print_timing(label: &str, time: Duration, total: Duration) {
    let percent = (time.as_secs_f64() / total.as_secs_f64()) * 100.0;
    println!("  {:<15}  {:>10.3?}  ({:>5.1}%)", label, time, percent);
}
