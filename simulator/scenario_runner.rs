// Scenario Runner - Load and execute staircase scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/inverter.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/inverter.yaml --seed 0x1234...
//   cargo run --bin scenario_runner scenarios/inverter.yaml --csv breakdown.csv --bands bands.csv
//   cargo run --bin scenario_runner scenarios/inverter.yaml --trace 1 --events events.csv

mod staircase;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, LevelFilter};
use pelca::StaircaseRunner;
use simple_logger::SimpleLogger;

use staircase::{
    parse_seed_hex, write_bands_csv, CollectorEventSink, ConsoleEventSink, ScenarioFile, StaircaseReport,
};

#[derive(Debug, Default)]
struct RunOptions {
    seed: Option<[u8; 32]>,
    csv: Option<PathBuf>,
    bands: Option<PathBuf>,
    trace: usize,
    events: Option<PathBuf>,
}

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap_or_else(|e| eprintln!("Logger unavailable: {}", e));

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX] [--csv PATH] [--bands PATH] [--trace N] [--events PATH]",
            args[0]
        );
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/inverter.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/inverter.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let options = parse_options(&args[2..]);

    if path.is_file() {
        run_scenario_file(path, &options);
    } else if path.is_dir() {
        run_scenario_directory(path, &options);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn parse_options(args: &[String]) -> RunOptions {
    let mut options = RunOptions::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter.next().unwrap_or_else(|| {
            eprintln!("Missing value for {}", flag);
            std::process::exit(1);
        });
        match flag.as_str() {
            "--seed" => {
                options.seed = Some(parse_seed_hex(value).unwrap_or_else(|e| {
                    eprintln!("Invalid seed: {}", e);
                    std::process::exit(1);
                }));
            }
            "--csv" => options.csv = Some(PathBuf::from(value)),
            "--bands" => options.bands = Some(PathBuf::from(value)),
            "--events" => options.events = Some(PathBuf::from(value)),
            "--trace" => {
                options.trace = value.parse().unwrap_or_else(|e| {
                    eprintln!("Invalid trial count for --trace: {}", e);
                    std::process::exit(1);
                });
            }
            other => {
                eprintln!("Unknown option: {}", other);
                std::process::exit(1);
            }
        }
    }
    options
}

fn run_scenario_directory(dir: &Path, options: &RunOptions) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                 ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, options);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
}

fn run_scenario_file(path: &Path, options: &RunOptions) {
    println!("Loading scenario from: {}", path.display());

    let scenario = ScenarioFile::load(path).unwrap_or_else(|e| {
        if e.is_configuration() {
            eprintln!("Invalid scenario {}: {}", path.display(), e);
        } else {
            eprintln!("Cannot read {}: {}", path.display(), e);
        }
        std::process::exit(1);
    });

    let name = scenario.display_name();
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  {}  {}", name, " ".repeat(54_usize.saturating_sub(name.len())));
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    let config = scenario.build_config(options.seed).unwrap_or_else(|e| {
        eprintln!("Configuration error in {}: {}", path.display(), e);
        std::process::exit(1);
    });
    let scheduled = scenario.scheduled_faults().unwrap_or_else(|e| {
        eprintln!("Configuration error in {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let settings = config.settings();
    println!("Configuration:");
    println!("  Service life: {} years x {} steps", settings.service_life_years, settings.steps_per_year);
    println!("  Monte Carlo trials: {}", settings.monte_carlo_trials);
    println!("  Replaceable units: {}", config.num_units());
    println!(
        "  Fault modes: early={} random={} wearout={}",
        settings.faults.early, settings.faults.random, settings.faults.wearout
    );
    println!("  Maintenance: {}", settings.maintenance_enabled);
    println!("\nStarting simulation...\n");

    let mut runner = StaircaseRunner::new(config).unwrap_or_else(|e| {
        eprintln!("Cannot build hazard model: {}", e);
        std::process::exit(1);
    });
    for fault in scheduled {
        runner.schedule_fault(fault).unwrap_or_else(|e| {
            eprintln!("Invalid scheduled fault: {}", e);
            std::process::exit(1);
        });
    }

    let history = if let Some(ref events_path) = options.events {
        let mut collector = CollectorEventSink::new();
        let history = runner.run_with_sink(&mut collector);
        let counts = collector.count_by_type();
        info!(
            "{} faults ({} scheduled), {} maintenance, {} renewals",
            counts.faults, counts.scheduled_faults, counts.maintenance, counts.renewals
        );
        if let Err(e) = collector.export_to_csv(events_path) {
            eprintln!("Failed to write {}: {}", events_path.display(), e);
        }
        history
    } else if options.trace > 0 {
        let mut console = ConsoleEventSink::new(options.trace, scenario.unit_names());
        runner.run_with_sink(&mut console)
    } else {
        runner.run()
    };

    let report = StaircaseReport::from_history(&name, scenario.unit_names(), &history);
    report.print_summary();

    if let Some(ref csv_path) = options.csv {
        match report.write_csv(csv_path) {
            Ok(()) => println!("Breakdown written to {}", csv_path.display()),
            Err(e) => eprintln!("Failed to write {}: {}", csv_path.display(), e),
        }
    }
    if let Some(ref bands_path) = options.bands {
        match write_bands_csv(&history, bands_path) {
            Ok(()) => println!("Percentile bands written to {}", bands_path.display()),
            Err(e) => eprintln!("Failed to write {}: {}", bands_path.display(), e),
        }
    }

    println!("\n✓ Scenario complete!\n");
}
