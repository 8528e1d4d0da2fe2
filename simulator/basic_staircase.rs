//! Basic Staircase Example
//!
//! A three-unit inverter built in code: the power board takes its gate
//! driver with it when it fails, and the cooling fan is swapped every three
//! years.
//!
//! Run with: cargo run --example basic_staircase

mod staircase;

use log::info;
use pelca::{
    FaultParams, ImpactMethod, Inventory, ReliabilityRow, ReplaceableUnit, ReplacementPolicy, RuCosts,
    StaircaseConfig, StaircaseRunner, StaircaseSettings, WeibullParams,
};
use simple_logger::SimpleLogger;

use staircase::StaircaseReport;

fn unit(name: &str, manufacturing: [f64; 2], use_rate: [f64; 2], costs: RuCosts) -> ReplaceableUnit {
    ReplaceableUnit {
        name: name.to_string(),
        manufacturing_impact: manufacturing.to_vec(),
        use_impact_rate: use_rate.to_vec(),
        costs,
    }
}

fn faults(early_scale: f64, random_scale: f64, wearout_shape: f64, wearout_scale: f64) -> FaultParams {
    FaultParams {
        early: WeibullParams::new(0.5, early_scale),
        random: WeibullParams::new(1.0, random_scale),
        wearout: WeibullParams::new(wearout_shape, wearout_scale),
    }
}

fn main() {
    SimpleLogger::new().init().unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║        Basic Staircase Simulation                      ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    info!("Setting up inverter model...");

    let inventory = Inventory {
        methods: vec![
            ImpactMethod::new("Climate change", "kg CO2-eq"),
            ImpactMethod::new("Resource use, minerals and metals", "kg Sb-eq"),
        ],
        units: vec![
            unit(
                "Power board",
                [48.0, 0.012],
                [0.0031, 0.0000002],
                RuCosts {
                    raw_material: 120.0,
                    assembly: 25.0,
                    disassembly: 10.0,
                    energy_per_hour: 0.0009,
                },
            ),
            unit(
                "Gate driver",
                [6.5, 0.002],
                [0.0002, 0.0],
                RuCosts {
                    raw_material: 18.0,
                    assembly: 4.0,
                    disassembly: 2.0,
                    energy_per_hour: 0.00005,
                },
            ),
            unit(
                "Cooling fan",
                [3.1, 0.0007],
                [0.0004, 0.0],
                RuCosts {
                    raw_material: 9.0,
                    assembly: 1.5,
                    disassembly: 1.0,
                    energy_per_hour: 0.0001,
                },
            ),
        ],
    };

    let reliability = vec![
        ReliabilityRow {
            faults: faults(800.0, 60.0, 4.0, 22.0),
            maintenance_interval: None,
        },
        ReliabilityRow {
            faults: faults(300.0, 45.0, 3.0, 18.0),
            maintenance_interval: None,
        },
        ReliabilityRow {
            faults: faults(500.0, 30.0, 3.5, 6.0),
            maintenance_interval: Some(36),
        },
    ];

    let mut policy = ReplacementPolicy::identity(3);
    policy.set_fault_row(0, vec![1.0, 1.0, 0.0]);

    let settings = StaircaseSettings {
        service_life_years: 15,
        steps_per_year: 12,
        annual_usage_hours: 4000.0,
        monte_carlo_trials: 500,
        maintenance_enabled: true,
        seed: None, // Will be auto-generated
        ..Default::default()
    };

    info!("Configuration:");
    info!("  Service life: {} years", settings.service_life_years);
    info!("  Trials: {}", settings.monte_carlo_trials);
    info!("  Units: {}", inventory.num_units());
    info!("");

    let unit_names = inventory.units.iter().map(|u| u.name.clone()).collect();
    let config = StaircaseConfig::new(settings, inventory, reliability, policy).unwrap();

    info!("Starting simulation...");
    let history = StaircaseRunner::new(config).unwrap().run();

    StaircaseReport::from_history("Basic inverter", unit_names, &history).print_summary();

    info!("✓ Simulation complete!");
}
