//! # pelca - Staircase reliability and impact accumulation
//!
//! Estimates the lifetime environmental impact and cost of a modular,
//! repairable power-electronics product. Replaceable units (RUs) age through
//! discrete time steps, fail according to three competing Weibull modes
//! (early, random, wearout), get replaced or maintained according to a
//! replacement policy, and every renewal adds its manufacturing impact to a
//! running total. Plotted over time the totals form a staircase.
//!
//! ## Core Components
//!
//! - **StaircaseConfig**: validated, immutable input (settings, LCA inventory,
//!   reliability table, replacement policy)
//! - **HazardModel**: per-mode Weibull CDF and share tables
//! - **ReplacementPolicy**: which RUs are renewed when an RU faults or is maintained
//! - **StaircaseRunner**: the vectorized renewal Monte Carlo simulator
//! - **ResultAggregator**: percentile bands, category breakdowns, uncertainty rows
//!
//! ## Usage
//!
//! ```no_run
//! use pelca::{
//!     FaultParams, ImpactMethod, Inventory, ReliabilityRow, ReplaceableUnit, ReplacementPolicy,
//!     ResultAggregator, RuCosts, StaircaseConfig, StaircaseRunner, StaircaseSettings,
//!     WeibullParams,
//! };
//!
//! # fn main() -> pelca::Result<()> {
//! let inventory = Inventory {
//!     methods: vec![ImpactMethod::new("Climate change", "kg CO2-eq")],
//!     units: vec![ReplaceableUnit {
//!         name: "Power module".to_string(),
//!         manufacturing_impact: vec![12.0],
//!         use_impact_rate: vec![0.002],
//!         costs: RuCosts::default(),
//!     }],
//! };
//! let weibull = WeibullParams::new(2.0, 8.0);
//! let reliability = vec![ReliabilityRow {
//!     faults: FaultParams { early: weibull, random: weibull, wearout: weibull },
//!     maintenance_interval: None,
//! }];
//!
//! let config = StaircaseConfig::new(
//!     StaircaseSettings::default(),
//!     inventory,
//!     reliability,
//!     ReplacementPolicy::identity(1),
//! )?;
//! let history = StaircaseRunner::new(config)?.run();
//! for row in ResultAggregator::new(&history).uncertainty_summary() {
//!     println!("{}: {:.2} ± {:.2} {}", row.method, row.mean, 2.0 * row.std_dev, row.unit);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Scenarios
//!
//! YAML scenario files, CSV export and console reporting live in the
//! `simulator/` tooling (`scenario_runner`, `profiling_runner`).

// Core engine
pub mod pe_interface;
pub mod pe_error;
pub mod pe_config;
pub mod pe_replacement;
pub mod pe_hazard;
pub mod pe_history;
pub mod pe_simulator;

// Reporting
pub mod pe_aggregate;

// Re-export commonly used types
pub use pe_aggregate::{CategoryBreakdown, CostBreakdown, ResultAggregator, TrialBands, UncertaintyRow};
pub use pe_config::{
    seed_from_phrase, FaultModeSwitches, FaultParams, Inventory, InventorySource, ReliabilityRow,
    ReplaceableUnit, RuCosts, StaircaseConfig, StaircaseSettings, WeibullParams,
};
pub use pe_error::{Result, StaircaseError};
pub use pe_hazard::HazardModel;
pub use pe_history::{ImpactSeries, StaircaseHistory};
pub use pe_interface::{
    Event, EventSink, FaultCause, FaultMode, ImpactCategory, ImpactMethod, NoOpSink,
    RenewalTrigger, RuIndex, TimeStep, TrialIndex,
};
pub use pe_replacement::{ReplacementPolicy, ReplacementTrigger};
pub use pe_simulator::{ScheduledFault, StaircaseRunner, ThresholdPair};
