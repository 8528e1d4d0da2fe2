// Staircase configuration
//
// Typed, validated replacement for a loosely keyed parameter map. A
// `StaircaseConfig` can only be obtained through `StaircaseConfig::new`,
// which rejects shape mismatches, NaNs and incomplete replacement matrices
// before any Monte Carlo work is done.

use log::warn;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Weibull;

use crate::pe_error::{Result, StaircaseError};
use crate::pe_interface::{FaultMode, ImpactMethod, RuIndex, TimeStep, EPSILON_YEARS};
use crate::pe_replacement::ReplacementPolicy;

// ============================================================================
// Scalar Settings
// ============================================================================

/// Which competing failure modes are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultModeSwitches {
    pub early: bool,
    pub random: bool,
    pub wearout: bool,
}

impl FaultModeSwitches {
    pub fn all() -> Self {
        Self {
            early: true,
            random: true,
            wearout: true,
        }
    }

    pub fn none() -> Self {
        Self {
            early: false,
            random: false,
            wearout: false,
        }
    }

    pub fn is_enabled(&self, mode: FaultMode) -> bool {
        match mode {
            FaultMode::Early => self.early,
            FaultMode::Random => self.random,
            FaultMode::Wearout => self.wearout,
        }
    }

    pub fn any(&self) -> bool {
        self.early || self.random || self.wearout
    }

    /// Enabled modes in attribution order
    pub fn enabled(&self) -> impl Iterator<Item = FaultMode> + '_ {
        FaultMode::ALL.into_iter().filter(|m| self.is_enabled(*m))
    }
}

impl Default for FaultModeSwitches {
    fn default() -> Self {
        Self::all()
    }
}

/// Run-level scalar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseSettings {
    /// Service life of the product (years)
    pub service_life_years: usize,

    /// Discrete time steps per year
    pub steps_per_year: usize,

    /// Operating hours per year, converts per-hour use rates into per-step values
    pub annual_usage_hours: f64,

    /// Number of Monte Carlo trials simulated side by side
    pub monte_carlo_trials: usize,

    /// Active fault modes
    pub faults: FaultModeSwitches,

    /// Preventive maintenance at each RU's configured interval
    pub maintenance_enabled: bool,

    /// Count maintenance-only renewals in the fault counter
    pub maintenance_counts_as_fault: bool,

    /// Random seed (None = generate random)
    pub seed: Option<[u8; 32]>,
}

impl Default for StaircaseSettings {
    fn default() -> Self {
        Self {
            service_life_years: 10,
            steps_per_year: 12,
            annual_usage_hours: 8760.0,
            monte_carlo_trials: 1000,
            faults: FaultModeSwitches::all(),
            maintenance_enabled: false,
            maintenance_counts_as_fault: false,
            seed: None,
        }
    }
}

impl StaircaseSettings {
    /// Simulation horizon `T` in steps
    pub fn time_steps(&self) -> usize {
        self.service_life_years * self.steps_per_year
    }

    /// Get or generate seed
    pub fn resolve_seed(&self) -> [u8; 32] {
        self.seed.unwrap_or_else(|| {
            let mut temp_rng = StdRng::from_entropy();
            let mut seed = [0u8; 32];
            temp_rng.fill_bytes(&mut seed);
            seed
        })
    }

    fn validate(&self) -> Result<()> {
        if self.service_life_years == 0 {
            return Err(invalid_setting("service_life_years", "must be at least 1"));
        }
        if self.steps_per_year == 0 {
            return Err(invalid_setting("steps_per_year", "must be at least 1"));
        }
        if self.time_steps() < 2 {
            return Err(invalid_setting(
                "service_life_years",
                "horizon must span at least two time steps",
            ));
        }
        if self.monte_carlo_trials == 0 {
            return Err(invalid_setting("monte_carlo_trials", "must be at least 1"));
        }
        if !self.annual_usage_hours.is_finite() || self.annual_usage_hours < 0.0 {
            return Err(invalid_setting(
                "annual_usage_hours",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}

/// Derive a 32-byte seed from a human readable phrase
pub fn seed_from_phrase(phrase: &str) -> [u8; 32] {
    *blake3::hash(phrase.as_bytes()).as_bytes()
}

fn invalid_setting(field: &str, reason: &str) -> StaircaseError {
    StaircaseError::InvalidSetting {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// Reliability Table
// ============================================================================

/// Weibull shape (beta) and scale (sigma, years)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    pub shape: f64,
    pub scale: f64,
}

impl WeibullParams {
    pub fn new(shape: f64, scale: f64) -> Self {
        Self { shape, scale }
    }

    /// Build the distribution, reporting the RU and mode on failure
    pub fn distribution(&self, ru: RuIndex, mode: FaultMode) -> Result<Weibull> {
        Weibull::new(self.shape, self.scale).map_err(|e| StaircaseError::InvalidWeibull {
            ru,
            mode: mode.to_string(),
            reason: e.to_string(),
        })
    }
}

/// The six Weibull parameters of one RU
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultParams {
    pub early: WeibullParams,
    pub random: WeibullParams,
    pub wearout: WeibullParams,
}

impl FaultParams {
    pub fn get(&self, mode: FaultMode) -> WeibullParams {
        match mode {
            FaultMode::Early => self.early,
            FaultMode::Random => self.random,
            FaultMode::Wearout => self.wearout,
        }
    }
}

/// One row of the faults and maintenance table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityRow {
    pub faults: FaultParams,

    /// Maintenance interval in steps (None = never maintained)
    #[serde(default)]
    pub maintenance_interval: Option<TimeStep>,
}

// ============================================================================
// Inventory (external LCA lookup output)
// ============================================================================

/// Per-RU cost scalars
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuCosts {
    pub raw_material: f64,
    pub assembly: f64,
    pub disassembly: f64,
    pub energy_per_hour: f64,
}

impl RuCosts {
    /// Cost of swapping the unit for a new one
    pub fn renewal(&self) -> f64 {
        self.raw_material + self.assembly + self.disassembly
    }
}

/// A replaceable unit as produced by the LCA lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceableUnit {
    pub name: String,

    /// Impact of manufacturing one unit, one value per impact method
    pub manufacturing_impact: Vec<f64>,

    /// Use-phase impact per operating hour, one value per impact method
    pub use_impact_rate: Vec<f64>,

    #[serde(default)]
    pub costs: RuCosts,
}

/// Ordered impact methods and the units they apply to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub methods: Vec<ImpactMethod>,
    pub units: Vec<ReplaceableUnit>,
}

impl Inventory {
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(invalid_setting("methods", "at least one impact method is required"));
        }
        if self.units.is_empty() {
            return Err(invalid_setting("units", "at least one replaceable unit is required"));
        }
        let methods = self.methods.len();
        for (ru, unit) in self.units.iter().enumerate() {
            check_vector(ru, "manufacturing_impact", &unit.manufacturing_impact, methods)?;
            check_vector(ru, "use_impact_rate", &unit.use_impact_rate, methods)?;
            let costs = [
                ("costs.raw_material", unit.costs.raw_material),
                ("costs.assembly", unit.costs.assembly),
                ("costs.disassembly", unit.costs.disassembly),
                ("costs.energy_per_hour", unit.costs.energy_per_hour),
            ];
            for (field, value) in costs {
                check_nan(ru, field, value)?;
            }
        }
        Ok(())
    }
}

/// Producer of an `Inventory` (spreadsheet reader, LCA database, fixture)
pub trait InventorySource {
    /// Human readable name used in error reports
    fn source_name(&self) -> String;

    /// Produce the inventory, or `StaircaseError::Resource` if the
    /// underlying data is unavailable
    fn load_inventory(&self) -> Result<Inventory>;
}

impl InventorySource for Inventory {
    fn source_name(&self) -> String {
        "in-memory inventory".to_string()
    }

    fn load_inventory(&self) -> Result<Inventory> {
        Ok(self.clone())
    }
}

fn check_vector(ru: RuIndex, field: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(StaircaseError::ShapeMismatch {
            table: format!("{} of RU {}", field, ru),
            expected,
            found: values.len(),
        });
    }
    for (m, value) in values.iter().enumerate() {
        check_nan(ru, &format!("{}[{}]", field, m), *value)?;
    }
    Ok(())
}

fn check_nan(ru: RuIndex, field: &str, value: f64) -> Result<()> {
    if value.is_nan() {
        return Err(StaircaseError::NanParameter {
            ru,
            field: field.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Validated Configuration
// ============================================================================

/// Immutable, validated input of one staircase run
#[derive(Debug, Clone)]
pub struct StaircaseConfig {
    settings: StaircaseSettings,
    inventory: Inventory,
    reliability: Vec<ReliabilityRow>,
    policy: ReplacementPolicy,
    use_impact_step: Vec<f64>,
}

impl StaircaseConfig {
    /// Validate and freeze all inputs
    ///
    /// Checks, in order: scalar settings, inventory shapes and NaNs, the
    /// reliability table (one row per RU, no NaN, usable Weibull parameters
    /// for every enabled mode, maintenance intervals), and completeness of
    /// the replacement policy for every trigger that can fire.
    pub fn new(
        settings: StaircaseSettings,
        inventory: Inventory,
        reliability: Vec<ReliabilityRow>,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        settings.validate()?;
        inventory.validate()?;

        let num_units = inventory.num_units();
        if reliability.len() != num_units {
            return Err(StaircaseError::ShapeMismatch {
                table: "faults and maintenance".to_string(),
                expected: num_units,
                found: reliability.len(),
            });
        }

        let horizon = settings.time_steps();
        for (ru, row) in reliability.iter().enumerate() {
            for mode in FaultMode::ALL {
                let params = row.faults.get(mode);
                let prefix = mode.to_string().to_lowercase();
                check_nan(ru, &format!("{}.shape", prefix), params.shape)?;
                check_nan(ru, &format!("{}.scale", prefix), params.scale)?;
                if settings.faults.is_enabled(mode) {
                    params.distribution(ru, mode)?;
                }
            }
            if let Some(interval) = row.maintenance_interval {
                if interval == 0 {
                    return Err(invalid_setting(
                        &format!("maintenance_interval of RU {}", ru),
                        "must be at least one step",
                    ));
                }
                if settings.maintenance_enabled && interval >= horizon {
                    warn!(
                        "RU {} maintenance interval {} is beyond the {}-step horizon",
                        ru, interval, horizon
                    );
                }
            }
        }

        let maintained: Vec<RuIndex> = if settings.maintenance_enabled {
            reliability
                .iter()
                .enumerate()
                .filter(|(_, row)| row.maintenance_interval.is_some())
                .map(|(ru, _)| ru)
                .collect()
        } else {
            Vec::new()
        };
        policy.validate(num_units, &settings.faults, &maintained)?;

        if !settings.faults.any() && !settings.maintenance_enabled {
            warn!("all fault modes and maintenance are disabled; no unit will ever be renewed");
        }

        let scale = settings.annual_usage_hours / settings.steps_per_year as f64;
        let mut use_impact_step = vec![0.0; inventory.num_methods()];
        for unit in &inventory.units {
            for (acc, rate) in use_impact_step.iter_mut().zip(&unit.use_impact_rate) {
                *acc += rate * scale;
            }
        }

        Ok(Self {
            settings,
            inventory,
            reliability,
            policy,
            use_impact_step,
        })
    }

    /// Load the inventory from an external source, then validate
    pub fn from_source<S: InventorySource>(
        settings: StaircaseSettings,
        source: &S,
        reliability: Vec<ReliabilityRow>,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        let inventory = source.load_inventory()?;
        Self::new(settings, inventory, reliability, policy)
    }

    pub fn settings(&self) -> &StaircaseSettings {
        &self.settings
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn reliability(&self) -> &[ReliabilityRow] {
        &self.reliability
    }

    pub fn policy(&self) -> &ReplacementPolicy {
        &self.policy
    }

    pub fn methods(&self) -> &[ImpactMethod] {
        &self.inventory.methods
    }

    pub fn num_units(&self) -> usize {
        self.inventory.num_units()
    }

    pub fn num_methods(&self) -> usize {
        self.inventory.num_methods()
    }

    pub fn num_trials(&self) -> usize {
        self.settings.monte_carlo_trials
    }

    pub fn time_steps(&self) -> usize {
        self.settings.time_steps()
    }

    /// Time in years at which age `age` is evaluated
    pub fn years_at(&self, age: TimeStep) -> f64 {
        if age == 0 {
            EPSILON_YEARS
        } else {
            age as f64 / self.settings.steps_per_year as f64
        }
    }

    /// Maintenance interval of an RU, if maintenance is enabled for the run
    pub fn maintenance_interval(&self, ru: RuIndex) -> Option<TimeStep> {
        if !self.settings.maintenance_enabled {
            return None;
        }
        self.reliability[ru].maintenance_interval
    }

    /// Manufacturing impact of the whole product, per method
    pub fn baseline_manufacturing(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.num_methods()];
        for unit in &self.inventory.units {
            for (acc, value) in total.iter_mut().zip(&unit.manufacturing_impact) {
                *acc += value;
            }
        }
        total
    }

    /// Use-phase impact accrued by the whole product in one step, per method
    pub fn use_impact_step(&self) -> &[f64] {
        &self.use_impact_step
    }

    /// Raw material cost of the whole product
    pub fn baseline_cost(&self) -> f64 {
        self.inventory.units.iter().map(|u| u.costs.raw_material).sum()
    }

    /// Energy cost accrued by the whole product in one step
    pub fn use_cost_step(&self) -> f64 {
        let scale = self.settings.annual_usage_hours / self.settings.steps_per_year as f64;
        self.inventory
            .units
            .iter()
            .map(|u| u.costs.energy_per_hour * scale)
            .sum()
    }
}
