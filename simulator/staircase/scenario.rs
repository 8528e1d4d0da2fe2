//! YAML scenario files
//!
//! A scenario describes one product: run settings, impact methods, and every
//! replaceable unit with its LCA values, Weibull parameters, maintenance
//! interval and cascading replacements. Units are keyed by name and keep
//! their file order, which defines the RU index.
//!
//! ```yaml
//! meta:
//!   name: "Two-level inverter"
//! settings:
//!   service_life_years: 20
//!   steps_per_year: 12
//!   monte_carlo_trials: 500
//! seed_phrase: "inverter-baseline"
//! methods:
//!   - { name: "Climate change", unit: "kg CO2-eq" }
//! units:
//!   Power module:
//!     manufacturing_impact: [35.0]
//!     use_impact_rate: [0.004]
//!     faults:
//!       early: { shape: 0.5, scale: 400.0 }
//!       random: { shape: 1.0, scale: 40.0 }
//!       wearout: { shape: 4.0, scale: 15.0 }
//!     replaces_on_fault: { Gate driver: 1.0 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use pelca::{
    seed_from_phrase, FaultMode, FaultParams, ImpactMethod, Inventory, InventorySource, ReliabilityRow,
    ReplaceableUnit, ReplacementPolicy, ReplacementTrigger, Result, RuCosts, RuIndex, ScheduledFault,
    StaircaseConfig, StaircaseError, StaircaseSettings, TimeStep, TrialIndex,
};

/// Scenario file format
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub meta: ScenarioMeta,

    #[serde(default)]
    pub settings: StaircaseSettings,

    /// Seed derived from a phrase; overridden by `settings.seed` and `--seed`
    #[serde(default)]
    pub seed_phrase: Option<String>,

    pub methods: Vec<ImpactMethod>,

    pub units: IndexMap<String, UnitSpec>,

    #[serde(default)]
    pub scheduled_faults: Vec<ScheduledFaultSpec>,

    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// One replaceable unit as written in the scenario
#[derive(Debug, Clone, Deserialize)]
pub struct UnitSpec {
    pub manufacturing_impact: Vec<f64>,
    pub use_impact_rate: Vec<f64>,

    #[serde(default)]
    pub costs: RuCosts,

    pub faults: FaultParams,

    #[serde(default)]
    pub maintenance_interval: Option<TimeStep>,

    /// Other units renewed with this one when it faults, with their weight
    #[serde(default)]
    pub replaces_on_fault: IndexMap<String, f64>,

    /// Other units renewed with this one when it is maintained
    #[serde(default)]
    pub replaces_on_maintenance: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledFaultSpec {
    pub step: TimeStep,
    #[serde(default)]
    pub trial: TrialIndex,
    pub unit: String,
    pub mode: FaultMode,
}

impl ScenarioFile {
    /// Read and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let yaml_content = fs::read_to_string(path).map_err(|e| StaircaseError::Resource {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut scenario = Self::parse(&yaml_content)?;
        scenario.origin = Some(path.to_path_buf());
        debug!("loaded scenario {} with {} units", path.display(), scenario.units.len());
        Ok(scenario)
    }

    pub fn parse(yaml_content: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_content).map_err(|e| StaircaseError::InvalidSetting {
            field: "scenario".to_string(),
            reason: e.to_string(),
        })
    }

    /// Scenario name for headers, falling back to the file stem
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.meta.name {
            return name.clone();
        }
        self.origin
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed scenario".to_string())
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    /// Settings with the seed resolved: explicit override, then the file's
    /// own seed, then the seed phrase
    pub fn resolved_settings(&self, seed_override: Option<[u8; 32]>) -> StaircaseSettings {
        let mut settings = self.settings.clone();
        settings.seed = seed_override
            .or(settings.seed)
            .or_else(|| self.seed_phrase.as_deref().map(seed_from_phrase));
        settings
    }

    pub fn reliability(&self) -> Vec<ReliabilityRow> {
        self.units
            .values()
            .map(|unit| ReliabilityRow {
                faults: unit.faults,
                maintenance_interval: unit.maintenance_interval,
            })
            .collect()
    }

    /// Replacement policy from the per-unit cascade lists
    pub fn policy(&self) -> Result<ReplacementPolicy> {
        let mut policy = ReplacementPolicy::new();
        for (ru, (name, unit)) in self.units.iter().enumerate() {
            let on_fault = self.replacement_row(ru, name, "replaces_on_fault", &unit.replaces_on_fault)?;
            policy.set_fault_row(ru, on_fault);
            let on_maintenance =
                self.replacement_row(ru, name, "replaces_on_maintenance", &unit.replaces_on_maintenance)?;
            policy.set_row(ReplacementTrigger::Maintenance, ru, on_maintenance);
        }
        Ok(policy)
    }

    pub fn scheduled_faults(&self) -> Result<Vec<ScheduledFault>> {
        self.scheduled_faults
            .iter()
            .map(|spec| {
                Ok(ScheduledFault {
                    step: spec.step,
                    trial: spec.trial,
                    ru: self.unit_index(&spec.unit, "scheduled_faults")?,
                    mode: spec.mode,
                })
            })
            .collect()
    }

    /// Validated configuration for a run
    pub fn build_config(&self, seed_override: Option<[u8; 32]>) -> Result<StaircaseConfig> {
        StaircaseConfig::from_source(
            self.resolved_settings(seed_override),
            self,
            self.reliability(),
            self.policy()?,
        )
    }

    fn replacement_row(
        &self,
        ru: RuIndex,
        name: &str,
        field: &str,
        cascade: &IndexMap<String, f64>,
    ) -> Result<Vec<f64>> {
        let mut row = vec![0.0; self.units.len()];
        row[ru] = 1.0;
        for (other, weight) in cascade {
            let idx = self.unit_index(other, &format!("units.{}.{}", name, field))?;
            row[idx] = *weight;
        }
        Ok(row)
    }

    fn unit_index(&self, name: &str, field: &str) -> Result<RuIndex> {
        self.units
            .get_index_of(name)
            .ok_or_else(|| StaircaseError::InvalidSetting {
                field: field.to_string(),
                reason: format!("unknown unit '{}'", name),
            })
    }
}

impl InventorySource for ScenarioFile {
    fn source_name(&self) -> String {
        match self.origin {
            Some(ref path) => path.display().to_string(),
            None => self.display_name(),
        }
    }

    fn load_inventory(&self) -> Result<Inventory> {
        Ok(Inventory {
            methods: self.methods.clone(),
            units: self
                .units
                .iter()
                .map(|(name, unit)| ReplaceableUnit {
                    name: name.clone(),
                    manufacturing_impact: unit.manufacturing_impact.clone(),
                    use_impact_rate: unit.use_impact_rate.clone(),
                    costs: unit.costs,
                })
                .collect(),
        })
    }
}

/// Parse a hex seed (optional `0x` prefix, up to 32 bytes, zero padded)
pub fn parse_seed_hex(hex: &str) -> std::result::Result<[u8; 32], String> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut seed = [0u8; 32];

    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        if i >= 32 {
            break;
        }
        let byte_str = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
        seed[i] = u8::from_str_radix(byte_str, 16).map_err(|e| format!("invalid hex seed: {}", e))?;
    }

    Ok(seed)
}
