// Shared vocabulary for the staircase engine
//
// Index aliases, the closed enumerations for fault causes and impact
// categories, and the event sink used to observe a running simulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a replaceable unit (RU) type in the product
pub type RuIndex = usize;

/// Index of a Monte Carlo trial
pub type TrialIndex = usize;

/// Discrete time step, also used for unit ages
pub type TimeStep = usize;

/// Time offset (years) used for age 0 so hazard shares never divide 0/0
pub const EPSILON_YEARS: f64 = 1e-10;

/// Replacement indicators at or above this value renew the unit
pub const RENEWAL_THRESHOLD: f64 = 0.5;

// ============================================================================
// Fault Modes
// ============================================================================

/// The three competing Weibull failure modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FaultMode {
    Early,
    Random,
    Wearout,
}

impl FaultMode {
    /// All modes in attribution order
    pub const ALL: [FaultMode; 3] = [FaultMode::Early, FaultMode::Random, FaultMode::Wearout];

    /// Position of the mode in per-mode tables
    pub fn index(self) -> usize {
        match self {
            FaultMode::Early => 0,
            FaultMode::Random => 1,
            FaultMode::Wearout => 2,
        }
    }
}

impl fmt::Display for FaultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultMode::Early => write!(f, "Early"),
            FaultMode::Random => write!(f, "Random"),
            FaultMode::Wearout => write!(f, "Wearout"),
        }
    }
}

/// Fault cause recorded per (step, trial, RU)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaultCause {
    #[default]
    None,
    Early,
    Random,
    Wearout,
}

impl FaultCause {
    pub fn is_fault(self) -> bool {
        self != FaultCause::None
    }

    /// The failure mode behind this cause, if any
    pub fn mode(self) -> Option<FaultMode> {
        match self {
            FaultCause::None => None,
            FaultCause::Early => Some(FaultMode::Early),
            FaultCause::Random => Some(FaultMode::Random),
            FaultCause::Wearout => Some(FaultMode::Wearout),
        }
    }
}

impl From<FaultMode> for FaultCause {
    fn from(mode: FaultMode) -> Self {
        match mode {
            FaultMode::Early => FaultCause::Early,
            FaultMode::Random => FaultCause::Random,
            FaultMode::Wearout => FaultCause::Wearout,
        }
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode() {
            Some(mode) => mode.fmt(f),
            None => write!(f, "None"),
        }
    }
}

// ============================================================================
// Impact Reporting
// ============================================================================

/// Reporting categories of the end-of-life breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactCategory {
    Manufacturing,
    Use,
    Replacement,
    Maintenance,
}

impl ImpactCategory {
    pub const ALL: [ImpactCategory; 4] = [
        ImpactCategory::Manufacturing,
        ImpactCategory::Use,
        ImpactCategory::Replacement,
        ImpactCategory::Maintenance,
    ];

    /// Label used in reports and exported tables
    pub fn label(self) -> &'static str {
        match self {
            ImpactCategory::Manufacturing => "Manufacture",
            ImpactCategory::Use => "Use",
            ImpactCategory::Replacement => "Replacement",
            ImpactCategory::Maintenance => "Maintenance",
        }
    }
}

/// One environmental-impact method (e.g. climate change, kg CO2-eq)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactMethod {
    pub name: String,
    pub unit: String,
}

impl ImpactMethod {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

// ============================================================================
// Event Logging
// ============================================================================

/// Why a unit was renewed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalTrigger {
    /// Replaced because this unit or a unit sharing its replacement row faulted
    Fault,
    /// Replaced by scheduled maintenance
    Maintenance,
}

/// Events emitted by the simulator for observability
///
/// Events are logged via the `EventSink` trait. Use `NoOpSink` when no
/// per-event output is needed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A unit's hazard crossed its threshold (or a scheduled fault fired)
    Fault {
        ru: RuIndex,
        cause: FaultCause,
        age: TimeStep,
        scheduled: bool,
    },
    /// A unit reached its maintenance interval
    MaintenanceDue { ru: RuIndex, age: TimeStep },
    /// A unit was renewed (age reset, thresholds redrawn)
    Renewed {
        ru: RuIndex,
        trigger: RenewalTrigger,
        indicator: f64,
    },
}

/// Event sink for observing simulation progress
pub trait EventSink {
    fn log(&mut self, step: TimeStep, trial: TrialIndex, event: Event);
}

/// No-op event sink (zero overhead)
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&mut self, _step: TimeStep, _trial: TrialIndex, _event: Event) {}
}
