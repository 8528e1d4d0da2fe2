//! Staircase renewal simulator
//!
//! Advances every Monte Carlo trial and every replaceable unit through the
//! service life in lock-step. Each (trial, RU) entry carries two uniform
//! thresholds: one compared against the unit's combined Weibull hazard to
//! decide *when* it fails, one compared against the mode shares at the
//! failure age to decide *why*. Thresholds are redrawn only when the unit is
//! renewed, so a step never samples a fresh Bernoulli per unit and the
//! whole fleet advances with array operations.
//!
//! Step `t` (for `t = 1..T`):
//! 1. ages advance by one
//! 2. units reaching their maintenance interval are renewed (age 0) before
//!    fault evaluation and skip fault detection this step
//! 3. an entry faults when its fault-time threshold lies in
//!    `(previous hazard, current hazard]`
//! 4. each fault is attributed to Early, Random or Wearout
//! 5. replacement rows of all faults in a trial are summed and clipped to 1
//! 6. manufacturing, use and maintenance totals (impact and cost) accrue
//! 7. renewed entries get age 0, fresh thresholds, and a restarted hazard
//!    window; the fault counter advances
//!
//! # Example
//! ```no_run
//! use pelca::{StaircaseConfig, StaircaseRunner};
//! # fn demo(config: StaircaseConfig) -> pelca::Result<()> {
//! let runner = StaircaseRunner::new(config)?;
//! let history = runner.run();
//! println!("faults recorded: {}", history.total_faults());
//! # Ok(())
//! # }
//! ```

use log::{debug, info};
use ndarray::linalg::{general_mat_mul, general_mat_vec_mul};
use ndarray::{aview0, Array, Array1, Array2, ArrayView, Axis, Dimension, RemoveAxis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pe_config::StaircaseConfig;
use crate::pe_error::{Result, StaircaseError};
use crate::pe_hazard::HazardModel;
use crate::pe_history::StaircaseHistory;
use crate::pe_interface::{
    Event, EventSink, FaultCause, FaultMode, NoOpSink, RenewalTrigger, RuIndex, TimeStep,
    TrialIndex, RENEWAL_THRESHOLD,
};
use crate::pe_replacement::{accumulate_clipped, ReplacementTrigger};

// ============================================================================
// Core Structures
// ============================================================================

/// Fault-time and fault-type thresholds of one (trial, RU) entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPair {
    /// Compared against the combined hazard to decide when the unit fails
    pub fault_time: f64,
    /// Compared against the mode shares to decide the cause
    pub fault_type: f64,
}

impl ThresholdPair {
    pub fn new(fault_time: f64, fault_type: f64) -> Self {
        Self {
            fault_time,
            fault_type,
        }
    }

    fn draw<R: Rng>(rng: &mut R) -> Self {
        let fault_time = rng.gen::<f64>();
        let fault_type = rng.gen::<f64>();
        Self {
            fault_time,
            fault_type,
        }
    }
}

/// A fault forced at a given step, independent of the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledFault {
    pub step: TimeStep,
    pub trial: TrialIndex,
    pub ru: RuIndex,
    pub mode: FaultMode,
}

/// Main simulator runner
pub struct StaircaseRunner<R: Rng = StdRng> {
    config: StaircaseConfig,
    hazard: HazardModel,
    rng: R,
    seed: Option<[u8; 32]>,
    initial_thresholds: Option<Array2<ThresholdPair>>,
    scheduled: Vec<ScheduledFault>,
}

/// Mutable per-entry state carried from one step to the next, `[N_MC, N_RU]`
struct RunState {
    age: Array2<TimeStep>,
    thresholds: Array2<ThresholdPair>,
    prev_hazard: Array2<f64>,
    fresh: Array2<bool>,
    fault_count: Array2<u32>,
}

/// Scratch buffers rewritten every step
struct StepBuffers {
    maintenance: Array2<f64>,
    faults: Array2<f64>,
    causes: Array2<FaultCause>,
    scheduled: Array2<bool>,
    hazard: Array2<f64>,
    /// `[N_MC, N_RU]`, fault plus maintenance clipped to 1
    renewal: Array2<f64>,
    /// `[N_MC, N_METHOD]`
    manufacturing_added: Array2<f64>,
    maintenance_added: Array2<f64>,
    /// `[N_MC]`
    cost_added: Array1<f64>,
    maintenance_cost_added: Array1<f64>,
}

/// Dense lookup tables resolved from the configuration once per run
struct RunTables {
    /// `[N_RU, N_RU]` per fault mode; row r = units replaced when r faults
    fault_rows: [Array2<f64>; 3],
    /// `[N_RU, N_RU]`; row r = units replaced when r is maintained
    maintenance_rows: Array2<f64>,
    maintenance_interval: Vec<Option<TimeStep>>,
    /// `[N_RU, N_METHOD]`
    manufacturing: Array2<f64>,
    /// `[N_METHOD]`
    use_step: Array1<f64>,
    /// `[N_RU]`
    renewal_cost: Array1<f64>,
    use_cost_step: f64,
}

// ============================================================================
// Implementation
// ============================================================================

impl StaircaseRunner<StdRng> {
    /// Create a runner seeded from the configuration (or from entropy)
    pub fn new(config: StaircaseConfig) -> Result<Self> {
        let seed = config.settings().resolve_seed();
        let mut runner = Self::with_rng(config, StdRng::from_seed(seed))?;
        runner.seed = Some(seed);
        Ok(runner)
    }
}

impl<R: Rng> StaircaseRunner<R> {
    /// Create a runner drawing thresholds from a caller-supplied RNG
    pub fn with_rng(config: StaircaseConfig, rng: R) -> Result<Self> {
        let hazard = HazardModel::build(&config)?;
        Ok(Self {
            config,
            hazard,
            rng,
            seed: None,
            initial_thresholds: None,
            scheduled: Vec::new(),
        })
    }

    pub fn config(&self) -> &StaircaseConfig {
        &self.config
    }

    pub fn hazard(&self) -> &HazardModel {
        &self.hazard
    }

    /// Replace the initial random draws with fixed thresholds `[N_MC, N_RU]`
    ///
    /// Renewals during the run still draw from the RNG.
    pub fn set_initial_thresholds(&mut self, thresholds: Array2<ThresholdPair>) -> Result<()> {
        let expected = (self.config.num_trials(), self.config.num_units());
        if thresholds.dim() != expected {
            return Err(StaircaseError::ShapeMismatch {
                table: "initial thresholds".to_string(),
                expected: expected.0 * expected.1,
                found: thresholds.len(),
            });
        }
        let out_of_range = |v: f64| !(0.0..=1.0).contains(&v);
        if let Some(((trial, ru), _)) = thresholds
            .indexed_iter()
            .find(|(_, p)| out_of_range(p.fault_time) || out_of_range(p.fault_type))
        {
            return Err(StaircaseError::InvalidSetting {
                field: format!("initial thresholds of trial {} RU {}", trial, ru),
                reason: "thresholds must lie in [0, 1]".to_string(),
            });
        }
        self.initial_thresholds = Some(thresholds);
        Ok(())
    }

    /// Force a fault at a given step
    pub fn schedule_fault(&mut self, fault: ScheduledFault) -> Result<()> {
        let steps = self.config.time_steps();
        if fault.step == 0 || fault.step >= steps {
            return Err(StaircaseError::InvalidSetting {
                field: "scheduled fault step".to_string(),
                reason: format!("step {} is outside 1..{}", fault.step, steps),
            });
        }
        if fault.trial >= self.config.num_trials() {
            return Err(StaircaseError::InvalidSetting {
                field: "scheduled fault trial".to_string(),
                reason: format!("trial {} is outside 0..{}", fault.trial, self.config.num_trials()),
            });
        }
        if fault.ru >= self.config.num_units() {
            return Err(StaircaseError::InvalidSetting {
                field: "scheduled fault RU".to_string(),
                reason: format!("RU {} is outside 0..{}", fault.ru, self.config.num_units()),
            });
        }
        if !self.config.settings().faults.is_enabled(fault.mode) {
            return Err(StaircaseError::InvalidSetting {
                field: "scheduled fault mode".to_string(),
                reason: format!("{} faults are disabled", fault.mode),
            });
        }
        self.config.policy().on_fault(fault.mode, fault.ru)?;
        self.scheduled.push(fault);
        Ok(())
    }

    /// Run the simulation to completion
    pub fn run(self) -> StaircaseHistory {
        self.run_with_sink(&mut NoOpSink)
    }

    /// Run the simulation, reporting every fault, maintenance and renewal
    pub fn run_with_sink<S: EventSink>(mut self, sink: &mut S) -> StaircaseHistory {
        let steps = self.config.time_steps();
        let trials = self.config.num_trials();
        let units = self.config.num_units();
        let methods = self.config.num_methods();

        info!(
            "staircase run: {} trials x {} RUs x {} steps, seed {:?}",
            trials, units, steps, self.seed
        );

        let tables = self.resolve_tables();
        let mut history = StaircaseHistory::allocate(
            steps,
            trials,
            units,
            self.config.methods().to_vec(),
            Array1::from(self.config.baseline_manufacturing()),
            self.config.baseline_cost(),
            self.hazard.system_cdf(),
        );
        history.seed_used = self.seed;

        let mut state = self.initial_state();
        for ((trial, ru), level) in history.hazard.index_axis_mut(Axis(0), 0).indexed_iter_mut() {
            *level = self.hazard.combined(state.age[[trial, ru]], ru);
        }

        let mut buffers = StepBuffers {
            maintenance: Array2::zeros((trials, units)),
            faults: Array2::zeros((trials, units)),
            causes: Array2::from_elem((trials, units), FaultCause::None),
            scheduled: Array2::from_elem((trials, units), false),
            hazard: Array2::zeros((trials, units)),
            renewal: Array2::zeros((trials, units)),
            manufacturing_added: Array2::zeros((trials, methods)),
            maintenance_added: Array2::zeros((trials, methods)),
            cost_added: Array1::zeros(trials),
            maintenance_cost_added: Array1::zeros(trials),
        };

        let mut total_faults = 0;
        let mut total_maintenance = 0;
        for t in 1..steps {
            state.age.mapv_inplace(|a| a + 1);

            let maintained = self.apply_maintenance(t, &tables, &mut state, &mut buffers, sink);
            let faulted = self.detect_faults(t, &tables, &state, &mut buffers, sink);
            self.accumulate(t, &tables, &mut buffers, &mut history);
            self.renew(t, &mut state, &mut buffers, &mut history, sink);

            total_faults += faulted;
            total_maintenance += maintained;
            debug!("step {}: {} faults, {} maintenance renewals", t, faulted, maintained);
        }

        info!(
            "staircase run complete: {} faults, {} maintenance renewals",
            total_faults, total_maintenance
        );
        history
    }

    fn resolve_tables(&self) -> RunTables {
        let units = self.config.num_units();
        let policy = self.config.policy();

        // Missing rows can only belong to triggers that never fire; they
        // stay zero.
        let resolve = |trigger: ReplacementTrigger| -> Array2<f64> {
            let mut table = Array2::<f64>::zeros((units, units));
            for ru in 0..units {
                if let Ok(row) = policy.lookup(trigger, ru) {
                    table.row_mut(ru).assign(&Array1::from(row.to_vec()));
                }
            }
            table
        };

        let inventory = self.config.inventory();
        let mut manufacturing = Array2::<f64>::zeros((units, self.config.num_methods()));
        for (ru, unit) in inventory.units.iter().enumerate() {
            manufacturing
                .row_mut(ru)
                .assign(&Array1::from(unit.manufacturing_impact.clone()));
        }

        RunTables {
            fault_rows: [
                resolve(ReplacementTrigger::Fault(FaultMode::Early)),
                resolve(ReplacementTrigger::Fault(FaultMode::Random)),
                resolve(ReplacementTrigger::Fault(FaultMode::Wearout)),
            ],
            maintenance_rows: resolve(ReplacementTrigger::Maintenance),
            maintenance_interval: (0..units).map(|ru| self.config.maintenance_interval(ru)).collect(),
            manufacturing,
            use_step: Array1::from(self.config.use_impact_step().to_vec()),
            renewal_cost: inventory.units.iter().map(|u| u.costs.renewal()).collect(),
            use_cost_step: self.config.use_cost_step(),
        }
    }

    fn initial_state(&mut self) -> RunState {
        let trials = self.config.num_trials();
        let units = self.config.num_units();

        let thresholds = match self.initial_thresholds.take() {
            Some(fixed) => fixed,
            None => {
                let rng = &mut self.rng;
                Array2::from_shape_simple_fn((trials, units), || ThresholdPair::draw(rng))
            }
        };

        RunState {
            age: Array2::zeros((trials, units)),
            thresholds,
            prev_hazard: Array2::zeros((trials, units)),
            fresh: Array2::from_elem((trials, units), true),
            fault_count: Array2::zeros((trials, units)),
        }
    }

    /// Renew units whose age equals their maintenance interval
    ///
    /// Returns the number of maintenance triggers.
    fn apply_maintenance<S: EventSink>(
        &self,
        t: TimeStep,
        tables: &RunTables,
        state: &mut RunState,
        buffers: &mut StepBuffers,
        sink: &mut S,
    ) -> usize {
        buffers.maintenance.fill(0.0);
        if !self.config.settings().maintenance_enabled {
            return 0;
        }

        let mut triggered = 0;
        for ((trial, ru), age) in state.age.indexed_iter() {
            if tables.maintenance_interval[ru] == Some(*age) {
                sink.log(t, trial, Event::MaintenanceDue { ru, age: *age });
                let mut row = buffers.maintenance.row_mut(trial);
                if let (Some(acc), Some(rep)) = (row.as_slice_mut(), tables.maintenance_rows.row(ru).to_slice()) {
                    accumulate_clipped(acc, rep);
                }
                triggered += 1;
            }
        }

        // Maintenance takes effect before fault evaluation
        Zip::from(&mut state.age)
            .and(&buffers.maintenance)
            .for_each(|age, &m| {
                if m >= RENEWAL_THRESHOLD {
                    *age = 0;
                }
            });
        triggered
    }

    /// Detect threshold crossings, attribute causes, resolve replacements
    ///
    /// Returns the number of faults.
    fn detect_faults<S: EventSink>(
        &self,
        t: TimeStep,
        tables: &RunTables,
        state: &RunState,
        buffers: &mut StepBuffers,
        sink: &mut S,
    ) -> usize {
        buffers.faults.fill(0.0);
        buffers.causes.fill(FaultCause::None);
        buffers.scheduled.fill(false);

        for ((trial, ru), level) in buffers.hazard.indexed_iter_mut() {
            let age = state.age[[trial, ru]];
            let cur = self.hazard.combined(age, ru);
            *level = cur;

            if buffers.maintenance[[trial, ru]] >= RENEWAL_THRESHOLD {
                continue;
            }

            let prev = state.prev_hazard[[trial, ru]];
            let th = state.thresholds[[trial, ru]];
            // A fresh entry's window is closed on the left
            let above_prev = th.fault_time > prev || (state.fresh[[trial, ru]] && th.fault_time >= prev);
            if cur > prev && above_prev && th.fault_time <= cur {
                if let Some(mode) = self.hazard.attribute(age, ru, th.fault_type) {
                    buffers.causes[[trial, ru]] = mode.into();
                }
            }
        }

        for fault in self.scheduled.iter().filter(|f| f.step == t) {
            if buffers.maintenance[[fault.trial, fault.ru]] >= RENEWAL_THRESHOLD {
                continue;
            }
            buffers.causes[[fault.trial, fault.ru]] = fault.mode.into();
            buffers.scheduled[[fault.trial, fault.ru]] = true;
        }

        let mut faulted = 0;
        for ((trial, ru), cause) in buffers.causes.indexed_iter() {
            let Some(mode) = cause.mode() else {
                continue;
            };
            sink.log(
                t,
                trial,
                Event::Fault {
                    ru,
                    cause: *cause,
                    age: state.age[[trial, ru]],
                    scheduled: buffers.scheduled[[trial, ru]],
                },
            );
            let mut row = buffers.faults.row_mut(trial);
            if let (Some(acc), Some(rep)) = (row.as_slice_mut(), tables.fault_rows[mode.index()].row(ru).to_slice()) {
                accumulate_clipped(acc, rep);
            }
            faulted += 1;
        }
        faulted
    }

    /// Advance the cumulative impact and cost totals from step t-1 to t
    fn accumulate(&self, t: TimeStep, tables: &RunTables, buffers: &mut StepBuffers, history: &mut StaircaseHistory) {
        Zip::from(&mut buffers.renewal)
            .and(&buffers.faults)
            .and(&buffers.maintenance)
            .for_each(|r, &f, &m| *r = (f + m).min(1.0));

        general_mat_mul(1.0, &buffers.renewal, &tables.manufacturing, 0.0, &mut buffers.manufacturing_added);
        general_mat_mul(1.0, &buffers.maintenance, &tables.manufacturing, 0.0, &mut buffers.maintenance_added);
        general_mat_vec_mul(1.0, &buffers.renewal, &tables.renewal_cost, 0.0, &mut buffers.cost_added);
        general_mat_vec_mul(1.0, &buffers.maintenance, &tables.renewal_cost, 0.0, &mut buffers.maintenance_cost_added);

        advance_running_total(&mut history.impact_manufacturing, t, buffers.manufacturing_added.view());
        advance_running_total(&mut history.impact_maintenance, t, buffers.maintenance_added.view());
        advance_running_total(&mut history.impact_use, t, tables.use_step.view());
        Zip::from(history.impact_total.index_axis_mut(Axis(0), t))
            .and(history.impact_manufacturing.index_axis(Axis(0), t))
            .and(history.impact_use.index_axis(Axis(0), t))
            .for_each(|total, &m, &u| *total = m + u);

        advance_running_total(&mut history.cost_manufacturing, t, buffers.cost_added.view());
        advance_running_total(&mut history.cost_maintenance, t, buffers.maintenance_cost_added.view());
        advance_running_total(&mut history.cost_use, t, aview0(&tables.use_cost_step));
        Zip::from(history.cost_total.row_mut(t))
            .and(history.cost_manufacturing.row(t))
            .and(history.cost_use.row(t))
            .for_each(|total, &m, &u| *total = m + u);

        history.renewal.index_axis_mut(Axis(0), t).assign(&buffers.renewal);
    }

    /// Reset renewed entries, redraw their thresholds, record the step
    fn renew<S: EventSink>(
        &mut self,
        t: TimeStep,
        state: &mut RunState,
        buffers: &mut StepBuffers,
        history: &mut StaircaseHistory,
        sink: &mut S,
    ) {
        let trials = self.config.num_trials();
        let units = self.config.num_units();
        let count_maintenance = self.config.settings().maintenance_counts_as_fault;

        for trial in 0..trials {
            for ru in 0..units {
                let by_fault = buffers.faults[[trial, ru]];
                let by_maintenance = buffers.maintenance[[trial, ru]];
                let indicator = (by_fault + by_maintenance).min(1.0);

                if indicator < RENEWAL_THRESHOLD {
                    state.prev_hazard[[trial, ru]] = buffers.hazard[[trial, ru]];
                    state.fresh[[trial, ru]] = false;
                    continue;
                }

                let trigger = if by_fault >= RENEWAL_THRESHOLD {
                    state.fault_count[[trial, ru]] += 1;
                    RenewalTrigger::Fault
                } else {
                    if count_maintenance {
                        state.fault_count[[trial, ru]] += 1;
                    }
                    RenewalTrigger::Maintenance
                };

                state.age[[trial, ru]] = 0;
                state.thresholds[[trial, ru]] = ThresholdPair::draw(&mut self.rng);
                state.prev_hazard[[trial, ru]] = 0.0;
                state.fresh[[trial, ru]] = true;
                sink.log(t, trial, Event::Renewed { ru, trigger, indicator });
            }
        }

        history.age.index_axis_mut(Axis(0), t).assign(&state.age);
        history.fault_cause.index_axis_mut(Axis(0), t).assign(&buffers.causes);
        history.fault_count.index_axis_mut(Axis(0), t).assign(&state.fault_count);
        history.hazard.index_axis_mut(Axis(0), t).assign(&buffers.hazard);
    }
}

/// Set step `t` of a running total to step `t - 1` plus `added`
///
/// `added` is broadcast over the trailing axes of one step.
fn advance_running_total<D, E>(series: &mut Array<f64, D>, t: TimeStep, added: ArrayView<f64, E>)
where
    D: RemoveAxis,
    E: Dimension,
{
    let (done, rest) = series.view_mut().split_at(Axis(0), t);
    Zip::from(rest.index_axis_move(Axis(0), 0))
        .and(done.index_axis(Axis(0), t - 1))
        .and_broadcast(added)
        .for_each(|next, &prev, &add| *next = prev + add);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe_config::tests::{inventory, row};
    use crate::pe_config::{FaultModeSwitches, ReliabilityRow, StaircaseSettings, WeibullParams};
    use crate::pe_history::ImpactSeries;
    use crate::pe_replacement::ReplacementPolicy;
    use rand::rngs::mock::StepRng;

    fn settings(years: usize, steps_per_year: usize, trials: usize, faults: FaultModeSwitches) -> StaircaseSettings {
        StaircaseSettings {
            service_life_years: years,
            steps_per_year,
            monte_carlo_trials: trials,
            faults,
            seed: Some([42u8; 32]),
            ..Default::default()
        }
    }

    fn early_only() -> FaultModeSwitches {
        FaultModeSwitches {
            early: true,
            random: false,
            wearout: false,
        }
    }

    fn wearout_only() -> FaultModeSwitches {
        FaultModeSwitches {
            early: false,
            random: false,
            wearout: true,
        }
    }

    /// Three RUs, every mode active, maintenance on RU 2, cascading row on RU 0
    fn busy_config(trials: usize, faults: FaultModeSwitches) -> StaircaseConfig {
        let mut settings = settings(5, 12, trials, faults);
        settings.maintenance_enabled = true;

        let mut fragile = row(1.0, 1.0);
        fragile.faults.early = WeibullParams::new(0.5, 8.0);
        fragile.faults.random = WeibullParams::new(1.0, 3.0);
        fragile.faults.wearout = WeibullParams::new(3.0, 2.5);
        let mut maintained = row(1.2, 4.0);
        maintained.maintenance_interval = Some(18);

        let mut policy = ReplacementPolicy::identity(3);
        policy.set_fault_row(0, vec![1.0, 0.5, 0.0]);

        StaircaseConfig::new(settings, inventory(3), vec![fragile, row(2.0, 3.0), maintained], policy).unwrap()
    }

    #[test]
    fn test_deterministic_early_failure_at_age_one() {
        // RU 0 fails almost surely within the first step, RU 1 practically never
        let mut immediate = row(1.0, 1.0);
        immediate.faults.early = WeibullParams::new(1.0, 1e-6);
        let mut durable = row(1.0, 1.0);
        durable.faults.early = WeibullParams::new(1.0, 1e9);

        let config = StaircaseConfig::new(
            settings(10, 1, 1, early_only()),
            inventory(2),
            vec![immediate, durable],
            ReplacementPolicy::identity(2),
        )
        .unwrap();
        let ru0_impact = config.inventory().units[0].manufacturing_impact.clone();

        let mut runner = StaircaseRunner::new(config).unwrap();
        runner
            .set_initial_thresholds(Array2::from_shape_vec(
                (1, 2),
                vec![ThresholdPair::new(0.0, 0.0), ThresholdPair::new(0.9, 0.5)],
            )
            .unwrap())
            .unwrap();
        let history = runner.run();

        assert_eq!(history.fault_cause()[[1, 0, 0]], FaultCause::Early);
        assert_eq!(history.age()[[1, 0, 0]], 0);
        let baseline = history.baseline_manufacturing().clone();
        for m in 0..history.num_methods() {
            let added = history.impact_manufacturing()[[1, 0, m]] - baseline[m];
            assert!((added - ru0_impact[m]).abs() < 1e-12);
        }

        // RU 1 never crosses 0.9
        for t in 0..history.time_steps() {
            assert_eq!(history.fault_cause()[[t, 0, 1]], FaultCause::None);
        }
    }

    #[test]
    fn test_zero_thresholds_from_rng() {
        // StepRng(0, 0) draws 0.0 for every threshold
        let mut immediate = row(1.0, 1.0);
        immediate.faults.early = WeibullParams::new(1.0, 1e-6);
        let config = StaircaseConfig::new(
            settings(2, 4, 2, early_only()),
            inventory(1),
            vec![immediate],
            ReplacementPolicy::identity(1),
        )
        .unwrap();

        let history = StaircaseRunner::with_rng(config, StepRng::new(0, 0)).unwrap().run();
        // Every step the unit is one step old again and fails again
        for t in 1..history.time_steps() {
            for trial in 0..2 {
                assert_eq!(history.fault_cause()[[t, trial, 0]], FaultCause::Early);
                assert_eq!(history.fault_count()[[t, trial, 0]], t as u32);
            }
        }
        assert_eq!(history.seed_used(), None);
    }

    #[test]
    fn test_no_faults_when_all_modes_disabled() {
        let config = StaircaseConfig::new(
            settings(4, 12, 20, FaultModeSwitches::none()),
            inventory(2),
            vec![row(1.0, 0.01), row(3.0, 0.01)],
            ReplacementPolicy::identity(2),
        )
        .unwrap();
        let history = StaircaseRunner::new(config).unwrap().run();

        assert_eq!(history.total_faults(), 0);
        assert!(history.fault_count().iter().all(|c| *c == 0));
        for t in 0..history.time_steps() {
            for trial in 0..history.num_trials() {
                for m in 0..history.num_methods() {
                    assert_eq!(
                        history.impact_manufacturing()[[t, trial, m]],
                        history.baseline_manufacturing()[m]
                    );
                }
            }
        }
    }

    #[test]
    fn test_maintenance_resets_on_interval() {
        let mut s = settings(10, 1, 3, FaultModeSwitches::none());
        s.maintenance_enabled = true;
        let mut maintained = row(1.0, 1.0);
        maintained.maintenance_interval = Some(3);

        let config = StaircaseConfig::new(s, inventory(1), vec![maintained], ReplacementPolicy::identity(1)).unwrap();
        let history = StaircaseRunner::new(config).unwrap().run();

        let expected_age = [0, 1, 2, 0, 1, 2, 0, 1, 2, 0];
        for trial in 0..3 {
            for t in 0..10 {
                assert_eq!(history.age()[[t, trial, 0]], expected_age[t], "trial {} step {}", trial, t);
            }
            for t in 1..10 {
                let step_added = history.impact_maintenance()[[t, trial, 0]] - history.impact_maintenance()[[t - 1, trial, 0]];
                if t % 3 == 0 {
                    assert!(step_added > 0.0);
                } else {
                    assert_eq!(step_added, 0.0);
                }
            }
            // Not counted as faults by default
            assert_eq!(history.fault_count()[[9, trial, 0]], 0);
        }
        assert_eq!(history.total_faults(), 0);
    }

    #[test]
    fn test_maintenance_can_count_as_fault() {
        let mut s = settings(10, 1, 1, FaultModeSwitches::none());
        s.maintenance_enabled = true;
        s.maintenance_counts_as_fault = true;
        let mut maintained = row(1.0, 1.0);
        maintained.maintenance_interval = Some(3);

        let config = StaircaseConfig::new(s, inventory(1), vec![maintained], ReplacementPolicy::identity(1)).unwrap();
        let history = StaircaseRunner::new(config).unwrap().run();
        assert_eq!(history.fault_count()[[9, 0, 0]], 3);
        assert_eq!(history.total_faults(), 0);
    }

    #[test]
    fn test_maintenance_preempts_fault_in_same_step() {
        // Unit would fail at age 1; maintenance renews it at age 1 first
        let mut s = settings(1, 12, 1, early_only());
        s.maintenance_enabled = true;
        let mut unit = row(1.0, 1.0);
        unit.faults.early = WeibullParams::new(1.0, 1e-6);
        unit.maintenance_interval = Some(1);

        let config = StaircaseConfig::new(s, inventory(1), vec![unit], ReplacementPolicy::identity(1)).unwrap();
        let mut runner = StaircaseRunner::new(config).unwrap();
        runner
            .set_initial_thresholds(Array2::from_elem((1, 1), ThresholdPair::new(0.0, 0.0)))
            .unwrap();
        let history = runner.run();

        // Renewed by maintenance every step, never reaches a fault
        assert_eq!(history.total_faults(), 0);
        let last = history.last_step();
        let maintenance = history.impact_maintenance()[[last, 0, 0]];
        let manufacturing = history.impact_manufacturing()[[last, 0, 0]];
        assert!((manufacturing - history.baseline_manufacturing()[0] - maintenance).abs() < 1e-12);
    }

    #[test]
    fn test_scheduled_fault_uses_policy_row() {
        let mut policy = ReplacementPolicy::identity(3);
        policy.set_fault_row(1, vec![1.0, 1.0, 1.0]);
        // Scale large enough that no stochastic wearout fault ever happens
        let config = StaircaseConfig::new(
            settings(2, 12, 2, wearout_only()),
            inventory(3),
            vec![row(1.0, 1e9), row(1.0, 1e9), row(1.0, 1e9)],
            policy,
        )
        .unwrap();

        let mut runner = StaircaseRunner::new(config).unwrap();
        runner
            .schedule_fault(ScheduledFault {
                step: 5,
                trial: 1,
                ru: 1,
                mode: FaultMode::Wearout,
            })
            .unwrap();
        let history = runner.run();

        assert_eq!(history.fault_cause()[[5, 1, 1]], FaultCause::Wearout);
        assert_eq!(history.total_faults(), 1);
        for ru in 0..3 {
            assert_eq!(history.age()[[5, 1, ru]], 0);
            assert_eq!(history.age()[[5, 0, ru]], 5);
            assert_eq!(history.fault_count()[[5, 1, ru]], 1);
        }
        let replaced: f64 = (0..3).map(|ru| 1.0 + ru as f64).sum();
        let added = history.impact_manufacturing()[[5, 1, 0]] - history.baseline_manufacturing()[0];
        assert!((added - replaced).abs() < 1e-12);
        assert_eq!(history.impact_manufacturing()[[5, 0, 0]], history.baseline_manufacturing()[0]);
    }

    #[test]
    fn test_overlapping_faults_clip_and_partial_weight_keeps_unit() {
        let mut policy = ReplacementPolicy::identity(3);
        policy.set_fault_row(0, vec![1.0, 1.0, 0.3]);
        policy.set_fault_row(1, vec![1.0, 1.0, 0.0]);
        let config = StaircaseConfig::new(
            settings(1, 12, 1, wearout_only()),
            inventory(3),
            vec![row(1.0, 1e9), row(1.0, 1e9), row(1.0, 1e9)],
            policy,
        )
        .unwrap();

        let mut runner = StaircaseRunner::new(config).unwrap();
        for ru in [0, 1] {
            runner
                .schedule_fault(ScheduledFault {
                    step: 4,
                    trial: 0,
                    ru,
                    mode: FaultMode::Wearout,
                })
                .unwrap();
        }
        let history = runner.run();

        // Both rows sum to [2, 2, 0.3] and clip to [1, 1, 0.3]
        assert_eq!(history.renewal()[[4, 0, 0]], 1.0);
        assert_eq!(history.renewal()[[4, 0, 1]], 1.0);
        assert!((history.renewal()[[4, 0, 2]] - 0.3).abs() < 1e-12);

        for m in 0..history.num_methods() {
            let scale = if m == 0 { 1.0 } else { 10.0 };
            let expected = (1.0 + 2.0 + 0.3 * 3.0) * scale;
            let added = history.impact_manufacturing()[[4, 0, m]] - history.impact_manufacturing()[[3, 0, m]];
            assert!((added - expected).abs() < 1e-9, "method {}: {}", m, added);
        }

        // RU 2 only takes a partial refurbishment: it keeps aging
        assert_eq!(history.age()[[4, 0, 0]], 0);
        assert_eq!(history.age()[[4, 0, 1]], 0);
        assert_eq!(history.age()[[4, 0, 2]], 4);
        assert_eq!(history.age()[[5, 0, 2]], 5);
        assert_eq!(history.fault_count()[[4, 0, 0]], 1);
        assert_eq!(history.fault_count()[[4, 0, 1]], 1);
        assert_eq!(history.fault_count()[[4, 0, 2]], 0);
        assert_eq!(history.fault_cause()[[4, 0, 2]], FaultCause::None);
        assert_eq!(history.total_faults(), 2);
    }

    #[test]
    fn test_scheduled_fault_on_disabled_mode_is_rejected() {
        let config = StaircaseConfig::new(
            settings(1, 12, 1, FaultModeSwitches::none()),
            inventory(1),
            vec![row(1.0, 5.0)],
            ReplacementPolicy::identity(1),
        )
        .unwrap();
        let mut runner = StaircaseRunner::new(config).unwrap();
        let err = runner
            .schedule_fault(ScheduledFault {
                step: 5,
                trial: 0,
                ru: 0,
                mode: FaultMode::Random,
            })
            .unwrap_err();
        assert!(matches!(err, StaircaseError::InvalidSetting { .. }));

        let history = runner.run();
        assert_eq!(history.total_faults(), 0);
        assert!(history.fault_cause().iter().all(|c| *c == FaultCause::None));
    }

    #[test]
    fn test_schedule_fault_validation() {
        let config = StaircaseConfig::new(
            settings(1, 12, 1, FaultModeSwitches::all()),
            inventory(1),
            vec![row(1.0, 5.0)],
            ReplacementPolicy::identity(1),
        )
        .unwrap();
        let mut runner = StaircaseRunner::new(config).unwrap();
        let fault = ScheduledFault {
            step: 0,
            trial: 0,
            ru: 0,
            mode: FaultMode::Early,
        };
        assert!(runner.schedule_fault(fault).is_err());
        assert!(runner.schedule_fault(ScheduledFault { step: 12, ..fault }).is_err());
        assert!(runner.schedule_fault(ScheduledFault { step: 3, trial: 1, ..fault }).is_err());
        assert!(runner.schedule_fault(ScheduledFault { step: 3, ru: 1, ..fault }).is_err());
        assert!(runner.schedule_fault(ScheduledFault { step: 3, ..fault }).is_ok());
    }

    #[test]
    fn test_initial_threshold_validation() {
        let config = StaircaseConfig::new(
            settings(1, 12, 2, FaultModeSwitches::all()),
            inventory(1),
            vec![row(1.0, 5.0)],
            ReplacementPolicy::identity(1),
        )
        .unwrap();
        let mut runner = StaircaseRunner::new(config).unwrap();
        assert!(runner
            .set_initial_thresholds(Array2::from_elem((1, 1), ThresholdPair::new(0.5, 0.5)))
            .is_err());
        assert!(runner
            .set_initial_thresholds(Array2::from_elem((2, 1), ThresholdPair::new(1.5, 0.5)))
            .is_err());
        assert!(runner
            .set_initial_thresholds(Array2::from_elem((2, 1), ThresholdPair::new(0.5, 0.5)))
            .is_ok());
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let first = StaircaseRunner::new(busy_config(40, FaultModeSwitches::all())).unwrap().run();
        let second = StaircaseRunner::new(busy_config(40, FaultModeSwitches::all())).unwrap().run();
        assert_eq!(first, second);
        assert!(first.total_faults() > 0);
    }

    #[test]
    fn test_age_invariant() {
        let history = StaircaseRunner::new(busy_config(60, FaultModeSwitches::all())).unwrap().run();
        let age = history.age();
        for t in 1..history.time_steps() {
            for trial in 0..history.num_trials() {
                for ru in 0..history.num_units() {
                    let a = age[[t, trial, ru]];
                    assert!(a == 0 || a == age[[t - 1, trial, ru]] + 1);
                    assert!(a < history.time_steps());
                }
            }
        }
    }

    #[test]
    fn test_renewal_consistency() {
        let history = StaircaseRunner::new(busy_config(60, FaultModeSwitches::all())).unwrap().run();
        for ((t, trial, ru), cause) in history.fault_cause().indexed_iter() {
            if cause.is_fault() {
                assert_eq!(history.age()[[t, trial, ru]], 0);
                assert_eq!(history.renewal()[[t, trial, ru]], 1.0);
            }
        }
    }

    #[test]
    fn test_monotone_totals_and_decomposition() {
        let history = StaircaseRunner::new(busy_config(60, FaultModeSwitches::all())).unwrap().run();
        for t in 0..history.time_steps() {
            for trial in 0..history.num_trials() {
                for m in 0..history.num_methods() {
                    let total = history.impact_at(ImpactSeries::Total, t, trial, m);
                    let manufacturing = history.impact_at(ImpactSeries::Manufacturing, t, trial, m);
                    let use_phase = history.impact_at(ImpactSeries::Use, t, trial, m);
                    assert!((total - manufacturing - use_phase).abs() <= 1e-9 * total.abs().max(1.0));
                    assert!(history.impact_at(ImpactSeries::Replacement, t, trial, m) >= -1e-9);
                    if t > 0 {
                        assert!(use_phase >= history.impact_at(ImpactSeries::Use, t - 1, trial, m));
                        assert!(manufacturing >= history.impact_at(ImpactSeries::Manufacturing, t - 1, trial, m));
                    }
                }
                let cost_sum = history.cost_manufacturing()[[t, trial]] + history.cost_use()[[t, trial]];
                assert!((history.cost_total()[[t, trial]] - cost_sum).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_disabled_mode_never_attributed() {
        let faults = FaultModeSwitches {
            early: true,
            random: false,
            wearout: true,
        };
        let history = StaircaseRunner::new(busy_config(60, faults)).unwrap().run();
        assert!(history.total_faults() > 0);
        assert!(history.fault_cause().iter().all(|c| *c != FaultCause::Random));
    }

    #[test]
    fn test_event_sink_sees_every_fault() {
        struct Counter {
            faults: usize,
            renewals: usize,
        }

        impl EventSink for Counter {
            fn log(&mut self, _step: TimeStep, _trial: TrialIndex, event: Event) {
                match event {
                    Event::Fault { .. } => self.faults += 1,
                    Event::Renewed { .. } => self.renewals += 1,
                    Event::MaintenanceDue { .. } => {}
                }
            }
        }

        let mut sink = Counter { faults: 0, renewals: 0 };
        let history = StaircaseRunner::new(busy_config(10, FaultModeSwitches::all()))
            .unwrap()
            .run_with_sink(&mut sink);
        assert_eq!(sink.faults, history.total_faults());
        assert!(sink.renewals >= sink.faults);
    }

    #[test]
    fn test_runner_exposes_config_and_hazard() {
        let config = busy_config(2, FaultModeSwitches::all());
        let runner = StaircaseRunner::new(config).unwrap();
        assert_eq!(runner.hazard().time_steps(), 60);
        let _: &ReliabilityRow = &runner.config().reliability()[0];
    }
}
