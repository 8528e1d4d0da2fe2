// Simulation history buffers
//
// Every array is allocated for the full horizon when a run starts, filled
// step by step by the simulator, and handed out read-only afterwards.
// Per-unit arrays are shaped [T, N_MC, N_RU]; impact arrays are shaped
// [T, N_MC, N_METHOD]; cost arrays are shaped [T, N_MC].

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};

use crate::pe_interface::{FaultCause, ImpactMethod, TimeStep, TrialIndex};

/// Which cumulative impact series to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactSeries {
    /// Manufacturing plus use
    Total,
    /// Initial manufacturing plus every renewal, maintenance included
    Manufacturing,
    Use,
    Maintenance,
    /// Manufacturing minus initial manufacturing minus maintenance
    Replacement,
}

impl ImpactSeries {
    pub const ALL: [ImpactSeries; 5] = [
        ImpactSeries::Total,
        ImpactSeries::Manufacturing,
        ImpactSeries::Use,
        ImpactSeries::Maintenance,
        ImpactSeries::Replacement,
    ];
}

/// Complete output of one staircase run
#[derive(Debug, Clone, PartialEq)]
pub struct StaircaseHistory {
    pub(crate) seed_used: Option<[u8; 32]>,
    pub(crate) methods: Vec<ImpactMethod>,
    pub(crate) baseline_manufacturing: Array1<f64>,
    pub(crate) baseline_cost: f64,
    pub(crate) system_cdf: Array1<f64>,

    pub(crate) age: Array3<TimeStep>,
    pub(crate) fault_cause: Array3<FaultCause>,
    pub(crate) fault_count: Array3<u32>,
    pub(crate) hazard: Array3<f64>,
    pub(crate) renewal: Array3<f64>,

    pub(crate) impact_total: Array3<f64>,
    pub(crate) impact_manufacturing: Array3<f64>,
    pub(crate) impact_use: Array3<f64>,
    pub(crate) impact_maintenance: Array3<f64>,

    pub(crate) cost_total: Array2<f64>,
    pub(crate) cost_manufacturing: Array2<f64>,
    pub(crate) cost_use: Array2<f64>,
    pub(crate) cost_maintenance: Array2<f64>,
}

impl StaircaseHistory {
    /// Allocate all buffers and write the t = 0 baseline
    pub(crate) fn allocate(
        steps: usize,
        trials: usize,
        units: usize,
        methods: Vec<ImpactMethod>,
        baseline_manufacturing: Array1<f64>,
        baseline_cost: f64,
        system_cdf: Array1<f64>,
    ) -> Self {
        let num_methods = methods.len();
        let mut history = Self {
            seed_used: None,
            methods,
            baseline_manufacturing,
            baseline_cost,
            system_cdf,
            age: Array3::zeros((steps, trials, units)),
            fault_cause: Array3::from_elem((steps, trials, units), FaultCause::None),
            fault_count: Array3::zeros((steps, trials, units)),
            hazard: Array3::zeros((steps, trials, units)),
            renewal: Array3::zeros((steps, trials, units)),
            impact_total: Array3::zeros((steps, trials, num_methods)),
            impact_manufacturing: Array3::zeros((steps, trials, num_methods)),
            impact_use: Array3::zeros((steps, trials, num_methods)),
            impact_maintenance: Array3::zeros((steps, trials, num_methods)),
            cost_total: Array2::zeros((steps, trials)),
            cost_manufacturing: Array2::zeros((steps, trials)),
            cost_use: Array2::zeros((steps, trials)),
            cost_maintenance: Array2::zeros((steps, trials)),
        };

        let mut manufacturing = history.impact_manufacturing.index_axis_mut(Axis(0), 0);
        manufacturing.assign(&history.baseline_manufacturing);
        let mut total = history.impact_total.index_axis_mut(Axis(0), 0);
        total.assign(&history.baseline_manufacturing);
        history.cost_manufacturing.row_mut(0).fill(baseline_cost);
        history.cost_total.row_mut(0).fill(baseline_cost);

        history
    }

    /// Seed of the run (None when a caller supplied its own RNG)
    pub fn seed_used(&self) -> Option<[u8; 32]> {
        self.seed_used
    }

    pub fn methods(&self) -> &[ImpactMethod] {
        &self.methods
    }

    pub fn time_steps(&self) -> usize {
        self.age.dim().0
    }

    pub fn num_trials(&self) -> usize {
        self.age.dim().1
    }

    pub fn num_units(&self) -> usize {
        self.age.dim().2
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn last_step(&self) -> TimeStep {
        self.time_steps() - 1
    }

    /// Manufacturing impact of the product as delivered, per method
    pub fn baseline_manufacturing(&self) -> &Array1<f64> {
        &self.baseline_manufacturing
    }

    pub fn baseline_cost(&self) -> f64 {
        self.baseline_cost
    }

    /// System-level failure probability by age for a never-repaired product
    pub fn system_cdf(&self) -> &Array1<f64> {
        &self.system_cdf
    }

    /// Unit ages `[T, N_MC, N_RU]`
    pub fn age(&self) -> &Array3<TimeStep> {
        &self.age
    }

    /// Fault cause labels `[T, N_MC, N_RU]`
    pub fn fault_cause(&self) -> &Array3<FaultCause> {
        &self.fault_cause
    }

    /// Cumulative fault counter `[T, N_MC, N_RU]`
    pub fn fault_count(&self) -> &Array3<u32> {
        &self.fault_count
    }

    /// Combined hazard level of each entry at each step `[T, N_MC, N_RU]`
    pub fn hazard(&self) -> &Array3<f64> {
        &self.hazard
    }

    /// Replacement indicator applied at each step, faults and maintenance
    /// combined and clipped to 1 `[T, N_MC, N_RU]`
    pub fn renewal(&self) -> &Array3<f64> {
        &self.renewal
    }

    pub fn impact_total(&self) -> &Array3<f64> {
        &self.impact_total
    }

    pub fn impact_manufacturing(&self) -> &Array3<f64> {
        &self.impact_manufacturing
    }

    pub fn impact_use(&self) -> &Array3<f64> {
        &self.impact_use
    }

    pub fn impact_maintenance(&self) -> &Array3<f64> {
        &self.impact_maintenance
    }

    pub fn cost_total(&self) -> &Array2<f64> {
        &self.cost_total
    }

    pub fn cost_manufacturing(&self) -> &Array2<f64> {
        &self.cost_manufacturing
    }

    pub fn cost_use(&self) -> &Array2<f64> {
        &self.cost_use
    }

    pub fn cost_maintenance(&self) -> &Array2<f64> {
        &self.cost_maintenance
    }

    /// One cumulative impact value
    pub fn impact_at(&self, series: ImpactSeries, step: TimeStep, trial: TrialIndex, method: usize) -> f64 {
        let idx = [step, trial, method];
        match series {
            ImpactSeries::Total => self.impact_total[idx],
            ImpactSeries::Manufacturing => self.impact_manufacturing[idx],
            ImpactSeries::Use => self.impact_use[idx],
            ImpactSeries::Maintenance => self.impact_maintenance[idx],
            ImpactSeries::Replacement => {
                self.impact_manufacturing[idx]
                    - self.baseline_manufacturing[method]
                    - self.impact_maintenance[idx]
            }
        }
    }

    /// Impact of one series at one step, `[N_MC, N_METHOD]`
    pub fn impact_step(&self, series: ImpactSeries, step: TimeStep) -> Array2<f64> {
        let view = |array: &Array3<f64>| -> Array2<f64> { array.index_axis(Axis(0), step).to_owned() };
        match series {
            ImpactSeries::Total => view(&self.impact_total),
            ImpactSeries::Manufacturing => view(&self.impact_manufacturing),
            ImpactSeries::Use => view(&self.impact_use),
            ImpactSeries::Maintenance => view(&self.impact_maintenance),
            ImpactSeries::Replacement => {
                view(&self.impact_manufacturing) - &self.baseline_manufacturing - view(&self.impact_maintenance)
            }
        }
    }

    /// Fault causes of every trial and unit at one step
    pub fn causes_at(&self, step: TimeStep) -> ArrayView2<'_, FaultCause> {
        self.fault_cause.index_axis(Axis(0), step)
    }

    /// Total number of recorded faults over the whole history
    pub fn total_faults(&self) -> usize {
        self.fault_cause.iter().filter(|c| c.is_fault()).count()
    }
}
