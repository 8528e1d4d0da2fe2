//! Reductions over a finished staircase history
//!
//! `ResultAggregator` borrows a `StaircaseHistory` and computes:
//! - percentile bands over trials for every step and impact method
//! - end-of-life category breakdowns (Manufacture, Use, Replacement,
//!   Maintenance), per trial or averaged over trials
//! - uncertainty rows (mean, standard deviation, two-sigma bounds)
//! - fault repartition per RU and cause, mean fault counts, cost breakdown
//!
//! Every method is a pure read of the history and can be called any number
//! of times.

use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use statrs::statistics::Statistics;

use crate::pe_error::{Result, StaircaseError};
use crate::pe_history::{ImpactSeries, StaircaseHistory};
use crate::pe_interface::{FaultMode, ImpactCategory, ImpactMethod, TimeStep, TrialIndex};

/// Default percentile levels: deciles 10..90
pub const DECILES: [f64; 9] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0];

// ============================================================================
// Result Types
// ============================================================================

/// Distribution of one impact series over trials, for every step and method
#[derive(Debug, Clone, PartialEq)]
pub struct TrialBands {
    pub series: ImpactSeries,
    /// Percentile levels in [0, 100], in the order of `percentiles`
    pub levels: Vec<f64>,
    /// `[levels, T, N_METHOD]`
    pub percentiles: Array3<f64>,
    /// `[T, N_METHOD]`
    pub median: Array2<f64>,
    pub mean: Array2<f64>,
    pub min: Array2<f64>,
    pub max: Array2<f64>,
}

impl TrialBands {
    /// Curve of one percentile level for one method
    pub fn curve(&self, level: usize, method: usize) -> ArrayView1<'_, f64> {
        self.percentiles.index_axis(Axis(0), level).index_axis_move(Axis(1), method)
    }
}

/// End-of-life impact of one method split by category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub method: ImpactMethod,
    /// Indexed in `ImpactCategory::ALL` order
    pub values: [f64; 4],
}

impl CategoryBreakdown {
    pub fn get(&self, category: ImpactCategory) -> f64 {
        self.values[category_index(category)]
    }

    /// Manufacture plus Use; Replacement and Maintenance are already inside
    /// Manufacture's running total
    pub fn total(&self) -> f64 {
        self.get(ImpactCategory::Manufacturing) + self.get(ImpactCategory::Use)
    }
}

/// Monte Carlo uncertainty of the end-of-life total for one method
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyRow {
    pub method: String,
    pub unit: String,
    pub mean: f64,
    pub std_dev: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Mean end-of-life cost per category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub manufacturing: f64,
    pub use_phase: f64,
    pub replacement: f64,
    pub maintenance: f64,
    pub total: f64,
}

// ============================================================================
// Aggregator
// ============================================================================

/// Read-only view computing summaries of a history
pub struct ResultAggregator<'a> {
    history: &'a StaircaseHistory,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(history: &'a StaircaseHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &'a StaircaseHistory {
        self.history
    }

    /// Decile bands of an impact series
    pub fn bands(&self, series: ImpactSeries) -> TrialBands {
        self.compute_bands(series, &DECILES)
    }

    /// Percentile bands of an impact series at arbitrary levels
    pub fn bands_with_levels(&self, series: ImpactSeries, levels: &[f64]) -> Result<TrialBands> {
        if let Some(bad) = levels.iter().find(|l| !(0.0..=100.0).contains(*l)) {
            return Err(StaircaseError::InvalidSetting {
                field: "percentile level".to_string(),
                reason: format!("{} is outside [0, 100]", bad),
            });
        }
        Ok(self.compute_bands(series, levels))
    }

    fn compute_bands(&self, series: ImpactSeries, levels: &[f64]) -> TrialBands {
        let steps = self.history.time_steps();
        let methods = self.history.num_methods();
        let mut percentiles = Array3::<f64>::zeros((levels.len(), steps, methods));
        let mut median = Array2::<f64>::zeros((steps, methods));
        let mut mean = Array2::<f64>::zeros((steps, methods));
        let mut min = Array2::<f64>::zeros((steps, methods));
        let mut max = Array2::<f64>::zeros((steps, methods));

        for t in 0..steps {
            let step = self.history.impact_step(series, t);
            for (m, column) in step.axis_iter(Axis(1)).enumerate() {
                let mut sorted = column.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));

                for (p, level) in levels.iter().enumerate() {
                    percentiles[[p, t, m]] = interpolate(&sorted, *level);
                }
                median[[t, m]] = interpolate(&sorted, 50.0);
                mean[[t, m]] = sorted.iter().sum::<f64>() / sorted.len() as f64;
                min[[t, m]] = sorted[0];
                max[[t, m]] = sorted[sorted.len() - 1];
            }
        }

        TrialBands {
            series,
            levels: levels.to_vec(),
            percentiles,
            median,
            mean,
            min,
            max,
        }
    }

    /// Category breakdown of one trial at the last step
    pub fn trial_breakdown(&self, trial: TrialIndex) -> Result<Vec<CategoryBreakdown>> {
        if trial >= self.history.num_trials() {
            return Err(StaircaseError::InvalidSetting {
                field: "trial".to_string(),
                reason: format!("trial {} is outside 0..{}", trial, self.history.num_trials()),
            });
        }
        let last = self.history.last_step();
        Ok(self.breakdown_with(|series, m| self.history.impact_at(series, last, trial, m)))
    }

    /// Category breakdown at the last step, averaged over trials
    pub fn end_of_life_breakdown(&self) -> Vec<CategoryBreakdown> {
        let last = self.history.last_step();
        let means: Vec<Array1<f64>> = [
            ImpactSeries::Manufacturing,
            ImpactSeries::Use,
            ImpactSeries::Replacement,
            ImpactSeries::Maintenance,
        ]
        .iter()
        .map(|series| self.trial_mean(*series, last))
        .collect();

        self.breakdown_with(|series, m| {
            let idx = match series {
                ImpactSeries::Manufacturing => 0,
                ImpactSeries::Use => 1,
                ImpactSeries::Replacement => 2,
                _ => 3,
            };
            means[idx][m]
        })
    }

    /// Breakdown the report should show: the single trial when there is
    /// only one, the mean over trials otherwise
    pub fn breakdown(&self) -> Vec<CategoryBreakdown> {
        if self.history.num_trials() == 1 {
            self.trial_breakdown(0).unwrap_or_else(|_| self.end_of_life_breakdown())
        } else {
            self.end_of_life_breakdown()
        }
    }

    /// Mean, population standard deviation and two-sigma bounds of the
    /// end-of-life total, per method
    pub fn uncertainty_summary(&self) -> Vec<UncertaintyRow> {
        let totals = self.history.impact_step(ImpactSeries::Total, self.history.last_step());
        self.history
            .methods()
            .iter()
            .zip(totals.axis_iter(Axis(1)))
            .map(|(method, column)| {
                let mean = column.iter().mean();
                let std_dev = if column.len() > 1 {
                    column.iter().population_std_dev()
                } else {
                    0.0
                };
                UncertaintyRow {
                    method: method.name.clone(),
                    unit: method.unit.clone(),
                    mean,
                    std_dev,
                    upper: mean + 2.0 * std_dev,
                    lower: mean - 2.0 * std_dev,
                }
            })
            .collect()
    }

    /// Number of faults per RU and cause over all steps and trials,
    /// `[N_RU, 3]` in `FaultMode::ALL` order
    pub fn fault_repartition(&self) -> Array2<usize> {
        let mut counts = Array2::<usize>::zeros((self.history.num_units(), FaultMode::ALL.len()));
        for ((_, _, ru), cause) in self.history.fault_cause().indexed_iter() {
            if let Some(mode) = cause.mode() {
                counts[[ru, mode.index()]] += 1;
            }
        }
        counts
    }

    /// Mean end-of-life fault counter per RU
    pub fn mean_fault_count(&self) -> Array1<f64> {
        let last = self.history.fault_count().index_axis(Axis(0), self.history.last_step());
        let trials = self.history.num_trials() as f64;
        last.map_axis(Axis(0), |column| column.iter().map(|c| *c as f64).sum::<f64>() / trials)
    }

    /// Mean end-of-life cost per category
    pub fn cost_breakdown(&self) -> CostBreakdown {
        let last = self.history.last_step();
        let mean_of = |table: &Array2<f64>| -> f64 { table.row(last).iter().mean() };

        let manufacturing = mean_of(self.history.cost_manufacturing());
        let maintenance = mean_of(self.history.cost_maintenance());
        let use_phase = mean_of(self.history.cost_use());
        CostBreakdown {
            manufacturing,
            use_phase,
            replacement: manufacturing - self.history.baseline_cost() - maintenance,
            maintenance,
            total: mean_of(self.history.cost_total()),
        }
    }

    /// Mean over trials of one series at one step, per method
    pub fn trial_mean(&self, series: ImpactSeries, step: TimeStep) -> Array1<f64> {
        let values = self.history.impact_step(series, step);
        values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.history.num_methods()))
    }

    fn breakdown_with<F>(&self, value: F) -> Vec<CategoryBreakdown>
    where
        F: Fn(ImpactSeries, usize) -> f64,
    {
        self.history
            .methods()
            .iter()
            .enumerate()
            .map(|(m, method)| CategoryBreakdown {
                method: method.clone(),
                values: [
                    value(ImpactSeries::Manufacturing, m),
                    value(ImpactSeries::Use, m),
                    value(ImpactSeries::Replacement, m),
                    value(ImpactSeries::Maintenance, m),
                ],
            })
            .collect()
    }
}

fn category_index(category: ImpactCategory) -> usize {
    match category {
        ImpactCategory::Manufacturing => 0,
        ImpactCategory::Use => 1,
        ImpactCategory::Replacement => 2,
        ImpactCategory::Maintenance => 3,
    }
}

/// Percentile of sorted values, linear between order statistics
fn interpolate(sorted: &[f64], level: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = level / 100.0 * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe_interface::FaultCause;
    use ndarray::array;

    /// 3 steps, 4 trials, 2 RUs, 1 method, hand-filled
    fn history() -> StaircaseHistory {
        let mut history = StaircaseHistory::allocate(
            3,
            4,
            2,
            vec![ImpactMethod::new("GWP", "kg CO2-eq")],
            array![10.0],
            8.0,
            Array1::zeros(3),
        );
        for trial in 0..4 {
            let replaced = trial as f64;
            history.impact_manufacturing[[1, trial, 0]] = 10.0;
            history.impact_manufacturing[[2, trial, 0]] = 10.0 + replaced;
            history.impact_use[[1, trial, 0]] = 1.0;
            history.impact_use[[2, trial, 0]] = 2.0;
            history.impact_maintenance[[2, trial, 0]] = if trial == 3 { 1.0 } else { 0.0 };
            for t in 1..3 {
                history.impact_total[[t, trial, 0]] =
                    history.impact_manufacturing[[t, trial, 0]] + history.impact_use[[t, trial, 0]];
            }

            history.cost_manufacturing[[2, trial]] = 8.0 + 2.0 * replaced;
            history.cost_maintenance[[2, trial]] = 1.0;
            history.cost_use[[2, trial]] = 3.0;
            history.cost_total[[2, trial]] = 11.0 + 2.0 * replaced;
        }
        history.fault_cause[[1, 0, 0]] = FaultCause::Early;
        history.fault_cause[[2, 1, 0]] = FaultCause::Wearout;
        history.fault_cause[[2, 2, 1]] = FaultCause::Wearout;
        history.fault_count[[2, 0, 0]] = 1;
        history.fault_count[[2, 1, 0]] = 1;
        history.fault_count[[2, 2, 1]] = 2;
        history
    }

    #[test]
    fn test_interpolation_matches_linear_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(interpolate(&sorted, 0.0), 1.0);
        assert_eq!(interpolate(&sorted, 100.0), 4.0);
        assert!((interpolate(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((interpolate(&sorted, 10.0) - 1.3).abs() < 1e-12);
        assert_eq!(interpolate(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn test_bands_over_trials() {
        let history = history();
        let bands = ResultAggregator::new(&history).bands(ImpactSeries::Total);

        assert_eq!(bands.percentiles.dim(), (9, 3, 1));
        // Totals at the last step are 12, 13, 14, 15
        assert!((bands.median[[2, 0]] - 13.5).abs() < 1e-12);
        assert!((bands.mean[[2, 0]] - 13.5).abs() < 1e-12);
        assert_eq!(bands.min[[2, 0]], 12.0);
        assert_eq!(bands.max[[2, 0]], 15.0);
        assert!((bands.curve(4, 0)[2] - 13.5).abs() < 1e-12);
        // Step 0 is the baseline everywhere
        assert_eq!(bands.min[[0, 0]], 10.0);
        assert_eq!(bands.max[[0, 0]], 10.0);

        // Bands never cross
        for level in 1..bands.levels.len() {
            for t in 0..3 {
                assert!(bands.percentiles[[level, t, 0]] >= bands.percentiles[[level - 1, t, 0]]);
            }
        }
    }

    #[test]
    fn test_rejects_out_of_range_levels() {
        let history = history();
        let aggregator = ResultAggregator::new(&history);
        assert!(aggregator.bands_with_levels(ImpactSeries::Use, &[5.0, 101.0]).is_err());
        assert!(aggregator.bands_with_levels(ImpactSeries::Use, &[2.5, 97.5]).is_ok());
    }

    #[test]
    fn test_trial_breakdown() {
        let history = history();
        let aggregator = ResultAggregator::new(&history);
        let rows = aggregator.trial_breakdown(3).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get(ImpactCategory::Manufacturing), 13.0);
        assert_eq!(row.get(ImpactCategory::Use), 2.0);
        assert_eq!(row.get(ImpactCategory::Maintenance), 1.0);
        assert_eq!(row.get(ImpactCategory::Replacement), 2.0);
        assert_eq!(row.total(), 15.0);

        assert!(aggregator.trial_breakdown(4).is_err());
    }

    #[test]
    fn test_end_of_life_breakdown_is_trial_mean() {
        let history = history();
        let rows = ResultAggregator::new(&history).end_of_life_breakdown();
        let row = &rows[0];
        assert!((row.get(ImpactCategory::Manufacturing) - 11.5).abs() < 1e-12);
        assert!((row.get(ImpactCategory::Use) - 2.0).abs() < 1e-12);
        assert!((row.get(ImpactCategory::Maintenance) - 0.25).abs() < 1e-12);
        assert!((row.get(ImpactCategory::Replacement) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_uncertainty_summary_uses_population_std() {
        let history = history();
        let rows = ResultAggregator::new(&history).uncertainty_summary();
        let row = &rows[0];

        assert_eq!(row.method, "GWP");
        assert_eq!(row.unit, "kg CO2-eq");
        assert!((row.mean - 13.5).abs() < 1e-12);
        let std_dev = 1.25f64.sqrt();
        assert!((row.std_dev - std_dev).abs() < 1e-12);
        assert!((row.upper - (13.5 + 2.0 * std_dev)).abs() < 1e-12);
        assert!((row.lower - (13.5 - 2.0 * std_dev)).abs() < 1e-12);
    }

    #[test]
    fn test_fault_statistics() {
        let history = history();
        let aggregator = ResultAggregator::new(&history);

        let repartition = aggregator.fault_repartition();
        assert_eq!(repartition, array![[1, 0, 1], [0, 0, 1]]);

        let mean = aggregator.mean_fault_count();
        assert!((mean[0] - 0.5).abs() < 1e-12);
        assert!((mean[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cost_breakdown() {
        let history = history();
        let cost = ResultAggregator::new(&history).cost_breakdown();
        assert!((cost.manufacturing - 11.0).abs() < 1e-12);
        assert!((cost.maintenance - 1.0).abs() < 1e-12);
        assert!((cost.replacement - 2.0).abs() < 1e-12);
        assert!((cost.use_phase - 3.0).abs() < 1e-12);
        assert!((cost.total - 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let history = history();
        let aggregator = ResultAggregator::new(&history);
        assert_eq!(aggregator.bands(ImpactSeries::Use), aggregator.bands(ImpactSeries::Use));
        assert_eq!(aggregator.uncertainty_summary(), aggregator.uncertainty_summary());
        assert_eq!(aggregator.breakdown(), aggregator.end_of_life_breakdown());
    }
}
