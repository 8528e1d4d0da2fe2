//! Weibull hazard tables for the three competing fault modes
//!
//! For every RU and every age `0..T` the model holds the cumulative failure
//! probability of each mode, the combined probability
//! `1 - (1-E)(1-R)(1-W)`, and each mode's share of `E + R + W` used to
//! attribute a failure to a cause. Disabled modes keep their slot in the
//! tables and stay at zero, so shapes never depend on configuration.
//!
//! All tables are built once per run and are deterministic.

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::ContinuousCDF;

use crate::pe_config::{FaultModeSwitches, StaircaseConfig};
use crate::pe_error::Result;
use crate::pe_interface::{FaultMode, RuIndex, TimeStep};

/// Precomputed hazard tables, each shaped `[T, N_RU]`
#[derive(Debug, Clone)]
pub struct HazardModel {
    switches: FaultModeSwitches,
    cdf: [Array2<f64>; 3],
    share: [Array2<f64>; 3],
    combined: Array2<f64>,
}

impl HazardModel {
    /// Build all tables from a validated configuration
    pub fn build(config: &StaircaseConfig) -> Result<Self> {
        let steps = config.time_steps();
        let num_units = config.num_units();
        let switches = config.settings().faults;

        let mut cdf = [
            Array2::<f64>::zeros((steps, num_units)),
            Array2::<f64>::zeros((steps, num_units)),
            Array2::<f64>::zeros((steps, num_units)),
        ];

        for mode in switches.enabled() {
            let table = &mut cdf[mode.index()];
            for (ru, row) in config.reliability().iter().enumerate() {
                let dist = row.faults.get(mode).distribution(ru, mode)?;
                for age in 0..steps {
                    table[[age, ru]] = dist.cdf(config.years_at(age));
                }
            }
        }

        let survival = cdf.iter().fold(Array2::<f64>::ones((steps, num_units)), |acc, table| {
            acc * table.mapv(|p| 1.0 - p)
        });
        let combined = survival.mapv(|s| 1.0 - s);

        let total = &cdf[0] + &cdf[1] + &cdf[2];
        let share = [
            shares_of(&cdf[0], &total),
            shares_of(&cdf[1], &total),
            shares_of(&cdf[2], &total),
        ];

        Ok(Self {
            switches,
            cdf,
            share,
            combined,
        })
    }

    pub fn time_steps(&self) -> usize {
        self.combined.nrows()
    }

    pub fn num_units(&self) -> usize {
        self.combined.ncols()
    }

    pub fn switches(&self) -> FaultModeSwitches {
        self.switches
    }

    /// CDF of one mode at an age
    pub fn cdf(&self, mode: FaultMode, age: TimeStep, ru: RuIndex) -> f64 {
        self.cdf[mode.index()][[age, ru]]
    }

    /// Share of one mode in the summed CDF at an age
    pub fn share(&self, mode: FaultMode, age: TimeStep, ru: RuIndex) -> f64 {
        self.share[mode.index()][[age, ru]]
    }

    /// Combined failure probability at an age
    pub fn combined(&self, age: TimeStep, ru: RuIndex) -> f64 {
        self.combined[[age, ru]]
    }

    pub fn cdf_table(&self, mode: FaultMode) -> &Array2<f64> {
        &self.cdf[mode.index()]
    }

    pub fn share_table(&self, mode: FaultMode) -> &Array2<f64> {
        &self.share[mode.index()]
    }

    pub fn combined_table(&self) -> &Array2<f64> {
        &self.combined
    }

    /// Probability that at least one RU of a never-repaired product has
    /// failed by each age
    pub fn system_cdf(&self) -> Array1<f64> {
        self.combined
            .map_axis(Axis(1), |row| 1.0 - row.iter().map(|p| 1.0 - p).product::<f64>())
    }

    /// Attribute a failure at `age` to a mode given the fault-type threshold
    ///
    /// Walks the modes in order, accumulating shares, and picks the first
    /// mode whose cumulative share reaches the threshold. Modes with zero
    /// share are never picked; if rounding leaves the threshold above the
    /// total, the last mode with a positive share wins. Returns `None` only
    /// when every share is zero.
    pub fn attribute(&self, age: TimeStep, ru: RuIndex, threshold: f64) -> Option<FaultMode> {
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for mode in FaultMode::ALL {
            let share = self.share(mode, age, ru);
            if share <= 0.0 {
                continue;
            }
            cumulative += share;
            last_positive = Some(mode);
            if threshold <= cumulative {
                return Some(mode);
            }
        }
        last_positive
    }
}

fn shares_of(table: &Array2<f64>, total: &Array2<f64>) -> Array2<f64> {
    let mut share = Array2::<f64>::zeros(table.raw_dim());
    ndarray::Zip::from(&mut share)
        .and(table)
        .and(total)
        .for_each(|s, &p, &sum| {
            *s = if sum > 0.0 { p / sum } else { 0.0 };
        });
    share
}
