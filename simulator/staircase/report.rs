//! Console summary and CSV export of a finished run

use std::path::Path;

use csv::Writer;
use ndarray::Array2;

use pelca::{
    CategoryBreakdown, CostBreakdown, FaultMode, ImpactCategory, ImpactSeries, ResultAggregator,
    StaircaseHistory, UncertaintyRow,
};

/// Everything printed or exported after a run
#[derive(Debug)]
pub struct StaircaseReport {
    pub name: String,
    pub seed_used: Option<[u8; 32]>,
    pub time_steps: usize,
    pub trials: usize,
    pub unit_names: Vec<String>,
    pub breakdown: Vec<CategoryBreakdown>,
    pub uncertainty: Vec<UncertaintyRow>,
    pub cost: CostBreakdown,
    pub fault_repartition: Array2<usize>,
    pub mean_fault_count: Vec<f64>,
    pub system_failure_at_end: f64,
}

impl StaircaseReport {
    pub fn from_history(name: &str, unit_names: Vec<String>, history: &StaircaseHistory) -> Self {
        let aggregator = ResultAggregator::new(history);
        Self {
            name: name.to_string(),
            seed_used: history.seed_used(),
            time_steps: history.time_steps(),
            trials: history.num_trials(),
            unit_names,
            breakdown: aggregator.breakdown(),
            uncertainty: aggregator.uncertainty_summary(),
            cost: aggregator.cost_breakdown(),
            fault_repartition: aggregator.fault_repartition(),
            mean_fault_count: aggregator.mean_fault_count().to_vec(),
            system_failure_at_end: history.system_cdf()[history.last_step()],
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║    STAIRCASE SIMULATION RESULTS                        ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Scenario: {}", self.name);
        match self.seed_used {
            Some(seed) => println!("Seed: 0x{}", hex(&seed)),
            None => println!("Seed: caller supplied RNG"),
        }
        println!("Steps: {}, trials: {}", self.time_steps, self.trials);
        println!();

        if self.trials == 1 {
            println!("═══ End-of-Life Breakdown (single trial) ═══");
        } else {
            println!("═══ End-of-Life Breakdown (mean of {} trials) ═══", self.trials);
        }
        for row in &self.breakdown {
            println!("  {} [{}]", row.method.name, row.method.unit);
            for category in ImpactCategory::ALL {
                println!("    {:<12} {:>14.4}", category.label(), row.get(category));
            }
            println!("    {:<12} {:>14.4}", "Total", row.total());
        }
        println!();

        if self.trials > 1 {
            println!("═══ Uncertainty (end-of-life total) ═══");
            for row in &self.uncertainty {
                println!(
                    "  {}: mean={:.4}, std={:.4}, -2σ={:.4}, +2σ={:.4} {}",
                    row.method, row.mean, row.std_dev, row.lower, row.upper, row.unit
                );
            }
            println!();
        }

        println!("═══ Cost ═══");
        println!("  Manufacture: {:.2}", self.cost.manufacturing);
        println!("  Use: {:.2}", self.cost.use_phase);
        println!("  Replacement: {:.2}", self.cost.replacement);
        println!("  Maintenance: {:.2}", self.cost.maintenance);
        println!("  Total: {:.2}", self.cost.total);
        println!();

        println!("═══ Faults ═══");
        println!(
            "  {:<20} {:>8} {:>8} {:>8} {:>10}",
            "RU", "Early", "Random", "Wearout", "mean/trial"
        );
        for (ru, name) in self.unit_names.iter().enumerate() {
            println!(
                "  {:<20} {:>8} {:>8} {:>8} {:>10.3}",
                name,
                self.fault_repartition[[ru, FaultMode::Early.index()]],
                self.fault_repartition[[ru, FaultMode::Random.index()]],
                self.fault_repartition[[ru, FaultMode::Wearout.index()]],
                self.mean_fault_count.get(ru).copied().unwrap_or(0.0)
            );
        }
        println!(
            "  Unrepaired system failure probability at end of life: {:.1}%",
            self.system_failure_at_end * 100.0
        );
        println!();
    }

    /// Export the end-of-life breakdown, one row per impact method
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let mut writer = Writer::from_path(path)?;

        let mut headers = vec!["method".to_string(), "unit".to_string()];
        headers.extend(ImpactCategory::ALL.iter().map(|c| c.label().to_string()));
        headers.extend(["Total", "mean", "std_dev", "lower_2sigma", "upper_2sigma"].map(String::from));
        writer.write_record(&headers)?;

        for (row, uncertainty) in self.breakdown.iter().zip(&self.uncertainty) {
            let mut record = vec![row.method.name.clone(), row.method.unit.clone()];
            record.extend(ImpactCategory::ALL.iter().map(|c| row.get(*c).to_string()));
            record.push(row.total().to_string());
            record.push(uncertainty.mean.to_string());
            record.push(uncertainty.std_dev.to_string());
            record.push(uncertainty.lower.to_string());
            record.push(uncertainty.upper.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Export decile bands of the total impact, one row per (step, method)
pub fn write_bands_csv<P: AsRef<Path>>(history: &StaircaseHistory, path: P) -> Result<(), csv::Error> {
    let bands = ResultAggregator::new(history).bands(ImpactSeries::Total);
    let mut writer = Writer::from_path(path)?;

    let mut headers = vec!["step".to_string(), "method".to_string()];
    headers.extend(bands.levels.iter().map(|l| format!("p{}", l)));
    headers.extend(["median", "mean", "min", "max"].map(String::from));
    writer.write_record(&headers)?;

    for t in 0..history.time_steps() {
        for (m, method) in history.methods().iter().enumerate() {
            let mut record = vec![t.to_string(), method.name.clone()];
            record.extend((0..bands.levels.len()).map(|p| bands.percentiles[[p, t, m]].to_string()));
            record.push(bands.median[[t, m]].to_string());
            record.push(bands.mean[[t, m]].to_string());
            record.push(bands.min[[t, m]].to_string());
            record.push(bands.max[[t, m]].to_string());
            writer.write_record(&record)?;
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
