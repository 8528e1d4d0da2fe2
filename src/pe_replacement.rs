// Replacement policy
//
// Maps a fault (mode, RU) or a maintenance trigger on an RU to the vector of
// units renewed as a consequence. Rows may replace several units at once
// (an assembly failing takes its sub-parts with it) and may carry weights in
// [0, 1] for partial refurbishment.

use std::fmt;

use hashbrown::HashMap;

use crate::pe_config::FaultModeSwitches;
use crate::pe_error::{Result, StaircaseError};
use crate::pe_interface::{FaultMode, RuIndex};

/// What caused a replacement lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacementTrigger {
    Fault(FaultMode),
    Maintenance,
}

impl ReplacementTrigger {
    /// Position in diagnostics order: fault modes first, then maintenance
    fn rank(self) -> usize {
        match self {
            ReplacementTrigger::Fault(mode) => mode.index(),
            ReplacementTrigger::Maintenance => FaultMode::ALL.len(),
        }
    }
}

impl fmt::Display for ReplacementTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementTrigger::Fault(mode) => write!(f, "{} fault", mode),
            ReplacementTrigger::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// Configured replacement matrix
#[derive(Debug, Clone, Default)]
pub struct ReplacementPolicy {
    rows: HashMap<(ReplacementTrigger, RuIndex), Vec<f64>>,
}

impl ReplacementPolicy {
    /// Empty policy; every lookup fails until rows are added
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Each trigger replaces only the unit it concerns
    pub fn identity(num_units: usize) -> Self {
        let mut policy = Self::new();
        for ru in 0..num_units {
            let mut row = vec![0.0; num_units];
            row[ru] = 1.0;
            policy.set_fault_row(ru, row.clone());
            policy.set_row(ReplacementTrigger::Maintenance, ru, row);
        }
        policy
    }

    /// Set the row for one trigger on one RU
    pub fn set_row(&mut self, trigger: ReplacementTrigger, ru: RuIndex, row: Vec<f64>) -> &mut Self {
        self.rows.insert((trigger, ru), row);
        self
    }

    /// Set the same row for every fault mode of an RU
    pub fn set_fault_row(&mut self, ru: RuIndex, row: Vec<f64>) -> &mut Self {
        for mode in FaultMode::ALL {
            self.rows.insert((ReplacementTrigger::Fault(mode), ru), row.clone());
        }
        self
    }

    /// Look up a row; a missing key is an error, never "no replacement"
    pub fn lookup(&self, trigger: ReplacementTrigger, ru: RuIndex) -> Result<&[f64]> {
        self.rows
            .get(&(trigger, ru))
            .map(|row| row.as_slice())
            .ok_or_else(|| StaircaseError::MissingReplacement {
                trigger: trigger.to_string(),
                ru,
            })
    }

    pub fn on_fault(&self, mode: FaultMode, ru: RuIndex) -> Result<&[f64]> {
        self.lookup(ReplacementTrigger::Fault(mode), ru)
    }

    pub fn on_maintenance(&self, ru: RuIndex) -> Result<&[f64]> {
        self.lookup(ReplacementTrigger::Maintenance, ru)
    }

    /// Check that every trigger able to fire has a well-formed row
    ///
    /// Rows must have one entry per RU, finite weights in [0, 1], and must
    /// fully replace the unit that triggered them.
    pub fn validate(
        &self,
        num_units: usize,
        faults: &FaultModeSwitches,
        maintained: &[RuIndex],
    ) -> Result<()> {
        // Fixed (trigger, RU) order keeps the reported error stable
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by_key(|(key, _)| (key.0.rank(), key.1));

        for (&(trigger, ru), row) in rows {
            if ru >= num_units {
                return Err(invalid_row(trigger, ru, format!("RU index out of range 0..{}", num_units)));
            }
            check_row(trigger, ru, row, num_units)?;
        }

        for mode in faults.enabled() {
            for ru in 0..num_units {
                self.on_fault(mode, ru)?;
            }
        }
        for &ru in maintained {
            self.on_maintenance(ru)?;
        }
        Ok(())
    }
}

/// Add `row` into `acc`, clipping every entry to at most 1
pub fn accumulate_clipped(acc: &mut [f64], row: &[f64]) {
    for (a, r) in acc.iter_mut().zip(row) {
        *a = (*a + r).min(1.0);
    }
}

fn check_row(trigger: ReplacementTrigger, ru: RuIndex, row: &[f64], num_units: usize) -> Result<()> {
    if row.len() != num_units {
        return Err(StaircaseError::ShapeMismatch {
            table: format!("replacement row for {} on RU {}", trigger, ru),
            expected: num_units,
            found: row.len(),
        });
    }
    if let Some(bad) = row.iter().position(|w| !w.is_finite() || *w < 0.0 || *w > 1.0) {
        return Err(invalid_row(
            trigger,
            ru,
            format!("weight {} at position {} is outside [0, 1]", row[bad], bad),
        ));
    }
    if row[ru] != 1.0 {
        return Err(invalid_row(trigger, ru, "row does not replace the triggering unit".to_string()));
    }
    Ok(())
}

fn invalid_row(trigger: ReplacementTrigger, ru: RuIndex, reason: String) -> StaircaseError {
    StaircaseError::InvalidReplacementRow {
        trigger: trigger.to_string(),
        ru,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_policy() {
        let policy = ReplacementPolicy::identity(3);
        assert_eq!(policy.on_fault(FaultMode::Wearout, 1).unwrap(), &[0.0, 1.0, 0.0]);
        assert_eq!(policy.on_maintenance(2).unwrap(), &[0.0, 0.0, 1.0]);
        assert!(policy.validate(3, &FaultModeSwitches::all(), &[0, 1, 2]).is_ok());
    }

    #[test]
    fn test_missing_row_is_error() {
        let policy = ReplacementPolicy::new();
        let err = policy.on_fault(FaultMode::Random, 0).unwrap_err();
        assert_eq!(
            err,
            StaircaseError::MissingReplacement {
                trigger: "Random fault".to_string(),
                ru: 0,
            }
        );
    }

    #[test]
    fn test_validation_only_requires_enabled_triggers() {
        let mut policy = ReplacementPolicy::new();
        policy.set_row(ReplacementTrigger::Fault(FaultMode::Wearout), 0, vec![1.0, 0.0]);
        policy.set_row(ReplacementTrigger::Fault(FaultMode::Wearout), 1, vec![0.0, 1.0]);

        let wearout_only = FaultModeSwitches {
            early: false,
            random: false,
            wearout: true,
        };
        assert!(policy.validate(2, &wearout_only, &[]).is_ok());
        assert!(policy.validate(2, &FaultModeSwitches::all(), &[]).is_err());

        let err = policy.validate(2, &wearout_only, &[1]).unwrap_err();
        assert!(matches!(err, StaircaseError::MissingReplacement { ru: 1, .. }));
    }

    #[test]
    fn test_cascading_row_must_include_trigger() {
        let mut policy = ReplacementPolicy::identity(3);
        // Board failure replaces the board and both modules mounted on it
        policy.set_fault_row(0, vec![1.0, 1.0, 1.0]);
        assert!(policy.validate(3, &FaultModeSwitches::all(), &[]).is_ok());

        policy.set_fault_row(1, vec![1.0, 0.0, 0.0]);
        let err = policy.validate(3, &FaultModeSwitches::all(), &[]).unwrap_err();
        assert!(matches!(err, StaircaseError::InvalidReplacementRow { ru: 1, .. }));
    }

    #[test]
    fn test_malformed_rows_rejected() {
        let mut policy = ReplacementPolicy::identity(2);
        policy.set_fault_row(0, vec![1.0]);
        assert!(matches!(
            policy.validate(2, &FaultModeSwitches::all(), &[]),
            Err(StaircaseError::ShapeMismatch { .. })
        ));

        let mut policy = ReplacementPolicy::identity(2);
        policy.set_fault_row(0, vec![1.0, 1.5]);
        assert!(matches!(
            policy.validate(2, &FaultModeSwitches::all(), &[]),
            Err(StaircaseError::InvalidReplacementRow { .. })
        ));

        let mut policy = ReplacementPolicy::identity(2);
        policy.set_row(ReplacementTrigger::Maintenance, 5, vec![0.0, 0.0]);
        assert!(policy.validate(2, &FaultModeSwitches::all(), &[]).is_err());
    }

    #[test]
    fn test_first_error_is_stable_across_policies() {
        // Each policy gets a freshly seeded hasher
        for _ in 0..16 {
            let mut policy = ReplacementPolicy::identity(3);
            policy.set_row(ReplacementTrigger::Maintenance, 0, vec![1.0]);
            policy.set_row(ReplacementTrigger::Fault(FaultMode::Wearout), 2, vec![1.0, 0.0, 0.0]);
            policy.set_row(ReplacementTrigger::Fault(FaultMode::Early), 1, vec![0.0, 0.0, 0.0]);

            let err = policy.validate(3, &FaultModeSwitches::all(), &[]).unwrap_err();
            assert!(matches!(err, StaircaseError::InvalidReplacementRow { ru: 1, .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_accumulate_clipped() {
        let mut acc = vec![0.0, 0.0, 0.0];
        accumulate_clipped(&mut acc, &[1.0, 0.5, 0.0]);
        accumulate_clipped(&mut acc, &[1.0, 0.25, 0.0]);
        assert_eq!(acc, vec![1.0, 0.75, 0.0]);
    }
}
