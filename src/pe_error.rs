//! Error types for configuration, validation and inventory loading

use thiserror::Error;

use crate::pe_interface::RuIndex;

/// Result type for staircase operations
pub type Result<T> = std::result::Result<T, StaircaseError>;

/// Errors raised before a simulation starts.
///
/// Configuration variants mean the inputs are wrong and the run must not
/// proceed. `Resource` means the inputs could not be produced at all (for
/// example the LCA result file is missing) and is kept apart so callers can
/// report it differently.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StaircaseError {
    /// A per-RU table does not have the expected number of rows or columns
    #[error("table '{table}' has {found} entries, expected {expected}")]
    ShapeMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    /// A numeric parameter is NaN
    #[error("RU {ru}: parameter '{field}' is NaN")]
    NanParameter { ru: RuIndex, field: String },

    /// Weibull parameters of an enabled fault mode were rejected
    #[error("RU {ru}: invalid {mode} Weibull parameters: {reason}")]
    InvalidWeibull {
        ru: RuIndex,
        mode: String,
        reason: String,
    },

    /// No replacement row configured for a trigger
    #[error("no replacement row for {trigger} on RU {ru}")]
    MissingReplacement { trigger: String, ru: RuIndex },

    /// A replacement row exists but cannot be used
    #[error("replacement row for {trigger} on RU {ru} is invalid: {reason}")]
    InvalidReplacementRow {
        trigger: String,
        ru: RuIndex,
        reason: String,
    },

    /// A scalar setting is out of range
    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting { field: String, reason: String },

    /// The external inventory source could not provide its data
    #[error("inventory source '{source_name}' unavailable: {reason}")]
    Resource { source_name: String, reason: String },
}

impl StaircaseError {
    /// True for errors caused by the inputs themselves rather than by
    /// missing or unreadable resources
    pub fn is_configuration(&self) -> bool {
        !matches!(self, StaircaseError::Resource { .. })
    }
}
