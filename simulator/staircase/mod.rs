//! Staircase scenario tooling
//!
//! Shared by the scenario and profiling runners and the examples:
//! - YAML scenario files describing a product
//! - console summary and CSV export of finished runs
//! - event sinks for following individual trials

#![allow(dead_code)]

pub mod report;
pub mod scenario;
pub mod sinks;

pub use report::{hex, write_bands_csv, StaircaseReport};
pub use scenario::{parse_seed_hex, ScenarioFile};
pub use sinks::{CollectorEventSink, ConsoleEventSink, CsvEventSink};
