//! Core building blocks for Sluice
//!
//! This crate provides the shared millisecond [`Clock`], the
//! [`RequestOutcome`] produced by every worker invocation and the
//! [`StatsAggregator`] that folds per-request events into periodic reports.

pub mod clock;
pub mod cpu;
pub mod outcome;
pub mod stats;

pub use clock::Clock;
pub use cpu::{CpuSensor, FixedCpuSensor, SystemCpuSensor};
pub use outcome::{RequestOutcome, QOS_UNMEASURED};
pub use stats::{StatsAggregator, StatsReport, StatsWindow};
