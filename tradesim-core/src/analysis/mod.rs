//! Performance analysis: everything computed after the loop finishes.
//!
//! All functions here are pure: trade log and equity curve in, numbers out.

pub mod drawdown;
pub mod metrics;
pub mod report;
pub mod sanitize;

pub use drawdown::{
    drawdown_periods, drawdown_series, DrawdownDuration, DrawdownPeriod, DrawdownPoint,
};
pub use metrics::{summarize, Summary};
pub use report::{Report, ReportMeta};
pub use sanitize::{finite, Sanitize, FINITE_CAP};
