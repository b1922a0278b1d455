//! Simulation loop and supporting infrastructure.
//!
//! One run replays a bar series against one strategy. For every bar:
//!
//! 1. Fill any order parked for this bar's open (next-open policy)
//! 2. Feed the bar to the indicator engine
//! 3. Ask the strategy for an intent
//! 4. Hand the resulting order to the broker
//! 5. Record an equity snapshot at the close
//!
//! After the last bar an open position is force-closed (if configured) and the
//! strategy's `on_finish` hook runs.

pub mod config;
pub mod diagnostics;
pub mod simulation;

pub use config::{EngineConfig, FillPolicy};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use simulation::{run_backtest, EquitySnapshot, RunOutput, RunState, Simulation};
