//! Per-run diagnostics collector.
//!
//! Each run owns one collector and returns it inside its output, so runs on
//! different threads never share one. Entries are also emitted as `tracing`
//! debug events for anyone watching logs live.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The broker turned an order into a no-op.
    OrderRejected,
    /// A next-open order had no following bar to fill on.
    PendingOrderDropped,
    /// The engine closed a position at the end of the series.
    ForceClose,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::OrderRejected => "order_rejected",
            DiagnosticKind::PendingOrderDropped => "pending_order_dropped",
            DiagnosticKind::ForceClose => "force_close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub bar_index: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, bar_index: usize, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        debug!(bar_index, kind = kind.as_str(), %message, "diagnostic");
        self.entries.push(Diagnostic {
            bar_index,
            kind,
            message,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
