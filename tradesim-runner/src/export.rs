//! Reporting and export: JSON, CSV, and text artifact generation.
//!
//! Three export formats for backtest results:
//! - **JSON**: the full sanitized result with schema versioning
//! - **CSV**: trade tape and equity curve for external analysis tools
//! - **Text**: a human-readable summary and a comparison table
//!
//! Every renderer works from the sanitized report, so no NaN or infinity
//! ever reaches a file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tradesim_core::domain::Trade;
use tradesim_core::engine::EquitySnapshot;
use tradesim_core::Report;

use crate::runner::{BacktestResult, ComparisonRow, SCHEMA_VERSION};

/// Renders one artifact from a finished result.
pub trait ReportRenderer {
    /// File name inside the artifact directory.
    fn file_name(&self) -> &'static str;
    fn render(&self, result: &BacktestResult) -> Result<String>;
}

pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn file_name(&self) -> &'static str {
        "report.json"
    }

    fn render(&self, result: &BacktestResult) -> Result<String> {
        export_json(result)
    }
}

pub struct TradesCsvRenderer;

impl ReportRenderer for TradesCsvRenderer {
    fn file_name(&self) -> &'static str {
        "trades.csv"
    }

    fn render(&self, result: &BacktestResult) -> Result<String> {
        export_trades_csv(&result.report.sanitized().trades)
    }
}

pub struct EquityCsvRenderer;

impl ReportRenderer for EquityCsvRenderer {
    fn file_name(&self) -> &'static str {
        "equity.csv"
    }

    fn render(&self, result: &BacktestResult) -> Result<String> {
        export_equity_csv(&result.report.sanitized().equity_curve)
    }
}

pub struct SummaryRenderer;

impl ReportRenderer for SummaryRenderer {
    fn file_name(&self) -> &'static str {
        "summary.txt"
    }

    fn render(&self, result: &BacktestResult) -> Result<String> {
        Ok(render_summary(&result.report))
    }
}

/// The renderers `save_artifacts` runs.
pub fn default_renderers() -> Vec<Box<dyn ReportRenderer>> {
    vec![
        Box::new(JsonRenderer),
        Box::new(TradesCsvRenderer),
        Box::new(EquityCsvRenderer),
        Box::new(SummaryRenderer),
    ]
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON, sanitizing the report first.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    let sanitized = BacktestResult {
        report: result.report.sanitized(),
        ..result.clone()
    };
    serde_json::to_string_pretty(&sanitized).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: entry_bar, entry_time, entry_price, exit_bar, exit_time,
/// exit_price, quantity, pnl, return_pct, commission, bars_held, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "quantity",
        "pnl",
        "return_pct",
        "commission",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_bar.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.quantity),
            &format!("{:.2}", t.pnl),
            &format!("{:.6}", t.return_pct),
            &format!("{:.2}", t.commission),
            &t.bars_held.to_string(),
            &t.exit_reason.as_str().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: bar_index, timestamp, equity, cash, position_quantity
pub fn export_equity_csv(equity_curve: &[EquitySnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "equity", "cash", "position_quantity"])?;
    for snap in equity_curve {
        wtr.write_record([
            &snap.bar_index.to_string(),
            &snap.timestamp.to_string(),
            &format!("{:.2}", snap.equity),
            &format!("{:.2}", snap.cash),
            &format!("{:.6}", snap.position_quantity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Text ───────────────────────────────────────────────────────────

/// Multi-line summary of one run.
pub fn render_summary(report: &Report) -> String {
    let report = report.sanitized();
    let m = &report.meta;
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "{} / {} ({})", m.symbol, m.strategy, m.fill_policy);
    let _ = writeln!(
        out,
        "Period:            {} .. {} ({} bars)",
        m.start.date(),
        m.end.date(),
        m.bar_count
    );
    let _ = writeln!(out, "Initial cash:      {:.2}", m.initial_cash);
    let _ = writeln!(out, "Final equity:      {:.2}", s.equity_final);
    let _ = writeln!(out, "Total return:      {:.2}%", s.total_return * 100.0);
    let _ = writeln!(out, "Buy & hold:        {:.2}%", s.buy_and_hold_return * 100.0);
    let _ = writeln!(out, "Max drawdown:      {:.2}%", s.max_drawdown * 100.0);
    let _ = writeln!(out, "Exposure:          {:.2}%", s.exposure * 100.0);
    let _ = writeln!(out, "Trades:            {}", s.total_trades);
    let _ = writeln!(out, "Win rate:          {:.2}%", s.win_rate * 100.0);
    let _ = writeln!(out, "Profit factor:     {:.2}", s.profit_factor);
    let _ = writeln!(out, "Expectancy:        {:.2}", s.expectancy);
    let _ = writeln!(out, "Commission paid:   {:.2}", s.total_commission);
    if !report.diagnostics.is_empty() {
        let _ = writeln!(out, "Diagnostics:       {}", report.diagnostics.len());
        for d in report.diagnostics.entries() {
            let _ = writeln!(out, "  bar {:>5}  {:<22} {}", d.bar_index, d.kind.as_str(), d.message);
        }
    }
    out
}

/// Fixed-width table of comparison rows.
pub fn render_comparison_table(rows: &[ComparisonRow]) -> String {
    let width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0).max(8);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>18}  {:>16}  {:>9}  {:>6}",
        "Strategy", "Final value", "Profit", "ROI %", "Trades"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:<width$}  {:>18.2}  {:>16.2}  {:>9.2}  {:>6}",
            r.label, r.final_value, r.profit, r.roi_pct, r.trades
        );
    }
    out
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write every default artifact into `output_dir`, creating it if needed.
///
/// Returns the paths written, in renderer order.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let mut written = Vec::new();
    for renderer in default_renderers() {
        let path = output_dir.join(renderer.file_name());
        let content = renderer.render(result)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Load a `BacktestResult` from an artifact directory's report.json.
pub fn load_artifact(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join(JsonRenderer.file_name());
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
