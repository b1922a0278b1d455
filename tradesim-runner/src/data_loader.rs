//! Bar loading for the runner.
//!
//! Two sources implement the core `BarSource` contract:
//! - `CsvSource`: a `Date,Open,High,Low,Close,Volume` file for one symbol
//! - `SyntheticSource`: a seeded random walk, for offline development
//!
//! `load_series` fetches through either one, then enforces the loader's own
//! rules: a valid date range and a minimum number of bars.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};
use tradesim_core::data::{BarSource, InMemorySource};
use tradesim_core::domain::{Bar, BarSeries};
use tradesim_core::EngineError;

/// Fewest bars a backtest is allowed to run on.
pub const MIN_DATA_POINTS: usize = 50;

const REQUIRED_COLUMNS: [&str; 5] = ["date", "open", "high", "low", "close"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}, row {row}: {reason}")]
    BadRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("end date {end} precedes start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("insufficient data for '{symbol}': {found} bars, need at least {required}")]
    InsufficientData {
        symbol: String,
        found: usize,
        required: usize,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// First date, inclusive.
    pub start: NaiveDate,
    /// Last date, inclusive.
    pub end: NaiveDate,
    pub min_bars: usize,
}

impl LoadOptions {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            min_bars: MIN_DATA_POINTS,
        }
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.end < self.start {
            return Err(LoadError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// A validated series plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: BarSeries,
    /// BLAKE3 over every bar, for fingerprinting.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Fetch `symbol` from `source` and check it is long enough to backtest.
pub fn load_series(
    source: &dyn BarSource,
    symbol: &str,
    opts: &LoadOptions,
    synthetic: bool,
) -> Result<LoadedData, LoadError> {
    opts.validate()?;
    let series = source.fetch(symbol, opts.start, opts.end)?;
    if series.len() < opts.min_bars {
        return Err(LoadError::InsufficientData {
            symbol: symbol.to_string(),
            found: series.len(),
            required: opts.min_bars,
        });
    }

    let dataset_hash = compute_dataset_hash(&series);
    info!(
        symbol,
        bars = series.len(),
        start = %series.start(),
        end = %series.end(),
        synthetic,
        "loaded bars"
    );
    Ok(LoadedData {
        series,
        dataset_hash,
        synthetic,
    })
}

/// Deterministic BLAKE3 hash over the symbol and every bar.
pub fn compute_dataset_hash(series: &BarSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Bars for one symbol, read once from a CSV file.
///
/// Header names are matched case-insensitively; extra columns such as
/// `Adj Close` are ignored and `Volume` is optional. Rows are sorted by
/// date; duplicates are left for `BarSeries` validation to reject.
#[derive(Debug, Clone)]
pub struct CsvSource {
    symbol: String,
    inner: InMemorySource,
}

impl CsvSource {
    pub fn open(symbol: &str, path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bars = read_bars(file, path)?;
        debug!(symbol, path = %path.display(), rows = bars.len(), "read CSV");
        Ok(Self {
            symbol: symbol.to_string(),
            inner: InMemorySource::new().with(symbol, bars),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl BarSource for CsvSource {
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, EngineError> {
        self.inner.fetch(symbol, start, end)
    }
}

/// Parse bars from CSV text. `path` only labels errors.
pub fn read_bars<R: std::io::Read>(reader: R, path: &Path) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    let column = |name: &'static str| headers.iter().position(|h| h == name);
    let mut idx = [0usize; 5];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = column(name).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: name,
        })?;
    }
    let volume_idx = column("volume");

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let row = i + 2;
        let bad = |reason: String| LoadError::BadRow {
            path: path.to_path_buf(),
            row,
            reason,
        };
        let field = |j: usize| record.get(j).unwrap_or("");

        let timestamp = parse_timestamp(field(idx[0])).map_err(bad)?;
        let mut prices = [0.0; 4];
        for (k, price) in prices.iter_mut().enumerate() {
            *price = parse_number(field(idx[k + 1]), REQUIRED_COLUMNS[k + 1]).map_err(bad)?;
        }
        let volume = match volume_idx {
            Some(j) if !field(j).is_empty() => parse_number(field(j), "volume").map_err(bad)? as u64,
            _ => 0,
        };

        bars.push(Bar {
            timestamp,
            open: prices[0],
            high: prices[1],
            low: prices[2],
            close: prices[3],
            volume,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_number(raw: &str, name: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Err(format!("missing {name}"));
    }
    raw.parse::<f64>()
        .map_err(|_| format!("{name} is not a number: '{raw}'"))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date '{raw}'"));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    Err(format!("unrecognized date '{raw}' (expected YYYY-MM-DD)"))
}

/// Write bars in the format `CsvSource` reads.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])
        .map_err(csv_err)?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.date().to_string(),
            format!("{:.4}", bar.open),
            format!("{:.4}", bar.high),
            format!("{:.4}", bar.low),
            format!("{:.4}", bar.close),
            bar.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Seeded random-walk bars on weekdays.
///
/// Developer-only: the same symbol, seed and range always produce the same
/// bars, and the runner tags results built on them as synthetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSource {
    pub seed: u64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl BarSource for SyntheticSource {
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, EngineError> {
        if end < start {
            return Err(EngineError::InvalidParameter(format!(
                "end date {end} precedes start date {start}"
            )));
        }
        BarSeries::new(symbol, generate_synthetic_bars(symbol, start, end, self.seed))
    }
}

/// Random walk from 100.0 with daily returns in ±3%.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate, seed: u64) -> Vec<Bar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        if let Some(timestamp) = current.and_hms_opt(0, 0, 0) {
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(text: &str) -> Result<Vec<Bar>, LoadError> {
        read_bars(text.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn reads_yahoo_style_csv() {
        let text = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                    2024-01-03,101,103,100,102,101.5,1100\n\
                    2024-01-02,100,102,99,101,100.5,1000\n";
        let bars = parse(text).unwrap();
        assert_eq!(bars.len(), 2);
        // Sorted by date regardless of file order.
        assert_eq!(bars[0].timestamp.date(), date(2024, 1, 2));
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[1].volume, 1100);
    }

    #[test]
    fn headers_are_case_insensitive_and_volume_optional() {
        let text = "date,OPEN,high,Low,close\n2024-01-02 00:00:00,1,2,0.5,1.5\n";
        let bars = parse(text).unwrap();
        assert_eq!(bars[0].high, 2.0);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse("Date,Open,High,Close\n2024-01-02,1,2,1\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "low", .. }));
    }

    #[test]
    fn bad_row_reports_line_number() {
        let text = "Date,Open,High,Low,Close\n2024-01-02,1,2,0.5,1\n2024-01-03,1,,0.5,1\n";
        let err = parse(text).unwrap_err();
        let LoadError::BadRow { row, reason, .. } = err else {
            panic!("expected BadRow, got {err:?}");
        };
        assert_eq!(row, 3);
        assert!(reason.contains("high"));
    }

    #[test]
    fn bad_date_is_reported() {
        let err = parse("Date,Open,High,Low,Close\n01/02/2024,1,2,0.5,1\n").unwrap_err();
        assert!(err.to_string().contains("unrecognized date"));
    }

    #[test]
    fn insufficient_data_fails() {
        let source = SyntheticSource::new(1);
        let opts = LoadOptions::new(date(2024, 1, 1), date(2024, 1, 31));
        let err = load_series(&source, "SPY", &opts, true).unwrap_err();
        let LoadError::InsufficientData { found, required, .. } = err else {
            panic!("expected InsufficientData, got {err:?}");
        };
        // 23 weekdays in January 2024.
        assert_eq!(found, 23);
        assert_eq!(required, 50);

        let loaded = load_series(&source, "SPY", &opts.with_min_bars(20), true).unwrap();
        assert_eq!(loaded.series.len(), 23);
        assert!(loaded.synthetic);
    }

    #[test]
    fn inverted_range_fails_before_fetch() {
        let opts = LoadOptions::new(date(2024, 2, 1), date(2024, 1, 1));
        let err = load_series(&SyntheticSource::new(1), "SPY", &opts, true).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDateRange { .. }));
    }

    #[test]
    fn weekend_only_range_is_no_data() {
        // 2024-01-06 and 07 are a Saturday and Sunday.
        let opts = LoadOptions::new(date(2024, 1, 6), date(2024, 1, 7)).with_min_bars(1);
        let err = load_series(&SyntheticSource::new(1), "SPY", &opts, true).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Engine(EngineError::NoDataAvailable { .. })
        ));
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let a = generate_synthetic_bars("SPY", date(2024, 1, 1), date(2024, 3, 31), 7);
        let b = generate_synthetic_bars("SPY", date(2024, 1, 1), date(2024, 3, 31), 7);
        assert_eq!(a, b);
        assert!(a.iter().all(Bar::is_sane));
    }

    #[test]
    fn synthetic_data_depends_on_symbol_and_seed() {
        let spy = generate_synthetic_bars("SPY", date(2024, 1, 1), date(2024, 1, 31), 7);
        let qqq = generate_synthetic_bars("QQQ", date(2024, 1, 1), date(2024, 1, 31), 7);
        let spy2 = generate_synthetic_bars("SPY", date(2024, 1, 1), date(2024, 1, 31), 8);
        assert_eq!(spy.len(), qqq.len());
        assert_ne!(spy[0].close, qqq[0].close);
        assert_ne!(spy[0].close, spy2[0].close);
    }

    #[test]
    fn dataset_hash_is_stable() {
        let source = SyntheticSource::new(3);
        let opts = LoadOptions::new(date(2024, 1, 1), date(2024, 6, 30));
        let a = load_series(&source, "SPY", &opts, true).unwrap();
        let b = load_series(&source, "SPY", &opts, true).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.dataset_hash.len(), 64);
    }
}
