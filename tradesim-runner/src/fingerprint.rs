//! Run fingerprinting.
//!
//! A run is identified by three BLAKE3 hashes: the config (`run_id`), the
//! bars (`dataset_hash`), and the sanitized report bytes (`report_digest`).
//! Re-running an identical config on identical data must reproduce the
//! same report digest.

use serde::{Deserialize, Serialize};
use tradesim_core::Report;

use crate::runner::BacktestResult;

/// BLAKE3 of the report's sanitized compact JSON.
pub fn report_digest(report: &Report) -> Result<String, serde_json::Error> {
    let json = report.to_json()?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub run_id: String,
    pub dataset_hash: String,
    pub report_digest: String,
}

impl Fingerprint {
    pub fn of(result: &BacktestResult) -> Result<Self, serde_json::Error> {
        Ok(Self {
            run_id: result.run_id.clone(),
            dataset_hash: result.dataset_hash.clone(),
            report_digest: report_digest(&result.report)?,
        })
    }
}
