//! Scan outputs: the CSV snapshot and the markdown history.

mod history;
mod snapshot;

pub use history::{HistoryEntry, ScanHistory};
pub use snapshot::write_snapshot;

use chrono::FixedOffset;
use std::path::PathBuf;
use tracing::info;

use crate::config::ReportConfig;
use crate::error::ScanError;
use crate::strategy::ScanReport;

/// Writes both outputs for a finished scan.
#[derive(Debug, Clone)]
pub struct Reporter {
    snapshot_path: PathBuf,
    history: ScanHistory,
    top_n: usize,
}

impl Reporter {
    pub fn new(snapshot_path: impl Into<PathBuf>, history: ScanHistory, top_n: usize) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            history,
            top_n,
        }
    }

    pub fn from_config(config: &ReportConfig, top_n: usize) -> Result<Self, ScanError> {
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
            ScanError::Config(format!(
                "utc_offset_hours out of range: {}",
                config.utc_offset_hours
            ))
        })?;
        Ok(Self::new(
            &config.snapshot_path,
            ScanHistory::new(&config.history_path, offset),
            top_n,
        ))
    }

    /// Replace the snapshot and append to the history.
    ///
    /// The snapshot carries every opportunity that passed the filter; the
    /// history carries the top N.
    pub fn publish(&self, report: &ScanReport) -> Result<(), ScanError> {
        write_snapshot(&self.snapshot_path, &report.opportunities)?;

        let entry = if report.is_total_failure() {
            HistoryEntry::NoData
        } else if report.opportunities.is_empty() {
            HistoryEntry::NoOpportunities
        } else {
            HistoryEntry::Ranked(report.top(self.top_n))
        };
        self.history.append(report.started_at, entry)?;

        info!(
            snapshot = %self.snapshot_path.display(),
            history = %self.history.path().display(),
            rows = report.opportunities.len(),
            "Reports written"
        );
        Ok(())
    }
}
