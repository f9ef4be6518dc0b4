//! CSV snapshot of the latest scan, replaced atomically.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ScanError;
use crate::strategy::Opportunity;

/// One CSV line. Field order is the column order.
#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    symbol: &'a str,
    exchange_long: &'a str,
    exchange_short: &'a str,
    spread: Decimal,
    min_volume: Decimal,
    detected_at: String,
    long_rate: Decimal,
    short_rate: Decimal,
    annualized_spread: Decimal,
    asymmetric_interval: bool,
    long_volume: Decimal,
    short_volume: Decimal,
    long_next: Option<String>,
    short_next: Option<String>,
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl<'a> From<&'a Opportunity> for SnapshotRow<'a> {
    fn from(opp: &'a Opportunity) -> Self {
        Self {
            symbol: &opp.symbol,
            exchange_long: &opp.exchange_long,
            exchange_short: &opp.exchange_short,
            spread: opp.spread,
            min_volume: opp.min_volume.round_dp(2),
            detected_at: rfc3339(&opp.detected_at),
            long_rate: opp.long_rate,
            short_rate: opp.short_rate,
            annualized_spread: opp.annualized_spread,
            asymmetric_interval: opp.asymmetric_interval,
            long_volume: opp.long_volume.round_dp(2),
            short_volume: opp.short_volume.round_dp(2),
            long_next: opp.long_next_funding.as_ref().map(rfc3339),
            short_next: opp.short_next_funding.as_ref().map(rfc3339),
        }
    }
}

const HEADER: [&str; 14] = [
    "symbol",
    "exchange_long",
    "exchange_short",
    "spread",
    "min_volume",
    "detected_at",
    "long_rate",
    "short_rate",
    "annualized_spread",
    "asymmetric_interval",
    "long_volume",
    "short_volume",
    "long_next",
    "short_next",
];

fn csv_error(path: &Path, e: csv::Error) -> ScanError {
    ScanError::Report(format!("Failed to write snapshot {}: {}", path.display(), e))
}

/// Replace `path` with the given opportunities.
///
/// An empty slice still produces a header-only file. The table is written to
/// a sibling temp file first, synced to disk and renamed over the target.
pub fn write_snapshot(path: &Path, opportunities: &[Opportunity]) -> Result<(), ScanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&temp_path)
            .map_err(|e| csv_error(&temp_path, e))?;

        // Explicit header so an empty table still has one.
        writer
            .write_record(HEADER)
            .map_err(|e| csv_error(&temp_path, e))?;
        for opp in opportunities {
            writer
                .serialize(SnapshotRow::from(opp))
                .map_err(|e| csv_error(&temp_path, e))?;
        }
        let file = writer.into_inner().map_err(|e| {
            ScanError::Report(format!(
                "Failed to write snapshot {}: {}",
                temp_path.display(),
                e.error()
            ))
        })?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), rows = opportunities.len(), "Snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn opportunity(symbol: &str, spread: Decimal) -> Opportunity {
        Opportunity {
            symbol: symbol.to_string(),
            exchange_long: "b".to_string(),
            exchange_short: "a".to_string(),
            long_rate: dec!(-0.005),
            short_rate: spread - dec!(0.005),
            spread,
            annualized_spread: spread * dec!(1095),
            min_volume: dec!(8000),
            long_volume: dec!(8000),
            short_volume: dec!(8000),
            long_next_funding: Some(Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap()),
            short_next_funding: None,
            asymmetric_interval: false,
            detected_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_writes_header_and_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("opportunities.csv");

        write_snapshot(
            &path,
            &[opportunity("BTC/USDT", dec!(0.015)), opportunity("ETH/USDT", dec!(0.005))],
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "symbol,exchange_long,exchange_short,spread,min_volume,detected_at,long_rate,short_rate,\
             annualized_spread,asymmetric_interval,long_volume,short_volume,long_next,short_next"
        );
        assert!(lines[1].starts_with("BTC/USDT,b,a,0.015,8000,2026-03-01T12:00:00Z,"));
        assert!(lines[1].ends_with(",false,8000,8000,2026-03-01T16:00:00Z,"));
        assert!(lines[2].starts_with("ETH/USDT,"));
        assert!(!dir.path().join("opportunities.csv.tmp").exists());
    }

    #[test]
    fn test_empty_snapshot_is_header_only_and_replaces_previous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("opportunities.csv");

        write_snapshot(&path, &[opportunity("BTC/USDT", dec!(0.015))]).unwrap();
        write_snapshot(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("symbol,"));
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("snap.csv");
        write_snapshot(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
