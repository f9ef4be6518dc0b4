//! Append-only markdown scan history.

use chrono::{DateTime, FixedOffset, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ScanError;
use crate::strategy::Opportunity;
use crate::utils::decimal::{format_pct, format_usd_compact};

const TABLE_HEADER: &str = "| Time | # | Symbol | Spread | Long Exchange | Long Rate | Short Exchange | Short Rate | Min Vol/min | Asym |";
const TABLE_RULE: &str = "|------|---|--------|--------|---------------|-----------|----------------|------------|-------------|------|";

/// What one scan contributes to the history.
#[derive(Debug, Clone, Copy)]
pub enum HistoryEntry<'a> {
    /// No exchange returned usable data.
    NoData,
    /// Data arrived but nothing passed the thresholds.
    NoOpportunities,
    /// Best opportunities, already ranked and truncated.
    Ranked(&'a [Opportunity]),
}

#[derive(Debug, Clone)]
pub struct ScanHistory {
    path: PathBuf,
    offset: FixedOffset,
}

impl ScanHistory {
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one scan block, adding the day header the first time a date appears.
    pub fn append(&self, scanned_at: DateTime<Utc>, entry: HistoryEntry<'_>) -> Result<(), ScanError> {
        let local = scanned_at.with_timezone(&self.offset);
        let date = local.format("%Y-%m-%d").to_string();
        let time = local.format("%H:%M").to_string();

        let existing = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let date_header = format!("## {}", date);
        let needs_header = !existing.lines().any(|line| line.trim_end() == date_header);

        let block = render_block(&date_header, needs_header, &time, entry);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;

        debug!(path = %self.path.display(), new_day = needs_header, "History appended");
        Ok(())
    }
}

fn render_block(date_header: &str, needs_header: bool, time: &str, entry: HistoryEntry<'_>) -> String {
    let mut lines = Vec::new();
    if needs_header {
        lines.push(String::new());
        lines.push(date_header.to_string());
        lines.push(String::new());
        lines.push(TABLE_HEADER.to_string());
        lines.push(TABLE_RULE.to_string());
    }

    match entry {
        HistoryEntry::NoData => lines.push(placeholder_row(time, "no data")),
        HistoryEntry::NoOpportunities => lines.push(placeholder_row(time, "no opportunities")),
        HistoryEntry::Ranked([]) => lines.push(placeholder_row(time, "no opportunities")),
        HistoryEntry::Ranked(top) => {
            for (rank, opp) in top.iter().enumerate() {
                lines.push(opportunity_row(time, rank + 1, opp));
            }
        }
    }

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

fn placeholder_row(time: &str, message: &str) -> String {
    format!("| {} | - | *{}* | - | - | - | - | - | - | - |", time, message)
}

fn opportunity_row(time: &str, rank: usize, opp: &Opportunity) -> String {
    format!(
        "| {} | {} | **{}** | {} | {} | {} | {} | {} | {} | {} |",
        time,
        rank,
        opp.symbol,
        format_pct(opp.spread, 4),
        opp.exchange_long,
        format_pct(opp.long_rate, 4),
        opp.exchange_short,
        format_pct(opp.short_rate, 4),
        format_usd_compact(opp.min_volume),
        if opp.asymmetric_interval { "yes" } else { "no" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn btc() -> Opportunity {
        Opportunity {
            symbol: "BTC/USDT".to_string(),
            exchange_long: "bybit".to_string(),
            exchange_short: "binance".to_string(),
            long_rate: dec!(-0.005),
            short_rate: dec!(0.01),
            spread: dec!(0.015),
            annualized_spread: dec!(16.425),
            min_volume: dec!(8000),
            long_volume: dec!(8000),
            short_volume: dec!(8000),
            long_next_funding: None,
            short_next_funding: None,
            asymmetric_interval: true,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_scan_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let history = ScanHistory::new(dir.path().join("history.md"), utc());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 40, 0).unwrap();

        history.append(at, HistoryEntry::Ranked(&[btc()])).unwrap();

        let content = fs::read_to_string(history.path()).unwrap();
        assert!(content.contains("## 2026-03-01"));
        assert!(content.contains(TABLE_HEADER));
        assert!(content.contains(
            "| 14:40 | 1 | **BTC/USDT** | 1.5000% | bybit | -0.5000% | binance | 1.0000% | $8.0k | yes |"
        ));
    }

    #[test]
    fn test_date_header_written_once_per_day() {
        let dir = tempdir().unwrap();
        let history = ScanHistory::new(dir.path().join("history.md"), utc());

        let morning = Utc.with_ymd_and_hms(2026, 3, 1, 6, 40, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 3, 1, 22, 40, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 3, 2, 6, 40, 0).unwrap();

        history.append(morning, HistoryEntry::Ranked(&[btc()])).unwrap();
        history.append(evening, HistoryEntry::NoOpportunities).unwrap();
        history.append(next_day, HistoryEntry::NoData).unwrap();

        let content = fs::read_to_string(history.path()).unwrap();
        assert_eq!(content.matches("## 2026-03-01").count(), 1);
        assert_eq!(content.matches("## 2026-03-02").count(), 1);
        assert_eq!(content.matches(TABLE_HEADER).count(), 2);
        assert!(content.contains("| 22:40 | - | *no opportunities* |"));
        assert!(content.contains("| 06:40 | - | *no data* |"));

        // Earlier entries are preserved verbatim.
        let first = content.find("| 06:40 | 1 |").unwrap();
        let second = content.find("| 22:40 |").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_offset_shifts_date_and_time() {
        let dir = tempdir().unwrap();
        let bogota = FixedOffset::west_opt(5 * 3600).unwrap();
        let history = ScanHistory::new(dir.path().join("history.md"), bogota);

        // 03:10 UTC is still the previous evening at UTC-5.
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 3, 10, 0).unwrap();
        history.append(at, HistoryEntry::NoData).unwrap();

        let content = fs::read_to_string(history.path()).unwrap();
        assert!(content.contains("## 2026-03-01"));
        assert!(content.contains("| 22:10 |"));
    }

    #[test]
    fn test_empty_ranked_renders_no_opportunities() {
        let block = render_block("## 2026-03-01", false, "10:00", HistoryEntry::Ranked(&[]));
        assert_eq!(block, "| 10:00 | - | *no opportunities* | - | - | - | - | - | - | - |\n");
    }
}
