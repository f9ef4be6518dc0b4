//! Configuration management for the funding spread scanner.
//!
//! Loads settings from an optional `scanner.toml`, environment variables
//! (`FSS__SECTION__KEY`) and a `.env` file.

mod exchanges;

pub use exchanges::default_exchanges;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::exchange::ExchangeDescriptor;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Opportunity thresholds and ranking
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Timeouts and parallelism
    #[serde(default)]
    pub scan: ScanConfig,
    /// Output locations and formatting
    #[serde(default)]
    pub report: ReportConfig,
    /// Exchange descriptors (defaults to the built-in catalog)
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<ExchangeDescriptor>,
    /// Exchange ids to skip without editing the catalog
    #[serde(default)]
    pub disabled_exchanges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum 8h-equivalent funding spread (0.004 = 0.4%)
    #[serde(default = "default_spread_threshold")]
    pub spread_threshold: Decimal,
    /// Minimum quote volume per minute on both legs
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: Decimal,
    /// Number of opportunities appended to the scan history
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Per-exchange timeout in seconds
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// Ceiling for the whole fan-out in seconds
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
    /// Maximum concurrent exchange fetches (default: one per exchange)
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// CSV snapshot, replaced every scan
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Markdown scan history, append-only
    #[serde(default = "default_history_path")]
    pub history_path: String,
    /// Fixed UTC offset used for history timestamps
    #[serde(default)]
    pub utc_offset_hours: i32,
    /// Directory for the rolling diagnostic log
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

// Default value functions
fn default_spread_threshold() -> Decimal {
    Decimal::new(4, 3) // 0.004 (0.4%)
}

fn default_volume_threshold() -> Decimal {
    Decimal::new(5000, 0) // $5k per minute
}

fn default_top_n() -> usize {
    3
}

fn default_adapter_timeout() -> u64 {
    15
}

fn default_scan_timeout() -> u64 {
    60
}

fn default_snapshot_path() -> String {
    "opportunities.csv".to_string()
}

fn default_history_path() -> String {
    "scan_history.md".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Config {
    /// Load configuration from an optional file, environment variables and `.env`.
    ///
    /// Without an explicit path, `scanner.{toml,yaml,json}` is read if present.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(p) => config::File::with_name(p).required(true),
            None => config::File::with_name("scanner").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::default()
                    .prefix("FSS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values. Must pass before any network call.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        anyhow::ensure!(
            t.spread_threshold >= Decimal::ZERO && t.spread_threshold <= Decimal::ONE,
            "spread_threshold must be between 0 and 1 (got {})",
            t.spread_threshold
        );
        anyhow::ensure!(
            t.volume_threshold >= Decimal::ZERO,
            "volume_threshold must not be negative (got {})",
            t.volume_threshold
        );
        anyhow::ensure!(t.top_n >= 1, "top_n must be at least 1");

        let s = &self.scan;
        anyhow::ensure!(
            s.adapter_timeout_secs > 0,
            "adapter_timeout_secs must be positive"
        );
        anyhow::ensure!(
            s.scan_timeout_secs >= s.adapter_timeout_secs,
            "scan_timeout_secs ({}) must be >= adapter_timeout_secs ({})",
            s.scan_timeout_secs,
            s.adapter_timeout_secs
        );
        anyhow::ensure!(
            s.max_concurrency != Some(0),
            "max_concurrency must be at least 1"
        );

        let r = &self.report;
        anyhow::ensure!(
            !r.snapshot_path.trim().is_empty() && !r.history_path.trim().is_empty(),
            "snapshot_path and history_path must be set"
        );
        anyhow::ensure!(
            (-12..=14).contains(&r.utc_offset_hours),
            "utc_offset_hours must be between -12 and 14 (got {})",
            r.utc_offset_hours
        );

        let mut seen = HashSet::new();
        for exchange in &self.exchanges {
            exchange
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid exchange descriptor: {}", e))?;
            anyhow::ensure!(
                seen.insert(exchange.id.as_str()),
                "duplicate exchange id {:?}",
                exchange.id
            );
        }
        for id in &self.disabled_exchanges {
            anyhow::ensure!(
                seen.contains(id.as_str()),
                "disabled_exchanges names unknown exchange {:?}",
                id
            );
        }
        anyhow::ensure!(
            !self.enabled_exchanges().is_empty(),
            "no exchanges are enabled"
        );

        Ok(())
    }

    /// Keep only the named exchanges. Unknown ids are a configuration error.
    pub fn restrict_to(&mut self, ids: &[String]) -> Result<()> {
        for id in ids {
            anyhow::ensure!(
                self.exchanges.iter().any(|e| &e.id == id),
                "unknown exchange {:?}",
                id
            );
        }
        self.exchanges.retain(|e| ids.contains(&e.id));
        self.disabled_exchanges.retain(|id| ids.contains(id));
        Ok(())
    }

    /// Exchanges that will be polled.
    pub fn enabled_exchanges(&self) -> Vec<&ExchangeDescriptor> {
        self.exchanges
            .iter()
            .filter(|e| e.enabled && !self.disabled_exchanges.contains(&e.id))
            .collect()
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.adapter_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.scan_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            scan: ScanConfig::default(),
            report: ReportConfig::default(),
            exchanges: default_exchanges(),
            disabled_exchanges: Vec::new(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            spread_threshold: default_spread_threshold(),
            volume_threshold: default_volume_threshold(),
            top_n: default_top_n(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_adapter_timeout(),
            scan_timeout_secs: default_scan_timeout(),
            max_concurrency: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            history_path: default_history_path(),
            utc_offset_hours: 0,
            log_dir: default_log_dir(),
        }
    }
}
