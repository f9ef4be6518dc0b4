//! # Funding Spread Scanner
//!
//! Polls public perpetual-futures funding rates from many exchanges, finds
//! the largest cross-exchange funding spread per symbol and reports the ones
//! worth trading.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, validation and the exchange catalog
//! - `exchange`: Descriptor-driven REST adapter and symbol normalization
//! - `strategy`: Aggregation, spread calculation, ranking and scan orchestration
//! - `report`: CSV snapshot and markdown scan history
//! - `utils`: Decimal helpers and formatting

pub mod config;
pub mod error;
pub mod exchange;
pub mod report;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use error::ScanError;
