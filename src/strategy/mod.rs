//! Scan pipeline.
//!
//! - `aggregator`: group per-exchange records by normalized symbol
//! - `spread`: best cross-exchange spread per symbol
//! - `ranker`: threshold filter and ordering
//! - `scanner`: concurrent fetch orchestration tying it together

mod aggregator;
mod ranker;
mod scanner;
mod spread;

pub use aggregator::{aggregate, SymbolBook};
pub use ranker::{filter_and_rank, top_n, Thresholds};
pub use scanner::{ExchangeOutcome, FetchStatus, ScanReport, ScanSettings, Scanner};
pub use spread::{compute, Opportunity};
