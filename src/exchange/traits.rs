//! Exchange-agnostic trait for funding data sources.
//!
//! The scanner only sees this trait. The descriptor-driven [`RestAdapter`]
//! covers every real exchange; [`MockFundingSource`] serves tests.
//!
//! [`RestAdapter`]: super::RestAdapter
//! [`MockFundingSource`]: super::MockFundingSource

use async_trait::async_trait;

use super::types::FundingRecord;
use crate::error::ScanError;

/// A source of normalized funding records for one exchange.
#[async_trait]
pub trait FundingSource: Send + Sync {
    /// Exchange identifier used in records and reports.
    fn id(&self) -> &str;

    /// Fetch all perpetual symbols with their current funding rates.
    ///
    /// Returns normalized records with:
    /// - Funding rates converted to the 8h equivalent
    /// - Volume as average quote volume per minute
    /// - Symbols in canonical `BASE/QUOTE` form
    async fn fetch(&self) -> Result<Vec<FundingRecord>, ScanError>;
}
