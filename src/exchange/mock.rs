//! In-memory funding source for tests.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

use super::traits::FundingSource;
use super::types::{FundingRecord, REFERENCE_INTERVAL_HOURS};
use crate::error::ScanError;

/// What a mock exchange does when fetched.
#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(Vec<FundingRecord>),
    Fail(String),
}

/// A funding source that returns canned records (or a canned failure).
#[derive(Debug, Clone)]
pub struct MockFundingSource {
    id: String,
    behavior: MockBehavior,
    delay: Option<Duration>,
}

impl MockFundingSource {
    /// A mock exchange returning no records.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            behavior: MockBehavior::Respond(Vec::new()),
            delay: None,
        }
    }

    /// A mock exchange that always fails with the given reason.
    pub fn failing(id: &str, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            behavior: MockBehavior::Fail(reason.to_string()),
            delay: None,
        }
    }

    /// Add a normalized record for `symbol` with an 8h funding interval.
    pub fn with_rate(mut self, symbol: &str, funding_rate: Decimal, volume_per_minute: Decimal) -> Self {
        let record = FundingRecord {
            exchange_id: self.id.clone(),
            symbol: symbol.to_string(),
            raw_symbol: symbol.replace('/', ""),
            funding_rate,
            funding_interval_hours: REFERENCE_INTERVAL_HOURS,
            quote_volume_per_minute: volume_per_minute,
            next_funding_time: None,
            timestamp: Utc::now(),
        };
        if let MockBehavior::Respond(records) = &mut self.behavior {
            records.push(record);
        }
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl FundingSource for MockFundingSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<FundingRecord>, ScanError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Respond(records) => {
                debug!(exchange = %self.id, records = records.len(), "[MOCK] Returning canned records");
                Ok(records.clone())
            }
            MockBehavior::Fail(reason) => Err(ScanError::parse(&self.id, reason.clone())),
        }
    }
}
