//! Cross-exchange funding spread calculation.
//!
//! Convention: the spread is the absolute 8h-equivalent rate difference.
//! The lower-rate exchange is the long leg and the higher-rate exchange the
//! short leg, so the position collects (or pays least) funding on both sides.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::aggregator::SymbolBook;
use crate::exchange::FundingRecord;
use crate::utils::decimal::annualize_8h;

/// Best funding spread found for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub symbol: String,
    /// Exchange with the lower funding rate (go long here)
    pub exchange_long: String,
    /// Exchange with the higher funding rate (go short here)
    pub exchange_short: String,
    pub long_rate: Decimal,
    pub short_rate: Decimal,
    /// short_rate - long_rate, never negative
    pub spread: Decimal,
    pub annualized_spread: Decimal,
    /// Smaller of the two legs' quote volume per minute
    pub min_volume: Decimal,
    pub long_volume: Decimal,
    pub short_volume: Decimal,
    pub long_next_funding: Option<DateTime<Utc>>,
    pub short_next_funding: Option<DateTime<Utc>>,
    /// The legs settle funding on different intervals
    pub asymmetric_interval: bool,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Build from two records of the same symbol; orders the legs by rate.
    ///
    /// Returns `None` when the spread does not fit in a `Decimal`.
    pub fn from_pair(
        a: &FundingRecord,
        b: &FundingRecord,
        detected_at: DateTime<Utc>,
    ) -> Option<Self> {
        let (long, short) = if a.funding_rate <= b.funding_rate {
            (a, b)
        } else {
            (b, a)
        };
        let spread = short.funding_rate.checked_sub(long.funding_rate)?;

        Some(Self {
            symbol: long.symbol.clone(),
            exchange_long: long.exchange_id.clone(),
            exchange_short: short.exchange_id.clone(),
            long_rate: long.funding_rate,
            short_rate: short.funding_rate,
            spread,
            annualized_spread: annualize_8h(spread)?,
            min_volume: long
                .quote_volume_per_minute
                .min(short.quote_volume_per_minute),
            long_volume: long.quote_volume_per_minute,
            short_volume: short.quote_volume_per_minute,
            long_next_funding: long.next_funding_time,
            short_next_funding: short.next_funding_time,
            asymmetric_interval: long.funding_interval_hours != short.funding_interval_hours,
            detected_at,
        })
    }
}

/// One unfiltered opportunity per cross-listed symbol: the exchange pair with
/// the largest absolute spread. Ties keep the first pair in exchange order.
pub fn compute(book: &SymbolBook, detected_at: DateTime<Utc>) -> Vec<Opportunity> {
    book.values()
        .filter_map(|records| best_pair(records))
        .filter_map(|(a, b)| Opportunity::from_pair(a, b, detected_at))
        .collect()
}

fn best_pair(records: &[FundingRecord]) -> Option<(&FundingRecord, &FundingRecord)> {
    let mut best: Option<(&FundingRecord, &FundingRecord, Decimal)> = None;

    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            // Pairs whose difference overflows cannot be priced.
            let Some(spread) = a.funding_rate.checked_sub(b.funding_rate).map(|d| d.abs()) else {
                continue;
            };
            if best.map_or(true, |(_, _, current)| spread > current) {
                best = Some((a, b, spread));
            }
        }
    }

    best.map(|(a, b, _)| (a, b))
}
