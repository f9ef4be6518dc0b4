//! Groups per-exchange records by normalized symbol.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use crate::exchange::FundingRecord;

/// Normalized symbol -> one record per exchange, ordered by exchange id.
///
/// Only symbols listed on at least two exchanges are kept.
pub type SymbolBook = BTreeMap<String, Vec<FundingRecord>>;

/// Merge per-exchange record lists into a [`SymbolBook`].
///
/// If the same exchange reports a symbol twice, the later timestamp wins
/// (ties go to the record seen last).
pub fn aggregate<I>(batches: I) -> SymbolBook
where
    I: IntoIterator<Item = Vec<FundingRecord>>,
{
    let mut grouped: BTreeMap<String, BTreeMap<String, FundingRecord>> = BTreeMap::new();
    let mut total = 0usize;

    for record in batches.into_iter().flatten() {
        total += 1;
        let per_exchange = grouped.entry(record.symbol.clone()).or_default();
        match per_exchange.entry(record.exchange_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.timestamp >= slot.get().timestamp {
                    slot.insert(record);
                }
            }
        }
    }

    let symbols_seen = grouped.len();
    let book: SymbolBook = grouped
        .into_iter()
        .filter(|(_, per_exchange)| per_exchange.len() >= 2)
        .map(|(symbol, per_exchange)| (symbol, per_exchange.into_values().collect()))
        .collect();

    debug!(
        records = total,
        symbols_seen,
        cross_listed = book.len(),
        "Aggregated funding records"
    );

    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(exchange: &str, symbol: &str, rate: Decimal) -> FundingRecord {
        FundingRecord {
            exchange_id: exchange.to_string(),
            symbol: symbol.to_string(),
            raw_symbol: symbol.replace('/', ""),
            funding_rate: rate,
            funding_interval_hours: dec!(8),
            quote_volume_per_minute: dec!(10000),
            next_funding_time: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_groups_by_symbol_and_drops_single_listings() {
        let book = aggregate(vec![
            vec![
                record("okx", "BTC/USDT", dec!(0.0001)),
                record("okx", "ONLYOKX/USDT", dec!(0.01)),
            ],
            vec![record("binance", "BTC/USDT", dec!(0.0002))],
            vec![],
        ]);

        assert_eq!(book.len(), 1);
        let btc = &book["BTC/USDT"];
        assert_eq!(btc.len(), 2);
        // Ordered by exchange id.
        assert_eq!(btc[0].exchange_id, "binance");
        assert_eq!(btc[1].exchange_id, "okx");
    }

    #[test]
    fn test_duplicate_exchange_keeps_later_timestamp() {
        let now = Utc::now();
        let mut newer = record("bybit", "ETH/USDT", dec!(0.0005));
        newer.timestamp = now;
        let mut older = record("bybit", "ETH/USDT", dec!(-0.0009));
        older.timestamp = now - Duration::seconds(30);

        let book = aggregate(vec![
            vec![newer],
            vec![older],
            vec![record("gateio", "ETH/USDT", dec!(0.0001))],
        ]);

        let eth = &book["ETH/USDT"];
        assert_eq!(eth.len(), 2);
        let bybit = eth.iter().find(|r| r.exchange_id == "bybit").unwrap();
        assert_eq!(bybit.funding_rate, dec!(0.0005));
    }

    #[test]
    fn test_duplicate_exchange_alone_is_not_cross_listed() {
        let book = aggregate(vec![
            vec![record("mexc", "SOL/USDT", dec!(0.001))],
            vec![record("mexc", "SOL/USDT", dec!(0.002))],
        ]);
        assert!(book.is_empty());
    }
}
