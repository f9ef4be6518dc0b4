//! Generic REST adapter driven by an [`ExchangeDescriptor`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::symbol::normalize_symbol;
use super::traits::FundingSource;
use super::types::*;
use crate::error::ScanError;

/// Longest error body kept in a [`ScanError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Build the shared HTTP client used by all adapters.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("funding-spread-scanner/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Fields collected for one raw symbol across an exchange's endpoints.
#[derive(Debug, Default, Clone)]
struct PartialRow {
    rate: Option<Decimal>,
    interval: Option<Decimal>,
    volume: Option<Decimal>,
    price: Option<Decimal>,
    next_funding: Option<DateTime<Utc>>,
}

impl PartialRow {
    fn merge(&mut self, other: PartialRow) {
        self.rate = self.rate.or(other.rate);
        self.interval = self.interval.or(other.interval);
        self.volume = self.volume.or(other.volume);
        self.price = self.price.or(other.price);
        self.next_funding = self.next_funding.or(other.next_funding);
    }
}

/// Reasons a row was skipped while normalizing.
#[derive(Debug, Default)]
struct Rejections {
    bad_symbol: usize,
    missing_rate: usize,
    missing_volume: usize,
    overflow: usize,
}

/// Why a row's volume could not be turned into a per-minute figure.
enum VolumeError {
    Missing,
    Overflow,
}

/// Public market-data client for one exchange.
#[derive(Debug, Clone)]
pub struct RestAdapter {
    http: Client,
    descriptor: ExchangeDescriptor,
}

impl RestAdapter {
    /// Create an adapter with its own HTTP client.
    pub fn new(descriptor: ExchangeDescriptor, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(descriptor, build_http_client(timeout)?))
    }

    /// Create an adapter sharing an existing HTTP client.
    pub fn with_client(descriptor: ExchangeDescriptor, http: Client) -> Self {
        Self { http, descriptor }
    }

    /// GET one endpoint and decode the body as JSON.
    #[instrument(skip(self, endpoint), fields(exchange = %self.descriptor.id, path = %endpoint.path))]
    async fn get_json(&self, endpoint: &EndpointSpec) -> Result<Value, ScanError> {
        let exchange = &self.descriptor.id;
        let url = self.descriptor.url(endpoint);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ScanError::Http {
                exchange: exchange.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Status {
                exchange: exchange.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.text().await.map_err(|source| ScanError::Http {
            exchange: exchange.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|e| ScanError::parse(exchange, e.to_string()))
    }

    /// Turn decoded endpoint bodies (in descriptor order) into records.
    pub fn build_records(
        &self,
        bodies: &[Value],
        now: DateTime<Utc>,
    ) -> Result<Vec<FundingRecord>, ScanError> {
        let d = &self.descriptor;
        let mut rows: BTreeMap<String, PartialRow> = BTreeMap::new();

        for (endpoint, body) in d.endpoints.iter().zip(bodies) {
            for (raw_symbol, row) in extract_rows(&d.id, endpoint, body)? {
                rows.entry(raw_symbol).or_default().merge(row);
            }
        }

        let mut rejections = Rejections::default();
        let mut records = Vec::with_capacity(rows.len());

        for (raw_symbol, row) in rows {
            let Some(symbol) = normalize_symbol(&raw_symbol, &d.symbol) else {
                rejections.bad_symbol += 1;
                continue;
            };
            let Some(rate) = row.rate else {
                rejections.missing_rate += 1;
                continue;
            };
            let volume = match self.volume_per_minute(&row) {
                Ok(volume) => volume,
                Err(VolumeError::Missing) => {
                    rejections.missing_volume += 1;
                    continue;
                }
                Err(VolumeError::Overflow) => {
                    rejections.overflow += 1;
                    continue;
                }
            };

            let interval_hours = row
                .interval
                .map(|v| d.interval_unit.to_hours(v))
                .filter(|h| *h > Decimal::ZERO)
                .unwrap_or(d.funding_interval_hours);

            let funding_rate = if interval_hours == REFERENCE_INTERVAL_HOURS {
                Some(rate)
            } else {
                rate.checked_mul(REFERENCE_INTERVAL_HOURS)
                    .and_then(|v| v.checked_div(interval_hours))
            };
            let Some(funding_rate) = funding_rate else {
                rejections.overflow += 1;
                continue;
            };

            records.push(FundingRecord {
                exchange_id: d.id.clone(),
                symbol,
                raw_symbol,
                funding_rate,
                funding_interval_hours: interval_hours,
                quote_volume_per_minute: volume,
                next_funding_time: row.next_funding,
                timestamp: now,
            });
        }

        debug!(
            exchange = %d.id,
            records = records.len(),
            rejected_bad_symbol = rejections.bad_symbol,
            rejected_missing_rate = rejections.missing_rate,
            rejected_missing_volume = rejections.missing_volume,
            rejected_overflow = rejections.overflow,
            "Normalized exchange response"
        );

        Ok(records)
    }

    fn volume_per_minute(&self, row: &PartialRow) -> Result<Decimal, VolumeError> {
        let volume = row
            .volume
            .filter(|v| *v >= Decimal::ZERO)
            .ok_or(VolumeError::Missing)?;
        let quote_24h = match self.descriptor.volume_kind {
            VolumeKind::Quote24h => volume,
            VolumeKind::Base24h => {
                let price = row.price.ok_or(VolumeError::Missing)?;
                volume.checked_mul(price).ok_or(VolumeError::Overflow)?
            }
            VolumeKind::QuotePerMinute => return Ok(volume),
        };
        quote_24h
            .checked_div(MINUTES_PER_DAY)
            .ok_or(VolumeError::Overflow)
    }
}

#[async_trait]
impl FundingSource for RestAdapter {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    async fn fetch(&self) -> Result<Vec<FundingRecord>, ScanError> {
        let bodies = try_join_all(
            self.descriptor
                .endpoints
                .iter()
                .map(|endpoint| self.get_json(endpoint)),
        )
        .await?;

        self.build_records(&bodies, Utc::now())
    }
}

/// Pull `(raw_symbol, fields)` pairs out of one endpoint body.
fn extract_rows(
    exchange: &str,
    endpoint: &EndpointSpec,
    body: &Value,
) -> Result<Vec<(String, PartialRow)>, ScanError> {
    let items = body
        .pointer(&endpoint.list_pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ScanError::parse(
                exchange,
                format!(
                    "expected an array at {:?} in {}",
                    endpoint.list_pointer, endpoint.path
                ),
            )
        })?;

    let rows = items
        .iter()
        .filter_map(|item| {
            let symbol = item.pointer(&endpoint.symbol_field)?.as_str()?.to_string();
            let field = |f: &Option<String>| f.as_deref().and_then(|p| decimal_at(item, p));
            Some((
                symbol,
                PartialRow {
                    rate: field(&endpoint.rate_field),
                    interval: field(&endpoint.interval_field),
                    volume: field(&endpoint.volume_field),
                    price: field(&endpoint.price_field),
                    next_funding: endpoint
                        .next_funding_field
                        .as_deref()
                        .and_then(|p| timestamp_at(item, p)),
                },
            ))
        })
        .collect();

    Ok(rows)
}

/// Read a decimal that may be encoded as a JSON string or number.
fn decimal_at(item: &Value, pointer: &str) -> Option<Decimal> {
    match item.pointer(pointer)? {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Epoch values at or above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Read a timestamp given as epoch seconds, epoch millis or an RFC 3339 string.
fn timestamp_at(item: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    if let Some(Value::String(s)) = item.pointer(pointer) {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(s.trim()) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    let epoch = decimal_at(item, pointer)?.trunc().to_i64()?;
    if epoch <= 0 {
        return None;
    }
    if epoch >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn two_endpoint_descriptor(base_url: &str) -> ExchangeDescriptor {
        ExchangeDescriptor::new(
            "binance",
            base_url,
            vec![
                EndpointSpec::new("/fapi/v1/premiumIndex", "", "/symbol")
                    .with_rate("/lastFundingRate"),
                EndpointSpec::new("/fapi/v1/ticker/24hr", "", "/symbol")
                    .with_volume("/quoteVolume"),
            ],
        )
    }

    fn adapter(descriptor: ExchangeDescriptor) -> RestAdapter {
        RestAdapter::new(descriptor, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!(parse_decimal("0.0001"), Some(dec!(0.0001)));
        assert_eq!(parse_decimal(" -0.005 "), Some(dec!(-0.005)));
        assert_eq!(parse_decimal("1e-5"), Some(dec!(0.00001)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/a"), None);
    }

    #[test]
    fn test_merges_endpoints_by_raw_symbol() {
        let a = adapter(two_endpoint_descriptor("https://example.com"));
        let rates = json!([
            {"symbol": "BTCUSDT", "lastFundingRate": "0.0001"},
            {"symbol": "ETHUSDT", "lastFundingRate": "-0.0002"},
            {"symbol": "NOVOLUSDT", "lastFundingRate": "0.001"}
        ]);
        let tickers = json!([
            {"symbol": "BTCUSDT", "quoteVolume": "14400000"},
            {"symbol": "ETHUSDT", "quoteVolume": 7200000}
        ]);

        let records = a.build_records(&[rates, tickers], Utc::now()).unwrap();
        assert_eq!(records.len(), 2);

        let btc = records.iter().find(|r| r.symbol == "BTC/USDT").unwrap();
        assert_eq!(btc.exchange_id, "binance");
        assert_eq!(btc.raw_symbol, "BTCUSDT");
        assert_eq!(btc.funding_rate, dec!(0.0001));
        assert_eq!(btc.quote_volume_per_minute, dec!(10000));

        let eth = records.iter().find(|r| r.symbol == "ETH/USDT").unwrap();
        assert_eq!(eth.funding_rate, dec!(-0.0002));
        assert_eq!(eth.quote_volume_per_minute, dec!(5000));
    }

    #[test]
    fn test_hourly_rates_rescaled_to_8h() {
        let d = ExchangeDescriptor::new(
            "hourly",
            "https://example.com",
            vec![EndpointSpec::new("/tickers", "/data", "/name")
                .with_rate("/funding")
                .with_volume("/vol")],
        )
        .with_interval_hours(dec!(1))
        .with_volume_kind(VolumeKind::QuotePerMinute)
        .with_symbol_format(SymbolFormat {
            default_quote: Some("USDT".to_string()),
            ..Default::default()
        });

        let body = json!({"data": [{"name": "SOL", "funding": "0.0001", "vol": "6000"}]});
        let records = adapter(d).build_records(&[body], Utc::now()).unwrap();

        assert_eq!(records[0].symbol, "SOL/USDT");
        assert_eq!(records[0].funding_rate, dec!(0.0008));
        assert_eq!(records[0].funding_interval_hours, dec!(1));
        assert_eq!(records[0].quote_volume_per_minute, dec!(6000));
    }

    #[test]
    fn test_interval_field_and_base_volume() {
        let d = ExchangeDescriptor::new(
            "kucoin",
            "https://example.com",
            vec![EndpointSpec::new("/contracts", "/data", "/symbol")
                .with_rate("/fundingFeeRate")
                .with_interval("/fundingRateGranularity")
                .with_volume("/volumeOf24h")
                .with_price("/markPrice")],
        )
        .with_interval_unit(IntervalUnit::Millis)
        .with_volume_kind(VolumeKind::Base24h)
        .with_symbol_format(SymbolFormat {
            strip_suffix: Some("M".to_string()),
            ..Default::default()
        });

        let body = json!({"code": "200000", "data": [
            {"symbol": "XBTUSDTM", "fundingFeeRate": 0.0002,
             "fundingRateGranularity": 14400000, "volumeOf24h": 144, "markPrice": 50000},
            {"symbol": "ETHUSDTM", "fundingFeeRate": 0.0001,
             "fundingRateGranularity": 28800000, "volumeOf24h": 10}
        ]});
        let records = adapter(d).build_records(&[body], Utc::now()).unwrap();

        // ETH has no price so its base volume cannot be converted.
        assert_eq!(records.len(), 1);
        let btc = &records[0];
        assert_eq!(btc.symbol, "BTC/USDT");
        assert_eq!(btc.funding_interval_hours, dec!(4));
        assert_eq!(btc.funding_rate, dec!(0.0004));
        assert_eq!(btc.quote_volume_per_minute, dec!(5000));
    }

    #[test]
    fn test_missing_list_is_parse_error() {
        let a = adapter(two_endpoint_descriptor("https://example.com"));
        let err = a
            .build_records(&[json!({"code": -1, "msg": "busy"}), json!([])], Utc::now())
            .unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }

    #[test]
    fn test_overflowing_rows_are_rejected() {
        let base = ExchangeDescriptor::new(
            "okx",
            "https://example.com",
            vec![EndpointSpec::new("/tickers", "/data", "/instId")
                .with_rate("/fundingRate")
                .with_volume("/volCcy24h")
                .with_price("/last")],
        )
        .with_volume_kind(VolumeKind::Base24h);

        let body = json!({"data": [
            {"instId": "BTC-USDT-SWAP", "fundingRate": "0.0001", "volCcy24h": "1e20", "last": "1e10"},
            {"instId": "ETH-USDT-SWAP", "fundingRate": "0.0002", "volCcy24h": "1440", "last": "2000"}
        ]});
        let records = adapter(base).build_records(&[body], Utc::now()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "ETH/USDT");
        assert_eq!(records[0].quote_volume_per_minute, dec!(2000));

        let millis = ExchangeDescriptor::new(
            "kucoin",
            "https://example.com",
            vec![EndpointSpec::new("/contracts", "/data", "/symbol")
                .with_rate("/fundingFeeRate")
                .with_interval("/granularity")
                .with_volume("/turnover")],
        )
        .with_interval_unit(IntervalUnit::Millis)
        .with_symbol_format(SymbolFormat {
            strip_suffix: Some("M".to_string()),
            ..Default::default()
        });

        let body = json!({"data": [
            {"symbol": "XBTUSDTM", "fundingFeeRate": "1e22", "granularity": 1, "turnover": "1440"},
            {"symbol": "ETHUSDTM", "fundingFeeRate": "0.0001", "granularity": 28800000, "turnover": "1440"}
        ]});
        let records = adapter(millis).build_records(&[body], Utc::now()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "ETH/USDT");
        assert_eq!(records[0].funding_rate, dec!(0.0001));
    }

    #[test]
    fn test_next_funding_time_forms() {
        let d = ExchangeDescriptor::new(
            "mixed",
            "https://example.com",
            vec![EndpointSpec::new("/tickers", "", "/symbol")
                .with_rate("/rate")
                .with_volume("/vol")
                .with_next_funding("/next")],
        );
        let body = json!([
            {"symbol": "BTCUSDT", "rate": "0.0001", "vol": "1440", "next": 1767225600000_i64},
            {"symbol": "ETHUSDT", "rate": "0.0001", "vol": "1440", "next": "1767225600"},
            {"symbol": "SOLUSDT", "rate": "0.0001", "vol": "1440", "next": "2026-01-01T00:00:00.000Z"},
            {"symbol": "XRPUSDT", "rate": "0.0001", "vol": "1440", "next": "soon"},
            {"symbol": "ADAUSDT", "rate": "0.0001", "vol": "1440"}
        ]);
        let records = adapter(d).build_records(&[body], Utc::now()).unwrap();
        let next = |symbol: &str| {
            records
                .iter()
                .find(|r| r.symbol == symbol)
                .unwrap()
                .next_funding_time
        };

        let expected = DateTime::from_timestamp(1_767_225_600, 0);
        assert_eq!(next("BTC/USDT"), expected);
        assert_eq!(next("ETH/USDT"), expected);
        assert_eq!(next("SOL/USDT"), expected);
        assert_eq!(next("XRP/USDT"), None);
        assert_eq!(next("ADA/USDT"), None);
    }

    #[tokio::test]
    async fn test_fetch_from_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/premiumIndex"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "BTCUSDT", "lastFundingRate": "0.0003"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/24hr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "BTCUSDT", "quoteVolume": "1440000"}
            ])))
            .mount(&server)
            .await;

        let a = adapter(two_endpoint_descriptor(&server.uri()));
        let records = a.fetch().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].funding_rate, dec!(0.0003));
        assert_eq!(records[0].quote_volume_per_minute, dec!(1000));
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = adapter(two_endpoint_descriptor(&server.uri()))
            .fetch()
            .await
            .unwrap_err();

        match err {
            ScanError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = adapter(two_endpoint_descriptor(&server.uri()))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_slow_exchange_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let a = RestAdapter::new(
            two_endpoint_descriptor(&server.uri()),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = a.fetch().await.unwrap_err();
        assert!(matches!(err, ScanError::Http { .. }));
    }
}
