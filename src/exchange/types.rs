//! Normalized records and declarative exchange descriptors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Minutes in a day, used to turn 24h volume into a per-minute average.
pub const MINUTES_PER_DAY: Decimal = dec!(1440);

/// Reference funding period all rates are rescaled to.
pub const REFERENCE_INTERVAL_HOURS: Decimal = dec!(8);

/// One exchange's funding rate and liquidity for one perpetual symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingRecord {
    /// Exchange identifier (e.g., "binance")
    pub exchange_id: String,
    /// Normalized symbol, e.g. "BTC/USDT"
    pub symbol: String,
    /// Symbol in the exchange's native format
    pub raw_symbol: String,
    /// Funding rate rescaled to an 8h-equivalent (signed)
    pub funding_rate: Decimal,
    /// Funding interval the exchange settles on
    pub funding_interval_hours: Decimal,
    /// Average quote volume per minute (USD-equivalent)
    pub quote_volume_per_minute: Decimal,
    /// Next settlement, when the exchange reports it
    pub next_funding_time: Option<DateTime<Utc>>,
    /// When the record was produced
    pub timestamp: DateTime<Utc>,
}

/// How the volume field of an exchange should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    /// 24h turnover already in quote currency
    #[default]
    #[serde(rename = "quote_24h")]
    Quote24h,
    /// 24h volume in base currency; multiplied by `price_field`
    #[serde(rename = "base_24h")]
    Base24h,
    /// Quote volume per minute, used as-is
    QuotePerMinute,
}

/// Unit of the funding interval field when an exchange reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    #[default]
    Hours,
    Minutes,
    Seconds,
    Millis,
}

impl IntervalUnit {
    /// Convert a raw interval value to hours.
    pub fn to_hours(self, value: Decimal) -> Decimal {
        match self {
            IntervalUnit::Hours => value,
            IntervalUnit::Minutes => value / dec!(60),
            IntervalUnit::Seconds => value / dec!(3600),
            IntervalUnit::Millis => value / dec!(3_600_000),
        }
    }
}

/// Exchange-specific symbol quirks stripped before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFormat {
    /// Prefix removed from raw symbols (e.g., "PF_")
    #[serde(default)]
    pub strip_prefix: Option<String>,
    /// Suffix removed from raw symbols (e.g., "M" for "XBTUSDTM")
    #[serde(default)]
    pub strip_suffix: Option<String>,
    /// Quote assumed when the raw symbol only carries a base asset
    #[serde(default)]
    pub default_quote: Option<String>,
}

/// One public GET endpoint and where to find the fields in its body.
///
/// Field locations are JSON pointers (RFC 6901) relative to each list item,
/// e.g. `/lastFundingRate`. `list_pointer` locates the array in the body;
/// an empty pointer means the body itself is the array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Path (and query) appended to the exchange base URL
    pub path: String,
    #[serde(default)]
    pub list_pointer: String,
    pub symbol_field: String,
    #[serde(default)]
    pub rate_field: Option<String>,
    #[serde(default)]
    pub interval_field: Option<String>,
    #[serde(default)]
    pub volume_field: Option<String>,
    #[serde(default)]
    pub price_field: Option<String>,
    /// Next settlement time: epoch seconds or millis, or an RFC 3339 string
    #[serde(default)]
    pub next_funding_field: Option<String>,
}

impl EndpointSpec {
    /// Build an endpoint reading only the symbol; chain the `with_*` setters.
    pub fn new(path: &str, list_pointer: &str, symbol_field: &str) -> Self {
        Self {
            path: path.to_string(),
            list_pointer: list_pointer.to_string(),
            symbol_field: symbol_field.to_string(),
            rate_field: None,
            interval_field: None,
            volume_field: None,
            price_field: None,
            next_funding_field: None,
        }
    }

    pub fn with_rate(mut self, field: &str) -> Self {
        self.rate_field = Some(field.to_string());
        self
    }

    pub fn with_interval(mut self, field: &str) -> Self {
        self.interval_field = Some(field.to_string());
        self
    }

    pub fn with_volume(mut self, field: &str) -> Self {
        self.volume_field = Some(field.to_string());
        self
    }

    pub fn with_price(mut self, field: &str) -> Self {
        self.price_field = Some(field.to_string());
        self
    }

    pub fn with_next_funding(mut self, field: &str) -> Self {
        self.next_funding_field = Some(field.to_string());
        self
    }

    fn pointers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.list_pointer.as_str())
            .chain(std::iter::once(self.symbol_field.as_str()))
            .chain(self.rate_field.as_deref())
            .chain(self.interval_field.as_deref())
            .chain(self.volume_field.as_deref())
            .chain(self.price_field.as_deref())
            .chain(self.next_funding_field.as_deref())
    }
}

/// Declarative description of one exchange's public funding data.
///
/// Every exchange is read by the same generic adapter; only this data differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDescriptor {
    pub id: String,
    pub base_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Endpoints whose rows are merged by raw symbol
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default)]
    pub volume_kind: VolumeKind,
    /// Interval used when no endpoint reports one
    #[serde(default = "default_interval_hours")]
    pub funding_interval_hours: Decimal,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
    #[serde(default)]
    pub symbol: SymbolFormat,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_hours() -> Decimal {
    REFERENCE_INTERVAL_HOURS
}

impl ExchangeDescriptor {
    /// Create an enabled descriptor with 8h funding and 24h quote volume.
    pub fn new(id: &str, base_url: &str, endpoints: Vec<EndpointSpec>) -> Self {
        Self {
            id: id.to_string(),
            base_url: base_url.to_string(),
            enabled: true,
            endpoints,
            volume_kind: VolumeKind::Quote24h,
            funding_interval_hours: REFERENCE_INTERVAL_HOURS,
            interval_unit: IntervalUnit::Hours,
            symbol: SymbolFormat::default(),
        }
    }

    pub fn with_volume_kind(mut self, kind: VolumeKind) -> Self {
        self.volume_kind = kind;
        self
    }

    pub fn with_interval_hours(mut self, hours: Decimal) -> Self {
        self.funding_interval_hours = hours;
        self
    }

    pub fn with_interval_unit(mut self, unit: IntervalUnit) -> Self {
        self.interval_unit = unit;
        self
    }

    pub fn with_symbol_format(mut self, format: SymbolFormat) -> Self {
        self.symbol = format;
        self
    }

    /// Full URL of an endpoint.
    pub fn url(&self, endpoint: &EndpointSpec) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            endpoint.path
        )
    }

    /// Check the descriptor is usable. Called at startup, before any request.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("exchange id must not be empty".to_string());
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| format!("{}: invalid base_url {:?}: {}", self.id, self.base_url, e))?;
        if self.endpoints.is_empty() {
            return Err(format!("{}: at least one endpoint is required", self.id));
        }

        let rate_endpoints = self
            .endpoints
            .iter()
            .filter(|e| e.rate_field.is_some())
            .count();
        if rate_endpoints != 1 {
            return Err(format!(
                "{}: exactly one endpoint must define rate_field (found {})",
                self.id, rate_endpoints
            ));
        }
        if !self.endpoints.iter().any(|e| e.volume_field.is_some()) {
            return Err(format!("{}: no endpoint defines volume_field", self.id));
        }
        if self.volume_kind == VolumeKind::Base24h
            && !self.endpoints.iter().any(|e| e.price_field.is_some())
        {
            return Err(format!(
                "{}: volume_kind base_24h requires a price_field",
                self.id
            ));
        }
        if self.funding_interval_hours <= Decimal::ZERO {
            return Err(format!(
                "{}: funding_interval_hours must be positive",
                self.id
            ));
        }

        for endpoint in &self.endpoints {
            if !endpoint.path.starts_with('/') {
                return Err(format!(
                    "{}: endpoint path {:?} must start with '/'",
                    self.id, endpoint.path
                ));
            }
            if let Some(bad) = endpoint
                .pointers()
                .find(|p| !p.is_empty() && !p.starts_with('/'))
            {
                return Err(format!(
                    "{}: {:?} is not a JSON pointer (must start with '/')",
                    self.id, bad
                ));
            }
            if endpoint.symbol_field.is_empty() {
                return Err(format!("{}: symbol_field must not be empty", self.id));
            }
        }

        Ok(())
    }
}
