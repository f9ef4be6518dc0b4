//! Built-in catalog of public funding-rate endpoints.
//!
//! Every entry is plain data and can be replaced wholesale through the
//! `exchanges` key of the config file.

use rust_decimal_macros::dec;

use crate::exchange::{EndpointSpec, ExchangeDescriptor, IntervalUnit, SymbolFormat, VolumeKind};

fn suffix(s: &str) -> SymbolFormat {
    SymbolFormat {
        strip_suffix: Some(s.to_string()),
        ..Default::default()
    }
}

/// Default exchange descriptors (linear USDT perpetuals).
pub fn default_exchanges() -> Vec<ExchangeDescriptor> {
    vec![
        ExchangeDescriptor::new(
            "binance",
            "https://fapi.binance.com",
            vec![
                EndpointSpec::new("/fapi/v1/premiumIndex", "", "/symbol")
                    .with_rate("/lastFundingRate")
                    .with_next_funding("/nextFundingTime"),
                EndpointSpec::new("/fapi/v1/ticker/24hr", "", "/symbol")
                    .with_volume("/quoteVolume"),
                // Lists only symbols whose interval differs from 8h.
                EndpointSpec::new("/fapi/v1/fundingInfo", "", "/symbol")
                    .with_interval("/fundingIntervalHours"),
            ],
        ),
        ExchangeDescriptor::new(
            "bybit",
            "https://api.bybit.com",
            vec![
                EndpointSpec::new("/v5/market/tickers?category=linear", "/result/list", "/symbol")
                    .with_rate("/fundingRate")
                    .with_volume("/turnover24h")
                    .with_next_funding("/nextFundingTime"),
                EndpointSpec::new(
                    "/v5/market/instruments-info?category=linear&limit=1000",
                    "/result/list",
                    "/symbol",
                )
                .with_interval("/fundingInterval"),
            ],
        )
        .with_interval_unit(IntervalUnit::Minutes),
        ExchangeDescriptor::new(
            "okx",
            "https://www.okx.com",
            vec![
                EndpointSpec::new("/api/v5/public/funding-rate?instId=ANY", "/data", "/instId")
                    .with_rate("/fundingRate")
                    .with_next_funding("/fundingTime"),
                EndpointSpec::new("/api/v5/market/tickers?instType=SWAP", "/data", "/instId")
                    .with_volume("/volCcy24h")
                    .with_price("/last"),
            ],
        )
        .with_volume_kind(VolumeKind::Base24h),
        ExchangeDescriptor::new(
            "kucoin",
            "https://api-futures.kucoin.com",
            vec![EndpointSpec::new("/api/v1/contracts/active", "/data", "/symbol")
                .with_rate("/fundingFeeRate")
                .with_interval("/fundingRateGranularity")
                .with_volume("/turnoverOf24h")],
        )
        .with_interval_unit(IntervalUnit::Millis)
        .with_symbol_format(suffix("M")),
        ExchangeDescriptor::new(
            "gateio",
            "https://api.gateio.ws",
            vec![
                EndpointSpec::new("/api/v4/futures/usdt/tickers", "", "/contract")
                    .with_rate("/funding_rate")
                    .with_volume("/volume_24h_quote"),
                EndpointSpec::new("/api/v4/futures/usdt/contracts", "", "/name")
                    .with_interval("/funding_interval")
                    .with_next_funding("/funding_next_apply"),
            ],
        )
        .with_interval_unit(IntervalUnit::Seconds),
        ExchangeDescriptor::new(
            "bitget",
            "https://api.bitget.com",
            vec![EndpointSpec::new(
                "/api/v2/mix/market/tickers?productType=USDT-FUTURES",
                "/data",
                "/symbol",
            )
            .with_rate("/fundingRate")
            .with_volume("/usdtVolume")],
        ),
        ExchangeDescriptor::new(
            "mexc",
            "https://contract.mexc.com",
            vec![EndpointSpec::new("/api/v1/contract/ticker", "/data", "/symbol")
                .with_rate("/fundingRate")
                .with_volume("/amount24")],
        ),
        ExchangeDescriptor::new(
            "htx",
            "https://api.hbdm.com",
            vec![
                EndpointSpec::new("/linear-swap-api/v1/swap_batch_funding_rate", "/data", "/contract_code")
                    .with_rate("/funding_rate"),
                EndpointSpec::new("/linear-swap-ex/market/detail/batch_merged", "/ticks", "/contract_code")
                    .with_volume("/trade_turnover"),
            ],
        ),
        ExchangeDescriptor::new(
            "bingx",
            "https://open-api.bingx.com",
            vec![
                EndpointSpec::new("/openApi/swap/v2/quote/premiumIndex", "/data", "/symbol")
                    .with_rate("/lastFundingRate")
                    .with_next_funding("/nextFundingTime"),
                EndpointSpec::new("/openApi/swap/v2/quote/ticker", "/data", "/symbol")
                    .with_volume("/quoteVolume"),
            ],
        ),
        ExchangeDescriptor::new(
            "bitmart",
            "https://api-cloud-v2.bitmart.com",
            vec![EndpointSpec::new("/contract/public/details", "/data/symbols", "/symbol")
                .with_rate("/funding_rate")
                .with_interval("/funding_interval_hours")
                .with_volume("/turnover_24h")],
        ),
        ExchangeDescriptor::new(
            "coinex",
            "https://api.coinex.com",
            vec![
                EndpointSpec::new("/v2/futures/funding-rate", "/data", "/market")
                    .with_rate("/latest_funding_rate"),
                EndpointSpec::new("/v2/futures/ticker", "/data", "/market").with_volume("/value"),
            ],
        ),
        ExchangeDescriptor::new(
            "xt",
            "https://fapi.xt.com",
            vec![EndpointSpec::new("/future/market/v1/public/cg/contracts", "", "/ticker_id")
                .with_rate("/funding_rate")
                .with_volume("/target_volume")],
        ),
        ExchangeDescriptor::new(
            "lbank",
            "https://lbkperp.lbank.com",
            vec![EndpointSpec::new(
                "/cfd/openApi/v1/pub/marketData?productGroup=SwapU",
                "/data",
                "/symbol",
            )
            .with_rate("/fundingRate")
            .with_volume("/turnover")],
        ),
        ExchangeDescriptor::new(
            "deepcoin",
            "https://api.deepcoin.com",
            vec![
                EndpointSpec::new(
                    "/deepcoin/trade/fund-rate/current-funding-rate?instType=SWAP",
                    "/data/current_fund_rates",
                    "/instrumentId",
                )
                .with_rate("/fundingRate"),
                EndpointSpec::new("/deepcoin/market/tickers?instType=SWAP", "/data", "/instId")
                    .with_volume("/volCcy24h")
                    .with_price("/last"),
            ],
        )
        .with_volume_kind(VolumeKind::Base24h),
        ExchangeDescriptor::new(
            "toobit",
            "https://api.toobit.com",
            vec![
                EndpointSpec::new("/api/v1/futures/fundingRate", "", "/symbol").with_rate("/rate"),
                EndpointSpec::new("/quote/v1/contract/ticker/24hr", "", "/s").with_volume("/qv"),
            ],
        ),
        ExchangeDescriptor::new(
            "bitmex",
            "https://www.bitmex.com",
            vec![EndpointSpec::new("/api/v1/instrument/active", "", "/symbol")
                .with_rate("/fundingRate")
                .with_volume("/foreignNotional24h")
                .with_next_funding("/fundingTimestamp")],
        ),
        ExchangeDescriptor::new(
            "deribit",
            "https://www.deribit.com",
            vec![EndpointSpec::new(
                "/api/v2/public/get_book_summary_by_currency?currency=USDT&kind=future",
                "/result",
                "/instrument_name",
            )
            .with_rate("/funding_8h")
            .with_volume("/volume_usd")],
        )
        .with_interval_hours(dec!(8))
        .with_symbol_format(suffix("-PERPETUAL")),
    ]
}
