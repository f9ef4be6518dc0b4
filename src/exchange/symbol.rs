//! Symbol normalization for cross-exchange matching.
//!
//! Every exchange spells perpetual symbols differently ("BTCUSDT", "BTC-USDT-SWAP",
//! "BTC_USDT", "XBTUSDTM", "BTC/USDT:USDT"). All of them map to one canonical
//! `BASE/QUOTE` string. Canonical input is returned unchanged, so normalization
//! is idempotent.

use super::types::SymbolFormat;

/// Quote assets recognized in concatenated symbols, in match order.
const KNOWN_QUOTES: [&str; 5] = ["USDT", "USDC", "BUSD", "FDUSD", "USD"];

/// Tokens that mark a contract type rather than an asset.
const CONTRACT_TOKENS: [&str; 4] = ["SWAP", "PERP", "PERPETUAL", "PERPS"];

/// Normalize a raw exchange symbol to `BASE/QUOTE`.
///
/// Returns `None` when no base/quote split can be determined.
pub fn normalize_symbol(raw: &str, format: &SymbolFormat) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    // Already canonical (or ccxt-style "BTC/USDT:USDT"): exchange quirks do not apply.
    if let Some((base, rest)) = upper.split_once('/') {
        let quote = rest.split(':').next().unwrap_or(rest);
        return canonical(base, quote);
    }

    let mut symbol = upper.as_str();
    if let Some(prefix) = format.strip_prefix.as_deref() {
        symbol = symbol
            .strip_prefix(prefix.to_uppercase().as_str())
            .unwrap_or(symbol);
    }
    let stripped;
    if let Some(suffix) = format.strip_suffix.as_deref() {
        stripped = symbol
            .strip_suffix(suffix.to_uppercase().as_str())
            .unwrap_or(symbol)
            .to_string();
        symbol = &stripped;
    }

    let tokens: Vec<&str> = symbol
        .split(['-', '_', ':'])
        .filter(|t| !t.is_empty() && !CONTRACT_TOKENS.contains(t))
        .collect();

    match tokens.as_slice() {
        [] => None,
        [single] => split_concatenated(single)
            .or_else(|| {
                format
                    .default_quote
                    .as_deref()
                    .map(|q| (single.to_string(), q.to_uppercase()))
            })
            .and_then(|(base, quote)| canonical(&base, &quote)),
        [base, quote] => canonical(base, quote),
        // Leftover tokens mark another instrument (e.g. a dated future).
        _ => None,
    }
}

/// Split "BTCUSDT" into ("BTC", "USDT") using the known quote list.
fn split_concatenated(symbol: &str) -> Option<(String, String)> {
    KNOWN_QUOTES.iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base.to_string(), quote.to_string()))
    })
}

fn canonical(base: &str, quote: &str) -> Option<String> {
    if base.is_empty() || quote.is_empty() || !is_asset(base) || !is_asset(quote) {
        return None;
    }
    Some(format!("{}/{}", base_alias(base), quote))
}

fn is_asset(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Exchange-specific tickers for the same underlying.
fn base_alias(base: &str) -> &str {
    match base {
        "XBT" => "BTC",
        other => other,
    }
}
