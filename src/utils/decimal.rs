//! Decimal arithmetic and formatting helpers for rates and volumes.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// 8h funding periods in a year (3 per day × 365).
const PERIODS_PER_YEAR_8H: Decimal = dec!(1095);

/// Annualize an 8h-equivalent rate. `None` on overflow.
pub fn annualize_8h(rate: Decimal) -> Option<Decimal> {
    rate.checked_mul(PERIODS_PER_YEAR_8H)
}

/// Calculate basis points (1 bp = 0.01%)
pub fn to_basis_points(rate: Decimal) -> Decimal {
    rate.saturating_mul(dec!(10000))
}

fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a fractional rate as a percentage, e.g. `0.015` -> `"1.5000%"`.
pub fn format_pct(rate: Decimal, decimals: u32) -> String {
    format!(
        "{:.*}%",
        decimals as usize,
        round_half_up(rate.saturating_mul(dec!(100)), decimals)
    )
}

/// Compact dollar amount: `$950`, `$12.3k`, `$1.2M`.
///
/// The unit is chosen after rounding, so `999_950` renders as `$1.0M`.
pub fn format_usd_compact(value: Decimal) -> String {
    let thousands = round_half_up(value / dec!(1_000), 1);
    let dollars = round_half_up(value, 0);

    if thousands >= dec!(1_000) {
        format!("${:.1}M", round_half_up(value / dec!(1_000_000), 1))
    } else if dollars >= dec!(1_000) {
        format!("${:.1}k", thousands)
    } else {
        format!("${:.0}", dollars)
    }
}
