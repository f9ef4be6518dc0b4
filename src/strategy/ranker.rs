//! Threshold filtering and ranking of opportunities.

use rust_decimal::Decimal;
use std::cmp::Ordering;
use tracing::{info, trace};

use super::spread::Opportunity;
use crate::utils::decimal::to_basis_points;

/// Minimums an opportunity must meet. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub spread: Decimal,
    pub volume: Decimal,
}

/// Reasons an opportunity is filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectReason {
    NarrowSpread,
    LowVolume,
}

fn check(opportunity: &Opportunity, thresholds: &Thresholds) -> Result<(), RejectReason> {
    if opportunity.spread < thresholds.spread {
        return Err(RejectReason::NarrowSpread);
    }
    if opportunity.min_volume < thresholds.volume {
        return Err(RejectReason::LowVolume);
    }
    Ok(())
}

/// Keep opportunities meeting both thresholds, sorted by spread descending.
/// Equal spreads are ordered by symbol ascending.
pub fn filter_and_rank(opportunities: Vec<Opportunity>, thresholds: &Thresholds) -> Vec<Opportunity> {
    let total = opportunities.len();
    let mut rejected_narrow_spread = 0usize;
    let mut rejected_low_volume = 0usize;

    let mut kept: Vec<Opportunity> = opportunities
        .into_iter()
        .filter(|opp| match check(opp, thresholds) {
            Ok(()) => true,
            Err(reason) => {
                trace!(symbol = %opp.symbol, ?reason, spread = %opp.spread, "Filtered out");
                match reason {
                    RejectReason::NarrowSpread => rejected_narrow_spread += 1,
                    RejectReason::LowVolume => rejected_low_volume += 1,
                }
                false
            }
        })
        .collect();

    kept.sort_by(rank_order);

    info!(
        candidates = total,
        passed = kept.len(),
        rejected_narrow_spread,
        rejected_low_volume,
        best_spread_bps = %kept.first().map(|o| to_basis_points(o.spread)).unwrap_or_default(),
        "Opportunities ranked"
    );

    kept
}

fn rank_order(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.spread
        .cmp(&a.spread)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// First `n` entries of an already ranked list.
pub fn top_n(ranked: &[Opportunity], n: usize) -> &[Opportunity] {
    &ranked[..n.min(ranked.len())]
}
