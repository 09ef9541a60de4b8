//! Ranking engine: markets ordered by mean price within a view.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::FilteredView;

/// How many markets each end of the ranking shows.
pub const RANKING_DEPTH: usize = 10;

/// One market's mean price over the filtered period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketMean {
    pub market: String,
    pub mean_price: f64,
}

/// Markets sorted by mean price, most expensive first.
///
/// Ties are broken by market name ascending, so the order is fully
/// deterministic. Derived per query, never stored.
#[derive(Debug, Clone)]
pub struct Ranking {
    entries: Vec<MarketMean>,
}

impl Ranking {
    pub fn entries(&self) -> &[MarketMean] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effective depth: `min(RANKING_DEPTH, distinct market count)`.
    pub fn k(&self) -> usize {
        self.entries.len().min(RANKING_DEPTH)
    }

    /// Head of the descending order: the `k()` most expensive markets.
    pub fn most_expensive(&self) -> &[MarketMean] {
        &self.entries[..self.k()]
    }

    /// Tail of the descending order, re-sorted ascending (cheapest first)
    /// for presentation.
    ///
    /// With 10 or fewer markets this overlaps `most_expensive`; expected,
    /// not an error.
    pub fn cheapest(&self) -> Vec<MarketMean> {
        let k = self.k();
        let mut tail: Vec<MarketMean> = self.entries[self.entries.len() - k..].to_vec();
        tail.sort_by(|a, b| {
            a.mean_price
                .partial_cmp(&b.mean_price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.market.cmp(&b.market))
        });
        tail
    }
}

/// Group a view by market and rank the per-market mean prices.
pub fn rank_markets(view: &FilteredView<'_>) -> Ranking {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for o in view.rows() {
        let cell = sums.entry(o.market.clone()).or_insert((0.0, 0));
        cell.0 += o.price_per_kg;
        cell.1 += 1;
    }

    let mut entries: Vec<MarketMean> = sums
        .into_iter()
        .map(|(market, (sum, n))| MarketMean {
            market,
            mean_price: sum / n as f64,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.mean_price
            .partial_cmp(&a.mean_price)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.market.cmp(&b.market))
    });

    Ranking { entries }
}
