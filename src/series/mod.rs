//! Time-series aggregator: (date, market) grouping into a price matrix.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::FilteredView;

/// Date × market grid of mean prices.
///
/// A (date, market) pair with no observations has no cell: `cell` returns
/// `None`, which downstream consumers must keep distinct from a zero price
/// (a gap in a chart, not a free product).
#[derive(Debug, Clone)]
pub struct TimeSeriesMatrix {
    markets: Vec<String>,
    rows: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
}

/// A dense, serializable rendering of the matrix for exports.
///
/// `values[i][j]` is the mean price at `dates[i]` / `markets[j]`, `null`
/// where the matrix has a gap.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesGrid {
    pub dates: Vec<NaiveDate>,
    pub markets: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl TimeSeriesMatrix {
    /// Row keys in ascending date order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.keys().copied().collect()
    }

    /// Column keys in ascending name order.
    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    /// Mean price for a (date, market) pair, if any observation exists.
    pub fn cell(&self, date: NaiveDate, market: &str) -> Option<f64> {
        self.rows.get(&date)?.get(market).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_grid(&self) -> SeriesGrid {
        let dates = self.dates();
        let values = dates
            .iter()
            .map(|d| {
                self.markets
                    .iter()
                    .map(|m| self.cell(*d, m))
                    .collect::<Vec<_>>()
            })
            .collect();
        SeriesGrid {
            dates,
            markets: self.markets.clone(),
            values,
        }
    }
}

/// Group a view by (date, market) and reduce each group to its mean price.
pub fn build_matrix(view: &FilteredView<'_>) -> TimeSeriesMatrix {
    let mut sums: BTreeMap<NaiveDate, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    let mut markets: BTreeSet<String> = BTreeSet::new();

    for o in view.rows() {
        let cell = sums
            .entry(o.date)
            .or_default()
            .entry(o.market.clone())
            .or_insert((0.0, 0));
        cell.0 += o.price_per_kg;
        cell.1 += 1;
        markets.insert(o.market.clone());
    }

    let rows = sums
        .into_iter()
        .map(|(date, by_market)| {
            let means = by_market
                .into_iter()
                .map(|(market, (sum, n))| (market, sum / n as f64))
                .collect();
            (date, means)
        })
        .collect();

    TimeSeriesMatrix {
        markets: markets.into_iter().collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, FilterSpec, Observation};
    use crate::filter::filter;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(d: NaiveDate, market: &str, price: f64) -> Observation {
        Observation {
            date: d,
            group: "G".to_string(),
            product: "PAPA".to_string(),
            taxonomy_code: "111".to_string(),
            market: market.to_string(),
            price_per_kg: price,
        }
    }

    fn matrix_of(rows: Vec<Observation>) -> TimeSeriesMatrix {
        let ds = Dataset::new(rows);
        let spec = FilterSpec::new(date(2023, 1, 1), date(2023, 12, 31), "PAPA", &[]).unwrap();
        build_matrix(&filter(&ds, &spec))
    }

    #[test]
    fn duplicate_pairs_are_averaged() {
        let m = matrix_of(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 1, 1), "NORTE", 2000.0),
        ]);
        assert_eq!(m.cell(date(2023, 1, 1), "NORTE"), Some(1500.0));
    }

    #[test]
    fn missing_pairs_are_gaps_not_zeros() {
        let m = matrix_of(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 2, 1), "SUR", 2000.0),
        ]);
        assert_eq!(m.cell(date(2023, 1, 1), "SUR"), None);
        assert_eq!(m.cell(date(2023, 2, 1), "NORTE"), None);
        assert_eq!(m.cell(date(2023, 2, 1), "SUR"), Some(2000.0));
    }

    #[test]
    fn axes_are_sorted() {
        let m = matrix_of(vec![
            obs(date(2023, 3, 1), "SUR", 1.0),
            obs(date(2023, 1, 1), "NORTE", 2.0),
            obs(date(2023, 2, 1), "CENTRO", 3.0),
        ]);
        assert_eq!(
            m.dates(),
            vec![date(2023, 1, 1), date(2023, 2, 1), date(2023, 3, 1)]
        );
        assert_eq!(m.markets(), ["CENTRO", "NORTE", "SUR"]);
    }

    #[test]
    fn grid_mirrors_cells_with_nulls_for_gaps() {
        let m = matrix_of(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 2, 1), "SUR", 2000.0),
        ]);
        let grid = m.to_grid();
        assert_eq!(grid.dates.len(), 2);
        assert_eq!(grid.markets, vec!["NORTE", "SUR"]);
        assert_eq!(grid.values[0], vec![Some(1000.0), None]);
        assert_eq!(grid.values[1], vec![None, Some(2000.0)]);
    }
}
