//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the query pipeline
//! - exported to JSON/CSV
//! - reused by future front-ends without dragging IO code along
//!
//! Invariants worth knowing:
//!
//! - every `Observation` in a `Dataset` has a parsed date and a finite,
//!   non-negative price (rows that fail either are dropped at load time, the
//!   only implicit mutation in the whole pipeline)
//! - text fields (`group`, `product`, `market`) are stored already normalized,
//!   so grouping by them is stable across case/whitespace variants of the same
//!   value

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;

/// Normalize a categorical value (`grupo`, `producto`, `mercado`).
///
/// Strips literal `*` markers, trims surrounding whitespace, uppercases.
/// Idempotent: normalizing an already-normalized value is a no-op.
pub fn normalize_value(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|&c| c != '*').collect();
    stripped.trim().to_uppercase()
}

/// One normalized price record.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub group: String,
    pub product: String,
    /// CPC-AC taxonomy code, carried through verbatim.
    pub taxonomy_code: String,
    pub market: String,
    /// Price per kilogram, finite and non-negative.
    pub price_per_kg: f64,
}

/// An immutable, validated collection of observations.
///
/// Built once by `io::ingest` and never mutated afterwards; every query
/// derives ephemeral views from it instead.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Earliest and latest observation dates, if any rows exist.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.observations.iter().map(|o| o.date).min()?;
        let max = self.observations.iter().map(|o| o.date).max()?;
        Some((min, max))
    }
}

/// User-chosen query constraints: date range, product, market subset.
///
/// An empty `markets` set means "all markets available for the product within
/// the range", never "no markets".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub product: String,
    pub markets: BTreeSet<String>,
}

impl FilterSpec {
    /// Build a spec, normalizing the product and market values so comparisons
    /// against stored observations are exact.
    pub fn new(
        date_start: NaiveDate,
        date_end: NaiveDate,
        product: &str,
        markets: &[String],
    ) -> Result<Self, AppError> {
        if date_start > date_end {
            return Err(AppError::new(
                2,
                format!("Invalid date range: start {date_start} is after end {date_end}."),
            ));
        }

        let product = normalize_value(product);
        if product.is_empty() {
            return Err(AppError::new(2, "A product must be selected."));
        }

        let markets: BTreeSet<String> = markets
            .iter()
            .map(|m| normalize_value(m))
            .filter(|m| !m.is_empty())
            .collect();

        Ok(Self {
            date_start,
            date_end,
            product,
            markets,
        })
    }
}

/// The subset of a dataset satisfying a `FilterSpec`.
///
/// Ephemeral: recomputed per query and never persisted or mutated in place.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Observation>,
}

impl<'a> FilteredView<'a> {
    pub fn new(rows: Vec<&'a Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[&'a Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered by (date, market) for tabular output.
    pub fn sorted_rows(&self) -> Vec<&'a Observation> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.market.cmp(&b.market)));
        rows
    }
}

/// Scalar summary statistics computed over a filtered view.
///
/// `variation_pct` is a two-point comparison between the endpoint means, not
/// a trend fit; it is sensitive to noise at either endpoint. It is `None`
/// when the initial price is zero or undefined (never infinite or NaN).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicators {
    pub initial_date: NaiveDate,
    pub final_date: NaiveDate,
    /// Mean price across markets at the earliest date in the view.
    pub initial_price: f64,
    /// Mean price across markets at the latest date in the view.
    pub final_price: f64,
    /// Mean of every retained price in the view.
    pub period_average_price: f64,
    pub variation_pct: Option<f64>,
}
