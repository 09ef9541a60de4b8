//! Filter stage: restrict a dataset to a date range, product, and market subset.
//!
//! The predicates are independent, so their order does not change the result.
//! It is still fixed (date, then product, then market) because the market
//! *options* offered to a user are computed from the product-and-date-filtered
//! subset, not from the full dataset (see `available_markets`).

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{Dataset, FilterSpec, FilteredView, normalize_value};

/// Apply a `FilterSpec`, producing an ephemeral borrowed view.
///
/// An empty `spec.markets` keeps every market; a non-empty set keeps only its
/// members. An empty result is a normal outcome, not an error; callers
/// short-circuit on `view.is_empty()`.
pub fn filter<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> FilteredView<'a> {
    let rows = dataset
        .observations()
        .iter()
        .filter(|o| spec.date_start <= o.date && o.date <= spec.date_end)
        .filter(|o| o.product == spec.product)
        .filter(|o| spec.markets.is_empty() || spec.markets.contains(&o.market))
        .collect();
    FilteredView::new(rows)
}

/// Distinct product names in the dataset, sorted.
pub fn available_products(dataset: &Dataset) -> Vec<String> {
    let set: BTreeSet<&str> = dataset
        .observations()
        .iter()
        .map(|o| o.product.as_str())
        .filter(|p| !p.is_empty())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// Distinct market names carrying the product within the date range, sorted.
///
/// This is what a market selector should offer: only markets that actually
/// have observations for the current product/date selection.
pub fn available_markets(
    dataset: &Dataset,
    product: &str,
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> Vec<String> {
    let product = normalize_value(product);
    let set: BTreeSet<&str> = dataset
        .observations()
        .iter()
        .filter(|o| date_start <= o.date && o.date <= date_end)
        .filter(|o| o.product == product)
        .map(|o| o.market.as_str())
        .filter(|m| !m.is_empty())
        .collect();
    set.into_iter().map(str::to_string).collect()
}
