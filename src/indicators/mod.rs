//! Indicator engine: scalar summary statistics for a filtered view.

use chrono::NaiveDate;

use crate::domain::{FilteredView, Indicators, Observation};

/// Compute summary indicators over a view.
///
/// Returns `None` for an empty view, which has no initial or final price to
/// report; callers short-circuit instead.
pub fn compute_indicators(view: &FilteredView<'_>) -> Option<Indicators> {
    let rows = view.rows();
    if rows.is_empty() {
        return None;
    }

    let initial_date = rows.iter().map(|o| o.date).min()?;
    let final_date = rows.iter().map(|o| o.date).max()?;

    // Endpoint prices average across every market present at that date, not
    // a single market's value.
    let initial_price = mean_at_date(rows, initial_date);
    let final_price = mean_at_date(rows, final_date);
    let period_average_price = mean(rows.iter().map(|o| o.price_per_kg));

    // Prices are non-negative, so `> 0` is exactly the "zero or undefined"
    // guard; the ratio can never come out infinite or NaN.
    let variation_pct = if initial_price > 0.0 {
        Some((final_price / initial_price - 1.0) * 100.0)
    } else {
        None
    };

    Some(Indicators {
        initial_date,
        final_date,
        initial_price,
        final_price,
        period_average_price,
        variation_pct,
    })
}

fn mean_at_date(rows: &[&Observation], date: NaiveDate) -> f64 {
    mean(
        rows.iter()
            .filter(|o| o.date == date)
            .map(|o| o.price_per_kg),
    )
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 { 0.0 } else { sum / n as f64 }
}
