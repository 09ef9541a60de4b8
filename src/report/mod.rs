//! Plain-text reports for the terminal front-end.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::path::Path;

use crate::domain::{FilterSpec, FilteredView, Indicators};
use crate::io::ingest::IngestedData;
use crate::rank::{MarketMean, Ranking};
use crate::series::TimeSeriesMatrix;

/// Shown when a filter combination matches nothing. Recoverable: the user
/// adjusts the filters and retries.
pub const NO_MATCH_NOTICE: &str =
    "No observations match the selected filters (dates, product, markets). \
     Try a wider date range or a different product.";

/// Format the run summary (source, row accounting, span, active filter).
pub fn format_run_summary(path: &Path, data: &IngestedData, spec: &FilterSpec) -> String {
    let mut out = String::new();

    out.push_str("=== sipsa - Food Price Explorer (SIPSA-P) ===\n");
    out.push_str(&format!("Source: {}\n", path.display()));
    out.push_str(&format!(
        "Rows: read={} used={} dropped={}\n",
        data.rows_read,
        data.rows_used,
        data.rows_dropped()
    ));
    out.push_str(&format!(
        "Span: {} .. {} | products={} | markets={}\n",
        data.stats.date_min, data.stats.date_max, data.stats.n_products, data.stats.n_markets
    ));

    let market_label = if spec.markets.is_empty() {
        "all".to_string()
    } else {
        format!("{} selected", spec.markets.len())
    };
    out.push_str(&format!(
        "Filter: product={} | dates=[{} .. {}] | markets={market_label}\n",
        spec.product, spec.date_start, spec.date_end
    ));

    out
}

/// Format the indicator block.
pub fn format_indicators(ind: &Indicators) -> String {
    let mut out = String::new();

    out.push_str("Indicators:\n");
    out.push_str(&format!(
        "- initial price ({})  : {} / kg\n",
        ind.initial_date,
        fmt_price(ind.initial_price)
    ));
    out.push_str(&format!(
        "- final price   ({})  : {} / kg\n",
        ind.final_date,
        fmt_price(ind.final_price)
    ));
    out.push_str(&format!(
        "- period average          : {} / kg\n",
        fmt_price(ind.period_average_price)
    ));
    match ind.variation_pct {
        Some(v) => out.push_str(&format!("- variation first..last   : {v:+.1} %\n")),
        None => out.push_str("- variation first..last   : n/a (initial price is zero)\n"),
    }

    out
}

/// Format the most-expensive / cheapest market tables.
pub fn format_ranking(ranking: &Ranking) -> String {
    let k = ranking.k();
    let mut out = String::new();

    out.push_str(&format!("Top {k} most expensive markets:\n"));
    out.push_str(&format_market_table(ranking.most_expensive()));
    out.push('\n');

    out.push_str(&format!("Top {k} cheapest markets:\n"));
    out.push_str(&format_market_table(&ranking.cheapest()));

    // With more markets than the ranking depth, also show the full order.
    if ranking.len() > k {
        out.push('\n');
        out.push_str(&format!(
            "All {} markets (most expensive first):\n",
            ranking.len()
        ));
        out.push_str(&format_market_table(ranking.entries()));
    }

    out
}

fn format_market_table(rows: &[MarketMean]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<28} {:>14}\n", "market", "mean $/kg"));
    out.push_str(&format!("{:-<28} {:-<14}\n", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:<28} {:>14}\n",
            truncate(&r.market, 28),
            fmt_price(r.mean_price)
        ));
    }
    out
}

/// Format the date × market matrix; gaps render as `-`, never as zero.
pub fn format_matrix(matrix: &TimeSeriesMatrix) -> String {
    let mut out = String::new();

    out.push_str(&format!("{:<12}", "date"));
    for market in matrix.markets() {
        out.push_str(&format!(" {:>14}", truncate(market, 14)));
    }
    out.push('\n');

    for date in matrix.dates() {
        out.push_str(&format!("{:<12}", date.to_string()));
        for market in matrix.markets() {
            match matrix.cell(date, market) {
                Some(v) => out.push_str(&format!(" {:>14}", fmt_price(v))),
                None => out.push_str(&format!(" {:>14}", "-")),
            }
        }
        out.push('\n');
    }

    out
}

/// Format the filtered table for quick inspection, sorted by (date, market).
pub fn format_observation_table(view: &FilteredView<'_>) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<12} {:<24} {:<18} {:<20} {:<12} {:>12}\n",
        "fecha", "mercado", "grupo", "producto", "codigo_cpc", "$/kg"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<24} {:-<18} {:-<20} {:-<12} {:-<12}\n",
        "", "", "", "", "", ""
    ));

    for o in view.sorted_rows() {
        out.push_str(&format!(
            "{:<12} {:<24} {:<18} {:<20} {:<12} {:>12}\n",
            o.date.to_string(),
            truncate(&o.market, 24),
            truncate(&o.group, 18),
            truncate(&o.product, 20),
            truncate(&o.taxonomy_code, 12),
            fmt_price(o.price_per_kg),
        ));
    }

    out
}

/// Whole pesos with `.` thousands separators, the way SIPSA bulletins quote
/// prices.
fn fmt_price(v: f64) -> String {
    let digits = (v.round() as i64).to_string();
    let mut out = String::from("$");
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, FilterSpec, Observation};
    use crate::filter::filter;
    use crate::rank::rank_markets;
    use crate::series::build_matrix;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(d: NaiveDate, market: &str, price: f64) -> Observation {
        Observation {
            date: d,
            group: "TUBERCULOS".to_string(),
            product: "PAPA".to_string(),
            taxonomy_code: "0151".to_string(),
            market: market.to_string(),
            price_per_kg: price,
        }
    }

    #[test]
    fn fmt_price_groups_thousands_with_dots() {
        assert_eq!(fmt_price(0.0), "$0");
        assert_eq!(fmt_price(950.4), "$950");
        assert_eq!(fmt_price(2500.0), "$2.500");
        assert_eq!(fmt_price(1234567.0), "$1.234.567");
    }

    #[test]
    fn ranking_report_labels_both_ends() {
        let ds = Dataset::new(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 1, 1), "SUR", 2000.0),
        ]);
        let spec = FilterSpec::new(date(2023, 1, 1), date(2023, 1, 1), "PAPA", &[]).unwrap();
        let text = format_ranking(&rank_markets(&filter(&ds, &spec)));

        assert!(text.contains("Top 2 most expensive markets:"));
        assert!(text.contains("Top 2 cheapest markets:"));
        assert!(text.contains("$2.000"));
    }

    #[test]
    fn matrix_report_renders_gaps_as_dashes() {
        let ds = Dataset::new(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 2, 1), "SUR", 2000.0),
        ]);
        let spec = FilterSpec::new(date(2023, 1, 1), date(2023, 2, 1), "PAPA", &[]).unwrap();
        let text = format_matrix(&build_matrix(&filter(&ds, &spec)));

        // NORTE has a value in January, SUR does not: its cell is a dash.
        let line = text.lines().find(|l| l.starts_with("2023-01-01")).unwrap();
        assert!(line.contains("$1.000"));
        assert!(line.trim_end().ends_with('-'));
        assert!(!text.contains("$0"));
    }
}
