//! Export query results to CSV/JSON.
//!
//! The CSV export is the filtered observation table, easy to consume in
//! spreadsheets; the JSON export is the "portable" representation of a whole
//! query (indicators + ranking + series grid) for downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{FilteredView, Indicators};
use crate::error::AppError;
use crate::rank::MarketMean;
use crate::series::SeriesGrid;

/// A saved query result (JSON schema).
#[derive(Debug, Clone, Serialize)]
pub struct QueryFile {
    pub tool: String,
    pub source: String,
    pub product: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// Markets the query was restricted to; empty means every market.
    pub markets: Vec<String>,
    pub indicators: Indicators,
    /// Full ranking, most expensive first.
    pub ranking: Vec<MarketMean>,
    pub series: SeriesGrid,
}

/// Write the filtered observation table to a CSV file.
pub fn write_table_csv(path: &Path, view: &FilteredView<'_>) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::runtime(format!(
            "Failed to create export CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(
        file,
        "fecha,mercado,grupo,producto,codigo_cpc_ac,precio_promedio_por_kilogramo"
    )
    .map_err(|e| AppError::runtime(format!("Failed to write export CSV header: {e}")))?;

    for o in view.sorted_rows() {
        writeln!(
            file,
            "{},{},{},{},{},{:.2}",
            o.date, o.market, o.group, o.product, o.taxonomy_code, o.price_per_kg
        )
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Write a query JSON file.
pub fn write_query_json(path: &Path, query: &QueryFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::runtime(format!(
            "Failed to create query JSON '{}': {e}",
            path.display()
        ))
    })?;

    serde_json::to_writer_pretty(file, query)
        .map_err(|e| AppError::runtime(format!("Failed to write query JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, FilterSpec, Observation};
    use crate::filter::filter;
    use crate::rank::rank_markets;
    use crate::series::build_matrix;
    use std::fs;
    use std::path::PathBuf;

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

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn table_csv_has_header_and_sorted_rows() {
        // Out of order on purpose: the export sorts by (date, market).
        let ds = Dataset::new(vec![
            obs(date(2023, 2, 1), "SUR", 2000.5),
            obs(date(2023, 1, 1), "NORTE", 1000.0),
        ]);
        let spec = FilterSpec::new(date(2023, 1, 1), date(2023, 2, 1), "PAPA", &[]).unwrap();
        let view = filter(&ds, &spec);

        let path = scratch("sipsa_export_table_test.csv");
        write_table_csv(&path, &view).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "fecha,mercado,grupo,producto,codigo_cpc_ac,precio_promedio_por_kilogramo"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2023-01-01,NORTE,TUBERCULOS,PAPA,0151,1000.00"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2023-02-01,SUR,TUBERCULOS,PAPA,0151,2000.50"
        );
        assert!(lines.next().is_none());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn query_json_round_trips_with_expected_shape() {
        // One market per date, so the series grid carries gaps.
        let ds = Dataset::new(vec![
            obs(date(2023, 1, 1), "NORTE", 1000.0),
            obs(date(2023, 2, 1), "SUR", 2000.0),
        ]);
        let spec = FilterSpec::new(date(2023, 1, 1), date(2023, 2, 1), "PAPA", &[]).unwrap();
        let view = filter(&ds, &spec);

        let query = QueryFile {
            tool: "sipsa".to_string(),
            source: "test.csv".to_string(),
            product: spec.product.clone(),
            date_start: spec.date_start,
            date_end: spec.date_end,
            markets: Vec::new(),
            indicators: Indicators {
                initial_date: date(2023, 1, 1),
                final_date: date(2023, 2, 1),
                initial_price: 1000.0,
                final_price: 2000.0,
                period_average_price: 1500.0,
                variation_pct: None,
            },
            ranking: rank_markets(&view).entries().to_vec(),
            series: build_matrix(&view).to_grid(),
        };

        let path = scratch("sipsa_export_query_test.json");
        write_query_json(&path, &query).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["tool"], "sipsa");
        assert_eq!(value["product"], "PAPA");
        assert_eq!(value["date_start"], "2023-01-01");
        assert_eq!(value["indicators"]["final_price"], 2000.0);
        // A suppressed variation serializes as null, not as a number.
        assert!(value["indicators"]["variation_pct"].is_null());
        assert_eq!(value["ranking"][0]["market"], "SUR");
        assert_eq!(value["ranking"][0]["mean_price"], 2000.0);
        assert_eq!(value["series"]["markets"], serde_json::json!(["NORTE", "SUR"]));
        // Gap cells stay null so consumers can tell "no data" from zero.
        assert_eq!(value["series"]["values"][0][0], 1000.0);
        assert!(value["series"]["values"][0][1].is_null());

        let _ = fs::remove_file(path);
    }
}
