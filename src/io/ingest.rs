//! CSV ingest and normalization.
//!
//! This module turns the consolidated SIPSA master CSV into a clean,
//! immutable `Dataset` that the rest of the pipeline can group and aggregate
//! without re-checking anything.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level tolerance**: rows with unparseable dates or prices are
//!   dropped silently, but counted and reported for observability
//! - **Deterministic behavior** (fixed date formats, no locale guessing)
//! - **Separation of concerns**: no filtering or aggregation logic here

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{Dataset, Observation, normalize_value};
use crate::error::AppError;

/// Required columns, after header normalization.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "fecha",
    "grupo",
    "producto",
    "codigo_cpc_ac",
    "mercado",
    "precio_promedio_por_kilogramo",
];

/// Summary stats about the observations actually retained.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_observations: usize,
    pub date_min: NaiveDate,
    pub date_max: NaiveDate,
    pub n_products: usize,
    pub n_markets: usize,
    pub price_min: f64,
    pub price_max: f64,
}

/// A row-level problem encountered during ingest.
///
/// These never fail the load; they are surfaced in the run summary so a
/// dirty source is visible without being fatal.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the dataset + stats + dropped-row accounting.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

impl IngestedData {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_used
    }
}

/// Load and normalize the master CSV at `path`.
pub fn read_dataset(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::source_unavailable(format!(
            "Failed to open source CSV '{}': {e}",
            path.display()
        ))
    })?;
    ingest_reader(file, &path.display().to_string())
}

/// Ingest from any reader; `label` names the source in error messages.
pub fn ingest_reader<R: Read>(reader: R, label: &str) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::source_unavailable(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map, label)?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = observations.len();
    let stats = compute_stats(&observations).ok_or_else(|| {
        AppError::empty_dataset(format!(
            "'{label}' loaded, but no observations survived normalization \
             ({rows_read} rows read, all dropped)."
        ))
    })?;

    Ok(IngestedData {
        dataset: Dataset::new(observations),
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, schema validation will
    // incorrectly report the `fecha` column as missing.
    //
    // `*` markers go before the trim so "Mercado *" ends up as "mercado",
    // not "mercado_".
    let name = name.trim_start_matches('\u{feff}').replace('*', "");
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

fn ensure_required_columns_exist(
    header_map: &HashMap<String, usize>,
    label: &str,
) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !header_map.contains_key(*col))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::source_unavailable(format!(
        "'{label}' does not match the expected schema. Missing column(s): {}.",
        missing.join(", ")
    )))
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Observation, String> {
    // Only the date and the price gate admission; the text fields may be
    // blank and still group as their own key.
    let date = parse_date(get_required(record, header_map, "fecha")?)?;

    let price_raw = get_required(record, header_map, "precio_promedio_por_kilogramo")?;
    let price_per_kg = parse_price(price_raw)
        .ok_or_else(|| format!("Invalid `precio_promedio_por_kilogramo` value '{price_raw}'."))?;

    let group = normalize_value(get_optional(record, header_map, "grupo").unwrap_or(""));
    let product = normalize_value(get_optional(record, header_map, "producto").unwrap_or(""));
    let market = normalize_value(get_optional(record, header_map, "mercado").unwrap_or(""));
    let taxonomy_code = get_optional(record, header_map, "codigo_cpc_ac")
        .unwrap_or("")
        .to_string();

    Ok(Observation {
        date,
        group,
        product,
        taxonomy_code,
        market,
        price_per_kg,
    })
}

fn compute_stats(observations: &[Observation]) -> Option<DatasetStats> {
    let mut date_min: Option<NaiveDate> = None;
    let mut date_max: Option<NaiveDate> = None;
    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut products: BTreeSet<&str> = BTreeSet::new();
    let mut markets: BTreeSet<&str> = BTreeSet::new();

    for o in observations {
        date_min = Some(date_min.map_or(o.date, |d| d.min(o.date)));
        date_max = Some(date_max.map_or(o.date, |d| d.max(o.date)));
        price_min = price_min.min(o.price_per_kg);
        price_max = price_max.max(o.price_per_kg);
        products.insert(&o.product);
        markets.insert(&o.market);
    }

    Some(DatasetStats {
        n_observations: observations.len(),
        date_min: date_min?,
        date_max: date_max?,
        n_products: products.len(),
        n_markets: markets.len(),
        price_min,
        price_max,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // The master table uses ISO dates, but upstream exports occasionally show
    // up with `DD/MM/YYYY` variants or a time component. We accept a small
    // fixed set of formats to reduce friction while keeping parsing
    // deterministic.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

/// Coerce a price cell. Non-numeric, non-finite, and negative values are all
/// treated as absent, which drops the row.
fn parse_price(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "fecha,grupo,producto,codigo_cpc_ac,mercado,precio_promedio_por_kilogramo";

    fn ingest(csv: &str) -> Result<IngestedData, AppError> {
        ingest_reader(csv.as_bytes(), "test.csv")
    }

    #[test]
    fn normalize_header_name_handles_bom_spaces_and_markers() {
        assert_eq!(normalize_header_name("\u{feff}Fecha"), "fecha");
        assert_eq!(
            normalize_header_name(" Precio Promedio Por Kilogramo* "),
            "precio_promedio_por_kilogramo"
        );
        assert_eq!(normalize_header_name("Mercado *"), "mercado");
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        for s in ["2023-01-15", "15/01/2023", "15-01-2023", "2023/01/15", "2023-01-15 00:00:00"] {
            assert_eq!(parse_date(s).unwrap(), expected, "format: {s}");
        }
        assert!(parse_date("15 de enero").is_err());
    }

    #[test]
    fn parse_price_rejects_garbage_and_negatives() {
        assert_eq!(parse_price("1234.5"), Some(1234.5));
        assert_eq!(parse_price("0"), Some(0.0));
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_price("-10"), None);
        assert_eq!(parse_price("inf"), None);
    }

    #[test]
    fn retained_rows_satisfy_the_post_load_invariant() {
        let csv = format!(
            "{HEADER}\n\
             2023-01-01,TUBERCULOS, papa criolla ,01234,Plaza Minorista*,2500\n\
             not-a-date,TUBERCULOS,PAPA,01234,PLAZA,1000\n\
             2023-01-02,TUBERCULOS,PAPA,01234,PLAZA,sin dato\n\
             2023-01-03,TUBERCULOS,PAPA,01234,PLAZA,-5\n\
             2023-01-04,TUBERCULOS,PAPA,01234,PLAZA,1800\n"
        );
        let data = ingest(&csv).unwrap();

        assert_eq!(data.rows_read, 5);
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.rows_dropped(), 3);
        assert_eq!(data.row_errors.len(), 3);
        assert_eq!(data.row_errors[0].line, 3);

        for o in data.dataset.observations() {
            assert!(o.price_per_kg.is_finite() && o.price_per_kg >= 0.0);
        }
        // Values come out normalized.
        assert_eq!(data.dataset.observations()[0].product, "PAPA CRIOLLA");
        assert_eq!(data.dataset.observations()[0].market, "PLAZA MINORISTA");
    }

    #[test]
    fn stats_cover_span_and_distinct_counts() {
        let csv = format!(
            "{HEADER}\n\
             2023-01-01,G,ARROZ,111,NORTE,1000\n\
             2023-03-01,G,ARROZ,111,SUR,2000\n\
             2023-02-01,G,PAPA,222,NORTE,500\n"
        );
        let data = ingest(&csv).unwrap();
        assert_eq!(data.stats.n_observations, 3);
        assert_eq!(data.stats.date_min, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(data.stats.date_max, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(data.stats.n_products, 2);
        assert_eq!(data.stats.n_markets, 2);
        assert_eq!(data.stats.price_min, 500.0);
        assert_eq!(data.stats.price_max, 2000.0);
    }

    #[test]
    fn missing_columns_fail_schema_validation() {
        let err = ingest("fecha,producto,precio_promedio_por_kilogramo\n2023-01-01,PAPA,100\n")
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let message = err.to_string();
        assert!(message.contains("grupo"));
        assert!(message.contains("mercado"));
    }

    #[test]
    fn irregular_headers_are_normalized_before_validation() {
        let csv = "\u{feff}Fecha,Grupo,Producto,Codigo CPC AC,Mercado,Precio Promedio Por Kilogramo*\n\
                   2023-01-01,G,PAPA,111,NORTE,900\n";
        let data = ingest(csv).unwrap();
        assert_eq!(data.rows_used, 1);
    }

    #[test]
    fn all_rows_dropped_is_a_distinct_empty_dataset_error() {
        let csv = format!("{HEADER}\nbad,G,PAPA,111,NORTE,abc\n");
        let err = ingest(&csv).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
