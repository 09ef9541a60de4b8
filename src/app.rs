//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads (and memoizes) the master dataset
//! - runs the query pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, QueryArgs, SourceArgs};
use crate::domain::{Dataset, FilterSpec};
use crate::error::AppError;
use crate::io::loader::{self, LoadedSource};

pub mod pipeline;

/// Entry point for the `sipsa` binary.
pub fn run() -> Result<(), AppError> {
    // We want `sipsa` and `sipsa -p ARROZ` to behave like `sipsa query ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the one-shot UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    match cli.command {
        Command::Query(args) => handle_query(args),
        Command::Products(args) => handle_products(args),
        Command::Markets(args) => handle_markets(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn handle_query(args: QueryArgs) -> Result<(), AppError> {
    let source = loader::load(args.source.file.as_deref())?;
    let spec = resolve_spec(&source, &args)?;

    println!(
        "{}",
        crate::report::format_run_summary(&source.path, &source.data, &spec)
    );

    let Some(run) = pipeline::run_query(&source.data.dataset, &spec) else {
        println!("{}", crate::report::NO_MATCH_NOTICE);
        return Ok(());
    };

    println!("{}", crate::report::format_indicators(&run.indicators));
    println!("{}", crate::report::format_ranking(&run.ranking));

    if args.matrix {
        println!("{}", crate::report::format_matrix(&run.matrix));
    }

    if let Some(path) = &args.export_table {
        crate::io::export::write_table_csv(path, &run.view)?;
    }
    if let Some(path) = &args.export_json {
        let query = crate::io::export::QueryFile {
            tool: "sipsa".to_string(),
            source: source.path.display().to_string(),
            product: spec.product.clone(),
            date_start: spec.date_start,
            date_end: spec.date_end,
            markets: spec.markets.iter().cloned().collect(),
            indicators: run.indicators.clone(),
            ranking: run.ranking.entries().to_vec(),
            series: run.matrix.to_grid(),
        };
        crate::io::export::write_query_json(path, &query)?;
    }

    Ok(())
}

fn handle_products(args: SourceArgs) -> Result<(), AppError> {
    let source = loader::load(args.file.as_deref())?;
    let products = crate::filter::available_products(&source.data.dataset);

    println!("{} product(s) in {}:", products.len(), source.path.display());
    for (idx, product) in products.iter().enumerate() {
        println!("{:>4}) {product}", idx + 1);
    }

    Ok(())
}

fn handle_markets(args: QueryArgs) -> Result<(), AppError> {
    let source = loader::load(args.source.file.as_deref())?;
    let spec = resolve_spec(&source, &args)?;
    let markets = crate::filter::available_markets(
        &source.data.dataset,
        &spec.product,
        spec.date_start,
        spec.date_end,
    );

    println!(
        "{} market(s) for {} in [{} .. {}]:",
        markets.len(),
        spec.product,
        spec.date_start,
        spec.date_end
    );
    for (idx, market) in markets.iter().enumerate() {
        println!("{:>4}) {market}", idx + 1);
    }

    Ok(())
}

fn handle_inspect(args: QueryArgs) -> Result<(), AppError> {
    let source = loader::load(args.source.file.as_deref())?;
    let spec = resolve_spec(&source, &args)?;
    let view = crate::filter::filter(&source.data.dataset, &spec);

    if view.is_empty() {
        println!("{}", crate::report::NO_MATCH_NOTICE);
        return Ok(());
    }

    println!(
        "{} observation(s) for {}:",
        view.len(),
        spec.product
    );
    println!("{}", crate::report::format_observation_table(&view));

    Ok(())
}

/// Turn CLI arguments into a concrete `FilterSpec`, filling the defaults the
/// dashboard UI used to fill: the full date span and the first available
/// product.
fn resolve_spec(source: &LoadedSource, args: &QueryArgs) -> Result<FilterSpec, AppError> {
    let stats = &source.data.stats;
    let date_start = args.date_start.unwrap_or(stats.date_min);
    let date_end = args.date_end.unwrap_or(stats.date_max);

    let product = match &args.product {
        Some(p) => p.clone(),
        None => default_product(&source.data.dataset, date_start, date_end)?,
    };

    FilterSpec::new(date_start, date_end, &product, &args.markets)
}

fn default_product(
    dataset: &Dataset,
    date_start: chrono::NaiveDate,
    date_end: chrono::NaiveDate,
) -> Result<String, AppError> {
    dataset
        .observations()
        .iter()
        .filter(|o| date_start <= o.date && o.date <= date_end)
        .map(|o| o.product.as_str())
        .filter(|p| !p.is_empty())
        .min()
        .map(str::to_string)
        .ok_or_else(|| AppError::new(2, "No products available in the selected date range."))
}

/// Rewrite argv so `sipsa` defaults to `sipsa query`.
///
/// Rules:
/// - `sipsa`                      -> `sipsa query`
/// - `sipsa -p ARROZ ...`         -> `sipsa query -p ARROZ ...`
/// - `sipsa --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("query".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "query" | "products" | "markets" | "inspect");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "query flags".
    if arg1.starts_with('-') {
        argv.insert(1, "query".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
