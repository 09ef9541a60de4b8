//! Command-line parsing for the food-price explorer.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the aggregation code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "sipsa",
    version,
    about = "Food-price explorer for the consolidated SIPSA master table"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute indicators, the per-market series, and the market ranking.
    Query(QueryArgs),
    /// List the products present in the dataset.
    Products(SourceArgs),
    /// List the markets available for a product within a date range.
    ///
    /// Options always reflect what is actually available for the current
    /// product/date selection, not the full dataset.
    Markets(QueryArgs),
    /// Print the filtered observation table for quick inspection.
    Inspect(QueryArgs),
}

/// Where the master CSV comes from.
#[derive(Debug, Parser, Clone)]
pub struct SourceArgs {
    /// Path to the master CSV. Defaults to $SIPSA_MASTER_CSV, then the known
    /// locations (data/processed/sipsa_master.csv, ./sipsa_master.csv).
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub file: Option<PathBuf>,
}

/// Common options for querying and inspecting.
#[derive(Debug, Parser, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Product to analyze (defaults to the first product available in range).
    #[arg(short = 'p', long)]
    pub product: Option<String>,

    /// Start of the date range, inclusive (defaults to the earliest date).
    #[arg(long = "from", value_name = "DATE")]
    pub date_start: Option<NaiveDate>,

    /// End of the date range, inclusive (defaults to the latest date).
    #[arg(long = "to", value_name = "DATE")]
    pub date_end: Option<NaiveDate>,

    /// Market to keep (repeatable). No selection keeps every market.
    #[arg(short = 'm', long = "market", value_name = "MARKET")]
    pub markets: Vec<String>,

    /// Print the full date x market price matrix.
    #[arg(long)]
    pub matrix: bool,

    /// Export the filtered table to CSV.
    #[arg(long = "export-table", value_name = "CSV")]
    pub export_table: Option<PathBuf>,

    /// Export indicators, ranking, and series to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
