//! Shared query pipeline used by every terminal command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! filter -> indicators -> series matrix -> market ranking
//!
//! Front-ends then focus on presentation (printing vs exporting). Each stage
//! is a pure function of the filtered view; nothing here mutates the dataset.

use crate::domain::{Dataset, FilterSpec, FilteredView, Indicators};
use crate::rank::{Ranking, rank_markets};
use crate::series::{TimeSeriesMatrix, build_matrix};

/// All computed outputs of a single query.
#[derive(Debug, Clone)]
pub struct QueryRun<'a> {
    pub view: FilteredView<'a>,
    pub indicators: Indicators,
    pub matrix: TimeSeriesMatrix,
    pub ranking: Ranking,
}

/// Execute the pipeline for one filter spec.
///
/// `None` signals an empty view (no data for this combination), an expected
/// outcome of interactive filtering that callers report and recover from.
pub fn run_query<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Option<QueryRun<'a>> {
    // 1) Restrict to the date range, product, and market subset.
    let view = crate::filter::filter(dataset, spec);

    // 2) Summary indicators (bails out here when nothing matched).
    let indicators = crate::indicators::compute_indicators(&view)?;

    // 3) Per-market time series matrix.
    let matrix = build_matrix(&view);

    // 4) Market ranking by mean price.
    let ranking = rank_markets(&view);

    Some(QueryRun {
        view,
        indicators,
        matrix,
        ranking,
    })
}
