//! Input/output: CSV ingest, source resolution, and exports.

pub mod export;
pub mod ingest;
pub mod loader;
