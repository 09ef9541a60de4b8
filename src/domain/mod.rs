//! Shared domain types and normalization rules.

pub mod types;

pub use types::*;
