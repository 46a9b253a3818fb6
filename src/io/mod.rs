//! Input/output helpers.
//!
//! - CSV ingest + schema normalization (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
