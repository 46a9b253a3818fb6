//! Reporting: terminal summaries and the markdown report.

pub mod format;

pub use format::*;
