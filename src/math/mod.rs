//! Small numeric helpers shared by the estimator and the aggregator.

pub mod ols;

pub use ols::*;
