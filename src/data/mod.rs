//! Synthetic dataset generation (seeded, reproducible).

pub mod sample;

pub use sample::*;
