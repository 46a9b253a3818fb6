//! Rate estimation and aggregation.
//!
//! Responsibilities:
//!
//! - per-run rate estimation with an ordinary/robust decision (`estimator`)
//! - the pluggable consensus-sampling capability (`robust`)
//! - salt-effect correction of observed rates (`salt`)
//! - cross-run Arrhenius aggregation (`arrhenius`)

pub mod arrhenius;
pub mod estimator;
pub mod robust;
pub mod salt;

pub use arrhenius::*;
pub use estimator::*;
pub use robust::*;
pub use salt::*;
