//! Outlier-tolerant line fitting as a pluggable capability.
//!
//! The estimator asks a [`RobustFitter`] to re-fit whenever the ordinary fit
//! quality is poor. Two variants exist, selected at configuration time:
//!
//! - [`RansacFitter`]: consensus sampling. Repeatedly draws a minimal 2-point
//!   sample, fits the exact line through it, and scores the line by how many
//!   points fall within an inlier threshold. The winning consensus set gets a
//!   final least-squares refit.
//! - [`NoRobust`]: always declines. The caller keeps the ordinary fit, which
//!   is a degraded-but-valid mode, not a failure.
//!
//! Sampling is seeded from the input data plus a configured base seed, so
//! byte-identical input produces byte-identical output.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::{LineFit, fit_line, r_squared};

/// Result of a robust re-fit.
#[derive(Debug, Clone)]
pub struct RobustFit {
    pub fit: LineFit,
    /// R² computed over the inlier subset only.
    pub r_squared: f64,
    /// One flag per input point; true = inlier (used in the final fit).
    pub inlier_mask: Vec<bool>,
}

/// A robust line-fitting capability.
///
/// Returning `None` means the capability declined (unavailable, too few
/// points, or no usable consensus); the caller retains the ordinary fit.
pub trait RobustFitter: Send + Sync {
    fn refit(&self, x: &[f64], y: &[f64]) -> Option<RobustFit>;
}

/// Consensus-sampling (RANSAC-style) fitter.
#[derive(Debug, Clone)]
pub struct RansacFitter {
    pub iterations: usize,
    pub seed: u64,
}

/// Minimum points for a consensus re-fit to be meaningful. Below this the
/// inlier/outlier partition is not identifiable and we decline.
const MIN_POINTS: usize = 4;

/// Inlier cutoff in units of the estimated noise sigma. Same role as the
/// Huber tuning constant: larger admits more points into the consensus set.
const THRESHOLD_K: f64 = 2.5;

impl RansacFitter {
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self { iterations, seed }
    }

    /// Derive the RNG seed from the configured seed and the input bits, so
    /// repeated calls on identical data sample identically.
    fn data_seed(&self, x: &[f64], y: &[f64]) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        for v in x.iter().chain(y.iter()) {
            v.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl RobustFitter for RansacFitter {
    fn refit(&self, x: &[f64], y: &[f64]) -> Option<RobustFit> {
        let n = x.len();
        if n != y.len() || n < MIN_POINTS || self.iterations == 0 {
            return None;
        }

        // Inlier threshold: a robust noise-scale estimate from the ordinary
        // fit's residuals. The ordinary fit itself is pulled by outliers, but
        // the *median* absolute residual is not, so MAD/0.6745 recovers the
        // noise sigma. Deterministic (no RNG involved).
        let fit0 = fit_line(x, y)?;
        let residuals: Vec<f64> = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| yi - fit0.predict(xi))
            .collect();
        let scale = mad(&residuals)? / 0.6745;
        let threshold = THRESHOLD_K * scale;
        if !threshold.is_finite() || threshold <= 0.0 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.data_seed(x, y));
        let mut best: Option<Consensus> = None;

        for _ in 0..self.iterations {
            let i = rng.gen_range(0..n);
            let j = rng.gen_range(0..n);
            if i == j || (x[i] - x[j]).abs() < 1e-12 {
                continue;
            }

            let slope = (y[j] - y[i]) / (x[j] - x[i]);
            let candidate = LineFit {
                slope,
                intercept: y[i] - slope * x[i],
            };

            let mut mask = vec![false; n];
            let mut count = 0usize;
            let mut sse = 0.0;
            for k in 0..n {
                let r = y[k] - candidate.predict(x[k]);
                if r.abs() <= threshold {
                    mask[k] = true;
                    count += 1;
                    sse += r * r;
                }
            }

            // Deterministic selection: most inliers, then lowest SSE, then
            // earliest iteration.
            let better = match &best {
                None => true,
                Some(b) => count > b.count || (count == b.count && sse < b.sse),
            };
            if better {
                best = Some(Consensus { mask, count, sse });
            }
        }

        let best = best?;
        if best.count < 2 {
            return None;
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .zip(best.mask.iter())
            .filter(|&(_, &keep)| keep)
            .map(|((&xi, &yi), _)| (xi, yi))
            .unzip();

        let fit = fit_line(&xs, &ys)?;
        let r2 = r_squared(&xs, &ys, &fit);

        Some(RobustFit {
            fit,
            r_squared: r2,
            inlier_mask: best.mask,
        })
    }
}

/// The "capability unavailable" variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRobust;

impl RobustFitter for NoRobust {
    fn refit(&self, _x: &[f64], _y: &[f64]) -> Option<RobustFit> {
        None
    }
}

#[derive(Debug, Clone)]
struct Consensus {
    mask: Vec<bool>,
    count: usize,
    sse: f64,
}

fn mad(values: &[f64]) -> Option<f64> {
    let med = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiked_line() -> (Vec<f64>, Vec<f64>, Vec<usize>) {
        // y = 10 - 0.5x with two large spikes.
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|&xi| 10.0 - 0.5 * xi).collect();
        let spikes = vec![4usize, 13];
        for &idx in &spikes {
            y[idx] += 6.0;
        }
        (x, y, spikes)
    }

    #[test]
    fn ransac_recovers_line_and_flags_spikes() {
        let (x, y, spikes) = spiked_line();
        let fitter = RansacFitter::new(200, 42);
        let robust = fitter.refit(&x, &y).unwrap();

        assert!((robust.fit.slope - (-0.5)).abs() < 1e-6);
        assert!((robust.fit.intercept - 10.0).abs() < 1e-6);
        assert!(robust.r_squared > 0.999);
        for idx in spikes {
            assert!(!robust.inlier_mask[idx], "spike {idx} should be excluded");
        }
    }

    #[test]
    fn ransac_is_deterministic() {
        let (x, y, _) = spiked_line();
        let fitter = RansacFitter::new(200, 7);
        let a = fitter.refit(&x, &y).unwrap();
        let b = fitter.refit(&x, &y).unwrap();
        assert_eq!(a.fit.slope.to_bits(), b.fit.slope.to_bits());
        assert_eq!(a.fit.intercept.to_bits(), b.fit.intercept.to_bits());
        assert_eq!(a.inlier_mask, b.inlier_mask);
    }

    #[test]
    fn ransac_declines_on_tiny_input() {
        let fitter = RansacFitter::new(100, 0);
        assert!(fitter.refit(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn ransac_declines_on_flat_response() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![2.0; 10];
        let fitter = RansacFitter::new(100, 0);
        assert!(fitter.refit(&x, &y).is_none());
    }

    #[test]
    fn no_robust_always_declines() {
        let (x, y, _) = spiked_line();
        assert!(NoRobust.refit(&x, &y).is_none());
    }
}
