//! # Distance Metrics
//!
//! One metric is fixed per hierarchy and used for every comparison the
//! insertion walk makes, so merge distances recorded at different times stay
//! comparable.
//!
//! | Metric | Range | Typical input |
//! |--------|-------|---------------|
//! | `Euclidean` | `[0, ∞)` | dense real-valued features |
//! | `Cosine` | `[0, 2]` | sparse term / concept counts |
//! | `Jaccard` | `[0, 1]` | non-negative counts (weighted, Ruzicka form) |

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Euclidean,
    Cosine,
    Jaccard,
}

impl Metric {
    /// Distance between two dense vectors of equal length.
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::Euclidean => euclidean(a, b),
            Metric::Cosine => cosine_distance(a, b),
            Metric::Jaccard => jaccard_distance(a, b),
        }
    }

    /// Reject vectors outside the metric's domain.
    pub fn check(self, values: &[f64]) -> Result<()> {
        if self == Metric::Jaccard {
            if let Some(i) = values.iter().position(|&x| x < 0.0) {
                return Err(Error::InvalidVector(format!(
                    "jaccard distance needs non-negative components, index {i} is {}",
                    values[i]
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Cosine => write!(f, "cosine"),
            Metric::Jaccard => write!(f, "jaccard"),
        }
    }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// `1 - cos(a, b)`. Two zero vectors are identical (0); a zero vector is
/// orthogonal to everything else (1).
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0),
    }
}

/// Weighted Jaccard distance `1 - Σ min(a, b) / Σ max(a, b)`.
pub fn jaccard_distance(a: &[f64], b: &[f64]) -> f64 {
    let (mut lo, mut hi) = (0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        lo += x.min(*y);
        hi += x.max(*y);
    }
    if hi == 0.0 {
        return 0.0;
    }
    (1.0 - lo / hi).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_basics() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(Metric::Euclidean.distance(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        assert!(cosine_distance(&[1.0, 1.0, 0.0], &[2.0, 2.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_zero_vectors() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn jaccard_weighted() {
        // min sum = 1 + 0 = 1, max sum = 2 + 1 = 3
        assert!((jaccard_distance(&[1.0, 1.0], &[2.0, 0.0]) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard_distance(&[0.0], &[0.0]), 0.0);
        assert_eq!(jaccard_distance(&[3.0, 1.0], &[3.0, 1.0]), 0.0);
    }

    #[test]
    fn jaccard_domain_check() {
        assert!(Metric::Jaccard.check(&[0.0, 1.0]).is_ok());
        assert!(matches!(Metric::Jaccard.check(&[1.0, -0.5]), Err(Error::InvalidVector(_))));
        assert!(Metric::Euclidean.check(&[-1.0]).is_ok());
    }
}
