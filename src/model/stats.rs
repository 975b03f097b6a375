//! # Running Statistics
//!
//! `StatAccumulator` summarises a stream of values by count, mean and the
//! sum of squared deviations from the mean. Two operations keep it current:
//!
//! | Operation | Algorithm | Cost |
//! |-----------|-----------|------|
//! | `update`  | Knuth / Welford online recurrence | O(1) |
//! | `combine` | Chan et al. parallel merge | O(1) |
//!
//! Neither path accumulates a raw sum of squares, so variance estimates do
//! not suffer catastrophic cancellation.
//!
//! See <https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance>.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

// ============================================================================
// c4(n) small-sample correction
// ============================================================================

/// c4(n) for n = 2..=29. Index 0 holds c4(2).
const C4_TABLE: [f64; 28] = [
    0.7978845608028654,
    0.886226925452758,
    0.9213177319235613,
    0.9399856029866254,
    0.9515328619481445,
    0.9593687886998328,
    0.9650304561473722,
    0.9693106997139539,
    0.9726592741215884,
    0.9753500771452293,
    0.9775593518547722,
    0.9794056043142177,
    0.9809714367555161,
    0.9823161771626504,
    0.9834835316158412,
    0.9845064054718315,
    0.985410043808079,
    0.9862141368601935,
    0.9869342675246552,
    0.9875829288261562,
    0.9881702533158311,
    0.988704545233999,
    0.9891926749585048,
    0.9896403755857028,
    0.9900524688409107,
    0.990433039209448,
    0.9907855696217323,
    0.9911130482419843,
];

/// Correction factor that unbiases a Bessel-corrected standard deviation
/// estimated from `n` samples.
///
/// Tabulated for `n` in `2..=29`; the factor is within 1% of 1.0 beyond
/// that, so `n >= 30` returns 1.0.
pub fn c4(n: u64) -> Result<f64> {
    match n {
        0 | 1 => Err(Error::InvalidSampleSize(n)),
        2..=29 => Ok(C4_TABLE[(n - 2) as usize]),
        _ => Ok(1.0),
    }
}

// ============================================================================
// StatAccumulator
// ============================================================================

/// Incrementally updatable count / mean / dispersion of a group of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatAccumulator {
    count: u64,
    mean: f64,
    sum_squared_deviation: f64,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator holding exactly one observation.
    pub fn from_value(x: f64) -> Self {
        let mut acc = Self::new();
        acc.update(x);
        acc
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sum_squared_deviation(&self) -> f64 {
        self.sum_squared_deviation
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold one observation in.
    pub fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_squared_deviation += delta * (x - self.mean);
    }

    /// Fold every value of `values` in, in order.
    pub fn update_batch<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for x in values {
            self.update(x);
        }
    }

    /// Merge the statistics of a disjoint sample into `self`.
    pub fn combine(&mut self, other: &StatAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let n = self.count as f64;
        let m = other.count as f64;
        let total = n + m;
        let delta = other.mean - self.mean;

        self.sum_squared_deviation +=
            other.sum_squared_deviation + delta * delta * (n * m / total);
        self.mean = (n * self.mean + m * other.mean) / total;
        self.count += other.count;
    }

    /// Owned variant of [`combine`](Self::combine).
    pub fn combined(mut self, other: &StatAccumulator) -> Self {
        self.combine(other);
        self
    }

    /// Population variance. Zero for an empty accumulator.
    pub fn biased_variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_squared_deviation / self.count as f64
    }

    /// Population standard deviation (the sample std).
    pub fn biased_std(&self) -> f64 {
        self.biased_variance().sqrt()
    }

    /// Unbiased estimate of the standard deviation: Bessel's correction
    /// followed by the c4(n) correction.
    ///
    /// With fewer than two observations there is no spread to estimate and
    /// this returns 0.0. Use [`try_unbiased_std`](Self::try_unbiased_std) to
    /// get the `InvalidSampleSize` error instead.
    pub fn unbiased_std(&self) -> f64 {
        self.try_unbiased_std().unwrap_or(0.0)
    }

    pub fn try_unbiased_std(&self) -> Result<f64> {
        let correction = c4(self.count)?;
        let bessel = (self.sum_squared_deviation / (self.count - 1) as f64).sqrt();
        Ok(bessel / correction)
    }
}

impl std::fmt::Display for StatAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} ({:.4}) [{}]", self.mean, self.unbiased_std(), self.count)
    }
}

impl Extend<f64> for StatAccumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        self.update_batch(iter);
    }
}

impl FromIterator<f64> for StatAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.update_batch(iter);
        acc
    }
}
