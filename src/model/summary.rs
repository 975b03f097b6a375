//! Per-dimension statistics of a subtree.

use serde::{Deserialize, Serialize};
use super::StatAccumulator;
use crate::{Error, Result};

/// One `StatAccumulator` per feature dimension, summarising every leaf
/// vector below a node without keeping the vectors themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary {
    dims: Vec<StatAccumulator>,
}

impl Summary {
    /// Empty summary of the given dimensionality.
    pub fn new(dimension: usize) -> Self {
        Self { dims: vec![StatAccumulator::new(); dimension] }
    }

    /// One-shot summary seeded with a single dense vector.
    pub fn from_vector(values: &[f64]) -> Self {
        Self {
            dims: values.iter().map(|&x| StatAccumulator::from_value(x)).collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dims.len()
    }

    /// Number of vectors folded in. Every dimension sees every vector, so
    /// the first accumulator is authoritative.
    pub fn count(&self) -> u64 {
        self.dims.first().map_or(0, StatAccumulator::count)
    }

    pub fn dimension_stats(&self) -> &[StatAccumulator] {
        &self.dims
    }

    /// Fold one dense vector in.
    pub fn update(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.dims.len() {
            return Err(Error::DimensionMismatch {
                expected: self.dims.len(),
                got: values.len(),
            });
        }
        self.absorb(values);
        Ok(())
    }

    /// `update` for a vector whose dimensionality is already known to match.
    pub(crate) fn absorb(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.dims.len());
        for (acc, &x) in self.dims.iter_mut().zip(values) {
            acc.update(x);
        }
    }

    /// Merge another summary of disjoint vectors into this one.
    pub fn combine(&mut self, other: &Summary) -> Result<()> {
        if other.dims.len() != self.dims.len() {
            return Err(Error::TypeMismatch {
                expected: format!("{}-dimensional summary", self.dims.len()),
                got: format!("{}-dimensional summary", other.dims.len()),
            });
        }
        for (acc, rhs) in self.dims.iter_mut().zip(&other.dims) {
            acc.combine(rhs);
        }
        Ok(())
    }

    /// Mean vector.
    pub fn centroid(&self) -> Vec<f64> {
        self.dims.iter().map(StatAccumulator::mean).collect()
    }

    /// Root of the summed population variances: the RMS distance of the
    /// summarised vectors from their centroid.
    pub fn spread(&self) -> f64 {
        self.dims.iter().map(StatAccumulator::biased_variance).sum::<f64>().sqrt()
    }
}
