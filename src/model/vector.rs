//! Feature vectors fed into the hierarchy.
//!
//! Dense vectors are plain `Vec<f64>`. Sparse vectors keep a fixed
//! dimensionality plus sorted `(index, value)` entries, which is the natural
//! shape for bag-of-words or concept counts where almost every component is
//! zero. Both kinds densify on demand for distance computations.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Which representation a vector uses. A hierarchy accepts one kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    Dense,
    Sparse,
}

impl std::fmt::Display for VectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorKind::Dense => write!(f, "dense vector"),
            VectorKind::Sparse => write!(f, "sparse vector"),
        }
    }
}

// ============================================================================
// SparseVector
// ============================================================================

/// Sparse vector: explicit non-zero entries, sorted by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    /// Build from `(index, value)` pairs in any order.
    ///
    /// Zero values are dropped. Duplicate or out-of-range indices are
    /// rejected.
    pub fn new(dim: usize, entries: impl IntoIterator<Item = (u32, f64)>) -> Result<Self> {
        let mut entries: Vec<(u32, f64)> = entries.into_iter().filter(|(_, v)| *v != 0.0).collect();
        entries.sort_by_key(|(i, _)| *i);

        if let Some(&(i, _)) = entries.iter().find(|(i, _)| *i as usize >= dim) {
            return Err(Error::InvalidVector(format!(
                "index {i} out of range for dimension {dim}"
            )));
        }
        if let Some(w) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::InvalidVector(format!("duplicate index {}", w[0].0)));
        }

        Ok(Self { dim, entries })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn get(&self, index: u32) -> f64 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map_or(0.0, |pos| self.entries[pos].1)
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for &(i, v) in &self.entries {
            dense[i as usize] = v;
        }
        dense
    }
}

// ============================================================================
// FeatureVector
// ============================================================================

/// An input vector, dense or sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureVector {
    Dense(Vec<f64>),
    Sparse(SparseVector),
}

impl FeatureVector {
    /// Convenience constructor for a sparse vector.
    pub fn sparse(dim: usize, entries: impl IntoIterator<Item = (u32, f64)>) -> Result<Self> {
        SparseVector::new(dim, entries).map(FeatureVector::Sparse)
    }

    pub fn kind(&self) -> VectorKind {
        match self {
            FeatureVector::Dense(_) => VectorKind::Dense,
            FeatureVector::Sparse(_) => VectorKind::Sparse,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            FeatureVector::Dense(v) => v.len(),
            FeatureVector::Sparse(s) => s.dim(),
        }
    }

    pub fn to_dense(&self) -> Vec<f64> {
        match self {
            FeatureVector::Dense(v) => v.clone(),
            FeatureVector::Sparse(s) => s.to_dense(),
        }
    }

    /// Reject empty vectors and non-finite components.
    pub fn validate(&self) -> Result<()> {
        if self.dim() == 0 {
            return Err(Error::InvalidVector("vector has no dimensions".into()));
        }
        let non_finite = match self {
            FeatureVector::Dense(v) => v.iter().position(|x| !x.is_finite()),
            FeatureVector::Sparse(s) => s
                .entries()
                .iter()
                .find(|(_, v)| !v.is_finite())
                .map(|(i, _)| *i as usize),
        };
        match non_finite {
            Some(i) => Err(Error::InvalidVector(format!("non-finite component at index {i}"))),
            None => Ok(()),
        }
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector::Dense(values)
    }
}

impl From<&[f64]> for FeatureVector {
    fn from(values: &[f64]) -> Self {
        FeatureVector::Dense(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for FeatureVector {
    fn from(values: [f64; N]) -> Self {
        FeatureVector::Dense(values.to_vec())
    }
}

impl From<SparseVector> for FeatureVector {
    fn from(sparse: SparseVector) -> Self {
        FeatureVector::Sparse(sparse)
    }
}
