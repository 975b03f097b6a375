//! # ihac-rs: Incremental Hierarchical Clustering
//!
//! Builds a tree of nested clusters over a stream of feature vectors, one
//! vector at a time, without revisiting earlier input. Each internal node
//! keeps running per-dimension statistics of the leaves below it, so the
//! tree can grow and be cut into flat clusters at any time.
//!
//! ## Design Principles
//!
//! 1. **Arena-owned tree**: nodes live in one `Vec`, links are `NodeId`s
//! 2. **Value-type statistics**: `StatAccumulator` merges in O(1), no raw data kept
//! 3. **Validate, then mutate**: a rejected vector or snapshot never half-applies
//! 4. **Read-only cuts**: `fcluster` and rendering never touch the tree
//!
//! ## Quick Start
//!
//! ```rust
//! use ihac::Ihac;
//!
//! # fn example() -> ihac::Result<()> {
//! let ihac = Ihac::new();
//! ihac.fit([[0.0, 0.0], [0.2, 0.1], [9.0, 9.5], [9.1, 9.4]])?;
//!
//! let (clusters, labels) = ihac.clusters_with_labels(Some(2.0))?;
//! assert_eq!(clusters.len(), 2);
//! assert_eq!(labels, vec![0, 0, 1, 1]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `model` | Vectors, metrics, statistics, nodes |
//! | `hierarchy` | The tree plus `incorporate` and `fcluster` |
//! | `persist` | Whole-tree snapshot save / load |
//! | `render` | Text layout of the tree |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod hierarchy;
pub mod persist;
pub mod render;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    ClusterNode, NodeId, FeatureVector, SparseVector, VectorKind,
    Metric, StatAccumulator, Summary, c4,
};
pub use hierarchy::{Hierarchy, HierarchyConfig, Cluster};
pub use render::TreeRenderer;

use std::path::Path;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

// ============================================================================
// Top-level session handle
// ============================================================================

/// The primary entry point. An `Ihac` owns one hierarchy behind a
/// read-write lock.
///
/// Writers (`incorporate`, `fit`, `load`) hold the lock exclusively for the
/// whole call. Readers (`clusters`, `render`, `save`) share it, so they may
/// run concurrently with each other but never observe a half-applied
/// insertion.
#[derive(Debug, Default)]
pub struct Ihac {
    hierarchy: RwLock<Hierarchy>,
}

impl Ihac {
    /// Empty session with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HierarchyConfig) -> Self {
        Self {
            hierarchy: RwLock::new(Hierarchy::new(config)),
        }
    }

    /// Wrap an existing hierarchy.
    pub fn from_hierarchy(hierarchy: Hierarchy) -> Self {
        Self {
            hierarchy: RwLock::new(hierarchy),
        }
    }

    /// Incorporate one vector.
    pub fn incorporate(&self, vector: impl Into<FeatureVector>) -> Result<NodeId> {
        self.hierarchy.write().incorporate(vector)
    }

    /// Incorporate vectors in order under a single write lock.
    pub fn fit<I, V>(&self, vectors: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = V>,
        V: Into<FeatureVector>,
    {
        let mut hierarchy = self.hierarchy.write();
        let ids = hierarchy.fit(vectors)?;
        debug!(added = ids.len(), leaves = hierarchy.leaf_count(), "fit batch");
        Ok(ids)
    }

    /// Flat clusters at `threshold` (`None`: one cluster of everything).
    pub fn clusters(&self, threshold: Option<f64>) -> Result<Vec<Cluster>> {
        self.hierarchy.read().fcluster(threshold)
    }

    /// Flat clusters plus one label per leaf in arrival order.
    pub fn clusters_with_labels(&self, threshold: Option<f64>) -> Result<(Vec<Cluster>, Vec<usize>)> {
        self.hierarchy.read().fcluster_with_labels(threshold)
    }

    /// Render the tree with default labels.
    pub fn render(&self) -> Result<String> {
        TreeRenderer::new().render(&self.hierarchy.read())
    }

    pub fn leaf_count(&self) -> u64 {
        self.hierarchy.read().leaf_count()
    }

    /// Shared read access for anything not covered above.
    pub fn read(&self) -> RwLockReadGuard<'_, Hierarchy> {
        self.hierarchy.read()
    }

    /// Snapshot the hierarchy to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.hierarchy.read().save(path)
    }

    /// Replace the hierarchy with the snapshot at `path`.
    ///
    /// The snapshot is read and validated before the lock is taken; on any
    /// error the current hierarchy is left as it was.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let loaded = Hierarchy::load(path)?;
        *self.hierarchy.write() = loaded;
        Ok(())
    }

    /// Consume the session, returning the hierarchy.
    pub fn into_inner(self) -> Hierarchy {
        self.hierarchy.into_inner()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid sample size: cannot estimate spread from {0} observation(s)")]
    InvalidSampleSize(u64),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Hierarchy is empty: incorporate a vector first")]
    EmptyHierarchy,

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
