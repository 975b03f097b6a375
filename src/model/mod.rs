//! # Hierarchy Model
//!
//! Plain data types the hierarchy is built from: input vectors, the distance
//! metric, running statistics and the tree node itself.
//!
//! Design rule: no locking and no I/O here. Everything is a value type that
//! can be tested without a tree.

pub mod node;
pub mod vector;
pub mod metric;
pub mod stats;
pub mod summary;

pub use node::{ClusterNode, NodeId, Children};
pub use vector::{FeatureVector, SparseVector, VectorKind};
pub use metric::{Metric, euclidean, cosine_distance, jaccard_distance};
pub use stats::{StatAccumulator, c4};
pub use summary::Summary;
