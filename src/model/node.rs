//! Node in the cluster hierarchy.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use super::{FeatureVector, Summary};

/// Node identifier. Assigned in creation order and never reused, so sorting
/// leaf ids recovers the order their vectors arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Child list. Wrap merges always produce two children; direct attachments
/// can grow it further.
pub type Children = SmallVec<[NodeId; 2]>;

/// A node of the hierarchy.
///
/// Leaves wrap one input vector and nothing else; their statistics are the
/// vector itself. Internal nodes own an ordered set of children and
/// summarise every leaf below them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub(crate) id: NodeId,
    /// Back-reference into the arena, not an owner.
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Children,
    pub(crate) vector: Option<FeatureVector>,
    /// Internal nodes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) summary: Option<Summary>,
    /// Distance between the two subtrees joined to create this node.
    pub(crate) merge_distance: Option<f64>,
}

impl ClusterNode {
    pub(crate) fn leaf(id: NodeId, vector: FeatureVector) -> Self {
        Self {
            id,
            parent: None,
            children: Children::new(),
            vector: Some(vector),
            summary: None,
            merge_distance: None,
        }
    }

    pub(crate) fn internal(id: NodeId, children: Children, summary: Summary, merge_distance: f64) -> Self {
        Self {
            id,
            parent: None,
            children,
            vector: None,
            summary: Some(summary),
            merge_distance: Some(merge_distance),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The raw input vector. `None` on internal nodes.
    pub fn vector(&self) -> Option<&FeatureVector> {
        self.vector.as_ref()
    }

    /// Running statistics of the leaves below. `None` on leaves.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// `None` on leaves.
    pub fn merge_distance(&self) -> Option<f64> {
        self.merge_distance
    }

    /// Merge distance with leaves counted as zero, for nesting comparisons.
    pub(crate) fn height(&self) -> f64 {
        self.merge_distance.unwrap_or(0.0)
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> u64 {
        self.summary.as_ref().map_or(1, Summary::count)
    }

    /// Mean of the leaf vectors below; a leaf's own vector, densified.
    pub fn centroid(&self) -> Vec<f64> {
        match (&self.summary, &self.vector) {
            (Some(summary), _) => summary.centroid(),
            (None, Some(vector)) => vector.to_dense(),
            (None, None) => Vec::new(),
        }
    }

    /// Statistics of this subtree, built on demand for a leaf.
    pub(crate) fn to_summary(&self) -> Summary {
        match &self.summary {
            Some(summary) => summary.clone(),
            None => Summary::from_vector(&self.centroid()),
        }
    }
}

/// Default display label: `#id` for leaves, the merge distance for
/// internal nodes.
impl std::fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.merge_distance {
            Some(d) if !self.is_leaf() => write!(f, "{d:.2}"),
            _ => write!(f, "#{}", self.id),
        }
    }
}
