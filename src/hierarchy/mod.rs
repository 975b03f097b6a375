//! # Incremental Cluster Hierarchy
//!
//! `Hierarchy` owns every `ClusterNode` in a flat arena indexed by `NodeId`.
//! Parent and child links are ids into that arena, so the tree has a single
//! owner and no reference cycles.
//!
//! ```text
//! incorporate(x) ──▶ descend to nearest subtree ──▶ restore nesting ──▶ attach / wrap
//! fcluster(t)    ──▶ read-only top-down cut at merge distance t
//! ```
//!
//! The hierarchy only grows: nodes are never removed, and an id is the
//! node's arena index for its whole life.

pub mod config;
mod incorporate;
mod fcluster;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::{Error, Result};

pub use config::HierarchyConfig;
pub use fcluster::Cluster;

/// The incrementally built cluster tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    config: HierarchyConfig,
    nodes: Vec<ClusterNode>,
    root: Option<NodeId>,
    /// Dimensionality and representation of the first vector; every later
    /// vector must match both.
    dimension: Option<usize>,
    kind: Option<VectorKind>,
}

impl Hierarchy {
    pub fn new(config: HierarchyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total number of nodes, leaves and internal.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of vectors incorporated so far.
    pub fn leaf_count(&self) -> u64 {
        self.root().map_or(0, ClusterNode::leaf_count)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn vector_kind(&self) -> Option<VectorKind> {
        self.kind
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root(&self) -> Option<&ClusterNode> {
        self.root.map(|id| self.get(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&ClusterNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter()
    }

    /// Leaf nodes in arrival order.
    pub fn leaves(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Ids of every leaf below `id` (inclusive), ascending.
    pub fn leaves_under(&self, id: NodeId) -> Result<Vec<NodeId>> {
        if self.node(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        Ok(self.collect_leaves(id))
    }

    /// Ancestors of `id`, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).and_then(ClusterNode::parent), |&p| {
            self.get(p).parent
        })
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut deepest = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(self.get(id).children.iter().map(|&c| (c, depth + 1)));
        }
        deepest
    }

    // ========================================================================
    // Arena helpers
    // ========================================================================

    /// Arena lookup for ids produced by this hierarchy.
    pub(crate) fn get(&self, id: NodeId) -> &ClusterNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut ClusterNode {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u64)
    }

    pub(crate) fn collect_leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.get(current);
            if node.is_leaf() {
                leaves.push(current);
            } else {
                stack.extend(node.children.iter().copied());
            }
        }
        leaves.sort_unstable();
        leaves
    }

    // ========================================================================
    // Structural validation
    // ========================================================================

    /// Check every structural invariant of the arena.
    ///
    /// Used on snapshots before they replace a live hierarchy.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(Error::CorruptSnapshot(msg));

        let Some(root) = self.root else {
            if !self.nodes.is_empty() || self.dimension.is_some() || self.kind.is_some() {
                return corrupt("hierarchy without a root has nodes or a dimension".into());
            }
            return Ok(());
        };
        let (Some(dimension), Some(kind)) = (self.dimension, self.kind) else {
            return corrupt("non-empty hierarchy is missing its dimension or vector kind".into());
        };
        if self.node(root).is_none() {
            return corrupt(format!("root {root} is not in the arena"));
        }
        if self.get(root).parent.is_some() {
            return corrupt(format!("root {root} has a parent"));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let id = node.id;
            if id.index() != index {
                return corrupt(format!("node at position {index} carries id {id}"));
            }
            match (&node.vector, &node.summary, node.merge_distance) {
                (Some(v), None, None) if node.children.is_empty() => {
                    if v.dim() != dimension || v.kind() != kind {
                        return corrupt(format!("leaf {id} holds a {}-dimensional {}", v.dim(), v.kind()));
                    }
                }
                (None, Some(summary), Some(d)) if node.children.len() >= 2 && d >= 0.0 => {
                    if summary.dimension() != dimension {
                        return corrupt(format!("node {id} summary has {} dimensions", summary.dimension()));
                    }
                }
                _ => return corrupt(format!("node {id} is neither a well-formed leaf nor internal node")),
            }
            if id != root {
                let Some(parent) = node.parent.and_then(|p| self.node(p)) else {
                    return corrupt(format!("node {id} has no valid parent"));
                };
                if !parent.children.contains(&id) {
                    return corrupt(format!("node {id} is missing from its parent's children"));
                }
            }
            for &child in &node.children {
                match self.node(child) {
                    Some(c) if c.parent == Some(id) => {}
                    _ => return corrupt(format!("child {child} of node {id} does not point back")),
                }
            }
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return corrupt(format!("node {id} is reachable twice"));
            }
            let node = self.get(id);
            if !node.is_leaf() {
                let below: u64 = node.children.iter().map(|&c| self.get(c).leaf_count()).sum();
                if below != node.leaf_count() {
                    return corrupt(format!("node {id} summarises {} vectors but has {below} below", node.leaf_count()));
                }
            }
            stack.extend(node.children.iter().copied());
        }
        if seen.len() != self.nodes.len() {
            return corrupt(format!("{} nodes are unreachable from the root", self.nodes.len() - seen.len()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[f64]) -> Hierarchy {
        let mut h = Hierarchy::default();
        for &p in points {
            h.incorporate([p]).unwrap();
        }
        h
    }

    #[test]
    fn empty_hierarchy() {
        let h = Hierarchy::default();
        assert!(h.is_empty());
        assert_eq!(h.len(), 0);
        assert_eq!(h.leaf_count(), 0);
        assert_eq!(h.depth(), 0);
        assert!(h.root().is_none());
        assert!(h.validate().is_ok());
    }

    #[test]
    fn accessors_follow_the_tree() {
        let h = line(&[0.0, 1.0, 2.0]);
        // 0, 1 -> node 2 = {0, 1}; 2 wraps leaf 1 -> node 4 = {1, 3}
        assert_eq!(h.len(), 5);
        assert_eq!(h.leaf_count(), 3);
        assert_eq!(h.root_id(), Some(NodeId(2)));
        assert_eq!(h.depth(), 2);
        assert_eq!(h.ancestors(NodeId(3)).collect::<Vec<_>>(), vec![NodeId(4), NodeId(2)]);
        assert_eq!(h.ancestors(NodeId(2)).count(), 0);
        assert_eq!(
            h.leaves_under(NodeId(2)).unwrap(),
            vec![NodeId(0), NodeId(1), NodeId(3)]
        );
        assert_eq!(h.leaves().map(ClusterNode::id).collect::<Vec<_>>(), vec![NodeId(0), NodeId(1), NodeId(3)]);
        assert!(matches!(h.leaves_under(NodeId(99)), Err(Error::NotFound(_))));
        assert!(h.validate().is_ok());
    }

    #[test]
    fn validate_catches_broken_parent_link() {
        let mut h = line(&[0.0, 1.0, 2.0]);
        h.get_mut(NodeId(3)).parent = Some(NodeId(2));
        assert!(matches!(h.validate(), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn validate_catches_leaf_count_drift() {
        let mut h = line(&[0.0, 1.0, 2.0]);
        let extra = Summary::from_vector(&[5.0]);
        h.get_mut(NodeId(4)).summary.as_mut().unwrap().combine(&extra).unwrap();
        assert!(matches!(h.validate(), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn leaves_carry_no_summary() {
        let h = line(&[0.0, 1.0, 2.0]);
        for node in h.nodes() {
            assert_eq!(node.summary().is_some(), !node.is_leaf(), "node {}", node.id());
        }
        assert_eq!(h.get(NodeId(3)).centroid(), vec![2.0]);
        assert_eq!(h.get(NodeId(3)).leaf_count(), 1);
    }

    #[test]
    fn validate_rejects_leaf_with_summary() {
        let mut h = line(&[0.0, 1.0, 2.0]);
        h.get_mut(NodeId(0)).summary = Some(Summary::from_vector(&[0.0]));
        assert!(matches!(h.validate(), Err(Error::CorruptSnapshot(_))));
    }
}
