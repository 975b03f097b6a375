//! Flat clusterings cut from the hierarchy.

use hashbrown::HashMap;

use super::Hierarchy;
use crate::model::NodeId;
use crate::{Error, Result};

/// Leaf ids of one flat cluster, ascending.
pub type Cluster = Vec<NodeId>;

impl Hierarchy {
    /// Cut the tree at `threshold`.
    ///
    /// Walking down from the root, a node whose merge distance is at most
    /// `threshold` (or a leaf) becomes one cluster of every leaf below it;
    /// nodes above the threshold split into their children. With no
    /// threshold the whole hierarchy is one cluster.
    ///
    /// Clusters come out in depth-first child order. The tree is not
    /// modified.
    pub fn fcluster(&self, threshold: Option<f64>) -> Result<Vec<Cluster>> {
        let root = self.root.ok_or(Error::EmptyHierarchy)?;
        let Some(threshold) = threshold else {
            return Ok(vec![self.collect_leaves(root)]);
        };
        if threshold.is_nan() {
            return Err(Error::InvalidThreshold(threshold));
        }

        let mut clusters = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.get(id);
            match node.merge_distance {
                Some(d) if d > threshold => stack.extend(node.children.iter().rev().copied()),
                _ => clusters.push(self.collect_leaves(id)),
            }
        }
        Ok(clusters)
    }

    /// Cluster index of every leaf, in leaf arrival order.
    pub fn labels(&self, threshold: Option<f64>) -> Result<Vec<usize>> {
        self.fcluster_with_labels(threshold).map(|(_, labels)| labels)
    }

    /// Clusters plus, for the leaf with the i-th smallest id, the index of
    /// the cluster holding it.
    pub fn fcluster_with_labels(&self, threshold: Option<f64>) -> Result<(Vec<Cluster>, Vec<usize>)> {
        let clusters = self.fcluster(threshold)?;
        let labels = label_leaves(&clusters);
        Ok((clusters, labels))
    }
}

fn label_leaves(clusters: &[Cluster]) -> Vec<usize> {
    let mut label_map: HashMap<NodeId, usize> = HashMap::new();
    for (label, cluster) in clusters.iter().enumerate() {
        for &leaf in cluster {
            label_map.insert(leaf, label);
        }
    }
    let mut leaves: Vec<NodeId> = label_map.keys().copied().collect();
    leaves.sort_unstable();
    leaves.into_iter().map(|id| label_map[&id]).collect()
}
