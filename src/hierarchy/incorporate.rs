//! Single-pass insertion.
//!
//! A new vector walks down from the root towards the nearest child summary.
//! The walk stops in one of two ways:
//!
//! - **Attach**: the vector is closer to the current node's centroid than
//!   to any single child, and no farther from it than the node's merge
//!   distance, so it joins that node as one more direct child.
//! - **Wrap**: the walk reached a leaf, or a node the vector is nearest to
//!   but too far from to join. A new internal node pairs that subtree with
//!   the vector at their measured distance.
//!
//! A wrap whose distance exceeds its parent's merge distance would break
//! the nesting of merge distances along the path. Nesting restoration lifts
//! such a wrap one level at a time until it fits.

use tracing::{debug, trace};

use super::Hierarchy;
use crate::model::*;
use crate::{Error, Result};

/// Where a new leaf goes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    /// Become a direct child of this internal node.
    Attach(NodeId),
    /// Pair with this subtree under a new internal node.
    Wrap { target: NodeId, distance: f64 },
}

impl Hierarchy {
    /// Grow the hierarchy by one leaf holding `vector`.
    ///
    /// Returns the new leaf's id. The vector is validated against the
    /// hierarchy before anything is modified, so a failed call leaves the
    /// tree untouched.
    pub fn incorporate(&mut self, vector: impl Into<FeatureVector>) -> Result<NodeId> {
        let vector = vector.into();
        let dense = self.admit(&vector)?;

        let leaf_id = self.next_id();
        let Some(root) = self.root else {
            self.dimension = Some(dense.len());
            self.kind = Some(vector.kind());
            self.nodes.push(ClusterNode::leaf(leaf_id, vector));
            self.root = Some(leaf_id);
            debug!(leaf = %leaf_id, "seeded hierarchy");
            return Ok(leaf_id);
        };

        let mut placement = self.locate(root, &dense);
        if self.config.restore_nesting {
            placement = self.restore_nesting(&dense, placement);
        }

        // nothing below can fail
        self.nodes.push(ClusterNode::leaf(leaf_id, vector));

        // first ancestor that does not yet account for the new leaf
        let mut cursor = match placement {
            Placement::Attach(parent) => {
                self.link(parent, leaf_id);
                Some(parent)
            }
            Placement::Wrap { target, distance } => {
                let merged = self.wrap(target, leaf_id, &dense, distance);
                self.get(merged).parent
            }
        };
        while let Some(id) = cursor {
            let node = self.get_mut(id);
            if let Some(summary) = node.summary.as_mut() {
                summary.absorb(&dense);
            }
            cursor = node.parent;
        }

        debug!(leaf = %leaf_id, ?placement, leaves = self.leaf_count(), "incorporated vector");
        Ok(leaf_id)
    }

    /// Incorporate a batch in order, returning the new leaf ids.
    ///
    /// Stops at the first rejected vector; the ones before it stay in the
    /// hierarchy.
    pub fn fit<I, V>(&mut self, vectors: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = V>,
        V: Into<FeatureVector>,
    {
        vectors.into_iter().map(|v| self.incorporate(v)).collect()
    }

    /// Validate `vector` against the session and return its dense form.
    fn admit(&self, vector: &FeatureVector) -> Result<Vec<f64>> {
        vector.validate()?;
        if let Some(expected) = self.dimension {
            if vector.dim() != expected {
                return Err(Error::DimensionMismatch { expected, got: vector.dim() });
            }
        }
        if let Some(kind) = self.kind {
            if vector.kind() != kind {
                return Err(Error::TypeMismatch {
                    expected: kind.to_string(),
                    got: vector.kind().to_string(),
                });
            }
        }
        let dense = vector.to_dense();
        self.config.metric.check(&dense)?;
        Ok(dense)
    }

    /// Nearest-child descent from `start`.
    fn locate(&self, start: NodeId, x: &[f64]) -> Placement {
        let metric = self.config.metric;
        let mut current = start;
        loop {
            let node = self.get(current);
            let here = metric.distance(x, &node.centroid());
            let Some((nearest, best)) = self.nearest_child(node, x) else {
                return Placement::Wrap { target: current, distance: here };
            };
            if here < best {
                // joining must not stretch the node past its merge distance
                return if here <= node.height() {
                    Placement::Attach(current)
                } else {
                    Placement::Wrap { target: current, distance: here }
                };
            }
            current = nearest;
        }
    }

    /// Closest child by centroid distance. Ties go to the lower id. `None`
    /// for a leaf.
    fn nearest_child(&self, node: &ClusterNode, x: &[f64]) -> Option<(NodeId, f64)> {
        let metric = self.config.metric;
        node.children
            .iter()
            .map(|&c| (c, metric.distance(x, &self.get(c).centroid())))
            .min_by(|(a_id, a_d), (b_id, b_d)| a_d.total_cmp(b_d).then(a_id.cmp(b_id)))
    }

    /// Lift a wrap placement until its distance fits under its parent's
    /// merge distance.
    fn restore_nesting(&self, x: &[f64], placement: Placement) -> Placement {
        let Placement::Wrap { mut target, mut distance } = placement else {
            return placement;
        };

        while let Some(parent) = self.get(target).parent {
            let parent_node = self.get(parent);
            let ceiling = parent_node.height();
            if distance <= ceiling {
                break;
            }

            let lifted = self.config.metric.distance(x, &parent_node.centroid());
            trace!(from = %target, to = %parent, distance, lifted, ceiling, "rotating merge upward");
            if lifted < ceiling {
                return Placement::Attach(parent);
            }
            target = parent;
            distance = lifted;
        }

        Placement::Wrap { target, distance }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.get_mut(parent).children.push(child);
        self.get_mut(child).parent = Some(parent);
    }

    /// Replace `target` with a new internal node holding `[target, leaf]`.
    fn wrap(&mut self, target: NodeId, leaf: NodeId, dense: &[f64], distance: f64) -> NodeId {
        let merged = self.next_id();
        let mut summary = self.get(target).to_summary();
        summary.absorb(dense);

        let parent = self.get(target).parent;
        let mut node = ClusterNode::internal(merged, Children::from_slice(&[target, leaf]), summary, distance);
        node.parent = parent;
        self.nodes.push(node);

        match parent {
            Some(p) => {
                for slot in self.get_mut(p).children.iter_mut() {
                    if *slot == target {
                        *slot = merged;
                    }
                }
            }
            None => self.root = Some(merged),
        }
        self.get_mut(target).parent = Some(merged);
        self.get_mut(leaf).parent = Some(merged);

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HierarchyConfig;
    use pretty_assertions::assert_eq;

    fn ids(raw: &[u64]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn first_vector_becomes_root_leaf() {
        let mut h = Hierarchy::default();
        let id = h.incorporate([1.0, 2.0]).unwrap();
        assert_eq!(id, NodeId(0));
        assert_eq!(h.root_id(), Some(id));
        assert!(h.root().unwrap().is_leaf());
        assert_eq!(h.dimension(), Some(2));
        assert_eq!(h.vector_kind(), Some(VectorKind::Dense));
    }

    #[test]
    fn second_vector_wraps_the_root() {
        let mut h = Hierarchy::default();
        h.fit([[0.0, 0.0], [3.0, 4.0]]).unwrap();
        let root = h.root().unwrap();
        assert_eq!(root.id(), NodeId(2));
        assert_eq!(root.children(), ids(&[0, 1]).as_slice());
        assert_eq!(root.merge_distance(), Some(5.0));
        assert_eq!(root.centroid(), vec![1.5, 2.0]);
        assert_eq!(root.leaf_count(), 2);
    }

    #[test]
    fn central_vector_attaches_directly() {
        let mut h = Hierarchy::default();
        h.fit([[0.0], [10.0], [5.0]]).unwrap();
        // 5 sits on the root centroid, nearer to it than to either child
        let root = h.root().unwrap();
        assert_eq!(root.children(), ids(&[0, 1, 3]).as_slice());
        assert_eq!(root.merge_distance(), Some(10.0));
        assert_eq!(h.len(), 4);
        assert_eq!(h.get(NodeId(3)).parent(), Some(NodeId(2)));
    }

    #[test]
    fn far_vector_rotates_above_tight_pair() {
        let mut h = Hierarchy::default();
        h.fit([[0.0], [1.0], [10.0]]).unwrap();
        // the descent ends at leaf 1 (distance 9), which exceeds the
        // pair's merge distance of 1, so the merge moves above the pair
        let root = h.root().unwrap();
        assert_eq!(root.id(), NodeId(4));
        assert_eq!(root.children(), ids(&[2, 3]).as_slice());
        assert_eq!(root.merge_distance(), Some(9.5));
        assert_eq!(h.get(NodeId(2)).parent(), Some(NodeId(4)));
        assert_eq!(h.get(NodeId(2)).children(), ids(&[0, 1]).as_slice());
    }

    #[test]
    fn without_restoration_the_merge_stays_put() {
        let mut h = Hierarchy::new(HierarchyConfig::default().with_restore_nesting(false));
        h.fit([[0.0], [1.0], [10.0]]).unwrap();
        let root = h.root().unwrap();
        assert_eq!(root.id(), NodeId(2));
        assert_eq!(root.children(), ids(&[0, 4]).as_slice());
        assert_eq!(h.get(NodeId(4)).merge_distance(), Some(9.0));
        assert_eq!(h.get(NodeId(4)).children(), ids(&[1, 3]).as_slice());
    }

    #[test]
    fn distant_vector_does_not_join_a_tight_node() {
        let mut h = Hierarchy::default();
        h.fit([[-1.0, 0.0], [1.0, 0.0], [0.0, 100.0]]).unwrap();
        // nearer the pair's centroid than either leaf, but 100 away from it
        let root = h.root().unwrap();
        assert_eq!(root.id(), NodeId(4));
        assert_eq!(root.children(), ids(&[2, 3]).as_slice());
        assert_eq!(root.merge_distance(), Some(100.0));
        assert_eq!(h.get(NodeId(2)).children(), ids(&[0, 1]).as_slice());
        assert_eq!(h.fcluster(Some(2.0)).unwrap(), vec![ids(&[0, 1]), ids(&[3])]);
    }

    #[test]
    fn distant_vector_wraps_an_inner_node() {
        let mut h = Hierarchy::default();
        h.fit([[-1.0, 0.0], [1.0, 0.0], [500.0, 0.0], [0.0, 50.0]]).unwrap();
        // the descent stops at the pair (merge distance 2), 50 away
        let pair_parent = h.get(NodeId(2)).parent().unwrap();
        assert_eq!(pair_parent, NodeId(6));
        assert_eq!(h.get(pair_parent).children(), ids(&[2, 5]).as_slice());
        assert_eq!(h.get(pair_parent).merge_distance(), Some(50.0));
        assert_eq!(h.get(NodeId(2)).children(), ids(&[0, 1]).as_slice());
        assert_eq!(
            h.fcluster(Some(2.0)).unwrap(),
            vec![ids(&[0, 1]), ids(&[5]), ids(&[3])]
        );
    }

    #[test]
    fn equidistant_children_prefer_lower_id() {
        let config = HierarchyConfig::default().with_metric(Metric::Cosine);
        let mut h = Hierarchy::new(config);
        h.fit([[1.0, 0.0], [0.0, 1.0]]).unwrap();

        // (-1, -1) is exactly as far from leaf 0 as from leaf 1, and farther
        // still from the pair's centroid, so the walk has to pick a child
        let x = [-1.0, -1.0];
        let root = h.get(NodeId(2));
        let tied = cosine_distance(&x, &[1.0, 0.0]);
        assert_eq!(tied, cosine_distance(&x, &[0.0, 1.0]));
        assert_eq!(h.nearest_child(root, &x), Some((NodeId(0), tied)));
        assert_eq!(h.nearest_child(h.get(NodeId(0)), &x), None);
        assert_eq!(h.locate(NodeId(2), &x), Placement::Wrap { target: NodeId(0), distance: tied });
    }

    #[test]
    fn equidistant_descent_wraps_the_lower_id() {
        let config = HierarchyConfig::default()
            .with_metric(Metric::Cosine)
            .with_restore_nesting(false);
        let mut h = Hierarchy::new(config);
        h.fit([[1.0, 0.0], [0.0, 1.0], [-1.0, -1.0]]).unwrap();

        let root = h.root().unwrap();
        assert_eq!(root.id(), NodeId(2));
        assert_eq!(root.children(), ids(&[4, 1]).as_slice());
        assert_eq!(h.get(NodeId(4)).children(), ids(&[0, 3]).as_slice());
    }

    #[test]
    fn sparse_leaves_keep_only_their_entries() {
        let mut h = Hierarchy::new(HierarchyConfig::default().with_metric(Metric::Cosine));
        h.fit([
            FeatureVector::sparse(50_000, [(3, 1.0), (40_000, 2.0)]).unwrap(),
            FeatureVector::sparse(50_000, [(3, 2.0), (40_000, 4.0)]).unwrap(),
        ])
        .unwrap();

        let leaf = h.get(NodeId(1));
        assert!(leaf.summary().is_none());
        assert_eq!(leaf.vector().map(|v| v.kind()), Some(VectorKind::Sparse));
        let root = h.root().unwrap();
        assert_eq!(root.summary().map(Summary::count), Some(2));
        assert_eq!(root.centroid()[40_000], 3.0);
    }

    #[test]
    fn ancestors_summaries_track_every_leaf() {
        let mut h = Hierarchy::default();
        h.fit([[0.0], [1.0], [2.0], [100.0], [101.0], [102.0]]).unwrap();
        let root = h.root().unwrap();
        assert_eq!(root.leaf_count(), 6);
        assert!((root.centroid()[0] - 51.0).abs() < 1e-9);
        for node in h.nodes().filter(|n| !n.is_leaf()) {
            let below: u64 = node.children().iter().map(|&c| h.get(c).leaf_count()).sum();
            assert_eq!(node.leaf_count(), below, "node {}", node.id());
        }
        assert!(h.validate().is_ok());
    }

    #[test]
    fn identical_vectors_merge_at_zero() {
        let mut h = Hierarchy::default();
        h.fit([[4.0, 4.0], [4.0, 4.0]]).unwrap();
        assert_eq!(h.root().unwrap().merge_distance(), Some(0.0));
    }

    #[test]
    fn rejects_dimension_mismatch_without_mutation() {
        let mut h = Hierarchy::default();
        h.fit([[0.0, 0.0], [1.0, 1.0]]).unwrap();
        let before = h.clone();
        let err = h.incorporate([1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 3 }));
        assert_eq!(h, before);
    }

    #[test]
    fn rejects_vector_kind_mismatch() {
        let mut h = Hierarchy::default();
        h.incorporate([1.0, 0.0, 0.0]).unwrap();
        let sparse = FeatureVector::sparse(3, [(0, 1.0)]).unwrap();
        assert!(matches!(h.incorporate(sparse), Err(Error::TypeMismatch { .. })));
        assert_eq!(h.leaf_count(), 1);
    }

    #[test]
    fn rejects_non_finite_and_out_of_domain() {
        let mut h = Hierarchy::default();
        assert!(matches!(h.incorporate([f64::NAN]), Err(Error::InvalidVector(_))));
        assert!(h.is_empty());

        let mut h = Hierarchy::new(HierarchyConfig::default().with_metric(Metric::Jaccard));
        assert!(matches!(h.incorporate([1.0, -1.0]), Err(Error::InvalidVector(_))));
        assert!(h.is_empty());
    }

    #[test]
    fn fit_stops_at_first_bad_vector() {
        let mut h = Hierarchy::default();
        let err = h.fit(vec![vec![0.0], vec![1.0], vec![2.0, 3.0], vec![4.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert_eq!(h.leaf_count(), 2);
    }
}
