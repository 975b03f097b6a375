//! Text rendering of a hierarchy.
//!
//! Each subtree becomes a rectangular block of text. Leaves are their
//! label. Internal nodes centre their label over a brace joining the
//! midpoints of their children's blocks, which sit side by side below:
//!
//! ```text
//!   9.50
//!   +----+
//! 1.00  #3
//!  +--+
//! #0 #1
//! ```
//!
//! Rendering reads only the tree shape and a label per node; it never
//! touches vectors, statistics or the mutation API. Layout walks the tree
//! with explicit stacks, so arbitrarily deep chains render without
//! recursion.

use hashbrown::HashMap;

use crate::hierarchy::Hierarchy;
use crate::model::{ClusterNode, NodeId};
use crate::{Error, Result};

/// Renders a hierarchy as aligned text blocks.
pub struct TreeRenderer<F = fn(&ClusterNode) -> String> {
    label: F,
}

fn default_label(node: &ClusterNode) -> String {
    node.to_string()
}

impl TreeRenderer {
    /// Renderer using each node's `Display` label.
    pub fn new() -> Self {
        Self { label: default_label }
    }
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Fn(&ClusterNode) -> String> TreeRenderer<F> {
    /// Renderer with a custom label per node.
    pub fn with_label(label: F) -> Self {
        Self { label }
    }

    /// Render the whole hierarchy.
    pub fn render(&self, hierarchy: &Hierarchy) -> Result<String> {
        let root = hierarchy.root_id().ok_or(Error::EmptyHierarchy)?;
        self.render_node(hierarchy, root)
    }

    /// Render the subtree rooted at `id`.
    pub fn render_node(&self, hierarchy: &Hierarchy, id: NodeId) -> Result<String> {
        if hierarchy.node(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        let boxes = self.measure(hierarchy, id);
        let outer = &boxes[&id];
        let mut canvas = Canvas::new(outer.width, outer.height);

        // pre-order: every subtree gets its top-left corner from its parent
        let mut stack = vec![(id, 0, 0)];
        while let Some((current, x, y)) = stack.pop() {
            let node = hierarchy.get(current);
            let frame = &boxes[&current];
            canvas.write(x, y, &format!("{:^width$}", frame.label, width = frame.width));
            if node.is_leaf() {
                continue;
            }

            let mut midpoints = Vec::with_capacity(node.children().len());
            let mut left = x;
            for &child in node.children() {
                let width = boxes[&child].width;
                midpoints.push(left + width / 2);
                stack.push((child, left, y + 2));
                left += width + 1;
            }
            canvas.brace(y + 1, &midpoints);
        }
        Ok(canvas.into_string())
    }

    /// Label and block size of every node under `id`, computed bottom-up.
    fn measure(&self, hierarchy: &Hierarchy, id: NodeId) -> HashMap<NodeId, Frame> {
        let mut boxes: HashMap<NodeId, Frame> = HashMap::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            let node = hierarchy.get(current);
            if !node.is_leaf() && !expanded {
                stack.push((current, true));
                stack.extend(node.children().iter().map(|&c| (c, false)));
                continue;
            }

            let label = (self.label)(node);
            let label_width = label.chars().count();
            let frame = if node.is_leaf() {
                Frame { label, width: label_width, height: 1 }
            } else {
                let below = node.children().iter().map(|c| &boxes[c]);
                let (sum, tallest) = below.fold((0, 0), |(w, h), f| (w + f.width, h.max(f.height)));
                let spread = sum + node.children().len() - 1;
                Frame { label, width: spread.max(label_width), height: tallest + 2 }
            };
            boxes.insert(current, frame);
        }
        boxes
    }
}

/// A subtree's label and the rectangle its rendering occupies.
struct Frame {
    label: String,
    width: usize,
    height: usize,
}

/// Fixed-size character grid, blank by default.
struct Canvas {
    rows: Vec<Vec<char>>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self { rows: vec![vec![' '; width]; height] }
    }

    fn write(&mut self, x: usize, y: usize, text: &str) {
        for (cell, c) in self.rows[y][x..].iter_mut().zip(text.chars()) {
            *cell = c;
        }
    }

    /// `+` at each midpoint, `-` between the outermost ones.
    fn brace(&mut self, y: usize, midpoints: &[usize]) {
        let (Some(&first), Some(&last)) = (midpoints.first(), midpoints.last()) else {
            return;
        };
        for (i, cell) in self.rows[y][first..=last].iter_mut().enumerate() {
            *cell = if midpoints.contains(&(first + i)) { '+' } else { '-' };
        }
    }

    fn into_string(self) -> String {
        self.rows
            .into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
