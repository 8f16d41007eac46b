//! Depth-first walks over a built [`QuadTree`](crate::QuadTree).
//!
//! Children are always visited in slot order 0..3, which is the curve
//! order: the symmetry bookkeeping has already placed each slot in the
//! right quadrant. Both iterators keep an explicit stack, so they are
//! lazy and cheap to restart.
//!
//! # Jumps
//!
//! With an adaptive field, neighbouring subtrees can stop at different
//! depths. Consecutive leaf regions still share an edge, but a coarse
//! leaf's anchor can sit several fine cells away from the next fine
//! leaf's anchor, and the rendered polyline shows a visible jump. This
//! is the price of local resolution and is left as is. [`count_jumps`]
//! measures it.

use crate::tree::QuadNode;

/// Pre-order iterator over every node.
#[derive(Debug, Clone)]
pub struct Nodes<'a> {
    stack: Vec<&'a QuadNode>,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(root: &'a QuadNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a QuadNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}

/// Leaves in curve order.
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    nodes: Nodes<'a>,
}

impl<'a> Leaves<'a> {
    pub(crate) fn new(root: &'a QuadNode) -> Self {
        Self {
            nodes: Nodes::new(root),
        }
    }
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a QuadNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.by_ref().find(|node| node.is_leaf())
    }
}

/// Count consecutive leaves whose anchors are farther apart than the
/// smaller leaf's side.
///
/// Zero for a uniform tree built from a continuous orientation.
pub fn count_jumps<'a>(leaves: impl IntoIterator<Item = &'a QuadNode>) -> usize {
    let mut jumps = 0;
    let mut previous: Option<&QuadNode> = None;
    for leaf in leaves {
        if let Some(prev) = previous {
            let (a, b) = (prev.region(), leaf.region());
            let step = a.width.min(b.width).max(a.height.min(b.height));
            if prev.anchor().distance(leaf.anchor()) > step * (1.0 + 1e-9) {
                jumps += 1;
            }
        }
        previous = Some(leaf);
    }
    jumps
}
