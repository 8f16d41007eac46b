//! Adaptive quadtree behind the pseudo-Hilbert curve.
//!
//! Each node covers a [`Region`] and carries the [`SymmetryElement`]
//! orienting the Hilbert pattern inside it. An internal node splits its
//! region into four half-size quadrants and hands each child a symmetry
//! derived from its own:
//!
//! | slot | child symmetry            |
//! |------|---------------------------|
//! | 0    | `parent · (r³, mirrored)` |
//! | 1    | `parent`                  |
//! | 2    | `parent`                  |
//! | 3    | `parent · (r¹, mirrored)` |
//!
//! Slot `i` is placed at canonical offset `permute_quadrant(i)` of the
//! parent, out of `(0,0), (0,h), (w,h), (w,0)`. Visiting slots 0..3 then
//! walks the classic "U", with the two end quadrants turned so their
//! entry and exit meet the neighbours.
//!
//! A node at `level` is split iff `level < max_level` and the density
//! field asks for more than `level` over its region. Sibling subtrees may
//! therefore stop at different depths.

use crate::density::DensityField;
use crate::symmetry::SymmetryElement;
use crate::traversal::{Leaves, Nodes};
use crate::types::{CurveError, Point, Polyline, Region};

/// Symmetry each canonical child slot composes onto its parent's.
pub const CHILD_SYMMETRIES: [SymmetryElement; 4] = [
    SymmetryElement::new(3, true),
    SymmetryElement::IDENTITY,
    SymmetryElement::IDENTITY,
    SymmetryElement::new(1, true),
];

/// Canonical quadrant offsets in units of the child's width and height.
const CANONICAL_OFFSETS: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];

/// A quadtree node. Built once by [`QuadTree::build`] and read-only after.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadNode {
    symmetry: SymmetryElement,
    level: u32,
    region: Region,
    children: Children,
}

/// Either nothing below this node or exactly four children in slot order.
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    /// The node contributes one point to the curve.
    Leaf,
    /// Four children, visited in slot order 0..3.
    Internal(Box<[QuadNode; 4]>),
}

impl QuadNode {
    const fn leaf(symmetry: SymmetryElement, level: u32, region: Region) -> Self {
        Self {
            symmetry,
            level,
            region,
            children: Children::Leaf,
        }
    }

    /// Orientation of the curve inside this node.
    #[must_use]
    pub const fn symmetry(&self) -> SymmetryElement {
        self.symmetry
    }

    /// Depth below the root (root is `0`).
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Area covered by this node.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// The point this node contributes when it is a leaf.
    #[must_use]
    pub const fn anchor(&self) -> Point {
        self.region.position
    }

    /// Returns `true` if the node has no children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.children, Children::Leaf)
    }

    /// The four children in slot order, if any.
    #[must_use]
    pub fn children(&self) -> Option<&[Self; 4]> {
        match &self.children {
            Children::Leaf => None,
            Children::Internal(children) => Some(children),
        }
    }
}

/// The four child regions and symmetries of a node, in slot order.
#[must_use]
pub fn split(symmetry: SymmetryElement, region: &Region) -> [(SymmetryElement, Region); 4] {
    let half_width = region.width / 2.0;
    let half_height = region.height / 2.0;
    std::array::from_fn(|slot| {
        let (ox, oy) = CANONICAL_OFFSETS[symmetry.permute_quadrant(slot)];
        let child_region = Region::new(
            ox.mul_add(half_width, region.position.x),
            oy.mul_add(half_height, region.position.y),
            half_width,
            half_height,
        );
        (symmetry * CHILD_SYMMETRIES[slot], child_region)
    })
}

/// An adaptive pseudo-Hilbert quadtree.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadTree {
    root: QuadNode,
    max_level: u32,
}

impl QuadTree {
    /// Build the tree top-down, consulting `field` once per node.
    ///
    /// Field values that are negative or NaN are treated as `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::InvalidConfig`] if `root` does not have a
    /// finite anchor and strictly positive finite extents. No partial
    /// tree is built.
    #[tracing::instrument(skip_all, fields(max_level = max_level))]
    pub fn build<D: DensityField + ?Sized>(
        root: Region,
        root_symmetry: SymmetryElement,
        max_level: u32,
        field: &D,
    ) -> Result<Self, CurveError> {
        root.validate()?;

        let subdivides = |level: u32, region: &Region| {
            level < max_level && f64::from(level) < required_level(field, region)
        };

        let root = if subdivides(0, &root) {
            assemble(root_symmetry, root, &subdivides)
        } else {
            QuadNode::leaf(root_symmetry, 0, root)
        };

        let tree = Self { root, max_level };
        tracing::debug!(
            leaves = tree.leaves().count(),
            depth = tree.depth(),
            "built quadtree"
        );
        Ok(tree)
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> &QuadNode {
        &self.root
    }

    /// The depth cap the tree was built with.
    #[must_use]
    pub const fn max_level(&self) -> u32 {
        self.max_level
    }

    /// All nodes in pre-order, children in slot order.
    #[must_use]
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes::new(&self.root)
    }

    /// Leaves in curve order.
    ///
    /// Each call starts a fresh traversal yielding the same sequence.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves::new(&self.root)
    }

    /// Leaf anchors in curve order.
    #[must_use]
    pub fn points(&self) -> Polyline {
        self.leaves().map(QuadNode::anchor).collect()
    }

    /// Deepest leaf level.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.leaves().map(QuadNode::level).max().unwrap_or(0)
    }
}

/// Query `field` and clamp contract violations to zero.
fn required_level<D: DensityField + ?Sized>(field: &D, region: &Region) -> f64 {
    let value = field.evaluate(region);
    if value.is_nan() || value < 0.0 {
        tracing::warn!(
            value,
            x = region.position.x,
            y = region.position.y,
            "density field returned an invalid level, using 0"
        );
        0.0
    } else {
        value
    }
}

/// An internal node whose children are being decided.
///
/// Children start out as leaves and are replaced as their own subtrees
/// close.
struct Frame {
    symmetry: SymmetryElement,
    level: u32,
    region: Region,
    children: Box<[QuadNode; 4]>,
    next: usize,
}

impl Frame {
    fn open(symmetry: SymmetryElement, level: u32, region: Region) -> Self {
        let children = split(symmetry, &region)
            .map(|(child_symmetry, child_region)| {
                QuadNode::leaf(child_symmetry, level + 1, child_region)
            });
        Self {
            symmetry,
            level,
            region,
            children: Box::new(children),
            next: 0,
        }
    }

    fn close(self) -> QuadNode {
        QuadNode {
            symmetry: self.symmetry,
            level: self.level,
            region: self.region,
            children: Children::Internal(self.children),
        }
    }
}

/// Grow the subtree under a node already known to subdivide.
///
/// Uses an explicit stack so depth is bounded by heap, not call stack.
fn assemble(
    symmetry: SymmetryElement,
    region: Region,
    subdivides: &impl Fn(u32, &Region) -> bool,
) -> QuadNode {
    let mut stack: Vec<Frame> = Vec::new();
    let mut current = Frame::open(symmetry, 0, region);

    loop {
        if current.next < 4 {
            let slot = current.next;
            current.next += 1;
            let child = &current.children[slot];
            if subdivides(child.level, &child.region) {
                let opened = Frame::open(child.symmetry, child.level, child.region);
                stack.push(std::mem::replace(&mut current, opened));
            }
        } else {
            let finished = current.close();
            match stack.pop() {
                Some(mut parent) => {
                    parent.children[parent.next - 1] = finished;
                    current = parent;
                }
                None => return finished,
            }
        }
    }
}
