//! Dihedral symmetries of the square.
//!
//! Every node of the curve quadtree carries a [`SymmetryElement`]: the
//! orientation of the Hilbert pattern inside that square relative to the
//! canonical "U" (enter bottom-left, exit bottom-right). The eight
//! elements are `r^i s^α` with `r` a quarter turn and `s` a mirror.
//!
//! Composition follows `r^i s^α · r^j s^β = r^(i + (-1)^α j) s^(α + β)`,
//! i.e. a reflection on the left flips the direction of the right-hand
//! rotation.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// An element of the dihedral group of order 8.
///
/// The rotation count is always reduced modulo 4, so two values compare
/// equal exactly when they denote the same group element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawSymmetry", into = "RawSymmetry")]
pub struct SymmetryElement {
    rotation: u8,
    reflection: bool,
}

/// Unnormalized wire form; deserialization reduces `rotation` mod 4.
#[derive(Serialize, Deserialize)]
struct RawSymmetry {
    rotation: u8,
    reflection: bool,
}

impl From<RawSymmetry> for SymmetryElement {
    fn from(raw: RawSymmetry) -> Self {
        Self::new(raw.rotation, raw.reflection)
    }
}

impl From<SymmetryElement> for RawSymmetry {
    fn from(element: SymmetryElement) -> Self {
        Self {
            rotation: element.rotation,
            reflection: element.reflection,
        }
    }
}

impl SymmetryElement {
    /// The identity: no rotation, no reflection.
    pub const IDENTITY: Self = Self::new(0, false);

    /// All eight group elements, rotations first.
    pub const ALL: [Self; 8] = [
        Self::new(0, false),
        Self::new(1, false),
        Self::new(2, false),
        Self::new(3, false),
        Self::new(0, true),
        Self::new(1, true),
        Self::new(2, true),
        Self::new(3, true),
    ];

    /// Create an element from a quarter-turn count (reduced mod 4) and a
    /// reflection flag.
    #[must_use]
    pub const fn new(rotation: u8, reflection: bool) -> Self {
        Self {
            rotation: rotation % 4,
            reflection,
        }
    }

    /// Number of counter-clockwise quarter turns, in `0..=3`.
    #[must_use]
    pub const fn rotation(self) -> u8 {
        self.rotation
    }

    /// Whether the element includes a mirror reflection.
    #[must_use]
    pub const fn reflection(self) -> bool {
        self.reflection
    }

    /// Group multiplication `self · other`.
    #[must_use]
    pub const fn compose(self, other: Self) -> Self {
        let rotation = if self.reflection {
            (4 - other.rotation) % 4
        } else {
            other.rotation
        };
        Self::new(
            self.rotation + rotation,
            self.reflection != other.reflection,
        )
    }

    /// The unique element `e'` with `self · e' == IDENTITY`.
    ///
    /// Reflections are involutions; pure rotations invert by turning back.
    #[must_use]
    pub const fn inverse(self) -> Self {
        if self.reflection {
            self
        } else {
            Self::new((4 - self.rotation) % 4, false)
        }
    }

    /// Apply the transform to a 2D vector: rotate by `rotation` quarter
    /// turns (`(x, y) -> (-y, x)` each), then negate `x` if reflected.
    #[must_use]
    pub fn apply_to_vector(self, v: Point) -> Point {
        let mut out = v;
        for _ in 0..self.rotation {
            out = Point::new(-out.y, out.x);
        }
        if self.reflection {
            out.x = -out.x;
        }
        out
    }

    /// Where canonical quadrant slot `index` lands under this symmetry.
    ///
    /// Slots are numbered around the square in the order of the canonical
    /// offsets `(0,0), (0,h), (w,h), (w,0)`. The result is a bijection on
    /// `0..4` for every element. `index` is taken mod 4.
    #[must_use]
    pub const fn permute_quadrant(self, index: usize) -> usize {
        let shifted = (self.rotation as usize + index) % 4;
        if self.reflection {
            (3 * (shifted + 1)) % 4
        } else {
            shifted
        }
    }
}

impl Mul for SymmetryElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(rhs)
    }
}
