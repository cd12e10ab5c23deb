use crate::models::Vector3;
use crate::utils::NBodyError;

/// Bit set in an octant code when the x coordinate is on the upper side of the split.
pub const OCTANT_BIT_X: usize = 1;
/// Bit set in an octant code when the y coordinate is on the upper side of the split.
pub const OCTANT_BIT_Y: usize = 2;
/// Bit set in an octant code when the z coordinate is on the upper side of the split.
pub const OCTANT_BIT_Z: usize = 4;

/// An axis-aligned box `[min, max]`.
///
/// Octants are addressed with a 3-bit code: bit 0 for x, bit 1 for y and bit 2 for z.
/// A coordinate greater than or equal to the box midpoint sets its bit. Both
/// [`Bounds3D::octant_of`] and [`Bounds3D::octant`] use this encoding, so a point
/// classified into octant `k` always lies inside `octant(k)`.
///
/// # Example
/// ```
/// use rs_nbody::models::{Bounds3D, Vector3};
///
/// let bounds = Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap();
/// let p = Vector3::new(0.5, -0.5, 0.5);
/// let k = bounds.octant_of(&p);
/// assert_eq!(k, 0b101);
/// assert!(bounds.octant(k).contains(&p));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3D {
    pub min: Vector3,
    pub max: Vector3,
}

impl Bounds3D {
    /// Creates a box, rejecting inverted or non-finite corners.
    pub fn new(min: Vector3, max: Vector3) -> Result<Self, NBodyError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(NBodyError::InvalidBounds);
        }
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(NBodyError::InvalidBounds);
        }
        Ok(Bounds3D { min, max })
    }

    /// Smallest box containing every point. Returns `None` for an empty slice.
    pub fn enclosing(points: &[Vector3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points.iter().fold((first, first), |(lo, hi), p| {
            (lo.component_min(p), hi.component_max(p))
        });
        Some(Bounds3D { min, max })
    }

    /// Grows this box so that every point lies inside it.
    pub fn expanded_to_include(&self, points: &[Vector3]) -> Self {
        points.iter().fold(*self, |b, p| Bounds3D {
            min: b.min.component_min(p),
            max: b.max.component_max(p),
        })
    }

    #[inline]
    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    /// Length of the longest edge, the node size used by the opening-angle test.
    #[inline]
    pub fn longest_edge(&self) -> f64 {
        self.size().max_component()
    }

    /// Closed containment test.
    #[inline]
    pub fn contains(&self, p: &Vector3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
            p.y >= self.min.y && p.y <= self.max.y &&
            p.z >= self.min.z && p.z <= self.max.z
    }

    /// Octant code of `p` relative to the box midpoint.
    #[inline]
    pub fn octant_of(&self, p: &Vector3) -> usize {
        let split = self.center();
        let mut code = 0;
        if p.x >= split.x { code |= OCTANT_BIT_X; }
        if p.y >= split.y { code |= OCTANT_BIT_Y; }
        if p.z >= split.z { code |= OCTANT_BIT_Z; }
        code
    }

    /// The sub-box for octant `code` (only the low three bits are read).
    pub fn octant(&self, code: usize) -> Bounds3D {
        let split = self.center();
        let mut min = self.min;
        let mut max = self.max;

        if code & OCTANT_BIT_X == 0 { max.x = split.x; } else { min.x = split.x; }
        if code & OCTANT_BIT_Y == 0 { max.y = split.y; } else { min.y = split.y; }
        if code & OCTANT_BIT_Z == 0 { max.z = split.z; } else { min.z = split.z; }

        Bounds3D { min, max }
    }
}
