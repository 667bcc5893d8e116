use core::ops::{Add, Mul, Sub};

/// 3D vector in pixels (z is depth).
///
/// Unit-interval vectors are also used for parent-origin and anchor-point
/// factors, where each component selects a fraction of the reference size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Componentwise (Hadamard) product. This is the operation behind
    /// origin/anchor arithmetic: `size.scaled_by(parent_origin)` picks the
    /// pixel offset of a unit-interval factor inside `size`.
    #[inline]
    pub fn scaled_by(self, factor: Self) -> Self {
        Self::new(self.x * factor.x, self.y * factor.y, self.z * factor.z)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f32; 3]> for Vector3 {
    #[inline]
    fn from(values: [f32; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

/// Axis-aligned box in world pixels: top-left-near origin plus extents.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect3 {
    pub origin: Vector3,
    pub size: Vector3,
}

impl Rect3 {
    #[inline]
    pub const fn from_origin_size(origin: Vector3, size: Vector3) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vector3 {
        self.origin + self.size
    }

    /// True when the box covers no pixels in the x/y plane.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }
}

/// Parent-origin factors. The z component of 0.5 keeps depth centered, the
/// convention inherited from the toolkit these constants mirror.
pub mod parent_origin {
    use super::Vector3;

    pub const TOP_LEFT: Vector3 = Vector3::new(0.0, 0.0, 0.5);
    pub const TOP_CENTER: Vector3 = Vector3::new(0.5, 0.0, 0.5);
    pub const TOP_RIGHT: Vector3 = Vector3::new(1.0, 0.0, 0.5);
    pub const CENTER_LEFT: Vector3 = Vector3::new(0.0, 0.5, 0.5);
    pub const CENTER: Vector3 = Vector3::new(0.5, 0.5, 0.5);
    pub const CENTER_RIGHT: Vector3 = Vector3::new(1.0, 0.5, 0.5);
    pub const BOTTOM_LEFT: Vector3 = Vector3::new(0.0, 1.0, 0.5);
    pub const BOTTOM_CENTER: Vector3 = Vector3::new(0.5, 1.0, 0.5);
    pub const BOTTOM_RIGHT: Vector3 = Vector3::new(1.0, 1.0, 0.5);

    /// Default for newly created nodes.
    pub const DEFAULT: Vector3 = TOP_LEFT;
}

/// Anchor-point factors, same grid as [`parent_origin`].
pub mod anchor_point {
    use super::Vector3;

    pub const TOP_LEFT: Vector3 = Vector3::new(0.0, 0.0, 0.5);
    pub const TOP_CENTER: Vector3 = Vector3::new(0.5, 0.0, 0.5);
    pub const TOP_RIGHT: Vector3 = Vector3::new(1.0, 0.0, 0.5);
    pub const CENTER_LEFT: Vector3 = Vector3::new(0.0, 0.5, 0.5);
    pub const CENTER: Vector3 = Vector3::new(0.5, 0.5, 0.5);
    pub const CENTER_RIGHT: Vector3 = Vector3::new(1.0, 0.5, 0.5);
    pub const BOTTOM_LEFT: Vector3 = Vector3::new(0.0, 1.0, 0.5);
    pub const BOTTOM_CENTER: Vector3 = Vector3::new(0.5, 1.0, 0.5);
    pub const BOTTOM_RIGHT: Vector3 = Vector3::new(1.0, 1.0, 0.5);

    /// Default for newly created nodes: anchored at the center.
    pub const DEFAULT: Vector3 = CENTER;
}
