//! Integer 3D Vector
//!
//! World positions and velocities. Components are plain integer units;
//! `normalize_to_fixpoint` produces a Q16.16 direction.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use serde::{Deserialize, Serialize};

use super::fixed::{fixpoint_mul, isqrt_u64, saturate_i32, FIXED_SCALE};
use super::trig;

/// 3D vector with i32 components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3i {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
    /// Z component (up)
    pub z: i32,
}

impl Vec3i {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Dot product, widened.
    #[inline]
    pub fn dot(self, other: Self) -> i64 {
        self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64 + self.z as i64 * other.z as i64
    }

    /// Squared length.
    #[inline]
    pub fn length_sqr(self) -> i64 {
        self.dot(self)
    }

    /// Squared length of the horizontal part.
    #[inline]
    pub fn xy_length_sqr(self) -> i64 {
        self.x as i64 * self.x as i64 + self.y as i64 * self.y as i64
    }

    /// Length, rounded down.
    #[inline]
    pub fn length(self) -> i32 {
        saturate_i32(isqrt_u64(self.length_sqr() as u64) as i64)
    }

    /// Length of the horizontal part, rounded down.
    #[inline]
    pub fn xy_length(self) -> i32 {
        saturate_i32(isqrt_u64(self.xy_length_sqr() as u64) as i64)
    }

    /// Unit direction in Q16.16. Zero stays zero.
    pub fn normalize_to_fixpoint(self) -> Self {
        let len = isqrt_u64(self.length_sqr() as u64) as i64;
        if len == 0 {
            return Self::ZERO;
        }
        let scale = |c: i32| saturate_i32(((c as i64) << FIXED_SCALE) / len);
        Self::new(scale(self.x), scale(self.y), scale(self.z))
    }

    /// Offset from `self` by `depth` units along (yaw, pitch).
    pub fn rotated(self, depth: i32, yaw: i32, pitch: i32) -> Self {
        let horizontal = fixpoint_mul(trig::cos(pitch), depth);
        Self {
            x: self.x.wrapping_add(fixpoint_mul(trig::cos(yaw), horizontal)),
            y: self.y.wrapping_add(fixpoint_mul(trig::sin(yaw), horizontal)),
            z: self.z.wrapping_add(fixpoint_mul(trig::sin(pitch), depth)),
        }
    }
}

impl Add for Vec3i {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_add(rhs.x),
            y: self.y.wrapping_add(rhs.y),
            z: self.z.wrapping_add(rhs.z),
        }
    }
}

impl AddAssign for Vec3i {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3i {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(rhs.x),
            y: self.y.wrapping_sub(rhs.y),
            z: self.z.wrapping_sub(rhs.z),
        }
    }
}

impl Neg for Vec3i {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(self.x.wrapping_neg(), self.y.wrapping_neg(), self.z.wrapping_neg())
    }
}

impl fmt::Display for Vec3i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3i::new(3, 4, 5);
        let b = Vec3i::new(1, 2, 3);
        assert_eq!(a + b, Vec3i::new(4, 6, 8));
        assert_eq!(a - b, Vec3i::new(2, 2, 2));
        assert_eq!(-a, Vec3i::new(-3, -4, -5));
        assert_eq!(a.dot(b), 26);
    }

    #[test]
    fn test_lengths() {
        let v = Vec3i::new(3, 4, 12);
        assert_eq!(v.length_sqr(), 169);
        assert_eq!(v.length(), 13);
        assert_eq!(v.xy_length_sqr(), 25);
        assert_eq!(v.xy_length(), 5);
    }

    #[test]
    fn test_normalize_to_fixpoint() {
        let n = Vec3i::new(0, 0, -250).normalize_to_fixpoint();
        assert_eq!(n, Vec3i::new(0, 0, -FIXED_ONE));

        let n = Vec3i::new(3, 4, 0).normalize_to_fixpoint();
        assert_eq!(n.x, 3 * FIXED_ONE / 5);
        assert_eq!(n.y, 4 * FIXED_ONE / 5);

        assert_eq!(Vec3i::ZERO.normalize_to_fixpoint(), Vec3i::ZERO);
    }

    #[test]
    fn test_rotated() {
        let base = Vec3i::new(100, 100, 0);
        assert_eq!(base.rotated(24, 0, 0), Vec3i::new(124, 100, 0));
        assert_eq!(base.rotated(8, 512, 0), Vec3i::new(100, 108, 0));
        assert_eq!(base.rotated(10, 0, 512), Vec3i::new(100, 100, 10));
    }
}
