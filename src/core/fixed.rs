//! Q16.16 Fixed-Point Arithmetic
//!
//! Integer-only math for the sprite simulation. World positions are plain
//! integer units; velocities are integer units per tick slice; directions,
//! normals and scale factors are Q16.16.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  1.0 = 65536, unit normals have |n| = 65536                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are widened to i64 (or i128 for swept-volume math) and shifted
//! back, truncating toward negative infinity like the engine's
//! `fixpoint_mul`.

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// ENGINE CONSTANTS
// =============================================================================

/// Per-substep velocity damping: 58500/65536 ≈ 0.893
pub const DAMPING_FACTOR: Fixed = 58500;

/// Faces whose normal z is at or below this (≈0.488) count as steep walls
/// and double the vertical kick on reflection.
pub const STEEP_FACE_NORMAL_Z: Fixed = 32000;

/// Non-floor polygons under a grounded object with normal z below this
/// (≈0.687) keep pulling it down with gravity.
pub const SLIDE_FACE_NORMAL_Z: Fixed = 45000;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Multiply a Q16.16 factor with an integer or Q16.16 value.
///
/// Uses an i64 intermediate and an arithmetic shift, so negative results
/// round toward negative infinity.
#[inline]
pub fn fixpoint_mul(a: Fixed, b: i32) -> i32 {
    ((a as i64 * b as i64) >> FIXED_SCALE) as i32
}

/// Apply the per-substep damping factor to one velocity component.
#[inline]
pub fn damp(v: i32) -> i32 {
    fixpoint_mul(DAMPING_FACTOR, v)
}

/// Floor of the square root of a 128-bit value (Newton iteration).
pub fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Floor of the square root of a 64-bit value.
#[inline]
pub fn isqrt_u64(n: u64) -> u64 {
    isqrt_u128(n as u128) as u64
}

/// Saturating narrow from i64 to i32.
#[inline]
pub fn saturate_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(FIXED_SCALE, 16);
    }

    #[test]
    fn test_fixpoint_mul() {
        assert_eq!(fixpoint_mul(FIXED_ONE, 1234), 1234);
        assert_eq!(fixpoint_mul(FIXED_HALF, 20), 10);
        assert_eq!(fixpoint_mul(FIXED_HALF, -21), -11);
        assert_eq!(fixpoint_mul(2 * FIXED_ONE, 3 * FIXED_ONE), 6 * FIXED_ONE);
    }

    #[test]
    fn test_damp() {
        assert_eq!(damp(0), 0);
        assert_eq!(damp(20), 17);
        assert_eq!(damp(1000), 892);
        assert_eq!(damp(-1000), -893);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt_u64(0), 0);
        assert_eq!(isqrt_u64(1), 1);
        assert_eq!(isqrt_u64(15), 3);
        assert_eq!(isqrt_u64(16), 4);
        assert_eq!(isqrt_u64(1_000_000), 1000);
        assert_eq!(isqrt_u64(u64::MAX), 4_294_967_295);
        assert_eq!(isqrt_u128(1u128 << 100), 1u128 << 50);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate_i32(5), 5);
        assert_eq!(saturate_i32(i64::MAX), i32::MAX);
        assert_eq!(saturate_i32(i64::MIN), i32::MIN);
    }
}
