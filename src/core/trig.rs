//! Integer Trigonometry
//!
//! Angles are integer units with 2048 per full turn. The sine table is
//! built at compile time from an integer Taylor series, so every platform
//! sees the same bits.
//!
//! ```text
//!            512 (+Y)
//!             │
//!   1024 ─────┼───── 0 (+X)
//!             │
//!            1536
//! ```

use super::fixed::{Fixed, FIXED_ONE};

/// Angle units in one full turn.
pub const ANGLE_FULL: i32 = 2048;

/// Half a turn.
pub const ANGLE_PI: i32 = 1024;

/// Quarter turn.
pub const ANGLE_HALF_PI: i32 = 512;

/// Eighth of a turn.
pub const ANGLE_QUARTER_PI: i32 = 256;

/// Mask for wrapping angles into `[0, 2048)`.
pub const ANGLE_MASK: i32 = ANGLE_FULL - 1;

/// π in Q32.
const PI_Q32: i128 = 13_493_037_705;

// =============================================================================
// LOOKUP TABLE
// =============================================================================

/// sin(x) for x in [0, π/2], Q32 in and out.
const fn sin_q32(x: i128) -> i128 {
    let x2 = (x * x) >> 32;
    let mut term = x;
    let mut sum = x;
    let mut n: i128 = 1;
    while n < 16 {
        term = -((term * x2) >> 32) / ((2 * n) * (2 * n + 1));
        if term == 0 {
            break;
        }
        sum += term;
        n += 1;
    }
    sum
}

const fn build_quarter_table() -> [Fixed; 513] {
    let mut table = [0; 513];
    let mut i = 1;
    while i < 512 {
        let x = (i as i128 * PI_Q32) / ANGLE_PI as i128;
        table[i] = ((sin_q32(x) + (1 << 15)) >> 16) as Fixed;
        i += 1;
    }
    table[512] = FIXED_ONE;
    table
}

/// Quarter-wave sine in Q16.16, indexed by angle in `[0, 512]`.
static SIN_QUARTER: [Fixed; 513] = build_quarter_table();

// =============================================================================
// OPERATIONS
// =============================================================================

/// Sine of an angle, Q16.16.
#[inline]
pub fn sin(angle: i32) -> Fixed {
    let a = (angle & ANGLE_MASK) as usize;
    match a / 512 {
        0 => SIN_QUARTER[a],
        1 => SIN_QUARTER[1024 - a],
        2 => -SIN_QUARTER[a - 1024],
        _ => -SIN_QUARTER[2048 - a],
    }
}

/// Cosine of an angle, Q16.16.
#[inline]
pub fn cos(angle: i32) -> Fixed {
    sin(angle.wrapping_add(ANGLE_HALF_PI))
}

/// Angle of the vector `(x, y)` in `[0, 2048)`. The zero vector maps to 0.
pub fn atan2(x: i32, y: i32) -> i32 {
    if x == 0 && y == 0 {
        return 0;
    }
    let ax = (x as i64).abs();
    let ay = (y as i64).abs();

    // Largest k in [0, 512] with tan(k) <= ay / ax.
    let mut lo = 0usize;
    let mut hi = 512usize;
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        let s = SIN_QUARTER[mid] as i64;
        let c = SIN_QUARTER[512 - mid] as i64;
        if s * ax <= c * ay {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let k = lo as i32;

    match (x >= 0, y >= 0) {
        (true, true) => k,
        (false, true) => ANGLE_PI - k,
        (false, false) => ANGLE_PI + k,
        (true, false) => (ANGLE_FULL - k) & ANGLE_MASK,
    }
}

// =============================================================================
// TESTS
// =============================================================================
