//! Core deterministic primitives.
//!
//! Integer-only math shared by the integrator, the collision routines and
//! the impact resolver.

pub mod fixed;
pub mod trig;
pub mod vec3;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec3::Vec3i;
pub use rng::DeterministicRng;
pub use hash::compute_state_hash;
