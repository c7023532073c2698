//! # Sprite Sim
//!
//! Deterministic sprite-object simulation for a classic first-person RPG
//! engine: projectiles, spell effects, trap bursts and dropped items
//! flying, bouncing and exploding through indoor and outdoor levels.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SPRITE SIM                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── trig.rs     - 2048-step sine table, atan2               │
//! │  ├── vec3.rs     - Integer 3D vector                         │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Simulation (deterministic)                │
//! │  ├── registry.rs - Sprite object slot table                  │
//! │  ├── physics.rs  - Per-tick integrator                       │
//! │  ├── collision.rs- Swept-sphere narrow phase                 │
//! │  ├── impact.rs   - Spell impact resolver                     │
//! │  ├── damage.rs   - Damage routing                            │
//! │  ├── trap.rs     - Traps, drops, splashes                    │
//! │  └── tick.rs     - Per-tick entry point                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same starting state and elapsed times, a run produces
//! **identical state hashes and events** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec3::Vec3i;
pub use core::rng::DeterministicRng;
pub use game::state::{GameTime, SimState};
pub use game::tick::{tick, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation ticks per real second.
pub const TICKS_PER_SECOND: i32 = 128;
