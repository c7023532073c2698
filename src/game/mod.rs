//! Game Logic Module
//!
//! All sprite simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `pid`, `sprite`, `descriptor`: what a sprite object is
//! - `registry`: slot table of live sprite objects
//! - `actor`, `party`, `level`: the world sprites collide with (read-mostly)
//! - `collision`: swept-sphere narrow phase
//! - `physics`: per-tick integrator (attached, indoor, outdoor)
//! - `impact`: what happens when a sprite hits something
//! - `damage`: damage routing
//! - `trap`: trap explosions, item drops, splashes
//! - `state`: simulation context passed to everything above
//! - `tick`: per-tick entry point and replay
//! - `events`: side effects for audio, particles, damage and scripts

pub mod pid;
pub mod sprite;
pub mod descriptor;
pub mod registry;
pub mod actor;
pub mod party;
pub mod level;
pub mod collision;
pub mod events;
pub mod config;
pub mod state;
pub mod physics;
pub mod impact;
pub mod damage;
pub mod trap;
pub mod tick;

// Re-export key types
pub use pid::{ObjectKind, Pid};
pub use sprite::{SpriteObject, SpriteType};
pub use descriptor::ObjectList;
pub use registry::{SlotHandle, SpawnOrigin, SpriteRegistry};
pub use config::SimConfig;
pub use state::{GameTime, SimState};
pub use impact::ImpactOutcome;
pub use tick::TickResult;
pub use events::{SimEvent, SimEventData};
