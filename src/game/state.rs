//! Simulation State
//!
//! `SimState` is the context every integrator and resolver function takes
//! by `&mut`: the sprite registry, the descriptor table, the actors and
//! party the sprites can hit, the level they fly through and the RNG.
//!
//! ```text
//!  SimState
//!  ├── registry      slot table of sprite objects
//!  ├── objects       descriptor table (read-only)
//!  ├── actors/party  collision targets, buff receivers
//!  ├── level         Arc<dyn LevelGeometry> (read-only)
//!  ├── collision     scratch CollisionState reused per object
//!  └── pending_events drained by tick()
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec3::Vec3i;
use crate::game::actor::Actor;
use crate::game::collision::CollisionState;
use crate::game::config::SimConfig;
use crate::game::descriptor::{DescProps, ObjectDescFlags, ObjectList};
use crate::game::events::{SimEvent, SimEventData};
use crate::game::level::LevelGeometry;
use crate::game::party::Party;
use crate::game::registry::{SlotHandle, SpawnOrigin, SpriteRegistry};
use crate::game::sprite::{SpriteObject, SpriteType};

/// Sub-tick units per elapsed tick in the Q16.16 `dt` (65536 / 128).
const DT_SHIFT: i32 = 9;

// =============================================================================
// GAME TIME
// =============================================================================

/// In-game clock in game ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GameTime(pub i64);

impl GameTime {
    /// Game ticks per game minute.
    pub const TICKS_PER_MINUTE: i64 = 256;

    /// Duration of `minutes` game minutes.
    #[inline]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self(minutes * Self::TICKS_PER_MINUTE)
    }

    /// `self + other`, saturating.
    #[inline]
    pub const fn plus(self, other: GameTime) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

// =============================================================================
// TURN ENGINE
// =============================================================================

/// The slice of turn-based mode the sprite code touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnEngine {
    /// Turn-based mode is on
    pub active: bool,
    /// Actions that must finish before the turn advances
    pub pending_actions: i32,
}

// =============================================================================
// SIMULATION STATE
// =============================================================================

/// Everything one tick of sprite simulation reads or writes.
#[derive(Clone, Debug)]
pub struct SimState {
    /// Ticks simulated so far
    pub tick: u32,

    /// Tunables
    pub config: SimConfig,

    /// Descriptor table
    pub objects: ObjectList,

    /// Live sprite objects
    pub registry: SpriteRegistry,

    /// Actors on the level
    pub actors: Vec<Actor>,

    /// The party
    pub party: Party,

    /// Level geometry
    pub level: Arc<dyn LevelGeometry>,

    /// Deterministic RNG
    pub rng: DeterministicRng,

    /// Turn-based bookkeeping
    pub turn: TurnEngine,

    /// Game clock
    pub time: GameTime,

    /// Elapsed ticks of the tick being simulated
    pub elapsed: i32,

    /// Scratch collision context
    pub collision: CollisionState,

    /// Item table id that uses a given sprite type as its world sprite
    pub item_sprites: BTreeMap<SpriteType, u16>,

    /// Events generated this tick
    pub pending_events: Vec<SimEvent>,
}

impl SimState {
    /// Fresh state on `level` with the built-in descriptor table.
    pub fn new(level: Arc<dyn LevelGeometry>, config: SimConfig) -> Self {
        let rng = DeterministicRng::new(config.rng_seed);
        Self {
            tick: 0,
            config,
            objects: ObjectList::standard(),
            registry: SpriteRegistry::new(),
            actors: Vec::new(),
            party: Party::default(),
            level,
            rng,
            turn: TurnEngine::default(),
            time: GameTime::default(),
            elapsed: 0,
            collision: CollisionState::default(),
            item_sprites: BTreeMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Replace the descriptor table.
    pub fn with_objects(mut self, objects: ObjectList) -> Self {
        self.objects = objects;
        self
    }

    /// Add an actor. Returns its index.
    pub fn add_actor(&mut self, actor: Actor) -> usize {
        self.actors.push(actor);
        self.actors.len() - 1
    }

    /// Record an event for this tick.
    pub fn push_event(&mut self, data: SimEventData) {
        self.pending_events.push(SimEvent::new(self.tick, data));
    }

    /// Take all pending events.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Elapsed time of the current tick as Q16.16 seconds.
    #[inline]
    pub fn dt_fixed(&self) -> Fixed {
        self.elapsed << DT_SHIFT
    }

    /// Velocity lost to gravity over the current tick.
    #[inline]
    pub fn gravity_step(&self) -> i32 {
        self.elapsed * self.config.gravity
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Blank sprite of `kind` at `position` with its descriptor and sector
    /// filled in.
    pub fn sprite_template(&self, kind: SpriteType, position: Vec3i) -> SpriteObject {
        let mut sprite = SpriteObject::template(kind, position);
        sprite.object_desc_id = self.objects.object_desc_id(kind);
        sprite.sector_id = self.level.sector_at(position);
        sprite
    }

    /// Spawn a prepared sprite.
    pub fn spawn_sprite(
        &mut self,
        sprite: SpriteObject,
        yaw: i32,
        pitch: i32,
        speed: i32,
        origin: SpawnOrigin,
    ) -> Option<SlotHandle> {
        self.registry.spawn(sprite, yaw, pitch, speed, origin)
    }

    /// Spawn a blank sprite of `kind` facing `yaw`.
    pub fn spawn(
        &mut self,
        kind: SpriteType,
        position: Vec3i,
        yaw: i32,
        pitch: i32,
        speed: i32,
        origin: SpawnOrigin,
    ) -> Option<SlotHandle> {
        let mut sprite = self.sprite_template(kind, position);
        sprite.facing = yaw;
        self.spawn_sprite(sprite, yaw, pitch, speed, origin)
    }

    /// Free a slot and report it.
    pub fn remove_sprite(&mut self, slot: usize) {
        if let Some(sprite_type) = self.registry.remove(slot, &mut self.turn) {
            self.push_event(SimEventData::SpriteRemoved { slot, sprite_type });
        }
    }

    // =========================================================================
    // Descriptor queries
    // =========================================================================

    /// Descriptor properties of a live slot.
    pub fn props(&self, slot: usize) -> Option<DescProps> {
        let sprite = self.registry.slot(slot)?;
        self.objects.get(sprite.object_desc_id).map(|d| d.props())
    }

    /// Descriptor lifetime of a slot, 0 when free.
    pub fn lifetime(&self, slot: usize) -> i32 {
        self.props(slot).map_or(0, |p| p.lifetime)
    }

    /// Whether a slot holds a transient, non-pickable visual.
    pub fn is_unpickable(&self, slot: usize) -> bool {
        self.props(slot).is_some_and(|p| p.has(ObjectDescFlags::UNPICKABLE))
    }

    /// Whether a slot has a visible sprite.
    pub fn has_sprite(&self, slot: usize) -> bool {
        self.props(slot).is_some_and(|p| !p.has(ObjectDescFlags::NO_SPRITE))
    }

    /// Trail color of a slot.
    pub fn trail_color(&self, slot: usize) -> [u8; 3] {
        self.props(slot).map_or([0; 3], |p| p.particle_rgb)
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    /// Digest of the simulation state.
    pub fn compute_hash(&self) -> StateHash {
        let hash = compute_state_hash(self.tick, self.rng.state(), |h| {
            h.update_u64(self.time.0 as u64);
            h.update_bool(self.turn.active);
            h.update_i32(self.turn.pending_actions);

            h.update_u32(self.registry.len() as u32);
            for (slot, s) in self.registry.iter() {
                h.update_u32(slot as u32);
                h.update_u16(s.sprite_type.0);
                h.update_u16(s.object_desc_id);
                h.update_vec3(s.position);
                h.update_vec3(s.velocity);
                h.update_i32(s.age);
                h.update_i32(s.sector_id);
                h.update_u16(s.attributes.0);
            }

            for actor in &self.actors {
                h.update_u32(actor.attributes.0);
                h.update_u8(actor.ai_state as u8);
                for buff in &actor.buffs {
                    h.update_u64(buff.expires.0 as u64);
                    h.update_u16(buff.power);
                }
            }
        });
        debug!(tick = self.tick, "state hashed");
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::BoxLevel;

    fn state() -> SimState {
        SimState::new(Arc::new(BoxLevel::outdoor(20000, 0)), SimConfig::default())
    }

    #[test]
    fn test_game_time() {
        assert_eq!(GameTime::from_minutes(5), GameTime(1280));
        assert_eq!(GameTime(10).plus(GameTime(5)), GameTime(15));
        assert_eq!(GameTime(i64::MAX).plus(GameTime(1)), GameTime(i64::MAX));
    }

    #[test]
    fn test_dt_fixed() {
        let mut s = state();
        s.elapsed = 128;
        assert_eq!(s.dt_fixed(), crate::core::fixed::FIXED_ONE);
        s.elapsed = 4;
        assert_eq!(s.gravity_step(), 20);
    }

    #[test]
    fn test_spawn_and_queries() {
        let mut s = state();
        let h = s
            .spawn(SpriteType::SPELL_FIRE_FIREBALL, Vec3i::new(0, 0, 100), 0, 0, 1000, SpawnOrigin::Caster)
            .unwrap();
        let slot = h.slot();
        assert_eq!(s.lifetime(slot), 1024);
        assert!(!s.is_unpickable(slot));
        assert!(s.has_sprite(slot));
        assert_eq!(s.trail_color(slot), [255, 64, 0]);

        s.remove_sprite(slot);
        assert_eq!(s.lifetime(slot), 0);
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].data,
            SimEventData::SpriteRemoved { slot: 0, sprite_type: SpriteType::SPELL_FIRE_FIREBALL }
        ));
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_unknown_type_does_not_spawn() {
        let mut s = state();
        assert!(s.spawn(SpriteType(9999), Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster).is_none());
    }

    #[test]
    fn test_hash_tracks_registry() {
        let mut a = state();
        let b = state();
        assert_eq!(a.compute_hash(), b.compute_hash());
        a.spawn(SpriteType::ARROW_PROJECTILE, Vec3i::ZERO, 0, 0, 100, SpawnOrigin::Caster);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }
}
