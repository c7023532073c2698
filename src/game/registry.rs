//! Sprite Object Registry
//!
//! Dense slot table of live sprite objects.
//!
//! ```text
//!  slots:  [ fireball ][  free  ][ arrow ][  free  ][ splash ]
//!              0          1         2         3         4
//!  spawn ─────────────────▲  first free slot is reused
//!  remove(2) ─ marks free, table length unchanged
//!  compact() ─ [ fireball ][ splash ]   order kept, length shrinks
//! ```
//!
//! Slots are only ever freed during a tick; the table shrinks in
//! `compact`, which the tick loop calls once after integration. Indexes
//! therefore stay valid for the whole tick. `SlotHandle` adds a per-slot
//! generation and a compaction epoch so that a handle kept across ticks
//! cannot silently refer to a different object.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::fixed::fixpoint_mul;
use crate::core::trig;
use crate::game::sprite::{SpriteAttributes, SpriteObject, SpriteType};
use crate::game::state::TurnEngine;

/// Stable reference to a registry slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotHandle {
    /// Slot index
    pub index: u32,
    /// Slot generation at creation
    pub generation: u32,
    /// Compaction epoch at creation
    pub epoch: u32,
}

impl SlotHandle {
    /// Slot index as `usize`.
    #[inline]
    pub fn slot(self) -> usize {
        self.index as usize
    }
}

/// Portrait a sprite is launched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnOrigin {
    /// The sprite's own position
    Caster,
    /// One of the four party portraits, 1-based from the left
    Portrait(u8),
}

impl SpawnOrigin {
    /// Offset depth and base angle of a portrait.
    fn portrait_offset(self) -> Option<(i32, i32)> {
        match self {
            SpawnOrigin::Caster => None,
            SpawnOrigin::Portrait(1) => Some((24, 2048)),
            SpawnOrigin::Portrait(2) => Some((8, 2048)),
            SpawnOrigin::Portrait(3) => Some((8, 1024)),
            SpawnOrigin::Portrait(4) => Some((24, 1024)),
            SpawnOrigin::Portrait(_) => None,
        }
    }
}

/// Registry of sprite objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRegistry {
    objects: Vec<SpriteObject>,
    generations: Vec<u32>,
    epoch: u32,
}

impl SpriteRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, free ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when there are no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_free()).count()
    }

    /// Raw slot access by index.
    #[inline]
    pub fn slot(&self, index: usize) -> Option<&SpriteObject> {
        self.objects.get(index)
    }

    /// Raw mutable slot access by index.
    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut SpriteObject> {
        self.objects.get_mut(index)
    }

    /// Handle of a live slot.
    pub fn handle(&self, index: usize) -> Option<SlotHandle> {
        let obj = self.objects.get(index)?;
        if obj.is_free() {
            return None;
        }
        Some(SlotHandle {
            index: index as u32,
            generation: self.generations[index],
            epoch: self.epoch,
        })
    }

    /// Resolve a handle. Stale handles return `None`.
    pub fn get(&self, handle: SlotHandle) -> Option<&SpriteObject> {
        if !self.is_current(handle) {
            return None;
        }
        self.objects.get(handle.slot()).filter(|o| !o.is_free())
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut SpriteObject> {
        if !self.is_current(handle) {
            return None;
        }
        self.objects.get_mut(handle.slot()).filter(|o| !o.is_free())
    }

    fn is_current(&self, handle: SlotHandle) -> bool {
        handle.epoch == self.epoch && self.generations.get(handle.slot()) == Some(&handle.generation)
    }

    /// Iterate live objects with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SpriteObject)> {
        self.objects.iter().enumerate().filter(|(_, o)| !o.is_free())
    }

    /// Place `sprite` in the first free slot (or a new one) and launch it
    /// along (`yaw`, `pitch`) at `speed`.
    ///
    /// Fails when the sprite has no descriptor.
    pub fn spawn(
        &mut self,
        mut sprite: SpriteObject,
        yaw: i32,
        pitch: i32,
        speed: i32,
        origin: SpawnOrigin,
    ) -> Option<SlotHandle> {
        if sprite.is_free() {
            debug!(sprite_type = sprite.sprite_type.0, "spawn rejected: no descriptor");
            return None;
        }

        let index = match self.objects.iter().position(SpriteObject::is_free) {
            Some(i) => i,
            None => {
                self.objects.push(SpriteObject::default());
                self.generations.push(0);
                self.objects.len() - 1
            }
        };

        sprite.initial_position = sprite.position;
        if let Some((depth, base)) = origin.portrait_offset() {
            sprite.position = sprite.position.rotated(depth, base - sprite.facing, 0);
        }

        sprite.velocity = Default::default();
        if speed != 0 {
            let horizontal = fixpoint_mul(trig::cos(pitch), speed);
            sprite.velocity.x = fixpoint_mul(trig::cos(yaw), horizontal);
            sprite.velocity.y = fixpoint_mul(trig::sin(yaw), horizontal);
            sprite.velocity.z = fixpoint_mul(trig::sin(pitch), speed);
        }

        trace!(slot = index, sprite_type = sprite.sprite_type.0, "sprite spawned");
        self.objects[index] = sprite;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.handle(index)
    }

    /// Free a slot. In turn-based mode a sprite holding up the turn
    /// releases its pending action exactly once.
    ///
    /// Returns the type the slot had, or `None` if it was already free.
    pub fn remove(&mut self, index: usize, turn: &mut TurnEngine) -> Option<SpriteType> {
        let obj = self.objects.get_mut(index)?;
        if obj.is_free() {
            return None;
        }
        obj.object_desc_id = 0;
        if turn.active && obj.attributes.has(SpriteAttributes::HALT_TURN_BASED) {
            obj.attributes.clear(SpriteAttributes::HALT_TURN_BASED);
            turn.pending_actions -= 1;
        }
        self.generations[index] = self.generations[index].wrapping_add(1);
        trace!(slot = index, "sprite removed");
        Some(obj.sprite_type)
    }

    /// Move live objects to the front, keeping their order, and drop the
    /// free tail. Returns how many slots were reclaimed.
    pub fn compact(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| !o.is_free());
        let after = self.objects.len();
        if after != before {
            self.generations = vec![0; after];
            self.epoch = self.epoch.wrapping_add(1);
            debug!(reclaimed = before - after, live = after, "registry compacted");
        }
        before - after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::Vec3i;
    use proptest::prelude::*;

    fn sprite(kind: u16) -> SpriteObject {
        let mut s = SpriteObject::template(SpriteType(kind), Vec3i::new(0, 0, 100));
        s.object_desc_id = 1;
        s
    }

    #[test]
    fn test_spawn_requires_descriptor() {
        let mut reg = SpriteRegistry::new();
        let s = SpriteObject::template(SpriteType::SPELL_FIRE_FIREBALL, Vec3i::ZERO);
        assert!(reg.spawn(s, 0, 0, 100, SpawnOrigin::Caster).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_spawn_velocity() {
        let mut reg = SpriteRegistry::new();
        let h = reg.spawn(sprite(500), 0, 0, 1000, SpawnOrigin::Caster).unwrap();
        assert_eq!(reg.get(h).unwrap().velocity, Vec3i::new(1000, 0, 0));

        let h = reg.spawn(sprite(500), 512, 0, 1000, SpawnOrigin::Caster).unwrap();
        assert_eq!(reg.get(h).unwrap().velocity, Vec3i::new(0, 1000, 0));

        let h = reg.spawn(sprite(500), 0, 512, 300, SpawnOrigin::Caster).unwrap();
        assert_eq!(reg.get(h).unwrap().velocity, Vec3i::new(0, 0, 300));
    }

    #[test]
    fn test_portrait_offsets() {
        let mut reg = SpriteRegistry::new();
        let cases = [(1, Vec3i::new(24, 0, 100)), (2, Vec3i::new(8, 0, 100)), (3, Vec3i::new(-8, 0, 100)), (4, Vec3i::new(-24, 0, 100))];
        for (portrait, expected) in cases {
            let h = reg.spawn(sprite(700), 0, 0, 0, SpawnOrigin::Portrait(portrait)).unwrap();
            let s = reg.get(h).unwrap();
            assert_eq!(s.position, expected, "portrait {}", portrait);
            assert_eq!(s.initial_position, Vec3i::new(0, 0, 100));
        }
    }

    #[test]
    fn test_slot_reuse() {
        let mut reg = SpriteRegistry::new();
        let mut turn = TurnEngine::default();
        for _ in 0..4 {
            reg.spawn(sprite(500), 0, 0, 0, SpawnOrigin::Caster).unwrap();
        }
        reg.remove(1, &mut turn);
        reg.remove(3, &mut turn);
        let h = reg.spawn(sprite(505), 0, 0, 0, SpawnOrigin::Caster).unwrap();
        assert_eq!(h.slot(), 1);
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn test_stale_handle() {
        let mut reg = SpriteRegistry::new();
        let mut turn = TurnEngine::default();
        let h = reg.spawn(sprite(500), 0, 0, 0, SpawnOrigin::Caster).unwrap();
        reg.remove(h.slot(), &mut turn);
        let h2 = reg.spawn(sprite(505), 0, 0, 0, SpawnOrigin::Caster).unwrap();
        assert_eq!(h.slot(), h2.slot());
        assert!(reg.get(h).is_none());
        assert_eq!(reg.get(h2).unwrap().sprite_type, SpriteType(505));

        reg.spawn(sprite(510), 0, 0, 0, SpawnOrigin::Caster).unwrap();
        reg.remove(0, &mut turn);
        reg.compact();
        assert!(reg.get(h2).is_none());
    }

    #[test]
    fn test_remove_releases_turn_once() {
        let mut reg = SpriteRegistry::new();
        let mut turn = TurnEngine { active: true, pending_actions: 2 };
        let mut s = sprite(500);
        s.attributes.set(SpriteAttributes::HALT_TURN_BASED);
        let h = reg.spawn(s, 0, 0, 0, SpawnOrigin::Caster).unwrap();

        assert_eq!(reg.remove(h.slot(), &mut turn), Some(SpriteType(500)));
        assert_eq!(turn.pending_actions, 1);
        assert_eq!(reg.remove(h.slot(), &mut turn), None);
        assert_eq!(turn.pending_actions, 1);
    }

    #[test]
    fn test_remove_outside_turn_mode() {
        let mut reg = SpriteRegistry::new();
        let mut turn = TurnEngine { active: false, pending_actions: 2 };
        let mut s = sprite(500);
        s.attributes.set(SpriteAttributes::HALT_TURN_BASED);
        reg.spawn(s, 0, 0, 0, SpawnOrigin::Caster).unwrap();
        reg.remove(0, &mut turn);
        assert_eq!(turn.pending_actions, 2);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Spawn(u16),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u16..50).prop_map(Op::Spawn),
            (0usize..32).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_spawn_reuses_lowest_free(ops in proptest::collection::vec(op(), 1..64)) {
            let mut reg = SpriteRegistry::new();
            let mut turn = TurnEngine::default();
            let mut high_water = 0usize;
            for op in ops {
                match op {
                    Op::Spawn(kind) => {
                        let expected = reg.iter_slots_free().next().unwrap_or(reg.len());
                        let h = reg.spawn(sprite(kind), 0, 0, 0, SpawnOrigin::Caster).unwrap();
                        prop_assert_eq!(h.slot(), expected);
                    }
                    Op::Remove(i) => {
                        reg.remove(i, &mut turn);
                    }
                }
                high_water = high_water.max(reg.live_count());
                prop_assert!(reg.len() <= high_water);
            }
        }

        #[test]
        fn prop_compact_preserves_order(ops in proptest::collection::vec(op(), 1..64)) {
            let mut reg = SpriteRegistry::new();
            let mut turn = TurnEngine::default();
            for op in ops {
                match op {
                    Op::Spawn(kind) => { reg.spawn(sprite(kind), 0, 0, 0, SpawnOrigin::Caster); }
                    Op::Remove(i) => { reg.remove(i, &mut turn); }
                }
            }
            let live: Vec<SpriteType> = reg.iter().map(|(_, o)| o.sprite_type).collect();
            reg.compact();
            let after: Vec<SpriteType> = reg.iter().map(|(_, o)| o.sprite_type).collect();
            prop_assert_eq!(reg.len(), live.len());
            prop_assert_eq!(after, live);
        }
    }

    impl SpriteRegistry {
        fn iter_slots_free(&self) -> impl Iterator<Item = usize> + '_ {
            self.objects.iter().enumerate().filter(|(_, o)| o.is_free()).map(|(i, _)| i)
        }
    }
}
