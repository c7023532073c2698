//! Traps, Item Drops and Splashes
//!
//! Spawning helpers other subsystems call into, plus the trap explosion
//! that damages the party directly.
//!
//! ```text
//!  trigger_trap(kind, pos)
//!    ├─ spawn trap burst sprite
//!    └─ party within 768 (octagonal)?
//!         └─ per member: can act && perception roll ─▶ avoided
//!                        otherwise ──────────────────▶ 5 + Nd20 damage
//! ```

use tracing::{debug, warn};

use crate::core::vec3::Vec3i;
use crate::game::actor::DamageType;
use crate::game::events::{SimEventData, SoundId};
use crate::game::impact::{process_spell_impact, ImpactOutcome};
use crate::game::pid::Pid;
use crate::game::registry::{SlotHandle, SpawnOrigin};
use crate::game::sprite::{ContainedItem, SpriteAttributes, SpriteType};
use crate::game::state::SimState;

/// Range within which a trap explosion reaches the party.
pub const TRAP_RANGE: u32 = 768;

/// Flat trap damage before dice.
pub const TRAP_BASE_DAMAGE: i32 = 5;

/// Perception bonus added to the avoidance roll.
const AVOID_ROLL_BONUS: i32 = 20;

// =============================================================================
// SPLASH
// =============================================================================

/// Spawn a water splash at `position` and play the splash sound from it.
pub fn create_splash(state: &mut SimState, position: Vec3i) -> Option<SlotHandle> {
    let handle = state.spawn(SpriteType::WATER_SPLASH, position, 0, 0, 0, SpawnOrigin::Caster)?;
    state.push_event(SimEventData::Sound {
        sound: SoundId::Splash,
        source: Pid::item(handle.slot()),
    });
    Some(handle)
}

// =============================================================================
// ITEM DROPS
// =============================================================================

/// Spawn `count` copies of `kind` at `position` launched at `speed`.
///
/// With `random_rotate` each copy gets a random facing and a pitch between
/// 45 and 90 degrees; otherwise they go straight up. Unless
/// `IGNORE_RANGE` is set, the contained item id is taken from the item
/// that uses `kind` as its world sprite. Returns how many spawned.
#[allow(clippy::too_many_arguments)]
pub fn drop_item_at(
    state: &mut SimState,
    kind: SpriteType,
    position: Vec3i,
    speed: i32,
    count: usize,
    random_rotate: bool,
    attributes: SpriteAttributes,
    item: Option<ContainedItem>,
) -> usize {
    let mut sprite = state.sprite_template(kind, position);
    sprite.attributes = attributes;
    if let Some(item) = item {
        sprite.item = item;
    }
    if !attributes.has(SpriteAttributes::IGNORE_RANGE) {
        if let Some(&item_id) = state.item_sprites.get(&kind) {
            sprite.item.item_id = item_id;
        }
    }

    let mut spawned = 0;
    for _ in 0..count {
        let (yaw, pitch) = if random_rotate {
            (state.rng.random(2048), 256 + state.rng.random(256))
        } else {
            (0, 512)
        };
        sprite.facing = yaw;
        if state.spawn_sprite(sprite.clone(), yaw, pitch, speed, SpawnOrigin::Caster).is_some() {
            spawned += 1;
        }
    }
    debug!(sprite_type = kind.0, spawned, "items dropped");
    spawned
}

// =============================================================================
// TRAPS
// =============================================================================

/// Cheap 3D distance: max + 11/32 mid + 1/4 min.
pub fn octagonal_distance(delta: Vec3i) -> u32 {
    let mut d = [delta.x.unsigned_abs(), delta.y.unsigned_abs(), delta.z.unsigned_abs()];
    d.sort_unstable();
    let [lo, mid, hi] = d;
    hi + ((11 * mid) >> 5) + lo / 4
}

/// Element dealt by a trap type.
pub fn trap_element(kind: SpriteType) -> Option<DamageType> {
    match kind {
        SpriteType::TRAP_FIRE => Some(DamageType::Fire),
        SpriteType::TRAP_LIGHTNING => Some(DamageType::Air),
        SpriteType::TRAP_COLD => Some(DamageType::Water),
        SpriteType::TRAP_BODY => Some(DamageType::Body),
        _ => None,
    }
}

/// Spawn the burst of trap `kind` at `position` and hit the party with it.
pub fn trigger_trap(state: &mut SimState, kind: SpriteType, position: Vec3i) -> Option<SlotHandle> {
    if !kind.is_trap() {
        warn!(sprite_type = kind.0, "not a trap sprite");
        return None;
    }
    let handle = state.spawn(kind, position, 0, 0, 0, SpawnOrigin::Caster);
    explosion_traps(state, kind, position);
    handle
}

/// Damage the party from a trap explosion at `position`.
///
/// Returns how many members took damage.
pub fn explosion_traps(state: &mut SimState, kind: SpriteType, position: Vec3i) -> usize {
    let Some(damage_type) = trap_element(kind) else {
        return 0;
    };
    let eye = state.party.position + Vec3i::new(0, 0, state.party.eye_level);
    let distance = octagonal_distance(eye - position);
    if distance > TRAP_RANGE {
        debug!(distance, "party out of trap range");
        return 0;
    }

    let mut amount = TRAP_BASE_DAMAGE;
    if state.config.trap_d20_count > 0 {
        amount += state.rng.random_dice(state.config.trap_d20_count, 20);
    }

    let roster: Vec<(i32, bool)> = state.party.members.iter().map(|m| (m.perception, m.can_act)).collect();
    let mut damaged = 0;
    for (member, (perception, can_act)) in roster.into_iter().enumerate() {
        if can_act && state.rng.random(perception + AVOID_ROLL_BONUS) > AVOID_ROLL_BONUS {
            state.push_event(SimEventData::PartyMemberAvoided { member });
        } else {
            state.push_event(SimEventData::PartyMemberDamaged { member, amount, damage_type });
            damaged += 1;
        }
    }
    damaged
}

// =============================================================================
// LEVEL HOUSEKEEPING
// =============================================================================

/// Remove every live sprite whose descriptor is unpickable.
pub fn purge_unpickable(state: &mut SimState) -> usize {
    let mut purged = 0;
    for slot in 0..state.registry.len() {
        if state.is_unpickable(slot) {
            state.remove_sprite(slot);
            purged += 1;
        }
    }
    purged
}

/// An actor walked into the sprite in `slot`.
pub fn on_actor_touch(state: &mut SimState, slot: usize, actor: Pid) -> ImpactOutcome {
    if !state.is_unpickable(slot) {
        return ImpactOutcome::Continue;
    }
    process_spell_impact(state, slot, actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::game::config::SimConfig;
    use crate::game::level::BoxLevel;
    use crate::game::party::Party;

    fn state() -> SimState {
        SimState::new(Arc::new(BoxLevel::outdoor(20000, 0)), SimConfig::default())
    }

    fn member_events(s: &mut SimState) -> (Vec<(usize, i32, DamageType)>, Vec<usize>) {
        let mut damaged = Vec::new();
        let mut avoided = Vec::new();
        for e in s.take_events() {
            match e.data {
                SimEventData::PartyMemberDamaged { member, amount, damage_type } => {
                    damaged.push((member, amount, damage_type))
                }
                SimEventData::PartyMemberAvoided { member } => avoided.push(member),
                _ => {}
            }
        }
        (damaged, avoided)
    }

    #[test]
    fn test_octagonal_distance() {
        assert_eq!(octagonal_distance(Vec3i::new(700, 0, 0)), 700);
        assert_eq!(octagonal_distance(Vec3i::new(0, -700, 0)), 700);
        // 700 + 11*300/32
        assert_eq!(octagonal_distance(Vec3i::new(700, 300, 0)), 803);
        assert_eq!(octagonal_distance(Vec3i::new(100, 400, -200)), 400 + 68 + 25);
    }

    #[test]
    fn test_splash_plays_sound() {
        let mut s = state();
        let h = create_splash(&mut s, Vec3i::new(1, 2, 60)).unwrap();
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].data,
            SimEventData::Sound { sound: SoundId::Splash, source } if source == Pid::item(h.slot())
        ));
    }

    #[test]
    fn test_trap_hits_whole_party() {
        let mut s = state();
        for m in &mut s.party.members {
            m.perception = 0;
        }
        let h = trigger_trap(&mut s, SpriteType::TRAP_FIRE, Vec3i::new(300, 0, 160));
        assert!(h.is_some());
        let (damaged, avoided) = member_events(&mut s);
        assert!(avoided.is_empty());
        assert_eq!(damaged.len(), 4);
        for (i, (member, amount, element)) in damaged.into_iter().enumerate() {
            assert_eq!(member, i);
            assert_eq!(amount, 5);
            assert_eq!(element, DamageType::Fire);
        }
    }

    #[test]
    fn test_trap_out_of_range() {
        let mut s = state();
        trigger_trap(&mut s, SpriteType::TRAP_COLD, Vec3i::new(700, 300, 160));
        let (damaged, avoided) = member_events(&mut s);
        assert!(damaged.is_empty());
        assert!(avoided.is_empty());
        assert_eq!(s.registry.live_count(), 1);
    }

    #[test]
    fn test_trap_dice_and_element() {
        let mut s = state();
        s.config.trap_d20_count = 3;
        for m in &mut s.party.members {
            m.can_act = false;
        }
        trigger_trap(&mut s, SpriteType::TRAP_LIGHTNING, Vec3i::new(0, 0, 0));
        let (damaged, _) = member_events(&mut s);
        assert_eq!(damaged.len(), 4);
        let amount = damaged[0].1;
        assert!((8..=65).contains(&amount));
        assert!(damaged.iter().all(|&(_, a, t)| a == amount && t == DamageType::Air));
    }

    #[test]
    fn test_sharp_eyed_member_avoids() {
        let mut s = state();
        s.party = Party::at(Vec3i::ZERO);
        s.party.members[1].perception = 1_000_000_000;
        s.party.members[3].can_act = false;
        s.party.members[3].perception = 1_000_000_000;
        for i in [0, 2] {
            s.party.members[i].perception = 0;
        }
        trigger_trap(&mut s, SpriteType::TRAP_BODY, Vec3i::new(0, 0, 100));
        let (damaged, avoided) = member_events(&mut s);
        assert_eq!(avoided, vec![1]);
        let hit: Vec<usize> = damaged.iter().map(|d| d.0).collect();
        assert_eq!(hit, vec![0, 2, 3]);
    }

    #[test]
    fn test_non_trap_rejected() {
        let mut s = state();
        assert!(trigger_trap(&mut s, SpriteType::SPELL_FIRE_FIREBALL, Vec3i::ZERO).is_none());
        assert_eq!(s.registry.live_count(), 0);
    }

    #[test]
    fn test_drop_random_rotation() {
        let mut s = state();
        s.item_sprites.insert(SpriteType::DROPPED_ITEM, 42);
        let n = drop_item_at(
            &mut s,
            SpriteType::DROPPED_ITEM,
            Vec3i::new(0, 0, 100),
            500,
            3,
            true,
            SpriteAttributes::default(),
            None,
        );
        assert_eq!(n, 3);
        assert_eq!(s.registry.live_count(), 3);
        for (_, o) in s.registry.iter() {
            assert_eq!(o.item.item_id, 42);
            assert!((0..2048).contains(&o.facing));
            // pitch in [256, 512) always launches upward
            assert!(o.velocity.z > 0);
        }
    }

    #[test]
    fn test_drop_straight_up_keeps_item() {
        let mut s = state();
        s.item_sprites.insert(SpriteType::DROPPED_ITEM, 42);
        let mut attributes = SpriteAttributes::default();
        attributes.set(SpriteAttributes::IGNORE_RANGE);
        let item = ContainedItem { item_id: 7, ..ContainedItem::default() };
        drop_item_at(&mut s, SpriteType::DROPPED_ITEM, Vec3i::ZERO, 300, 1, false, attributes, Some(item));

        let (_, o) = s.registry.iter().next().unwrap();
        assert_eq!(o.item.item_id, 7);
        assert_eq!(o.facing, 0);
        assert_eq!((o.velocity.x, o.velocity.y), (0, 0));
        assert_eq!(o.velocity.z, 300);
    }

    #[test]
    fn test_purge_unpickable() {
        let mut s = state();
        s.spawn(SpriteType::SPELL_FIRE_FIREBALL.impact(), Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster);
        s.spawn(SpriteType::DROPPED_ITEM, Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster);
        s.spawn(SpriteType::TRAP_COLD, Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster);
        assert_eq!(purge_unpickable(&mut s), 2);
        assert_eq!(s.registry.live_count(), 1);
        let (_, left) = s.registry.iter().next().unwrap();
        assert_eq!(left.sprite_type, SpriteType::DROPPED_ITEM);
    }

    #[test]
    fn test_actor_touch() {
        let mut s = state();
        let item = s.spawn(SpriteType::DROPPED_ITEM, Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster).unwrap();
        assert_eq!(on_actor_touch(&mut s, item.slot(), Pid::actor(0)), ImpactOutcome::Continue);

        let visual = s
            .spawn(SpriteType::SPELL_FIRE_FIREBALL.impact(), Vec3i::ZERO, 0, 0, 0, SpawnOrigin::Caster)
            .unwrap();
        assert_eq!(on_actor_touch(&mut s, visual.slot(), Pid::actor(0)), ImpactOutcome::Inert);
    }
}
