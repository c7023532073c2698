//! Damage Routing
//!
//! Picks the external damage formula for a sprite hitting something and
//! records the request. The formulas themselves live outside the
//! simulation.
//!
//! ```text
//!  victim \ caster │ Actor            Player          Item
//!  ────────────────┼────────────────────────────────────────────
//!  Player          │ PlayerFromMonster (any caster)
//!  Actor           │ ActorFromMonster ActorFromParty  ActorFromItem
//!  Face/Deco/None  │ nothing
//! ```

use crate::game::events::{DamageRoute, SimEventData};
use crate::game::pid::{ObjectKind, Pid};
use crate::game::state::SimState;

/// Damage route for a sprite cast by `caster` hitting `victim`.
pub fn damage_route(caster: Pid, victim: Pid) -> Option<DamageRoute> {
    match victim.kind() {
        ObjectKind::Player => Some(DamageRoute::PlayerFromMonster),
        ObjectKind::Actor => match caster.kind() {
            ObjectKind::Actor => Some(DamageRoute::ActorFromMonster),
            ObjectKind::Player => Some(DamageRoute::ActorFromParty),
            ObjectKind::Item => Some(DamageRoute::ActorFromItem),
            _ => None,
        },
        _ => None,
    }
}

/// Request damage from the sprite in `slot` to `victim`.
///
/// The travel direction is the sprite's velocity as a Q16.16 unit vector.
/// Returns true when a damage request was issued.
pub fn apply_spell_sprite_damage(state: &mut SimState, slot: usize, victim: Pid) -> bool {
    let Some(sprite) = state.registry.slot(slot) else {
        return false;
    };
    let Some(route) = damage_route(sprite.caster, victim) else {
        return false;
    };

    let data = SimEventData::Damage {
        route,
        source: Pid::item(slot),
        caster: sprite.caster,
        target: victim,
        attack: sprite.attack_kind,
        direction: sprite.velocity.normalize_to_fixpoint(),
    };
    state.push_event(data);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::fixed::FIXED_ONE;
    use crate::core::vec3::Vec3i;
    use crate::game::config::SimConfig;
    use crate::game::level::BoxLevel;
    use crate::game::registry::SpawnOrigin;
    use crate::game::sprite::SpriteType;

    #[test]
    fn test_route_table() {
        assert_eq!(damage_route(Pid::actor(1), Pid::player(0)), Some(DamageRoute::PlayerFromMonster));
        assert_eq!(damage_route(Pid::actor(1), Pid::actor(2)), Some(DamageRoute::ActorFromMonster));
        assert_eq!(damage_route(Pid::player(0), Pid::actor(2)), Some(DamageRoute::ActorFromParty));
        assert_eq!(damage_route(Pid::item(4), Pid::actor(2)), Some(DamageRoute::ActorFromItem));
        assert_eq!(damage_route(Pid::NONE, Pid::actor(2)), None);
        assert_eq!(damage_route(Pid::player(0), Pid::face(3)), None);
        assert_eq!(damage_route(Pid::player(0), Pid::decoration(3)), None);
        assert_eq!(damage_route(Pid::player(0), Pid::NONE), None);
    }

    #[test]
    fn test_damage_event_carries_direction() {
        let mut state = SimState::new(Arc::new(BoxLevel::outdoor(20000, 0)), SimConfig::default());
        let h = state
            .spawn(SpriteType::PROJECTILE_FIREBOLT, Vec3i::new(0, 0, 100), 512, 0, 1000, SpawnOrigin::Caster)
            .unwrap();
        state.registry.slot_mut(h.slot()).unwrap().caster = Pid::player(1);

        assert!(apply_spell_sprite_damage(&mut state, h.slot(), Pid::actor(0)));
        assert!(!apply_spell_sprite_damage(&mut state, h.slot(), Pid::face(0)));

        let events = state.take_events();
        assert_eq!(events.len(), 1);
        match &events[0].data {
            SimEventData::Damage { route, source, target, direction, .. } => {
                assert_eq!(*route, DamageRoute::ActorFromParty);
                assert_eq!(*source, Pid::item(h.slot()));
                assert_eq!(*target, Pid::actor(0));
                assert_eq!(*direction, Vec3i::new(0, FIXED_ONE, 0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
