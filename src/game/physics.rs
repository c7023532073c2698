//! Sprite Physics Integrator
//!
//! Advances every live sprite object by one tick.
//!
//! ```text
//!  update_object(slot)
//!    ├─ SKIP_A_FRAME ──────────────▶ clear, skip
//!    ├─ attached ──────────────────▶ pin to actor head, age, expire
//!    └─ free: age, lifetime check
//!          ├─ alive / grace ───────▶ indoor or outdoor sub-step
//!          ├─ expired, inert ──────▶ remove
//!          └─ expired, interactable▶ impact(slot, own pid)
//!
//!  sub-step
//!    floor query ─▶ gravity | slope slide | ground contact
//!    collision loop (shared budget of 100 iterations)
//!      sweep faces, decorations, party, actors
//!      full move ───▶ commit, trail, Resolved
//!      blocked ─────▶ advance, impact?, deflect, damp, loop
//! ```
//!
//! The resolver may retype or remove the sprite being integrated, so every
//! step re-reads the slot and its descriptor after calling it.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::core::fixed::{damp, fixpoint_mul, saturate_i32, FIXED_SCALE, SLIDE_FACE_NORMAL_Z, STEEP_FACE_NORMAL_Z};
use crate::core::trig;
use crate::core::vec3::Vec3i;
use crate::game::collision::{collide_with_actor, collide_with_party};
use crate::game::descriptor::{DescProps, ObjectDescFlags as F};
use crate::game::events::{SimEventData, TrailKind};
use crate::game::impact::process_spell_impact;
use crate::game::level::{Face, IndoorFloor, LevelGeometry, LevelType, NO_FLOOR};
use crate::game::pid::{ObjectKind, Pid};
use crate::game::sprite::{SpriteAttributes, SpriteObject};
use crate::game::state::SimState;
use crate::game::trap::create_splash;

/// Collision iterations allowed per object per tick.
pub const MAX_COLLISION_ITERATIONS: u32 = 100;

/// Portal passes per collision iteration.
const MAX_PORTAL_PASSES: u32 = 100;

/// Horizontal speed squared below which a grounded object stops.
pub const STOP_SPEED_SQ: i64 = 400;

/// Bounce speed below which a bounce dies out.
pub const BOUNCE_CUTOFF: i32 = 10;

const OUTDOOR_XY_LIMIT: i32 = 32768;
const OUTDOOR_Z_LIMIT: i32 = 13000;
const INDOOR_XY_LIMIT: i32 = 32767;
const INDOOR_Z_LIMIT: i32 = 20000;

/// Height above the floor that still counts as grounded indoors.
const AIRBORNE_EPSILON: i32 = 3;

/// Splash height above the water surface.
const SPLASH_HEIGHT: i32 = 60;

/// Splash height above a building model.
const SPLASH_HEIGHT_MODEL: i32 = 30;

/// Result of one physics sub-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The object committed its move, came to rest, or left the simulation
    Resolved,
    /// The collision budget ran out, or a decoration turned the object
    Deflected,
    /// Ground contact left the object moving; run the collision loop again
    Retry,
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Advance every live sprite object by the state's elapsed time.
///
/// Slots spawned during the pass are integrated in the same pass.
pub fn update_objects(state: &mut SimState) {
    let mut slot = 0;
    while slot < state.registry.len() {
        update_object(state, slot);
        slot += 1;
    }
}

/// Advance one slot.
pub fn update_object(state: &mut SimState, slot: usize) -> StepOutcome {
    let Some(props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };
    let elapsed = state.elapsed;
    let grace = state.config.lifetime_grace_ticks;
    let Some(sprite) = state.registry.slot_mut(slot) else {
        return StepOutcome::Resolved;
    };

    if sprite.attributes.has(SpriteAttributes::SKIP_A_FRAME) {
        sprite.attributes.clear(SpriteAttributes::SKIP_A_FRAME);
        return StepOutcome::Resolved;
    }

    let temporary = props.has(F::TEMPORARY);
    let lifetime = if sprite.attributes.has(SpriteAttributes::TEMPORARY) {
        sprite.temp_lifetime
    } else {
        props.lifetime
    };

    if sprite.is_attached() {
        return update_attached(state, slot, temporary, lifetime);
    }

    sprite.age += elapsed;
    let age = sprite.age;
    let alive = !temporary || age < 0 || age < lifetime;
    let in_grace = age < lifetime.saturating_add(grace);

    if alive || in_grace {
        return match state.level.level_type() {
            LevelType::Indoor => update_indoor(state, slot),
            LevelType::Outdoor => update_outdoor(state, slot),
        };
    }

    if props.has(F::INTERACTABLE) {
        process_spell_impact(state, slot, Pid::item(slot));
    } else {
        trace!(slot, age, lifetime, "sprite expired");
        state.remove_sprite(slot);
    }
    StepOutcome::Resolved
}

/// Sprites riding on an actor's head.
fn update_attached(state: &mut SimState, slot: usize, temporary: bool, lifetime: i32) -> StepOutcome {
    let elapsed = state.elapsed;
    let Some(target) = state.registry.slot(slot).map(|s| s.target) else {
        return StepOutcome::Resolved;
    };
    let anchor = match target.kind() {
        ObjectKind::Actor => state
            .actors
            .get(target.index())
            .map(|a| a.position + Vec3i::new(0, 0, a.height)),
        _ => None,
    };
    let Some(anchor) = anchor else {
        debug!(slot, ?target, "attached sprite lost its actor");
        state.remove_sprite(slot);
        return StepOutcome::Resolved;
    };

    let Some(sprite) = state.registry.slot_mut(slot) else {
        return StepOutcome::Resolved;
    };
    sprite.position = anchor;
    sprite.age += elapsed;
    if !temporary || (sprite.age >= 0 && sprite.age < lifetime) {
        return StepOutcome::Resolved;
    }
    state.remove_sprite(slot);
    StepOutcome::Resolved
}

// =============================================================================
// SHARED RESPONSES
// =============================================================================

/// One step of velocity damping on all three axes.
#[inline]
pub fn damp_velocity(v: Vec3i) -> Vec3i {
    Vec3i::new(damp(v.x), damp(v.y), damp(v.z))
}

/// Velocity after bouncing off a non-floor face.
///
/// The push along the normal is the larger of the impact speed and an
/// eighth of the travel speed. Steep faces double the vertical kick,
/// shallow ones keep a damped copy of it.
pub fn deflect_off_face(velocity: Vec3i, normal: Vec3i, speed: i32) -> Vec3i {
    let impact = saturate_i32(normal.dot(velocity).abs() >> FIXED_SCALE);
    let push = impact.max(speed / 8);

    let mut v = velocity;
    v.x += 2 * fixpoint_mul(push, normal.x);
    v.y += 2 * fixpoint_mul(push, normal.y);
    let mut kick = fixpoint_mul(push, normal.z);
    if normal.z <= STEEP_FACE_NORMAL_Z {
        kick *= 2;
    } else {
        v.z += kick;
        kick = fixpoint_mul(STEEP_FACE_NORMAL_Z, kick);
    }
    v.z += kick;
    v
}

/// Horizontal velocity pointing away from `center`, same horizontal speed.
pub fn redirect_away_from(velocity: Vec3i, position: Vec3i, center: Vec3i) -> Vec3i {
    let speed = velocity.xy_length();
    let angle = trig::atan2(position.x - center.x, position.y - center.y);
    Vec3i::new(
        fixpoint_mul(trig::cos(angle), speed),
        fixpoint_mul(trig::sin(angle), speed),
        velocity.z,
    )
}

/// Emit the trail particle the descriptor asks for, if any.
fn emit_trail(state: &mut SimState, position: Vec3i, props: DescProps) {
    let kind = if props.has(F::TRAIL_FIRE) {
        TrailKind::Fire
    } else if props.has(F::TRAIL_LINE) {
        TrailKind::Line
    } else if props.has(F::TRAIL_PARTICLE) {
        TrailKind::Particle
    } else {
        return;
    };
    state.push_event(SimEventData::TrailParticle {
        position,
        kind,
        color: props.particle_rgb,
    });
}

fn trigger_face(state: &mut SimState, face: &Face, pid: Pid) {
    if face.event_id != 0 {
        state.push_event(SimEventData::FaceTrigger { event_id: face.event_id, face: pid });
    }
}

fn live_mut(state: &mut SimState, slot: usize) -> Option<&mut SpriteObject> {
    state.registry.slot_mut(slot).filter(|s| !s.is_free())
}

/// Sweep the shared collision state against the party and actors.
///
/// `outdoor` selects the outdoor faction rules: an actor caster only
/// checks actors it is hostile to, and only when its id passes the
/// historical `id < actors.len() - 1` bound.
fn sweep_bodies(state: &mut SimState, caster: Pid, outdoor: bool) {
    if caster.kind() != ObjectKind::Player {
        collide_with_party(&mut state.collision, &state.party);
    }

    let now = state.time;
    let caster_actor = match caster.kind() {
        ObjectKind::Actor => state.actors.get(caster.index()),
        _ => None,
    };

    if outdoor {
        if caster.kind() == ObjectKind::Actor {
            // Bound excludes the last actor.
            if caster.index() >= state.actors.len().wrapping_sub(1) {
                return;
            }
            let Some(caster_actor) = caster_actor else {
                return;
            };
            for (index, actor) in state.actors.iter().enumerate() {
                if caster_actor.is_hostile_to(actor, now) {
                    collide_with_actor(&mut state.collision, actor, index, 0);
                }
            }
        } else {
            for (index, actor) in state.actors.iter().enumerate() {
                collide_with_actor(&mut state.collision, actor, index, 0);
            }
        }
        return;
    }

    let caster_monster = caster_actor.map(|a| a.monster_id);
    for (index, actor) in state.actors.iter().enumerate() {
        if caster_monster == Some(actor.monster_id) {
            continue;
        }
        let to_hit = if actor.monster_id != 0 { actor.to_hit_radius } else { 0 };
        collide_with_actor(&mut state.collision, actor, index, to_hit);
    }
}

// =============================================================================
// INDOOR
// =============================================================================

fn update_indoor(state: &mut SimState, slot: usize) -> StepOutcome {
    let Some(sprite) = state.registry.slot(slot) else {
        return StepOutcome::Resolved;
    };
    let position = sprite.position;
    let sector = sprite.sector_id;
    if position.x.abs() > INDOOR_XY_LIMIT || position.y.abs() > INDOOR_XY_LIMIT || position.z.abs() > INDOOR_Z_LIMIT {
        trace!(slot, %position, "sprite left indoor bounds");
        state.remove_sprite(slot);
        return StepOutcome::Resolved;
    }

    let level = Arc::clone(&state.level);
    let floor = level.indoor_floor(position, sector);
    if floor.z <= NO_FLOOR {
        trace!(slot, %position, "sprite fell out of the level");
        state.remove_sprite(slot);
        return StepOutcome::Resolved;
    }
    if let Some(s) = live_mut(state, slot) {
        s.sector_id = floor.sector;
    }

    let mut budget = MAX_COLLISION_ITERATIONS;
    let mut retry = false;
    loop {
        let Some(props) = state.props(slot) else {
            return StepOutcome::Resolved;
        };
        let gravity = state.gravity_step();
        let Some(sprite) = live_mut(state, slot) else {
            return StepOutcome::Resolved;
        };

        let no_gravity = props.has(F::NO_GRAVITY);
        if retry || no_gravity || floor.z <= sprite.position.z - AIRBORNE_EPSILON {
            if !retry && !no_gravity {
                sprite.velocity.z -= gravity;
            }
            if indoor_collide(state, slot, &*level, &mut budget) == StepOutcome::Resolved {
                return StepOutcome::Resolved;
            }
        }

        match indoor_ground_contact(state, slot, &*level, floor) {
            StepOutcome::Retry if budget > 0 => retry = true,
            StepOutcome::Retry => {
                debug!(slot, "indoor collision budget exhausted");
                return StepOutcome::Deflected;
            }
            outcome => return outcome,
        }
    }
}

/// Resting on or sliding along the indoor floor.
fn indoor_ground_contact(state: &mut SimState, slot: usize, level: &dyn LevelGeometry, floor: IndoorFloor) -> StepOutcome {
    let Some(props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };
    if props.has(F::INTERACTABLE) && !process_spell_impact(state, slot, Pid::NONE).proceeds() {
        return StepOutcome::Resolved;
    }
    let Some(props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };

    let gravity = state.gravity_step();
    let ground = floor.face.and_then(|f| level.face(Pid::face(f)));
    let Some(sprite) = live_mut(state, slot) else {
        return StepOutcome::Resolved;
    };

    sprite.position.z = floor.z + 1;
    match ground {
        Some(face) if !face.is_floor() => {
            if face.normal.z < SLIDE_FACE_NORMAL_Z {
                sprite.velocity.z -= gravity;
            }
        }
        _ => sprite.velocity.z = 0,
    }
    sprite.velocity = damp_velocity(sprite.velocity);

    if sprite.velocity.xy_length_sqr() < STOP_SPEED_SQ {
        sprite.velocity = Vec3i::ZERO;
        let position = sprite.position;
        if props.has(F::NO_SPRITE) {
            emit_trail(state, position, props);
        }
        return StepOutcome::Resolved;
    }
    StepOutcome::Retry
}

/// Indoor collision loop. Spends from the shared `budget`.
fn indoor_collide(state: &mut SimState, slot: usize, level: &dyn LevelGeometry, budget: &mut u32) -> StepOutcome {
    let Some(mut props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };
    let radius = props.radius;
    let lift = Vec3i::new(0, 0, radius + 1);
    let dt = state.dt_fixed();
    state.collision.begin(radius);

    while *budget > 0 {
        *budget -= 1;
        let Some(sprite) = state.registry.slot(slot).filter(|s| !s.is_free()) else {
            return StepOutcome::Resolved;
        };
        let caster = sprite.caster;
        state.collision.load(sprite.position, sprite.velocity, sprite.sector_id);
        if state.collision.prepare_and_check_if_stationary(dt) {
            return StepOutcome::Resolved;
        }

        for _ in 0..MAX_PORTAL_PASSES {
            level.collide_with_faces(&mut state.collision);
            level.collide_with_decorations(&mut state.collision);
            sweep_bodies(state, caster, false);
            if level.collide_with_portals(&mut state.collision) {
                break;
            }
        }

        #[cfg(feature = "debug-tracing")]
        trace!(
            slot,
            hit = ?state.collision.pid,
            adjusted = state.collision.adjusted_move_distance,
            wanted = state.collision.move_distance,
            "indoor sweep"
        );

        let hit = state.collision.pid;
        let sector = state.collision.sector_id;
        if state.collision.fully_moved() {
            let end = state.collision.new_position_lo - lift;
            if let Some(s) = live_mut(state, slot) {
                s.position = end;
                s.sector_id = sector;
            }
            if props.has(F::TRAIL_PARTICLE) {
                emit_trail(state, end, props);
            }
            return StepOutcome::Resolved;
        }

        let step = state.collision.allowed_step();
        state.collision.total_move_distance += state.collision.adjusted_move_distance;
        if let Some(s) = live_mut(state, slot) {
            s.position += step;
            s.sector_id = sector;
        }

        if props.has(F::INTERACTABLE) && !process_spell_impact(state, slot, hit).proceeds() {
            return StepOutcome::Resolved;
        }
        match state.props(slot) {
            Some(p) => props = p,
            None => return StepOutcome::Resolved,
        }

        let face = match hit.kind() {
            ObjectKind::Face => {
                state.collision.ignored_face = Some(hit.id());
                level.face(hit)
            }
            _ => None,
        };
        let decoration = level.decoration_position(hit);
        let speed = state.collision.speed;
        let Some(sprite) = live_mut(state, slot) else {
            return StepOutcome::Resolved;
        };

        let mut triggered = None;
        if let Some(center) = decoration {
            sprite.velocity = redirect_away_from(sprite.velocity, sprite.position, center);
        }
        if let Some(face) = face {
            if !face.is_floor() {
                sprite.velocity = deflect_off_face(sprite.velocity, face.normal, speed);
                triggered = Some(face);
            } else if props.has(F::BOUNCE) {
                sprite.velocity.z = -sprite.velocity.z / 2;
                if sprite.velocity.z < BOUNCE_CUTOFF {
                    sprite.velocity.z = 0;
                }
                triggered = Some(face);
            } else {
                sprite.velocity.z = 0;
                if sprite.velocity.xy_length_sqr() >= STOP_SPEED_SQ {
                    triggered = Some(face);
                } else {
                    sprite.velocity = Vec3i::ZERO;
                    sprite.position.z = face.min.z + 1;
                }
            }
        }
        sprite.velocity = damp_velocity(sprite.velocity);

        if let Some(face) = triggered {
            trigger_face(state, &face, hit);
        }
    }

    StepOutcome::Deflected
}

// =============================================================================
// OUTDOOR
// =============================================================================

fn update_outdoor(state: &mut SimState, slot: usize) -> StepOutcome {
    let Some(props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };
    let Some(position) = state.registry.slot(slot).map(|s| s.position) else {
        return StepOutcome::Resolved;
    };
    let level = Arc::clone(&state.level);
    let steep = level.is_steep_slope(position.x, position.y);
    let ground = level.outdoor_floor(position);
    let floor = ground.level;
    let airborne = position.z > floor + 1;

    if !airborne && ground.on_water {
        let height = if ground.over_model { SPLASH_HEIGHT_MODEL } else { SPLASH_HEIGHT };
        create_splash(state, Vec3i::new(position.x, position.y, floor + height));
        state.remove_sprite(slot);
        return StepOutcome::Resolved;
    }

    let gravity = state.gravity_step();
    if !props.has(F::NO_GRAVITY) {
        if airborne {
            if let Some(s) = live_mut(state, slot) {
                s.velocity.z -= gravity;
            }
        } else if steep {
            let normal = level.terrain_normal(position.x, position.y);
            if let Some(s) = live_mut(state, slot) {
                s.position.z = floor + 1;
                s.velocity.z -= gravity;
                let along = saturate_i32(normal.dot(s.velocity).abs() >> FIXED_SCALE);
                s.velocity += Vec3i::new(
                    fixpoint_mul(along, normal.x),
                    fixpoint_mul(along, normal.y),
                    fixpoint_mul(along, normal.z),
                );
            }
        } else {
            if props.has(F::INTERACTABLE) {
                if let Some(s) = live_mut(state, slot) {
                    if s.position.z < floor {
                        s.position.z = floor + 1;
                    }
                }
                if !process_spell_impact(state, slot, Pid::NONE).proceeds() {
                    return StepOutcome::Resolved;
                }
            }
            let Some(s) = live_mut(state, slot) else {
                return StepOutcome::Resolved;
            };
            s.position.z = floor + 1;
            if props.has(F::BOUNCE) {
                let bounce = -(s.velocity.z / 2);
                s.velocity.z = if bounce < BOUNCE_CUTOFF { 0 } else { bounce };
            } else {
                s.velocity.z = 0;
            }
            s.velocity = damp_velocity(s.velocity);
            if s.velocity.xy_length_sqr() < STOP_SPEED_SQ {
                s.velocity.x = 0;
                s.velocity.y = 0;
                let rest = s.position;
                emit_trail(state, rest, props);
                return StepOutcome::Resolved;
            }
        }
    }

    if props.has(F::INTERACTABLE) {
        let Some(s) = live_mut(state, slot) else {
            return StepOutcome::Resolved;
        };
        let p = s.position;
        if p.x.abs() > OUTDOOR_XY_LIMIT || p.y.abs() > OUTDOOR_XY_LIMIT || p.z <= floor || p.z > OUTDOOR_Z_LIMIT {
            if p.z < floor {
                s.position.z = floor + 1;
            }
            if !process_spell_impact(state, slot, Pid::NONE).proceeds() {
                return StepOutcome::Resolved;
            }
        }
    }

    outdoor_collide(state, slot, &*level, floor, ground.on_water)
}

/// Outdoor collision loop.
///
/// The splash check inside the loop tests against the water flag and
/// floor of the starting position, not of the probe.
fn outdoor_collide(state: &mut SimState, slot: usize, level: &dyn LevelGeometry, floor: i32, started_on_water: bool) -> StepOutcome {
    let Some(mut props) = state.props(slot) else {
        return StepOutcome::Resolved;
    };
    let radius = props.radius;
    let lift = Vec3i::new(0, 0, radius + 1);
    let dt = state.dt_fixed();
    state.collision.begin(radius);

    for _ in 0..MAX_COLLISION_ITERATIONS {
        let Some(sprite) = state.registry.slot(slot).filter(|s| !s.is_free()) else {
            return StepOutcome::Resolved;
        };
        let caster = sprite.caster;
        let position = sprite.position;
        state.collision.load(position, sprite.velocity, 0);
        if state.collision.prepare_and_check_if_stationary(dt) {
            return StepOutcome::Resolved;
        }

        level.collide_with_faces(&mut state.collision);
        level.collide_with_decorations(&mut state.collision);
        sweep_bodies(state, caster, true);

        #[cfg(feature = "debug-tracing")]
        trace!(
            slot,
            hit = ?state.collision.pid,
            adjusted = state.collision.adjusted_move_distance,
            wanted = state.collision.move_distance,
            "outdoor sweep"
        );

        let probe = state.collision.new_position_lo - lift;
        let landing = level.outdoor_floor(probe);
        if started_on_water && probe.z < landing.level + SPLASH_HEIGHT {
            let z = if landing.over_model {
                landing.level + SPLASH_HEIGHT_MODEL
            } else {
                floor + SPLASH_HEIGHT
            };
            create_splash(state, Vec3i::new(position.x, position.y, z));
            state.remove_sprite(slot);
            return StepOutcome::Resolved;
        }

        let hit = state.collision.pid;
        let sector = state.collision.sector_id;
        if state.collision.fully_moved() {
            if let Some(s) = live_mut(state, slot) {
                s.position = probe;
                s.sector_id = sector;
            }
            emit_trail(state, probe, props);
            return StepOutcome::Resolved;
        }

        let step = state.collision.allowed_step();
        state.collision.total_move_distance += state.collision.adjusted_move_distance;
        if let Some(s) = live_mut(state, slot) {
            s.position += step;
            s.sector_id = sector;
        }

        if props.has(F::INTERACTABLE) {
            if let Some(s) = live_mut(state, slot) {
                if s.position.z < floor {
                    s.position.z = floor + 1;
                }
            }
            if !process_spell_impact(state, slot, hit).proceeds() {
                return StepOutcome::Resolved;
            }
            match state.props(slot) {
                Some(p) => props = p,
                None => return StepOutcome::Resolved,
            }
        }

        if hit.kind() == ObjectKind::Decoration {
            break;
        }

        let face = level.face(hit);
        let speed = state.collision.speed;
        let Some(sprite) = live_mut(state, slot) else {
            return StepOutcome::Resolved;
        };
        let mut triggered = None;
        if let Some(face) = face {
            if face.is_floor() {
                sprite.position.z = face.min.z + 1;
                if sprite.velocity.xy_length_sqr() >= STOP_SPEED_SQ {
                    triggered = Some(face);
                } else {
                    sprite.velocity = Vec3i::ZERO;
                }
            } else {
                sprite.velocity = deflect_off_face(sprite.velocity, face.normal, speed);
                triggered = Some(face);
            }
        }
        sprite.velocity = damp_velocity(sprite.velocity);

        if let Some(face) = triggered {
            trigger_face(state, &face, hit);
        }
    }

    // Out of iterations or stopped by a decoration: turn away from the
    // last thing hit if it was one.
    let last = state.collision.pid;
    if let Some(center) = level.decoration_position(last) {
        if let Some(s) = live_mut(state, slot) {
            // Radial (cos, sin) like the indoor path, not a quarter-turn y.
            s.velocity = redirect_away_from(s.velocity, s.position, center);
        }
    } else {
        debug!(slot, "outdoor collision budget exhausted");
    }
    StepOutcome::Deflected
}
