//! Spell Impact Resolver
//!
//! Decides what happens when a sprite touches something: nothing, damage
//! plus a retype to its impact visual, a plain retype, a despawn, or a
//! burst of follow-up shards.
//!
//! ```text
//!  process_spell_impact(slot, pid)
//!    │
//!    ├─ relation check ── friendly fire ──────────▶ Continue
//!    ├─ turn-based bookkeeping (once)
//!    ├─ scenery-miss flag on the caster
//!    │
//!    ├─ override?  lingering / arrow / shards / status rays
//!    └─ table      ImpactRule { passes, damage, next, aoe, burst, sound }
//! ```
//!
//! Most types share the "damage, advance stage, play sound" pattern, which
//! the rule table drives. The handful of stateful exceptions run as
//! explicit overrides before the table is consulted.

use tracing::{debug, trace};

use crate::core::trig::{ANGLE_FULL, ANGLE_QUARTER_PI};
use crate::core::vec3::Vec3i;
use crate::game::actor::{ActorAttributes, ActorBuff, AiState, DamageType};
use crate::game::damage::apply_spell_sprite_damage;
use crate::game::descriptor::ObjectDescFlags;
use crate::game::events::{SimEventData, SoundId};
use crate::game::pid::{ObjectKind, Pid};
use crate::game::registry::SpawnOrigin;
use crate::game::sprite::{AttackKind, SkillMastery, SpellId, SpriteAttributes, SpriteType};
use crate::game::state::{GameTime, SimState};

/// Caster ids at or above this are not real actors.
const MAX_CASTER_ACTOR_ID: u32 = 500;

/// Launch speed of ice blast shards.
const ICE_SHARD_SPEED: i32 = 1000;

/// Shard count of a death blossom.
const BLOSSOM_SHARDS: usize = 8;

/// Shrink power of the grandmaster area shrink.
const SHRINK_AOE_POWER: u16 = 4;

// =============================================================================
// OUTCOME
// =============================================================================

/// What the resolver did with the sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpactOutcome {
    /// Nothing happened; the caller carries on with its collision response
    Continue,
    /// Damage was requested and the sprite advanced to its next stage
    DamagedAndRetyped,
    /// The sprite advanced to its next stage without doing damage
    Retyped,
    /// The sprite is gone
    Despawned,
    /// The sprite burst into shards and is gone
    SpawnedFollowups {
        /// Shards launched
        count: usize,
    },
    /// Terminal type; nothing to do, but the caller must stop
    Inert,
}

impl ImpactOutcome {
    /// True when the caller may proceed with its pending collision
    /// response.
    #[inline]
    pub fn proceeds(self) -> bool {
        self == ImpactOutcome::Continue
    }
}

// =============================================================================
// RULE TABLE
// =============================================================================

/// Colliders an effect passes through without reacting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Passes {
    /// Reacts to everything
    Nothing,
    /// Ignores faces, decorations and empty contacts
    Scenery,
    /// Ignores actors
    Actors,
}

impl Passes {
    fn lets_through(self, pid: Pid) -> bool {
        match self {
            Passes::Nothing => false,
            Passes::Scenery => matches!(pid.kind(), ObjectKind::Face | ObjectKind::Decoration | ObjectKind::None),
            Passes::Actors => pid.kind() == ObjectKind::Actor,
        }
    }
}

/// When the damage request is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageGate {
    /// Never
    Never,
    /// Before the sprite is retyped and stopped
    BeforeRetype,
    /// After the sprite stopped; the direction is then zero
    AfterRetype,
    /// Before retyping, only against undead actors
    UndeadOnly,
}

/// Stage the sprite advances to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStage {
    /// `kind.impact()`
    Impact,
    /// A fixed type
    To(SpriteType),
    /// Remove the sprite
    Despawn,
}

/// Attack kind of the area attack issued on impact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AreaAttack {
    /// No area attack
    None,
    /// Always the primary attack
    Primary,
    /// The attack kind the sprite carries
    Carried,
}

/// Sound played on impact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpactSound {
    /// None
    Silent,
    /// The carried spell's sound
    Spell,
    /// Generic explosion
    FireBall,
}

/// Table-driven impact behavior of one effect type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImpactRule {
    /// Colliders that do not trigger the impact
    pub passes: Passes,
    /// Damage gate
    pub damage: DamageGate,
    /// Next stage
    pub next: NextStage,
    /// Area attack
    pub aoe: AreaAttack,
    /// Particle burst when the descriptor leaves particle trails
    pub burst: bool,
    /// Sound
    pub sound: ImpactSound,
}

impl ImpactRule {
    const fn hit(sound: ImpactSound) -> Self {
        Self {
            passes: Passes::Nothing,
            damage: DamageGate::BeforeRetype,
            next: NextStage::Impact,
            aoe: AreaAttack::None,
            burst: false,
            sound,
        }
    }

    const fn explosion(passes: Passes, aoe: AreaAttack, burst: bool, sound: ImpactSound) -> Self {
        Self {
            passes,
            damage: DamageGate::Never,
            next: NextStage::Impact,
            aoe,
            burst,
            sound,
        }
    }
}

/// Table entry for `kind`. `None` marks terminal types.
pub fn impact_rule(kind: SpriteType) -> Option<ImpactRule> {
    use ImpactSound::*;
    use SpriteType as T;

    let rule = match kind {
        T::PROJECTILE_FIREBOLT
        | T::PROJECTILE_AIRBOLT
        | T::PROJECTILE_WATERBOLT
        | T::PROJECTILE_EARTHBOLT
        | T::PROJECTILE_520
        | T::PROJECTILE_525
        | T::PROJECTILE_530
        | T::PROJECTILE_LIGHTBOLT
        | T::PROJECTILE_DARKBOLT => ImpactRule::hit(Spell),

        T::BLASTER_PROJECTILE => ImpactRule::hit(FireBall),

        T::SPELL_FIRE_FIRE_BOLT
        | T::SPELL_FIRE_INCINERATE
        | T::SPELL_AIR_LIGHTNING_BOLT
        | T::SPELL_WATER_POISON_SPRAY
        | T::SPELL_WATER_ICE_BOLT
        | T::SPELL_WATER_ACID_BURST
        | T::SPELL_EARTH_STUN
        | T::SPELL_EARTH_DEADLY_SWARM
        | T::SPELL_EARTH_BLADES
        | T::SPELL_EARTH_MASS_DISTORTION
        | T::SPELL_MIND_MIND_BLAST
        | T::SPELL_MIND_PSYCHIC_SHOCK
        | T::SPELL_BODY_HARM
        | T::SPELL_BODY_FLYING_FIST
        | T::SPELL_LIGHT_LIGHT_BOLT
        | T::SPELL_LIGHT_SUNRAY
        | T::SPELL_DARK_SHARPMETAL => ImpactRule::hit(Spell),

        T::SPELL_FIRE_FIRE_SPIKE | T::SPELL_AIR_SPARKS | T::SPELL_DARK_TOXIC_CLOUD => ImpactRule {
            passes: Passes::Scenery,
            ..ImpactRule::hit(Spell)
        },

        T::ARROW_PROJECTILE | T::PROJECTILE_EXPLOSIVE => ImpactRule {
            damage: DamageGate::AfterRetype,
            next: NextStage::Despawn,
            ..ImpactRule::hit(Spell)
        },

        T::SPELL_WATER_ICE_BLAST_FALLOUT => ImpactRule {
            damage: DamageGate::AfterRetype,
            ..ImpactRule::hit(Spell)
        },

        T::SPELL_LIGHT_DESTROY_UNDEAD => ImpactRule {
            damage: DamageGate::UndeadOnly,
            ..ImpactRule::hit(Spell)
        },

        T::OBJECT_EXPLODE => ImpactRule::explosion(Passes::Nothing, AreaAttack::Primary, true, FireBall),
        T::SPELL_EARTH_ROCK_BLAST => ImpactRule::explosion(Passes::Scenery, AreaAttack::Primary, false, Spell),
        T::SPELL_EARTH_DEATH_BLOSSOM_FALLOUT => {
            ImpactRule::explosion(Passes::Nothing, AreaAttack::Carried, false, Spell)
        }
        T::SPELL_FIRE_FIREBALL | T::SPELL_DARK_DRAGON_BREATH => {
            ImpactRule::explosion(Passes::Nothing, AreaAttack::Carried, true, Spell)
        }
        T::SPELL_FIRE_METEOR_SHOWER | T::SPELL_AIR_STARBURST => {
            ImpactRule::explosion(Passes::Actors, AreaAttack::Carried, true, Spell)
        }

        _ => return None,
    };
    Some(rule)
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolve the sprite in `slot` touching `pid`.
///
/// The sprite may be retyped or removed; callers must re-read the slot
/// and its descriptor afterwards.
pub fn process_spell_impact(state: &mut SimState, slot: usize, pid: Pid) -> ImpactOutcome {
    let Some(sprite) = state.registry.slot(slot) else {
        return ImpactOutcome::Inert;
    };
    if sprite.is_free() {
        return ImpactOutcome::Inert;
    }
    let caster = sprite.caster;
    let kind = sprite.sprite_type;

    if is_friendly(state, caster, pid) {
        return ImpactOutcome::Continue;
    }

    if state.turn.active {
        if let Some(s) = state.registry.slot_mut(slot) {
            if s.attributes.has(SpriteAttributes::HALT_TURN_BASED) {
                s.attributes.clear(SpriteAttributes::HALT_TURN_BASED);
                state.turn.pending_actions -= 1;
            }
        }
    }

    if pid.kind() == ObjectKind::Face && caster.kind() == ObjectKind::Actor && caster.id() < MAX_CASTER_ACTOR_ID {
        if let Some(actor) = state.actors.get_mut(caster.index()) {
            actor.attributes.set(ActorAttributes::SPELL_MISSED);
        }
    }

    let outcome = match kind {
        SpriteType::SPELL_FIRE_FIRE_SPIKE | SpriteType::SPELL_AIR_SPARKS | SpriteType::SPELL_DARK_TOXIC_CLOUD
            if pid.kind() == ObjectKind::Item =>
        {
            let rule = ImpactRule {
                passes: Passes::Scenery,
                damage: DamageGate::Never,
                ..ImpactRule::hit(ImpactSound::FireBall)
            };
            run_rule(state, slot, pid, kind, rule)
        }

        SpriteType::ARROW_PROJECTILE | SpriteType::PROJECTILE_EXPLOSIVE
            if state.registry.slot(slot).is_some_and(|s| s.item.escalates_to_explosion()) =>
        {
            let rule = ImpactRule {
                damage: DamageGate::Never,
                next: NextStage::To(SpriteType::OBJECT_EXPLODE),
                ..ImpactRule::hit(ImpactSound::FireBall)
            };
            run_rule(state, slot, pid, kind, rule)
        }

        SpriteType::SPELL_WATER_ICE_BLAST => {
            let mastery = state.registry.slot(slot).map_or(SkillMastery::None, |s| s.spell_mastery);
            let count = if mastery == SkillMastery::Grandmaster { 9 } else { 7 };
            burst_into_shards(state, slot, SpriteType::SPELL_WATER_ICE_BLAST_FALLOUT, count, false)
        }

        SpriteType::SPELL_EARTH_DEATH_BLOSSOM => {
            burst_into_shards(state, slot, SpriteType::SPELL_EARTH_DEATH_BLOSSOM_FALLOUT, BLOSSOM_SHARDS, true)
        }

        SpriteType::SPELL_MIND_CHARM | SpriteType::SPELL_LIGHT_PARALYZE | SpriteType::SPELL_DARK_SHRINKING_RAY => {
            status_ray(state, slot, pid, kind)
        }

        _ => match impact_rule(kind) {
            Some(rule) => run_rule(state, slot, pid, kind, rule),
            None => ImpactOutcome::Inert,
        },
    };

    trace!(slot, ?pid, sprite_type = kind.0, ?outcome, "spell impact");
    outcome
}

/// Friendly fire never reaches the type dispatch.
fn is_friendly(state: &SimState, caster: Pid, pid: Pid) -> bool {
    match pid.kind() {
        ObjectKind::Actor => {
            if caster.kind() != ObjectKind::Actor {
                return false;
            }
            match (state.actors.get(caster.index()), state.actors.get(pid.index())) {
                (Some(a), Some(b)) => !a.is_hostile_to(b, state.time),
                _ => false,
            }
        }
        ObjectKind::Player => caster.kind() == ObjectKind::Player,
        _ => false,
    }
}

/// Switch the sprite to `kind`. Returns false, freeing the slot, when the
/// type has no descriptor.
fn retype(state: &mut SimState, slot: usize, kind: SpriteType) -> bool {
    let desc_id = state.objects.object_desc_id(kind);
    if desc_id == 0 {
        debug!(slot, sprite_type = kind.0, "retype target has no descriptor");
        state.remove_sprite(slot);
        return false;
    }
    if let Some(s) = state.registry.slot_mut(slot) {
        s.sprite_type = kind;
        s.object_desc_id = desc_id;
    }
    true
}

fn stop(state: &mut SimState, slot: usize) {
    if let Some(s) = state.registry.slot_mut(slot) {
        s.stop();
    }
}

fn play_sound(state: &mut SimState, slot: usize, sound: ImpactSound, spell: SpellId) {
    let source = Pid::item(slot);
    match sound {
        ImpactSound::Silent => {}
        ImpactSound::Spell => state.push_event(SimEventData::SpellSound { spell, source }),
        ImpactSound::FireBall => state.push_event(SimEventData::Sound { sound: SoundId::FireBall, source }),
    }
}

fn is_undead_actor(state: &SimState, pid: Pid) -> bool {
    pid.kind() == ObjectKind::Actor && state.actors.get(pid.index()).is_some_and(|a| a.undead)
}

/// Apply a table rule.
fn run_rule(state: &mut SimState, slot: usize, pid: Pid, kind: SpriteType, rule: ImpactRule) -> ImpactOutcome {
    if rule.passes.lets_through(pid) {
        return ImpactOutcome::Continue;
    }
    let before = state.props(slot);

    let mut damaged = match rule.damage {
        DamageGate::BeforeRetype => apply_spell_sprite_damage(state, slot, pid),
        DamageGate::UndeadOnly if is_undead_actor(state, pid) => apply_spell_sprite_damage(state, slot, pid),
        _ => false,
    };

    let live = match rule.next {
        NextStage::Impact => retype(state, slot, kind.impact()),
        NextStage::To(next) => retype(state, slot, next),
        NextStage::Despawn => false,
    };
    stop(state, slot);

    if rule.damage == DamageGate::AfterRetype {
        damaged = apply_spell_sprite_damage(state, slot, pid);
    }
    if rule.next == NextStage::Despawn {
        state.remove_sprite(slot);
    }

    let Some(sprite) = state.registry.slot(slot) else {
        return ImpactOutcome::Inert;
    };
    let position = sprite.position;
    let caster = sprite.caster;
    let carried = sprite.attack_kind;
    let spell = sprite.spell_id;

    let attack = match rule.aoe {
        AreaAttack::None => None,
        AreaAttack::Primary => Some(AttackKind::Attack1),
        AreaAttack::Carried => Some(carried),
    };
    if let Some(attack) = attack {
        state.push_event(SimEventData::AreaAttack {
            position,
            radius: state.config.aoe_damage_distance,
            attack,
            source: Pid::item(slot),
            caster,
        });
    }
    if rule.burst {
        if let Some(props) = before.filter(|p| p.has(ObjectDescFlags::TRAIL_PARTICLE)) {
            state.push_event(SimEventData::ParticleBurst { position, color: props.particle_rgb });
        }
    }
    play_sound(state, slot, rule.sound, spell);

    if !live {
        ImpactOutcome::Despawned
    } else if damaged {
        ImpactOutcome::DamagedAndRetyped
    } else {
        ImpactOutcome::Retyped
    }
}

/// Turn the sprite into `count` shards of `shard` fanned out from its
/// facing, then remove it. Shards start with a fresh age. Death blossom
/// shards get a random yaw jitter and speed.
fn burst_into_shards(state: &mut SimState, slot: usize, shard: SpriteType, count: usize, jitter: bool) -> ImpactOutcome {
    if !retype(state, slot, shard) {
        // No shard descriptor: the sprite is already gone.
        return ImpactOutcome::Despawned;
    }
    let Some(template) = state.registry.slot_mut(slot).map(|s| {
        s.velocity = Vec3i::ZERO;
        s.age = 0;
        s.clone()
    }) else {
        return ImpactOutcome::Inert;
    };

    let mut yaw = template.facing - ANGLE_FULL;
    let mut launched = 0;
    for _ in 0..count {
        let (delta, speed) = if jitter {
            let delta = state.rng.random_in_segment(-128, 128);
            (delta, state.rng.random_in_segment(5, 500))
        } else {
            (0, ICE_SHARD_SPEED)
        };
        yaw += ANGLE_QUARTER_PI;
        if state.spawn_sprite(template.clone(), yaw + delta, 0, speed, SpawnOrigin::Caster).is_some() {
            launched += 1;
        }
    }

    state.remove_sprite(slot);
    play_sound(state, slot, ImpactSound::Spell, template.spell_id);
    debug!(slot, shard = shard.0, launched, "sprite burst into shards");
    ImpactOutcome::SpawnedFollowups { count: launched }
}

/// Charm, paralyze and shrink.
fn status_ray(state: &mut SimState, slot: usize, pid: Pid, kind: SpriteType) -> ImpactOutcome {
    let Some(sprite) = state.registry.slot(slot) else {
        return ImpactOutcome::Inert;
    };
    let mastery = sprite.spell_mastery;
    let level = sprite.spell_level;
    let spell = sprite.spell_id;
    let area = kind == SpriteType::SPELL_DARK_SHRINKING_RAY && mastery == SkillMastery::Grandmaster;

    if pid.kind() != ObjectKind::Actor {
        if area && apply_shrink_ray_aoe(state, slot) {
            return land_status_ray(state, slot, kind, spell);
        }
        state.remove_sprite(slot);
        return ImpactOutcome::Despawned;
    }

    let (damage_type, buff) = match kind {
        SpriteType::SPELL_MIND_CHARM => (DamageType::Mind, ActorBuff::Charm),
        SpriteType::SPELL_LIGHT_PARALYZE => (DamageType::Light, ActorBuff::Paralyzed),
        _ => (DamageType::Dark, ActorBuff::Shrink),
    };
    let mut power = 0;
    if kind == SpriteType::SPELL_DARK_SHRINKING_RAY {
        power = match mastery {
            SkillMastery::None => 0,
            SkillMastery::Novice => 2,
            SkillMastery::Expert => 3,
            SkillMastery::Master | SkillMastery::Grandmaster => 4,
        };
        if let Some(actor) = state.actors.get_mut(pid.index()) {
            actor.attributes.set(ActorAttributes::AGGRESSOR);
        }
    }

    let landed = if area {
        apply_shrink_ray_aoe(state, slot)
    } else {
        let expires = state.time.plus(GameTime::from_minutes(level as i64 * 5));
        let index = pid.index();
        match state.actors.get_mut(index) {
            Some(actor) if actor.does_damage_type_do_damage(damage_type) => {
                if buff == ActorBuff::Paralyzed {
                    actor.ai_state = AiState::Standing;
                }
                if actor.buff_mut(buff).apply(expires, mastery, power) {
                    state.push_event(SimEventData::BuffApplied { actor: index, buff, expires, power });
                }
                true
            }
            _ => false,
        }
    };

    if let Some(s) = state.registry.slot_mut(slot) {
        s.spell_level = 0;
        s.spell_mastery = SkillMastery::None;
        s.spell_id = SpellId::NONE;
    }

    if landed {
        land_status_ray(state, slot, kind, spell)
    } else {
        state.remove_sprite(slot);
        ImpactOutcome::Despawned
    }
}

fn land_status_ray(state: &mut SimState, slot: usize, kind: SpriteType, spell: SpellId) -> ImpactOutcome {
    let live = retype(state, slot, kind.impact());
    stop(state, slot);
    play_sound(state, slot, ImpactSound::Spell, spell);
    if live {
        ImpactOutcome::DamagedAndRetyped
    } else {
        ImpactOutcome::Despawned
    }
}

/// Grandmaster shrinking ray: shrink every able actor near the impact.
///
/// Returns true when at least one actor was affected.
pub fn apply_shrink_ray_aoe(state: &mut SimState, slot: usize) -> bool {
    let Some(sprite) = state.registry.slot(slot) else {
        return false;
    };
    let position = sprite.position;
    let mastery = sprite.spell_mastery;
    let expires = state.time.plus(GameTime::from_minutes(sprite.spell_level as i64 * 5));
    let reach = state.config.shrink_ray_aoe_distance as i64;
    let now = state.time;

    let mut affected = false;
    let mut buffed = Vec::new();
    for (index, actor) in state.actors.iter_mut().enumerate() {
        if !actor.can_act(now) {
            continue;
        }
        let offset = actor.position - position + Vec3i::new(0, 0, actor.height / 2);
        let limit = reach + actor.radius as i64;
        if offset.length_sqr() > limit * limit || !actor.does_damage_type_do_damage(DamageType::Dark) {
            continue;
        }
        if actor.buff_mut(ActorBuff::Shrink).apply(expires, mastery, SHRINK_AOE_POWER) {
            buffed.push(index);
        }
        actor.attributes.set(ActorAttributes::AGGRESSOR);
        affected = true;
    }

    for actor in buffed {
        state.push_event(SimEventData::BuffApplied {
            actor,
            buff: ActorBuff::Shrink,
            expires,
            power: SHRINK_AOE_POWER,
        });
    }
    affected
}
