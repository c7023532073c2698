//! Simulation Events
//!
//! Everything the simulation asks of the outside world (audio, particles,
//! damage formulas, buffs, scripted events) is recorded as an event and
//! drained at the end of the tick. The order of events within a tick is the
//! order the integrator produced them.

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3i;
use crate::game::actor::{ActorBuff, DamageType};
use crate::game::pid::Pid;
use crate::game::sprite::{AttackKind, SpellId, SpriteType};
use crate::game::state::GameTime;

/// Fixed sound effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    /// Generic explosion
    FireBall,
    /// Water splash
    Splash,
}

/// Trail particle style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrailKind {
    /// Flickering fire
    Fire,
    /// Streak
    Line,
    /// Plain dot
    Particle,
}

/// Which external damage formula applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageRoute {
    /// A party member hit by a monster projectile
    PlayerFromMonster,
    /// An actor hit by another actor's projectile
    ActorFromMonster,
    /// An actor hit by a party spell or arrow
    ActorFromParty,
    /// An actor hit by a sprite launched by an item (trap, wand)
    ActorFromItem,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEventData {
    /// Play a fixed sound from a sprite slot
    Sound {
        /// Sound
        sound: SoundId,
        /// Emitting sprite
        source: Pid,
    },

    /// Play a spell's impact sound
    SpellSound {
        /// Spell
        spell: SpellId,
        /// Emitting sprite
        source: Pid,
    },

    /// One trail particle
    TrailParticle {
        /// Where
        position: Vec3i,
        /// Style
        kind: TrailKind,
        /// Color
        color: [u8; 3],
    },

    /// Burst of particles at an impact
    ParticleBurst {
        /// Where
        position: Vec3i,
        /// Color
        color: [u8; 3],
    },

    /// Scripted face event
    FaceTrigger {
        /// Event number
        event_id: u16,
        /// Face hit
        face: Pid,
    },

    /// Apply damage through an external formula
    Damage {
        /// Formula
        route: DamageRoute,
        /// Sprite doing damage
        source: Pid,
        /// Who launched it
        caster: Pid,
        /// Victim
        target: Pid,
        /// Attack kind
        attack: AttackKind,
        /// Unit travel direction, Q16.16
        direction: Vec3i,
    },

    /// Area attack around a point
    AreaAttack {
        /// Center
        position: Vec3i,
        /// Radius
        radius: i32,
        /// Attack kind
        attack: AttackKind,
        /// Sprite doing damage
        source: Pid,
        /// Who launched it
        caster: Pid,
    },

    /// A buff landed on an actor
    BuffApplied {
        /// Actor index
        actor: usize,
        /// Buff
        buff: ActorBuff,
        /// Expiry
        expires: GameTime,
        /// Strength
        power: u16,
    },

    /// Trap damage to one party member
    PartyMemberDamaged {
        /// Member index
        member: usize,
        /// Amount
        amount: i32,
        /// Element
        damage_type: DamageType,
    },

    /// A party member dodged a trap
    PartyMemberAvoided {
        /// Member index
        member: usize,
    },

    /// A slot was freed
    SpriteRemoved {
        /// Slot
        slot: usize,
        /// Type it had
        sprite_type: SpriteType,
    },
}

/// An event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Event data
    pub data: SimEventData,
}

impl SimEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: SimEventData) -> Self {
        Self { tick, data }
    }

    /// True for audio events.
    pub fn is_sound(&self) -> bool {
        matches!(self.data, SimEventData::Sound { .. } | SimEventData::SpellSound { .. })
    }

    /// True for damage or area attack requests.
    pub fn is_damage(&self) -> bool {
        matches!(
            self.data,
            SimEventData::Damage { .. } | SimEventData::AreaAttack { .. } | SimEventData::PartyMemberDamaged { .. }
        )
    }
}
