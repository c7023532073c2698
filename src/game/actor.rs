//! Actors
//!
//! The slice of monster/NPC state the sprite simulation reads and writes:
//! body cylinder, faction, damage immunities and the three spell buffs a
//! sprite can land.

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3i;
use crate::game::sprite::SkillMastery;
use crate::game::state::GameTime;

// =============================================================================
// DAMAGE TYPES
// =============================================================================

/// Damage element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DamageType {
    /// Fire
    Fire = 0,
    /// Air / electricity
    Air = 1,
    /// Water / cold
    Water = 2,
    /// Earth
    Earth = 3,
    /// Physical
    Physical = 4,
    /// Spirit
    Spirit = 5,
    /// Mind
    Mind = 6,
    /// Body
    Body = 7,
    /// Light
    Light = 8,
    /// Dark
    Dark = 9,
    /// Pure magic
    Magic = 10,
}

/// Set of damage types an actor is immune to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DamageTypeSet(pub u16);

impl DamageTypeSet {
    /// Empty set.
    pub const NONE: Self = Self(0);

    /// Set with one member added.
    #[inline]
    pub fn with(self, t: DamageType) -> Self {
        Self(self.0 | 1 << t as u16)
    }

    /// Membership test.
    #[inline]
    pub fn contains(self, t: DamageType) -> bool {
        self.0 & (1 << t as u16) != 0
    }
}

// =============================================================================
// BUFFS
// =============================================================================

/// Spell buffs a sprite can apply to an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActorBuff {
    /// Fights for the party
    Charm = 0,
    /// Cannot act
    Paralyzed = 1,
    /// Reduced size and damage
    Shrink = 2,
}

/// One timed buff slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellBuff {
    /// Game time the buff runs out; zero when inactive
    pub expires: GameTime,
    /// Caster mastery
    pub skill: SkillMastery,
    /// Strength
    pub power: u16,
}

impl SpellBuff {
    /// Apply unless a longer-lasting buff is already in place.
    pub fn apply(&mut self, expires: GameTime, skill: SkillMastery, power: u16) -> bool {
        if self.expires.0 != 0 && expires < self.expires {
            return false;
        }
        self.expires = expires;
        self.skill = skill;
        self.power = power;
        true
    }

    /// True while the buff has not run out.
    #[inline]
    pub fn active(&self, now: GameTime) -> bool {
        self.expires > now
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// AI state, reduced to what the simulation cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Idle
    #[default]
    Standing,
    /// Walking
    Moving,
    /// Mid-attack
    Attacking,
    /// Stunned
    Stunned,
    /// Death animation
    Dying,
    /// Corpse
    Dead,
    /// Removed from play
    Disabled,
}

/// Actor attribute bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActorAttributes(pub u32);

impl ActorAttributes {
    /// Turned hostile toward the party.
    pub const AGGRESSOR: u32 = 1 << 0;
    /// One of its spells just struck scenery.
    pub const SPELL_MISSED: u32 = 1 << 1;

    /// Check a bit.
    #[inline]
    pub fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Set a bit.
    #[inline]
    pub fn set(&mut self, bit: u32) {
        self.0 |= bit;
    }
}

/// A monster or NPC.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    /// Monster table id, 0 for none
    pub monster_id: u16,
    /// Ally group; actors in the same group do not hurt each other
    pub ally_group: u16,
    /// Feet position
    pub position: Vec3i,
    /// Body radius
    pub radius: i32,
    /// Body height
    pub height: i32,
    /// Radius used when this actor's own projectiles sweep other actors
    pub to_hit_radius: i32,
    /// Undead species flag
    pub undead: bool,
    /// Damage types that do nothing
    pub immunities: DamageTypeSet,
    /// Charm, paralyze and shrink slots
    pub buffs: [SpellBuff; 3],
    /// Attribute bits
    pub attributes: ActorAttributes,
    /// AI state
    pub ai_state: AiState,
}

impl Actor {
    /// Actor of `monster_id` standing at `position`.
    pub fn new(monster_id: u16, position: Vec3i, radius: i32, height: i32) -> Self {
        Self {
            monster_id,
            ally_group: monster_id,
            position,
            radius,
            height,
            ..Self::default()
        }
    }

    /// Buff slot.
    #[inline]
    pub fn buff(&self, buff: ActorBuff) -> &SpellBuff {
        &self.buffs[buff as usize]
    }

    /// Mutable buff slot.
    #[inline]
    pub fn buff_mut(&mut self, buff: ActorBuff) -> &mut SpellBuff {
        &mut self.buffs[buff as usize]
    }

    /// Whether damage of this type has any effect.
    #[inline]
    pub fn does_damage_type_do_damage(&self, t: DamageType) -> bool {
        !self.immunities.contains(t)
    }

    /// Alive, present and not held by paralysis.
    pub fn can_act(&self, now: GameTime) -> bool {
        !matches!(self.ai_state, AiState::Dying | AiState::Dead | AiState::Disabled)
            && !self.buff(ActorBuff::Paralyzed).active(now)
    }

    /// Whether sprites can hit this actor at all.
    #[inline]
    pub fn is_collidable(&self) -> bool {
        !matches!(self.ai_state, AiState::Dead | AiState::Disabled)
    }

    /// Whether `self` is hostile toward `other`. Charmed actors side with
    /// the party and turn on their own group.
    pub fn is_hostile_to(&self, other: &Actor, now: GameTime) -> bool {
        let charmed = |a: &Actor| a.buff(ActorBuff::Charm).active(now);
        (self.ally_group != other.ally_group) ^ (charmed(self) != charmed(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goblin() -> Actor {
        Actor::new(7, Vec3i::new(0, 0, 0), 40, 100)
    }

    #[test]
    fn test_immunities() {
        let mut a = goblin();
        a.immunities = DamageTypeSet::NONE.with(DamageType::Mind).with(DamageType::Dark);
        assert!(!a.does_damage_type_do_damage(DamageType::Mind));
        assert!(!a.does_damage_type_do_damage(DamageType::Dark));
        assert!(a.does_damage_type_do_damage(DamageType::Fire));
    }

    #[test]
    fn test_buff_not_shortened() {
        let mut buff = SpellBuff::default();
        assert!(buff.apply(GameTime(1000), SkillMastery::Expert, 3));
        assert!(!buff.apply(GameTime(500), SkillMastery::Master, 4));
        assert_eq!(buff.power, 3);
        assert!(buff.apply(GameTime(2000), SkillMastery::Master, 4));
        assert_eq!(buff.expires, GameTime(2000));
    }

    #[test]
    fn test_can_act() {
        let mut a = goblin();
        let now = GameTime(100);
        assert!(a.can_act(now));

        a.buff_mut(ActorBuff::Paralyzed).apply(GameTime(200), SkillMastery::Novice, 1);
        assert!(!a.can_act(now));
        assert!(a.can_act(GameTime(200)));

        a.ai_state = AiState::Dead;
        assert!(!a.can_act(GameTime(300)));
        assert!(!a.is_collidable());
    }

    #[test]
    fn test_relations() {
        let now = GameTime(0);
        let a = goblin();
        let b = goblin();
        let mut c = Actor::new(9, Vec3i::ZERO, 40, 100);
        assert!(!a.is_hostile_to(&b, now));
        assert!(a.is_hostile_to(&c, now));

        c.buff_mut(ActorBuff::Charm).apply(GameTime(50), SkillMastery::Expert, 1);
        assert!(!a.is_hostile_to(&c, now));
        assert!(a.is_hostile_to(&c, GameTime(60)));
    }
}
