//! Sprite Object Definitions
//!
//! A sprite object is any transient world entity the simulation drives:
//! projectiles, spell effects and their impact visuals, trap bursts,
//! dropped items and splashes.

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3i;
use crate::game::pid::Pid;

// =============================================================================
// SPRITE TYPE
// =============================================================================

/// Effect type of a sprite object.
///
/// Projectile and spell types are followed in numbering by their impact
/// visual (`kind.0 + 1`), which is what retyping on impact switches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SpriteType(pub u16);

#[allow(missing_docs)]
impl SpriteType {
    pub const NULL: Self = Self(0);

    // Monster / party projectiles
    pub const PROJECTILE_FIREBOLT: Self = Self(500);
    pub const PROJECTILE_AIRBOLT: Self = Self(505);
    pub const PROJECTILE_WATERBOLT: Self = Self(510);
    pub const PROJECTILE_EARTHBOLT: Self = Self(515);
    pub const PROJECTILE_520: Self = Self(520);
    pub const PROJECTILE_525: Self = Self(525);
    pub const PROJECTILE_530: Self = Self(530);
    pub const PROJECTILE_LIGHTBOLT: Self = Self(535);
    pub const PROJECTILE_DARKBOLT: Self = Self(540);
    pub const ARROW_PROJECTILE: Self = Self(545);
    pub const PROJECTILE_EXPLOSIVE: Self = Self(550);
    pub const BLASTER_PROJECTILE: Self = Self(555);

    // Death explosion of exploding monsters
    pub const OBJECT_EXPLODE: Self = Self(600);
    pub const OBJECT_EXPLODE_IMPACT: Self = Self(601);

    // Dropped item visual
    pub const DROPPED_ITEM: Self = Self(700);

    pub const WATER_SPLASH: Self = Self(800);

    pub const TRAP_FIRE: Self = Self(811);
    pub const TRAP_LIGHTNING: Self = Self(812);
    pub const TRAP_COLD: Self = Self(813);
    pub const TRAP_BODY: Self = Self(814);

    // Fire
    pub const SPELL_FIRE_FIRE_BOLT: Self = Self(1010);
    pub const SPELL_FIRE_FIREBALL: Self = Self(1050);
    pub const SPELL_FIRE_FIRE_SPIKE: Self = Self(1060);
    pub const SPELL_FIRE_METEOR_SHOWER: Self = Self(1090);
    pub const SPELL_FIRE_INCINERATE: Self = Self(1100);

    // Air
    pub const SPELL_AIR_SPARKS: Self = Self(2030);
    pub const SPELL_AIR_LIGHTNING_BOLT: Self = Self(2040);
    pub const SPELL_AIR_STARBURST: Self = Self(2100);

    // Water
    pub const SPELL_WATER_POISON_SPRAY: Self = Self(3010);
    pub const SPELL_WATER_ICE_BOLT: Self = Self(3030);
    pub const SPELL_WATER_ACID_BURST: Self = Self(3050);
    pub const SPELL_WATER_ICE_BLAST: Self = Self(3060);
    pub const SPELL_WATER_ICE_BLAST_FALLOUT: Self = Self(3070);
    pub const SPELL_WATER_ICE_BLAST_IMPACT: Self = Self(3071);

    // Earth
    pub const SPELL_EARTH_STUN: Self = Self(4010);
    pub const SPELL_EARTH_DEADLY_SWARM: Self = Self(4030);
    pub const SPELL_EARTH_BLADES: Self = Self(4050);
    pub const SPELL_EARTH_ROCK_BLAST: Self = Self(4070);
    pub const SPELL_EARTH_DEATH_BLOSSOM: Self = Self(4090);
    pub const SPELL_EARTH_DEATH_BLOSSOM_FALLOUT: Self = Self(4092);
    pub const SPELL_EARTH_DEATH_BLOSSOM_IMPACT: Self = Self(4093);
    pub const SPELL_EARTH_MASS_DISTORTION: Self = Self(4100);

    // Mind
    pub const SPELL_MIND_MIND_BLAST: Self = Self(6030);
    pub const SPELL_MIND_CHARM: Self = Self(6060);
    pub const SPELL_MIND_PSYCHIC_SHOCK: Self = Self(6090);

    // Body
    pub const SPELL_BODY_HARM: Self = Self(8010);
    pub const SPELL_BODY_FLYING_FIST: Self = Self(8090);

    // Light
    pub const SPELL_LIGHT_LIGHT_BOLT: Self = Self(9010);
    pub const SPELL_LIGHT_PARALYZE: Self = Self(9030);
    pub const SPELL_LIGHT_DESTROY_UNDEAD: Self = Self(9040);
    pub const SPELL_LIGHT_SUNRAY: Self = Self(9080);

    // Dark
    pub const SPELL_DARK_TOXIC_CLOUD: Self = Self(10010);
    pub const SPELL_DARK_SHRINKING_RAY: Self = Self(10030);
    pub const SPELL_DARK_SHARPMETAL: Self = Self(10040);
    pub const SPELL_DARK_DRAGON_BREATH: Self = Self(10090);
}

impl SpriteType {
    /// The impact visual that follows this type when it hits something.
    #[inline]
    pub const fn impact(self) -> Self {
        Self(self.0 + 1)
    }

    /// True for the four trap burst types.
    pub fn is_trap(self) -> bool {
        matches!(
            self,
            SpriteType::TRAP_FIRE | SpriteType::TRAP_LIGHTNING | SpriteType::TRAP_COLD | SpriteType::TRAP_BODY
        )
    }
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Per-instance attribute bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpriteAttributes(pub u16);

impl SpriteAttributes {
    /// Item drop should not snap to the item table range.
    pub const IGNORE_RANGE: u16 = 1 << 0;
    /// Drawn without depth testing.
    pub const NO_Z_BUFFER: u16 = 1 << 1;
    /// Uses the instance's own lifetime instead of the descriptor's.
    pub const TEMPORARY: u16 = 1 << 2;
    /// Blocks turn-based progression until it resolves.
    pub const HALT_TURN_BASED: u16 = 1 << 3;
    /// Skip the next update.
    pub const SKIP_A_FRAME: u16 = 1 << 4;
    /// Pinned above the target actor's head.
    pub const ATTACHED_TO_HEAD: u16 = 1 << 5;
    /// Dropped by the party.
    pub const DROPPED_BY_PLAYER: u16 = 1 << 6;

    /// Check a bit.
    #[inline]
    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    /// Set a bit.
    #[inline]
    pub fn set(&mut self, bit: u16) {
        self.0 |= bit;
    }

    /// Clear a bit.
    #[inline]
    pub fn clear(&mut self, bit: u16) {
        self.0 &= !bit;
    }
}

// =============================================================================
// SPELL CONTEXT
// =============================================================================

/// Spell identifier carried for sound lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpellId(pub u16);

impl SpellId {
    /// No spell.
    pub const NONE: Self = Self(0);
}

/// Caster skill mastery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SkillMastery {
    /// Unskilled
    #[default]
    None,
    /// Novice
    Novice,
    /// Expert
    Expert,
    /// Master
    Master,
    /// Grandmaster
    Grandmaster,
}

/// Which monster attack produced a sprite; forwarded to area attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackKind {
    /// Primary attack
    #[default]
    Attack1,
    /// Secondary attack
    Attack2,
    /// First spell
    Spell1,
    /// Second spell
    Spell2,
}

// =============================================================================
// ITEMS
// =============================================================================

/// Legacy spellbook id that escalates arrows into explosions.
pub const ITEM_SPELLBOOK_FIREBALL: u16 = 405;

/// Special enchantment on a carried item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialEnchantment {
    /// Arrows explode on impact.
    OfCarnage,
    /// Extra fire damage.
    OfFlame,
    /// Extra cold damage.
    OfFrost,
}

/// Item payload of a sprite (arrows, dropped loot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContainedItem {
    /// Item table id, 0 for none.
    pub item_id: u16,
    /// Optional special enchantment.
    pub special_enchantment: Option<SpecialEnchantment>,
}

impl ContainedItem {
    /// Whether an arrow carrying this item turns into an explosion.
    pub fn escalates_to_explosion(&self) -> bool {
        self.item_id == ITEM_SPELLBOOK_FIREBALL
            || self.special_enchantment == Some(SpecialEnchantment::OfCarnage)
    }
}

// =============================================================================
// SPRITE OBJECT
// =============================================================================

/// One active projectile / effect instance.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpriteObject {
    /// Effect type
    pub sprite_type: SpriteType,
    /// Descriptor table index; 0 means the slot is free
    pub object_desc_id: u16,
    /// World position
    pub position: Vec3i,
    /// Velocity in units per 128 ticks
    pub velocity: Vec3i,
    /// Facing, 2048 units per turn
    pub facing: i32,
    /// Cached sector
    pub sector_id: i32,
    /// Animation cursor and age since spawn
    pub age: i32,
    /// Lifetime override for `TEMPORARY` instances
    pub temp_lifetime: i32,
    /// Attribute bits
    pub attributes: SpriteAttributes,
    /// Who launched it
    pub caster: Pid,
    /// Attachment target
    pub target: Pid,
    /// Spell for sound lookup
    pub spell_id: SpellId,
    /// Spell power level
    pub spell_level: i32,
    /// Caster mastery
    pub spell_mastery: SkillMastery,
    /// Monster attack kind forwarded to area attacks
    pub attack_kind: AttackKind,
    /// Position at spawn
    pub initial_position: Vec3i,
    /// Carried item
    pub item: ContainedItem,
}

impl SpriteObject {
    /// A blank instance of `sprite_type` at `position`. The descriptor id is
    /// filled in by the caller from the descriptor table.
    pub fn template(sprite_type: SpriteType, position: Vec3i) -> Self {
        Self {
            sprite_type,
            position,
            initial_position: position,
            ..Self::default()
        }
    }

    /// True when the slot is free.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.object_desc_id == 0
    }

    /// True when pinned to an actor.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attributes.has(SpriteAttributes::ATTACHED_TO_HEAD)
    }

    /// Halt in place and restart the animation clock.
    #[inline]
    pub fn stop(&mut self) {
        self.velocity = Vec3i::ZERO;
        self.age = 0;
    }
}
