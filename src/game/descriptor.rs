//! Object Descriptor Table
//!
//! Static per-type metadata: behavior flags, collision radius, lifetime and
//! trail color. Entry 0 is reserved so that a descriptor id of zero can mark
//! a free registry slot.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::game::sprite::SpriteType;

/// Errors raised while loading a descriptor table.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Malformed JSON
    #[error("descriptor table parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two entries describe the same sprite type
    #[error("duplicate descriptor for sprite type {0}")]
    DuplicateObject(u16),

    /// An entry other than the reserved first one uses sprite type 0
    #[error("descriptor entry {0} uses the null sprite type")]
    NullObject(usize),
}

/// Behavior flags of a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectDescFlags(pub u16);

impl ObjectDescFlags {
    /// Has no visible sprite.
    pub const NO_SPRITE: u16 = 1 << 0;
    /// Not pulled down by gravity.
    pub const NO_GRAVITY: u16 = 1 << 1;
    /// Expires after `lifetime` ticks.
    pub const TEMPORARY: u16 = 1 << 2;
    /// Bounces off floors.
    pub const BOUNCE: u16 = 1 << 3;
    /// Collisions go through the impact resolver.
    pub const INTERACTABLE: u16 = 1 << 4;
    /// Leaves fire trail particles.
    pub const TRAIL_FIRE: u16 = 1 << 5;
    /// Leaves line trail particles.
    pub const TRAIL_LINE: u16 = 1 << 6;
    /// Leaves plain trail particles.
    pub const TRAIL_PARTICLE: u16 = 1 << 7;
    /// Cannot be picked up; transient visual.
    pub const UNPICKABLE: u16 = 1 << 8;

    /// Check a flag.
    #[inline]
    pub fn has(self, flag: u16) -> bool {
        self.0 & flag != 0
    }
}

/// Descriptor of one sprite type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDesc {
    /// Sprite type this entry describes
    pub object_id: SpriteType,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Collision radius
    #[serde(default)]
    pub radius: i32,
    /// Collision height
    #[serde(default)]
    pub height: i32,
    /// Lifetime in ticks for temporary objects
    #[serde(default)]
    pub lifetime: i32,
    /// Behavior flags
    #[serde(default)]
    pub flags: ObjectDescFlags,
    /// Trail particle color
    #[serde(default)]
    pub particle_rgb: [u8; 3],
}

/// The physical part of a descriptor, cheap to copy out of the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DescProps {
    /// Behavior flags
    pub flags: ObjectDescFlags,
    /// Collision radius
    pub radius: i32,
    /// Collision height
    pub height: i32,
    /// Lifetime in ticks
    pub lifetime: i32,
    /// Trail particle color
    pub particle_rgb: [u8; 3],
}

impl DescProps {
    /// Check a flag.
    #[inline]
    pub fn has(&self, flag: u16) -> bool {
        self.flags.has(flag)
    }
}

impl ObjectDesc {
    /// Check a flag.
    #[inline]
    pub fn has(&self, flag: u16) -> bool {
        self.flags.has(flag)
    }

    /// Copy of the physical properties.
    #[inline]
    pub fn props(&self) -> DescProps {
        DescProps {
            flags: self.flags,
            radius: self.radius,
            height: self.height,
            lifetime: self.lifetime,
            particle_rgb: self.particle_rgb,
        }
    }

    fn null() -> Self {
        Self {
            object_id: SpriteType::NULL,
            name: "null".to_string(),
            radius: 0,
            height: 0,
            lifetime: 0,
            flags: ObjectDescFlags(ObjectDescFlags::NO_SPRITE),
            particle_rgb: [0; 3],
        }
    }
}

/// Descriptor table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectList {
    descs: Vec<ObjectDesc>,
}

impl ObjectList {
    /// Build a table from entries. A null entry is prepended at index 0.
    pub fn from_descs(entries: Vec<ObjectDesc>) -> Result<Self, DescriptorError> {
        let mut seen = std::collections::BTreeSet::new();
        for (i, desc) in entries.iter().enumerate() {
            if desc.object_id == SpriteType::NULL {
                return Err(DescriptorError::NullObject(i));
            }
            if !seen.insert(desc.object_id) {
                return Err(DescriptorError::DuplicateObject(desc.object_id.0));
            }
        }

        let mut descs = Vec::with_capacity(entries.len() + 1);
        descs.push(ObjectDesc::null());
        descs.extend(entries);
        debug!(entries = descs.len() - 1, "descriptor table loaded");
        Ok(Self { descs })
    }

    /// Parse a JSON array of descriptors.
    pub fn from_json_str(json: &str) -> Result<Self, DescriptorError> {
        let entries: Vec<ObjectDesc> = serde_json::from_str(json)?;
        Self::from_descs(entries)
    }

    /// Descriptor id for a sprite type, 0 if none.
    pub fn object_desc_id(&self, kind: SpriteType) -> u16 {
        if kind == SpriteType::NULL {
            return 0;
        }
        self.descs
            .iter()
            .position(|d| d.object_id == kind)
            .map_or(0, |i| i as u16)
    }

    /// Descriptor by id. Id 0 and out-of-range ids return `None`.
    pub fn get(&self, id: u16) -> Option<&ObjectDesc> {
        if id == 0 {
            return None;
        }
        self.descs.get(id as usize)
    }

    /// Number of real entries.
    pub fn len(&self) -> usize {
        self.descs.len() - 1
    }

    /// True when only the null entry exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Built-in table covering every sprite type the simulation knows.
    pub fn standard() -> Self {
        use ObjectDescFlags as F;

        const MISSILE: u16 = F::INTERACTABLE | F::NO_GRAVITY | F::TEMPORARY;
        const LOBBED: u16 = F::INTERACTABLE | F::TEMPORARY;
        const VISUAL: u16 = F::TEMPORARY | F::UNPICKABLE | F::NO_GRAVITY;

        let launched: &[(SpriteType, &str, u16, [u8; 3])] = &[
            (SpriteType::PROJECTILE_FIREBOLT, "firebolt", MISSILE | F::TRAIL_FIRE, [255, 96, 0]),
            (SpriteType::PROJECTILE_AIRBOLT, "airbolt", MISSILE, [192, 192, 255]),
            (SpriteType::PROJECTILE_WATERBOLT, "waterbolt", MISSILE, [0, 96, 255]),
            (SpriteType::PROJECTILE_EARTHBOLT, "earthbolt", MISSILE, [128, 96, 32]),
            (SpriteType::PROJECTILE_520, "mindbolt", MISSILE, [160, 0, 160]),
            (SpriteType::PROJECTILE_525, "bodybolt", MISSILE, [0, 160, 0]),
            (SpriteType::PROJECTILE_530, "spiritbolt", MISSILE, [160, 160, 0]),
            (SpriteType::PROJECTILE_LIGHTBOLT, "lightbolt", MISSILE | F::TRAIL_LINE, [255, 255, 192]),
            (SpriteType::PROJECTILE_DARKBOLT, "darkbolt", MISSILE, [64, 0, 64]),
            (SpriteType::ARROW_PROJECTILE, "arrow", LOBBED, [0, 0, 0]),
            (SpriteType::PROJECTILE_EXPLOSIVE, "explosive", LOBBED | F::TRAIL_PARTICLE, [255, 160, 0]),
            (SpriteType::BLASTER_PROJECTILE, "blaster", MISSILE | F::TRAIL_LINE, [255, 0, 0]),
            (SpriteType::OBJECT_EXPLODE, "explode", MISSILE | F::TRAIL_PARTICLE, [255, 128, 0]),
            (SpriteType::SPELL_FIRE_FIRE_BOLT, "fire bolt", MISSILE | F::TRAIL_FIRE, [255, 96, 0]),
            (SpriteType::SPELL_FIRE_FIREBALL, "fireball", MISSILE | F::TRAIL_FIRE | F::TRAIL_PARTICLE, [255, 64, 0]),
            (SpriteType::SPELL_FIRE_FIRE_SPIKE, "fire spike", F::INTERACTABLE | F::BOUNCE, [255, 32, 0]),
            (SpriteType::SPELL_FIRE_METEOR_SHOWER, "meteor", LOBBED | F::TRAIL_FIRE | F::TRAIL_PARTICLE, [255, 64, 0]),
            (SpriteType::SPELL_FIRE_INCINERATE, "incinerate", MISSILE | F::TRAIL_FIRE, [255, 0, 0]),
            (SpriteType::SPELL_AIR_SPARKS, "sparks", MISSILE | F::BOUNCE, [160, 160, 255]),
            (SpriteType::SPELL_AIR_LIGHTNING_BOLT, "lightning bolt", MISSILE | F::TRAIL_LINE, [224, 224, 255]),
            (SpriteType::SPELL_AIR_STARBURST, "starburst", LOBBED | F::TRAIL_PARTICLE, [255, 255, 255]),
            (SpriteType::SPELL_WATER_POISON_SPRAY, "poison spray", MISSILE, [0, 192, 0]),
            (SpriteType::SPELL_WATER_ICE_BOLT, "ice bolt", MISSILE, [128, 192, 255]),
            (SpriteType::SPELL_WATER_ACID_BURST, "acid burst", MISSILE, [96, 255, 0]),
            (SpriteType::SPELL_WATER_ICE_BLAST, "ice blast", MISSILE, [160, 224, 255]),
            (SpriteType::SPELL_WATER_ICE_BLAST_FALLOUT, "ice shard", MISSILE, [160, 224, 255]),
            (SpriteType::SPELL_EARTH_STUN, "stun", MISSILE, [160, 128, 64]),
            (SpriteType::SPELL_EARTH_DEADLY_SWARM, "deadly swarm", MISSILE, [96, 96, 0]),
            (SpriteType::SPELL_EARTH_BLADES, "blades", MISSILE, [192, 192, 192]),
            (SpriteType::SPELL_EARTH_ROCK_BLAST, "rock blast", LOBBED | F::BOUNCE, [128, 96, 64]),
            (SpriteType::SPELL_EARTH_DEATH_BLOSSOM, "death blossom", LOBBED, [192, 96, 32]),
            (SpriteType::SPELL_EARTH_DEATH_BLOSSOM_FALLOUT, "blossom shard", LOBBED, [192, 96, 32]),
            (SpriteType::SPELL_EARTH_MASS_DISTORTION, "mass distortion", MISSILE | F::NO_SPRITE, [64, 32, 0]),
            (SpriteType::SPELL_MIND_MIND_BLAST, "mind blast", MISSILE, [192, 0, 192]),
            (SpriteType::SPELL_MIND_CHARM, "charm", MISSILE, [255, 128, 255]),
            (SpriteType::SPELL_MIND_PSYCHIC_SHOCK, "psychic shock", MISSILE, [224, 0, 224]),
            (SpriteType::SPELL_BODY_HARM, "harm", MISSILE, [0, 255, 64]),
            (SpriteType::SPELL_BODY_FLYING_FIST, "flying fist", MISSILE, [0, 192, 64]),
            (SpriteType::SPELL_LIGHT_LIGHT_BOLT, "light bolt", MISSILE | F::TRAIL_LINE, [255, 255, 224]),
            (SpriteType::SPELL_LIGHT_PARALYZE, "paralyze", MISSILE, [255, 255, 128]),
            (SpriteType::SPELL_LIGHT_DESTROY_UNDEAD, "destroy undead", MISSILE, [255, 255, 255]),
            (SpriteType::SPELL_LIGHT_SUNRAY, "sunray", MISSILE | F::TRAIL_LINE, [255, 224, 96]),
            (SpriteType::SPELL_DARK_TOXIC_CLOUD, "toxic cloud", MISSILE, [32, 96, 0]),
            (SpriteType::SPELL_DARK_SHRINKING_RAY, "shrinking ray", MISSILE, [96, 0, 96]),
            (SpriteType::SPELL_DARK_SHARPMETAL, "sharpmetal", MISSILE, [128, 128, 160]),
            (SpriteType::SPELL_DARK_DRAGON_BREATH, "dragon breath", MISSILE | F::TRAIL_FIRE | F::TRAIL_PARTICLE, [96, 0, 32]),
        ];

        let mut entries = Vec::with_capacity(launched.len() * 2 + 6);
        for &(kind, name, flags, rgb) in launched {
            entries.push(ObjectDesc {
                object_id: kind,
                name: name.to_string(),
                radius: 16,
                height: 32,
                lifetime: if kind == SpriteType::OBJECT_EXPLODE { 16 } else { 1024 },
                flags: ObjectDescFlags(flags),
                particle_rgb: rgb,
            });
            entries.push(ObjectDesc {
                object_id: kind.impact(),
                name: format!("{} impact", name),
                radius: 16,
                height: 32,
                lifetime: 128,
                flags: ObjectDescFlags(VISUAL),
                particle_rgb: rgb,
            });
        }

        entries.push(ObjectDesc {
            object_id: SpriteType::DROPPED_ITEM,
            name: "dropped item".to_string(),
            radius: 16,
            height: 16,
            lifetime: 0,
            flags: ObjectDescFlags(F::BOUNCE),
            particle_rgb: [0; 3],
        });
        entries.push(ObjectDesc {
            object_id: SpriteType::WATER_SPLASH,
            name: "splash".to_string(),
            radius: 0,
            height: 0,
            lifetime: 64,
            flags: ObjectDescFlags(F::TEMPORARY | F::NO_GRAVITY),
            particle_rgb: [0; 3],
        });
        for kind in [SpriteType::TRAP_FIRE, SpriteType::TRAP_LIGHTNING, SpriteType::TRAP_COLD, SpriteType::TRAP_BODY] {
            entries.push(ObjectDesc {
                object_id: kind,
                name: "trap burst".to_string(),
                radius: 0,
                height: 0,
                lifetime: 128,
                flags: ObjectDescFlags(VISUAL),
                particle_rgb: [255, 255, 255],
            });
        }

        let mut descs = Vec::with_capacity(entries.len() + 1);
        descs.push(ObjectDesc::null());
        descs.extend(entries);
        Self { descs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_lookup() {
        let list = ObjectList::standard();
        let id = list.object_desc_id(SpriteType::SPELL_FIRE_FIREBALL);
        assert_ne!(id, 0);
        let desc = list.get(id).unwrap();
        assert_eq!(desc.object_id, SpriteType::SPELL_FIRE_FIREBALL);
        assert!(desc.has(ObjectDescFlags::INTERACTABLE));
        assert!(desc.has(ObjectDescFlags::TRAIL_PARTICLE));

        let impact = list.object_desc_id(SpriteType::SPELL_FIRE_FIREBALL.impact());
        assert!(list.get(impact).unwrap().has(ObjectDescFlags::UNPICKABLE));
    }

    #[test]
    fn test_standard_table_is_unique() {
        let list = ObjectList::standard();
        let entries: Vec<ObjectDesc> = list.descs[1..].to_vec();
        assert!(ObjectList::from_descs(entries).is_ok());
    }

    #[test]
    fn test_unknown_type_is_zero() {
        let list = ObjectList::standard();
        assert_eq!(list.object_desc_id(SpriteType(9999)), 0);
        assert_eq!(list.object_desc_id(SpriteType::NULL), 0);
        assert!(list.get(0).is_none());
        assert!(list.get(u16::MAX).is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"object_id": 500, "name": "bolt", "radius": 8, "flags": 18},
            {"object_id": 501, "lifetime": 64, "flags": 4}
        ]"#;
        let list = ObjectList::from_json_str(json).unwrap();
        assert_eq!(list.len(), 2);
        let bolt = list.get(list.object_desc_id(SpriteType(500))).unwrap();
        assert_eq!(bolt.radius, 8);
        assert!(bolt.has(ObjectDescFlags::INTERACTABLE));
        assert!(bolt.has(ObjectDescFlags::NO_GRAVITY));
        let impact = list.get(list.object_desc_id(SpriteType(501))).unwrap();
        assert_eq!(impact.lifetime, 64);
        assert!(impact.has(ObjectDescFlags::TEMPORARY));
    }

    #[test]
    fn test_json_rejects_duplicates() {
        let json = r#"[{"object_id": 500}, {"object_id": 500}]"#;
        assert!(matches!(
            ObjectList::from_json_str(json),
            Err(DescriptorError::DuplicateObject(500))
        ));
    }

    #[test]
    fn test_json_rejects_null_entry() {
        let json = r#"[{"object_id": 500}, {"object_id": 0}]"#;
        assert!(matches!(ObjectList::from_json_str(json), Err(DescriptorError::NullObject(1))));
        assert!(matches!(ObjectList::from_json_str("{"), Err(DescriptorError::Json(_))));
    }
}
