//! The player party: one shared body cylinder and the members inside it.

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3i;

/// One party member, as far as traps care.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    /// Name for logs
    pub name: String,
    /// Effective perception skill
    pub perception: i32,
    /// Conscious and free to react
    pub can_act: bool,
}

impl PartyMember {
    /// Conscious member with the given perception.
    pub fn new(name: &str, perception: i32) -> Self {
        Self {
            name: name.to_string(),
            perception,
            can_act: true,
        }
    }
}

/// The party body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Feet position
    pub position: Vec3i,
    /// Eye height above the feet
    pub eye_level: i32,
    /// Body radius
    pub radius: i32,
    /// Body height
    pub height: i32,
    /// Members, in portrait order
    pub members: Vec<PartyMember>,
}

impl Default for Party {
    fn default() -> Self {
        Self {
            position: Vec3i::ZERO,
            eye_level: 160,
            radius: 37,
            height: 192,
            members: vec![
                PartyMember::new("Zoltan", 0),
                PartyMember::new("Roderick", 2),
                PartyMember::new("Serena", 0),
                PartyMember::new("Alexis", 4),
            ],
        }
    }
}

impl Party {
    /// Party standing at `position` with the default roster.
    pub fn at(position: Vec3i) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}
