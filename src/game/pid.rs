//! Packed Object Ids
//!
//! One integer encodes both what kind of thing was hit and its index:
//!
//! ```text
//! ┌──────────────────────────────┬─────┐
//! │ index (29 bits)              │kind │
//! └──────────────────────────────┴─────┘
//! ```

use std::fmt;
use serde::{Deserialize, Serialize};

/// Kind of entity a `Pid` refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    /// Nothing
    None = 0,
    /// Door / moving geometry
    Door = 1,
    /// Sprite object slot
    Item = 2,
    /// Monster or NPC
    Actor = 3,
    /// Party member
    Player = 4,
    /// Level decoration
    Decoration = 5,
    /// Level face (indoor polygon or outdoor model face)
    Face = 6,
    /// Light source
    Light = 7,
}

impl ObjectKind {
    fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            1 => ObjectKind::Door,
            2 => ObjectKind::Item,
            3 => ObjectKind::Actor,
            4 => ObjectKind::Player,
            5 => ObjectKind::Decoration,
            6 => ObjectKind::Face,
            7 => ObjectKind::Light,
            _ => ObjectKind::None,
        }
    }
}

/// Packed kind + index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    /// The empty id.
    pub const NONE: Self = Self(0);

    /// Pack a kind and index.
    #[inline]
    pub const fn new(kind: ObjectKind, id: u32) -> Self {
        Self((id << 3) | kind as u32)
    }

    /// Sprite object slot id.
    #[inline]
    pub const fn item(slot: usize) -> Self {
        Self::new(ObjectKind::Item, slot as u32)
    }

    /// Actor id.
    #[inline]
    pub const fn actor(index: usize) -> Self {
        Self::new(ObjectKind::Actor, index as u32)
    }

    /// Party member id.
    #[inline]
    pub const fn player(member: usize) -> Self {
        Self::new(ObjectKind::Player, member as u32)
    }

    /// Decoration id.
    #[inline]
    pub const fn decoration(index: usize) -> Self {
        Self::new(ObjectKind::Decoration, index as u32)
    }

    /// Face id.
    #[inline]
    pub const fn face(index: u32) -> Self {
        Self::new(ObjectKind::Face, index)
    }

    /// Entity kind.
    #[inline]
    pub fn kind(self) -> ObjectKind {
        ObjectKind::from_bits(self.0)
    }

    /// Entity index.
    #[inline]
    pub fn id(self) -> u32 {
        self.0 >> 3
    }

    /// Entity index as a `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.id() as usize
    }

    /// True for the empty id.
    #[inline]
    pub fn is_none(self) -> bool {
        self.kind() == ObjectKind::None
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({:?}, {})", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let pid = Pid::actor(42);
        assert_eq!(pid.kind(), ObjectKind::Actor);
        assert_eq!(pid.id(), 42);
        assert_eq!(pid.0, (42 << 3) | 3);

        assert_eq!(Pid::item(7).kind(), ObjectKind::Item);
        assert_eq!(Pid::face(1000).id(), 1000);
    }

    #[test]
    fn test_none() {
        assert!(Pid::NONE.is_none());
        assert!(Pid::default().is_none());
        assert!(!Pid::player(0).is_none());
        assert_eq!(Pid::player(0).kind(), ObjectKind::Player);
    }
}
