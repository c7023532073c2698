//! Level Geometry
//!
//! The simulation never owns map data. It asks a `LevelGeometry` for floor
//! heights, faces and decorations, and lets it run the face/decoration
//! sweeps against the shared `CollisionState`.
//!
//! `BoxLevel` is a small self-contained implementation: a flat floor,
//! optional walls and ceiling, cylindrical decorations, a water patch, a
//! building-model patch and a steep-slope patch. It is enough to drive
//! every integrator branch in tests and in the demo binary.

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::core::fixed::FIXED_ONE;
use crate::core::vec3::Vec3i;
use crate::game::collision::{sweep_cylinder, sweep_face, CollisionState};
use crate::game::pid::{ObjectKind, Pid};

/// Floor value meaning "outside the playable map".
pub const NO_FLOOR: i32 = -30000;

/// Indoor (sector/BSP) or outdoor (terrain) level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelType {
    /// Dungeon or building interior
    Indoor,
    /// Open terrain
    Outdoor,
}

/// Polygon classification of a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolygonType {
    /// Walkable floor
    Floor,
    /// Sloped, between floor and wall
    InBetweenFloorAndWall,
    /// Wall
    VerticalWall,
    /// Ceiling
    Ceiling,
}

/// A collidable planar face.
///
/// Plane: `normal · p / 65536 == distance`, normal pointing into open space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    /// Polygon class
    pub polygon: PolygonType,
    /// Unit normal, Q16.16
    pub normal: Vec3i,
    /// Plane distance in world units
    pub distance: i32,
    /// Bounding box min
    pub min: Vec3i,
    /// Bounding box max
    pub max: Vec3i,
    /// Scripted event fired when a sprite bounces off it, 0 for none
    pub event_id: u16,
}

impl Face {
    /// True for walkable floor polygons.
    #[inline]
    pub fn is_floor(&self) -> bool {
        self.polygon == PolygonType::Floor
    }
}

/// Outdoor floor query result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorQuery {
    /// Floor height
    pub level: i32,
    /// Over a water tile
    pub on_water: bool,
    /// Standing on a building model rather than terrain
    pub over_model: bool,
}

/// Indoor floor query result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndoorFloor {
    /// Floor height, `NO_FLOOR` outside the map
    pub z: i32,
    /// Sector containing the point
    pub sector: i32,
    /// Floor face under the point
    pub face: Option<u32>,
}

/// Read-only map collaborator.
pub trait LevelGeometry: fmt::Debug + Send + Sync {
    /// Indoor or outdoor.
    fn level_type(&self) -> LevelType;

    /// Outdoor floor at a point.
    fn outdoor_floor(&self, position: Vec3i) -> FloorQuery;

    /// Indoor floor below a point.
    fn indoor_floor(&self, position: Vec3i, sector: i32) -> IndoorFloor;

    /// Outdoor terrain too steep to rest on.
    fn is_steep_slope(&self, x: i32, y: i32) -> bool;

    /// Outdoor terrain normal, Q16.16.
    fn terrain_normal(&self, x: i32, y: i32) -> Vec3i;

    /// Face by packed id.
    fn face(&self, pid: Pid) -> Option<Face>;

    /// Decoration base position by packed id.
    fn decoration_position(&self, pid: Pid) -> Option<Vec3i>;

    /// Sweep against every face except `cs.ignored_face`.
    fn collide_with_faces(&self, cs: &mut CollisionState);

    /// Sweep against every decoration.
    fn collide_with_decorations(&self, cs: &mut CollisionState);

    /// Move the probe across sector portals. Returns true once no portal
    /// is crossed.
    fn collide_with_portals(&self, _cs: &mut CollisionState) -> bool {
        true
    }

    /// Sector containing a point.
    fn sector_at(&self, position: Vec3i) -> i32;
}

// =============================================================================
// BOX LEVEL
// =============================================================================

/// Axis-aligned rectangle on the XY plane, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Min x
    pub min_x: i32,
    /// Min y
    pub min_y: i32,
    /// Max x
    pub max_x: i32,
    /// Max y
    pub max_y: i32,
}

impl Rect {
    /// Rectangle from corners.
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Point containment.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A cylindrical decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    /// Base position
    pub position: Vec3i,
    /// Radius
    pub radius: i32,
    /// Height
    pub height: i32,
}

/// Steep terrain patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlopePatch {
    /// Area covered
    pub area: Rect,
    /// Terrain normal, Q16.16
    pub normal: Vec3i,
}

/// Flat reference level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxLevel {
    level_type: LevelType,
    floor_z: i32,
    half_extent: i32,
    faces: Vec<Face>,
    decorations: Vec<Decoration>,
    water: Option<Rect>,
    model_area: Option<Rect>,
    slope: Option<SlopePatch>,
}

impl BoxLevel {
    /// Open terrain with a flat floor at `floor_z`.
    pub fn outdoor(half_extent: i32, floor_z: i32) -> Self {
        Self {
            level_type: LevelType::Outdoor,
            floor_z,
            half_extent,
            faces: Vec::new(),
            decorations: Vec::new(),
            water: None,
            model_area: None,
            slope: None,
        }
    }

    /// Closed square room. Face 0 is the floor, 1..=4 the walls, 5 the
    /// ceiling.
    pub fn indoor_room(half_extent: i32, floor_z: i32, ceiling_z: i32) -> Self {
        let h = half_extent;
        let lo = Vec3i::new(-h, -h, floor_z);
        let hi = Vec3i::new(h, h, ceiling_z);
        let face = |polygon, normal: Vec3i, distance, min, max| Face {
            polygon,
            normal,
            distance,
            min,
            max,
            event_id: 0,
        };
        let faces = vec![
            face(PolygonType::Floor, Vec3i::new(0, 0, FIXED_ONE), floor_z, lo, Vec3i::new(h, h, floor_z)),
            face(PolygonType::VerticalWall, Vec3i::new(-FIXED_ONE, 0, 0), -h, Vec3i::new(h, -h, floor_z), hi),
            face(PolygonType::VerticalWall, Vec3i::new(FIXED_ONE, 0, 0), -h, lo, Vec3i::new(-h, h, ceiling_z)),
            face(PolygonType::VerticalWall, Vec3i::new(0, -FIXED_ONE, 0), -h, Vec3i::new(-h, h, floor_z), hi),
            face(PolygonType::VerticalWall, Vec3i::new(0, FIXED_ONE, 0), -h, lo, Vec3i::new(h, -h, ceiling_z)),
            face(PolygonType::Ceiling, Vec3i::new(0, 0, -FIXED_ONE), -ceiling_z, Vec3i::new(-h, -h, ceiling_z), hi),
        ];
        Self {
            level_type: LevelType::Indoor,
            floor_z,
            half_extent,
            faces,
            decorations: Vec::new(),
            water: None,
            model_area: None,
            slope: None,
        }
    }

    /// Add a face. Returns its id.
    pub fn add_face(&mut self, face: Face) -> u32 {
        self.faces.push(face);
        (self.faces.len() - 1) as u32
    }

    /// Add a decoration. Returns its index.
    pub fn add_decoration(&mut self, decoration: Decoration) -> usize {
        self.decorations.push(decoration);
        self.decorations.len() - 1
    }

    /// Mark an area as water.
    pub fn with_water(mut self, area: Rect) -> Self {
        self.water = Some(area);
        self
    }

    /// Mark an area as covered by a building model.
    pub fn with_model_area(mut self, area: Rect) -> Self {
        self.model_area = Some(area);
        self
    }

    /// Add a steep terrain patch.
    pub fn with_slope(mut self, slope: SlopePatch) -> Self {
        self.slope = Some(slope);
        self
    }

    /// Set the scripted event of a face.
    pub fn set_face_event(&mut self, face: u32, event_id: u16) {
        if let Some(f) = self.faces.get_mut(face as usize) {
            f.event_id = event_id;
        }
    }

    fn inside(&self, x: i32, y: i32) -> bool {
        x.abs() <= self.half_extent && y.abs() <= self.half_extent
    }
}

impl LevelGeometry for BoxLevel {
    fn level_type(&self) -> LevelType {
        self.level_type
    }

    fn outdoor_floor(&self, position: Vec3i) -> FloorQuery {
        FloorQuery {
            level: self.floor_z,
            on_water: self.water.is_some_and(|w| w.contains(position.x, position.y)),
            over_model: self.model_area.is_some_and(|m| m.contains(position.x, position.y)),
        }
    }

    fn indoor_floor(&self, position: Vec3i, _sector: i32) -> IndoorFloor {
        if !self.inside(position.x, position.y) {
            return IndoorFloor { z: NO_FLOOR, sector: 0, face: None };
        }
        IndoorFloor { z: self.floor_z, sector: 1, face: Some(0) }
    }

    fn is_steep_slope(&self, x: i32, y: i32) -> bool {
        self.slope.is_some_and(|s| s.area.contains(x, y))
    }

    fn terrain_normal(&self, x: i32, y: i32) -> Vec3i {
        match self.slope {
            Some(s) if s.area.contains(x, y) => s.normal,
            _ => Vec3i::new(0, 0, FIXED_ONE),
        }
    }

    fn face(&self, pid: Pid) -> Option<Face> {
        if pid.kind() != ObjectKind::Face {
            return None;
        }
        self.faces.get(pid.index()).copied()
    }

    fn decoration_position(&self, pid: Pid) -> Option<Vec3i> {
        if pid.kind() != ObjectKind::Decoration {
            return None;
        }
        self.decorations.get(pid.index()).map(|d| d.position)
    }

    fn collide_with_faces(&self, cs: &mut CollisionState) {
        for (i, face) in self.faces.iter().enumerate() {
            if cs.ignored_face == Some(i as u32) {
                continue;
            }
            sweep_face(cs, face, Pid::face(i as u32));
        }
    }

    fn collide_with_decorations(&self, cs: &mut CollisionState) {
        for (i, d) in self.decorations.iter().enumerate() {
            sweep_cylinder(cs, d.position, d.radius, d.height, Pid::decoration(i));
        }
    }

    fn sector_at(&self, position: Vec3i) -> i32 {
        match self.level_type {
            LevelType::Indoor if self.inside(position.x, position.y) => 1,
            _ => 0,
        }
    }
}
