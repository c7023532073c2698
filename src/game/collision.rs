//! Collision State and Narrow-Phase Sweeps
//!
//! One `CollisionState` is reused for every object in a tick. For each
//! collision iteration the integrator loads the object's probe spheres and
//! velocity, calls `prepare_and_check_if_stationary`, lets every geometry
//! source sweep against it, then reads back how far the object may move.
//!
//! ```text
//!   position_lo ●────────────────────────▶ new_position_lo
//!               │◀── adjusted_move ──▶│
//!               │◀────────── move_distance ──────────▶│
//! ```
//!
//! Distances are integer world units; `direction` is a Q16.16 unit vector.
//! Sweeps only ever shorten `adjusted_move_distance`, so the nearest hit
//! wins regardless of query order.

use crate::core::fixed::{fixpoint_mul, isqrt_u128, saturate_i32, Fixed, FIXED_SCALE};
use crate::core::vec3::Vec3i;
use crate::game::actor::Actor;
use crate::game::level::Face;
use crate::game::party::Party;
use crate::game::pid::Pid;

/// Iteration context shared by all sweeps for one collision step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionState {
    /// Whether the upper probe sphere is swept too
    pub check_hi: bool,
    /// Lower probe radius
    pub radius_lo: i32,
    /// Upper probe radius
    pub radius_hi: i32,
    /// Lower probe center
    pub position_lo: Vec3i,
    /// Upper probe center
    pub position_hi: Vec3i,
    /// Lower probe center after the full move
    pub new_position_lo: Vec3i,
    /// Upper probe center after the full move
    pub new_position_hi: Vec3i,
    /// Velocity being swept
    pub velocity: Vec3i,
    /// Unit direction of `velocity`, Q16.16
    pub direction: Vec3i,
    /// Length of `velocity`
    pub speed: i32,
    /// Distance still to cover this tick
    pub move_distance: i32,
    /// Distance to the nearest hit so far
    pub adjusted_move_distance: i32,
    /// Distance covered by earlier iterations this tick
    pub total_move_distance: i32,
    /// Sector of the probe
    pub sector_id: i32,
    /// What was hit, `Pid::NONE` if nothing
    pub pid: Pid,
    /// Face to skip, usually the one just bounced off
    pub ignored_face: Option<u32>,
}

impl CollisionState {
    /// Reset for a new object.
    pub fn begin(&mut self, radius: i32) {
        *self = Self {
            radius_lo: radius,
            radius_hi: radius,
            ..Self::default()
        };
    }

    /// Load the object's probe position and velocity for one iteration.
    pub fn load(&mut self, position: Vec3i, velocity: Vec3i, sector_id: i32) {
        let center = position + Vec3i::new(0, 0, self.radius_lo + 1);
        self.position_lo = center;
        self.position_hi = center;
        self.velocity = velocity;
        self.sector_id = sector_id;
    }

    /// Compute direction and remaining distance for `dt` (Q16.16 seconds).
    ///
    /// Returns true when there is nothing left to move.
    pub fn prepare_and_check_if_stationary(&mut self, dt: Fixed) -> bool {
        self.speed = self.velocity.length();
        if self.speed == 0 {
            return true;
        }

        let speed = self.speed as i64;
        let unit = |c: i32| saturate_i32(((c as i64) << FIXED_SCALE) / speed);
        self.direction = Vec3i::new(unit(self.velocity.x), unit(self.velocity.y), unit(self.velocity.z));

        self.move_distance = fixpoint_mul(dt, self.speed) - self.total_move_distance;
        if self.move_distance <= 0 {
            return true;
        }

        let step = self.step(self.move_distance);
        self.new_position_lo = self.position_lo + step;
        self.new_position_hi = self.position_hi + step;
        self.adjusted_move_distance = self.move_distance;
        self.pid = Pid::NONE;
        false
    }

    /// Displacement along `direction` for `distance` units.
    #[inline]
    pub fn step(&self, distance: i32) -> Vec3i {
        Vec3i::new(
            fixpoint_mul(self.direction.x, distance),
            fixpoint_mul(self.direction.y, distance),
            fixpoint_mul(self.direction.z, distance),
        )
    }

    /// Displacement allowed by the nearest hit.
    #[inline]
    pub fn allowed_step(&self) -> Vec3i {
        self.step(self.adjusted_move_distance)
    }

    /// True when nothing blocked the full move.
    #[inline]
    pub fn fully_moved(&self) -> bool {
        self.adjusted_move_distance >= self.move_distance
    }

    /// Record a hit at `distance` if it is the nearest so far.
    pub fn record_hit(&mut self, distance: i32, pid: Pid) -> bool {
        let distance = distance.max(0);
        if distance < self.adjusted_move_distance {
            self.adjusted_move_distance = distance;
            self.pid = pid;
            true
        } else {
            false
        }
    }
}

// =============================================================================
// SWEEPS
// =============================================================================

/// Sweep the lower probe sphere against a vertical cylinder standing at
/// `base`.
pub fn sweep_cylinder(cs: &mut CollisionState, base: Vec3i, radius: i32, height: i32, pid: Pid) -> bool {
    let reach = (radius + cs.radius_lo) as i128;
    let px = (cs.position_lo.x as i128) - base.x as i128;
    let py = (cs.position_lo.y as i128) - base.y as i128;
    let dx = cs.direction.x as i128;
    let dy = cs.direction.y as i128;

    let a = dx * dx + dy * dy;
    if a == 0 {
        return false;
    }
    let b = px * dx + py * dy;
    if b >= 0 {
        return false;
    }
    let c = px * px + py * py - reach * reach;

    // |p + t·d/65536|² = reach², t in world units
    let distance = if c <= 0 {
        0
    } else {
        let disc = b * b - a * c;
        if disc < 0 {
            return false;
        }
        let root = isqrt_u128(disc as u128) as i128;
        (((-b - root) << FIXED_SCALE) / a).min(i32::MAX as i128) as i32
    };
    if distance >= cs.adjusted_move_distance {
        return false;
    }

    let z = cs.position_lo.z + fixpoint_mul(cs.direction.z, distance);
    if z + cs.radius_lo < base.z || z - cs.radius_lo > base.z + height {
        return false;
    }
    cs.record_hit(distance, pid)
}

/// Sweep the lower probe sphere against the plane of `face`, accepting the
/// hit only where the contact lies inside the face's bounding box.
pub fn sweep_face(cs: &mut CollisionState, face: &Face, pid: Pid) -> bool {
    let n = face.normal;
    let center = n.dot(cs.position_lo) - ((face.distance as i64) << FIXED_SCALE);
    if center < 0 {
        return false;
    }
    let approach = n.dot(cs.direction);
    if approach >= 0 {
        return false;
    }

    let gap = center - ((cs.radius_lo as i64) << FIXED_SCALE);
    let distance = if gap <= 0 {
        0
    } else {
        saturate_i32((gap << FIXED_SCALE) / -approach)
    };
    if distance >= cs.adjusted_move_distance {
        return false;
    }

    let contact = cs.position_lo + cs.step(distance);
    let r = cs.radius_lo;
    let inside = contact.x >= face.min.x - r
        && contact.x <= face.max.x + r
        && contact.y >= face.min.y - r
        && contact.y <= face.max.y + r
        && contact.z >= face.min.z - r
        && contact.z <= face.max.z + r;
    if !inside {
        return false;
    }
    cs.record_hit(distance, pid)
}

/// Sweep against one actor. A non-zero `radius_override` replaces the
/// actor's own body radius.
pub fn collide_with_actor(cs: &mut CollisionState, actor: &Actor, index: usize, radius_override: i32) -> bool {
    if !actor.is_collidable() {
        return false;
    }
    let radius = if radius_override != 0 { radius_override } else { actor.radius };
    sweep_cylinder(cs, actor.position, radius, actor.height, Pid::actor(index))
}

/// Sweep against the party body.
pub fn collide_with_party(cs: &mut CollisionState, party: &Party) -> bool {
    sweep_cylinder(cs, party.position, party.radius, party.height, Pid::player(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;
    use crate::game::level::PolygonType;

    /// Probe at the origin moving +X, 100 units this step.
    fn moving_x() -> CollisionState {
        let mut cs = CollisionState::default();
        cs.begin(10);
        cs.load(Vec3i::new(0, 0, 0), Vec3i::new(1000, 0, 0), 0);
        // 100 units = 1000 speed * dt, dt = 0.1 s
        assert!(!cs.prepare_and_check_if_stationary(6554));
        cs
    }

    #[test]
    fn test_prepare_stationary() {
        let mut cs = CollisionState::default();
        cs.begin(10);
        cs.load(Vec3i::ZERO, Vec3i::ZERO, 0);
        assert!(cs.prepare_and_check_if_stationary(FIXED_ONE));

        cs.load(Vec3i::ZERO, Vec3i::new(10, 0, 0), 0);
        // 10 units/s for 1/128 s rounds to nothing
        assert!(cs.prepare_and_check_if_stationary(512));
    }

    #[test]
    fn test_prepare_sets_full_move() {
        let cs = moving_x();
        assert_eq!(cs.direction, Vec3i::new(FIXED_ONE, 0, 0));
        assert_eq!(cs.move_distance, 100);
        assert_eq!(cs.adjusted_move_distance, cs.move_distance);
        assert!(cs.fully_moved());
        assert_eq!(cs.new_position_lo, Vec3i::new(100, 0, 11));
    }

    #[test]
    fn test_record_hit_keeps_nearest() {
        let mut cs = moving_x();
        assert!(cs.record_hit(50, Pid::actor(1)));
        assert!(!cs.record_hit(60, Pid::actor(2)));
        assert!(cs.record_hit(20, Pid::decoration(3)));
        assert_eq!(cs.pid, Pid::decoration(3));
        assert_eq!(cs.adjusted_move_distance, 20);
        assert!(!cs.fully_moved());
        assert_eq!(cs.allowed_step(), Vec3i::new(20, 0, 0));
    }

    #[test]
    fn test_cylinder_hit_distance() {
        let mut cs = moving_x();
        // Cylinder radius 30 at x=80: surface contact at 80 - 30 - 10 = 40
        assert!(sweep_cylinder(&mut cs, Vec3i::new(80, 0, -50), 30, 200, Pid::actor(0)));
        assert_eq!(cs.adjusted_move_distance, 40);
        assert_eq!(cs.pid, Pid::actor(0));
    }

    #[test]
    fn test_cylinder_miss_cases() {
        // Behind
        let mut cs = moving_x();
        assert!(!sweep_cylinder(&mut cs, Vec3i::new(-80, 0, 0), 30, 200, Pid::actor(0)));
        // Off to the side
        assert!(!sweep_cylinder(&mut cs, Vec3i::new(50, 100, 0), 30, 200, Pid::actor(0)));
        // Too far for this step
        assert!(!sweep_cylinder(&mut cs, Vec3i::new(500, 0, 0), 30, 200, Pid::actor(0)));
        // Cylinder entirely above the probe
        assert!(!sweep_cylinder(&mut cs, Vec3i::new(60, 0, 100), 30, 200, Pid::actor(0)));
        assert!(cs.fully_moved());
    }

    #[test]
    fn test_cylinder_overlap_hits_at_zero() {
        let mut cs = moving_x();
        assert!(sweep_cylinder(&mut cs, Vec3i::new(20, 0, 0), 30, 200, Pid::actor(4)));
        assert_eq!(cs.adjusted_move_distance, 0);
    }

    #[test]
    fn test_face_hit() {
        let mut cs = moving_x();
        let wall = Face {
            polygon: PolygonType::VerticalWall,
            normal: Vec3i::new(-FIXED_ONE, 0, 0),
            distance: -60,
            min: Vec3i::new(60, -500, -500),
            max: Vec3i::new(60, 500, 500),
            event_id: 0,
        };
        assert!(sweep_face(&mut cs, &wall, Pid::face(3)));
        // Sphere surface touches x=60 when the center is at 50
        assert_eq!(cs.adjusted_move_distance, 50);
        assert_eq!(cs.pid, Pid::face(3));
    }

    #[test]
    fn test_face_outside_bounds_is_ignored() {
        let mut cs = moving_x();
        let wall = Face {
            polygon: PolygonType::VerticalWall,
            normal: Vec3i::new(-FIXED_ONE, 0, 0),
            distance: -60,
            min: Vec3i::new(60, 200, -500),
            max: Vec3i::new(60, 500, 500),
            event_id: 0,
        };
        assert!(!sweep_face(&mut cs, &wall, Pid::face(3)));
    }

    #[test]
    fn test_actor_radius_override() {
        let actor = Actor::new(1, Vec3i::new(80, 0, -50), 30, 200);
        let mut cs = moving_x();
        assert!(collide_with_actor(&mut cs, &actor, 2, 50));
        assert_eq!(cs.adjusted_move_distance, 20);
        assert_eq!(cs.pid, Pid::actor(2));
    }
}
