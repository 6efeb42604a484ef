//! Axis-aligned collision volumes ("ZV"), room-space translation and the
//! push-back resolver used by the movement code.

use fitd_formats::{Body, RoomBox, RoomData};
use serde::{Deserialize, Serialize};

use crate::math::rotate;
use crate::world::World;

/// At most this many actors are reported by one actor collision query.
pub const MAX_OBJECT_COLLISIONS: usize = 3;
/// At most this many static boxes are reported by one hard collision query.
pub const MAX_HARD_COLLISIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zv {
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
    pub z1: i32,
    pub z2: i32,
}

impl Zv {
    pub fn from_extents(extents: [i16; 6]) -> Self {
        let [x1, x2, y1, y2, z1, z2] = extents.map(i32::from);
        Zv {
            x1,
            x2,
            y1,
            y2,
            z1,
            z2,
        }
    }

    /// Cube of half-size `half` around a point.
    pub fn around(point: [i32; 3], half: i32) -> Self {
        let [x, y, z] = point;
        Zv {
            x1: x - half,
            x2: x + half,
            y1: y - half,
            y2: y + half,
            z1: z - half,
            z2: z + half,
        }
    }

    pub fn translate(&mut self, offset: [i32; 3]) {
        let [dx, dy, dz] = offset;
        self.x1 += dx;
        self.x2 += dx;
        self.y1 += dy;
        self.y2 += dy;
        self.z1 += dz;
        self.z2 += dz;
    }

    pub fn translated(mut self, offset: [i32; 3]) -> Self {
        self.translate(offset);
        self
    }

    /// Strict overlap on all three axes; touching faces do not collide.
    pub fn collides(&self, other: &Zv) -> bool {
        !(self.x1 >= other.x2
            || other.x1 >= self.x2
            || self.y1 >= other.y2
            || other.y1 >= self.y2
            || self.z1 >= other.z2
            || other.z1 >= self.z2)
    }

    /// Inclusive point test, used for scene zones.
    pub fn contains_point(&self, point: [i32; 3]) -> bool {
        let [x, y, z] = point;
        (self.x1..=self.x2).contains(&x)
            && (self.y1..=self.y2).contains(&y)
            && (self.z1..=self.z2).contains(&z)
    }

    pub fn center(&self) -> [i32; 3] {
        [
            (self.x1 + self.x2) / 2,
            (self.y1 + self.y2) / 2,
            (self.z1 + self.z2) / 2,
        ]
    }
}

/// Offset to add to a volume expressed in `from` to express it in `to`.
/// World offsets are stored in tens of units, and the X axis runs opposite
/// to the other two.
pub fn room_offset(rooms: &[RoomData], from: i16, to: i16) -> [i32; 3] {
    if from == to {
        return [0; 3];
    }
    let (Some(from_room), Some(to_room)) = (room(rooms, from), room(rooms, to)) else {
        return [0; 3];
    };
    let delta = |axis: usize| (i32::from(from_room.world[axis]) - i32::from(to_room.world[axis])) * 10;
    [delta(0), -delta(1), -delta(2)]
}

pub fn relative_position(zv: &Zv, rooms: &[RoomData], from: i16, to: i16) -> Zv {
    zv.translated(room_offset(rooms, from, to))
}

pub fn room(rooms: &[RoomData], index: i16) -> Option<&RoomData> {
    usize::try_from(index).ok().and_then(|index| rooms.get(index))
}

/// Static boxes of `room_index` that overlap `zv`, in list order.
pub fn hard_collisions<'a>(zv: &Zv, rooms: &'a [RoomData], room_index: i16) -> Vec<&'a RoomBox> {
    let Some(room_data) = room(rooms, room_index) else {
        return Vec::new();
    };
    room_data
        .hard_cols
        .iter()
        .filter(|hard| zv.collides(&Zv::from_extents(hard.zv)))
        .take(MAX_HARD_COLLISIONS)
        .collect()
}

/// First scene zone of `room_index` containing the point.
pub fn scene_zone_at(point: [i32; 3], rooms: &[RoomData], room_index: i16) -> Option<&RoomBox> {
    room(rooms, room_index)?
        .sce_zones
        .iter()
        .find(|zone| Zv::from_extents(zone.zv).contains_point(point))
}

const SIDE_LEFT: u8 = 4;
const SIDE_RIGHT: u8 = 8;
const SIDE_FRONT: u8 = 1;
const SIDE_BACK: u8 = 2;

fn sides(x1: i32, x2: i32, z1: i32, z2: i32, obstacle: &Zv) -> u8 {
    let mut code = 0;
    if x2 <= obstacle.x1 {
        code |= SIDE_LEFT;
    } else if obstacle.x2 <= x1 {
        code |= SIDE_RIGHT;
    }
    if z2 <= obstacle.z1 {
        code |= SIDE_FRONT;
    } else if obstacle.z2 <= z1 {
        code |= SIDE_BACK;
    }
    code
}

fn is_diagonal(code: u8) -> bool {
    code & (SIDE_LEFT | SIDE_RIGHT) != 0 && code & (SIDE_FRONT | SIDE_BACK) != 0
}

/// Corrects a pending `[step_x, step_z]` so that a mover whose box was
/// `start` and would become `moved` stops against `obstacle`.
///
/// The side the mover came from is classified from the start box. A single
/// side clamps that axis so the faces touch. A corner approach is settled by
/// classifying the moved box's center; when that is still ambiguous the axis
/// the boxes overlap less on is clamped. Large steps can still tunnel through
/// thin obstacles.
pub fn handle_collision(start: &Zv, moved: &Zv, obstacle: &Zv, step: [i32; 2]) -> [i32; 2] {
    let code = sides(start.x1, start.x2, start.z1, start.z2, obstacle);
    if code == 0 {
        return [0, 0];
    }
    let clamp_x = |step_x: i32| {
        if code & SIDE_LEFT != 0 {
            obstacle.x1 - start.x2
        } else if code & SIDE_RIGHT != 0 {
            obstacle.x2 - start.x1
        } else {
            step_x
        }
    };
    let clamp_z = |step_z: i32| {
        if code & SIDE_FRONT != 0 {
            obstacle.z1 - start.z2
        } else if code & SIDE_BACK != 0 {
            obstacle.z2 - start.z1
        } else {
            step_z
        }
    };
    let [step_x, step_z] = step;
    if !is_diagonal(code) {
        return [clamp_x(step_x), clamp_z(step_z)];
    }

    let [center_x, _, center_z] = moved.center();
    let centre_code = sides(center_x, center_x, center_z, center_z, obstacle);
    if centre_code & code != 0 && !is_diagonal(centre_code) {
        if centre_code & (SIDE_LEFT | SIDE_RIGHT) != 0 {
            return [clamp_x(step_x), step_z];
        }
        return [step_x, clamp_z(step_z)];
    }

    let overlap_x = moved.x2.min(obstacle.x2) - moved.x1.max(obstacle.x1);
    let overlap_z = moved.z2.min(obstacle.z2) - moved.z1.max(obstacle.z1);
    if overlap_x >= overlap_z {
        [step_x, clamp_z(step_z)]
    } else {
        [clamp_x(step_x), step_z]
    }
}

/// Stored box of a body.
pub fn give_zv(body: &Body) -> Zv {
    Zv::from_extents(body.zv)
}

/// Square footprint centred on the model: X and Z both span half the
/// larger of the width and the depth.
pub fn zv_max(body: &Body) -> Zv {
    let zv = give_zv(body);
    let half = (zv.x2 - zv.x1).max(zv.z2 - zv.z1) / 2;
    Zv {
        x1: -half,
        x2: half,
        z1: -half,
        z2: half,
        ..zv
    }
}

/// Square footprint from the mean of the far X and Z faces.
pub fn zv_cube(body: &Body) -> Zv {
    let zv = give_zv(body);
    let half = (zv.x2 + zv.z2) / 2;
    Zv {
        x1: -half,
        x2: half,
        z1: -half,
        z2: half,
        ..zv
    }
}

/// Turns a model-local point by gamma, then alpha, then beta.
pub(crate) fn turn(point: [i32; 3], alpha: i16, beta: i16, gamma: i16) -> [i32; 3] {
    let [x, y, z] = point;
    let (y_g, x_g) = rotate(i32::from(gamma), x, y);
    let (z_a, y_a) = rotate(i32::from(alpha), y_g, z);
    let (z_b, x_b) = rotate(i32::from(beta), x_g, z_a);
    [x_b, y_a, z_b]
}

fn bound(points: impl IntoIterator<Item = [i32; 3]>) -> Option<Zv> {
    points.into_iter().fold(None, |bound, [x, y, z]| {
        Some(match bound {
            None => Zv {
                x1: x,
                x2: x,
                y1: y,
                y2: y,
                z1: z,
                z2: z,
            },
            Some(current) => Zv {
                x1: current.x1.min(x),
                x2: current.x2.max(x),
                y1: current.y1.min(y),
                y2: current.y2.max(y),
                z1: current.z1.min(z),
                z2: current.z2.max(z),
            },
        })
    })
}

/// Bound of the stored box after turning it by the given orientation.
pub fn zv_rot(body: &Body, alpha: i16, beta: i16, gamma: i16) -> Zv {
    let zv = give_zv(body);
    let corners = [zv.x1, zv.x2].into_iter().flat_map(|x| {
        [zv.y1, zv.y2]
            .into_iter()
            .flat_map(move |y| [zv.z1, zv.z2].into_iter().map(move |z| [x, y, z]))
    });
    bound(corners.map(|corner| turn(corner, alpha, beta, gamma))).unwrap_or(zv)
}

/// Bound of the body's vertices in rest pose after turning them.
pub fn zv_real(body: &Body, alpha: i16, beta: i16, gamma: i16) -> Zv {
    let points = body
        .vertices
        .iter()
        .map(|vertex| turn(vertex.map(i32::from), alpha, beta, gamma));
    bound(points).unwrap_or_else(|| give_zv(body))
}

/// Standing box for objects without a body.
pub fn default_zv() -> Zv {
    Zv {
        x1: -100,
        x2: 100,
        y1: -2000,
        y2: 0,
        z1: -100,
        z2: 100,
    }
}

impl World {
    /// Fills `actor`'s collision slots with the live actors `zv` overlaps and
    /// returns how many were found. The scan stops at the slot cap.
    pub fn check_object_collisions(&mut self, actor: usize, zv: &Zv) -> usize {
        let actor_room = self.actors[actor].room;
        let mut found = [-1i16; MAX_OBJECT_COLLISIONS];
        let mut count = 0;
        for (index, other) in self.actors.iter().enumerate() {
            if index == actor || other.index_in_world == -1 {
                continue;
            }
            let query = relative_position(zv, &self.rooms, actor_room, other.room);
            if query.collides(&other.zv) {
                found[count] = index as i16;
                count += 1;
                if count == MAX_OBJECT_COLLISIONS {
                    break;
                }
            }
        }
        self.actors[actor].col = found;
        count
    }

    /// Hard collisions of `zv` in the room `actor` stands in.
    pub fn hard_collisions_for(&self, actor: usize, zv: &Zv) -> Vec<RoomBox> {
        hard_collisions(zv, &self.rooms, self.actors[actor].room)
            .into_iter()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(x: i32, z: i32, half: i32) -> Zv {
        Zv::around([x, 0, z], half)
    }

    #[test]
    fn touching_faces_do_not_collide() {
        let a = Zv::from_extents([0, 100, 0, 100, 0, 100]);
        let b = Zv::from_extents([100, 200, 0, 100, 0, 100]);
        assert!(!a.collides(&b));
        assert!(!b.collides(&a));
        let c = Zv::from_extents([99, 200, 50, 60, 99, 150]);
        assert!(a.collides(&c));
        let d = Zv::from_extents([50, 60, 100, 300, 50, 60]);
        assert!(!a.collides(&d));
    }

    #[test]
    fn zone_points_are_inclusive() {
        let zone = Zv::from_extents([0, 10, 0, 10, 0, 10]);
        assert!(zone.contains_point([10, 0, 10]));
        assert!(!zone.contains_point([11, 0, 10]));
    }

    #[test]
    fn room_translation_flips_x() {
        let rooms = vec![
            RoomData {
                world: [0, 0, 0],
                ..RoomData::default()
            },
            RoomData {
                world: [10, 2, -5],
                ..RoomData::default()
            },
        ];
        assert_eq!(room_offset(&rooms, 0, 1), [-100, 20, -50]);
        assert_eq!(room_offset(&rooms, 1, 0), [100, -20, 50]);
        assert_eq!(room_offset(&rooms, 1, 1), [0, 0, 0]);
        assert_eq!(room_offset(&rooms, -1, 1), [0, 0, 0]);
        let zv = relative_position(&cube(0, 0, 10), &rooms, 0, 1);
        assert_eq!(zv.x1, -110);
        assert_eq!(zv.z2, -40);
    }

    #[test]
    fn hard_collision_list_is_capped() {
        let wall = RoomBox {
            zv: [-50, 50, -50, 50, -50, 50],
            parameter: 0,
            kind: 0,
        };
        let rooms = vec![RoomData {
            hard_cols: vec![wall; 14],
            ..RoomData::default()
        }];
        let hits = hard_collisions(&cube(0, 0, 10), &rooms, 0);
        assert_eq!(hits.len(), MAX_HARD_COLLISIONS);
        assert!(hard_collisions(&cube(500, 0, 10), &rooms, 0).is_empty());
        assert!(hard_collisions(&cube(0, 0, 10), &rooms, 3).is_empty());
    }

    #[test]
    fn head_on_collision_stops_at_face() {
        let start = cube(0, 0, 50);
        let obstacle = Zv::from_extents([-200, 200, -50, 50, 80, 200]);
        let moved = start.translated([0, 0, 60]);
        assert_eq!(handle_collision(&start, &moved, &obstacle, [0, 60]), [0, 30]);

        let obstacle = Zv::from_extents([80, 200, -50, 50, -200, 200]);
        let moved = start.translated([60, 0, 10]);
        assert_eq!(handle_collision(&start, &moved, &obstacle, [60, 10]), [30, 10]);
    }

    #[test]
    fn corner_approach_keeps_the_sliding_axis() {
        let start = cube(0, 0, 50);
        let obstacle = Zv::from_extents([60, 400, -50, 50, 55, 400]);
        let moved = start.translated([40, 0, 200]);
        let step = handle_collision(&start, &moved, &obstacle, [40, 200]);
        assert_eq!(step, [10, 200]);
    }

    fn body_with_box(zv: [i16; 6]) -> Body {
        Body {
            flags: 0,
            zv,
            scratch_size: 0,
            vertices: Vec::new(),
            groups: Vec::new(),
        }
    }

    #[test]
    fn square_footprints_of_off_centre_body() {
        let body = body_with_box([-100, 300, -1000, 0, -50, 50]);

        let max = zv_max(&body);
        assert_eq!([max.x1, max.x2, max.z1, max.z2], [-200, 200, -200, 200]);
        assert_eq!([max.y1, max.y2], [-1000, 0]);

        let cube = zv_cube(&body);
        assert_eq!([cube.x1, cube.x2, cube.z1, cube.z2], [-175, 175, -175, 175]);
        assert_eq!([cube.y1, cube.y2], [-1000, 0]);

        let deep = zv_max(&body_with_box([-10, 10, -500, 0, -300, 100]));
        assert_eq!([deep.x1, deep.x2], [-200, 200]);
    }

    #[test]
    fn default_box_stands_on_the_floor() {
        let zv = default_zv();
        assert_eq!(
            [zv.x1, zv.x2, zv.y1, zv.y2, zv.z1, zv.z2],
            [-100, 100, -2000, 0, -100, 100]
        );
    }

    #[test]
    fn embedded_start_blocks_both_axes() {
        let start = cube(0, 0, 50);
        let obstacle = cube(10, 10, 50);
        assert_eq!(
            handle_collision(&start, &start.translated([5, 0, 5]), &obstacle, [5, 5]),
            [0, 0]
        );
    }
}
