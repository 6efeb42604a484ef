//! Movement controllers: manual (joystick), follow another object, and
//! scripted tracks.
//!
//! A track is a word stream: an opcode followed by its operands. The two
//! opcode numberings are resolved by [`Edition::track_op`]; everything past
//! that lookup is shared.

use fitd_formats::{Edition, RoomBox, RoomData, TrackOp};
use log::debug;

use crate::error::{SimError, SimResult};
use crate::math::{distance_to_point, make_proportional, rotate};
use crate::world::{AF_TRIGGER, DISTANCE_TO_POINT_THRESHOLD, World};
use crate::zv::room;

pub const TRACK_NONE: i16 = 0;
pub const TRACK_MANUAL: i16 = 1;
pub const TRACK_FOLLOW: i16 = 2;
pub const TRACK_SCRIPTED: i16 = 3;

/// Which way to turn from heading `beta` at `(x1, z1)` to face `(x2, z2)`:
/// -1, 0 or 1. The facing test is sampled four units either side of the
/// heading; when the samples straddle the target the heading itself
/// decides.
pub fn angle_modificator(x1: i32, z1: i32, beta: i32, x2: i32, z2: i32) -> i32 {
    let (dx, dz) = (x2 - x1, z2 - z1);
    let side = |angle: i32| {
        let (x_out, y_out) = rotate(angle, 0, 1000);
        (y_out * dz - x_out * dx).signum()
    };
    let below = side(beta - 4);
    let above = side(beta + 4);
    if above == -1 && below == 1 {
        side(beta)
    } else {
        (above + below + 1) >> 1
    }
}

/// The room-link box leading from `from` towards `to`: the last link zone of
/// `from` when none leads to `to` directly.
pub fn room_link(rooms: &[RoomData], from: i16, to: i16) -> Option<&RoomBox> {
    let zones = &room(rooms, from)?.hard_cols;
    let mut best = zones.first();
    for zone in zones.iter().filter(|zone| zone.kind == 4) {
        best = Some(zone);
        if zone.parameter as i16 == to {
            break;
        }
    }
    best
}

impl World {
    /// Turns the actor in `slot` with the joystick's left/right bits.
    pub fn gere_manual_rot(&mut self, slot: usize, param: i32) {
        let joy = self.input.joy;
        let timer = self.timer;
        let actor = &mut self.actors[slot];
        for (bit, direction, turn) in [(4, 1, 0x100), (8, -1, -0x100)] {
            if joy & bit == 0 {
                continue;
            }
            if actor.direction != direction {
                actor.rotate.param = 0;
            }
            actor.direction = direction;
            if actor.rotate.param == 0 {
                let beta = i32::from(actor.beta);
                let duration = if actor.speed == 0 { param / 2 } else { param };
                actor.rotate.init(beta, beta + turn, duration, timer);
            }
            actor.beta = actor.rotate.update_rotation(timer) as i16;
        }
        if joy & 0xC == 0 {
            actor.direction = 0;
            actor.rotate.param = 0;
        }
    }

    fn steer(&mut self, slot: usize, modifier: i32, span: i32, duration: i32) {
        let timer = self.timer;
        let actor = &mut self.actors[slot];
        if actor.rotate.param == 0 || i32::from(actor.direction) != modifier {
            let beta = i32::from(actor.beta);
            actor.rotate.init(beta, beta - modifier * span, duration, timer);
        }
        actor.direction = modifier as i16;
        if modifier == 0 {
            actor.rotate.param = 0;
        } else {
            actor.beta = actor.rotate.update_rotation(timer) as i16;
        }
    }

    fn steer_towards(&mut self, slot: usize, x: i32, z: i32, span: i32, duration: i32) {
        let actor = &self.actors[slot];
        let [px, _, pz] = actor.stepped_position();
        let modifier = angle_modificator(px, pz, i32::from(actor.beta), x, z);
        self.steer(slot, modifier, span, duration);
    }

    /// Runs one step of the actor's movement controller.
    pub fn process_track(&mut self, slot: usize) -> SimResult<()> {
        match self.actors[slot].track_mode {
            TRACK_MANUAL => self.track_manual(slot),
            TRACK_FOLLOW => self.track_follow(slot)?,
            TRACK_SCRIPTED => self.track_scripted(slot)?,
            _ => {}
        }
        self.actors[slot].beta &= 0x3FF;
        Ok(())
    }

    fn track_manual(&mut self, slot: usize) {
        self.gere_manual_rot(slot, 60);
        let joy = self.input.joy;
        let timer = self.timer;
        let recent = timer.wrapping_sub(self.last_time_forward) < 10;
        let actor = &mut self.actors[slot];
        let forward = joy & 1 != 0;
        if forward {
            if recent && actor.speed != 4 {
                actor.speed = 5;
            } else if actor.speed == 0 || actor.speed == -1 {
                actor.speed = 4;
            }
        } else if actor.speed > 0 && actor.speed <= 4 {
            actor.speed -= 1;
        } else {
            actor.speed = 0;
        }
        if joy & 2 != 0 {
            if actor.speed == 0 || actor.speed >= 4 {
                actor.speed = -1;
            }
            if actor.speed == 5 {
                actor.speed = 0;
            }
        }
        if forward {
            self.last_time_forward = timer;
        }
    }

    fn track_follow(&mut self, slot: usize) -> SimResult<()> {
        let followed = self.object(self.actors[slot].track_number)?.obj_index;
        let Ok(followed) = usize::try_from(followed) else {
            let actor = &mut self.actors[slot];
            actor.direction = 0;
            actor.speed = 0;
            return Ok(());
        };
        let target = &self.actors[followed];
        let (mut x, mut z) = (target.room_pos[0], target.room_pos[2]);
        let own_room = self.actors[slot].room;
        if self.edition == Edition::Aitd1 && own_room != target.room {
            if let Some(link) = room_link(&self.rooms, own_room, target.room) {
                let zv = link.zv.map(i32::from);
                x = zv[0] + (zv[1] - zv[0]) / 2;
                z = zv[4] + (zv[5] - zv[4]) / 2;
            }
        }
        self.steer_towards(slot, x, z, 256, 60);
        self.actors[slot].speed = 4;
        Ok(())
    }

    fn track_scripted(&mut self, slot: usize) -> SimResult<()> {
        let number = self.actors[slot].track_number;
        let position = usize::try_from(self.actors[slot].position_in_track).unwrap_or(0);
        let words = self
            .resources
            .tracks
            .get(&number)
            .ok_or(SimError::MissingResource {
                kind: "track",
                index: number,
            })?;
        let raw = *words
            .get(position)
            .ok_or(SimError::Truncated { cursor: position * 2 })?;
        let op = self
            .edition
            .track_op(raw)
            .ok_or(SimError::UnsupportedTrackOpcode {
                raw,
                position,
                actor: slot,
            })?;
        let length = 1 + op.operand_count();
        let mut args = [0i32; 5];
        for (index, arg) in args.iter_mut().take(op.operand_count()).enumerate() {
            *arg = i32::from(
                *words
                    .get(position + 1 + index)
                    .ok_or(SimError::Truncated {
                        cursor: (position + 1 + index) * 2,
                    })?,
            );
        }
        debug!("actor {slot}: track {number} @{position} {op:?}");
        let advance = length as i16;

        match op {
            TrackOp::Warp => self.track_warp(slot, args[0] as i16, [args[1], args[2], args[3]]),
            TrackOp::Goto => {
                let [x, z] = self.track_target(slot, args[0] as i16, args[1], args[2]);
                let [px, _, pz] = self.actors[slot].stepped_position();
                if distance_to_point(px, pz, x, z) >= DISTANCE_TO_POINT_THRESHOLD {
                    self.steer_towards(slot, x, z, 64, 15);
                } else {
                    self.actors[slot].position_in_track += advance;
                }
            }
            TrackOp::Goto3d => self.track_goto_3d(slot, args, advance),
            TrackOp::End => {
                self.actors[slot].speed = 0;
                self.actors[slot].track_number = -1;
                self.set_move_mode(slot, TRACK_NONE, 0);
            }
            TrackOp::Repeat => self.actors[slot].position_in_track = 0,
            TrackOp::Mark => {
                let actor = &mut self.actors[slot];
                actor.mark = args[0] as i16;
                actor.position_in_track += advance;
            }
            TrackOp::Walk | TrackOp::Run | TrackOp::Stop => {
                let actor = &mut self.actors[slot];
                actor.speed = match op {
                    TrackOp::Walk => 4,
                    TrackOp::Run => 5,
                    _ => 0,
                };
                actor.position_in_track += advance;
            }
            TrackOp::Wait => {}
            TrackOp::SetAngle => {
                let timer = self.timer;
                let target = args[0] as i16;
                let actor = &mut self.actors[slot];
                actor.direction = if (actor.beta.wrapping_sub(target) & 0x3FF) > 0x200 {
                    1
                } else {
                    -1
                };
                if actor.rotate.param == 0 {
                    actor
                        .rotate
                        .init(i32::from(actor.beta), i32::from(target), 120, timer);
                }
                actor.beta = actor.rotate.update_rotation(timer) as i16;
                if actor.beta == target {
                    actor.direction = 0;
                    actor.position_in_track += advance;
                }
            }
            TrackOp::CollisionOff | TrackOp::CollisionOn => {
                let actor = &mut self.actors[slot];
                if op == TrackOp::CollisionOn {
                    actor.dyn_flags |= 1;
                } else {
                    actor.dyn_flags &= !1;
                }
                actor.position_in_track += advance;
            }
            TrackOp::TriggerOff | TrackOp::TriggerOn => {
                let actor = &mut self.actors[slot];
                if op == TrackOp::TriggerOn {
                    actor.flags |= AF_TRIGGER;
                } else {
                    actor.flags &= !AF_TRIGGER;
                }
                actor.position_in_track += advance;
            }
            TrackOp::MemoCoord => {
                let position = self.actors[slot].stepped_position();
                let index = self.actors[slot].index_in_world;
                let object = self.object_mut(index)?;
                object.x = position[0] as i16;
                object.y = position[1] as i16;
                object.z = position[2] as i16;
                self.actors[slot].position_in_track += advance;
            }
            TrackOp::StairsX | TrackOp::StairsZ => {
                self.track_stairs(slot, op == TrackOp::StairsX, [args[0], args[1], args[2]], advance)?
            }
            TrackOp::Angle => {
                let actor = &mut self.actors[slot];
                actor.alpha = args[0] as i16;
                actor.beta = args[1] as i16;
                actor.gamma = args[2] as i16;
                actor.direction = 0;
                actor.position_in_track += advance;
            }
            TrackOp::Back | TrackOp::SetDistance | TrackOp::Close => {
                return Err(SimError::UnsupportedTrackOpcode {
                    raw,
                    position,
                    actor: slot,
                });
            }
        }
        Ok(())
    }

    /// A track point given in `target_room`, expressed in the actor's room.
    fn track_target(&self, slot: usize, target_room: i16, x: i32, z: i32) -> [i32; 2] {
        let own = self.actors[slot].room;
        if target_room == own {
            return [x, z];
        }
        let from = self.room_world(own);
        let to = self.room_world(target_room);
        [x - (from[0] - to[0]) * 10, z + (from[2] - to[2]) * 10]
    }

    fn track_warp(&mut self, slot: usize, target_room: i16, position: [i32; 3]) {
        if self.actors[slot].room != target_room {
            if self.camera_target == slot as i16 {
                self.need_change_room = true;
                self.new_room = target_room;
            }
            self.actors[slot].room = target_room;
        }
        let world = self.to_current_room(target_room, position);
        let actor = &mut self.actors[slot];
        let before = actor.stepped_position();
        actor.zv.translate(before.map(|axis| -axis));
        actor.room_pos = position;
        actor.world = world;
        let after = actor.stepped_position();
        actor.zv.translate(after);
        actor.speed = 0;
        actor.direction = 0;
        actor.rotate.param = 0;
        actor.position_in_track += 5;
    }

    fn track_goto_3d(&mut self, slot: usize, args: [i32; 5], advance: i16) {
        let target_room = args[0] as i16;
        let (mut x, mut y, mut z) = (args[1], args[2], args[3]);
        let duration = args[4];
        let own = self.actors[slot].room;
        if target_room != own {
            let from = self.room_world(own);
            let to = self.room_world(target_room);
            x -= (from[0] - to[0]) * 10;
            y += (from[1] - to[1]) * 10;
            z += (from[2] - to[2]) * 10;
        }
        let actor = &self.actors[slot];
        let [px, py, pz] = actor.stepped_position();
        if y == actor.room_pos[1] && distance_to_point(px, pz, x, z) < DISTANCE_TO_POINT_THRESHOLD {
            self.actors[slot].position_in_track += advance;
            return;
        }
        let modifier = angle_modificator(px, pz, i32::from(actor.beta), x, z);
        if actor.y_handler.param == 0 {
            let timer = self.timer;
            self.actors[slot].y_handler.init(0, y - py, duration, timer);
        }
        self.steer(slot, modifier, 256, 60);
    }

    fn track_stairs(
        &mut self,
        slot: usize,
        along_x: bool,
        [x, y, z]: [i32; 3],
        advance: i16,
    ) -> SimResult<()> {
        let object = self.object(self.actors[slot].index_in_world)?;
        let (anchor_y, anchor) = if along_x {
            (i32::from(object.y), i32::from(object.x))
        } else {
            (i32::from(object.y), i32::from(object.z))
        };
        let position = self.actors[slot].stepped_position();
        let actor = &mut self.actors[slot];
        if position[1] < y - 100 || position[1] > y + 100 {
            let (span, travelled) = if along_x {
                (x - anchor, position[0] - anchor)
            } else {
                (z - anchor, position[2] - anchor)
            };
            let height = make_proportional(anchor_y, y, span, travelled);
            let lift = height - actor.world[1];
            actor.world[1] += lift;
            actor.room_pos[1] += lift;
            actor.zv.y1 += lift;
            actor.zv.y2 += lift;
            self.steer_towards(slot, x, z, 256, 60);
        } else {
            let lift = y - actor.world[1];
            actor.step[1] = 0;
            actor.world[1] += lift;
            actor.room_pos[1] += lift;
            actor.zv.y1 += lift;
            actor.zv.y2 += lift;
            actor.position_in_track += advance;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitd_formats::WorldObject;

    use crate::world::Actor;

    fn world_with_actor(edition: Edition) -> World {
        let mut world = World::new(edition);
        world.rooms = vec![RoomData::default(), RoomData {
            world: [10, 0, -10],
            ..RoomData::default()
        }];
        world.objects = vec![WorldObject::default(); 2];
        world.objects[0].obj_index = 0;
        world.actors[0] = Actor {
            index_in_world: 0,
            room: 0,
            stage: 0,
            ..Actor::default()
        };
        world
    }

    #[test]
    fn target_straight_ahead_needs_no_turn() {
        // Heading 0 faces -Z.
        assert_eq!(angle_modificator(0, 0, 0, 0, -1000), 0);
        assert_eq!(angle_modificator(0, 0, 0x100, -1000, 0), 0);
    }

    #[test]
    fn side_targets_turn_towards_them() {
        assert_eq!(angle_modificator(0, 0, 0, 1000, 0), -1);
        assert_eq!(angle_modificator(0, 0, 0, -1000, 0), 1);
        assert_eq!(angle_modificator(0, 0, 0x200, 1000, 0), 1);
        assert_eq!(angle_modificator(0, 0, 0x200, -1000, 0), -1);
    }

    #[test]
    fn target_behind_is_ambiguous() {
        assert_eq!(angle_modificator(0, 0, 0, 0, 1000), 0);
    }

    #[test]
    fn manual_forward_walks_then_double_tap_runs() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.actors[0].track_mode = TRACK_MANUAL;
        world.timer = 100;
        world.input.joy = 1;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].speed, 4);

        world.input.joy = 0;
        world.timer = 102;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].speed, 3);

        world.input.joy = 1;
        world.timer = 104;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].speed, 5);

        world.input.joy = 2;
        world.timer = 200;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].speed, -1);
    }

    #[test]
    fn manual_rotation_turns_left() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.actors[0].track_mode = TRACK_MANUAL;
        world.timer = 10;
        world.input.joy = 4;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].direction, 1);
        assert_eq!(world.actors[0].rotate.new_value, 0x100);
        world.timer = 25;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].beta, 0x80);
        world.input.joy = 0;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].direction, 0);
        assert!(world.actors[0].rotate.is_at_rest());
    }

    #[test]
    fn goto_advances_inside_threshold() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.resources.tracks.insert(2, vec![1, 0, 100, 200, 7, 2]);
        world.actors[0].track_mode = TRACK_SCRIPTED;
        world.actors[0].track_number = 2;
        world.actors[0].set_position([0, 0, 0]);
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].position_in_track, 4);
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].position_in_track, 5);
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].track_mode, TRACK_NONE);
        assert_eq!(world.actors[0].track_number, -1);
    }

    #[test]
    fn goto_far_target_steers_without_advancing() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.resources.tracks.insert(2, vec![1, 0, 2000, 0, 2]);
        world.actors[0].track_mode = TRACK_SCRIPTED;
        world.actors[0].track_number = 2;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].position_in_track, 0);
        assert_eq!(world.actors[0].direction, -1);
        assert_eq!(world.actors[0].rotate.new_value, 64);
    }

    #[test]
    fn warp_moves_box_with_actor_and_requests_room_change() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.camera_target = 0;
        world.actors[0].zv = crate::zv::Zv::around([0, 0, 0], 50);
        world.resources.tracks.insert(1, vec![0, 1, 300, 0, 400, 2]);
        world.actors[0].track_mode = TRACK_SCRIPTED;
        world.actors[0].track_number = 1;
        world.process_track(0).unwrap();
        let actor = &world.actors[0];
        assert_eq!(actor.room, 1);
        assert_eq!(actor.room_pos, [300, 0, 400]);
        assert_eq!(actor.world, [400, 0, 500]);
        assert_eq!(actor.zv.x1, 250);
        assert_eq!(actor.zv.z2, 450);
        assert_eq!(actor.position_in_track, 5);
        assert!(world.need_change_room);
        assert_eq!(world.new_room, 1);
    }

    #[test]
    fn set_angle_rotates_until_reached() {
        let mut world = world_with_actor(Edition::Aitd2);
        world.resources.tracks.insert(1, vec![6, 0x40, 2]);
        world.actors[0].track_mode = TRACK_SCRIPTED;
        world.actors[0].track_number = 1;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].position_in_track, 0);
        world.timer = 121;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].beta, 0x40);
        assert_eq!(world.actors[0].position_in_track, 2);
    }

    #[test]
    fn later_wait_stalls_and_unknown_opcode_errors() {
        let mut world = world_with_actor(Edition::Aitd2);
        world.resources.tracks.insert(1, vec![5, 2]);
        world.resources.tracks.insert(2, vec![9]);
        world.actors[0].track_mode = TRACK_SCRIPTED;
        world.actors[0].track_number = 1;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].position_in_track, 0);

        world.actors[0].track_number = 2;
        assert_eq!(
            world.process_track(0),
            Err(SimError::UnsupportedTrackOpcode {
                raw: 9,
                position: 0,
                actor: 0,
            })
        );
    }

    #[test]
    fn follow_stops_when_target_is_dormant() {
        let mut world = world_with_actor(Edition::Aitd1);
        world.actors[0].track_mode = TRACK_FOLLOW;
        world.actors[0].track_number = 1;
        world.actors[0].speed = 4;
        world.process_track(0).unwrap();
        assert_eq!(world.actors[0].speed, 0);
    }

    #[test]
    fn room_link_prefers_matching_zone() {
        let link = |parameter| RoomBox {
            zv: [0; 6],
            parameter,
            kind: 4,
        };
        let rooms = vec![RoomData {
            hard_cols: vec![link(3), link(5), link(6)],
            ..RoomData::default()
        }];
        assert_eq!(room_link(&rooms, 0, 5).map(|zone| zone.parameter), Some(5));
        assert_eq!(room_link(&rooms, 0, 9).map(|zone| zone.parameter), Some(6));
        assert!(room_link(&rooms, 2, 5).is_none());
    }
}
