//! Keyframe animation and the per-tick movement driver.
//!
//! The live pose and the "previous keyframe" used as the interpolation
//! origin belong to a body resource, not to an actor: two actors sharing a
//! body share the pose. They are kept in [`AnimStates`], keyed by body
//! index, and cleared whenever a floor is loaded.

use std::collections::HashMap;

use fitd_formats::{Body, BoneState, CVar, Edition};
use log::{debug, warn};

use crate::host::Host;
use crate::math::{ANGLE_UNITS, walk_step};
use crate::world::{
    AF_ANIMATED, AF_BOXIFY, AF_DRAWABLE, AF_FALLABLE, AF_FOUNDABLE, AF_MOVABLE,
    ANIM_UNINTERRUPTABLE, World,
};
use crate::zv::{Zv, handle_collision, hard_collisions, relative_position};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyAnimState {
    /// Pose the body is drawn with.
    pub pose: Vec<BoneState>,
    /// Interpolation origin; `None` until a keyframe has been applied.
    pub prev: Option<Vec<BoneState>>,
    /// Timer value (low word) at which `prev` was applied.
    pub start: u16,
}

#[derive(Debug, Clone, Default)]
pub struct AnimStates {
    bodies: HashMap<i16, BodyAnimState>,
}

impl AnimStates {
    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    pub fn get(&self, body: i16) -> Option<&BodyAnimState> {
        self.bodies.get(&body)
    }

    fn state_mut(&mut self, index: i16, body: &Body) -> &mut BodyAnimState {
        self.bodies.entry(index).or_insert_with(|| BodyAnimState {
            pose: body.rest_pose(),
            prev: None,
            start: 0,
        })
    }
}

/// Outcome of one interpolation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeStep {
    /// The target keyframe was reached and committed.
    pub changed: bool,
    /// Root displacement accumulated so far within the keyframe.
    pub step: [i32; 3],
}

fn inter_angle(old: i16, new: i16, elapsed: i32, length: i32) -> i16 {
    let diff = new.wrapping_sub(old);
    if diff == 0 {
        return new;
    }
    let units = ANGLE_UNITS as i16;
    let value = if diff > 0x200 {
        let old = old.wrapping_add(units);
        i32::from(new.wrapping_sub(old)) * elapsed / length + i32::from(old)
    } else if diff < -0x200 {
        let span = new.wrapping_add(units).wrapping_sub(old);
        i32::from(span) * elapsed / length + i32::from(old)
    } else {
        i32::from(diff) * elapsed / length + i32::from(old)
    };
    value as i16
}

fn inter_step(old: i16, new: i16, elapsed: i32, length: i32) -> i16 {
    if old == new {
        return new;
    }
    ((i32::from(new) - i32::from(old)) * elapsed / length + i32::from(old)) as i16
}

fn inter_channels(
    old: [i16; 3],
    new: [i16; 3],
    elapsed: i32,
    length: i32,
    blend: fn(i16, i16, i32, i32) -> i16,
) -> [i16; 3] {
    [
        blend(old[0], new[0], elapsed, length),
        blend(old[1], new[1], elapsed, length),
        blend(old[2], new[2], elapsed, length),
    ]
}

impl World {
    /// Seeks `body` to keyframe `frame` of `anim` without interpolating.
    pub fn set_anim_objet(&mut self, frame: i16, anim: i16, body: i16) -> bool {
        let timer = self.timer as u16;
        let (Some(animation), Some(model)) =
            (self.resources.anims.get(&anim), self.resources.bodies.get(&body))
        else {
            debug!("set_anim_objet: anim {anim} or body {body} missing");
            return false;
        };
        let Some(keyframe) = usize::try_from(frame)
            .ok()
            .and_then(|frame| animation.keyframes.get(frame))
        else {
            return false;
        };
        if !model.is_animated() {
            return false;
        }
        let count = usize::from(animation.bone_count)
            .min(model.groups.len())
            .min(keyframe.bones.len());
        let state = self.anim_states.state_mut(body, model);
        state.pose[..count].copy_from_slice(&keyframe.bones[..count]);
        state.prev = Some(keyframe.bones.clone());
        state.start = timer;
        true
    }

    /// Advances the pose of `body` towards keyframe `frame` of `anim`.
    pub fn set_inter_anim_objet(&mut self, frame: i16, anim: i16, body: i16) -> KeyframeStep {
        let timer = self.timer as u16;
        let Some(animation) = self.resources.anims.get(&anim) else {
            warn!("animation {anim} is missing; ending it");
            return KeyframeStep {
                changed: true,
                step: [0; 3],
            };
        };
        let Some(model) = self.resources.bodies.get(&body) else {
            return KeyframeStep::default();
        };
        let Some(keyframe) = usize::try_from(frame)
            .ok()
            .and_then(|frame| animation.keyframes.get(frame))
        else {
            return KeyframeStep {
                changed: true,
                step: [0; 3],
            };
        };
        if !model.is_animated() {
            return KeyframeStep::default();
        }
        let optimised = model.is_optimised();
        let count = usize::from(animation.bone_count)
            .min(model.groups.len())
            .min(keyframe.bones.len());
        let state = self.anim_states.state_mut(body, model);
        let elapsed = timer.wrapping_sub(state.start);

        if elapsed < keyframe.length {
            let (time, length) = (i32::from(elapsed), i32::from(keyframe.length));
            let prev = state.prev.as_deref().unwrap_or(keyframe.bones.as_slice());
            for (index, next) in keyframe.bones[..count].iter().enumerate() {
                let old = prev.get(index).copied().unwrap_or(*next);
                let live = &mut state.pose[index];
                live.kind = next.kind;
                if optimised {
                    if matches!(next.kind, 1 | 2) {
                        live.delta = inter_channels(old.delta, next.delta, time, length, inter_step);
                    }
                    live.rotate = inter_channels(old.rotate, next.rotate, time, length, inter_angle);
                } else {
                    match next.kind {
                        0 => {
                            live.delta =
                                inter_channels(old.delta, next.delta, time, length, inter_angle)
                        }
                        1 | 2 => {
                            live.delta =
                                inter_channels(old.delta, next.delta, time, length, inter_step)
                        }
                        _ => {}
                    }
                }
            }
            KeyframeStep {
                changed: false,
                step: keyframe.step.map(|axis| i32::from(axis) * time / length),
            }
        } else {
            state.pose[..count].copy_from_slice(&keyframe.bones[..count]);
            state.prev = Some(keyframe.bones.clone());
            state.start = timer;
            KeyframeStep {
                changed: true,
                step: keyframe.step.map(i32::from),
            }
        }
    }

    /// Snapshots the live pose of `body` as the origin for the next
    /// interpolation.
    fn init_buffer_anim(&mut self, body: i16) {
        let timer = self.timer as u16;
        let Some(model) = self.resources.bodies.get(&body) else {
            return;
        };
        if !model.is_animated() {
            return;
        }
        let state = self.anim_states.state_mut(body, model);
        state.prev = Some(state.pose.clone());
        state.start = timer;
    }

    pub fn frame_count(&self, anim: i16) -> i16 {
        self.resources
            .anim(anim)
            .map(|animation| animation.frame_count() as i16)
            .unwrap_or(0)
    }

    /// Starts or queues animation `anim` on the actor in `slot`. Returns
    /// whether the request was taken.
    pub fn init_anim(&mut self, slot: usize, anim: i16, anim_type: i16, anim_info: i16) -> bool {
        let edition = self.edition;
        let actor = &self.actors[slot];
        let (current, flags, frame, body) = (actor.anim, actor.flags, actor.frame, actor.body_num);

        if anim == current {
            if flags & AF_ANIMATED == 0 {
                self.remove_from_bg_incrust(slot);
                self.actors[slot].flags |= AF_ANIMATED;
                self.set_anim_objet(frame, anim, body);
                let actor = &mut self.actors[slot];
                actor.anim_type = anim_type;
                actor.anim_info = anim_info;
                if edition > Edition::Aitd1 {
                    actor.frame = 0;
                }
                return true;
            }
            let actor = &mut self.actors[slot];
            actor.anim_type = anim_type;
            actor.anim_info = anim_info;
            return false;
        }

        if anim == -1 {
            self.actors[slot].new_anim = -2;
            return true;
        }

        if flags & AF_ANIMATED == 0 {
            self.actors[slot].flags |= AF_ANIMATED;
            self.remove_from_bg_incrust(slot);
            self.set_anim_objet(0, anim, body);
            let actor = &mut self.actors[slot];
            actor.new_anim = anim;
            actor.new_anim_type = anim_type;
            actor.new_anim_info = anim_info;
            if edition > Edition::Aitd1 {
                actor.frame = 0;
            }
            return true;
        }

        let actor = &mut self.actors[slot];
        if edition == Edition::Aitd1 {
            if actor.anim_type & ANIM_UNINTERRUPTABLE != 0
                || actor.new_anim_type & ANIM_UNINTERRUPTABLE != 0
            {
                return false;
            }
        } else if actor.anim_type & ANIM_UNINTERRUPTABLE != 0 {
            if actor.new_anim_type & ANIM_UNINTERRUPTABLE != 0 {
                return false;
            }
            actor.anim_info = anim;
            return true;
        }

        actor.new_anim = anim;
        actor.new_anim_type = anim_type;
        actor.new_anim_info = anim_info;
        if edition != Edition::Aitd1 {
            actor.frame = 0;
        }
        true
    }

    pub fn add_actor_to_bg_incrust(&mut self, slot: usize) {
        let actor = &mut self.actors[slot];
        actor.flags |= AF_BOXIFY | AF_DRAWABLE;
        actor.flags &= !AF_ANIMATED;
    }

    pub fn remove_from_bg_incrust(&mut self, slot: usize) {
        self.actors[slot].flags &= !AF_BOXIFY;
    }

    /// Counts the live actors under `zv` (expressed in `slot`'s room) and
    /// marks each as collided by `slot`.
    pub fn manage_fall(&mut self, slot: usize, zv: &Zv) -> usize {
        let room = self.actors[slot].room;
        let mut count = 0;
        for index in 0..self.actors.len() {
            if index == slot || self.actors[index].is_free() {
                continue;
            }
            let query = relative_position(zv, &self.rooms, room, self.actors[index].room);
            if query.collides(&self.actors[index].zv) {
                self.actors[index].col_by = slot as i16;
                count += 1;
            }
        }
        count
    }

    fn commit_horizontal_step(&mut self, slot: usize) {
        let actor = &mut self.actors[slot];
        for axis in [0, 2] {
            actor.world[axis] += actor.step[axis];
            actor.room_pos[axis] += actor.step[axis];
            actor.step[axis] = 0;
        }
        actor.anim_neg = [0; 3];
    }

    /// Per-tick animation and movement of the actor in `slot`: applies a
    /// queued animation, interpolates the pose, resolves the resulting step
    /// against the room and the other actors, starts falls and advances the
    /// frame counter.
    pub fn update_animation(&mut self, slot: usize, host: &mut dyn Host) {
        let new_anim = self.actors[slot].new_anim;
        if new_anim != -1 {
            if new_anim == -2 {
                self.add_actor_to_bg_incrust(slot);
                let actor = &mut self.actors[slot];
                actor.new_anim = -1;
                actor.new_anim_type = 0;
                actor.new_anim_info = -1;
                actor.end_anim = true;
                return;
            }
            if !self.actors[slot].end_frame {
                self.commit_horizontal_step(slot);
            }
            self.init_buffer_anim(self.actors[slot].body_num);
            let frames = self.frame_count(new_anim);
            let actor = &mut self.actors[slot];
            actor.anim = new_anim;
            actor.anim_type = actor.new_anim_type;
            actor.anim_info = actor.new_anim_info;
            actor.new_anim = -1;
            actor.new_anim_type = 0;
            actor.new_anim_info = -1;
            actor.end_anim = false;
            actor.frame = 0;
            actor.num_of_frames = frames;
        }

        let mut old_step = [0i32; 3];
        let mut step = [0i32; 3];
        if self.actors[slot].anim == -1 {
            self.actors[slot].end_frame = false;
            if self.actors[slot].speed == 0 {
                let zv = self.actors[slot].zv;
                let count = self.check_object_collisions(slot, &zv);
                for index in 0..count {
                    let other = self.actors[slot].col[index];
                    self.actors[other as usize].col_by = slot as i16;
                }
            } else {
                let timer = self.timer;
                let actor = &mut self.actors[slot];
                old_step = actor.step;
                let forward = actor.speed_change.evaluate(timer);
                let [move_x, move_z] = walk_step(0, forward, i32::from(actor.beta));
                step[0] = move_x - old_step[0];
                step[2] = move_z - old_step[2];
            }
        } else {
            old_step = self.actors[slot].step;
            let (frame, anim, body) = {
                let actor = &self.actors[slot];
                (actor.frame, actor.anim, actor.body_num)
            };
            let result = self.set_inter_anim_objet(frame, anim, body);
            let actor = &mut self.actors[slot];
            actor.end_frame = result.changed;
            let [move_x, move_z] =
                walk_step(result.step[0], result.step[2], i32::from(actor.beta));
            step[0] = move_x + actor.anim_neg[0] - old_step[0];
            step[2] = move_z + actor.anim_neg[2] - old_step[2];
        }

        {
            let timer = self.timer;
            let handler = &mut self.actors[slot].y_handler;
            if handler.param != 0 {
                if handler.param != -1 {
                    step[1] = handler.evaluate(timer) - old_step[1];
                } else {
                    step[1] = i32::from(handler.new_value) - old_step[1];
                    handler.param = 0;
                    handler.new_value = 0;
                    handler.old_value = 0;
                }
            }
        }

        let touched_before = self.actors[slot].col;

        if step != [0; 3] {
            self.resolve_movement(slot, &mut step, host);
            let actor = &mut self.actors[slot];
            for axis in 0..3 {
                actor.step[axis] = step[axis] + old_step[axis];
            }
            actor.zv.translate(step);
        }

        if self.actors[slot].y_handler.param == 0 {
            let actor = &mut self.actors[slot];
            actor.world[1] += actor.step[1];
            actor.room_pos[1] += actor.step[1];
            actor.step[1] = 0;
            if actor.flags & AF_FALLABLE != 0 {
                let mut probe = actor.zv;
                probe.y2 += 100;
                let airborne = actor.room_pos[1] < -10
                    && hard_collisions(&probe, &self.rooms, actor.room).is_empty();
                if airborne && self.manage_fall(slot, &probe) == 0 {
                    let timer = self.timer;
                    self.actors[slot].y_handler.init(0, 2000, 40, timer);
                } else {
                    self.actors[slot].falling = 0;
                }
            }
        } else {
            let actor = &mut self.actors[slot];
            if actor.y_handler.param != -1 && actor.flags & AF_FALLABLE != 0 {
                actor.falling = 1;
            }
        }

        for touched in touched_before {
            let Ok(index) = usize::try_from(touched) else {
                continue;
            };
            if self.actors[index].flags & AF_MOVABLE != 0
                && !self.actors[slot].col.contains(&touched)
            {
                self.actors[index].flags &= !AF_ANIMATED;
                self.add_actor_to_bg_incrust(index);
            }
        }

        if self.actors[slot].end_frame {
            let actor = &mut self.actors[slot];
            actor.frame += 1;
            if actor.frame >= actor.num_of_frames {
                actor.end_anim = true;
                actor.frame = 0;
                if actor.anim_type & 1 == 0 && actor.new_anim == -1 {
                    actor.anim_type &= !ANIM_UNINTERRUPTABLE;
                    let follow_up = actor.anim_info;
                    self.init_anim(slot, follow_up, 1, -1);
                }
            }
            self.commit_horizontal_step(slot);
        } else {
            let timer = self.timer;
            let actor = &self.actors[slot];
            if actor.anim == -1 && actor.speed != 0 && actor.speed_change.param == 0 {
                self.commit_horizontal_step(slot);
                let actor = &mut self.actors[slot];
                let speed = i32::from(actor.speed);
                actor.speed_change.init(0, speed, 60, timer);
            }
            self.actors[slot].end_anim = false;
        }
    }

    /// Clips `step` against the room's hard collisions and the other actors,
    /// pushing movable actors out of the way.
    fn resolve_movement(&mut self, slot: usize, step: &mut [i32; 3], host: &mut dyn Host) {
        let edition = self.edition;
        let start = self.actors[slot].zv;
        let mut moved = start.translated(*step);

        if self.actors[slot].dyn_flags & 1 != 0 {
            for hard in self.hard_collisions_for(slot, &moved) {
                match hard.kind {
                    9 => self.actors[slot].hard_col = hard.parameter as i16,
                    3 => self.actors[slot].hard_col = 255,
                    _ => {}
                }
                let blocks = edition == Edition::Aitd1
                    || hard.kind != 10
                    || slot as i16 != self.camera_target;
                if blocks && (step[0] != 0 || step[2] != 0) {
                    let obstacle = Zv::from_extents(hard.zv);
                    let [clipped_x, clipped_z] =
                        handle_collision(&start, &moved, &obstacle, [step[0], step[2]]);
                    if edition != Edition::Aitd1 {
                        let actor = &mut self.actors[slot];
                        actor.anim_neg[0] += clipped_x - step[0];
                        actor.anim_neg[2] += clipped_z - step[2];
                    }
                    moved.translate([clipped_x - step[0], 0, clipped_z - step[2]]);
                    step[0] = clipped_x;
                    step[2] = clipped_z;
                }
            }
        } else {
            let blocked = !self.hard_collisions_for(slot, &moved).is_empty();
            self.actors[slot].hard_col = i16::from(blocked);
        }

        let count = self.check_object_collisions(slot, &moved);
        for index in 0..count {
            let touched = self.actors[slot].col[index] as usize;
            self.actors[touched].col_by = slot as i16;

            if self.actors[touched].flags & AF_FOUNDABLE != 0 {
                let picks_up = self.actors[slot].track_mode == 1
                    && edition == Edition::Aitd1
                    && self.cvar(CVar::DeadPerso) == 0;
                if picks_up {
                    let object = self.actors[touched].index_in_world;
                    if let Err(err) = self.found_object(object, 0, host) {
                        warn!("pickup of object {object} failed: {err}");
                    }
                }
                continue;
            }

            let same_room = self.actors[touched].room == self.actors[slot].room;
            let obstacle = if same_room {
                self.actors[touched].zv
            } else {
                relative_position(
                    &self.actors[touched].zv,
                    &self.rooms,
                    self.actors[touched].room,
                    self.actors[slot].room,
                )
            };

            if self.actors[touched].flags & AF_MOVABLE != 0 {
                let pushed = self.actors[touched].zv.translated([step[0], 0, step[2]]);
                let room = self.actors[slot].room;
                let push_possible = hard_collisions(&pushed, &self.rooms, room).is_empty()
                    && self.check_object_collisions(touched, &pushed) == 0;
                if push_possible {
                    self.remove_from_bg_incrust(touched);
                    let target = &mut self.actors[touched];
                    target.flags |= AF_ANIMATED;
                    target.world[0] += step[0];
                    target.world[2] += step[2];
                    target.room_pos[0] += step[0];
                    target.room_pos[2] += step[2];
                    target.zv = pushed;
                } else if step[0] != 0 || step[2] != 0 {
                    [step[0], step[2]] =
                        handle_collision(&start, &moved, &obstacle, [step[0], step[2]]);
                }
            } else if self.actors[slot].dyn_flags & 1 != 0 && (step[0] != 0 || step[2] != 0) {
                [step[0], step[2]] =
                    handle_collision(&start, &moved, &obstacle, [step[0], step[2]]);
            }
        }
    }
}
