//! Per-tick combat and throw state machines.
//!
//! `HIT`, `FIRE`, `THROW` and `HIT_OBJECT` only arm an action on the actor;
//! the work happens here, one stage per tick, once the arming animation
//! reaches its trigger frame.

use fitd_formats::CVar;
use log::{debug, trace};

use crate::error::SimResult;
use crate::host::Host;
use crate::objects::{SPECIAL_DEBRIS, SPECIAL_IMPACT};
use crate::world::{
    AF_ANIMATED, AF_BOXIFY, AF_DRAWABLE, AF_FOUNDABLE, AF_SPECIAL, FLAG2_DROPPED, FLAG2_THROWN,
    World,
};
use crate::zv::{Zv, default_zv, give_zv, hard_collisions, relative_position, scene_zone_at, turn};

pub const ACTION_NONE: i16 = 0;
pub const WAIT_HIT_ANIM: i16 = 1;
pub const HIT_READY: i16 = 2;
pub const WAIT_FIRE_ANIM: i16 = 4;
pub const FIRE_SHOT: i16 = 5;
pub const WAIT_THROW_ANIM: i16 = 6;
pub const THROW_RELEASE: i16 = 7;
pub const HIT_OBJECT: i16 = 8;
pub const THROW_FLIGHT: i16 = 9;
pub const WAIT_HIT_FRAME: i16 = 10;

/// Shots give up beyond this coordinate.
const PROJECTION_LIMIT: i32 = 20000;
/// Probes a throw checks per tick along its path.
const FLIGHT_PROBES: i32 = 200;
/// Positions tried when settling a stopped throw.
const LANDING_PROBES: i32 = 400;
const THROW_SPEED: i16 = 3000;

impl World {
    /// Recomputes the actor's hot point from the first vertex of bone group
    /// `hot_point_id`, turned by the actor's orientation.
    pub fn refresh_hot_point(&mut self, slot: usize) {
        let actor = &self.actors[slot];
        let Ok(group) = usize::try_from(actor.hot_point_id) else {
            return;
        };
        let vertex = self
            .resources
            .body(actor.body_num)
            .and_then(|body| {
                body.groups
                    .get(group)
                    .and_then(|group| body.vertices.get(usize::from(group.start_vertex)))
            })
            .copied();
        match vertex {
            Some(vertex) => {
                let point = turn(vertex.map(i32::from), actor.alpha, actor.beta, actor.gamma);
                self.actors[slot].hot_point = point;
            }
            None => debug!(
                "slot {slot}: body {} has no hot point {group}",
                actor.body_num
            ),
        }
    }

    /// Advances the pending action of the actor in `slot` by one stage.
    pub fn gere_frappe(&mut self, slot: usize, host: &mut dyn Host) -> SimResult<()> {
        if self.actors[slot].action_type != ACTION_NONE {
            self.refresh_hot_point(slot);
        }
        let actor = &mut self.actors[slot];
        let on_action_anim = actor.anim == actor.action_anim;
        let on_action_frame = actor.frame == actor.action_frame;
        let stage = actor.action_type;
        trace!("slot {slot}: action stage {stage}");
        match stage {
            WAIT_HIT_ANIM | WAIT_HIT_FRAME => {
                if !on_action_anim {
                    actor.action_type = ACTION_NONE;
                } else if on_action_frame {
                    actor.action_type = HIT_READY;
                } else {
                    actor.action_type = WAIT_HIT_FRAME;
                }
            }
            HIT_READY => {
                if !on_action_anim {
                    actor.action_type = ACTION_NONE;
                }
                let reach = i32::from(actor.action_param);
                let point = self.hot_point_position(slot, true);
                self.strike(slot, Zv::around(point, reach), true);
            }
            WAIT_FIRE_ANIM => {
                if on_action_anim && on_action_frame {
                    actor.action_type = FIRE_SHOT;
                }
            }
            FIRE_SHOT => self.fire(slot),
            WAIT_THROW_ANIM => {
                if on_action_anim {
                    self.throw_leaves_hand(slot, on_action_frame)?;
                }
            }
            THROW_RELEASE => self.release_throw(slot)?,
            HIT_OBJECT => {
                let zv = actor.zv;
                let reach = Zv {
                    x1: zv.x1 - 10,
                    x2: zv.x2 + 10,
                    y1: zv.y1 - 10,
                    y2: zv.y2 + 10,
                    z1: zv.z1 - 10,
                    z2: zv.z2 + 10,
                };
                self.actors[slot].hot_point = [0; 3];
                self.strike(slot, reach, false);
            }
            THROW_FLIGHT => self.throw_flight(slot, host)?,
            other => debug!("slot {slot}: action type {other} has no handler"),
        }
        Ok(())
    }

    fn hot_point_position(&self, slot: usize, stepped: bool) -> [i32; 3] {
        let actor = &self.actors[slot];
        let base = if stepped {
            actor.stepped_position()
        } else {
            actor.room_pos
        };
        [
            base[0] + actor.hot_point[0],
            base[1] + actor.hot_point[1],
            base[2] + actor.hot_point[2],
        ]
    }

    /// Marks every actor inside `reach` as hit by `slot`. With `stop_on_body`
    /// the action ends at the first animated victim.
    fn strike(&mut self, slot: usize, reach: Zv, stop_on_body: bool) {
        let count = self.check_object_collisions(slot, &reach);
        let force = self.actors[slot].hit_force;
        for index in 0..count {
            let victim = self.actors[slot].col[index];
            self.actors[slot].hit = victim;
            let target = &mut self.actors[victim as usize];
            target.hit_by = slot as i16;
            target.hit_force = force;
            if stop_on_body && target.flags & AF_ANIMATED != 0 {
                self.actors[slot].action_type = ACTION_NONE;
                return;
            }
        }
    }

    fn fire(&mut self, slot: usize) {
        let origin = self.hot_point_position(slot, false);
        let actor = &self.actors[slot];
        let (stage, room, beta, zv) = (actor.stage, actor.room, actor.beta, actor.zv);
        let reach = i32::from(actor.action_param);
        self.init_special_objet(SPECIAL_IMPACT, origin, stage, room, [0, beta, 0], Some(zv));

        let (touched, end) =
            self.check_line_projection(slot, origin, i32::from(beta) - 0x100, room, reach);
        self.init_special_objet(
            SPECIAL_DEBRIS,
            end,
            stage,
            room,
            [0, beta.wrapping_neg(), 0],
            Some(zv),
        );
        if let Some(victim) = touched {
            let force = self.actors[slot].hit_force;
            let shooter = &mut self.actors[slot];
            shooter.hot_point = [
                end[0] - shooter.room_pos[0],
                end[1] - shooter.room_pos[1],
                end[2] - shooter.room_pos[2],
            ];
            shooter.hit = victim as i16;
            let target = &mut self.actors[victim];
            target.hit_by = slot as i16;
            target.hit_force = force;
        }
        self.actors[slot].action_type = ACTION_NONE;
    }

    /// Sweeps a box of half-size `reach` from `origin` along `beta` until it
    /// meets a wall, leaves the map or overlaps an actor. Returns the actor
    /// hit and the last clear point on the path.
    pub fn check_line_projection(
        &self,
        slot: usize,
        origin: [i32; 3],
        beta: i32,
        room: i16,
        reach: i32,
    ) -> (Option<usize>, [i32; 3]) {
        let [delta_x, delta_z] = crate::math::walk_step(reach * 2, 0, beta);
        if delta_x == 0 && delta_z == 0 {
            return (None, origin);
        }
        let mut probe = Zv::around(origin, reach);
        let [mut x, y, mut z] = origin;
        loop {
            probe.translate([delta_x, 0, delta_z]);
            let last = [x, y, z];
            x += delta_x;
            z += delta_z;
            if !(-PROJECTION_LIMIT..=PROJECTION_LIMIT).contains(&x)
                || !(-PROJECTION_LIMIT..=PROJECTION_LIMIT).contains(&z)
            {
                return (None, last);
            }
            if !hard_collisions(&probe, &self.rooms, room).is_empty() {
                return (None, last);
            }
            let victim = self.actors.iter().enumerate().position(|(index, other)| {
                index != slot
                    && !other.is_free()
                    && other.flags & AF_SPECIAL == 0
                    && relative_position(&probe, &self.rooms, room, other.room)
                        .collides(&other.zv)
            });
            if victim.is_some() {
                return (victim, last);
            }
        }
    }

    /// Waiting for the throw frame: the object drops back at the thrower's
    /// feet when it would start inside a wall, otherwise it leaves the
    /// inventory at the hot point once the frame is reached.
    fn throw_leaves_hand(&mut self, slot: usize, on_action_frame: bool) -> SimResult<()> {
        let object = self.actors[slot].action_param;
        let point = self.hot_point_position(slot, true);
        let body = self.object(object)?.body;
        let reach = self
            .resources
            .body(body)
            .map(give_zv)
            .unwrap_or_else(default_zv)
            .translated(point);
        let room = self.actors[slot].room;
        if !hard_collisions(&reach, &self.rooms, room).is_empty() {
            self.actors[slot].action_type = ACTION_NONE;
            let owner = self.actors[slot].index_in_world;
            return self.put_at_objet(object, owner);
        }
        if !on_action_frame {
            return Ok(());
        }
        self.actors[slot].action_type = THROW_RELEASE;
        self.delete_inventory_objet(object);
        let actor = &self.actors[slot];
        let (stage, alpha, beta) = (actor.stage, actor.alpha, actor.beta);
        let thrown = self.object_mut(object)?;
        [thrown.x, thrown.y, thrown.z] = point.map(|axis| axis as i16);
        thrown.room = room;
        thrown.stage = stage;
        thrown.alpha = alpha;
        thrown.beta = beta.wrapping_add(0x200);
        thrown.flags2 &= !FLAG2_DROPPED;
        thrown.flags |= (AF_ANIMATED | AF_DRAWABLE | AF_FOUNDABLE) as i16;
        thrown.flags &= !(AF_SPECIAL as i16);
        Ok(())
    }

    /// Launches the thrown object's actor from the hot point.
    fn release_throw(&mut self, slot: usize) -> SimResult<()> {
        self.actors[slot].action_type = ACTION_NONE;
        let point = self.hot_point_position(slot, true);
        let object = self.actors[slot].action_param;
        let Some(projectile) = self.live_slot(object)? else {
            debug!("thrown object {object} has no actor yet");
            return Ok(());
        };
        let thrower = self.actors[slot].index_in_world;
        let force = self.actors[slot].hit_force;
        let timer = self.timer;
        let world = self.to_current_room(self.actors[projectile].room, point);
        let zv = self
            .resources
            .body(self.actors[projectile].body_num)
            .map(give_zv)
            .unwrap_or_else(default_zv)
            .translated(point);

        let actor = &mut self.actors[projectile];
        actor.room_pos = point;
        actor.world = world;
        actor.zv = zv;
        actor.flags |= AF_ANIMATED;
        actor.flags &= !AF_BOXIFY;
        actor.dyn_flags = 0;
        actor.action_type = THROW_FLIGHT;
        actor.action_param = 100;
        actor.hit_force = force;
        actor.hot_point_id = -1;
        actor.speed = THROW_SPEED;
        actor.speed_change.init(0, i32::from(THROW_SPEED), 60, timer);

        let record = self.object_mut(object)?;
        [record.x, record.y, record.z] = point.map(|axis| axis as i16);
        // In flight, alpha remembers who threw the object.
        record.alpha = thrower;
        Ok(())
    }

    /// Scans the ground the projectile covered since last tick for actors,
    /// exits and walls.
    fn throw_flight(&mut self, slot: usize, host: &mut dyn Host) -> SimResult<()> {
        let object = self.actors[slot].index_in_world;
        let record = self.object(object)?;
        let (start, thrower) = ([record.x, record.y, record.z].map(i32::from), record.alpha);
        let reverse = self
            .edition
            .cvar_index(CVar::ReverseObject)
            .map(|_| self.cvar(CVar::ReverseObject));

        let actor = &self.actors[slot];
        let mut current = actor.stepped_position();
        let local = actor.zv.translated(current.map(|axis| -axis));
        let (beta, room) = (actor.beta, actor.room);

        for probe_index in 0..FLIGHT_PROBES {
            let [dx, dz] = crate::math::walk_step(0, -100 * probe_index, i32::from(beta));
            let point = [start[0] + dx, start[1], start[2] + dz];
            let probe = Zv::around(point, 200);

            let count = self.check_object_collisions(slot, &probe);
            if count > 0 {
                self.actors[slot].hot_point = [0; 3];
                let force = self.actors[slot].hit_force;
                for index in 0..count {
                    let victim = self.actors[slot].col[index] as usize;
                    let victim_object = self.actors[victim].index_in_world;
                    if victim_object == thrower {
                        return self.store_flight_position(object, current);
                    }
                    if Some(victim_object) == reverse {
                        self.deflect(slot, object, start, local)?;
                        return Ok(());
                    }
                    self.actors[slot].hit = victim as i16;
                    let target = &mut self.actors[victim];
                    target.hit_by = slot as i16;
                    target.hit_force = force;
                }
                host.play_sample(self.cvar(CVar::SampleChoc));
                return self.throw_stopped_at(slot, start[0], start[2]);
            }

            let exit = scene_zone_at(point, &self.rooms, room)
                .is_some_and(|zone| zone.kind == 0 || zone.kind == 10);
            if exit {
                host.play_sample(self.cvar(CVar::SampleChoc));
                return self.throw_stopped_at(slot, start[0], start[2]);
            }

            if !hard_collisions(&probe, &self.rooms, room).is_empty() {
                self.actors[slot].hot_point = [0; 3];
                host.play_sample(self.cvar(CVar::SampleChoc));
                return self.throw_stopped_at(slot, start[0], start[2]);
            }

            let zv = self.actors[slot].zv;
            let reached = zv.x1 - 100 <= point[0]
                && zv.x2 + 100 >= point[0]
                && zv.z1 - 100 <= point[2]
                && zv.z2 + 100 >= point[2];
            if reached {
                break;
            }
        }
        current = self.actors[slot].stepped_position();
        self.store_flight_position(object, current)
    }

    fn store_flight_position(&mut self, object: i16, position: [i32; 3]) -> SimResult<()> {
        let record = self.object_mut(object)?;
        [record.x, record.y, record.z] = position.map(|axis| axis as i16);
        Ok(())
    }

    /// Sends the projectile back the way it came after it met the reverse
    /// object.
    fn deflect(&mut self, slot: usize, object: i16, start: [i32; 3], local: Zv) -> SimResult<()> {
        let reverse = self.cvar(CVar::ReverseObject);
        let world = self.to_current_room(self.actors[slot].room, start);
        let actor = &mut self.actors[slot];
        actor.beta = actor.beta.wrapping_add(0x200);
        actor.room_pos = start;
        actor.world = world;
        actor.step[0] = 0;
        actor.step[2] = 0;
        actor.zv = local.translated(start);
        let ytemp = actor.room_pos[1] + actor.step[1];
        let record = self.object_mut(object)?;
        record.alpha = reverse;
        [record.x, record.y, record.z] = [start[0], ytemp, start[2]].map(|axis| axis as i16);
        Ok(())
    }

    /// Settles a stopped projectile on free ground, backing off from `(x, z)`
    /// against its heading, and turns it back into a pickable object.
    pub fn throw_stopped_at(&mut self, slot: usize, x: i32, z: i32) -> SimResult<()> {
        let actor = &self.actors[slot];
        let local = self
            .resources
            .body(actor.body_num)
            .map(give_zv)
            .unwrap_or_else(default_zv);
        let (beta, room) = (actor.beta, actor.room);
        let mut position = [x, actor.room_pos[1] / 2000 * 2000, z];
        let mut step = 0;
        let mut settled = false;
        for _ in 0..LANDING_PROBES {
            let [dx, dz] = crate::math::walk_step(0, -step, i32::from(beta) + 0x200);
            position[0] = x + dx;
            position[2] = z + dz;
            let spot = local.translated(position);
            if !hard_collisions(&spot, &self.rooms, room).is_empty() {
                step += 100;
                continue;
            }
            // Below ground level, a spot with a ceiling just above it is
            // unreachable; try the floor above.
            if position[1] < -500
                && hard_collisions(&spot.translated([0, 100, 0]), &self.rooms, room).is_empty()
            {
                position[1] += 2000;
                continue;
            }
            settled = true;
            break;
        }
        if !settled {
            debug!("slot {slot}: no free ground found for the thrown object");
        }

        let world = self.to_current_room(room, position);
        let actor = &mut self.actors[slot];
        actor.room_pos = position;
        actor.world = world;
        actor.step[0] = 0;
        actor.step[2] = 0;
        actor.action_type = ACTION_NONE;
        actor.speed = 0;
        actor.gamma = 0;
        actor.zv = local.translated(position);
        let object = actor.index_in_world;
        let record = self.object_mut(object)?;
        record.flags2 |= FLAG2_DROPPED;
        record.flags2 &= !FLAG2_THROWN;
        self.add_actor_to_bg_incrust(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitd_formats::{Body, BodyGroup, BoneState, Edition, RoomBox, RoomData, WorldObject};

    use crate::host::RecordingHost;
    use crate::world::Actor;

    fn world() -> World {
        let mut world = World::new(Edition::Aitd1);
        world.rooms = vec![RoomData::default()];
        world.objects = (0..4)
            .map(|index| WorldObject {
                obj_index: -1,
                body: -1,
                found_life: -1,
                stage: 0,
                room: 0,
                x: index * 10,
                ..WorldObject::default()
            })
            .collect();
        world
    }

    fn place(world: &mut World, slot: usize, object: i16, position: [i32; 3]) {
        world.objects[object as usize].obj_index = slot as i16;
        world.actors[slot] = Actor {
            index_in_world: object,
            stage: 0,
            room: 0,
            room_pos: position,
            world: position,
            zv: Zv::around(position, 100),
            ..Actor::default()
        };
    }

    #[test]
    fn hit_waits_for_its_frame_then_strikes() {
        let mut world = world();
        let mut host = RecordingHost::new();
        place(&mut world, 0, 0, [0, 0, 0]);
        place(&mut world, 1, 1, [150, 0, 0]);
        world.actors[1].flags = AF_ANIMATED;
        let attacker = &mut world.actors[0];
        attacker.anim = 5;
        attacker.action_anim = 5;
        attacker.action_frame = 2;
        attacker.action_type = WAIT_HIT_ANIM;
        attacker.action_param = 60;
        attacker.hit_force = 12;
        attacker.hot_point = [0, 0, 0];

        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].action_type, WAIT_HIT_FRAME);

        world.actors[0].frame = 2;
        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].action_type, HIT_READY);

        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].hit, 1);
        assert_eq!(world.actors[1].hit_by, 0);
        assert_eq!(world.actors[1].hit_force, 12);
        assert_eq!(world.actors[0].action_type, ACTION_NONE);
    }

    #[test]
    fn changing_animation_cancels_hit() {
        let mut world = world();
        let mut host = RecordingHost::new();
        place(&mut world, 0, 0, [0, 0, 0]);
        let attacker = &mut world.actors[0];
        attacker.anim = 4;
        attacker.action_anim = 5;
        attacker.action_type = WAIT_HIT_FRAME;
        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].action_type, ACTION_NONE);
    }

    #[test]
    fn shot_travels_until_it_meets_an_actor() {
        let mut world = world();
        let mut host = RecordingHost::new();
        place(&mut world, 0, 0, [0, 0, 0]);
        place(&mut world, 1, 1, [1000, 0, 0]);
        let shooter = &mut world.actors[0];
        shooter.beta = 0x100;
        shooter.action_type = FIRE_SHOT;
        shooter.action_param = 50;
        shooter.hit_force = 30;

        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].hit, 1);
        assert_eq!(world.actors[1].hit_by, 0);
        assert_eq!(world.actors[1].hit_force, 30);
        assert_eq!(world.actors[0].hot_point, [800, 0, 0]);
        assert_eq!(world.actors[0].action_type, ACTION_NONE);
        let effects: Vec<i16> = world
            .actors
            .iter()
            .filter(|actor| actor.index_in_world == -2)
            .map(|actor| actor.anim)
            .collect();
        assert_eq!(effects, vec![SPECIAL_IMPACT, SPECIAL_DEBRIS]);
    }

    #[test]
    fn shot_into_the_void_stops_at_the_map_edge() {
        let mut world = world();
        place(&mut world, 0, 0, [0, 0, 0]);
        let (touched, end) = world.check_line_projection(0, [0, 0, 0], 0, 0, 50);
        assert_eq!(touched, None);
        assert_eq!(end, [20000, 0, 0]);
    }

    #[test]
    fn shot_stops_at_walls() {
        let mut world = world();
        world.rooms[0].hard_cols.push(RoomBox {
            zv: [500, 600, -1000, 1000, -1000, 1000],
            parameter: 0,
            kind: 1,
        });
        place(&mut world, 0, 0, [0, 0, 0]);
        place(&mut world, 1, 1, [1000, 0, 0]);
        let (touched, end) = world.check_line_projection(0, [0, 0, 0], 0, 0, 50);
        assert_eq!(touched, None);
        assert_eq!(end, [400, 0, 0]);
    }

    #[test]
    fn thrown_object_leaves_the_inventory_on_its_frame() {
        let mut world = world();
        let mut host = RecordingHost::new();
        place(&mut world, 0, 0, [100, 0, 100]);
        world.inventory = vec![2];
        world.objects[2].flags2 = crate::world::FLAG2_IN_INVENTORY | FLAG2_DROPPED;
        world.objects[2].flags = AF_SPECIAL as i16;
        let thrower = &mut world.actors[0];
        thrower.anim = 3;
        thrower.action_anim = 3;
        thrower.frame = 4;
        thrower.action_frame = 4;
        thrower.action_type = WAIT_THROW_ANIM;
        thrower.action_param = 2;
        thrower.hot_point = [0, -500, 0];
        thrower.beta = 0x80;

        world.gere_frappe(0, &mut host).unwrap();
        assert_eq!(world.actors[0].action_type, THROW_RELEASE);
        assert!(world.inventory.is_empty());
        let thrown = &world.objects[2];
        assert_eq!([thrown.x, thrown.y, thrown.z], [100, -500, 100]);
        assert_eq!(thrown.beta, 0x280);
        assert_eq!(thrown.flags2 & FLAG2_DROPPED, 0);
        assert_eq!(thrown.flags & AF_SPECIAL as i16, 0);
        assert_ne!(thrown.flags & AF_FOUNDABLE as i16, 0);
    }

    #[test]
    fn release_launches_the_projectile_actor() {
        let mut world = world();
        let mut host = RecordingHost::new();
        place(&mut world, 0, 0, [0, 0, 0]);
        place(&mut world, 1, 2, [0, 0, 0]);
        let thrower = &mut world.actors[0];
        thrower.action_type = THROW_RELEASE;
        thrower.action_param = 2;
        thrower.hit_force = 9;
        thrower.hot_point = [10, -300, 20];

        world.gere_frappe(0, &mut host).unwrap();
        let projectile = &world.actors[1];
        assert_eq!(projectile.room_pos, [10, -300, 20]);
        assert_eq!(projectile.action_type, THROW_FLIGHT);
        assert_eq!(projectile.speed, THROW_SPEED);
        assert_eq!(projectile.hit_force, 9);
        assert_eq!(projectile.zv, Zv::from_extents([-90, 110, -2300, -300, -80, 120]));
        assert_eq!(world.objects[2].alpha, 0);
        assert_eq!(world.actors[0].action_type, ACTION_NONE);
    }

    #[test]
    fn projectile_hitting_a_wall_lands_back_on_its_path() {
        let mut world = world();
        let mut host = RecordingHost::new();
        world.set_cvar(CVar::SampleChoc, 33);
        world.rooms[0].hard_cols.push(RoomBox {
            zv: [-1000, 1000, -1000, 1000, -700, -600],
            parameter: 0,
            kind: 1,
        });
        place(&mut world, 1, 2, [0, 0, -1000]);
        world.objects[2].x = 0;
        world.objects[2].flags2 = FLAG2_THROWN;
        world.objects[2].alpha = 0;
        world.actors[1].action_type = THROW_FLIGHT;

        world.gere_frappe(1, &mut host).unwrap();
        assert_eq!(host.samples(), vec![33]);
        let projectile = &world.actors[1];
        assert_eq!(projectile.room_pos, [0, 0, 0]);
        assert_eq!(projectile.action_type, ACTION_NONE);
        assert_eq!(projectile.speed, 0);
        assert_ne!(projectile.flags & AF_BOXIFY, 0);
        assert_eq!(world.objects[2].flags2, FLAG2_DROPPED);
    }

    #[test]
    fn hot_point_follows_bone_group_vertex() {
        let mut world = world();
        world.resources.bodies.insert(
            4,
            Body {
                flags: 2,
                zv: [0; 6],
                scratch_size: 0,
                vertices: vec![[0, 0, 0], [15, -600, 40]],
                groups: vec![
                    BodyGroup {
                        start_vertex: 0,
                        vertex_count: 1,
                        base_vertex: 0,
                        parent: -1,
                        index: 0,
                        state: BoneState::default(),
                    },
                    BodyGroup {
                        start_vertex: 1,
                        vertex_count: 1,
                        base_vertex: 0,
                        parent: 0,
                        index: 1,
                        state: BoneState::default(),
                    },
                ],
            },
        );
        place(&mut world, 0, 0, [0, 0, 0]);
        world.actors[0].body_num = 4;
        world.actors[0].hot_point_id = 1;
        world.refresh_hot_point(0);
        assert_eq!(world.actors[0].hot_point, [15, -600, 40]);
    }
}
