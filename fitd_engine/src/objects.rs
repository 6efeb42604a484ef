//! Object lifecycle: instantiating world objects into actor slots, writing
//! them back, and the inventory operations that move objects in and out of
//! the world.

use fitd_formats::{CVar, Edition, WorldObject};
use log::{debug, info, warn};

use crate::error::SimResult;
use crate::host::Host;
use crate::track::{TRACK_FOLLOW, TRACK_SCRIPTED};
use crate::world::{
    AF_ANIMATED, AF_BOXIFY, AF_DRAWABLE, AF_FOUNDABLE, AF_SPECIAL, Actor, FLAG2_DROPPED,
    FLAG2_IN_INVENTORY, Message, NUM_MAX_INVENTORY, NUM_MAX_MESSAGE, World,
};
use crate::zv::{Zv, default_zv, give_zv, room, zv_cube, zv_max, zv_rot};

/// Special effect kinds placed by [`World::init_special_objet`].
pub const SPECIAL_EVAPORATE: i16 = 0;
pub const SPECIAL_BLOOD: i16 = 1;
pub const SPECIAL_DEBRIS: i16 = 2;
pub const SPECIAL_IMPACT: i16 = 3;
pub const SPECIAL_SMOKE: i16 = 4;

/// Seconds (in ticks) a declined pickup stays quiet.
const PICKUP_COOLDOWN: u32 = 300;

impl World {
    /// Places world object `object` into the first free actor slot and
    /// returns the slot, or `None` when the pool is full.
    pub fn copy_object_to_actor(&mut self, object: i16) -> SimResult<Option<usize>> {
        let source = self.object(object)?.clone();
        let Some(slot) = self.free_slot() else {
            warn!("actor pool is full; object {object} stays dormant");
            return Ok(None);
        };
        let position = [source.x, source.y, source.z].map(i32::from);
        let edition = self.edition;
        let timer = self.timer;

        let mut actor = Actor {
            index_in_world: object,
            body_num: source.body,
            flags: (source.flags as u16) & !AF_SPECIAL,
            dyn_flags: 1,
            stage: source.stage,
            room: source.room,
            alpha: source.alpha,
            beta: source.beta,
            gamma: source.gamma,
            anim: source.anim,
            frame: source.frame,
            anim_type: source.anim_type,
            anim_info: source.anim_info,
            chrono: timer,
            room_chrono: timer,
            ..Actor::default()
        };
        actor.set_position(position);
        actor.world = self.to_current_room(source.room, position);
        if edition == Edition::Aitd1 {
            actor.hard_mat = 0;
        }
        self.actors[slot] = actor;

        if source.body != -1 {
            if source.anim != -1 {
                self.set_anim_objet(source.frame, source.anim, source.body);
                let frames = self.frame_count(source.anim);
                let actor = &mut self.actors[slot];
                actor.num_of_frames = frames;
                actor.end_anim = false;
                actor.flags |= AF_ANIMATED;
            } else if self.actors[slot].flags & AF_DRAWABLE == 0 {
                self.actors[slot].flags &= !AF_ANIMATED;
            }
        }

        let body = self.resources.body(source.body);
        let mut offset = position;
        let zv = match (source.type_zv, body) {
            (0, Some(body)) => zv_max(body),
            (1, Some(body)) => give_zv(body),
            (2, Some(body)) => zv_cube(body),
            (3, Some(body)) => zv_rot(body, source.alpha, source.beta, source.gamma),
            (4, _) => match self.hard_zv(source.room, source.found_name) {
                Some(zv) => {
                    offset = [0; 3];
                    let center = [
                        zv.x1 / 2 + zv.x2 / 2,
                        zv.y1 / 2 + zv.y2 / 2,
                        zv.z1 / 2 + zv.z2 / 2,
                    ];
                    let world = self.to_current_room(source.room, center);
                    let actor = &mut self.actors[slot];
                    actor.room_pos = center;
                    actor.world = world;
                    zv
                }
                None => default_zv(),
            },
            (kind, _) => {
                if !(0..=4).contains(&kind) {
                    debug!("object {object}: unknown zv type {kind}");
                }
                default_zv()
            }
        };
        self.actors[slot].zv = zv.translated(offset);
        Ok(Some(slot))
    }

    /// Scenario box of `room_index` tagged with `parameter`.
    fn hard_zv(&self, room_index: i16, parameter: i16) -> Option<Zv> {
        room(&self.rooms, room_index)?
            .hard_cols
            .iter()
            .find(|hard| hard.kind == 9 && hard.parameter == parameter as u16)
            .map(|hard| Zv::from_extents(hard.zv))
    }

    /// Frees an actor slot, writing a bound actor back into its world
    /// object.
    pub fn delete_object(&mut self, slot: usize) {
        let actor = std::mem::take(&mut self.actors[slot]);
        if actor.index_in_world == -2 {
            if actor.anim == SPECIAL_SMOKE {
                self.set_cvar(CVar::FogFlag, 0);
            }
            return;
        }
        let Ok(index) = usize::try_from(actor.index_in_world) else {
            return;
        };
        let edition = self.edition;
        let Some(object) = self.objects.get_mut(index) else {
            warn!("slot {slot} was bound to missing object {index}");
            return;
        };
        let [x, y, z] = actor.stepped_position();
        object.obj_index = -1;
        object.body = actor.body_num;
        object.anim = actor.anim;
        object.frame = actor.frame;
        object.anim_type = actor.anim_type;
        object.anim_info = actor.anim_info;
        object.flags = ((actor.flags & !AF_BOXIFY) | AF_SPECIAL * actor.dyn_flags) as i16;
        object.life = actor.life;
        object.life_mode = actor.life_mode;
        object.track_mode = actor.track_mode;
        if actor.track_mode != 0 {
            object.track_number = actor.track_number;
            object.position_in_track = actor.position_in_track;
            if edition != Edition::Aitd1 {
                object.mark = actor.mark;
            }
        }
        object.x = x as i16;
        object.y = y as i16;
        object.z = z as i16;
        object.alpha = actor.alpha;
        object.beta = actor.beta;
        object.gamma = actor.gamma;
        object.stage = actor.stage;
        object.room = actor.room;
        self.actor_turned_to_obj = true;
    }

    /// Selects the movement controller of the actor in `slot`.
    pub fn set_move_mode(&mut self, slot: usize, mode: i16, number: i16) {
        let actor = &mut self.actors[slot];
        actor.track_mode = mode;
        match mode {
            TRACK_FOLLOW => {
                actor.track_number = number;
                actor.mark = -1;
            }
            TRACK_SCRIPTED => {
                actor.track_number = number;
                actor.position_in_track = 0;
                actor.mark = -1;
            }
            _ => {}
        }
    }

    /// Takes a world object out of the scene: its actor (if any) is moved to
    /// nowhere and it leaves the inventory.
    pub fn remove_world_object(&mut self, object: i16) -> SimResult<()> {
        if let Some(slot) = self.live_slot(object)? {
            let actor = &mut self.actors[slot];
            actor.room = -1;
            actor.stage = -1;
            if actor.flags & AF_BOXIFY != 0 {
                self.remove_from_bg_incrust(slot);
            }
        }
        let target = self.object_mut(object)?;
        target.room = -1;
        target.stage = -1;
        self.delete_inventory_objet(object);
        Ok(())
    }

    pub fn delete_inventory_objet(&mut self, object: i16) {
        let Some(position) = self.inventory.iter().position(|held| *held == object) else {
            return;
        };
        self.inventory.remove(position);
        if let Some(target) = usize::try_from(object)
            .ok()
            .and_then(|index| self.objects.get_mut(index))
        {
            target.flags2 &= !FLAG2_IN_INVENTORY;
        }
    }

    /// Moves `object` into the inventory. The newest item goes second, after
    /// the one taken first.
    pub fn take(&mut self, object: i16, host: &mut dyn Host) -> SimResult<()> {
        self.object(object)?;
        if self.inventory.is_empty() {
            self.inventory.push(object);
        } else {
            self.inventory.insert(1, object);
        }
        self.inventory.truncate(NUM_MAX_INVENTORY);
        self.action = 0x800;
        self.execute_found_life(object, host)?;
        if let Some(slot) = self.live_slot(object)? {
            self.delete_object(slot);
        }
        let target = self.object_mut(object)?;
        target.flags2 &= !FLAG2_DROPPED;
        target.flags2 |= FLAG2_IN_INVENTORY;
        target.room = -1;
        target.stage = -1;
        info!("object {object} taken");
        Ok(())
    }

    /// Offers `object` to the player. `mode` 0 comes from walking into it,
    /// 1 from a script and 2 from a script run as a found-life.
    pub fn found_object(&mut self, object: i16, mode: i16, host: &mut dyn Host) -> SimResult<()> {
        if object < 0 {
            return Ok(());
        }
        let timer = self.timer;
        let target = self.object(object)?;
        if mode != 0 && target.flags2 & (FLAG2_IN_INVENTORY | FLAG2_DROPPED) != 0 {
            return Ok(());
        }
        // A declined object remembers when it was declined in its track
        // number.
        let declined_at = target.track_number;
        if declined_at != 0 && timer.wrapping_sub(declined_at as u16 as u32) < PICKUP_COOLDOWN {
            return Ok(());
        }
        let own_weight = i32::from(target.position_in_track);
        self.object_mut(object)?.track_number = 0;

        let carried: i32 = self
            .inventory
            .iter()
            .filter_map(|held| self.object(*held).ok())
            .map(|held| i32::from(held.position_in_track))
            .sum();
        let can_carry = own_weight + carried <= i32::from(self.cvar(CVar::MaxWeightLoadable))
            && self.inventory.len() + 1 != NUM_MAX_INVENTORY;

        if host.confirm_pickup(object, can_carry) && can_carry {
            self.take(object, host)?;
        } else {
            self.object_mut(object)?.track_number = timer as u16 as i16;
        }
        self.flag_init_view = 1;
        Ok(())
    }

    /// Drops `object` where `at` stands (or is stored when dormant).
    pub fn put_at_objet(&mut self, object: i16, at: i16) -> SimResult<()> {
        let anchor = self.object(at)?.clone();
        let (position, room, stage, angles) = match self.live_slot(at)? {
            Some(slot) => {
                let actor = &self.actors[slot];
                (
                    actor.room_pos,
                    actor.room,
                    actor.stage,
                    [actor.alpha, actor.beta, actor.gamma],
                )
            }
            None => (
                [anchor.x, anchor.y, anchor.z].map(i32::from),
                anchor.room,
                anchor.stage,
                [anchor.alpha, anchor.beta, anchor.gamma],
            ),
        };
        self.delete_inventory_objet(object);

        let mut marked = object;
        if self.live_slot(object)?.is_some() {
            // The actor running the script is moved rather than `object`.
            let slot = self.current_actor;
            let actor = &mut self.actors[slot];
            actor.room_pos = position;
            actor.room = room;
            actor.stage = stage;
            [actor.alpha, actor.beta, actor.gamma] = angles;
            marked = actor.index_in_world;
        } else {
            let target = self.object_mut(object)?;
            target.x = position[0] as i16;
            target.y = position[1] as i16;
            target.z = position[2] as i16;
            target.room = room;
            target.stage = stage;
            [target.alpha, target.beta, target.gamma] = angles;
        }
        let target = self.object_mut(marked)?;
        target.flags2 |= FLAG2_DROPPED;
        target.flags |= AF_FOUNDABLE as i16;
        Ok(())
    }

    /// Places a dormant description of `object` somewhere in the world.
    #[allow(clippy::too_many_arguments)]
    pub fn put(
        &mut self,
        object: i16,
        position: [i16; 3],
        room: i16,
        stage: i16,
        angles: [i16; 3],
    ) -> SimResult<()> {
        let target = self.object_mut(object)?;
        [target.x, target.y, target.z] = position;
        target.room = room;
        target.stage = stage;
        [target.alpha, target.beta, target.gamma] = angles;
        self.delete_inventory_objet(object);
        self.object_mut(object)?.flags2 |= FLAG2_DROPPED;
        Ok(())
    }

    /// Runs the found-life script of `object`, borrowing a spare actor slot
    /// while the object has no actor of its own.
    pub fn execute_found_life(&mut self, object: i16, host: &mut dyn Host) -> SimResult<()> {
        if object == -1 {
            return Ok(());
        }
        let found_life = self.object(object)?.found_life;
        if found_life == -1 {
            return Ok(());
        }
        let previous = self.current_actor;
        let (slot, temporary) = match self.live_slot(object)? {
            Some(slot) => (slot, false),
            None => {
                let Some(spare) = self.actors.iter().rposition(Actor::is_free) else {
                    warn!("no spare slot to run found-life {found_life} of object {object}");
                    return Ok(());
                };
                self.actors[spare] = Actor {
                    index_in_world: object,
                    flags: 0,
                    track_mode: -1,
                    ..Actor::default()
                };
                (spare, true)
            }
        };
        let result = self.process_life(slot, found_life, true, host);
        if temporary {
            self.actors[slot] = Actor::default();
        }
        self.current_actor = previous;
        result
    }

    /// Shows message `text`, restarting its timer if it is already up.
    pub fn make_message(&mut self, text: i16) {
        if let Some(message) = self.messages.iter_mut().find(|message| message.text == text) {
            message.time = 0;
            return;
        }
        if self.messages.len() < NUM_MAX_MESSAGE {
            self.messages.push(Message { text, time: 0 });
        }
    }

    /// Spawns a short-lived effect actor at a room-local point and returns
    /// its slot.
    #[allow(clippy::too_many_arguments)]
    pub fn init_special_objet(
        &mut self,
        kind: i16,
        position: [i32; 3],
        stage: i16,
        room: i16,
        angles: [i16; 3],
        source: Option<Zv>,
    ) -> Option<usize> {
        let slot = self.free_slot()?;
        let [x, y, z] = position;
        let world = self.to_current_room(room, position);
        let zv = match kind {
            SPECIAL_EVAPORATE => Zv {
                x1: x - 10,
                x2: x + 10,
                y1: y,
                y2: y - 1,
                z1: z - 10,
                z2: z + 10,
            },
            SPECIAL_BLOOD | SPECIAL_DEBRIS => Zv {
                x1: x,
                x2: x,
                y1: 0,
                y2: 0,
                z1: z,
                z2: z,
            },
            SPECIAL_IMPACT => Zv::around(position, 0),
            SPECIAL_SMOKE => {
                self.set_cvar(CVar::FogFlag, 1);
                Zv {
                    x1: x - 10,
                    x2: x + 10,
                    y1: y - 200,
                    y2: y - 200,
                    z1: z - 10,
                    z2: z + 10,
                }
            }
            _ => {
                debug!("special object kind {kind} has no volume");
                source.unwrap_or_default()
            }
        };
        self.actors[slot] = Actor {
            index_in_world: -2,
            flags: AF_SPECIAL,
            life: -1,
            life_mode: 2,
            body_num: 0,
            room_pos: position,
            world,
            stage,
            room,
            alpha: angles[0],
            beta: angles[1],
            gamma: angles[2],
            anim: kind,
            zv,
            ..Actor::default()
        };
        self.actor_turned_to_obj = true;
        Some(slot)
    }

    fn keeps_actor_first_generation(&self, actor: &Actor) -> bool {
        if actor.stage != self.current_floor {
            return false;
        }
        if actor.life == -1 {
            return self.is_in_view_list(actor.room);
        }
        match actor.life_mode {
            0 => true,
            1 => actor.room == self.current_room,
            2 => self.is_in_view_list(actor.room),
            _ => false,
        }
    }

    fn keeps_actor_later(&mut self, slot: usize, host: &dyn Host) -> bool {
        let actor = &mut self.actors[slot];
        if actor.life_mode > 0 {
            actor.life_mode &= !4;
        }
        if actor.stage != self.current_floor {
            return false;
        }
        if actor.life == -1 {
            return self.view_list.contains(&actor.room);
        }
        let kept = match actor.life_mode {
            1 => true,
            2 => actor.room == self.current_room,
            3 => self.view_list.contains(&actor.room),
            _ => false,
        };
        if kept {
            return true;
        }
        if actor.body_num != -1 && host.room_in_camera(actor.room) {
            actor.life_mode |= 4;
            return true;
        }
        false
    }

    /// Whether a dormant object should get an actor this tick. May flag the
    /// object as only kept for the camera.
    fn wants_actor(&mut self, index: usize, host: &dyn Host) -> bool {
        let later = self.edition > Edition::Jack;
        let current_floor = self.current_floor;
        let current_room = self.current_room;
        let object: &WorldObject = &self.objects[index];
        if object.stage != current_floor {
            return false;
        }
        if object.life == -1 {
            return self.view_list.contains(&object.room);
        }
        if object.life_mode == -1 {
            return false;
        }
        let mode = if later {
            object.life_mode & 3
        } else {
            object.life_mode
        };
        let wanted = match mode {
            0 => !later,
            1 => later || object.room == current_room,
            2 if later => object.room == current_room,
            2 => self.view_list.contains(&object.room),
            3 if later => self.view_list.contains(&object.room),
            _ => !later,
        };
        if wanted {
            return true;
        }
        if later && object.body != -1 && host.room_in_camera(object.room) {
            self.objects[index].life_mode |= 4;
            return true;
        }
        false
    }

    /// Drops actors that left the simulated area and instantiates world
    /// objects that entered it.
    pub fn update_all_actor_and_objects(&mut self, host: &dyn Host) -> SimResult<()> {
        let later = self.edition > Edition::Jack;
        for slot in 0..self.actors.len() {
            if self.actors[slot].is_free() {
                continue;
            }
            let keep = if later {
                self.keeps_actor_later(slot, host)
            } else {
                let actor = &self.actors[slot];
                self.keeps_actor_first_generation(actor)
            };
            if !keep {
                debug!("slot {slot} leaves the simulation");
                self.delete_object(slot);
            }
        }

        for index in 0..self.objects.len() {
            let object = index as i16;
            let bound = self.objects[index].obj_index;
            if bound != -1 {
                if self.current_world_target == object {
                    self.camera_target = bound;
                }
                continue;
            }
            if !self.wants_actor(index, host) {
                continue;
            }
            let Some(slot) = self.copy_object_to_actor(object)? else {
                continue;
            };
            let source = self.objects[index].clone();
            self.objects[index].obj_index = slot as i16;
            if self.current_world_target == object {
                self.camera_target = slot as i16;
            }
            {
                let actor = &mut self.actors[slot];
                actor.dyn_flags = u16::from(source.flags as u16 & AF_SPECIAL != 0);
                actor.life = source.life;
                actor.life_mode = source.life_mode;
            }
            self.set_move_mode(slot, source.track_mode, source.track_number);
            self.actors[slot].position_in_track = source.position_in_track;
            if later {
                self.actors[slot].mark = source.mark;
            }
            self.actor_turned_to_obj = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitd_formats::{Body, RoomBox, RoomData};

    use crate::host::RecordingHost;

    fn body() -> Body {
        Body {
            flags: 0,
            zv: [-100, 100, -1000, 0, -50, 50],
            scratch_size: 0,
            vertices: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn world(edition: Edition) -> World {
        let mut world = World::new(edition);
        world.rooms = vec![
            RoomData::default(),
            RoomData {
                world: [10, 0, 0],
                ..RoomData::default()
            },
        ];
        world.resources.bodies.insert(1, body());
        world.view_list = vec![0];
        world.objects = (0..4)
            .map(|_| WorldObject {
                body: 1,
                type_zv: 1,
                stage: 0,
                room: 0,
                obj_index: -1,
                life: -1,
                found_life: -1,
                life_mode: -1,
                x: 500,
                y: 0,
                z: 200,
                flags: AF_SPECIAL as i16,
                ..WorldObject::default()
            })
            .collect();
        world
    }

    #[test]
    fn instantiated_actor_box_follows_position() {
        let mut world = world(Edition::Aitd1);
        let slot = world.copy_object_to_actor(2).unwrap().unwrap();
        let actor = &world.actors[slot];
        assert_eq!(actor.index_in_world, 2);
        assert_eq!(actor.room_pos, [500, 0, 200]);
        assert_eq!(actor.zv, Zv::from_extents([400, 600, -1000, 0, 150, 250]));
        assert_eq!(actor.flags & AF_SPECIAL, 0);
        assert_eq!(actor.dyn_flags, 1);
    }

    #[test]
    fn zv_type_picks_the_footprint() {
        let mut world = world(Edition::Aitd1);
        world.objects[0].type_zv = 0;
        world.objects[1].type_zv = 2;
        world.objects[2].body = -1;

        let slot = world.copy_object_to_actor(0).unwrap().unwrap();
        assert_eq!(
            world.actors[slot].zv,
            Zv::from_extents([400, 600, -1000, 0, 100, 300])
        );
        let slot = world.copy_object_to_actor(1).unwrap().unwrap();
        assert_eq!(
            world.actors[slot].zv,
            Zv::from_extents([425, 575, -1000, 0, 125, 275])
        );
        let slot = world.copy_object_to_actor(2).unwrap().unwrap();
        assert_eq!(
            world.actors[slot].zv,
            Zv::from_extents([400, 600, -2000, 0, 100, 300])
        );
    }

    #[test]
    fn scenario_box_becomes_actor_volume() {
        let mut world = world(Edition::Aitd1);
        world.rooms[0].hard_cols.push(RoomBox {
            zv: [100, 300, -200, 0, 1000, 1400],
            parameter: 6,
            kind: 9,
        });
        world.objects[0].type_zv = 4;
        world.objects[0].found_name = 6;
        let slot = world.copy_object_to_actor(0).unwrap().unwrap();
        let actor = &world.actors[slot];
        assert_eq!(actor.room_pos, [200, -100, 1200]);
        assert_eq!(actor.zv, Zv::from_extents([100, 300, -200, 0, 1000, 1400]));
    }

    #[test]
    fn delete_writes_back_stepped_position() {
        let mut world = world(Edition::Jack);
        let slot = world.copy_object_to_actor(1).unwrap().unwrap();
        world.objects[1].obj_index = slot as i16;
        {
            let actor = &mut world.actors[slot];
            actor.step = [5, 0, -5];
            actor.flags |= AF_BOXIFY;
            actor.track_mode = TRACK_SCRIPTED;
            actor.track_number = 4;
            actor.position_in_track = 6;
            actor.mark = 2;
        }
        world.delete_object(slot);
        assert!(world.actors[slot].is_free());
        let object = &world.objects[1];
        assert_eq!(object.obj_index, -1);
        assert_eq!((object.x, object.z), (505, 195));
        assert_eq!(object.flags as u16 & AF_BOXIFY, 0);
        assert_ne!(object.flags as u16 & AF_SPECIAL, 0);
        assert_eq!((object.track_number, object.position_in_track, object.mark), (4, 6, 2));
    }

    #[test]
    fn smoke_clears_fog_when_removed() {
        let mut world = world(Edition::Aitd1);
        let slot = world
            .init_special_objet(SPECIAL_SMOKE, [0, 0, 0], 0, 0, [0; 3], None)
            .unwrap();
        assert_eq!(world.cvar(CVar::FogFlag), 1);
        assert_eq!(world.actors[slot].index_in_world, -2);
        world.delete_object(slot);
        assert_eq!(world.cvar(CVar::FogFlag), 0);
        assert!(world.actors[slot].is_free());
    }

    #[test]
    fn first_generation_population_rules() {
        let mut world = world(Edition::Aitd1);
        let host = RecordingHost::new();
        world.objects[0].life = 3;
        world.objects[0].life_mode = 1;
        world.objects[0].room = 1;
        world.objects[1].life = 3;
        world.objects[1].life_mode = 0;
        world.objects[1].room = 1;
        world.objects[2].room = 1;
        world.objects[3].stage = 2;
        world.current_world_target = 1;
        world.update_all_actor_and_objects(&host).unwrap();
        assert_eq!(world.objects[0].obj_index, -1);
        assert_eq!(world.objects[1].obj_index, 0);
        assert_eq!(world.objects[2].obj_index, -1);
        assert_eq!(world.objects[3].obj_index, -1);
        assert_eq!(world.camera_target, 0);
        assert_eq!(world.actors[0].life, 3);

        world.actors[0].stage = 5;
        world.update_all_actor_and_objects(&host).unwrap();
        assert!(world.actors[0].is_free());
        assert_eq!(world.objects[1].stage, 5);
    }

    #[test]
    fn later_editions_keep_visible_bodies() {
        let mut world = world(Edition::Aitd2);
        let mut host = RecordingHost::new();
        host.viewed = vec![1];
        world.objects[0].life = 3;
        world.objects[0].life_mode = 2;
        world.objects[0].room = 1;
        for object in &mut world.objects[1..] {
            object.stage = 3;
        }
        world.update_all_actor_and_objects(&host).unwrap();
        let slot = world.objects[0].obj_index;
        assert_eq!(slot, 0);
        assert_eq!(world.actors[0].life_mode, 2 | 4);

        host.viewed.clear();
        world.update_all_actor_and_objects(&host).unwrap();
        assert!(world.actors[0].is_free());
        assert_eq!(world.objects[0].life_mode & 3, 2);
    }

    #[test]
    fn taking_moves_object_into_inventory() {
        let mut world = world(Edition::Aitd1);
        let mut host = RecordingHost::new();
        world.inventory = vec![3];
        world.objects[2].flags2 = FLAG2_DROPPED;
        let slot = world.copy_object_to_actor(2).unwrap().unwrap();
        world.objects[2].obj_index = slot as i16;
        world.take(2, &mut host).unwrap();
        assert_eq!(world.inventory, vec![3, 2]);
        assert!(world.actors[slot].is_free());
        let object = &world.objects[2];
        assert_eq!(object.flags2, FLAG2_IN_INVENTORY);
        assert_eq!((object.room, object.stage), (-1, -1));
        assert_eq!(world.action, 0x800);

        world.delete_inventory_objet(2);
        assert_eq!(world.inventory, vec![3]);
        assert_eq!(world.objects[2].flags2, 0);
    }

    #[test]
    fn pickup_respects_weight_and_remembers_refusal() {
        let mut world = world(Edition::Aitd1);
        let mut host = RecordingHost::new();
        world.set_cvar(CVar::MaxWeightLoadable, 10);
        world.objects[1].position_in_track = 6;
        world.objects[2].position_in_track = 6;
        world.inventory = vec![1];
        world.timer = 1000;
        world.found_object(2, 1, &mut host).unwrap();
        assert_eq!(world.inventory, vec![1]);
        assert_eq!(world.objects[2].track_number, 1000);
        assert_eq!(
            host.events.last(),
            Some(&crate::host::HostEvent::Pickup {
                object: 2,
                taken: false
            })
        );

        world.timer = 1100;
        world.found_object(2, 1, &mut host).unwrap();
        assert_eq!(host.events.len(), 1);

        world.objects[2].position_in_track = 4;
        world.timer = 1400;
        world.found_object(2, 1, &mut host).unwrap();
        assert_eq!(world.inventory, vec![1, 2]);
        assert_eq!(world.flag_init_view, 1);
    }

    #[test]
    fn put_at_copies_anchor_placement() {
        let mut world = world(Edition::Aitd1);
        world.objects[3] = WorldObject {
            obj_index: -1,
            x: -40,
            y: 0,
            z: 70,
            room: 1,
            stage: 0,
            beta: 0x100,
            ..WorldObject::default()
        };
        world.inventory = vec![0];
        world.objects[0].flags2 = FLAG2_IN_INVENTORY;
        world.put_at_objet(0, 3).unwrap();
        let object = &world.objects[0];
        assert_eq!((object.x, object.z, object.room, object.beta), (-40, 70, 1, 0x100));
        assert_eq!(object.flags2, FLAG2_DROPPED);
        assert_ne!(object.flags as u16 & AF_FOUNDABLE, 0);
        assert!(world.inventory.is_empty());
    }

    #[test]
    fn messages_refresh_and_cap() {
        let mut world = world(Edition::Aitd1);
        for text in 0..7 {
            world.make_message(text);
        }
        assert_eq!(world.messages.len(), NUM_MAX_MESSAGE);
        world.messages[2].time = 40;
        world.make_message(2);
        assert_eq!(world.messages[2].time, 0);
    }

    #[test]
    fn move_modes_reset_track_state() {
        let mut world = world(Edition::Aitd1);
        world.actors[0].index_in_world = 0;
        world.actors[0].position_in_track = 9;
        world.set_move_mode(0, TRACK_SCRIPTED, 3);
        assert_eq!(
            (world.actors[0].track_number, world.actors[0].position_in_track),
            (3, 0)
        );
        world.set_move_mode(0, TRACK_FOLLOW, 1);
        assert_eq!(world.actors[0].track_number, 1);
        assert_eq!(world.actors[0].mark, -1);
    }
}
