use std::collections::BTreeMap;

use fitd_formats::{Animation, Body, CVar, Edition, RoomData, WorldObject};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::anim::AnimStates;
use crate::error::{SimError, SimResult};
use crate::host::Host;
use crate::math::InterpolatedValue;
use crate::zv::Zv;

pub const NUM_MAX_OBJECT: usize = 50;
pub const NUM_MAX_MESSAGE: usize = 5;
pub const NUM_MAX_INVENTORY: usize = 30;
pub const DISTANCE_TO_POINT_THRESHOLD: i32 = 400;

pub const AF_ANIMATED: u16 = 0x0001;
pub const AF_DRAWABLE: u16 = 0x0004;
pub const AF_BOXIFY: u16 = 0x0008;
pub const AF_MOVABLE: u16 = 0x0010;
pub const AF_SPECIAL: u16 = 0x0020;
pub const AF_TRIGGER: u16 = 0x0040;
pub const AF_FOUNDABLE: u16 = 0x0080;
pub const AF_FALLABLE: u16 = 0x0100;
/// Flags a script may set through `TYPE`.
pub const AF_MASK: u16 = AF_ANIMATED | AF_MOVABLE | AF_TRIGGER | AF_FOUNDABLE | AF_FALLABLE;

pub const ANIM_ONCE: i16 = 0;
pub const ANIM_REPEAT: i16 = 1;
pub const ANIM_UNINTERRUPTABLE: i16 = 2;
pub const ANIM_RESET: i16 = 4;

/// World-object `flags2` bits.
pub const FLAG2_IN_INVENTORY: i16 = 0x8000u16 as i16;
pub const FLAG2_DROPPED: i16 = 0x4000;
pub const FLAG2_THROWN: i16 = 0x1000;

/// A live simulation slot. Positions are room-local (`room_pos`) and
/// relative to the current room (`world`); `step` is the movement of the
/// keyframe in progress, not yet committed to either.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    /// World object this slot belongs to, -1 for a free slot and -2 for a
    /// special effect object.
    pub index_in_world: i16,
    pub body_num: i16,
    pub flags: u16,
    pub dyn_flags: u16,
    pub zv: Zv,
    pub world: [i32; 3],
    pub room_pos: [i32; 3],
    pub step: [i32; 3],
    pub anim_neg: [i32; 3],
    pub alpha: i16,
    pub beta: i16,
    pub gamma: i16,
    pub stage: i16,
    pub room: i16,
    pub life_mode: i16,
    pub life: i16,
    pub chrono: u32,
    pub room_chrono: u32,
    pub anim: i16,
    pub anim_type: i16,
    pub anim_info: i16,
    pub new_anim: i16,
    pub new_anim_type: i16,
    pub new_anim_info: i16,
    pub frame: i16,
    pub num_of_frames: i16,
    pub end_frame: bool,
    pub end_anim: bool,
    pub track_mode: i16,
    pub track_number: i16,
    pub mark: i16,
    pub position_in_track: i16,
    pub direction: i16,
    pub speed: i16,
    pub speed_change: InterpolatedValue,
    pub rotate: InterpolatedValue,
    pub y_handler: InterpolatedValue,
    pub col: [i16; 3],
    pub col_by: i16,
    pub hard_dec: i16,
    pub hard_col: i16,
    pub hit: i16,
    pub hit_by: i16,
    pub action_type: i16,
    pub action_anim: i16,
    pub action_frame: i16,
    pub action_param: i16,
    pub hit_force: i16,
    pub hot_point_id: i16,
    pub hot_point: [i32; 3],
    pub hard_mat: i16,
    pub falling: i16,
}

impl Default for Actor {
    fn default() -> Self {
        Actor {
            index_in_world: -1,
            body_num: -1,
            flags: 0,
            dyn_flags: 0,
            zv: Zv::default(),
            world: [0; 3],
            room_pos: [0; 3],
            step: [0; 3],
            anim_neg: [0; 3],
            alpha: 0,
            beta: 0,
            gamma: 0,
            stage: -1,
            room: -1,
            life_mode: -1,
            life: -1,
            chrono: 0,
            room_chrono: 0,
            anim: -1,
            anim_type: 0,
            anim_info: -1,
            new_anim: -1,
            new_anim_type: 0,
            new_anim_info: -1,
            frame: 0,
            num_of_frames: 0,
            end_frame: true,
            end_anim: true,
            track_mode: 0,
            track_number: -1,
            mark: -1,
            position_in_track: 0,
            direction: 0,
            speed: 0,
            speed_change: InterpolatedValue::default(),
            rotate: InterpolatedValue::default(),
            y_handler: InterpolatedValue::default(),
            col: [-1; 3],
            col_by: -1,
            hard_dec: -1,
            hard_col: -1,
            hit: -1,
            hit_by: -1,
            action_type: 0,
            action_anim: -1,
            action_frame: 0,
            action_param: 0,
            hit_force: 0,
            hot_point_id: -1,
            hot_point: [0; 3],
            hard_mat: -1,
            falling: 0,
        }
    }
}

impl Actor {
    pub fn is_free(&self) -> bool {
        self.index_in_world == -1
    }

    /// Bound to a world object (special effects are not).
    pub fn is_live(&self) -> bool {
        self.index_in_world >= 0
    }

    /// Room-local position including the pending step.
    pub fn stepped_position(&self) -> [i32; 3] {
        [
            self.room_pos[0] + self.step[0],
            self.room_pos[1] + self.step[1],
            self.room_pos[2] + self.step[2],
        ]
    }

    /// Places the actor at a room-local point, keeping `world` in step.
    pub fn set_position(&mut self, position: [i32; 3]) {
        self.room_pos = position;
        self.world = position;
    }
}

/// Per-tick input snapshot, already debounced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub key: i16,
    /// Joystick bits: 1 forward, 2 back, 4 left, 8 right.
    #[serde(default)]
    pub joy: i16,
    #[serde(default)]
    pub click: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: i16,
    pub time: u32,
}

/// Resources addressed by index from scripts and world objects.
#[derive(Debug, Default, Clone)]
pub struct Resources {
    pub bodies: BTreeMap<i16, Body>,
    pub anims: BTreeMap<i16, Animation>,
    pub lives: BTreeMap<i16, Vec<i16>>,
    pub tracks: BTreeMap<i16, Vec<i16>>,
    pub floors: BTreeMap<i16, Vec<RoomData>>,
    /// Hard-material interaction matrices: width byte, one unused byte, then
    /// a row per material.
    pub matrices: BTreeMap<i16, Vec<u8>>,
}

impl Resources {
    pub fn body(&self, index: i16) -> Option<&Body> {
        self.bodies.get(&index)
    }

    pub fn anim(&self, index: i16) -> Option<&Animation> {
        self.anims.get(&index)
    }
}

/// The whole simulation state: actor pool, world objects, variables and the
/// rooms of the loaded floor. Exactly one tick mutates it at a time.
#[derive(Debug, Clone)]
pub struct World {
    pub edition: Edition,
    pub actors: Vec<Actor>,
    pub objects: Vec<WorldObject>,
    pub vars: Vec<i16>,
    pub cvars: Vec<i16>,
    pub rooms: Vec<RoomData>,
    pub resources: Resources,
    pub anim_states: AnimStates,
    pub inventory: Vec<i16>,
    pub messages: Vec<Message>,
    pub timer: u32,
    /// Timer units that pass per tick.
    pub timer_step: u32,
    pub input: Input,
    pub action: i16,
    /// Slot of the actor whose work is in progress.
    pub current_actor: usize,
    pub current_floor: i16,
    pub current_room: i16,
    /// Index into the current room's camera list.
    pub current_camera: i16,
    /// Actor slot the camera follows.
    pub camera_target: i16,
    /// World object the camera follows.
    pub current_world_target: i16,
    pub change_floor: bool,
    pub new_floor: i16,
    pub need_change_room: bool,
    pub new_room: i16,
    pub view_list: Vec<i16>,
    pub flag_init_view: i16,
    pub game_over: bool,
    pub light_off: i16,
    pub new_flag_light: bool,
    pub status_screen_allowed: i16,
    pub ground: i16,
    /// Object held by the player. One inventory is simulated, so this is
    /// the in-hand entry of inventory 0.
    pub in_hand: i16,
    pub hard_clip: Zv,
    pub actor_turned_to_obj: bool,
    pub last_time_forward: u32,
    pub current_music: i16,
    pub next_music: i16,
    pub next_sample: i16,
    pub shaking: i16,
    pub rain: i16,
    pub water: i16,
    pub sequence_samples: Vec<(i16, i16)>,
    pub(crate) rng: ChaCha8Rng,
}

impl World {
    pub fn new(edition: Edition) -> Self {
        World {
            edition,
            actors: vec![Actor::default(); NUM_MAX_OBJECT],
            objects: Vec::new(),
            vars: Vec::new(),
            cvars: vec![0; edition.cvar_count()],
            rooms: Vec::new(),
            resources: Resources::default(),
            anim_states: AnimStates::default(),
            inventory: Vec::new(),
            messages: Vec::new(),
            timer: 0,
            timer_step: 1,
            input: Input::default(),
            action: 0,
            current_actor: 0,
            current_floor: 0,
            current_room: 0,
            current_camera: 0,
            camera_target: -1,
            current_world_target: -1,
            change_floor: false,
            new_floor: -1,
            need_change_room: false,
            new_room: -1,
            view_list: Vec::new(),
            flag_init_view: 0,
            game_over: false,
            light_off: 0,
            new_flag_light: false,
            status_screen_allowed: 1,
            ground: 0,
            in_hand: -1,
            hard_clip: Zv::default(),
            actor_turned_to_obj: false,
            last_time_forward: 0,
            current_music: -1,
            next_music: -1,
            next_sample: -1,
            shaking: 0,
            rain: 0,
            water: 0,
            sequence_samples: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(0x4C49_4645),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn actor(&self, slot: i16) -> SimResult<&Actor> {
        usize::try_from(slot)
            .ok()
            .and_then(|slot| self.actors.get(slot))
            .filter(|actor| !actor.is_free())
            .ok_or(SimError::BadActor(slot))
    }

    pub fn object(&self, index: i16) -> SimResult<&WorldObject> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.objects.get(index))
            .ok_or(SimError::BadWorldObject(index))
    }

    pub fn object_mut(&mut self, index: i16) -> SimResult<&mut WorldObject> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.objects.get_mut(index))
            .ok_or(SimError::BadWorldObject(index))
    }

    /// Actor slot of a world object, or `None` while it is dormant.
    pub fn live_slot(&self, object: i16) -> SimResult<Option<usize>> {
        let slot = self.object(object)?.obj_index;
        Ok(usize::try_from(slot).ok())
    }

    pub fn cvar(&self, cvar: CVar) -> i16 {
        self.edition
            .cvar_index(cvar)
            .and_then(|index| self.cvars.get(index).copied())
            .unwrap_or(0)
    }

    pub fn set_cvar(&mut self, cvar: CVar, value: i16) {
        match self.edition.cvar_index(cvar) {
            Some(index) if index < self.cvars.len() => self.cvars[index] = value,
            _ => debug!("c-variable {cvar:?} does not exist in {:?}", self.edition),
        }
    }

    pub fn var(&self, index: i16) -> i16 {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.vars.get(index).copied())
            .unwrap_or(0)
    }

    pub fn set_var(&mut self, index: i16, value: i16) {
        let Ok(index) = usize::try_from(index) else {
            warn!("ignoring write to negative variable {index}");
            return;
        };
        if index >= self.vars.len() {
            self.vars.resize(index + 1, 0);
        }
        self.vars[index] = value;
    }

    pub fn room_world(&self, room: i16) -> [i32; 3] {
        crate::zv::room(&self.rooms, room)
            .map(|data| data.world.map(i32::from))
            .unwrap_or([0; 3])
    }

    /// Free slot with the lowest index.
    pub fn free_slot(&self) -> Option<usize> {
        self.actors.iter().position(Actor::is_free)
    }

    /// Converts a room-local position in `room` to a position relative to
    /// the current room.
    pub fn to_current_room(&self, room: i16, position: [i32; 3]) -> [i32; 3] {
        if room == self.current_room {
            return position;
        }
        let current = self.room_world(self.current_room);
        let other = self.room_world(room);
        [
            position[0] - (current[0] - other[0]) * 10,
            position[1] + (current[1] - other[1]) * 10,
            position[2] + (current[2] - other[2]) * 10,
        ]
    }

    /// Rooms whose actors stay simulated: rooms reachable through the
    /// current room's change zones plus whatever the camera sees.
    pub fn refresh_view_list(&mut self, host: &dyn Host) {
        let mut list: Vec<i16> = Vec::new();
        if let Some(room) = crate::zv::room(&self.rooms, self.current_room) {
            for zone in room.sce_zones.iter().filter(|zone| zone.kind == 0) {
                let linked = zone.parameter as i16;
                if !list.contains(&linked) {
                    list.push(linked);
                }
            }
        }
        for viewed in host.viewed_rooms() {
            if !list.contains(&viewed) {
                list.push(viewed);
            }
        }
        if !list.contains(&self.current_room) {
            list.push(self.current_room);
        }
        self.view_list = list;
    }

    pub fn is_in_view_list(&self, room: i16) -> bool {
        self.view_list.contains(&room)
    }

    pub fn load_room(&mut self, room: i16, host: &mut dyn Host) {
        info!("entering room {room}");
        self.current_room = room;
        self.need_change_room = false;
        self.refresh_view_list(host);
        host.room_changed(room);
        let current = self.room_world(room);
        for actor in self.actors.iter_mut().filter(|actor| !actor.is_free()) {
            let other = crate::zv::room(&self.rooms, actor.room)
                .map(|data| data.world.map(i32::from))
                .unwrap_or(current);
            actor.world = [
                actor.room_pos[0] - (current[0] - other[0]) * 10,
                actor.room_pos[1] + (current[1] - other[1]) * 10,
                actor.room_pos[2] + (current[2] - other[2]) * 10,
            ];
        }
    }

    /// Swaps in the rooms of another floor. Every actor is written back to
    /// its world object first; the room in `new_room` is entered on the
    /// next room change.
    pub fn load_floor(&mut self, floor: i16, host: &mut dyn Host) {
        info!("loading floor {floor}");
        for slot in 0..self.actors.len() {
            if !self.actors[slot].is_free() {
                self.delete_object(slot);
            }
        }
        match self.resources.floors.get(&floor) {
            Some(rooms) => self.rooms = rooms.clone(),
            None => warn!("floor {floor} has no room data; keeping the current rooms"),
        }
        self.anim_states.clear();
        self.current_floor = floor;
        self.change_floor = false;
        self.need_change_room = true;
        host.floor_changed(floor);
    }

    /// Timer value usable as a script word.
    pub fn timer_word(&self) -> i16 {
        self.timer as u16 as i16
    }

    pub(crate) fn random_below(&mut self, bound: i16) -> i16 {
        use rand::Rng;
        if bound <= 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }
}
