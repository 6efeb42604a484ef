//! One simulation frame.
//!
//! Work runs in live-pool slot order, so an actor sees what the actors in
//! lower slots already did this tick. A script error only costs the actor
//! that raised it the rest of its tick.

use fitd_formats::Edition;
use log::{debug, warn};

use crate::error::SimError;
use crate::host::Host;
use crate::world::{AF_ANIMATED, AF_TRIGGER, World};

/// Action word raised while the fire button is held.
pub const ACTION_FIRE: i16 = 0x2000;

const KEY_RETURN: i16 = 0x1C;
const KEY_INVENTORY: i16 = 0x17;

/// Later releases animate actors carrying this bit even without
/// `AF_ANIMATED`, and run their scripts a second time for the camera.
const AF_CAMERA_LIFE: u16 = 0x200;

/// Script failure that cut one actor's tick short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorFault {
    pub slot: usize,
    pub timer: u32,
    pub error: SimError,
}

impl World {
    /// Runs one frame against the current input snapshot and returns the
    /// actors whose work was cut short.
    pub fn tick(&mut self, host: &mut dyn Host) -> Vec<ActorFault> {
        let mut faults = Vec::new();

        let key = self.input.key;
        if matches!(key, KEY_RETURN | KEY_INVENTORY) && self.status_screen_allowed != 0 {
            host.open_inventory();
        }
        self.action = if self.input.click != 0 { ACTION_FIRE } else { 0 };

        let in_hand = self.in_hand;
        if let Err(error) = self.execute_found_life(in_hand, host) {
            warn!("found-life of object {in_hand} in hand failed: {error}");
        }

        if !self.change_floor {
            self.reset_tick_fields();
            self.move_actors(host, &mut faults);
            self.run_lives(host, &mut faults);
            if self.game_over {
                debug!("game over; ending the frame early");
                return faults;
            }
        }

        if self.change_floor {
            self.load_floor(self.new_floor, host);
        }
        if self.need_change_room {
            self.load_room(self.new_room, host);
        } else {
            if self.edition >= Edition::Aitd2 {
                self.run_camera_lives(host, &mut faults);
            }
            self.flag_init_view = 0;
        }

        if let Err(error) = self.update_all_actor_and_objects(host) {
            warn!("repopulating actors failed: {error}");
        }
        self.update_pending_events(host);
        self.timer = self.timer.wrapping_add(self.timer_step);
        faults
    }

    fn reset_tick_fields(&mut self) {
        for actor in self.actors.iter_mut().filter(|actor| actor.is_live()) {
            actor.col_by = -1;
            actor.hit_by = -1;
            actor.hit = -1;
            actor.hard_dec = -1;
            actor.hard_col = -1;
        }
    }

    fn move_actors(&mut self, host: &mut dyn Host, faults: &mut Vec<ActorFault>) {
        let later = self.edition >= Edition::Aitd2;
        for slot in 0..self.actors.len() {
            if !self.actors[slot].is_live() {
                continue;
            }
            self.current_actor = slot;
            let flags = self.actors[slot].flags;
            if flags & AF_ANIMATED != 0 || (later && flags & AF_CAMERA_LIFE != 0) {
                self.update_animation(slot, host);
            }
            if flags & AF_TRIGGER != 0 && self.actors[slot].is_live() {
                self.process_actor2(slot, host);
            }
            if self.actors[slot].is_live() && self.actors[slot].action_type != 0 {
                if let Err(error) = self.gere_frappe(slot, host) {
                    self.fault(slot, error, faults);
                }
            }
        }
    }

    /// Whether the actor's script runs in the main pass.
    fn life_enabled(&self, slot: usize) -> bool {
        let actor = &self.actors[slot];
        if !actor.is_live() || actor.life == -1 {
            return false;
        }
        match self.edition {
            Edition::Aitd1 | Edition::Jack => actor.life_mode != -1,
            _ => actor.life_mode & 3 != 0 && actor.life_mode & 4 == 0,
        }
    }

    fn run_lives(&mut self, host: &mut dyn Host, faults: &mut Vec<ActorFault>) {
        for slot in 0..self.actors.len() {
            if self.life_enabled(slot) {
                let life = self.actors[slot].life;
                if let Err(error) = self.process_life(slot, life, false, host) {
                    self.fault(slot, error, faults);
                }
            }
            if self.change_floor || self.game_over {
                break;
            }
        }
    }

    /// Second script pass for actors the camera keeps alive.
    fn run_camera_lives(&mut self, host: &mut dyn Host, faults: &mut Vec<ActorFault>) {
        for slot in 0..self.actors.len() {
            let camera_actor = self.actors[slot].flags & AF_CAMERA_LIFE != 0;
            if camera_actor && self.life_enabled(slot) {
                let life = self.actors[slot].life;
                if let Err(error) = self.process_life(slot, life, false, host) {
                    self.fault(slot, error, faults);
                }
                self.actor_turned_to_obj = true;
            }
            if self.change_floor {
                break;
            }
        }
    }

    fn fault(&mut self, slot: usize, error: SimError, faults: &mut Vec<ActorFault>) {
        warn!("skipping the rest of slot {slot}'s tick: {error}");
        faults.push(ActorFault {
            slot,
            timer: self.timer,
            error,
        });
    }

    /// Sound and music requests queued by scripts during the frame.
    fn update_pending_events(&mut self, host: &mut dyn Host) {
        if self.next_sample != -1 {
            host.play_sample(self.next_sample & !0x4000);
            self.next_sample = -1;
        }
        if self.current_music == -2 && self.next_music != -1 {
            host.play_music(self.next_music);
            self.current_music = self.next_music;
            self.next_music = -1;
        }
        self.new_flag_light = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitd_formats::{RoomData, WorldObject};

    use crate::host::{HostEvent, RecordingHost};
    use crate::world::{Actor, Input};

    // First-release opcode numbers.
    const END: i16 = 0x0C;
    const VAR: i16 = 0x13;
    const INC: i16 = 0x14;
    const STAGE: i16 = 0x2F;
    const SAMPLE_THEN: i16 = 0x3F;
    // Later-release opcode numbers.
    const LATER_INC: i16 = 0x13;

    fn world(edition: Edition, lives: &[i16]) -> World {
        let mut world = World::new(edition);
        world.rooms = vec![RoomData::default(); 3];
        world.view_list = vec![0];
        for (slot, life) in lives.iter().enumerate() {
            world.objects.push(WorldObject {
                obj_index: slot as i16,
                stage: 0,
                room: 0,
                life: *life,
                ..WorldObject::default()
            });
            world.actors[slot] = Actor {
                index_in_world: slot as i16,
                stage: 0,
                room: 0,
                life: *life,
                life_mode: if edition > Edition::Jack { 1 } else { 0 },
                ..Actor::default()
            };
        }
        world
    }

    #[test]
    fn per_tick_fields_reset_before_scripts_run() {
        let mut world = world(Edition::Aitd1, &[0]);
        world.resources.lives.insert(0, vec![END]);
        let actor = &mut world.actors[0];
        actor.hit = 3;
        actor.hit_by = 2;
        actor.col_by = 1;
        actor.hard_dec = 4;
        actor.hard_col = 5;
        let faults = world.tick(&mut RecordingHost::new());
        assert!(faults.is_empty());
        let actor = &world.actors[0];
        assert_eq!(
            [actor.hit, actor.hit_by, actor.col_by, actor.hard_dec, actor.hard_col],
            [-1; 5]
        );
        assert_eq!(world.timer, 1);
    }

    #[test]
    fn scripts_run_in_slot_order() {
        let mut world = world(Edition::Aitd1, &[0, 1]);
        world.resources.lives.insert(0, vec![VAR, 1, -1, 5, END]);
        world.resources.lives.insert(1, vec![VAR, 2, 0, 1, END]);
        world.tick(&mut RecordingHost::new());
        assert_eq!(world.var(2), 5);
    }

    #[test]
    fn failing_script_only_stops_its_actor() {
        let mut world = world(Edition::Aitd1, &[0, 1]);
        world.resources.lives.insert(0, vec![0x7F, END]);
        world.resources.lives.insert(1, vec![INC, 0, END]);
        let faults = world.tick(&mut RecordingHost::new());
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].slot, 0);
        assert!(matches!(faults[0].error, SimError::UnmappedOpcode { raw: 0x7F, .. }));
        assert_eq!(world.var(0), 1);
    }

    #[test]
    fn endless_script_is_reported_as_a_fault() {
        const GOTO: i16 = 0x0A;
        let mut world = world(Edition::Aitd1, &[0, 1]);
        world.resources.lives.insert(0, vec![GOTO, -2]);
        world.resources.lives.insert(1, vec![INC, 0, END]);
        let faults = world.tick(&mut RecordingHost::new());
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].slot, 0);
        assert!(matches!(
            faults[0].error,
            SimError::RunawayScript { life: 0, actor: 0, .. }
        ));
        assert_eq!(world.var(0), 1);
    }

    #[test]
    fn first_release_skips_disabled_lives() {
        let mut world = world(Edition::Jack, &[0]);
        world.resources.lives.insert(0, vec![INC, 0, END]);
        world.actors[0].life_mode = -1;
        world.tick(&mut RecordingHost::new());
        assert_eq!(world.var(0), 0);
    }

    #[test]
    fn later_release_waits_for_camera_only_actors() {
        let mut world = world(Edition::Aitd2, &[0]);
        world.resources.lives.insert(0, vec![LATER_INC, 0, END]);
        world.actors[0].life_mode = 1 | 4;
        let mut host = RecordingHost::new();
        world.tick(&mut host);
        assert_eq!(world.var(0), 0);
        assert_eq!(world.actors[0].life_mode, 1);
        world.tick(&mut host);
        assert_eq!(world.var(0), 1);
    }

    #[test]
    fn floor_change_stops_the_life_pass_and_reloads() {
        let mut world = world(Edition::Aitd1, &[0, 1]);
        world.camera_target = 0;
        world.current_world_target = 0;
        world.resources.lives.insert(0, vec![STAGE, 1, 2, 100, 0, 200, END]);
        world.resources.lives.insert(1, vec![INC, 0, END]);
        world.resources.floors.insert(1, vec![RoomData::default(); 3]);
        let mut host = RecordingHost::new();
        let faults = world.tick(&mut host);
        assert!(faults.is_empty());
        assert_eq!(world.var(0), 0);
        assert_eq!((world.current_floor, world.current_room), (1, 2));
        assert!(!world.change_floor && !world.need_change_room);
        assert_eq!(
            host.events,
            vec![HostEvent::Floor { floor: 1 }, HostEvent::Room { room: 2 }]
        );
        let slot = world.objects[0].obj_index;
        assert!(slot >= 0);
        assert_eq!(world.camera_target, slot);
        assert_eq!(world.actors[slot as usize].room_pos, [100, 0, 200]);
        assert_eq!(world.objects[1].obj_index, -1);
    }

    #[test]
    fn queued_sample_plays_at_end_of_frame() {
        let mut world = world(Edition::Aitd1, &[0]);
        world.resources.lives.insert(0, vec![SAMPLE_THEN, -1, 12, -1, 13, END]);
        let mut host = RecordingHost::new();
        world.tick(&mut host);
        assert_eq!(host.samples(), vec![12, 13]);
        assert_eq!(world.next_sample, -1);
    }

    #[test]
    fn input_drives_action_and_inventory() {
        let mut world = world(Edition::Aitd1, &[]);
        world.input = Input {
            key: KEY_INVENTORY,
            joy: 0,
            click: 1,
        };
        let mut host = RecordingHost::new();
        world.tick(&mut host);
        assert_eq!(world.action, ACTION_FIRE);
        assert_eq!(host.events, vec![HostEvent::Inventory]);

        world.status_screen_allowed = 0;
        world.input = Input::default();
        let mut host = RecordingHost::new();
        world.tick(&mut host);
        assert_eq!(world.action, 0);
        assert!(host.events.is_empty());
    }
}
