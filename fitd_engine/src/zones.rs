//! Scenario zones crossed by trigger actors.

use fitd_formats::Edition;
use log::{debug, info};

use crate::host::Host;
use crate::world::World;
use crate::zv::{Zv, room, room_offset};

pub const ZONE_ROOM: u16 = 0;
pub const ZONE_MATERIAL: u16 = 8;
pub const ZONE_SCENARIO: u16 = 9;
pub const ZONE_STAGE: u16 = 10;

impl World {
    /// Applies the zones of the actor's room that contain its stepped
    /// position. Room-change zones move the actor into the linked room and
    /// rescan from there; the first release stops after the first zone.
    pub fn process_actor2(&mut self, slot: usize, host: &mut dyn Host) {
        let edition = self.edition;
        // Each room change restarts the scan; a cycle of linked rooms ends
        // after one pass per room.
        for _ in 0..=self.rooms.len() {
            let actor = &self.actors[slot];
            let position = actor.stepped_position();
            let Some(data) = room(&self.rooms, actor.room) else {
                debug!("slot {slot}: room {} is not loaded", actor.room);
                return;
            };
            let zones: Vec<_> = data
                .sce_zones
                .iter()
                .filter(|zone| Zv::from_extents(zone.zv).contains_point(position))
                .copied()
                .collect();

            let mut changed_room = false;
            for zone in zones {
                match zone.kind {
                    ZONE_ROOM => {
                        self.enter_linked_room(slot, zone.parameter as i16, host);
                        changed_room = true;
                    }
                    ZONE_MATERIAL if edition != Edition::Aitd1 => {
                        self.actors[slot].hard_mat = zone.parameter as i16;
                    }
                    ZONE_SCENARIO => {
                        self.actors[slot].hard_dec = zone.parameter as i16;
                    }
                    ZONE_STAGE => {
                        let object = self.actors[slot].index_in_world;
                        let floor_life =
                            self.object(object).map_or(-1, |record| record.floor_life);
                        if floor_life == -1 {
                            return;
                        }
                        let actor = &mut self.actors[slot];
                        actor.life = floor_life;
                        actor.hard_dec = zone.parameter as i16;
                        return;
                    }
                    _ => {}
                }
                if edition == Edition::Aitd1 || changed_room {
                    break;
                }
            }
            if !changed_room || edition == Edition::Aitd1 {
                return;
            }
        }
    }

    fn enter_linked_room(&mut self, slot: usize, new_room: i16, host: &mut dyn Host) {
        let old_room = self.actors[slot].room;
        let offset = room_offset(&self.rooms, old_room, new_room);
        let actor = &mut self.actors[slot];
        actor.room = new_room;
        for (axis, delta) in actor.room_pos.iter_mut().zip(offset) {
            *axis += delta;
        }
        actor.zv.translate(offset);
        actor.room_chrono = self.timer;

        if self.camera_target == slot as i16 {
            info!("camera target walked into room {new_room}");
            self.need_change_room = true;
            self.new_room = new_room;
            if self.edition > Edition::Aitd1 {
                self.load_room(new_room, host);
            }
        } else {
            self.actor_turned_to_obj = true;
        }
    }
}
