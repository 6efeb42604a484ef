//! Expression operands of LIFE statements.
//!
//! An operand is a tag word: `-1` introduces a literal, `0` a variable index,
//! anything else a field selector read from an actor. Bit 15 of a selector
//! means an object word follows and the field is read from that object
//! rather than from the actor running the script. Selector numbering differs
//! between the first release and the later ones above 0x20; [`Field::decode`]
//! hides that.

use fitd_formats::{Edition, RoomData};
use log::warn;

use crate::error::{SimError, SimResult};
use crate::life::ScriptCursor;
use crate::math::{eval_chrono, walk_step};
use crate::world::{Actor, FLAG2_DROPPED, FLAG2_IN_INVENTORY, FLAG2_THROWN, World};
use crate::zv::{hard_collisions, relative_position, room};

/// Returned for distances to objects that are out of reach.
pub const FAR_AWAY: i32 = 32000;

const POS_REL_TABLE: [i32; 8] = [4, 1, 8, 2, 4, 1, 8, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Col,
    HardDec,
    HardCol,
    Hit,
    HitBy,
    Anim,
    EndAnim,
    Frame,
    EndFrame,
    Body,
    Mark,
    TrackNumber,
    Chrono,
    RoomChrono,
    Distance,
    ColBy,
    Found,
    Action,
    PosRel,
    Joy,
    Click,
    ColAny,
    Alpha,
    Beta,
    Gamma,
    InHand,
    HitForce,
    Camera,
    Random,
    Falling,
    Room,
    Life,
    Held,
    RoomY,
    TestZvEndAnim,
    Music,
    CVar,
    Stage,
    Thrown,
    Matrix,
    HardMat,
    TestProtect,
    SampleState,
}

impl Field {
    pub fn decode(selector: u16, edition: Edition) -> Option<Field> {
        use Field::*;
        let shared = match selector {
            0x00 => Some(Col),
            0x01 => Some(HardDec),
            0x02 => Some(HardCol),
            0x03 => Some(Hit),
            0x04 => Some(HitBy),
            0x05 => Some(Anim),
            0x06 => Some(EndAnim),
            0x07 => Some(Frame),
            0x08 => Some(EndFrame),
            0x09 => Some(Body),
            0x0A => Some(Mark),
            0x0B => Some(TrackNumber),
            0x0C => Some(Chrono),
            0x0D => Some(RoomChrono),
            0x0E => Some(Distance),
            0x0F => Some(ColBy),
            0x10 => Some(Found),
            0x11 => Some(Action),
            0x12 => Some(PosRel),
            0x13 => Some(Joy),
            0x14 => Some(Click),
            0x15 => Some(ColAny),
            0x16 => Some(Alpha),
            0x17 => Some(Beta),
            0x18 => Some(Gamma),
            0x19 => Some(InHand),
            0x1A => Some(HitForce),
            0x1B => Some(Camera),
            0x1C => Some(Random),
            0x1D => Some(Falling),
            0x1E => Some(Room),
            0x1F => Some(Life),
            0x20 => Some(Held),
            _ => None,
        };
        if shared.is_some() {
            return shared;
        }
        if edition.is_first_generation() {
            match selector {
                0x21 => Some(RoomY),
                0x22 => Some(TestZvEndAnim),
                0x23 => Some(Music),
                0x24 => Some(CVar),
                0x25 => Some(Stage),
                0x26 => Some(Thrown),
                _ => None,
            }
        } else {
            match selector {
                0x21 => Some(Music),
                0x22 => Some(CVar),
                0x23 => Some(Stage),
                0x24 => Some(Thrown),
                0x25 => Some(Matrix),
                0x26 => Some(HardMat),
                0x27 => Some(TestProtect),
                0x2A => Some(SampleState),
                _ => None,
            }
        }
    }

    /// Literal words following the selector (the `Found` operand is a
    /// nested expression and is not counted).
    fn word_operands(self) -> usize {
        match self {
            Field::Distance
            | Field::PosRel
            | Field::Random
            | Field::Held
            | Field::CVar
            | Field::Thrown => 1,
            Field::TestZvEndAnim | Field::Matrix => 2,
            _ => 0,
        }
    }
}

fn world_index(actors: &[Actor], slot: i16) -> i32 {
    usize::try_from(slot)
        .ok()
        .and_then(|slot| actors.get(slot))
        .map(|actor| i32::from(actor.index_in_world))
        .unwrap_or(-1)
}

fn manhattan(a: [i32; 3], b: [i32; 3]) -> i32 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs()
}

/// Where `other` stands as seen from `actor`: 1 front, 2 back, 4 left,
/// 8 right, 0 when the boxes overlap in plan.
pub fn pos_rel(actor: &Actor, other: &Actor, rooms: &[RoomData]) -> i32 {
    let beta = i32::from(actor.beta);
    let mut counter = match beta {
        0x80..=0x17F => 2,
        0x180..=0x27F => 1,
        0x280..=0x37F => 0,
        _ => 3,
    };
    let zv = if actor.room != other.room {
        relative_position(&other.zv, rooms, other.room, actor.room)
    } else {
        other.zv
    };
    let center_x = (zv.x1 + zv.x2) / 2;
    let center_z = (zv.z1 + zv.z2) / 2;
    let own = &actor.zv;

    if own.z2 >= center_z && own.z1 <= center_z {
        if own.x2 < center_x {
            counter += 1;
        } else if own.x1 <= center_x {
            return 0;
        } else {
            counter += 3;
        }
    } else if own.x2 >= center_x || own.x1 <= center_x {
        if own.z2 < center_z {
            counter += 2;
        } else if own.z1 <= center_z {
            return 0;
        }
    } else {
        return 0;
    }
    POS_REL_TABLE[counter]
}

impl World {
    /// Reads one expression at `cursor` for the actor in `slot`.
    pub fn eval_var(&mut self, cursor: &mut ScriptCursor<'_>, slot: usize) -> SimResult<i32> {
        let start = cursor.byte_offset();
        let tag = cursor.word()?;
        match tag {
            -1 => return Ok(i32::from(cursor.word()?)),
            0 => {
                let index = cursor.word()?;
                return Ok(i32::from(self.var(index)));
            }
            _ => {}
        }

        let raw = tag as u16;
        let selector = (raw & 0x7FFF).wrapping_sub(1);
        let unsupported = SimError::UnsupportedSelector {
            selector,
            cursor: start,
            actor: slot,
        };
        let field = Field::decode(selector, self.edition).ok_or(unsupported.clone())?;

        let mut subject = slot;
        if raw & 0x8000 != 0 {
            let object = cursor.word()?;
            match self.live_slot(object)? {
                Some(live) => subject = live,
                None => {
                    let value = match field {
                        Field::Room => i32::from(self.object(object)?.room),
                        Field::Stage => i32::from(self.object(object)?.stage),
                        _ if self.edition.is_first_generation() => return Err(unsupported),
                        _ => {
                            warn!("field {field:?} read from dormant object {object}");
                            0
                        }
                    };
                    self.skip_field_operands(field, cursor, slot)?;
                    return Ok(value);
                }
            }
        }
        self.eval_field(field, subject, cursor, slot)
    }

    fn skip_field_operands(
        &mut self,
        field: Field,
        cursor: &mut ScriptCursor<'_>,
        slot: usize,
    ) -> SimResult<()> {
        if field == Field::Found {
            self.eval_var(cursor, slot)?;
        }
        for _ in 0..field.word_operands() {
            cursor.word()?;
        }
        Ok(())
    }

    fn eval_field(
        &mut self,
        field: Field,
        subject: usize,
        cursor: &mut ScriptCursor<'_>,
        slot: usize,
    ) -> SimResult<i32> {
        let first = self.edition.is_first_generation();
        let actor = &self.actors[subject];
        let value = match field {
            Field::Col => world_index(&self.actors, actor.col[0]),
            Field::HardDec => i32::from(actor.hard_dec),
            Field::HardCol => i32::from(actor.hard_col),
            Field::Hit => world_index(&self.actors, actor.hit),
            Field::HitBy => world_index(&self.actors, actor.hit_by),
            Field::Anim => i32::from(actor.anim),
            Field::EndAnim => i32::from(actor.end_anim),
            Field::Frame => i32::from(actor.frame),
            Field::EndFrame => i32::from(actor.end_frame),
            Field::Body => i32::from(actor.body_num),
            Field::Mark => i32::from(actor.mark),
            Field::TrackNumber => i32::from(actor.track_number),
            Field::Chrono => (eval_chrono(actor.chrono, self.timer) / 60) as i32,
            Field::RoomChrono => (eval_chrono(actor.room_chrono, self.timer) / 60) as i32,
            Field::Distance => {
                let object = cursor.word()?;
                let own = actor.world;
                match self.live_slot(object)? {
                    Some(other) => manhattan(own, self.actors[other].world),
                    None if first => FAR_AWAY,
                    None => {
                        let target = self.object(object)?;
                        if target.room == self.current_room {
                            manhattan(own, [target.x, target.y, target.z].map(i32::from))
                        } else {
                            FAR_AWAY
                        }
                    }
                }
            }
            Field::ColBy => world_index(&self.actors, actor.col_by),
            Field::Found => {
                let object = self.eval_var(cursor, slot)? as i16;
                i32::from(self.object(object)?.flags2 & FLAG2_IN_INVENTORY != 0)
            }
            Field::Action => i32::from(self.action),
            Field::PosRel => {
                let object = cursor.word()?;
                match self.live_slot(object)? {
                    Some(other) => pos_rel(&self.actors[subject], &self.actors[other], &self.rooms),
                    None => 0,
                }
            }
            Field::Joy => {
                let joy = self.input.joy;
                [4, 8, 1, 2]
                    .into_iter()
                    .find(|bit| joy & bit != 0)
                    .map(i32::from)
                    .unwrap_or(0)
            }
            Field::Click => i32::from(self.input.click),
            Field::ColAny => {
                if actor.col[0] != -1 {
                    world_index(&self.actors, actor.col[0])
                } else {
                    world_index(&self.actors, actor.col_by)
                }
            }
            Field::Alpha => i32::from(actor.alpha),
            Field::Beta => i32::from(actor.beta),
            Field::Gamma => i32::from(actor.gamma),
            Field::InHand => i32::from(self.in_hand),
            Field::HitForce => i32::from(actor.hit_force),
            Field::Camera => self.floor_camera(),
            Field::Random => {
                let bound = cursor.word()?;
                i32::from(self.random_below(bound))
            }
            Field::Falling => i32::from(actor.falling),
            Field::Room => i32::from(actor.room),
            Field::Life => i32::from(actor.life),
            Field::Held => {
                let object = cursor.word()?;
                i32::from(self.object(object)?.flags2 & (FLAG2_IN_INVENTORY | FLAG2_DROPPED) != 0)
            }
            Field::RoomY => actor.room_pos[1],
            Field::TestZvEndAnim => {
                let anim = cursor.word()?;
                let lift = cursor.word()?;
                self.test_zv_end_anim(subject, anim, i32::from(lift))?
            }
            Field::Music => i32::from(self.current_music),
            Field::CVar => {
                let index = cursor.word()?;
                usize::try_from(index)
                    .ok()
                    .and_then(|index| self.cvars.get(index))
                    .map(|value| i32::from(*value))
                    .unwrap_or(0)
            }
            Field::Stage => i32::from(actor.stage),
            Field::Thrown => {
                let object = cursor.word()?;
                i32::from(self.object(object)?.flags2 & FLAG2_THROWN != 0)
            }
            Field::Matrix => {
                let matrix = cursor.word()?;
                let object = cursor.word()?;
                self.matrix_value(matrix, subject, object)?
            }
            Field::HardMat => i32::from(actor.hard_mat),
            Field::TestProtect | Field::SampleState => 1,
        };
        Ok(value)
    }

    /// Whether the actor could land after playing `anim` to its end: 1 if
    /// the spot reached is clear but has ground within reach below, else 0.
    fn test_zv_end_anim(&self, slot: usize, anim: i16, lift: i32) -> SimResult<i32> {
        let animation = self.resources.anim(anim).ok_or(SimError::MissingResource {
            kind: "animation",
            index: anim,
        })?;
        let depth: i32 = animation
            .keyframes
            .iter()
            .map(|keyframe| i32::from(keyframe.step[2]))
            .sum();
        let actor = &self.actors[slot];
        let [dx, dz] = walk_step(0, depth, i32::from(actor.beta));
        let mut probe = actor.zv.translated([dx, lift, dz]);
        if !hard_collisions(&probe, &self.rooms, actor.room).is_empty() {
            return Ok(0);
        }
        probe.translate([0, 100, 0]);
        Ok(i32::from(!hard_collisions(&probe, &self.rooms, actor.room).is_empty()))
    }

    fn matrix_value(&self, matrix: i16, slot: usize, object: i16) -> SimResult<i32> {
        let Some(other) = self.live_slot(object)? else {
            warn!("material lookup against dormant object {object}");
            return Ok(0);
        };
        let Some(bytes) = self.resources.matrices.get(&matrix) else {
            warn!("material matrix {matrix} is missing");
            return Ok(0);
        };
        let width = i32::from(bytes.first().copied().unwrap_or(0));
        let row = i32::from(self.actors[slot].hard_mat) - 1;
        let column = i32::from(self.actors[other].hard_mat) - 1;
        let value = usize::try_from(2 + row * width + column)
            .ok()
            .and_then(|index| bytes.get(index).copied());
        Ok(match value {
            Some(byte) if self.edition == Edition::Aitd3 => i32::from(byte),
            Some(byte) => i32::from(byte as i8),
            None => {
                warn!("material pair ({row}, {column}) is outside matrix {matrix}");
                0
            }
        })
    }
}

impl World {
    /// Floor camera number of the current room's active view, or -1 when the
    /// room lists no such camera.
    fn floor_camera(&self) -> i32 {
        let camera = usize::try_from(self.current_camera).ok();
        room(&self.rooms, self.current_room)
            .zip(camera)
            .and_then(|(data, camera)| data.cameras.get(camera))
            .map_or(-1, |&floor_camera| i32::from(floor_camera))
    }
}
