//! LIFE script interpreter.
//!
//! A script is re-entered from its first word every tick and runs until
//! `RETURN`, `END` or a game-over opcode. Each statement is an opcode word,
//! optionally flagged with `0x8000` and followed by the world object it
//! applies to, then its operands. Branches are word counts relative to the
//! word after the skip operand.
//!
//! Statements aimed at a dormant object (no actor slot) only support the
//! subset of opcodes that can be expressed on its [`WorldObject`] record.

use fitd_formats::{CVar, Edition, LifeMacro, WorldObject};
use log::{debug, info, trace, warn};

use crate::actions::{ACTION_NONE, HIT_OBJECT, WAIT_FIRE_ANIM, WAIT_HIT_ANIM, WAIT_THROW_ANIM};
use crate::error::{SimError, SimResult};
use crate::host::Host;
use crate::world::{
    AF_ANIMATED, AF_BOXIFY, AF_MASK, AF_SPECIAL, ANIM_ONCE, ANIM_REPEAT, ANIM_RESET,
    ANIM_UNINTERRUPTABLE, FLAG2_DROPPED, FLAG2_IN_INVENTORY, FLAG2_THROWN, World,
};
use crate::zv::{Zv, give_zv, room, zv_cube, zv_max, zv_real, zv_rot};

/// Statements one script may run in a single call before it is cut off.
pub const MAX_STATEMENTS: usize = 4096;

/// Read position inside a word stream. Shared by the statement decoder and
/// the expression evaluator.
#[derive(Debug, Clone)]
pub struct ScriptCursor<'a> {
    words: &'a [i16],
    position: usize,
}

impl<'a> ScriptCursor<'a> {
    pub fn new(words: &'a [i16]) -> Self {
        ScriptCursor { words, position: 0 }
    }

    /// Index of the next word.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn byte_offset(&self) -> usize {
        self.position * 2
    }

    pub fn word(&mut self) -> SimResult<i16> {
        let word = *self.words.get(self.position).ok_or(SimError::Truncated {
            cursor: self.byte_offset(),
        })?;
        self.position += 1;
        Ok(word)
    }

    pub fn words<const N: usize>(&mut self) -> SimResult<[i16; N]> {
        let mut out = [0; N];
        for word in &mut out {
            *word = self.word()?;
        }
        Ok(out)
    }

    /// Moves by `count` words. Landing outside the script is an error.
    pub fn skip(&mut self, count: i16) -> SimResult<()> {
        let target = self.position as isize + isize::from(count);
        if target < 0 || target as usize > self.words.len() {
            return Err(SimError::Truncated {
                cursor: self.byte_offset(),
            });
        }
        self.position = target as usize;
        Ok(())
    }

    /// Reads a skip operand and applies it unless `taken`.
    fn branch(&mut self, taken: bool) -> SimResult<()> {
        let count = self.word()?;
        if !taken {
            self.skip(count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Exit,
}

/// State of one script invocation.
#[derive(Debug)]
struct LifeRun {
    /// Slot whose script is running; expressions always read from it.
    owner: usize,
    found_call: bool,
    switch_value: i32,
}

impl World {
    /// Runs LIFE script `life` for the actor in `slot`. `found_call` marks a
    /// found-life run started by picking an object up.
    pub fn process_life(
        &mut self,
        slot: usize,
        life: i16,
        found_call: bool,
        host: &mut dyn Host,
    ) -> SimResult<()> {
        let words = self
            .resources
            .lives
            .get(&life)
            .cloned()
            .ok_or(SimError::MissingResource {
                kind: "life",
                index: life,
            })?;
        let previous = self.current_actor;
        let mut run = LifeRun {
            owner: slot,
            found_call,
            switch_value: 0,
        };
        let mut cursor = ScriptCursor::new(&words);
        let mut result = Err(SimError::RunawayScript {
            life,
            cursor: 0,
            actor: slot,
        });
        for _ in 0..MAX_STATEMENTS {
            self.current_actor = slot;
            match self.execute(&mut cursor, &mut run, host) {
                Ok(Flow::Next) => {}
                Ok(Flow::Exit) => {
                    result = Ok(());
                    break;
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        if let Err(SimError::RunawayScript { cursor: at, .. }) = &mut result {
            *at = cursor.byte_offset();
        }
        self.current_actor = previous;
        result
    }

    /// Decodes and runs one statement.
    fn execute(
        &mut self,
        cursor: &mut ScriptCursor<'_>,
        run: &mut LifeRun,
        host: &mut dyn Host,
    ) -> SimResult<Flow> {
        let start = cursor.byte_offset();
        let raw = cursor.word()? as u16;
        let code = raw & 0x7FFF;
        let op = self
            .edition
            .life_macro(code)
            .ok_or(SimError::UnmappedOpcode {
                raw: code,
                cursor: start,
                actor: run.owner,
            })?;

        let mut slot = run.owner;
        if raw & 0x8000 != 0 {
            let object = cursor.word()?;
            if object == -1 {
                return Err(SimError::BadWorldObject(object));
            }
            match self.live_slot(object)? {
                Some(live) => slot = live,
                None => {
                    trace!("{:#06x}: {} on dormant object {object}", start, op.name());
                    self.dormant_statement(op, object, cursor, run.owner, start)?;
                    return Ok(Flow::Next);
                }
            }
        }
        trace!("{:#06x}: {} on slot {slot}", start, op.name());
        self.current_actor = slot;
        let flow = self.statement(op, slot, cursor, run, start, host);
        self.current_actor = run.owner;
        flow
    }

    fn dormant_statement(
        &mut self,
        op: LifeMacro,
        object: i16,
        cursor: &mut ScriptCursor<'_>,
        owner: usize,
        start: usize,
    ) -> SimResult<()> {
        let edition = self.edition;
        match op {
            LifeMacro::Body => {
                let body = self.eval_var(cursor, owner)? as i16;
                self.object_mut(object)?.body = body;
            }
            LifeMacro::BodyReset => {
                let body = self.eval_var(cursor, owner)? as i16;
                let anim = self.eval_var(cursor, owner)? as i16;
                let target = self.object_mut(object)?;
                target.body = body;
                target.anim = anim;
            }
            LifeMacro::Type => {
                let kind = cursor.word()? & AF_MASK as i16;
                let target = self.object_mut(object)?;
                target.flags = (target.flags & !(AF_MASK as i16)) | kind;
            }
            LifeMacro::AnimOnce | LifeMacro::AnimAllOnce | LifeMacro::AnimReset => {
                let [anim, info] = cursor.words()?;
                let target = self.object_mut(object)?;
                target.anim = anim;
                target.anim_info = info;
                target.anim_type = match op {
                    LifeMacro::AnimOnce => ANIM_ONCE,
                    LifeMacro::AnimAllOnce => ANIM_ONCE | ANIM_UNINTERRUPTABLE,
                    _ => ANIM_ONCE | ANIM_RESET,
                };
                if op == LifeMacro::AnimReset || edition >= Edition::Jack {
                    target.frame = 0;
                }
            }
            LifeMacro::AnimRepeat => {
                let anim = cursor.word()?;
                let target = self.object_mut(object)?;
                target.anim = anim;
                target.anim_info = -1;
                target.anim_type = ANIM_REPEAT;
                if edition >= Edition::Jack {
                    target.frame = 0;
                }
            }
            LifeMacro::Move => {
                let [mode, number] = cursor.words()?;
                let target = self.object_mut(object)?;
                target.track_mode = mode;
                target.track_number = number;
                target.position_in_track = 0;
                if edition > Edition::Aitd1 {
                    target.mark = -1;
                }
            }
            LifeMacro::Angle => {
                let [alpha, beta, gamma] = cursor.words()?;
                let target = self.object_mut(object)?;
                target.alpha = alpha;
                target.beta = beta;
                target.gamma = gamma;
            }
            LifeMacro::Stage => {
                let [stage, room, x, y, z] = cursor.words()?;
                let target = self.object_mut(object)?;
                target.stage = stage;
                target.room = room;
                target.x = x;
                target.y = y;
                target.z = z;
            }
            LifeMacro::TestCol => {
                let enabled = cursor.word()? != 0;
                let target = self.object_mut(object)?;
                if enabled {
                    target.flags |= AF_SPECIAL as i16;
                } else {
                    target.flags &= !(AF_SPECIAL as i16);
                }
            }
            LifeMacro::Life => self.object_mut(object)?.life = cursor.word()?,
            LifeMacro::LifeMode => self.object_mut(object)?.life_mode = cursor.word()?,
            LifeMacro::FoundName => self.object_mut(object)?.found_name = cursor.word()?,
            LifeMacro::FoundBody => self.object_mut(object)?.found_body = cursor.word()?,
            LifeMacro::FoundFlag => {
                let flags = cursor.word()?;
                set_found_flags(self.object_mut(object)?, flags);
            }
            LifeMacro::FoundWeight => {
                self.object_mut(object)?.position_in_track = cursor.word()?;
            }
            LifeMacro::StartChrono => {}
            _ => {
                return Err(SimError::UnsupportedOpcode {
                    op: op.name(),
                    cursor: start,
                    actor: owner,
                });
            }
        }
        Ok(())
    }

    fn own_object(&mut self, slot: usize) -> SimResult<&mut WorldObject> {
        let index = self.actors[slot].index_in_world;
        self.object_mut(index)
    }

    fn expr(&mut self, cursor: &mut ScriptCursor<'_>, run: &LifeRun) -> SimResult<i16> {
        Ok(self.eval_var(cursor, run.owner)? as i16)
    }

    #[allow(clippy::too_many_lines)]
    fn statement(
        &mut self,
        op: LifeMacro,
        slot: usize,
        cursor: &mut ScriptCursor<'_>,
        run: &mut LifeRun,
        start: usize,
        host: &mut dyn Host,
    ) -> SimResult<Flow> {
        let edition = self.edition;
        let up_to_jack = edition <= Edition::Jack;
        let time_gate = edition == Edition::TimeGate;
        match op {
            // Animation.
            LifeMacro::AnimOnce | LifeMacro::AnimReset => {
                let [anim, info] = cursor.words()?;
                if anim == -1 {
                    let actor = &mut self.actors[slot];
                    actor.anim = -1;
                    actor.new_anim = -2;
                } else {
                    let kind = if op == LifeMacro::AnimOnce {
                        ANIM_ONCE
                    } else {
                        ANIM_RESET
                    };
                    self.init_anim(slot, anim, kind, info);
                }
            }
            LifeMacro::AnimRepeat => {
                let anim = cursor.word()?;
                self.init_anim(slot, anim, ANIM_REPEAT, -1);
            }
            LifeMacro::AnimAllOnce => {
                let [anim, info] = cursor.words()?;
                self.init_anim(slot, anim, ANIM_UNINTERRUPTABLE, info);
            }
            LifeMacro::AnimHybrideOnce | LifeMacro::AnimHybrideRepeat => {
                let [anim, body] = cursor.words()?;
                debug!("{} anim {anim} body {body} ignored", op.name());
            }
            LifeMacro::AnimMove => {
                let anims: [i16; 7] = cursor.words()?;
                self.anim_move(slot, anims);
            }
            LifeMacro::Body => {
                let body = self.expr(cursor, run)?;
                self.own_object(slot)?.body = body;
                let actor = &self.actors[slot];
                if actor.body_num != body {
                    let (flags, anim, frame) = (actor.flags, actor.anim, actor.frame);
                    self.actors[slot].body_num = body;
                    if flags & AF_ANIMATED == 0 {
                        self.flag_init_view = 1;
                    } else if anim != -1 && body != -1 {
                        self.set_inter_anim_objet(frame, anim, body);
                    }
                }
            }
            LifeMacro::BodyReset => {
                let body = self.expr(cursor, run)?;
                let anim = self.expr(cursor, run)?;
                let object = self.own_object(slot)?;
                object.body = body;
                object.anim = anim;
                self.actors[slot].body_num = body;
                if self.actors[slot].flags & AF_ANIMATED != 0 {
                    let current = self.actors[slot].anim;
                    self.set_anim_objet(0, current, body);
                    self.init_anim(slot, anim, ANIM_RESET, -1);
                } else {
                    self.flag_init_view = 1;
                }
            }

            // Collision volumes.
            LifeMacro::DoRealZv | LifeMacro::DoRotZv | LifeMacro::DoMaxZv
            | LifeMacro::DoNormalZv | LifeMacro::DoCarreZv => self.body_zv(op, slot),
            LifeMacro::DefZv => {
                let [x1, x2, y1, y2, z1, z2] = cursor.words()?;
                let actor = &mut self.actors[slot];
                actor.zv = Zv::from_extents([x1, x2, y1, y2, z1, z2])
                    .translated(actor.stepped_position());
            }
            LifeMacro::DefAbsZv => {
                let extents: [i16; 6] = cursor.words()?;
                self.actors[slot].zv = Zv::from_extents(extents);
            }
            LifeMacro::GetHardClip => self.get_hard_clip(slot),
            LifeMacro::Type => {
                let kind = cursor.word()? as u16 & AF_MASK;
                let previous = self.actors[slot].flags;
                self.actors[slot].flags = (previous & !AF_MASK) | kind;
                if edition > Edition::Aitd1 {
                    if previous & AF_ANIMATED != 0 && kind & AF_ANIMATED == 0 {
                        self.add_actor_to_bg_incrust(slot);
                    }
                    if kind & AF_ANIMATED != 0 && previous & AF_BOXIFY == 0 {
                        self.remove_from_bg_incrust(slot);
                    }
                }
            }
            LifeMacro::TestCol => {
                let enabled = cursor.word()? != 0;
                let actor = &mut self.actors[slot];
                if enabled {
                    actor.dyn_flags |= 1;
                } else {
                    actor.dyn_flags &= !1;
                }
            }

            // Combat.
            LifeMacro::Hit => {
                let [anim, frame, group, size] = cursor.words()?;
                let force = self.expr(cursor, run)?;
                let next = cursor.word()?;
                if self.init_anim(slot, anim, ANIM_ONCE, next) {
                    self.start_action(slot, WAIT_HIT_ANIM, anim, frame, group, size, force);
                }
            }
            LifeMacro::Fire => {
                let (anim, frame, emit, size, force, next) = if edition.is_first_generation() {
                    let [anim, frame, emit, size, force, next] = cursor.words()?;
                    (anim, frame, emit, size, force, next)
                } else {
                    let anim = self.expr(cursor, run)?;
                    let [frame, emit, model, size, force] = cursor.words()?;
                    debug!("FIRE emitter model {model} not simulated");
                    let next = self.expr(cursor, run)?;
                    (anim, frame, emit, size, force, next)
                };
                if self.init_anim(slot, anim, ANIM_UNINTERRUPTABLE, next) {
                    self.start_action(slot, WAIT_FIRE_ANIM, anim, frame, emit, size, force);
                }
            }
            LifeMacro::FireUpDown => {
                self.expr(cursor, run)?;
                cursor.words::<6>()?;
                self.expr(cursor, run)?;
                debug!("FIRE_UP_DOWN not simulated");
            }
            LifeMacro::HitObject => {
                let [flags, force] = cursor.words()?;
                let actor = &mut self.actors[slot];
                actor.action_type = HIT_OBJECT;
                actor.action_param = flags;
                actor.hit_force = force;
                actor.hot_point_id = -1;
            }
            LifeMacro::StopHitObject => {
                let actor = &mut self.actors[slot];
                if actor.action_type == HIT_OBJECT {
                    actor.action_type = ACTION_NONE;
                    actor.action_param = 0;
                    actor.hit_force = 0;
                    actor.hot_point_id = -1;
                }
            }
            LifeMacro::Throw => {
                let [anim, frame, hot_point, object, rotated, force, next] = cursor.words()?;
                if self.init_anim(slot, anim, ANIM_UNINTERRUPTABLE, next) {
                    self.start_action(slot, WAIT_THROW_ANIM, anim, frame, hot_point, object, force);
                    let thrown = self.object_mut(object)?;
                    if rotated == 0 {
                        thrown.gamma = thrown.gamma.wrapping_sub(0x100);
                    }
                    thrown.flags2 |= FLAG2_THROWN;
                }
            }

            // Movement.
            LifeMacro::Move => {
                let [mode, number] = cursor.words()?;
                self.set_move_mode(slot, mode, number);
            }
            LifeMacro::DoMove => self.process_track(slot)?,
            LifeMacro::ResetMoveManual => self.actors[slot].rotate.param = 0,
            LifeMacro::ContinueTrack => {
                let actor = &self.actors[slot];
                let waiting = self
                    .resources
                    .tracks
                    .get(&actor.track_number)
                    .and_then(|track| {
                        usize::try_from(actor.position_in_track)
                            .ok()
                            .and_then(|position| track.get(position))
                    })
                    .is_some_and(|op| *op == 5);
                if waiting {
                    self.actors[slot].position_in_track += 1;
                }
            }
            LifeMacro::ManualRot => {
                let span = if edition == Edition::Aitd1 { 240 } else { 90 };
                self.gere_manual_rot(slot, span);
            }
            LifeMacro::SetBeta | LifeMacro::SetAlpha => {
                let [angle, speed] = cursor.words()?;
                let timer = self.timer;
                let actor = &mut self.actors[slot];
                let current = if op == LifeMacro::SetBeta {
                    actor.beta
                } else {
                    actor.alpha
                };
                if current != angle {
                    if actor.rotate.param == 0 || actor.rotate.new_value != angle {
                        actor
                            .rotate
                            .init(i32::from(current), i32::from(angle), i32::from(speed), timer);
                    }
                    let turned = actor.rotate.update_rotation(timer) as i16;
                    if op == LifeMacro::SetBeta {
                        actor.beta = turned;
                    } else {
                        actor.alpha = turned;
                    }
                }
            }
            LifeMacro::Angle => {
                let [alpha, beta, gamma] = cursor.words()?;
                let actor = &mut self.actors[slot];
                actor.alpha = alpha;
                actor.beta = beta;
                actor.gamma = gamma;
            }
            LifeMacro::CopyAngle => {
                let object = cursor.word()?;
                let angles = match self.live_slot(object)? {
                    Some(live) => {
                        let other = &self.actors[live];
                        [other.alpha, other.beta, other.gamma]
                    }
                    None => {
                        let other = self.object(object)?;
                        [other.alpha, other.beta, other.gamma]
                    }
                };
                let actor = &mut self.actors[slot];
                [actor.alpha, actor.beta, actor.gamma] = angles;
            }
            LifeMacro::Stage => {
                let [stage, room, x, y, z] = cursor.words()?;
                self.set_stage(slot, stage, room, [x, y, z].map(i32::from));
            }
            LifeMacro::UpCoorY => {
                let timer = self.timer;
                self.actors[slot].y_handler.init(0, -2000, -1, timer);
            }
            LifeMacro::Speed => {
                let speed = cursor.word()?;
                self.actors[slot].speed = speed;
            }

            // Script state.
            LifeMacro::Life => self.actors[slot].life = cursor.word()?,
            LifeMacro::StageLife => {
                let life = cursor.word()?;
                self.own_object(slot)?.floor_life = life;
            }
            LifeMacro::LifeMode => {
                let mode = cursor.word()?;
                let actor = &mut self.actors[slot];
                let current = if up_to_jack {
                    actor.life_mode
                } else {
                    actor.life_mode & 3
                };
                if mode != current {
                    actor.life_mode = mode;
                }
            }
            LifeMacro::StartChrono => self.actors[slot].chrono = self.timer,

            // World objects and the inventory.
            LifeMacro::Delete => {
                let object = if up_to_jack {
                    cursor.word()?
                } else {
                    self.expr(cursor, run)?
                };
                self.remove_world_object(object)?;
                let target = self.object_mut(object)?;
                if target.found_body != -1 {
                    if edition == Edition::Aitd1 {
                        target.flags2 &= !FLAG2_IN_INVENTORY;
                    }
                    target.flags2 |= FLAG2_DROPPED;
                }
            }
            LifeMacro::Special => {
                let kind = cursor.word()?;
                self.special(slot, kind);
            }
            LifeMacro::Found => {
                let object = cursor.word()?;
                let mode = if edition != Edition::Aitd1 && run.found_call {
                    2
                } else {
                    1
                };
                self.found_object(object, mode, host)?;
            }
            LifeMacro::Take => {
                if time_gate {
                    self.expr(cursor, run)?;
                    cursor.words::<3>()?;
                    debug!("TAKE with a hand slot is not simulated");
                } else {
                    let object = cursor.word()?;
                    self.take(object, host)?;
                }
            }
            LifeMacro::InHand => {
                self.in_hand = if up_to_jack {
                    cursor.word()?
                } else {
                    self.expr(cursor, run)?
                };
            }
            LifeMacro::Drop => {
                let object = self.expr(cursor, run)?;
                let at = cursor.word()?;
                self.put_at_objet(object, at)?;
            }
            LifeMacro::Put => {
                let [object, x, y, z, room, stage, alpha, beta, gamma] = cursor.words()?;
                self.put(object, [x, y, z], room, stage, [alpha, beta, gamma])?;
            }
            LifeMacro::PutAt => {
                let [object, at] = cursor.words()?;
                self.put_at_objet(object, at)?;
            }
            LifeMacro::FoundName => {
                let name = cursor.word()?;
                self.own_object(slot)?.found_name = name;
            }
            LifeMacro::FoundBody => {
                let body = cursor.word()?;
                self.own_object(slot)?.found_body = body;
            }
            LifeMacro::FoundFlag => {
                let flags = cursor.word()?;
                set_found_flags(self.own_object(slot)?, flags);
            }
            LifeMacro::FoundWeight => {
                let weight = cursor.word()?;
                self.own_object(slot)?.position_in_track = weight;
            }
            LifeMacro::FoundLife => {
                let life = cursor.word()?;
                self.own_object(slot)?.found_life = life;
            }
            LifeMacro::Inventory => self.status_screen_allowed = cursor.word()?,
            LifeMacro::SetInventory => {
                let inventory = cursor.word()?;
                debug!("SET_INVENTORY {inventory} ignored");
            }
            LifeMacro::CallInventory => host.open_inventory(),

            // Presentation.
            LifeMacro::Read => {
                let [book, page] = cursor.words()?;
                if edition.is_first_generation() {
                    let voice = cursor.word()?;
                    trace!("READ voice track {voice}");
                }
                host.read_book(page + 1, book);
                self.flag_init_view = 2;
            }
            LifeMacro::ReadOnPicture => {
                let [picture, page, book, ..]: [i16; 8] = cursor.words()?;
                host.show_picture(picture, 0, -1);
                host.read_book(page + 1, book);
                self.flag_init_view = 2;
            }
            LifeMacro::Picture => {
                let [picture, delay] = cursor.words()?;
                let sample = if time_gate {
                    let sample = self.expr(cursor, run)?;
                    cursor.word()?;
                    sample
                } else {
                    cursor.word()?
                };
                host.show_picture(picture, delay, sample);
                self.flag_init_view = 1;
            }
            LifeMacro::PlaySequence => {
                let [sequence, fade_in, fade_out] = cursor.words()?;
                host.play_sequence(sequence, fade_in, fade_out);
            }
            LifeMacro::DefSequenceSample => {
                let count = cursor.word()?;
                let mut samples = Vec::with_capacity(count.max(0) as usize);
                for _ in 0..count.max(0) {
                    let [frame, sample] = cursor.words()?;
                    samples.push((frame, sample));
                }
                self.sequence_samples = samples;
            }
            LifeMacro::EndSequence => host.end_sequence(),
            LifeMacro::Message => {
                let text = cursor.word()?;
                self.make_message(text);
            }
            LifeMacro::MessageValue => {
                let [text, _value] = cursor.words()?;
                self.make_message(text);
            }
            LifeMacro::CameraTarget => {
                let target = cursor.word()?;
                self.camera_target_object(target)?;
            }
            LifeMacro::Light => {
                let light = 2 - (cursor.word()? << 1);
                let allowed = edition >= Edition::Jack || self.cvar(CVar::KilledSorcerer) == 0;
                if allowed && self.light_off != light {
                    self.light_off = light;
                    self.new_flag_light = true;
                }
            }
            LifeMacro::Shaking => self.shaking = cursor.word()?,
            LifeMacro::Pluie => self.rain = cursor.word()?,
            LifeMacro::Water => self.water = cursor.word()?,
            LifeMacro::SetGround => self.ground = cursor.word()?,
            LifeMacro::DoRotClut => {
                cursor.words::<3>()?;
            }

            // Audio.
            LifeMacro::Sample => {
                let sample = if time_gate {
                    let sample = self.expr(cursor, run)?;
                    cursor.word()?;
                    sample
                } else if up_to_jack {
                    self.expr(cursor, run)?
                } else {
                    cursor.word()?
                };
                host.play_sample(sample);
            }
            LifeMacro::AnimSample | LifeMacro::AnimSample2d => {
                let sample = self.expr(cursor, run)?;
                if time_gate && op == LifeMacro::AnimSample {
                    cursor.word()?;
                }
                let [anim, frame] = cursor.words()?;
                let actor = &self.actors[slot];
                if op == LifeMacro::AnimSample
                    && actor.end_frame
                    && actor.anim == anim
                    && actor.frame == frame
                {
                    host.play_sample(sample);
                }
            }
            LifeMacro::RepSample => {
                if edition.is_first_generation() || time_gate {
                    self.expr(cursor, run)?;
                    cursor.word()?;
                } else {
                    cursor.words::<2>()?;
                }
                debug!("REP_SAMPLE not simulated");
            }
            LifeMacro::StopSample => {
                if time_gate {
                    cursor.word()?;
                }
            }
            LifeMacro::SampleThen => {
                let (sample, next) = if up_to_jack {
                    (self.expr(cursor, run)?, self.expr(cursor, run)?)
                } else {
                    let [sample, next] = cursor.words()?;
                    (sample, next)
                };
                host.play_sample(sample);
                self.next_sample = next;
            }
            LifeMacro::SampleThenRepeat => {
                let sample = self.expr(cursor, run)?;
                host.play_sample(sample);
                self.next_sample = self.expr(cursor, run)? | 0x4000;
            }
            LifeMacro::Music => {
                let music = cursor.word()?;
                self.play_music(music, host);
            }
            LifeMacro::NextMusic => {
                let music = cursor.word()?;
                if self.current_music == -1 {
                    self.play_music(music, host);
                } else {
                    self.next_music = music;
                }
            }
            LifeMacro::FadeMusic => {
                let music = cursor.word()?;
                if self.current_music == -1 {
                    self.play_music(music, host);
                } else {
                    host.fade_music(music);
                    self.current_music = -2;
                    self.next_music = music;
                }
            }
            LifeMacro::RndFreq => {
                cursor.word()?;
            }
            LifeMacro::StartFadeInMusicLoop => {
                cursor.words::<5>()?;
            }

            // Variables.
            LifeMacro::Var => {
                let index = cursor.word()?;
                let value = self.expr(cursor, run)?;
                self.set_var(index, value);
            }
            LifeMacro::Inc | LifeMacro::Dec => {
                let index = cursor.word()?;
                let delta = if op == LifeMacro::Inc { 1 } else { -1 };
                let value = self.var(index).wrapping_add(delta);
                self.set_var(index, value);
            }
            LifeMacro::Add | LifeMacro::Sub => {
                let index = cursor.word()?;
                let operand = self.expr(cursor, run)?;
                let value = if op == LifeMacro::Add {
                    self.var(index).wrapping_add(operand)
                } else {
                    self.var(index).wrapping_sub(operand)
                };
                self.set_var(index, value);
            }
            LifeMacro::CVar | LifeMacro::ModifCVar => {
                let index = cursor.word()?;
                let value = self.expr(cursor, run)?;
                match usize::try_from(index).ok().and_then(|i| self.cvars.get_mut(i)) {
                    Some(cvar) => *cvar = value,
                    None => warn!("c-variable {index} does not exist in {edition:?}"),
                }
            }

            // Control flow.
            LifeMacro::IfEgal
            | LifeMacro::IfDifferent
            | LifeMacro::IfSupEgal
            | LifeMacro::IfSup
            | LifeMacro::IfInfEgal
            | LifeMacro::IfInf => {
                let left = self.eval_var(cursor, run.owner)?;
                let right = self.eval_var(cursor, run.owner)?;
                let taken = match op {
                    LifeMacro::IfEgal => left == right,
                    LifeMacro::IfDifferent => left != right,
                    LifeMacro::IfSupEgal => left >= right,
                    LifeMacro::IfSup => left > right,
                    LifeMacro::IfInfEgal => left <= right,
                    _ => left < right,
                };
                cursor.branch(taken)?;
            }
            LifeMacro::Goto => {
                let count = cursor.word()?;
                cursor.skip(count)?;
            }
            LifeMacro::Switch => run.switch_value = self.eval_var(cursor, run.owner)?,
            LifeMacro::Case => {
                let value = cursor.word()?;
                cursor.branch(i32::from(value) == run.switch_value)?;
            }
            LifeMacro::MultiCase => {
                let count = cursor.word()?;
                let mut matched = false;
                for _ in 0..count.max(0) {
                    matched |= i32::from(cursor.word()?) == run.switch_value;
                }
                cursor.branch(matched)?;
            }
            LifeMacro::Return | LifeMacro::End => return Ok(Flow::Exit),
            LifeMacro::GameOver | LifeMacro::WaitGameOver => {
                info!("game over requested by slot {}", run.owner);
                self.game_over = true;
                return Ok(Flow::Exit);
            }
            _ => {
                return Err(SimError::UnsupportedOpcode {
                    op: op.name(),
                    cursor: start,
                    actor: run.owner,
                });
            }
        }
        Ok(Flow::Next)
    }

    #[allow(clippy::too_many_arguments)]
    fn start_action(
        &mut self,
        slot: usize,
        kind: i16,
        anim: i16,
        frame: i16,
        hot_point: i16,
        param: i16,
        force: i16,
    ) {
        let actor = &mut self.actors[slot];
        actor.action_anim = anim;
        actor.action_frame = frame;
        actor.action_type = kind;
        actor.hot_point_id = hot_point;
        actor.action_param = param;
        actor.hit_force = force;
    }

    /// Picks the locomotion animation matching the actor's speed and turn.
    /// `anims` is stand, walk, run, stop, backward, turn right, turn left.
    fn anim_move(&mut self, slot: usize, anims: [i16; 7]) {
        let [stand, walk, run, stop, backward, turn_right, turn_left] = anims;
        let actor = &self.actors[slot];
        let (speed, anim, direction) = (actor.speed, actor.anim, actor.direction);
        match speed {
            5 => {
                self.init_anim(slot, run, ANIM_REPEAT, -1);
            }
            4 => {
                self.init_anim(slot, walk, ANIM_REPEAT, -1);
            }
            -1 if anim == walk => {
                self.init_anim(slot, stand, ANIM_ONCE, backward);
            }
            -1 if anim == run => {
                self.init_anim(slot, stop, ANIM_ONCE, stand);
            }
            -1 => {
                self.init_anim(slot, backward, ANIM_REPEAT, -1);
            }
            0 if anim == walk || anim == run => {
                self.init_anim(slot, stop, ANIM_ONCE, stand);
            }
            0 => match direction {
                0 => {
                    self.init_anim(slot, stand, ANIM_REPEAT, -1);
                }
                1 => {
                    self.init_anim(slot, turn_left, ANIM_ONCE, stand);
                }
                -1 => {
                    self.init_anim(slot, turn_right, ANIM_ONCE, stand);
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn body_zv(&mut self, op: LifeMacro, slot: usize) {
        let actor = &self.actors[slot];
        let Some(body) = self.resources.body(actor.body_num) else {
            debug!("{}: slot {slot} has no body {}", op.name(), actor.body_num);
            return;
        };
        let zv = match op {
            LifeMacro::DoRealZv => zv_real(body, actor.alpha, actor.beta, actor.gamma),
            LifeMacro::DoRotZv => zv_rot(body, actor.alpha, actor.beta, actor.gamma),
            LifeMacro::DoMaxZv => zv_max(body),
            LifeMacro::DoCarreZv => zv_cube(body),
            _ => give_zv(body),
        };
        let zv = zv.translated(actor.room_pos);
        self.actors[slot].zv = zv;
    }

    /// Stores the first room wall the actor's volume touches, or an empty
    /// inverted box.
    fn get_hard_clip(&mut self, slot: usize) {
        let actor = &self.actors[slot];
        let clip = room(&self.rooms, actor.room).and_then(|data| {
            data.hard_cols
                .iter()
                .map(|hard| Zv::from_extents(hard.zv))
                .find(|hard| actor.zv.collides(hard))
        });
        self.hard_clip = clip.unwrap_or(Zv {
            x1: 32000,
            x2: -32000,
            y1: 32000,
            y2: -32000,
            z1: 32000,
            z2: -32000,
        });
    }

    fn special(&mut self, slot: usize, kind: i16) {
        let actor = &self.actors[slot];
        match kind {
            0 | 4 => {
                let position = actor.stepped_position();
                let angles = [actor.alpha, actor.beta, actor.gamma];
                let (stage, room, zv) = (actor.stage, actor.room, actor.zv);
                self.init_special_objet(kind, position, stage, room, angles, Some(zv));
            }
            1 => {
                let Some(source) = usize::try_from(actor.hit_by)
                    .ok()
                    .and_then(|index| self.actors.get(index))
                else {
                    debug!("SPECIAL flow: slot {slot} was not hit");
                    return;
                };
                let stepped = source.stepped_position();
                let position = [
                    stepped[0] + source.hot_point[0],
                    stepped[1] + source.hot_point[1],
                    stepped[2] + source.hot_point[2],
                ];
                let angles = [0, source.beta.wrapping_neg(), 0];
                let (stage, room, zv) = (source.stage, source.room, source.zv);
                self.init_special_objet(kind, position, stage, room, angles, Some(zv));
            }
            _ => debug!("SPECIAL {kind} has no effect"),
        }
    }

    /// Moves the actor in `slot` to a position in `room` of floor `stage`.
    /// When it is the camera target this schedules the floor or room
    /// change.
    pub fn set_stage(&mut self, slot: usize, stage: i16, room: i16, position: [i32; 3]) {
        let edition = self.edition;
        let is_target = self.camera_target == slot as i16;
        let world = self.to_current_room(room, position);
        let actor = &mut self.actors[slot];
        actor.stage = stage;
        actor.room = room;
        if edition != Edition::Aitd1 {
            actor.hard_mat = -1;
        }
        let stepped = actor.stepped_position();
        actor.zv.translate([
            position[0] - stepped[0],
            position[1] - stepped[1],
            position[2] - stepped[2],
        ]);
        actor.room_pos = position;
        actor.world = if is_target { position } else { world };
        actor.step = [0; 3];

        if is_target {
            if stage != self.current_floor {
                self.change_floor = true;
                self.new_floor = stage;
                self.new_room = room;
            } else if room != self.current_room {
                self.need_change_room = true;
                self.new_room = room;
            }
        }
    }

    fn camera_target_object(&mut self, target: i16) -> SimResult<()> {
        if target == self.current_world_target {
            return Ok(());
        }
        let (stage, room) = match self.live_slot(target)? {
            Some(live) => {
                let actor = &self.actors[live];
                let (stage, room) = (actor.stage, actor.room);
                self.current_world_target = target;
                if self.edition == Edition::Aitd1 || stage == self.current_floor {
                    self.camera_target = live as i16;
                    if room != self.current_room {
                        self.need_change_room = true;
                        self.new_room = room;
                    }
                    return Ok(());
                }
                (stage, room)
            }
            None => {
                let object = self.object(target)?;
                let (stage, room) = (object.stage, object.room);
                self.current_world_target = target;
                if stage == self.current_floor {
                    if room != self.current_room {
                        self.need_change_room = true;
                        self.new_room = room;
                    }
                    return Ok(());
                }
                (stage, room)
            }
        };
        self.change_floor = true;
        self.new_floor = stage;
        self.new_room = room;
        Ok(())
    }

    fn play_music(&mut self, music: i16, host: &mut dyn Host) {
        host.play_music(music);
        self.current_music = music;
    }
}

/// Replaces the script-owned low bits of `flags2`, keeping the inventory,
/// dropped and reserved bits.
fn set_found_flags(object: &mut WorldObject, flags: i16) {
    object.flags2 &= 0xE000u16 as i16;
    object.flags2 |= flags;
}
