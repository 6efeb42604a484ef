use anyhow::{Result, anyhow, bail, ensure};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Game release a data set belongs to. Ordering follows release order, which
/// several behaviours are gated on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Edition {
    Aitd1,
    Jack,
    Aitd2,
    Aitd3,
    TimeGate,
}

impl Edition {
    /// The first release uses its own opcode numbering, expression selectors
    /// and track opcodes.
    pub fn is_first_generation(self) -> bool {
        self == Edition::Aitd1
    }

    pub fn cvar_count(self) -> usize {
        match self {
            Edition::Aitd1 => 45,
            Edition::Jack => 15,
            Edition::Aitd2 | Edition::Aitd3 | Edition::TimeGate => 70,
        }
    }

    pub fn life_table(self) -> &'static [LifeMacro] {
        if self.is_first_generation() {
            AITD1_LIFE_TABLE
        } else {
            AITD2_LIFE_TABLE
        }
    }

    /// Resolves a raw opcode word (high bit already stripped) to its symbolic
    /// macro.
    pub fn life_macro(self, raw: u16) -> Option<LifeMacro> {
        match self.life_table().get(raw as usize) {
            Some(LifeMacro::Invalid) | None => None,
            Some(op) => Some(*op),
        }
    }

    pub fn track_op(self, raw: i16) -> Option<TrackOp> {
        if self.is_first_generation() {
            TrackOp::from_first_generation(raw)
        } else {
            TrackOp::from_later_generation(raw)
        }
    }

    fn cvar_table(self) -> &'static [CVar] {
        if self.is_first_generation() {
            AITD1_CVARS
        } else {
            LATER_CVARS
        }
    }

    /// Slot of a named c-variable in this edition's table, if it has one.
    pub fn cvar_index(self, cvar: CVar) -> Option<usize> {
        self.cvar_table()
            .iter()
            .position(|known| *known == cvar)
            .filter(|index| *index < self.cvar_count())
    }
}

macro_rules! life_macros {
    ($($variant:ident => $name:literal,)*) => {
        /// Symbolic LIFE opcodes, independent of any edition's numbering.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum LifeMacro {
            $($variant,)*
        }

        impl LifeMacro {
            pub fn name(self) -> &'static str {
                match self {
                    $(LifeMacro::$variant => $name,)*
                }
            }
        }
    };
}

life_macros! {
    DoMove => "DO_MOVE",
    AnimOnce => "ANIM_ONCE",
    AnimAllOnce => "ANIM_ALL_ONCE",
    Body => "BODY",
    IfEgal => "IF_EGAL",
    IfDifferent => "IF_DIFFERENT",
    IfSupEgal => "IF_SUP_EGAL",
    IfSup => "IF_SUP",
    IfInfEgal => "IF_INF_EGAL",
    IfInf => "IF_INF",
    Goto => "GOTO",
    Return => "RETURN",
    End => "END",
    AnimRepeat => "ANIM_REPEAT",
    AnimMove => "ANIM_MOVE",
    Move => "MOVE",
    Hit => "HIT",
    Message => "MESSAGE",
    MessageValue => "MESSAGE_VALUE",
    Var => "VAR",
    Inc => "INC",
    Dec => "DEC",
    Add => "ADD",
    Sub => "SUB",
    LifeMode => "LIFE_MODE",
    Switch => "SWITCH",
    Case => "CASE",
    Camera => "CAMERA",
    StartChrono => "START_CHRONO",
    MultiCase => "MULTI_CASE",
    Found => "FOUND",
    Life => "LIFE",
    Delete => "DELETE",
    Take => "TAKE",
    InHand => "IN_HAND",
    Read => "READ",
    AnimSample => "ANIM_SAMPLE",
    Special => "SPECIAL",
    DoRealZv => "DO_REAL_ZV",
    Sample => "SAMPLE",
    Type => "TYPE",
    GameOver => "GAME_OVER",
    ManualRot => "MANUAL_ROT",
    RndFreq => "RND_FREQ",
    Music => "MUSIC",
    SetBeta => "SET_BETA",
    DoRotZv => "DO_ROT_ZV",
    Stage => "STAGE",
    FoundName => "FOUND_NAME",
    FoundFlag => "FOUND_FLAG",
    FoundLife => "FOUND_LIFE",
    CameraTarget => "CAMERA_TARGET",
    Drop => "DROP",
    Fire => "FIRE",
    TestCol => "TEST_COL",
    FoundBody => "FOUND_BODY",
    SetAlpha => "SET_ALPHA",
    StopBeta => "STOP_BETA",
    DoMaxZv => "DO_MAX_ZV",
    Put => "PUT",
    CVar => "C_VAR",
    DoNormalZv => "DO_NORMAL_ZV",
    DoCarreZv => "DO_CARRE_ZV",
    SampleThen => "SAMPLE_THEN",
    Light => "LIGHT",
    Shaking => "SHAKING",
    Inventory => "INVENTORY",
    FoundWeight => "FOUND_WEIGHT",
    UpCoorY => "UP_COOR_Y",
    Speed => "SPEED",
    PutAt => "PUT_AT",
    DefZv => "DEF_ZV",
    HitObject => "HIT_OBJECT",
    GetHardClip => "GET_HARD_CLIP",
    Angle => "ANGLE",
    RepSample => "REP_SAMPLE",
    Throw => "THROW",
    Water => "WATER",
    Picture => "PICTURE",
    StopSample => "STOP_SAMPLE",
    NextMusic => "NEXT_MUSIC",
    FadeMusic => "FADE_MUSIC",
    StopHitObject => "STOP_HIT_OBJECT",
    CopyAngle => "COPY_ANGLE",
    EndSequence => "END_SEQUENCE",
    SampleThenRepeat => "SAMPLE_THEN_REPEAT",
    WaitGameOver => "WAIT_GAME_OVER",
    GetMatrice => "GET_MATRICE",
    StageLife => "STAGE_LIFE",
    ContinueTrack => "CONTINUE_TRACK",
    AnimReset => "ANIM_RESET",
    ResetMoveManual => "RESET_MOVE_MANUAL",
    Pluie => "PLUIE",
    AnimHybrideOnce => "ANIM_HYBRIDE_ONCE",
    AnimHybrideRepeat => "ANIM_HYBRIDE_REPEAT",
    ModifCVar => "MODIF_C_VAR",
    CallInventory => "CALL_INVENTORY",
    BodyReset => "BODY_RESET",
    DelInventory => "DEL_INVENTORY",
    SetInventory => "SET_INVENTORY",
    PlaySequence => "PLAY_SEQUENCE",
    AnimSample2d => "2D_ANIM_SAMPLE",
    SetGround => "SET_GROUND",
    Protect => "PROTECT",
    DefAbsZv => "DEF_ABS_ZV",
    DefSequenceSample => "DEF_SEQUENCE_SAMPLE",
    ReadOnPicture => "READ_ON_PICTURE",
    FireUpDown => "FIRE_UP_DOWN",
    DoRotClut => "DO_ROT_CLUT",
    StopClut => "STOP_CLUT",
    IfIn => "IF_IN",
    IfOut => "IF_OUT",
    SetVolumeSample => "SET_VOLUME_SAMPLE",
    FadeInMusic => "FADE_IN_MUSIC",
    SetMusicVolume => "SET_MUSIC_VOLUME",
    MusicAndLoop => "MUSIC_AND_LOOP",
    MusicThen => "MUSIC_THEN",
    MusicThenLoop => "MUSIC_THEN_LOOP",
    StartFadeInMusic => "START_FADE_IN_MUSIC",
    StartFadeInMusicThen => "START_FADE_IN_MUSIC_THEN",
    StartFadeInMusicLoop => "START_FADE_IN_MUSIC_LOOP",
    FadeOutMusicStop => "FADE_OUT_MUSIC_STOP",
    MusicAlterTempo => "MUSIC_ALTER_TEMPO",
    RepSampleNTime => "REP_SAMPLE_N_TIME",
    Invalid => "INVALID",
}

use LifeMacro as L;

/// Opcode numbering of the first release.
pub const AITD1_LIFE_TABLE: &[LifeMacro] = &[
    // 0x00
    L::DoMove, L::AnimOnce, L::AnimAllOnce, L::Body, L::IfEgal, L::IfDifferent, L::IfSupEgal,
    L::IfSup, L::IfInfEgal, L::IfInf, L::Goto, L::Return, L::End, L::AnimRepeat, L::AnimMove,
    L::Move,
    // 0x10
    L::Hit, L::Message, L::MessageValue, L::Var, L::Inc, L::Dec, L::Add, L::Sub, L::LifeMode,
    L::Switch, L::Case, L::Camera, L::StartChrono, L::MultiCase, L::Found, L::Life,
    // 0x20
    L::Delete, L::Take, L::InHand, L::Read, L::AnimSample, L::Special, L::DoRealZv, L::Sample,
    L::Type, L::GameOver, L::ManualRot, L::RndFreq, L::Music, L::SetBeta, L::DoRotZv, L::Stage,
    // 0x30
    L::FoundName, L::FoundFlag, L::FoundLife, L::CameraTarget, L::Drop, L::Fire, L::TestCol,
    L::FoundBody, L::SetAlpha, L::StopBeta, L::DoMaxZv, L::Put, L::CVar, L::DoNormalZv,
    L::DoCarreZv, L::SampleThen,
    // 0x40
    L::Light, L::Shaking, L::Inventory, L::FoundWeight, L::UpCoorY, L::Speed, L::PutAt, L::DefZv,
    L::HitObject, L::GetHardClip, L::Angle, L::RepSample, L::Throw, L::Water, L::Picture,
    L::StopSample,
    // 0x50
    L::NextMusic, L::FadeMusic, L::StopHitObject, L::CopyAngle, L::EndSequence,
    L::SampleThenRepeat, L::WaitGameOver,
];

/// Opcode numbering shared by every release after the first. Indices from
/// 100 on only occur in Time Gate scripts.
pub const AITD2_LIFE_TABLE: &[LifeMacro] = &[
    // 0x00
    L::DoMove, L::AnimOnce, L::AnimAllOnce, L::Body, L::IfEgal, L::IfDifferent, L::IfSupEgal,
    L::IfSup, L::IfInfEgal, L::IfInf, L::Goto, L::Return, L::End, L::AnimRepeat, L::AnimMove,
    L::Move,
    // 0x10
    L::Hit, L::Message, L::Var, L::Inc, L::Dec, L::Add, L::Sub, L::LifeMode, L::Switch, L::Case,
    L::StartChrono, L::MultiCase, L::Found, L::Life, L::Delete, L::Take,
    // 0x20
    L::InHand, L::Read, L::AnimSample, L::Special, L::DoRealZv, L::Sample, L::Type, L::GameOver,
    L::ManualRot, L::RndFreq, L::Music, L::SetBeta, L::DoRotZv, L::Stage, L::FoundName,
    L::FoundFlag,
    // 0x30
    L::FoundLife, L::CameraTarget, L::Drop, L::Fire, L::TestCol, L::FoundBody, L::SetAlpha,
    L::DoMaxZv, L::Put, L::DoNormalZv, L::DoCarreZv, L::SampleThen, L::Light, L::Shaking,
    L::Inventory, L::FoundWeight,
    // 0x40
    L::PutAt, L::DefZv, L::HitObject, L::Angle, L::RepSample, L::Throw, L::Water, L::Picture,
    L::StopSample, L::NextMusic, L::FadeMusic, L::StopHitObject, L::CopyAngle,
    L::SampleThenRepeat, L::WaitGameOver, L::GetMatrice,
    // 0x50
    L::StageLife, L::ContinueTrack, L::AnimReset, L::ResetMoveManual, L::Pluie,
    L::AnimHybrideOnce, L::AnimHybrideRepeat, L::ModifCVar, L::CallInventory, L::BodyReset,
    L::DelInventory, L::SetInventory, L::PlaySequence, L::AnimSample2d, L::SetGround, L::Protect,
    // 0x60
    L::DefAbsZv, L::DefSequenceSample, L::ReadOnPicture, L::FireUpDown,
    // 100
    L::DoRotClut, L::StopClut, L::IfIn, L::IfOut, L::Invalid, L::SetVolumeSample, L::Invalid,
    L::Invalid, L::FadeInMusic, L::SetMusicVolume, L::MusicAndLoop, L::MusicThen,
    L::MusicThenLoop, L::StartFadeInMusic, L::StartFadeInMusicThen, L::StartFadeInMusicLoop,
    L::FadeOutMusicStop, L::MusicAlterTempo, L::RepSampleNTime,
];

/// Track mini-language opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackOp {
    Warp,
    Goto,
    End,
    Repeat,
    Mark,
    Walk,
    Run,
    Stop,
    Back,
    SetAngle,
    CollisionOff,
    CollisionOn,
    SetDistance,
    TriggerOff,
    TriggerOn,
    Goto3d,
    MemoCoord,
    StairsX,
    StairsZ,
    Angle,
    Close,
    Wait,
}

impl TrackOp {
    pub fn from_first_generation(raw: i16) -> Option<Self> {
        let op = match raw {
            0 => TrackOp::Warp,
            1 => TrackOp::Goto,
            2 => TrackOp::End,
            3 => TrackOp::Repeat,
            4 => TrackOp::Mark,
            5 => TrackOp::Walk,
            6 => TrackOp::Run,
            7 => TrackOp::Stop,
            8 => TrackOp::Back,
            9 => TrackOp::SetAngle,
            10 => TrackOp::CollisionOff,
            11 => TrackOp::CollisionOn,
            12 => TrackOp::SetDistance,
            13 => TrackOp::TriggerOff,
            14 => TrackOp::TriggerOn,
            15 => TrackOp::Goto3d,
            16 => TrackOp::MemoCoord,
            17 => TrackOp::StairsX,
            18 => TrackOp::StairsZ,
            19 => TrackOp::Angle,
            20 => TrackOp::Close,
            _ => return None,
        };
        Some(op)
    }

    pub fn from_later_generation(raw: i16) -> Option<Self> {
        let op = match raw {
            0 => TrackOp::Warp,
            1 => TrackOp::Goto,
            2 => TrackOp::End,
            3 => TrackOp::Repeat,
            4 => TrackOp::Mark,
            5 => TrackOp::Wait,
            6 => TrackOp::SetAngle,
            7 => TrackOp::CollisionOff,
            8 => TrackOp::CollisionOn,
            0xA => TrackOp::TriggerOff,
            0xB => TrackOp::TriggerOn,
            _ => return None,
        };
        Some(op)
    }

    /// Operand words following the opcode.
    pub fn operand_count(self) -> usize {
        match self {
            TrackOp::Goto3d => 5,
            TrackOp::Warp => 4,
            TrackOp::Goto | TrackOp::StairsX | TrackOp::StairsZ | TrackOp::Angle => 3,
            TrackOp::Mark | TrackOp::SetAngle | TrackOp::SetDistance => 1,
            _ => 0,
        }
    }
}

/// Named c-variables. Each edition stores a subset of them in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CVar {
    SamplePage,
    BodyFlamme,
    MaxWeightLoadable,
    TexteCredits,
    SampleTonnerre,
    IntroDetective,
    IntroHeritiere,
    WorldNumPerso,
    ChoosePerso,
    SampleChoc,
    SamplePlouf,
    ReverseObject,
    KilledSorcerer,
    LightObject,
    FogFlag,
    DeadPerso,
    JetSarbacane,
    TirCanon,
    JetScalpel,
    Poivre,
    Dortoir,
    ExtJack,
    NumMatriceProtect1,
    NumMatriceProtect2,
    NumPerso,
    TypeInventaire,
    Prologue,
    Poignard,
}

const AITD1_CVARS: &[CVar] = &[
    CVar::SamplePage,
    CVar::BodyFlamme,
    CVar::MaxWeightLoadable,
    CVar::TexteCredits,
    CVar::SampleTonnerre,
    CVar::IntroDetective,
    CVar::IntroHeritiere,
    CVar::WorldNumPerso,
    CVar::ChoosePerso,
    CVar::SampleChoc,
    CVar::SamplePlouf,
    CVar::ReverseObject,
    CVar::KilledSorcerer,
    CVar::LightObject,
    CVar::FogFlag,
    CVar::DeadPerso,
];

const LATER_CVARS: &[CVar] = &[
    CVar::SamplePage,
    CVar::BodyFlamme,
    CVar::MaxWeightLoadable,
    CVar::SampleChoc,
    CVar::DeadPerso,
    CVar::JetSarbacane,
    CVar::TirCanon,
    CVar::JetScalpel,
    CVar::Poivre,
    CVar::Dortoir,
    CVar::ExtJack,
    CVar::NumMatriceProtect1,
    CVar::NumMatriceProtect2,
    CVar::NumPerso,
    CVar::TypeInventaire,
    CVar::Prologue,
    CVar::Poignard,
];

/// Decodes a little-endian word stream. A trailing odd byte is ignored.
pub fn read_words(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// A decoded `evalVar` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    Literal(i16),
    Var(i16),
    Field {
        object: Option<i16>,
        selector: u16,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operand {
    Word(i16),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifeStatement {
    /// Byte offset of the opcode word.
    pub offset: usize,
    pub target: Option<i16>,
    pub op: LifeMacro,
    pub operands: Vec<Operand>,
}

#[derive(Clone, Copy)]
enum Arg {
    Word,
    Expr,
    /// `count` followed by `count` words.
    List,
    /// `count` followed by `count` word pairs.
    Pairs,
}

fn operand_shape(op: LifeMacro, edition: Edition) -> Option<Vec<Arg>> {
    use Arg::{Expr as E, List, Pairs, Word as W};
    let first = edition.is_first_generation();
    let up_to_jack = edition <= Edition::Jack;
    let time_gate = edition == Edition::TimeGate;
    let shape = match op {
        L::DoMove | L::Return | L::End | L::StartChrono | L::DoRealZv | L::GameOver
        | L::ManualRot | L::DoRotZv | L::DoMaxZv | L::DoNormalZv | L::DoCarreZv | L::UpCoorY
        | L::GetHardClip | L::StopHitObject | L::EndSequence | L::WaitGameOver
        | L::ContinueTrack | L::ResetMoveManual | L::CallInventory => vec![],
        L::StopSample if time_gate => vec![W],
        L::StopSample => vec![],
        L::Body | L::Switch => vec![E],
        L::BodyReset => vec![E, E],
        L::AnimOnce | L::AnimAllOnce | L::AnimReset | L::AnimHybrideOnce
        | L::AnimHybrideRepeat | L::Move | L::SetBeta | L::SetAlpha | L::HitObject | L::PutAt
        | L::MessageValue => vec![W, W],
        L::IfEgal | L::IfDifferent | L::IfSupEgal | L::IfSup | L::IfInfEgal | L::IfInf => {
            vec![E, E, W]
        }
        L::Case => vec![W, W],
        L::Goto | L::AnimRepeat | L::Message | L::Inc | L::Dec | L::LifeMode
        | L::Found | L::Life | L::Special | L::Type | L::RndFreq | L::Music | L::FoundName
        | L::FoundFlag | L::FoundLife | L::CameraTarget | L::TestCol | L::FoundBody
        | L::Light | L::Shaking | L::Inventory | L::FoundWeight | L::Water | L::NextMusic
        | L::FadeMusic | L::CopyAngle | L::StageLife | L::SetInventory | L::SetGround | L::Pluie => {
            vec![W]
        }
        L::AnimMove => vec![W; 7],
        L::Hit => vec![W, W, W, W, E, W],
        L::Fire if first => vec![W; 6],
        L::Fire => vec![E, W, W, W, W, W, E],
        L::FireUpDown => vec![E, W, W, W, W, W, W, E],
        L::Throw => vec![W; 7],
        L::Angle => vec![W, W, W],
        L::Stage => vec![W; 5],
        L::Put => vec![W; 9],
        L::Var | L::Add | L::Sub | L::CVar | L::ModifCVar => vec![W, E],
        L::MultiCase => vec![List, W],
        L::DefSequenceSample => vec![Pairs],
        L::DefZv | L::DefAbsZv => vec![W; 6],
        L::Delete | L::InHand if up_to_jack => vec![W],
        L::Delete | L::InHand => vec![E],
        L::Take if time_gate => vec![E, W, W, W],
        L::Take => vec![W],
        L::Drop => vec![E, W],
        L::Read if first => vec![W, W, W],
        L::Read => vec![W, W],
        L::ReadOnPicture => vec![W; 8],
        L::AnimSample if time_gate => vec![E, W, W, W],
        L::AnimSample => vec![E, W, W],
        L::AnimSample2d => vec![E, W, W],
        L::Sample if time_gate => vec![E, W],
        L::Sample if up_to_jack => vec![E],
        L::Sample => vec![W],
        L::RepSample if first || time_gate => vec![E, W],
        L::RepSample => vec![W, W],
        L::SampleThen if up_to_jack => vec![E, E],
        L::SampleThen => vec![W, W],
        L::SampleThenRepeat => vec![E, E],
        L::Picture if time_gate => vec![W, W, E, W],
        L::Picture => vec![W, W, W],
        L::PlaySequence => vec![W, W, W],
        L::DoRotClut => vec![W, W, W],
        L::StartFadeInMusicLoop => vec![W; 5],
        _ => return None,
    };
    Some(shape)
}

struct WordReader<'a> {
    words: &'a [i16],
    cursor: usize,
}

impl WordReader<'_> {
    fn next(&mut self) -> Result<i16> {
        let word = *self
            .words
            .get(self.cursor)
            .ok_or_else(|| anyhow!("script truncated at byte {:#x}", self.cursor * 2))?;
        self.cursor += 1;
        Ok(word)
    }

    fn expr(&mut self, edition: Edition) -> Result<Expr> {
        let tag = self.next()?;
        match tag {
            -1 => return Ok(Expr::Literal(self.next()?)),
            0 => return Ok(Expr::Var(self.next()?)),
            _ => {}
        }
        let raw = tag as u16;
        let object = if raw & 0x8000 != 0 {
            Some(self.next()?)
        } else {
            None
        };
        let selector = (raw & 0x7FFF).wrapping_sub(1);
        let word_args = match (edition.is_first_generation(), selector) {
            (_, 0x0E | 0x12 | 0x1C | 0x20) => 1,
            (_, 0x10) => {
                let inner = self.expr(edition)?;
                return Ok(Expr::Field {
                    object,
                    selector,
                    args: vec![inner],
                });
            }
            (true, 0x22) => 2,
            (true, 0x24 | 0x26) => 1,
            (false, 0x22 | 0x24) => 1,
            (false, 0x25) => 2,
            _ => 0,
        };
        let mut args = Vec::with_capacity(word_args);
        for _ in 0..word_args {
            args.push(Expr::Literal(self.next()?));
        }
        Ok(Expr::Field {
            object,
            selector,
            args,
        })
    }
}

/// Decodes a LIFE script into statements. Stops after the first `END`.
pub fn disassemble_life(words: &[i16], edition: Edition) -> Result<Vec<LifeStatement>> {
    let mut reader = WordReader { words, cursor: 0 };
    let mut statements = Vec::new();
    while reader.cursor < words.len() {
        let offset = reader.cursor * 2;
        let raw = reader.next()? as u16;
        let target = if raw & 0x8000 != 0 {
            Some(reader.next()?)
        } else {
            None
        };
        let op = edition
            .life_macro(raw & 0x7FFF)
            .ok_or_else(|| anyhow!("unmapped opcode {:#x} at byte {offset:#x}", raw & 0x7FFF))?;
        let Some(shape) = operand_shape(op, edition) else {
            bail!("{} at byte {offset:#x} has no known operand layout", op.name());
        };
        let mut operands = Vec::new();
        for arg in shape {
            match arg {
                Arg::Word => operands.push(Operand::Word(reader.next()?)),
                Arg::Expr => operands.push(Operand::Expr(reader.expr(edition)?)),
                Arg::List | Arg::Pairs => {
                    let count = reader.next()?;
                    ensure!(count >= 0, "negative list length at byte {offset:#x}");
                    operands.push(Operand::Word(count));
                    let words_per = if matches!(arg, Arg::Pairs) { 2 } else { 1 };
                    for _ in 0..count as usize * words_per {
                        operands.push(Operand::Word(reader.next()?));
                    }
                }
            }
        }
        statements.push(LifeStatement {
            offset,
            target,
            op,
            operands,
        });
        if op == L::End {
            break;
        }
    }
    Ok(statements)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackStatement {
    pub position: usize,
    pub op: TrackOp,
    pub operands: Vec<i16>,
}

/// Decodes a track program up to its `END` (or `REPEAT`) opcode.
pub fn disassemble_track(words: &[i16], edition: Edition) -> Result<Vec<TrackStatement>> {
    let mut position = 0;
    let mut statements = Vec::new();
    while position < words.len() {
        let raw = words[position];
        let op = edition
            .track_op(raw)
            .ok_or_else(|| anyhow!("unknown track opcode {raw} at word {position}"))?;
        let count = op.operand_count();
        let operands = words
            .get(position + 1..position + 1 + count)
            .ok_or_else(|| anyhow!("track truncated at word {position}"))?
            .to_vec();
        statements.push(TrackStatement {
            position,
            op,
            operands,
        });
        position += 1 + count;
        if matches!(op, TrackOp::End | TrackOp::Repeat) {
            break;
        }
    }
    Ok(statements)
}
