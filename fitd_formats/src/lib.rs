pub mod anim;
pub mod body;
pub mod floor;
pub mod itd;
pub mod pak;
pub mod script;

pub use anim::{Animation, Keyframe};
pub use body::{Body, BodyGroup, BoneState, INFO_ANIM, INFO_OPTIMISE};
pub use floor::{RoomBox, RoomData, parse_rooms};
pub use itd::{WorldObject, parse_cvars, parse_objects, parse_vars};
pub use pak::{PakArchive, PakCompression, PakEntry};
pub use script::{
    CVar, Edition, Expr, LifeMacro, LifeStatement, Operand, TrackOp, TrackStatement,
    disassemble_life, disassemble_track, read_words,
};
