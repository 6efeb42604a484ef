use thiserror::Error;

/// Content-integrity failures raised while simulating. Cursors are byte
/// offsets into the script being decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("actor {actor}: LIFE opcode {op} is not supported (cursor {cursor:#x})")]
    UnsupportedOpcode {
        op: &'static str,
        cursor: usize,
        actor: usize,
    },
    #[error("actor {actor}: raw LIFE opcode {raw:#x} has no macro in this edition (cursor {cursor:#x})")]
    UnmappedOpcode { raw: u16, cursor: usize, actor: usize },
    #[error("actor {actor}: expression selector {selector:#x} is not supported (cursor {cursor:#x})")]
    UnsupportedSelector {
        selector: u16,
        cursor: usize,
        actor: usize,
    },
    #[error("actor {actor}: track opcode {raw} is not supported (position {position})")]
    UnsupportedTrackOpcode {
        raw: i16,
        position: usize,
        actor: usize,
    },
    #[error("actor slot {0} is out of range or free")]
    BadActor(i16),
    #[error("world object {0} does not exist")]
    BadWorldObject(i16),
    #[error("{kind} resource {index} is missing")]
    MissingResource { kind: &'static str, index: i16 },
    #[error("actor {actor}: life {life} ran out of statements before RETURN (cursor {cursor:#x})")]
    RunawayScript {
        life: i16,
        cursor: usize,
        actor: usize,
    },
    #[error("script ran past its end at cursor {cursor:#x}")]
    Truncated { cursor: usize },
}

pub type SimResult<T> = Result<T, SimError>;
