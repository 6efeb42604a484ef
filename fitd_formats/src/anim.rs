use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::body::BoneState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Duration in timer ticks.
    pub length: u16,
    /// Root displacement over the whole keyframe.
    #[serde(default)]
    pub step: [i16; 3],
    #[serde(default)]
    pub bones: Vec<BoneState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub bone_count: u16,
    pub keyframes: Vec<Keyframe>,
}

impl Animation {
    /// Parses an animation. Bone records are 8 bytes, or 16 when the body it
    /// is played on is optimised, so the caller supplies that layout.
    pub fn parse(bytes: &[u8], optimised: bool) -> Result<Self> {
        ensure!(bytes.len() >= 4, "animation resource shorter than its header");
        let mut cursor = Cursor::new(bytes);
        let frame_count = cursor.read_u16::<LittleEndian>()?;
        let bone_count = cursor.read_u16::<LittleEndian>()?;

        let mut keyframes = Vec::with_capacity(frame_count as usize);
        for frame in 0..frame_count {
            let keyframe = read_keyframe(&mut cursor, bone_count, optimised)
                .with_context(|| format!("reading keyframe {frame}"))?;
            keyframes.push(keyframe);
        }

        Ok(Animation {
            bone_count,
            keyframes,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.keyframes.len()
    }
}

fn read_keyframe(cursor: &mut Cursor<&[u8]>, bones: u16, optimised: bool) -> Result<Keyframe> {
    let length = cursor.read_u16::<LittleEndian>()?;
    let mut step = [0i16; 3];
    for axis in step.iter_mut() {
        *axis = cursor.read_i16::<LittleEndian>()?;
    }
    let mut states = Vec::with_capacity(bones as usize);
    for _ in 0..bones {
        let mut state = BoneState {
            kind: cursor.read_i16::<LittleEndian>()?,
            ..BoneState::default()
        };
        for channel in state.delta.iter_mut() {
            *channel = cursor.read_i16::<LittleEndian>()?;
        }
        if optimised {
            for channel in state.rotate.iter_mut() {
                *channel = cursor.read_i16::<LittleEndian>()?;
            }
            cursor.read_i16::<LittleEndian>()?;
        }
        states.push(state);
    }
    Ok(Keyframe {
        length,
        step,
        bones: states,
    })
}
