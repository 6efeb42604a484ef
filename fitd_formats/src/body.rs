use std::io::{Cursor, Seek, SeekFrom};

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

/// Body header bit: the body carries a bone table and can be animated.
pub const INFO_ANIM: u16 = 2;
/// Body header bit: bones carry a separate rotation channel.
pub const INFO_OPTIMISE: u16 = 8;

/// Pose of one bone group. `kind` 0 is a rotation, 1 and 2 are translation and
/// zoom; `delta` holds the three channels of that kind. Optimised bodies also
/// keep a rotation in `rotate` regardless of `kind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneState {
    pub kind: i16,
    pub delta: [i16; 3],
    pub rotate: [i16; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyGroup {
    pub start_vertex: u16,
    pub vertex_count: u16,
    pub base_vertex: u16,
    pub parent: i8,
    pub index: i8,
    #[serde(default)]
    pub state: BoneState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub flags: u16,
    /// X1, X2, Y1, Y2, Z1, Z2.
    pub zv: [i16; 6],
    #[serde(default)]
    pub scratch_size: u16,
    #[serde(default)]
    pub vertices: Vec<[i16; 3]>,
    #[serde(default)]
    pub groups: Vec<BodyGroup>,
}

impl Body {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= 16, "body resource shorter than its header");
        let mut cursor = Cursor::new(bytes);
        let flags = cursor.read_u16::<LittleEndian>()?;
        let mut zv = [0i16; 6];
        for extent in zv.iter_mut() {
            *extent = cursor.read_i16::<LittleEndian>()?;
        }
        let scratch_size = cursor.read_u16::<LittleEndian>()?;
        cursor.seek(SeekFrom::Current(i64::from(scratch_size)))?;

        let vertex_count = cursor
            .read_u16::<LittleEndian>()
            .context("reading body vertex count")?;
        let mut vertices = Vec::with_capacity(vertex_count as usize);
        for index in 0..vertex_count {
            let vertex = read_triplet(&mut cursor)
                .with_context(|| format!("body truncated in vertex {index}"))?;
            vertices.push(vertex);
        }

        let mut groups = Vec::new();
        if flags & INFO_ANIM != 0 {
            let group_count = cursor
                .read_u16::<LittleEndian>()
                .context("reading body group count")?;
            cursor.seek(SeekFrom::Current(i64::from(group_count) * 2))?;
            let optimised = flags & INFO_OPTIMISE != 0;
            for index in 0..group_count {
                let group = read_group(&mut cursor, optimised)
                    .with_context(|| format!("reading body group {index}"))?;
                groups.push(group);
            }
        }

        Ok(Body {
            flags,
            zv,
            scratch_size,
            vertices,
            groups,
        })
    }

    pub fn is_animated(&self) -> bool {
        self.flags & INFO_ANIM != 0
    }

    pub fn is_optimised(&self) -> bool {
        self.flags & INFO_OPTIMISE != 0
    }

    /// Rest pose of every group, as stored in the body.
    pub fn rest_pose(&self) -> Vec<BoneState> {
        self.groups.iter().map(|group| group.state).collect()
    }
}

fn read_triplet(cursor: &mut Cursor<&[u8]>) -> Result<[i16; 3]> {
    Ok([
        cursor.read_i16::<LittleEndian>()?,
        cursor.read_i16::<LittleEndian>()?,
        cursor.read_i16::<LittleEndian>()?,
    ])
}

fn read_group(cursor: &mut Cursor<&[u8]>, optimised: bool) -> Result<BodyGroup> {
    let start = cursor.read_u16::<LittleEndian>()?;
    let vertex_count = cursor.read_u16::<LittleEndian>()?;
    let base = cursor.read_u16::<LittleEndian>()?;
    let parent = cursor.read_i8()?;
    let index = cursor.read_i8()?;
    let mut state = BoneState {
        kind: cursor.read_i16::<LittleEndian>()?,
        delta: read_triplet(cursor)?,
        ..BoneState::default()
    };
    if optimised {
        state.rotate = read_triplet(cursor)?;
        cursor.read_i16::<LittleEndian>()?;
    }
    Ok(BodyGroup {
        start_vertex: start / 6,
        vertex_count,
        base_vertex: base / 6,
        parent,
        index,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a body with one vertex per group. Each group is `(kind, deltas)`.
    fn build_body(flags: u16, zv: [i16; 6], groups: &[(i16, [i16; 3])]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&flags.to_le_bytes());
        for extent in zv {
            data.extend_from_slice(&extent.to_le_bytes());
        }
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&[0xAA; 4]);
        data.extend_from_slice(&(groups.len() as u16).to_le_bytes());
        for index in 0..groups.len() {
            let offset = index as i16 * 10;
            for value in [offset, -offset, 5] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        if flags & INFO_ANIM != 0 {
            data.extend_from_slice(&(groups.len() as u16).to_le_bytes());
            for index in 0..groups.len() {
                data.extend_from_slice(&((index * 24) as u16).to_le_bytes());
            }
            for (index, (kind, deltas)) in groups.iter().enumerate() {
                data.extend_from_slice(&((index * 6) as u16).to_le_bytes());
                data.extend_from_slice(&1u16.to_le_bytes());
                data.extend_from_slice(&0u16.to_le_bytes());
                data.push(if index == 0 { 0xFF } else { 0 });
                data.push(index as u8);
                data.extend_from_slice(&kind.to_le_bytes());
                for value in deltas {
                    data.extend_from_slice(&value.to_le_bytes());
                }
                if flags & INFO_OPTIMISE != 0 {
                    for value in [1i16, 2, 3, 0] {
                        data.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        data
    }

    #[test]
    fn parses_animated_body() {
        let bytes = build_body(
            INFO_ANIM,
            [-100, 100, -2000, 0, -50, 50],
            &[(0, [0, 256, 0]), (1, [10, 0, -10])],
        );
        let body = Body::parse(&bytes).unwrap();
        assert!(body.is_animated());
        assert!(!body.is_optimised());
        assert_eq!(body.zv, [-100, 100, -2000, 0, -50, 50]);
        assert_eq!(body.vertices.len(), 2);
        assert_eq!(body.vertices[1], [10, -10, 5]);
        assert_eq!(body.groups.len(), 2);
        assert_eq!(body.groups[0].parent, -1);
        assert_eq!(body.groups[1].start_vertex, 1);
        assert_eq!(body.groups[1].state.kind, 1);
        assert_eq!(body.rest_pose()[0].delta, [0, 256, 0]);
    }

    #[test]
    fn parses_optimised_groups_and_static_bodies() {
        let bytes = build_body(INFO_ANIM | INFO_OPTIMISE, [0; 6], &[(2, [4, 4, 4])]);
        let body = Body::parse(&bytes).unwrap();
        assert_eq!(body.groups[0].state.rotate, [1, 2, 3]);

        let bytes = build_body(0, [1, 2, 3, 4, 5, 6], &[(0, [0, 0, 0])]);
        let body = Body::parse(&bytes).unwrap();
        assert!(!body.is_animated());
        assert!(body.groups.is_empty());
    }

    #[test]
    fn rejects_truncated_body() {
        let mut bytes = build_body(INFO_ANIM, [0; 6], &[(0, [0, 0, 0])]);
        bytes.truncate(bytes.len() - 3);
        assert!(Body::parse(&bytes).is_err());
        assert!(Body::parse(&[0u8; 8]).is_err());
    }
}
