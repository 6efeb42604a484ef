use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

/// A static box of a room: six extents plus a type tag and its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBox {
    /// X1, X2, Y1, Y2, Z1, Z2.
    pub zv: [i16; 6],
    pub parameter: u16,
    #[serde(rename = "type")]
    pub kind: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    /// Room origin in world units of ten.
    pub world: [i16; 3],
    #[serde(default)]
    pub cameras: Vec<u16>,
    #[serde(default)]
    pub hard_cols: Vec<RoomBox>,
    #[serde(default)]
    pub sce_zones: Vec<RoomBox>,
}

fn le_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let raw = bytes
        .get(at..at + 2)
        .ok_or_else(|| anyhow!("floor data truncated at {at:#x}"))?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

fn le_i16(bytes: &[u8], at: usize) -> Result<i16> {
    le_u16(bytes, at).map(|value| value as i16)
}

fn le_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let raw = bytes
        .get(at..at + 4)
        .ok_or_else(|| anyhow!("floor data truncated at {at:#x}"))?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Parses the room table of a floor (entry 0 of an `ETAGExx` archive).
pub fn parse_rooms(bytes: &[u8]) -> Result<Vec<RoomData>> {
    let first = le_u32(bytes, 0).context("reading room table")? as usize;
    ensure!(
        first >= 4 && first % 4 == 0 && first <= bytes.len(),
        "room table has invalid first offset {first:#x}"
    );
    let count = first / 4;
    let mut rooms = Vec::with_capacity(count);
    for index in 0..count {
        let offset = le_u32(bytes, index * 4)? as usize;
        let room = parse_room(bytes, offset).with_context(|| format!("reading room {index}"))?;
        rooms.push(room);
    }
    Ok(rooms)
}

fn parse_room(bytes: &[u8], base: usize) -> Result<RoomData> {
    let world = [
        le_i16(bytes, base + 4)?,
        le_i16(bytes, base + 6)?,
        le_i16(bytes, base + 8)?,
    ];
    let camera_count = le_u16(bytes, base + 0xA)? as usize;
    let mut cameras = Vec::with_capacity(camera_count);
    for index in 0..camera_count {
        cameras.push(le_u16(bytes, base + 0xC + index * 2)?);
    }
    let hard_cols = parse_boxes(bytes, base + le_u16(bytes, base)? as usize)
        .context("reading hard collisions")?;
    let sce_zones = parse_boxes(bytes, base + le_u16(bytes, base + 2)? as usize)
        .context("reading scene zones")?;
    Ok(RoomData {
        world,
        cameras,
        hard_cols,
        sce_zones,
    })
}

fn parse_boxes(bytes: &[u8], at: usize) -> Result<Vec<RoomBox>> {
    let count = le_u16(bytes, at)? as usize;
    let mut boxes = Vec::with_capacity(count);
    for index in 0..count {
        let record = at + 2 + index * 0x10;
        let mut zv = [0i16; 6];
        for (axis, extent) in zv.iter_mut().enumerate() {
            *extent = le_i16(bytes, record + axis * 2)?;
        }
        boxes.push(RoomBox {
            zv,
            parameter: le_u16(bytes, record + 0xC)?,
            kind: le_u16(bytes, record + 0xE)?,
        });
    }
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(data: &mut Vec<u8>, values: &[i16]) {
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn build_room(world: [i16; 3], hard: &[RoomBox], zones: &[RoomBox]) -> Vec<u8> {
        let header = 0xC + 2;
        let hard_at = header;
        let zone_at = hard_at + 2 + hard.len() * 0x10;
        let mut data = Vec::new();
        push(&mut data, &[hard_at as i16, zone_at as i16]);
        push(&mut data, &world);
        push(&mut data, &[1, 3]);
        for list in [hard, zones] {
            push(&mut data, &[list.len() as i16]);
            for entry in list {
                push(&mut data, &entry.zv);
                push(&mut data, &[entry.parameter as i16, entry.kind as i16]);
            }
        }
        data
    }

    #[test]
    fn parses_rooms_with_collision_lists() {
        let wall = RoomBox {
            zv: [-500, 500, -2000, 0, 900, 1000],
            parameter: 0,
            kind: 0,
        };
        let door = RoomBox {
            zv: [-100, 100, -2000, 0, -1000, -900],
            parameter: 1,
            kind: 0,
        };
        let first = build_room([0, 0, 0], &[wall], &[door]);
        let second = build_room([200, 0, -100], &[], &[]);

        let mut data = Vec::new();
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&((8 + first.len()) as u32).to_le_bytes());
        data.extend_from_slice(&first);
        data.extend_from_slice(&second);

        let rooms = parse_rooms(&data).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].cameras, vec![3]);
        assert_eq!(rooms[0].hard_cols, vec![wall]);
        assert_eq!(rooms[0].sce_zones, vec![door]);
        assert_eq!(rooms[1].world, [200, 0, -100]);
        assert!(rooms[1].hard_cols.is_empty());
    }

    #[test]
    fn rejects_bad_room_table() {
        assert!(parse_rooms(&[1, 0, 0, 0]).is_err());
        assert!(parse_rooms(&[8, 0, 0, 0, 0x40, 0, 0, 0]).is_err());
    }
}
