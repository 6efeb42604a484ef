use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::script::Edition;

/// Persistent descriptor of an object, as stored in OBJETS.ITD and kept in
/// memory for the whole game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldObject {
    /// Live actor slot, or -1 while the object is dormant.
    pub obj_index: i16,
    pub body: i16,
    pub flags: i16,
    pub type_zv: i16,
    pub found_body: i16,
    pub found_name: i16,
    pub flags2: i16,
    pub found_life: i16,
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub alpha: i16,
    pub beta: i16,
    pub gamma: i16,
    pub stage: i16,
    pub room: i16,
    pub life_mode: i16,
    pub life: i16,
    pub floor_life: i16,
    pub anim: i16,
    pub frame: i16,
    pub anim_type: i16,
    pub anim_info: i16,
    pub track_mode: i16,
    pub track_number: i16,
    pub position_in_track: i16,
    pub mark: i16,
}

impl Default for WorldObject {
    fn default() -> Self {
        WorldObject {
            obj_index: -1,
            body: -1,
            flags: 0,
            type_zv: 0,
            found_body: -1,
            found_name: -1,
            flags2: 0,
            found_life: -1,
            x: 0,
            y: 0,
            z: 0,
            alpha: 0,
            beta: 0,
            gamma: 0,
            stage: -1,
            room: -1,
            life_mode: 0,
            life: -1,
            floor_life: -1,
            anim: -1,
            frame: 0,
            anim_type: 0,
            anim_info: -1,
            track_mode: 0,
            track_number: -1,
            position_in_track: 0,
            mark: -1,
        }
    }
}

/// Parses OBJETS.ITD. Every object comes out with collision enabled (0x20).
pub fn parse_objects(bytes: &[u8], edition: Edition) -> Result<Vec<WorldObject>> {
    ensure!(bytes.len() >= 2, "OBJETS.ITD is too small for its count");
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_i16::<LittleEndian>()?;
    ensure!(count >= 0, "OBJETS.ITD reports a negative object count");

    let mut objects = Vec::with_capacity(count as usize);
    for index in 0..count {
        let object = read_object(&mut cursor, edition)
            .with_context(|| format!("reading world object {index}"))?;
        objects.push(object);
    }
    Ok(objects)
}

fn read_object(cursor: &mut Cursor<&[u8]>, edition: Edition) -> Result<WorldObject> {
    let mut words = [0i16; 26];
    for word in words.iter_mut() {
        *word = cursor.read_i16::<LittleEndian>()?;
    }
    let mark = if edition >= Edition::Jack {
        cursor.read_i16::<LittleEndian>()?
    } else {
        -1
    };
    let [
        obj_index,
        body,
        flags,
        type_zv,
        found_body,
        found_name,
        flags2,
        found_life,
        x,
        y,
        z,
        alpha,
        beta,
        gamma,
        stage,
        room,
        life_mode,
        life,
        floor_life,
        anim,
        frame,
        anim_type,
        anim_info,
        track_mode,
        track_number,
        position_in_track,
    ] = words;
    Ok(WorldObject {
        obj_index,
        body,
        flags: flags | 0x20,
        type_zv,
        found_body,
        found_name,
        flags2,
        found_life,
        x,
        y,
        z,
        alpha,
        beta,
        gamma,
        stage,
        room,
        life_mode,
        life,
        floor_life,
        anim,
        frame,
        anim_type,
        anim_info,
        track_mode,
        track_number,
        position_in_track,
        mark,
    })
}

/// Parses VARS.ITD: raw little-endian words.
pub fn parse_vars(bytes: &[u8]) -> Vec<i16> {
    crate::script::read_words(bytes)
}

/// Parses DEFINES.ITD, whose words are stored big-endian. Returns exactly
/// `edition.cvar_count()` values.
pub fn parse_cvars(bytes: &[u8], edition: Edition) -> Result<Vec<i16>> {
    let count = edition.cvar_count();
    ensure!(
        bytes.len() >= count * 2,
        "DEFINES.ITD holds {} bytes, {} needed",
        bytes.len(),
        count * 2
    );
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_i16::<BigEndian>()?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_words(edition: Edition, room: i16) -> Vec<u8> {
        let mut words: Vec<i16> = (0..26).collect();
        words[0] = -1;
        words[15] = room;
        if edition >= Edition::Jack {
            words.push(77);
        }
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn parses_objects_per_edition() {
        for edition in [Edition::Aitd1, Edition::Aitd2] {
            let mut data = 2i16.to_le_bytes().to_vec();
            data.extend(object_words(edition, 4));
            data.extend(object_words(edition, 9));
            let objects = parse_objects(&data, edition).unwrap();
            assert_eq!(objects.len(), 2);
            assert_eq!(objects[0].obj_index, -1);
            assert_eq!(objects[0].flags, 2 | 0x20);
            assert_eq!(objects[1].room, 9);
            assert_eq!(objects[1].position_in_track, 25);
            let expected_mark = if edition == Edition::Aitd1 { -1 } else { 77 };
            assert_eq!(objects[1].mark, expected_mark);
        }
    }

    #[test]
    fn rejects_short_object_table() {
        let mut data = 1i16.to_le_bytes().to_vec();
        data.extend(object_words(Edition::Aitd1, 0));
        data.truncate(data.len() - 1);
        assert!(parse_objects(&data, Edition::Aitd1).is_err());
    }

    #[test]
    fn cvars_are_byte_swapped() {
        let mut data = vec![0u8; 15 * 2];
        data[0] = 0x01;
        data[1] = 0x02;
        let values = parse_cvars(&data, Edition::Jack).unwrap();
        assert_eq!(values.len(), 15);
        assert_eq!(values[0], 0x0102);
        assert!(parse_cvars(&data, Edition::Aitd1).is_err());
        assert_eq!(parse_vars(&[5, 0, 0xFF, 0xFF, 1]), vec![5, -1]);
    }
}
