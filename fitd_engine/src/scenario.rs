//! JSON scenarios: a starting world, the resources it plays with and the
//! input of each tick.
//!
//! Resources are given inline as word lists and decoded structures, or
//! read from the game's PAK archives. Inline entries win over archive
//! entries with the same index.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use fitd_formats::{
    Animation, Body, Edition, PakArchive, RoomData, WorldObject, parse_cvars, parse_objects,
    parse_rooms, parse_vars, read_words,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::host::{Host, HostEvent, RecordingHost};
use crate::tick::ActorFault;
use crate::world::{Actor, Input, Message, World};

/// PAK archives to read resources from, relative to the scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PakSources {
    pub dir: PathBuf,
    pub bodies: Option<String>,
    pub anims: Option<String>,
    /// Animation bone records use the 16-byte layout.
    pub optimised_anims: bool,
    pub lives: Option<String>,
    pub tracks: Option<String>,
    pub matrices: Option<String>,
    /// `ETAGExx` archive of each floor; entry 0 holds the room table.
    pub floors: BTreeMap<i16, String>,
    pub objects_itd: Option<String>,
    pub vars_itd: Option<String>,
    pub defines_itd: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineResources {
    pub bodies: BTreeMap<i16, Body>,
    pub anims: BTreeMap<i16, Animation>,
    pub lives: BTreeMap<i16, Vec<i16>>,
    pub tracks: BTreeMap<i16, Vec<i16>>,
    pub matrices: BTreeMap<i16, Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub edition: Edition,
    #[serde(default)]
    pub floor: i16,
    #[serde(default)]
    pub room: i16,
    /// Rooms of the starting floor. Other floors go in `floors`.
    #[serde(default)]
    pub rooms: Vec<RoomData>,
    #[serde(default)]
    pub floors: BTreeMap<i16, Vec<RoomData>>,
    #[serde(default)]
    pub objects: Vec<WorldObject>,
    #[serde(default)]
    pub vars: Vec<i16>,
    /// Raw c-variable table, in the edition's order.
    #[serde(default)]
    pub cvars: Vec<i16>,
    #[serde(default)]
    pub inventory: Vec<i16>,
    /// World object the camera follows.
    #[serde(default)]
    pub camera_target: Option<i16>,
    #[serde(default)]
    pub in_hand: Option<i16>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub timer_step: Option<u32>,
    /// Input of each tick; ticks past the end get no input.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Rooms the simulated camera sees.
    #[serde(default)]
    pub viewed_rooms: Vec<i16>,
    #[serde(default = "accept_pickups")]
    pub accept_pickups: bool,
    #[serde(default)]
    pub resources: InlineResources,
    #[serde(default)]
    pub pak: Option<PakSources>,
    #[serde(skip)]
    base_dir: PathBuf,
}

fn accept_pickups() -> bool {
    true
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing scenario JSON")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let mut scenario = Self::from_json(&json)
            .with_context(|| format!("loading scenario {}", path.display()))?;
        scenario.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scenario)
    }

    /// Host that records every call, seeded with the scenario's camera.
    pub fn host(&self) -> RecordingHost {
        RecordingHost {
            events: Vec::new(),
            viewed: self.viewed_rooms.clone(),
            accept_pickups: self.accept_pickups,
        }
    }

    /// Builds the starting world: resources, tables, the current room and
    /// the actors the room calls for.
    pub fn build_world(&self, host: &mut dyn Host) -> Result<World> {
        let mut world = World::new(self.edition);
        if let Some(pak) = &self.pak {
            self.load_paks(pak, &mut world)?;
        }
        self.apply_inline(&mut world)?;

        let rooms = world
            .resources
            .floors
            .get(&self.floor)
            .cloned()
            .with_context(|| format!("floor {} has no rooms", self.floor))?;
        ensure!(
            usize::try_from(self.room).is_ok_and(|room| room < rooms.len()),
            "room {} is not on floor {} ({} rooms)",
            self.room,
            self.floor,
            rooms.len()
        );
        world.rooms = rooms;
        world.current_floor = self.floor;
        world.current_world_target = self.camera_target.unwrap_or(-1);
        world.in_hand = self.in_hand.unwrap_or(-1);
        if let Some(seed) = self.seed {
            world.reseed(seed);
        }
        if let Some(step) = self.timer_step {
            world.timer_step = step;
        }
        world.load_room(self.room, host);
        world
            .update_all_actor_and_objects(host)
            .context("placing the starting actors")?;
        info!(
            "scenario ready: {} objects, {} live actors",
            world.objects.len(),
            world.actors.iter().filter(|actor| actor.is_live()).count()
        );
        Ok(world)
    }

    fn apply_inline(&self, world: &mut World) -> Result<()> {
        if !self.objects.is_empty() {
            world.objects = self.objects.clone();
        }
        for object in &mut world.objects {
            object.obj_index = -1;
        }
        if !self.vars.is_empty() {
            world.vars = self.vars.clone();
        }
        if !self.cvars.is_empty() {
            ensure!(
                self.cvars.len() <= world.cvars.len(),
                "{} c-variables given but {:?} has {}",
                self.cvars.len(),
                self.edition,
                world.cvars.len()
            );
            world.cvars[..self.cvars.len()].copy_from_slice(&self.cvars);
        }
        world.inventory = self.inventory.clone();

        let resources = &mut world.resources;
        resources.floors.extend(self.floors.clone());
        if !self.rooms.is_empty() {
            resources.floors.insert(self.floor, self.rooms.clone());
        }
        let inline = &self.resources;
        resources.bodies.extend(inline.bodies.clone());
        resources.anims.extend(inline.anims.clone());
        resources.lives.extend(inline.lives.clone());
        resources.tracks.extend(inline.tracks.clone());
        resources.matrices.extend(inline.matrices.clone());
        Ok(())
    }

    fn load_paks(&self, pak: &PakSources, world: &mut World) -> Result<()> {
        let dir = self.base_dir.join(&pak.dir);
        let resources = &mut world.resources;
        if let Some(name) = &pak.bodies {
            resources.bodies = read_list(&dir, name, Body::parse)?;
        }
        if let Some(name) = &pak.anims {
            let optimised = pak.optimised_anims;
            resources.anims = read_list(&dir, name, |bytes| Animation::parse(bytes, optimised))?;
        }
        if let Some(name) = &pak.lives {
            resources.lives = read_list(&dir, name, |bytes| Ok(read_words(bytes)))?;
        }
        if let Some(name) = &pak.tracks {
            resources.tracks = read_list(&dir, name, |bytes| Ok(read_words(bytes)))?;
        }
        if let Some(name) = &pak.matrices {
            resources.matrices = read_list(&dir, name, |bytes| Ok(bytes.to_vec()))?;
        }
        for (floor, name) in &pak.floors {
            let path = dir.join(name);
            let archive = PakArchive::open(&path)?;
            let rooms = archive
                .read_index(0)
                .and_then(parse_rooms)
                .with_context(|| format!("reading the rooms of floor {floor} from {}", path.display()))?;
            resources.floors.insert(*floor, rooms);
        }

        if let Some(name) = &pak.objects_itd {
            let bytes = read_file(&dir, name)?;
            world.objects = parse_objects(&bytes, self.edition)?;
        }
        if let Some(name) = &pak.vars_itd {
            world.vars = parse_vars(&read_file(&dir, name)?);
        }
        if let Some(name) = &pak.defines_itd {
            world.cvars = parse_cvars(&read_file(&dir, name)?, self.edition)?;
        }
        Ok(())
    }

    /// Runs `ticks` frames, feeding each its input. Stops early on game over.
    pub fn run(&self, world: &mut World, host: &mut dyn Host, ticks: usize) -> Vec<ActorFault> {
        let mut faults = Vec::new();
        for tick in 0..ticks {
            world.input = self.inputs.get(tick).copied().unwrap_or_default();
            faults.extend(world.tick(host));
            if world.game_over {
                info!("game over after {} ticks", tick + 1);
                break;
            }
        }
        faults
    }
}

fn read_file(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    fs::read(&path).with_context(|| format!("reading {}", path.display()))
}

/// Decodes every readable entry of a resource archive. Compressed and empty
/// entries are left out.
fn read_list<T>(
    dir: &Path,
    name: &str,
    parse: impl Fn(&[u8]) -> Result<T>,
) -> Result<BTreeMap<i16, T>> {
    let path = dir.join(name);
    let archive = PakArchive::open(&path)?;
    let mut list = BTreeMap::new();
    for entry in archive.entries() {
        let bytes = match archive.read_entry_bytes(entry) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!("{}: skipping entry {}: {error:#}", path.display(), entry.index);
                continue;
            }
        };
        if bytes.is_empty() {
            debug!("{}: entry {} is empty", path.display(), entry.index);
            continue;
        }
        let index = i16::try_from(entry.index)
            .with_context(|| format!("{}: entry {} out of range", path.display(), entry.index))?;
        let value = parse(bytes)
            .with_context(|| format!("decoding entry {index} of {}", path.display()))?;
        list.insert(index, value);
    }
    debug!("{}: {} resources", path.display(), list.len());
    Ok(list)
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorSnapshot {
    pub slot: usize,
    #[serde(flatten)]
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultRecord {
    pub slot: usize,
    pub timer: u32,
    pub error: String,
}

/// Serializable state of a world after a run.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub edition: Edition,
    pub timer: u32,
    pub floor: i16,
    pub room: i16,
    pub camera_target: i16,
    pub game_over: bool,
    pub vars: Vec<i16>,
    pub cvars: Vec<i16>,
    pub inventory: Vec<i16>,
    pub messages: Vec<Message>,
    pub actors: Vec<ActorSnapshot>,
    pub objects: Vec<WorldObject>,
    pub events: Vec<HostEvent>,
    pub faults: Vec<FaultRecord>,
}

impl Snapshot {
    pub fn capture(world: &World, events: &[HostEvent], faults: &[ActorFault]) -> Self {
        Snapshot {
            edition: world.edition,
            timer: world.timer,
            floor: world.current_floor,
            room: world.current_room,
            camera_target: world.camera_target,
            game_over: world.game_over,
            vars: world.vars.clone(),
            cvars: world.cvars.clone(),
            inventory: world.inventory.clone(),
            messages: world.messages.clone(),
            actors: world
                .actors
                .iter()
                .enumerate()
                .filter(|(_, actor)| !actor.is_free())
                .map(|(slot, actor)| ActorSnapshot {
                    slot,
                    actor: actor.clone(),
                })
                .collect(),
            objects: world.objects.clone(),
            events: events.to_vec(),
            faults: faults
                .iter()
                .map(|fault| FaultRecord {
                    slot: fault.slot,
                    timer: fault.timer,
                    error: fault.error.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::tempdir;

    use crate::host::NullHost;

    const SIMPLE: &str = r#"{
        "edition": "aitd1",
        "rooms": [{ "world": [0, 0, 0] }, { "world": [10, 0, 0] }],
        "objects": [
            { "stage": 0, "room": 0, "life": 0, "x": 100 },
            { "stage": 0, "room": 1, "life": 0 },
            { "stage": 3, "room": 0, "life": 0 }
        ],
        "resources": { "lives": { "0": [20, 0, 12] } },
        "inputs": [{ "click": 1 }]
    }"#;

    fn pak_image(payloads: &[&[u8]]) -> Vec<u8> {
        let header = 4 * (payloads.len() + 2);
        let mut data = vec![0u8; header];
        let mut offsets = Vec::new();
        for payload in payloads {
            offsets.push(data.len() as u32);
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&(payload.len() as i32).to_le_bytes());
            data.extend_from_slice(&(payload.len() as i32).to_le_bytes());
            data.extend_from_slice(&[0, 0]);
            data.extend_from_slice(&0i16.to_le_bytes());
            data.extend_from_slice(payload);
        }
        offsets.push(data.len() as u32);
        for (index, offset) in offsets.iter().enumerate() {
            let at = (index + 1) * 4;
            data[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        }
        data
    }

    #[test]
    fn builds_world_from_inline_scenario() {
        let scenario = Scenario::from_json(SIMPLE).unwrap();
        let mut host = scenario.host();
        let world = scenario.build_world(&mut host).unwrap();
        assert_eq!(world.objects[0].obj_index, 0);
        assert_eq!(world.actors[0].room_pos, [100, 0, 0]);
        // First release: life mode 0 keeps actors of every room on the floor.
        assert_eq!(world.objects[1].obj_index, 1);
        assert_eq!(world.objects[2].obj_index, -1);
        assert_eq!(host.events, vec![HostEvent::Room { room: 0 }]);
    }

    #[test]
    fn run_feeds_inputs_and_scripts() {
        let scenario = Scenario::from_json(SIMPLE).unwrap();
        let mut host = scenario.host();
        let mut world = scenario.build_world(&mut host).unwrap();
        let faults = scenario.run(&mut world, &mut host, 1);
        assert!(faults.is_empty());
        assert_eq!(world.action, 0x2000);
        scenario.run(&mut world, &mut host, 1);
        assert_eq!(world.action, 0);
        // Both live actors run life 0 each tick.
        assert_eq!(world.var(0), 4);

        let snapshot = Snapshot::capture(&world, &host.events, &faults);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timer"], 2);
        assert_eq!(json["actors"].as_array().unwrap().len(), 2);
        assert_eq!(json["actors"][0]["slot"], 0);
        assert_eq!(json["actors"][0]["room_pos"][0], 100);
    }

    #[test]
    fn rejects_room_outside_floor() {
        let mut scenario = Scenario::from_json(SIMPLE).unwrap();
        scenario.room = 5;
        let err = scenario.build_world(&mut NullHost).unwrap_err();
        assert!(err.to_string().contains("room 5"));

        scenario.room = 0;
        scenario.rooms.clear();
        scenario.floor = 2;
        let err = scenario.build_world(&mut NullHost).unwrap_err();
        assert!(err.to_string().contains("floor 2"));
    }

    #[test]
    fn rejects_oversized_cvar_table() {
        let mut scenario = Scenario::from_json(SIMPLE).unwrap();
        scenario.cvars = vec![0; 46];
        assert!(scenario.build_world(&mut NullHost).is_err());
        scenario.cvars = vec![7; 3];
        let world = scenario.build_world(&mut NullHost).unwrap();
        assert_eq!(&world.cvars[..4], &[7, 7, 7, 0]);
    }

    #[test]
    fn reads_scripts_from_archives() {
        let dir = tempdir().unwrap();
        let life: Vec<u8> = [0x13i16, 1, -1, 9, 0x0C]
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();
        let mut file = fs::File::create(dir.path().join("LISTLIFE.PAK")).unwrap();
        file.write_all(&pak_image(&[&[], &life])).unwrap();

        let scenario_path = dir.path().join("scenario.json");
        fs::write(
            &scenario_path,
            r#"{
                "edition": "aitd1",
                "rooms": [{ "world": [0, 0, 0] }],
                "objects": [{ "stage": 0, "room": 0, "life": 1 }],
                "pak": { "dir": ".", "lives": "LISTLIFE.PAK" }
            }"#,
        )
        .unwrap();

        let scenario = Scenario::from_path(&scenario_path).unwrap();
        let mut host = scenario.host();
        let mut world = scenario.build_world(&mut host).unwrap();
        assert!(!world.resources.lives.contains_key(&0));
        assert_eq!(world.resources.lives[&1], vec![0x13, 1, -1, 9, 0x0C]);
        scenario.run(&mut world, &mut host, 1);
        assert_eq!(world.var(1), 9);
    }
}
