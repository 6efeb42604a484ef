use serde::Serialize;

/// Services the simulation calls out to: audio, presentation screens, the
/// inventory UI and camera visibility. Every method has a no-op default so a
/// host only implements what it renders.
pub trait Host {
    fn play_sample(&mut self, _sample: i16) {}

    fn play_music(&mut self, _music: i16) {}

    fn fade_music(&mut self, _music: i16) {}

    /// Paged text screen. Returns once the reader closes it.
    fn read_book(&mut self, _page: i16, _book: i16) {}

    fn show_picture(&mut self, _picture: i16, _delay: i16, _sample: i16) {}

    fn play_sequence(&mut self, _sequence: i16, _fade_in: i16, _fade_out: i16) {}

    fn end_sequence(&mut self) {}

    fn open_inventory(&mut self) {}

    /// Asks the player whether to pick `object` up. `can_carry` is false when
    /// weight or slot limits already forbid it; the answer is then ignored.
    fn confirm_pickup(&mut self, _object: i16, _can_carry: bool) -> bool {
        true
    }

    /// Rooms the current camera sees, in addition to the rooms linked to the
    /// current one by room-change zones.
    fn viewed_rooms(&self) -> Vec<i16> {
        Vec::new()
    }

    /// Whether `room` is inside the current camera's view.
    fn room_in_camera(&self, _room: i16) -> bool {
        false
    }

    fn room_changed(&mut self, _room: i16) {}

    fn floor_changed(&mut self, _floor: i16) {}
}

/// Host that renders nothing and accepts every pickup.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

/// One call the simulation made into its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Sample { sample: i16 },
    Music { music: i16 },
    FadeMusic { music: i16 },
    Book { page: i16, book: i16 },
    Picture { picture: i16, delay: i16, sample: i16 },
    Sequence { sequence: i16, fade_in: i16, fade_out: i16 },
    EndSequence,
    Inventory,
    Pickup { object: i16, taken: bool },
    Room { room: i16 },
    Floor { floor: i16 },
}

/// Host that keeps a log of every call, for tests and the CLI report.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecordingHost {
    pub events: Vec<HostEvent>,
    /// Rooms reported as visible by the camera.
    pub viewed: Vec<i16>,
    /// Pickup answer to give when carrying is possible.
    pub accept_pickups: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        RecordingHost {
            accept_pickups: true,
            ..RecordingHost::default()
        }
    }

    pub fn samples(&self) -> Vec<i16> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Sample { sample } => Some(*sample),
                _ => None,
            })
            .collect()
    }
}

impl Host for RecordingHost {
    fn play_sample(&mut self, sample: i16) {
        self.events.push(HostEvent::Sample { sample });
    }

    fn play_music(&mut self, music: i16) {
        self.events.push(HostEvent::Music { music });
    }

    fn fade_music(&mut self, music: i16) {
        self.events.push(HostEvent::FadeMusic { music });
    }

    fn read_book(&mut self, page: i16, book: i16) {
        self.events.push(HostEvent::Book { page, book });
    }

    fn show_picture(&mut self, picture: i16, delay: i16, sample: i16) {
        self.events.push(HostEvent::Picture {
            picture,
            delay,
            sample,
        });
    }

    fn play_sequence(&mut self, sequence: i16, fade_in: i16, fade_out: i16) {
        self.events.push(HostEvent::Sequence {
            sequence,
            fade_in,
            fade_out,
        });
    }

    fn end_sequence(&mut self) {
        self.events.push(HostEvent::EndSequence);
    }

    fn open_inventory(&mut self) {
        self.events.push(HostEvent::Inventory);
    }

    fn confirm_pickup(&mut self, object: i16, can_carry: bool) -> bool {
        let taken = can_carry && self.accept_pickups;
        self.events.push(HostEvent::Pickup { object, taken });
        taken
    }

    fn viewed_rooms(&self) -> Vec<i16> {
        self.viewed.clone()
    }

    fn room_in_camera(&self, room: i16) -> bool {
        self.viewed.contains(&room)
    }

    fn room_changed(&mut self, room: i16) {
        self.events.push(HostEvent::Room { room });
    }

    fn floor_changed(&mut self, floor: i16) {
        self.events.push(HostEvent::Floor { floor });
    }
}
