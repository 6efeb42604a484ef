pub mod actions;
pub mod anim;
pub mod error;
pub mod eval_var;
pub mod host;
pub mod life;
pub mod math;
pub mod objects;
pub mod scenario;
pub mod tick;
pub mod track;
pub mod world;
pub mod zones;
pub mod zv;

pub use error::{SimError, SimResult};
pub use host::{Host, HostEvent, NullHost, RecordingHost};
pub use life::ScriptCursor;
pub use scenario::{Scenario, Snapshot};
pub use tick::ActorFault;
pub use world::{Actor, Input, World};
pub use zv::Zv;
