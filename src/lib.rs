//! Clock-slaved phrase player.
//!
//! Buffers one short monophonic phrase and plays it in lock-step with an
//! external 24 PPQN MIDI clock, armed and disarmed from a physical control.

mod config;
pub mod controls;
mod engine;
pub mod error;
pub mod events;
pub mod midi;
pub mod protocol;
pub mod timing;
pub mod watch;

pub use config::Config;
pub use engine::{Engine, EngineHandle, PollLoop, Reply, Request, load_via, spawn_engine};
pub use error::{ConfigError, HostError, LoadError, RequestError};
pub use events::{Control, Event, MidiMessage, TransportSignal};
pub use protocol::{EventDescriptor, LoadRequest, LoadResponse, StatusSnapshot, TimingInfo};
