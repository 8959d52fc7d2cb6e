mod debounce;
mod playback;
mod scaler;
mod sequence;
mod transport;

pub use debounce::{DEFAULT_SETTLE_MS, Debouncer};
pub use playback::{Cursor, PlayState, PlaybackEngine, PulseOutcome};
pub use scaler::{INTERNAL_PPQN, MAX_TICKS, TickScaler};
pub use sequence::{
    DEFAULT_CHANNEL, DEFAULT_VELOCITY, EventKind, MAX_EVENTS, MusicEvent, Sequence, SequenceStore,
};
pub use transport::TransportArbiter;
