use thiserror::Error;

/// Reasons a load request is refused. The existing sequence is left untouched
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("sequence must contain at least one event")]
    SequenceRequired,
    #[error("sequence has {len} events, at most {max} are allowed")]
    SequenceTooLong { len: usize, max: usize },
    #[error("event {index}: ticks must be a positive integer (got {ticks})")]
    TicksMustBePositive { index: usize, ticks: String },
    #[error("event {index}: unknown event type {kind:?}")]
    InvalidEventType { index: usize, kind: String },
    #[error("event {index}: note must be in 0-127")]
    NoteOutOfRange { index: usize },
    #[error("event {index}: {raw} ticks at {ppqn} ppqn does not fit in 16 bits")]
    TicksAfterScalingOutOfRange { index: usize, raw: u64, ppqn: u32 },
    #[error("event {index}: {ticks} ticks does not fit in 16 bits")]
    TicksTooLarge { index: usize, ticks: u64 },
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::SequenceRequired => "sequence_required",
            LoadError::SequenceTooLong { .. } => "sequence_too_long",
            LoadError::TicksMustBePositive { .. } => "ticks_must_be_positive",
            LoadError::InvalidEventType { .. } => "invalid_event_type",
            LoadError::NoteOutOfRange { .. } => "note_out_of_range",
            LoadError::TicksAfterScalingOutOfRange { .. } => "ticks_after_scaling_out_of_range",
            LoadError::TicksTooLarge { .. } => "ticks_too_large",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to write config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[from] ron::Error),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("failed to read request file: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine is not running")]
    EngineGone,
    #[error(transparent)]
    Rejected(#[from] LoadError),
}

impl RequestError {
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Malformed(_) => "invalid_json",
            RequestError::Io(_) => "io_error",
            RequestError::EngineGone => "engine_unavailable",
            RequestError::Rejected(e) => e.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("MIDI error: {0}")]
    Midi(String),
    #[error("no MIDI {0} port available")]
    NoPort(&'static str),
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
