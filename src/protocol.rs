//! JSON shapes exchanged with the request collaborator.
//!
//! Field names follow the REST bridge that uploads phrases to the device:
//! a load body is `{"channel": 1, "ppqn": 48, "sequence": [...]}` where each
//! step is `{"type": "note", "ticks": 24, "note": 60, "velocity": 100}`.

use crate::error::{LoadError, RequestError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step as the caller described it, before validation.
///
/// Every field is kept as raw JSON so that a missing or mistyped value
/// reaches the validator and comes back as a specific load error instead
/// of failing the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
    #[serde(default)]
    pub ticks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Value>,
}

impl EventDescriptor {
    pub fn note(note: i64, ticks: i64) -> Self {
        Self {
            kind: Some("note".into()),
            ticks: Some(ticks.into()),
            note: Some(note.into()),
            velocity: None,
        }
    }

    pub fn rest(ticks: i64) -> Self {
        Self {
            kind: Some("rest".into()),
            ticks: Some(ticks.into()),
            note: None,
            velocity: None,
        }
    }

    pub fn with_velocity(mut self, velocity: i64) -> Self {
        self.velocity = Some(velocity.into());
        self
    }

    pub fn kind_name(&self) -> Option<&str> {
        self.kind.as_ref().and_then(Value::as_str)
    }

    pub fn positive_ticks(&self) -> Option<u64> {
        self.ticks.as_ref().and_then(Value::as_u64).filter(|&t| t > 0)
    }

    pub fn note_number(&self) -> Option<u8> {
        self.note
            .as_ref()
            .and_then(Value::as_u64)
            .filter(|&n| n <= 127)
            .map(|n| n as u8)
    }

    pub fn velocity_value(&self) -> Option<i64> {
        self.velocity.as_ref().and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub sequence: Vec<EventDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Value>,
    #[serde(default, alias = "resolution", skip_serializing_if = "Option::is_none")]
    pub ppqn: Option<Value>,
}

impl LoadRequest {
    pub fn new(sequence: Vec<EventDescriptor>) -> Self {
        Self {
            sequence,
            channel: None,
            ppqn: None,
        }
    }

    pub fn on_channel(mut self, channel: i64) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn at_ppqn(mut self, ppqn: u32) -> Self {
        self.ppqn = Some(ppqn.into());
        self
    }

    pub fn channel_number(&self) -> Option<i64> {
        self.channel.as_ref().and_then(Value::as_i64)
    }

    /// Resolution the caller's `ticks` are expressed in. Anything that is not
    /// a whole number in `u32` range counts as undeclared.
    pub fn declared_ppqn(&self) -> Option<u32> {
        self.ppqn
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
    }

    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(body)?)
    }
}

pub(crate) fn raw_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "nothing".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub events_loaded: usize,
    pub channel: u8,
    pub sequence_loaded: bool,
    pub transport_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingInfo {
    pub source_resolution: u32,
    pub applied_resolution: u32,
    pub resolution_was_explicit: bool,
    pub auto_scaled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub sequence_loaded: bool,
    pub event_count: usize,
    pub channel: u8,
    pub playing: bool,
    pub pending: bool,
    pub transport_running: bool,
    pub timing: TimingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl From<&LoadError> for ErrorBody {
    fn from(err: &LoadError) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<&RequestError> for ErrorBody {
    fn from(err: &RequestError) -> Self {
        match err {
            RequestError::Rejected(load) => load.into(),
            other => Self {
                error: other.code().to_string(),
                message: other.to_string(),
            },
        }
    }
}
