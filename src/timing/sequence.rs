use super::scaler::TickScaler;
use crate::error::LoadError;
use crate::protocol::{LoadRequest, TimingInfo, raw_text};
use heapless::Vec;
use tracing::{debug, info};

pub const MAX_EVENTS: usize = 64;

pub const DEFAULT_VELOCITY: u8 = 100;
pub const DEFAULT_CHANNEL: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Note { note: u8, velocity: u8 },
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicEvent {
    pub kind: EventKind,
    pub duration_ticks: u16,
}

impl MusicEvent {
    pub fn note(note: u8, velocity: u8, duration_ticks: u16) -> Self {
        Self {
            kind: EventKind::Note { note, velocity },
            duration_ticks,
        }
    }

    pub fn rest(duration_ticks: u16) -> Self {
        Self {
            kind: EventKind::Rest,
            duration_ticks,
        }
    }
}

/// A validated phrase. Only [`SequenceStore::prepare`] builds non-empty ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    events: Vec<MusicEvent, MAX_EVENTS>,
    channel: u8,
    timing: TimingInfo,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            channel: DEFAULT_CHANNEL,
            timing: TimingInfo::default(),
        }
    }
}

impl Sequence {
    pub fn events(&self) -> &[MusicEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&MusicEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn timing(&self) -> TimingInfo {
        self.timing
    }

    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.duration_ticks as u64).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SequenceStore {
    sequence: Sequence,
    loaded: bool,
    default_channel: u8,
    default_velocity: u8,
    scaler: TickScaler,
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL, DEFAULT_VELOCITY, TickScaler::default())
    }
}

impl SequenceStore {
    /// Out-of-range defaults are themselves replaced by the built-in ones.
    pub fn new(default_channel: u8, default_velocity: u8, scaler: TickScaler) -> Self {
        let default_channel = valid_channel(default_channel as i64).unwrap_or(DEFAULT_CHANNEL);
        Self {
            sequence: Sequence {
                channel: default_channel,
                ..Sequence::default()
            },
            loaded: false,
            default_channel,
            default_velocity: valid_velocity(default_velocity as i64).unwrap_or(DEFAULT_VELOCITY),
            scaler,
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded && !self.sequence.is_empty()
    }

    /// Validate and scale a request into a sequence without touching the
    /// stored one.
    pub fn prepare(&self, request: &LoadRequest) -> Result<Sequence, LoadError> {
        let steps = &request.sequence;
        if steps.is_empty() {
            return Err(LoadError::SequenceRequired);
        }
        if steps.len() > MAX_EVENTS {
            return Err(LoadError::SequenceTooLong {
                len: steps.len(),
                max: MAX_EVENTS,
            });
        }

        let mut kinds: Vec<EventKind, MAX_EVENTS> = Vec::new();
        let mut durations = [0u64; MAX_EVENTS];

        for (index, step) in steps.iter().enumerate() {
            durations[index] = step
                .positive_ticks()
                .ok_or_else(|| LoadError::TicksMustBePositive {
                    index,
                    ticks: raw_text(step.ticks.as_ref()),
                })?;

            let kind = match step.kind_name() {
                Some("note") => {
                    let note = step.note_number().ok_or(LoadError::NoteOutOfRange { index })?;
                    let velocity = step
                        .velocity_value()
                        .and_then(valid_velocity)
                        .unwrap_or(self.default_velocity);
                    EventKind::Note { note, velocity }
                }
                Some("rest") => EventKind::Rest,
                _ => {
                    return Err(LoadError::InvalidEventType {
                        index,
                        kind: raw_text(step.kind.as_ref()),
                    });
                }
            };
            // Capacity was checked above.
            let _ = kinds.push(kind);
        }

        let durations = &mut durations[..steps.len()];
        let timing = self.scaler.scale(durations, request.declared_ppqn())?;

        let mut events = Vec::new();
        for (kind, &ticks) in kinds.iter().zip(durations.iter()) {
            let duration_ticks = u16::try_from(ticks).unwrap_or(u16::MAX);
            let _ = events.push(MusicEvent {
                kind: *kind,
                duration_ticks,
            });
        }

        let channel = request
            .channel_number()
            .and_then(valid_channel)
            .unwrap_or(self.default_channel);
        if request.channel.is_some() && request.channel_number().and_then(valid_channel).is_none() {
            debug!(requested = ?request.channel, channel, "channel unusable, using default");
        }
        if request.ppqn.is_some() && request.declared_ppqn().is_none() {
            debug!(ppqn = ?request.ppqn, "resolution unusable, treating as undeclared");
        }

        Ok(Sequence {
            events,
            channel,
            timing,
        })
    }

    pub fn replace(&mut self, sequence: Sequence) {
        info!(
            events = sequence.len(),
            total_ticks = sequence.total_ticks(),
            channel = sequence.channel,
            source_ppqn = sequence.timing.source_resolution,
            explicit = sequence.timing.resolution_was_explicit,
            auto_scaled = sequence.timing.auto_scaled,
            "sequence loaded"
        );
        self.loaded = !sequence.is_empty();
        self.sequence = sequence;
    }
}

fn valid_channel(channel: i64) -> Option<u8> {
    (1..=16).contains(&channel).then_some(channel as u8)
}

fn valid_velocity(velocity: i64) -> Option<u8> {
    (1..=127).contains(&velocity).then_some(velocity as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventDescriptor;

    fn store() -> SequenceStore {
        SequenceStore::default()
    }

    #[test]
    fn prepares_notes_and_rests() {
        let req = LoadRequest::new(vec![
            EventDescriptor::note(60, 24).with_velocity(80),
            EventDescriptor::rest(12),
            EventDescriptor::note(62, 6),
        ])
        .on_channel(5);

        let seq = store().prepare(&req).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.channel(), 5);
        assert_eq!(seq.events()[0], MusicEvent::note(60, 80, 24));
        assert_eq!(seq.events()[1], MusicEvent::rest(12));
        assert_eq!(seq.events()[2], MusicEvent::note(62, DEFAULT_VELOCITY, 6));
        assert_eq!(seq.total_ticks(), 42);
    }

    #[test]
    fn empty_sequence_is_required() {
        let err = store().prepare(&LoadRequest::default()).unwrap_err();
        assert_eq!(err, LoadError::SequenceRequired);
    }

    #[test]
    fn too_many_events_rejected() {
        let req = LoadRequest::new(vec![EventDescriptor::rest(1); MAX_EVENTS + 1]);
        let err = store().prepare(&req).unwrap_err();
        assert_eq!(err, LoadError::SequenceTooLong { len: 65, max: 64 });
    }

    #[test]
    fn exactly_capacity_is_accepted() {
        let req = LoadRequest::new(vec![EventDescriptor::note(60, 1); MAX_EVENTS]);
        let seq = store().prepare(&req).unwrap();
        assert_eq!(seq.len(), MAX_EVENTS);
    }

    #[test]
    fn zero_and_negative_ticks_rejected() {
        let req = LoadRequest::new(vec![EventDescriptor::rest(4), EventDescriptor::note(60, 0)]);
        assert_eq!(
            store().prepare(&req).unwrap_err(),
            LoadError::TicksMustBePositive {
                index: 1,
                ticks: "0".into()
            }
        );

        let req = LoadRequest::new(vec![EventDescriptor::rest(-3)]);
        assert_eq!(store().prepare(&req).unwrap_err().code(), "ticks_must_be_positive");
    }

    #[test]
    fn ticks_checked_before_type() {
        let mut step = EventDescriptor::rest(0);
        step.kind = Some("chord".into());
        let err = store().prepare(&LoadRequest::new(vec![step])).unwrap_err();
        assert_eq!(err.code(), "ticks_must_be_positive");
    }

    #[test]
    fn unknown_type_rejected() {
        let mut step = EventDescriptor::rest(4);
        step.kind = Some("chord".into());
        let err = store().prepare(&LoadRequest::new(vec![step])).unwrap_err();
        assert_eq!(
            err,
            LoadError::InvalidEventType {
                index: 0,
                kind: "chord".into()
            }
        );
    }

    #[test]
    fn note_range_enforced() {
        let req = LoadRequest::new(vec![EventDescriptor::note(128, 4)]);
        assert_eq!(store().prepare(&req).unwrap_err(), LoadError::NoteOutOfRange { index: 0 });

        let req = LoadRequest::new(vec![EventDescriptor::note(-1, 4)]);
        assert_eq!(store().prepare(&req).unwrap_err().code(), "note_out_of_range");

        let mut missing = EventDescriptor::note(0, 4);
        missing.note = None;
        let req = LoadRequest::new(vec![missing]);
        assert_eq!(store().prepare(&req).unwrap_err().code(), "note_out_of_range");
    }

    #[test]
    fn rest_ignores_note_fields() {
        let mut step = EventDescriptor::rest(4);
        step.note = Some(500.into());
        step.velocity = Some((-2).into());
        let seq = store().prepare(&LoadRequest::new(vec![step])).unwrap();
        assert_eq!(seq.events()[0], MusicEvent::rest(4));
    }

    #[test]
    fn bad_velocity_defaults() {
        let req = LoadRequest::new(vec![
            EventDescriptor::note(60, 4).with_velocity(0),
            EventDescriptor::note(60, 4).with_velocity(200),
            EventDescriptor::note(60, 4).with_velocity(127),
        ]);
        let seq = store().prepare(&req).unwrap();
        assert_eq!(seq.events()[0], MusicEvent::note(60, 100, 4));
        assert_eq!(seq.events()[1], MusicEvent::note(60, 100, 4));
        assert_eq!(seq.events()[2], MusicEvent::note(60, 127, 4));
    }

    fn parsed(body: &str) -> LoadRequest {
        LoadRequest::from_json(body).unwrap()
    }

    #[test]
    fn missing_or_fractional_ticks_rejected_by_validator() {
        let err = store()
            .prepare(&parsed(r#"{"sequence": [{"type": "rest"}]}"#))
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::TicksMustBePositive {
                index: 0,
                ticks: "nothing".into()
            }
        );

        let err = store()
            .prepare(&parsed(r#"{"sequence": [{"type": "note", "note": 60, "ticks": 1.5}]}"#))
            .unwrap_err();
        assert_eq!(err.code(), "ticks_must_be_positive");
    }

    #[test]
    fn missing_or_non_string_type_rejected_by_validator() {
        let err = store()
            .prepare(&parsed(r#"{"sequence": [{"ticks": 24}]}"#))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_event_type");

        let err = store()
            .prepare(&parsed(r#"{"sequence": [{"type": 5, "ticks": 24}]}"#))
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::InvalidEventType {
                index: 0,
                kind: "5".into()
            }
        );
    }

    #[test]
    fn non_integer_note_is_out_of_range() {
        let err = store()
            .prepare(&parsed(r#"{"sequence": [{"type": "note", "ticks": 24, "note": 60.5}]}"#))
            .unwrap_err();
        assert_eq!(err, LoadError::NoteOutOfRange { index: 0 });
    }

    #[test]
    fn unusable_velocity_channel_and_ppqn_fall_back() {
        let req = parsed(
            r#"{
                "channel": 99999999999999999999,
                "ppqn": "fast",
                "sequence": [
                    {"type": "note", "ticks": 48, "note": 60, "velocity": 100.5},
                    {"type": "note", "ticks": 24, "note": 62, "velocity": "loud"}
                ]
            }"#,
        );
        let seq = store().prepare(&req).unwrap();
        assert_eq!(seq.channel(), DEFAULT_CHANNEL);
        assert_eq!(seq.events()[0], MusicEvent::note(60, DEFAULT_VELOCITY, 48));
        assert_eq!(seq.events()[1], MusicEvent::note(62, DEFAULT_VELOCITY, 24));
        assert!(!seq.timing().resolution_was_explicit);
    }

    #[test]
    fn empty_store_reports_configured_channel() {
        let store = SequenceStore::new(7, DEFAULT_VELOCITY, TickScaler::default());
        assert_eq!(store.sequence().channel(), 7);
        assert!(!store.is_loaded());
    }

    #[test]
    fn bad_channel_falls_back_to_default() {
        let store = SequenceStore::new(9, DEFAULT_VELOCITY, TickScaler::default());
        for channel in [0, 17, -4] {
            let req = LoadRequest::new(vec![EventDescriptor::rest(1)]).on_channel(channel);
            assert_eq!(store.prepare(&req).unwrap().channel(), 9);
        }
        let req = LoadRequest::new(vec![EventDescriptor::rest(1)]);
        assert_eq!(store.prepare(&req).unwrap().channel(), 9);
    }

    #[test]
    fn invalid_configured_default_channel_uses_one() {
        let store = SequenceStore::new(0, DEFAULT_VELOCITY, TickScaler::default());
        let req = LoadRequest::new(vec![EventDescriptor::rest(1)]).on_channel(99);
        assert_eq!(store.prepare(&req).unwrap().channel(), 1);
    }

    #[test]
    fn prepare_applies_scaling() {
        let req = LoadRequest::new(vec![EventDescriptor::note(60, 24), EventDescriptor::rest(48)])
            .at_ppqn(48);
        let seq = store().prepare(&req).unwrap();
        assert_eq!(seq.events()[0].duration_ticks, 12);
        assert_eq!(seq.events()[1].duration_ticks, 24);
        assert!(seq.timing().resolution_was_explicit);
    }

    #[test]
    fn failed_prepare_leaves_store_untouched() {
        let mut store = store();
        let good = store
            .prepare(&LoadRequest::new(vec![EventDescriptor::note(60, 24)]))
            .unwrap();
        store.replace(good.clone());

        let bad = LoadRequest::new(vec![EventDescriptor::note(60, 70000)]);
        assert_eq!(store.prepare(&bad).unwrap_err().code(), "ticks_too_large");
        assert_eq!(store.sequence(), &good);
        assert!(store.is_loaded());
    }

    #[test]
    fn replace_marks_loaded() {
        let mut store = store();
        assert!(!store.is_loaded());
        let seq = store
            .prepare(&LoadRequest::new(vec![EventDescriptor::rest(2)]))
            .unwrap();
        store.replace(seq);
        assert!(store.is_loaded());
        assert_eq!(store.sequence().len(), 1);
    }
}
