use super::sequence::{EventKind, Sequence};
use crate::midi::NoteSink;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Idle,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    Ignored,
    Advanced,
    /// The last event completed and playback stopped.
    Finished,
    /// The last event completed and the cursor wrapped to the first one.
    Looped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SoundingNote {
    note: u8,
    velocity: u8,
    channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub index: usize,
    /// Clock pulses since `begin`.
    pub position: u64,
    /// Absolute tick at which the current event ends.
    pub event_end: u64,
}

/// Walks the stored phrase one external clock pulse at a time.
///
/// The engine never keeps a reference to the sequence; every call borrows it
/// so a replaced phrase cannot be half-observed. The sounding note carries
/// its own channel so it is always released where it was started.
#[derive(Debug, Clone, Default)]
pub struct PlaybackEngine {
    state: PlayState,
    cursor: Cursor,
    sounding: Option<SoundingNote>,
    loop_enabled: bool,
}

impl PlaybackEngine {
    pub fn new(loop_enabled: bool) -> Self {
        Self {
            loop_enabled,
            ..Default::default()
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn sounding_note(&self) -> Option<(u8, u8)> {
        self.sounding.map(|s| (s.note, s.velocity))
    }

    /// Start from the first event. Returns `false` (and does nothing) when
    /// the sequence is empty.
    pub fn begin(&mut self, sequence: &Sequence, out: &mut impl NoteSink) -> bool {
        if sequence.is_empty() {
            return false;
        }

        self.silence(out);
        self.cursor = Cursor::default();
        self.state = PlayState::Playing;
        debug!(events = sequence.len(), channel = sequence.channel(), "playback started");
        self.start_event(sequence, out);
        true
    }

    pub fn on_clock_pulse(&mut self, sequence: &Sequence, out: &mut impl NoteSink) -> PulseOutcome {
        if self.state != PlayState::Playing {
            return PulseOutcome::Ignored;
        }

        self.cursor.position += 1;
        trace!(position = self.cursor.position, "clock pulse");

        let mut outcome = PulseOutcome::Advanced;
        while self.cursor.position >= self.cursor.event_end {
            self.silence(out);
            self.cursor.index += 1;

            if self.cursor.index >= sequence.len() {
                if !self.loop_enabled || sequence.is_empty() {
                    self.finish();
                    return PulseOutcome::Finished;
                }
                self.cursor.index = 0;
                outcome = PulseOutcome::Looped;
                trace!(position = self.cursor.position, "sequence looped");
            }

            if !self.start_event(sequence, out) {
                return PulseOutcome::Finished;
            }
        }
        outcome
    }

    /// Silence any held note and return to idle. Safe to call repeatedly;
    /// returns whether anything was playing.
    pub fn stop(&mut self, out: &mut impl NoteSink) -> bool {
        self.silence(out);
        let was_playing = self.is_playing();
        self.state = PlayState::Idle;
        self.cursor = Cursor::default();
        if was_playing {
            debug!("playback stopped");
        }
        was_playing
    }

    fn start_event(&mut self, sequence: &Sequence, out: &mut impl NoteSink) -> bool {
        let Some(event) = sequence.get(self.cursor.index) else {
            self.finish();
            return false;
        };

        self.cursor.event_end = self.cursor.position + event.duration_ticks as u64;
        if let EventKind::Note { note, velocity } = event.kind {
            let channel = sequence.channel();
            out.note_on(note, velocity, channel);
            self.sounding = Some(SoundingNote {
                note,
                velocity,
                channel,
            });
        }
        true
    }

    fn silence(&mut self, out: &mut impl NoteSink) {
        if let Some(held) = self.sounding.take() {
            out.note_off(held.note, held.channel);
        }
    }

    fn finish(&mut self) {
        debug!(position = self.cursor.position, "sequence finished");
        self.state = PlayState::Idle;
        self.cursor = Cursor::default();
    }
}
