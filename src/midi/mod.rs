mod ports;

pub use ports::{MidiClockInput, MidiNoteOutput, TransportConsumer, open_clock_input, open_note_output};

use crate::events::MidiMessage;
use tracing::debug;

/// Outbound side of the MIDI collaborator. `channel` is 1-based.
pub trait NoteSink {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8);
    fn note_off(&mut self, note: u8, channel: u8);
}

impl NoteSink for Vec<MidiMessage> {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.push(MidiMessage::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        self.push(MidiMessage::NoteOff { note, channel });
    }
}

impl<S: NoteSink + ?Sized> NoteSink for &mut S {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        (**self).note_on(note, velocity, channel);
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        (**self).note_off(note, channel);
    }
}

impl<S: NoteSink + ?Sized> NoteSink for Box<S> {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        (**self).note_on(note, velocity, channel);
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        (**self).note_off(note, channel);
    }
}

#[derive(Debug, Default)]
pub struct LogSink;

impl NoteSink for LogSink {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        debug!(note, velocity, channel, "note on");
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        debug!(note, channel, "note off");
    }
}
