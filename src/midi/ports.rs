use super::NoteSink;
use crate::error::HostError;
use crate::events::{MidiMessage, TransportSignal};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use tracing::{info, warn};

const CLIENT_NAME: &str = "clockphrase";

pub type TransportConsumer = HeapCons<TransportSignal>;

pub struct MidiClockInput {
    _conn: MidiInputConnection<()>,
    pub port_name: String,
}

pub fn open_clock_input(
    filter: Option<&str>,
    capacity: usize,
) -> Result<(MidiClockInput, TransportConsumer), HostError> {
    let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| HostError::Midi(e.to_string()))?;
    // Timing clock must get through.
    midi_in.ignore(Ignore::SysexAndActiveSense);

    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_default())
        .collect();
    let idx = pick_port(&names, filter).ok_or(HostError::NoPort("input"))?;
    let port_name = names[idx].clone();

    let rb = HeapRb::<TransportSignal>::new(capacity);
    let (mut producer, consumer) = rb.split();

    let conn = midi_in
        .connect(
            &ports[idx],
            "clockphrase-clock",
            move |_, msg, _| {
                if let Some(signal) = TransportSignal::from_bytes(msg) {
                    if producer.try_push(signal).is_err() {
                        warn!(?signal, "transport queue full, dropping signal");
                    }
                }
            },
            (),
        )
        .map_err(|e| HostError::Midi(e.to_string()))?;

    info!(port = %port_name, "listening for MIDI clock");
    Ok((MidiClockInput { _conn: conn, port_name }, consumer))
}

pub struct MidiNoteOutput {
    conn: MidiOutputConnection,
    pub port_name: String,
}

pub fn open_note_output(filter: Option<&str>) -> Result<MidiNoteOutput, HostError> {
    let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| HostError::Midi(e.to_string()))?;

    let ports = midi_out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_default())
        .collect();
    let idx = pick_port(&names, filter).ok_or(HostError::NoPort("output"))?;
    let port_name = names[idx].clone();

    let conn = midi_out
        .connect(&ports[idx], "clockphrase-notes")
        .map_err(|e| HostError::Midi(e.to_string()))?;

    info!(port = %port_name, "sending notes");
    Ok(MidiNoteOutput { conn, port_name })
}

impl MidiNoteOutput {
    fn write(&mut self, message: MidiMessage) {
        if let Err(e) = self.conn.send(&message.to_bytes()) {
            warn!(error = %e, ?message, "failed to send MIDI message");
        }
    }
}

impl NoteSink for MidiNoteOutput {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.write(MidiMessage::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, channel: u8) {
        self.write(MidiMessage::NoteOff { note, channel });
    }
}

/// First port whose name contains `filter`, else the first port.
fn pick_port(names: &[String], filter: Option<&str>) -> Option<usize> {
    if let Some(filter) = filter {
        if let Some(idx) = names.iter().position(|n| n.contains(filter)) {
            return Some(idx);
        }
        if !names.is_empty() {
            warn!(filter, fallback = %names[0], "no MIDI port matched, using first");
        }
    }
    (!names.is_empty()).then_some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_matching_port() {
        let ports = names(&["Midi Through", "USB Clock Box", "Synth"]);
        assert_eq!(pick_port(&ports, Some("Clock")), Some(1));
    }

    #[test]
    fn falls_back_to_first_port() {
        let ports = names(&["Midi Through", "Synth"]);
        assert_eq!(pick_port(&ports, Some("APC")), Some(0));
        assert_eq!(pick_port(&ports, None), Some(0));
    }

    #[test]
    fn no_ports_means_none() {
        assert_eq!(pick_port(&[], Some("x")), None);
        assert_eq!(pick_port(&[], None), None);
    }
}
