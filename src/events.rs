use crate::protocol::LoadRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8, channel: u8 },
    NoteOff { note: u8, channel: u8 },
}

impl MidiMessage {
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiMessage::NoteOn { note, velocity, channel } => {
                [0x90 | status_channel(channel), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { note, channel } => {
                [0x80 | status_channel(channel), note & 0x7F, 0]
            }
        }
    }
}

fn status_channel(channel: u8) -> u8 {
    channel.saturating_sub(1) & 0x0F
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    ClockPulse,
    Start,
    Stop,
    Continue,
}

impl TransportSignal {
    /// Decode a realtime message. Anything else on the wire is not ours.
    pub fn from_bytes(msg: &[u8]) -> Option<Self> {
        match msg.first()? {
            0xF8 => Some(TransportSignal::ClockPulse),
            0xFA => Some(TransportSignal::Start),
            0xFB => Some(TransportSignal::Continue),
            0xFC => Some(TransportSignal::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Primary,
    Trigger,
}

#[derive(Debug, Clone)]
pub enum Event {
    ClockPulse,
    Start,
    Stop,
    Continue,
    ControlEdge { control: Control, pressed: bool },
    LoadRequest(LoadRequest),
    QueryStatus,
}

impl From<TransportSignal> for Event {
    fn from(signal: TransportSignal) -> Self {
        match signal {
            TransportSignal::ClockPulse => Event::ClockPulse,
            TransportSignal::Start => Event::Start,
            TransportSignal::Stop => Event::Stop,
            TransportSignal::Continue => Event::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_realtime_bytes() {
        assert_eq!(TransportSignal::from_bytes(&[0xF8]), Some(TransportSignal::ClockPulse));
        assert_eq!(TransportSignal::from_bytes(&[0xFA]), Some(TransportSignal::Start));
        assert_eq!(TransportSignal::from_bytes(&[0xFB]), Some(TransportSignal::Continue));
        assert_eq!(TransportSignal::from_bytes(&[0xFC]), Some(TransportSignal::Stop));
    }

    #[test]
    fn ignores_channel_messages() {
        assert_eq!(TransportSignal::from_bytes(&[0x90, 60, 100]), None);
        assert_eq!(TransportSignal::from_bytes(&[0xFE]), None);
        assert_eq!(TransportSignal::from_bytes(&[]), None);
    }

    #[test]
    fn encodes_notes_on_one_based_channel() {
        let on = MidiMessage::NoteOn { note: 60, velocity: 100, channel: 1 };
        assert_eq!(on.to_bytes(), [0x90, 60, 100]);

        let off = MidiMessage::NoteOff { note: 60, channel: 16 };
        assert_eq!(off.to_bytes(), [0x8F, 60, 0]);
    }
}
