// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input layer.
//!
//! Raw bytes arrive from a platform backend (midir, or the in-process
//! virtual backend) and are parsed into [`MidiMessage`]s. Access to the
//! platform goes through the [`MidiDevices`] service so that permission is
//! requested once and shared by every MIDI capture.

pub mod devices;
#[cfg(feature = "native")]
pub mod midir_backend;
pub mod virtual_devices;

pub use devices::{
    MidiAccess, MidiCallback, MidiDevices, MidiInputHandle, MidiInputInfo, MidiPlatform,
};
pub use virtual_devices::VirtualMidiPlatform;

/// Parsed MIDI message types
#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Pitch Bend: channel (0-15), value (-8192 to 8191)
    PitchBend { channel: u8, value: i16 },
    /// Anything else
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            messages::NOTE_OFF if rest.len() >= 2 => Some(MidiMessage::NoteOff {
                channel,
                note: rest[0] & 0x7F,
                velocity: rest[1] & 0x7F,
            }),
            messages::NOTE_ON if rest.len() >= 2 => {
                let note = rest[0] & 0x7F;
                let velocity = rest[1] & 0x7F;
                // Note On with velocity 0 is equivalent to Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            messages::CONTROL_CHANGE if rest.len() >= 2 => Some(MidiMessage::ControlChange {
                channel,
                controller: rest[0] & 0x7F,
                value: rest[1] & 0x7F,
            }),
            messages::PITCH_BEND if rest.len() >= 2 => {
                let lsb = (rest[0] & 0x7F) as i16;
                let msb = (rest[1] & 0x7F) as i16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                })
            }
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }

    /// Channel of a channel voice message
    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(*channel),
            MidiMessage::Unknown(_) => None,
        }
    }
}

/// Note event republished by MIDI captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On { channel: u8, pitch: u8, velocity: u8 },
    Off { channel: u8, pitch: u8 },
}

impl NoteEvent {
    pub fn pitch(&self) -> u8 {
        match self {
            NoteEvent::On { pitch, .. } | NoteEvent::Off { pitch, .. } => *pitch,
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            NoteEvent::On { channel, .. } | NoteEvent::Off { channel, .. } => *channel,
        }
    }
}

/// Raw Note Off bytes
pub fn note_off(channel: u8, note: u8) -> [u8; 3] {
    [messages::NOTE_OFF | (channel & 0x0F), note & 0x7F, 0]
}

/// Raw Note On bytes
pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [messages::NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PITCH_BEND: u8 = 0xE0;

    pub const CHANNELS: u8 = 16;
    pub const NOTES: u8 = 128;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        assert_eq!(
            MidiMessage::parse(&[0x91, 60, 100]),
            Some(MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_zero_velocity_is_note_off() {
        assert_eq!(
            MidiMessage::parse(&[0x90, 64, 0]),
            Some(MidiMessage::NoteOff {
                channel: 0,
                note: 64,
                velocity: 0
            })
        );
    }

    #[test]
    fn test_parse_truncated_and_empty() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(
            MidiMessage::parse(&[0x90, 60]),
            Some(MidiMessage::Unknown(vec![0x90, 60]))
        );
    }

    #[test]
    fn test_parse_pitch_bend_center() {
        assert_eq!(
            MidiMessage::parse(&[0xE3, 0x00, 0x40]),
            Some(MidiMessage::PitchBend {
                channel: 3,
                value: 0
            })
        );
    }

    #[test]
    fn test_note_off_bytes() {
        assert_eq!(note_off(15, 60), [0x8F, 60, 0]);
        assert_eq!(
            MidiMessage::parse(&note_on(2, 61, 90)).and_then(|m| m.channel()),
            Some(2)
        );
    }
}
