// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine seam.
//!
//! Recorders follow the engine's transport: they sample the playhead
//! position and the recording flag through watch channels and forward
//! live notes for monitoring.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::watch;
use uuid::Uuid;

use crate::timing::Ppqn;

/// What the capture layer needs from the audio engine
pub trait Engine: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Whether the transport is recording
    fn is_recording(&self) -> watch::Receiver<bool>;

    /// Playhead position
    fn position(&self) -> watch::Receiver<Ppqn>;

    /// Play a note on an audio unit's instrument (live monitoring)
    fn note_on(&self, audio_unit: Uuid, pitch: u8, velocity: u8);

    fn note_off(&self, audio_unit: Uuid, pitch: u8);
}

/// Monitoring note sent to an audio unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSignal {
    On { audio_unit: Uuid, pitch: u8, velocity: u8 },
    Off { audio_unit: Uuid, pitch: u8 },
}

/// Transport driven by the host.
///
/// Monitoring notes are queued on a channel for the host's synth.
pub struct Transport {
    sample_rate: u32,
    recording: watch::Sender<bool>,
    position: watch::Sender<Ppqn>,
    notes_tx: Sender<NoteSignal>,
    notes_rx: Receiver<NoteSignal>,
}

impl Transport {
    pub fn new(sample_rate: u32) -> Self {
        let (notes_tx, notes_rx) = unbounded();
        Self {
            sample_rate,
            recording: watch::channel(false).0,
            position: watch::channel(0).0,
            notes_tx,
            notes_rx,
        }
    }

    pub fn set_position(&self, position: Ppqn) {
        self.position.send_replace(position);
    }

    /// Move the playhead forward
    pub fn advance(&self, pulses: Ppqn) {
        self.position.send_modify(|position| *position += pulses);
    }

    pub fn current_position(&self) -> Ppqn {
        *self.position.borrow()
    }

    pub fn start_recording(&self) {
        self.recording.send_replace(true);
    }

    pub fn stop_recording(&self) {
        self.recording.send_replace(false);
    }

    pub fn recording_now(&self) -> bool {
        *self.recording.borrow()
    }

    /// Monitoring notes queued so far
    pub fn notes(&self) -> Receiver<NoteSignal> {
        self.notes_rx.clone()
    }
}

impl Engine for Transport {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_recording(&self) -> watch::Receiver<bool> {
        self.recording.subscribe()
    }

    fn position(&self) -> watch::Receiver<Ppqn> {
        self.position.subscribe()
    }

    fn note_on(&self, audio_unit: Uuid, pitch: u8, velocity: u8) {
        let _ = self.notes_tx.send(NoteSignal::On {
            audio_unit,
            pitch,
            velocity,
        });
    }

    fn note_off(&self, audio_unit: Uuid, pitch: u8) {
        let _ = self.notes_tx.send(NoteSignal::Off { audio_unit, pitch });
    }
}
