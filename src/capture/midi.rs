// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI capture.
//!
//! Listens to one or all MIDI inputs, filters by channel and republishes
//! note events. Notes still held when the inputs are released are closed
//! with synthesized note-offs, so downstream never sees a stuck note.

use std::sync::Arc;

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{device_filter, CaptureBase, RecordingContext};
use crate::error::{CaptureError, CaptureResult};
use crate::midi::messages::{CHANNELS, NOTES};
use crate::midi::{MidiCallback, MidiInputHandle, MidiMessage, NoteEvent};
use crate::notifier::{Notifier, Subscription};
use crate::project::CaptureMidiBox;
use crate::recording::{RecordMidi, RecordMidiContext};

/// Held-note counters per channel and pitch
#[derive(Debug, Clone)]
pub struct ActiveNotes {
    counts: [[u8; NOTES as usize]; CHANNELS as usize],
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self {
            counts: [[0; NOTES as usize]; CHANNELS as usize],
        }
    }

    pub fn note_on(&mut self, channel: u8, pitch: u8) {
        let count = &mut self.counts[(channel & 0x0F) as usize][(pitch & 0x7F) as usize];
        *count = count.saturating_add(1);
    }

    /// Returns false if the note was not held.
    pub fn note_off(&mut self, channel: u8, pitch: u8) -> bool {
        let count = &mut self.counts[(channel & 0x0F) as usize][(pitch & 0x7F) as usize];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    pub fn count(&self, channel: u8, pitch: u8) -> u8 {
        self.counts[(channel & 0x0F) as usize][(pitch & 0x7F) as usize]
    }

    /// Total number of held notes
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().map(|c| *c as usize).sum()
    }

    /// Held notes as (channel, pitch, count); clears all counters.
    pub fn drain(&mut self) -> Vec<(u8, u8, u8)> {
        let mut held = Vec::new();
        for (channel, pitches) in self.counts.iter_mut().enumerate() {
            for (pitch, count) in pitches.iter_mut().enumerate() {
                if *count > 0 {
                    held.push((channel as u8, pitch as u8, *count));
                    *count = 0;
                }
            }
        }
        held
    }
}

impl Default for ActiveNotes {
    fn default() -> Self {
        Self::new()
    }
}

/// What the capture box asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiCaptureSettings {
    /// None listens to all inputs
    pub device_id: Option<String>,
    /// None accepts all channels
    pub channel: Option<u8>,
}

/// Open inputs plus the note-off safety net
struct Streaming {
    settings: MidiCaptureSettings,
    inputs: Vec<MidiInputHandle>,
    active: Arc<Mutex<ActiveNotes>>,
}

impl Streaming {
    /// Detach the inputs, then close every note still held.
    fn terminate(self, notifier: &Notifier<NoteEvent>) {
        drop(self.inputs);
        let held = self.active.lock().drain();
        for (channel, pitch, count) in held {
            for _ in 0..count {
                notifier.notify(&NoteEvent::Off { channel, pitch });
            }
        }
    }
}

pub struct CaptureMidi {
    base: CaptureBase,
    notifier: Notifier<NoteEvent>,
    streaming: Mutex<Option<Streaming>>,
    monitor: Mutex<Option<Subscription>>,
}

impl CaptureMidi {
    pub(super) fn new(base: CaptureBase) -> Self {
        let notifier = Notifier::new();

        // Live monitoring through the unit's instrument
        let engine = Arc::clone(base.env.project.engine());
        let audio_unit = base.audio_unit;
        let monitor = notifier.subscribe(move |event: &NoteEvent| match *event {
            NoteEvent::On { pitch, velocity, .. } => engine.note_on(audio_unit, pitch, velocity),
            NoteEvent::Off { pitch, .. } => engine.note_off(audio_unit, pitch),
        });

        Self {
            base,
            notifier,
            streaming: Mutex::new(None),
            monitor: Mutex::new(Some(monitor)),
        }
    }

    pub fn base(&self) -> &CaptureBase {
        &self.base
    }

    /// Current settings of the capture box
    pub fn settings(&self) -> MidiCaptureSettings {
        let capture_box = self.base.capture_box;
        let stored = self
            .base
            .env
            .project
            .editing()
            .read(|graph| graph.get_as::<CaptureMidiBox>(capture_box).cloned());

        match stored {
            Some(b) => MidiCaptureSettings {
                device_id: device_filter(&b.device_id),
                channel: u8::try_from(b.channel).ok().filter(|c| *c < CHANNELS),
            },
            None => MidiCaptureSettings {
                device_id: None,
                channel: None,
            },
        }
    }

    /// Subscribe to the filtered note stream.
    pub fn subscribe_notes(&self, listener: impl Fn(&NoteEvent) + Send + Sync + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Held notes of the current streaming session
    pub fn held_notes(&self) -> usize {
        self.streaming
            .lock()
            .as_ref()
            .map_or(0, |streaming| streaming.active.lock().total())
    }

    /// Whether inputs are attached
    pub fn is_streaming(&self) -> bool {
        self.streaming.lock().is_some()
    }

    /// Status line: access, armed state, device and channel filter
    pub fn label(&self) -> String {
        let midi = &self.base.env.midi_devices;
        let Some(access) = midi.get() else {
            return "MIDI not available".to_string();
        };
        if !self.base.is_armed() {
            return "Arm to listen to MIDI device...".to_string();
        }
        let settings = self.settings();
        let source = match settings.device_id {
            None => "Listening to all MIDI devices".to_string(),
            Some(id) => match access.inputs().into_iter().find(|input| input.id == id) {
                Some(input) => format!("Listening to {}", input.name),
                None => format!("Listening to unknown device '{}'", id),
            },
        };
        match settings.channel {
            Some(channel) => format!("{} on channel {}", source, channel + 1),
            None => source,
        }
    }

    pub(super) async fn set_armed(&self, armed: bool) {
        if armed {
            let generation = self.base.arm();
            if let Err(e) = self.update_stream(generation).await {
                self.base.fail(generation, &e);
            }
        } else {
            self.base.disarm();
            self.stop_stream();
        }
    }

    pub(super) async fn refresh(&self) {
        if !self.base.is_armed() {
            return;
        }
        let generation = self.base.generation();
        if let Err(e) = self.update_stream(generation).await {
            self.base.fail(generation, &e);
        }
    }

    pub(super) async fn prepare_recording(&self, _ctx: &RecordingContext) -> CaptureResult<()> {
        let midi = &self.base.env.midi_devices;
        let Some(access) = midi.get() else {
            return Err(CaptureError::MidiUnavailable);
        };
        if let Some(id) = self.settings().device_id {
            if !access.inputs().iter().any(|input| input.id == id) {
                warn!("Could not find MIDI device with id: '{}'", id);
                return Err(CaptureError::DeviceNotFound(id));
            }
        }
        let generation = self.base.generation();
        self.update_stream(generation).await
    }

    pub(super) fn start_recording(&self, ctx: &RecordingContext) -> RecordMidi {
        assert!(
            self.base.env.midi_devices.get().is_some(),
            "No MIDI input devices found"
        );

        // Stamp every note with the playhead position on arrival; notes
        // outside the transport's recording pass never reach the take
        let (sender, events) = unbounded();
        let engine = ctx.project().engine();
        let (position, recording) = (engine.position(), engine.is_recording());
        let subscription = self.notifier.subscribe(move |event: &NoteEvent| {
            if *recording.borrow() {
                let _ = sender.send((*position.borrow(), *event));
            }
        });

        RecordMidi::start(RecordMidiContext {
            project: Arc::clone(ctx.project()),
            audio_unit: self.base.audio_unit,
            events,
            subscription,
            quantize: self.base.env.config.midi.quantize,
        })
    }

    pub(super) fn terminate(&self) {
        self.base.disarm();
        self.stop_stream();
        self.monitor.lock().take();
    }

    async fn update_stream(&self, generation: u64) -> CaptureResult<()> {
        let _flight = self.base.single_flight().await;
        if !self.base.is_current(generation) {
            return Ok(());
        }

        let midi = &self.base.env.midi_devices;
        if midi.get().is_none() {
            midi.request_permission().await?;
            if !self.base.is_current(generation) {
                return Ok(());
            }
        }

        let settings = self.settings();
        if let Some(current) = self.streaming.lock().as_ref() {
            if current.settings == settings {
                return Ok(());
            }
        }

        let inputs: Vec<_> = midi
            .inputs()
            .into_iter()
            .filter(|input| settings.device_id.as_ref().map_or(true, |id| *id == input.id))
            .collect();
        if let Some(id) = &settings.device_id {
            if inputs.is_empty() {
                return Err(CaptureError::DeviceNotFound(id.clone()));
            }
        }

        self.stop_stream();

        let active = Arc::new(Mutex::new(ActiveNotes::new()));
        let mut handles = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let callback = self.listener(Arc::clone(&active), settings.channel);
            handles.push(midi.connect(&input.id, callback)?);
        }
        info!(
            "Capture {} listening to {} MIDI input(s), channel {:?}",
            self.base.audio_unit,
            handles.len(),
            settings.channel
        );

        *self.streaming.lock() = Some(Streaming {
            settings,
            inputs: handles,
            active,
        });
        Ok(())
    }

    fn listener(&self, active: Arc<Mutex<ActiveNotes>>, channel_filter: Option<u8>) -> MidiCallback {
        let notifier = self.notifier.clone();
        Arc::new(move |bytes: &[u8]| {
            let accepts = |channel: u8| channel_filter.map_or(true, |c| c == channel);
            let event = match MidiMessage::parse(bytes) {
                Some(MidiMessage::NoteOn {
                    channel,
                    note,
                    velocity,
                }) if accepts(channel) => {
                    active.lock().note_on(channel, note);
                    NoteEvent::On {
                        channel,
                        pitch: note,
                        velocity,
                    }
                }
                Some(MidiMessage::NoteOff { channel, note, .. }) if accepts(channel) => {
                    if !active.lock().note_off(channel, note) {
                        return;
                    }
                    NoteEvent::Off {
                        channel,
                        pitch: note,
                    }
                }
                _ => return,
            };
            notifier.notify(&event);
        })
    }

    fn stop_stream(&self) {
        let streaming = self.streaming.lock().take();
        if let Some(streaming) = streaming {
            debug!("Capture {} released its MIDI inputs", self.base.audio_unit);
            streaming.terminate(&self.notifier);
        }
    }
}
