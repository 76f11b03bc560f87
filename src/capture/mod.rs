// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Input captures.
//!
//! A capture binds one audio unit to an input source. Arming a capture
//! acquires its source (an audio stream or MIDI inputs); starting a
//! recording hands that source to a recorder that writes into the project.
//!
//! Negotiation with the platform is asynchronous. Per capture at most one
//! negotiation runs at a time, and a disarm invalidates whatever is still
//! in flight: a stream granted after the disarm is stopped, never bound.

pub mod audio;
pub mod context;
pub mod devices;
pub mod midi;

#[cfg(test)]
pub(crate) mod fixtures;

pub use audio::{AudioCaptureSettings, CaptureAudio};
pub use context::RecordingContext;
pub use devices::CaptureDevices;
pub use midi::{ActiveNotes, CaptureMidi, MidiCaptureSettings};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audio::AudioDevices;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::midi::MidiDevices;
use crate::project::{BoxKind, Project};
use crate::recording::Recorder;

/// Services shared by all captures of a project
#[derive(Clone)]
pub struct CaptureEnv {
    pub project: Arc<Project>,
    pub audio_devices: Arc<dyn AudioDevices>,
    pub midi_devices: Arc<MidiDevices>,
    pub config: Arc<CaptureConfig>,
}

/// State common to both capture variants
pub struct CaptureBase {
    audio_unit: Uuid,
    capture_box: Uuid,
    env: CaptureEnv,
    armed: watch::Sender<bool>,
    generation: AtomicU64,
    negotiation: tokio::sync::Mutex<()>,
}

impl CaptureBase {
    fn new(env: CaptureEnv, audio_unit: Uuid, capture_box: Uuid) -> Self {
        Self {
            audio_unit,
            capture_box,
            env,
            armed: watch::channel(false).0,
            generation: AtomicU64::new(0),
            negotiation: tokio::sync::Mutex::new(()),
        }
    }

    pub fn audio_unit(&self) -> Uuid {
        self.audio_unit
    }

    pub fn capture_box(&self) -> Uuid {
        self.capture_box
    }

    pub fn env(&self) -> &CaptureEnv {
        &self.env
    }

    pub fn is_armed(&self) -> bool {
        *self.armed.borrow()
    }

    pub fn subscribe_armed(&self) -> watch::Receiver<bool> {
        self.armed.subscribe()
    }

    /// Mark armed; returns the generation the negotiation belongs to.
    fn arm(&self) -> u64 {
        self.armed.send_replace(true);
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark disarmed and invalidate in-flight negotiations.
    fn disarm(&self) {
        self.armed.send_replace(false);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Serializes negotiations of this capture.
    async fn single_flight(&self) -> MutexGuard<'_, ()> {
        self.negotiation.lock().await
    }

    /// A failed negotiation leaves the capture unarmed and tells the user,
    /// unless the user cancelled. Failures of abandoned negotiations are
    /// dropped.
    fn fail(&self, generation: u64, error: &CaptureError) {
        if !self.is_current(generation) {
            debug!("Capture {} dropped stale failure: {}", self.audio_unit, error);
            return;
        }
        self.armed.send_replace(false);
        if !error.is_abort() {
            warn!("Capture {} failed: {}", self.audio_unit, error);
            self.env.project.notifier().warn(&error.to_string());
        }
    }
}

/// Empty device ids mean "no filter"
fn device_filter(device_id: &str) -> Option<String> {
    (!device_id.is_empty()).then(|| device_id.to_string())
}

/// Kind of input a capture listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Audio,
    Midi,
}

pub enum Capture {
    Audio(CaptureAudio),
    Midi(CaptureMidi),
}

impl Capture {
    /// Build the capture variant matching the capture box kind.
    ///
    /// # Panics
    /// If `kind` is not a capture box kind.
    pub fn create(env: CaptureEnv, audio_unit: Uuid, capture_box: Uuid, kind: BoxKind) -> Self {
        let base = CaptureBase::new(env, audio_unit, capture_box);
        match kind {
            BoxKind::CaptureAudio => Capture::Audio(CaptureAudio::new(base)),
            BoxKind::CaptureMidi => Capture::Midi(CaptureMidi::new(base)),
            other => panic!("Unrecognized capture box kind: {:?}", other),
        }
    }

    pub fn base(&self) -> &CaptureBase {
        match self {
            Capture::Audio(capture) => capture.base(),
            Capture::Midi(capture) => capture.base(),
        }
    }

    /// Identity: the audio unit's uuid
    pub fn uuid(&self) -> Uuid {
        self.base().audio_unit()
    }

    pub fn capture_box(&self) -> Uuid {
        self.base().capture_box()
    }

    pub fn kind(&self) -> CaptureKind {
        match self {
            Capture::Audio(_) => CaptureKind::Audio,
            Capture::Midi(_) => CaptureKind::Midi,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.base().is_armed()
    }

    pub fn subscribe_armed(&self) -> watch::Receiver<bool> {
        self.base().subscribe_armed()
    }

    /// Device this capture is restricted to, None for the default/all
    pub fn device_filter(&self) -> Option<String> {
        match self {
            Capture::Audio(capture) => capture.settings().device_id,
            Capture::Midi(capture) => capture.settings().device_id,
        }
    }

    /// Arm or disarm. Arming negotiates the input; on failure the capture
    /// stays unarmed and a warning is reported.
    pub async fn set_armed(&self, armed: bool) {
        match self {
            Capture::Audio(capture) => capture.set_armed(armed).await,
            Capture::Midi(capture) => capture.set_armed(armed).await,
        }
    }

    /// Re-read the capture box and renegotiate if armed.
    pub async fn refresh(&self) {
        match self {
            Capture::Audio(capture) => capture.refresh().await,
            Capture::Midi(capture) => capture.refresh().await,
        }
    }

    /// Make sure the input is ready to record. Idempotent.
    pub async fn prepare_recording(&self, ctx: &RecordingContext) -> CaptureResult<()> {
        match self {
            Capture::Audio(capture) => capture.prepare_recording(ctx).await,
            Capture::Midi(capture) => capture.prepare_recording(ctx).await,
        }
    }

    /// Start a recorder following the engine's transport.
    ///
    /// # Panics
    /// If the capture was not prepared.
    pub fn start_recording(&self, ctx: &RecordingContext) -> Recorder {
        let engine = Arc::clone(ctx.project().engine());
        match self {
            Capture::Audio(capture) => Recorder::spawn(capture.start_recording(ctx), engine),
            Capture::Midi(capture) => Recorder::spawn(capture.start_recording(ctx), engine),
        }
    }

    /// Human readable input description
    pub fn label(&self) -> String {
        match self {
            Capture::Audio(capture) => capture.label(),
            Capture::Midi(capture) => capture.label(),
        }
    }

    /// Release the input for good.
    pub fn terminate(&self) {
        match self {
            Capture::Audio(capture) => capture.terminate(),
            Capture::Midi(capture) => capture.terminate(),
        }
    }

    pub fn as_audio(&self) -> Option<&CaptureAudio> {
        match self {
            Capture::Audio(capture) => Some(capture),
            Capture::Midi(_) => None,
        }
    }

    pub fn as_midi(&self) -> Option<&CaptureMidi> {
        match self {
            Capture::Midi(capture) => Some(capture),
            Capture::Audio(_) => None,
        }
    }
}

impl std::fmt::Debug for Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capture")
            .field("kind", &self.kind())
            .field("audio_unit", &self.uuid())
            .field("armed", &self.is_armed())
            .finish()
    }
}
