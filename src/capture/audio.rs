// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio capture.
//!
//! Keeps at most one input stream bound. The stream is renegotiated when
//! the requested device or channel count no longer matches, and left alone
//! otherwise.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::{device_filter, CaptureBase, RecordingContext};
use crate::audio::{MediaStream, StreamConstraints, TrackSettings};
use crate::error::{CaptureError, CaptureResult};
use crate::project::CaptureAudioBox;
use crate::recording::{RecordAudio, RecordAudioContext};
use crate::runtime::ApproveRequest;

type StreamSlot = Option<Arc<dyn MediaStream>>;

/// What the capture box asks for
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCaptureSettings {
    /// None for the platform default
    pub device_id: Option<String>,
    pub channels: u16,
    pub gain_db: f64,
}

impl AudioCaptureSettings {
    /// Whether a granted track fulfils these settings
    pub fn satisfied_by(&self, track: &TrackSettings) -> bool {
        track.channel_count == self.channels
            && self
                .device_id
                .as_ref()
                .map_or(true, |id| *id == track.device_id)
    }
}

pub struct CaptureAudio {
    base: CaptureBase,
    stream: watch::Sender<StreamSlot>,
}

impl CaptureAudio {
    pub(super) fn new(base: CaptureBase) -> Self {
        Self {
            base,
            stream: watch::channel(None).0,
        }
    }

    pub fn base(&self) -> &CaptureBase {
        &self.base
    }

    /// Current settings of the capture box
    pub fn settings(&self) -> AudioCaptureSettings {
        let default_channels = self.base.env.config.audio.default_channels;
        let capture_box = self.base.capture_box;
        let stored = self
            .base
            .env
            .project
            .editing()
            .read(|graph| graph.get_as::<CaptureAudioBox>(capture_box).cloned());

        match stored {
            Some(b) => AudioCaptureSettings {
                device_id: device_filter(&b.device_id),
                channels: match b.request_channels {
                    1 => 1,
                    2 => 2,
                    _ => default_channels,
                },
                gain_db: b.gain_db,
            },
            None => AudioCaptureSettings {
                device_id: None,
                channels: default_channels,
                gain_db: 0.0,
            },
        }
    }

    /// Bound stream, if any
    pub fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.stream.borrow().clone()
    }

    pub fn subscribe_stream(&self) -> watch::Receiver<StreamSlot> {
        self.stream.subscribe()
    }

    /// Device id the bound stream actually reports
    pub fn stream_device_id(&self) -> Option<String> {
        self.stream()
            .and_then(|stream| stream.settings())
            .map(|track| track.device_id)
    }

    /// Label of the bound device
    pub fn label(&self) -> String {
        self.stream()
            .and_then(|stream| stream.settings())
            .map(|track| track.label)
            .unwrap_or_else(|| "Default".to_string())
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

    pub(super) async fn prepare_recording(&self, ctx: &RecordingContext) -> CaptureResult<()> {
        if ctx.audio_context().output_latency.is_none() {
            let approved = self
                .base
                .env
                .project
                .notifier()
                .approve(ApproveRequest {
                    headline: Some("Warning".to_string()),
                    message: "Your platform does not report output latency. This will cause timing issues while recording.".to_string(),
                    approve_text: "Ignore".to_string(),
                    cancel_text: "Cancel".to_string(),
                })
                .await;
            if !approved {
                return Err(CaptureError::Aborted("Recording cancelled".to_string()));
            }
        }
        let generation = self.base.generation();
        self.update_stream(generation).await
    }

    pub(super) fn start_recording(&self, ctx: &RecordingContext) -> RecordAudio {
        let Some(stream) = self.stream() else {
            panic!("Stream not prepared.");
        };
        let channel_count = stream.settings().map_or(1, |track| track.channel_count);
        let config = &self.base.env.config;
        let output_latency = ctx.audio_context().output_latency;
        let worklet = ctx
            .worklets()
            .create_recording(channel_count, config.recording.num_chunks, output_latency);

        RecordAudio::start(RecordAudioContext {
            worklet,
            stream,
            recording: ctx.project().engine().is_recording(),
            sample_manager: Arc::clone(ctx.sample_manager()),
            audio_context: ctx.audio_context(),
            project: Arc::clone(ctx.project()),
            audio_unit: self.base.audio_unit,
            gain_db: self.settings().gain_db,
            file_prefix: config.recording.file_prefix.clone(),
        })
    }

    pub(super) fn terminate(&self) {
        self.base.disarm();
        self.stop_stream();
    }

    /// Bring the bound stream in line with the capture box.
    async fn update_stream(&self, generation: u64) -> CaptureResult<()> {
        let _flight = self.base.single_flight().await;
        if !self.base.is_current(generation) {
            return Ok(());
        }

        let settings = self.settings();
        let current = self.stream().and_then(|stream| stream.settings());
        if current.is_some_and(|track| settings.satisfied_by(&track)) {
            return Ok(());
        }
        self.stop_stream();

        let sample_rate = self.base.env.project.engine().sample_rate();
        let mut constraints =
            StreamConstraints::raw(settings.device_id.clone(), settings.channels, sample_rate);
        constraints.sample_size = self.base.env.config.audio.sample_size;
        debug!("Requesting stream {:?}", constraints);

        let stream = self.base.env.audio_devices.request_stream(&constraints).await?;
        if !self.base.is_current(generation) {
            debug!("Capture {} disarmed during negotiation", self.base.audio_unit);
            stream.stop();
            return Ok(());
        }

        let granted = stream.settings();
        if let Some(requested) = &settings.device_id {
            let granted_id = granted.as_ref().map(|track| track.device_id.clone());
            if granted_id.as_deref() != Some(requested.as_str()) {
                stream.stop();
                return Err(CaptureError::DeviceMismatch {
                    requested: requested.clone(),
                    granted: granted_id.unwrap_or_default(),
                });
            }
        }

        if let Some(track) = &granted {
            info!(
                "Capture {} bound to '{}' ({} ch)",
                self.base.audio_unit, track.label, track.channel_count
            );
        }
        self.stream.send_replace(Some(stream));
        Ok(())
    }

    fn stop_stream(&self) {
        if let Some(stream) = self.stream.send_replace(None) {
            stream.stop();
            debug!("Capture {} released its stream", self.base.audio_unit);
        }
    }
}
