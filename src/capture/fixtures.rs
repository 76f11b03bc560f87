// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Shared setup for capture and recording unit tests.

use std::sync::Arc;

use uuid::Uuid;

use super::{Capture, CaptureEnv, RecordingContext};
use crate::audio::{AudioContext, VirtualAudioDevices};
use crate::config::CaptureConfig;
use crate::engine::Transport;
use crate::midi::{MidiDevices, VirtualMidiPlatform};
use crate::project::{BoxGraph, BoxKind, Project};
use crate::runtime::LogNotifier;
use crate::samples::SampleManager;

pub(crate) const SAMPLE_RATE: u32 = 48_000;

pub(crate) struct Fixture {
    pub transport: Arc<Transport>,
    pub notifier: Arc<LogNotifier>,
    pub audio: Arc<VirtualAudioDevices>,
    pub midi: Arc<VirtualMidiPlatform>,
    pub samples: Arc<SampleManager>,
    pub env: CaptureEnv,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_notifier(LogNotifier::new())
    }

    pub fn with_notifier(notifier: LogNotifier) -> Self {
        let transport = Arc::new(Transport::new(SAMPLE_RATE));
        let notifier = Arc::new(notifier);
        let audio = Arc::new(VirtualAudioDevices::new());
        audio.add_device("mic-1", "Mic 1", 2);
        audio.add_device("mic-2", "Mic 2", 1);
        let midi = Arc::new(VirtualMidiPlatform::new());
        midi.add_input("kb", "Keyboard");

        let project = Arc::new(Project::new(BoxGraph::new(), transport.clone(), notifier.clone()));
        let env = CaptureEnv {
            project,
            audio_devices: audio.clone(),
            midi_devices: Arc::new(MidiDevices::new(midi.clone())),
            config: Arc::new(CaptureConfig::default()),
        };
        Self {
            transport,
            notifier,
            audio,
            midi,
            samples: Arc::new(SampleManager::new()),
            env,
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.env.project
    }

    pub fn unit_with_audio(&self, device_id: &str, channels: u8) -> (Uuid, Uuid) {
        self.project().editing().modify(
            |graph| {
                let unit = graph.create_audio_unit("Audio");
                (unit, graph.attach_audio_capture(unit, device_id, channels))
            },
            false,
        )
    }

    pub fn unit_with_midi(&self, device_id: &str, channel: i8) -> (Uuid, Uuid) {
        self.project().editing().modify(
            |graph| {
                let unit = graph.create_audio_unit("Keys");
                (unit, graph.attach_midi_capture(unit, device_id, channel))
            },
            false,
        )
    }

    pub fn audio_capture(&self, device_id: &str, channels: u8) -> Capture {
        let (unit, capture) = self.unit_with_audio(device_id, channels);
        Capture::create(self.env.clone(), unit, capture, BoxKind::CaptureAudio)
    }

    pub fn midi_capture(&self, device_id: &str, channel: i8) -> Capture {
        let (unit, capture) = self.unit_with_midi(device_id, channel);
        Capture::create(self.env.clone(), unit, capture, BoxKind::CaptureMidi)
    }

    pub fn context(&self, output_latency: Option<f64>) -> RecordingContext {
        RecordingContext::new(
            self.project().clone(),
            AudioContext::new(SAMPLE_RATE, output_latency),
            self.samples.clone(),
        )
    }
}
