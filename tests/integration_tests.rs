// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for RECDECK
//!
//! These tests drive captures and recordings end to end against the
//! in-process audio and MIDI backends.

use std::sync::Arc;

use parking_lot::Mutex;
use recdeck::audio::{AudioContext, VirtualAudioDevices};
use recdeck::engine::Transport;
use recdeck::midi::{note_off, note_on, MidiDevices, NoteEvent, VirtualMidiPlatform};
use recdeck::project::{AudioRegionBox, BoxGraph, CaptureAudioBox, NoteEventBox, NoteRegionBox, Project};
use recdeck::runtime::LogNotifier;
use recdeck::samples::{Sample, SampleManager, WavSampleStorage};
use recdeck::timing::ppqn::{pulses_to_samples, samples_to_pulses};
use recdeck::{CaptureConfig, CaptureDevices, CaptureEnv, Recording, RecordingContext};
use tempfile::tempdir;
use uuid::Uuid;

const SAMPLE_RATE: u32 = 48_000;
const BLOCK: usize = 4800;

struct Studio {
    transport: Arc<Transport>,
    notifier: Arc<LogNotifier>,
    audio: Arc<VirtualAudioDevices>,
    midi: Arc<VirtualMidiPlatform>,
    midi_devices: Arc<MidiDevices>,
    project: Arc<Project>,
    devices: CaptureDevices,
}

impl Studio {
    fn new() -> Self {
        Self::with_config(CaptureConfig::default())
    }

    fn with_config(config: CaptureConfig) -> Self {
        let transport = Arc::new(Transport::new(SAMPLE_RATE));
        let notifier = Arc::new(LogNotifier::new());
        let audio = Arc::new(VirtualAudioDevices::new());
        audio.add_device("mic-1", "Mic 1", 2);
        audio.add_device("mic-2", "Mic 2", 2);
        let midi = Arc::new(VirtualMidiPlatform::new());
        midi.add_input("kb", "Keyboard");
        midi.add_input("pads", "Pads");
        let midi_devices = Arc::new(MidiDevices::new(midi.clone()));

        let project = Arc::new(Project::new(BoxGraph::new(), transport.clone(), notifier.clone()));
        let devices = CaptureDevices::new(CaptureEnv {
            project: project.clone(),
            audio_devices: audio.clone(),
            midi_devices: midi_devices.clone(),
            config: Arc::new(config),
        });
        Self {
            transport,
            notifier,
            audio,
            midi,
            midi_devices,
            project,
            devices,
        }
    }

    fn audio_unit(&self, device_id: &str, channels: u8) -> (Uuid, Uuid) {
        self.project.editing().modify(
            |graph| {
                let unit = graph.create_audio_unit("Audio");
                (unit, graph.attach_audio_capture(unit, device_id, channels))
            },
            true,
        )
    }

    fn midi_unit(&self, device_id: &str, channel: i8) -> Uuid {
        self.project.editing().modify(
            |graph| {
                let unit = graph.create_audio_unit("Keys");
                graph.attach_midi_capture(unit, device_id, channel);
                unit
            },
            true,
        )
    }

    fn context(&self, samples: Arc<SampleManager>) -> RecordingContext {
        RecordingContext::new(self.project.clone(), AudioContext::new(SAMPLE_RATE, Some(0.0)), samples)
    }

    fn audio_regions(&self) -> Vec<AudioRegionBox> {
        self.project
            .editing()
            .read(|graph| graph.all::<AudioRegionBox>().cloned().collect())
    }
}

#[tokio::test]
async fn test_channel_change_renegotiates_once() {
    let studio = Studio::new();
    let (unit, capture_box) = studio.audio_unit("mic-1", 2);
    studio.devices.set_arm(unit, false).await;

    let capture = studio.devices.get(unit).unwrap();
    let audio = capture.as_audio().unwrap();
    assert_eq!(audio.stream_device_id().as_deref(), Some("mic-1"));
    assert_eq!(audio.stream().unwrap().settings().unwrap().channel_count, 2);

    studio.project.editing().modify(
        |graph| graph.update::<CaptureAudioBox, _>(capture_box, |b| b.request_channels = 1),
        true,
    );
    studio.devices.process_changes().await;
    assert_eq!(studio.audio.request_count(), 2);
    assert_eq!(audio.stream().unwrap().settings().unwrap().channel_count, 1);

    // Already satisfied: nothing to do
    capture.refresh().await;
    assert_eq!(studio.audio.request_count(), 2);
    assert_eq!(studio.audio.active_streams(), 1);

    capture.set_armed(false).await;
    assert_eq!(studio.audio.active_streams(), 0);
}

#[tokio::test]
async fn test_concurrent_arms_negotiate_once() {
    let studio = Studio::new();
    let (unit, _) = studio.audio_unit("mic-2", 1);
    let capture = studio.devices.get(unit).unwrap();

    let first = tokio::spawn({
        let capture = capture.clone();
        async move { capture.set_armed(true).await }
    });
    let second = tokio::spawn({
        let capture = capture.clone();
        async move { capture.set_armed(true).await }
    });
    first.await.unwrap();
    second.await.unwrap();

    assert!(capture.is_armed());
    assert_eq!(studio.audio.request_count(), 1);
    assert_eq!(studio.audio.active_streams(), 1);
}

#[tokio::test]
async fn test_disarm_while_permission_is_pending() {
    let studio = Studio::new();
    let (unit, _) = studio.audio_unit("mic-1", 1);
    let capture = studio.devices.get(unit).unwrap();

    studio.audio.pause();
    let arming = tokio::spawn({
        let capture = capture.clone();
        async move { capture.set_armed(true).await }
    });
    while studio.audio.request_count() == 0 {
        tokio::task::yield_now().await;
    }
    capture.set_armed(false).await;
    studio.audio.resume();
    arming.await.unwrap();

    assert!(!capture.is_armed());
    assert!(capture.as_audio().unwrap().stream().is_none());
    assert_eq!(studio.audio.active_streams(), 0);
}

#[tokio::test]
async fn test_exclusive_arm_from_any_armed_set() {
    let studio = Studio::new();
    let units = [
        studio.audio_unit("mic-1", 1).0,
        studio.audio_unit("mic-2", 1).0,
        studio.midi_unit("", -1),
    ];

    for mask in 0..8u8 {
        for (i, unit) in units.iter().enumerate() {
            let capture = studio.devices.get(*unit).unwrap();
            capture.set_armed(mask & (1 << i) != 0).await;
        }
        let target = units[mask as usize % units.len()];
        studio.devices.set_arm(target, true).await;

        let armed: Vec<Uuid> = studio
            .devices
            .captures()
            .iter()
            .filter(|capture| capture.is_armed())
            .map(|capture| capture.uuid())
            .collect();
        assert_eq!(armed, vec![target], "prior armed set {:03b}", mask);
    }
}

#[tokio::test]
async fn test_stuck_note_is_released_on_disarm() {
    let studio = Studio::new();
    let unit = studio.midi_unit("", -1);
    studio.devices.set_arm(unit, false).await;

    let capture = studio.devices.get(unit).unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let _sub = capture.as_midi().unwrap().subscribe_notes({
        let received = received.clone();
        move |event: &NoteEvent| received.lock().push(*event)
    });

    studio.midi.send("kb", &note_on(0, 60, 100));
    studio.midi.unplug("kb");
    studio.devices.set_arm(unit, false).await;

    assert_eq!(
        *received.lock(),
        vec![
            NoteEvent::On { channel: 0, pitch: 60, velocity: 100 },
            NoteEvent::Off { channel: 0, pitch: 60 },
        ]
    );
}

#[tokio::test]
async fn test_midi_panic_only_releases_held_notes() {
    let studio = Studio::new();
    let unit = studio.midi_unit("pads", -1);
    studio.devices.set_arm(unit, false).await;
    assert_eq!(studio.devices.get(unit).unwrap().label(), "Listening to Pads");

    let received = Arc::new(Mutex::new(Vec::new()));
    let capture = studio.devices.get(unit).unwrap();
    let _sub = capture.as_midi().unwrap().subscribe_notes({
        let received = received.clone();
        move |event: &NoteEvent| received.lock().push(*event)
    });

    studio.midi.send("pads", &note_on(9, 36, 90));
    studio.midi.send("kb", &note_on(0, 60, 90));
    studio.midi_devices.panic();

    assert_eq!(
        *received.lock(),
        vec![
            NoteEvent::On { channel: 9, pitch: 36, velocity: 90 },
            NoteEvent::Off { channel: 9, pitch: 36 },
        ]
    );
}

#[tokio::test]
async fn test_recorded_take_is_persisted_exactly() {
    let dir = tempdir().unwrap();
    let mut config = CaptureConfig::default();
    config.recording.recordings_dir = Some(dir.path().to_path_buf());
    let samples = Arc::new(config.recording.sample_manager().unwrap());
    let studio = Studio::with_config(config);

    let (unit, _) = studio.audio_unit("mic-1", 1);
    studio.devices.set_arm(unit, true).await;

    let recording = Recording::start(&studio.devices, &studio.context(samples.clone()))
        .await
        .unwrap();
    assert_eq!(recording.audio_units(), vec![unit]);

    // Beat 2.3 in quarter notes
    studio.transport.set_position(2208);
    studio.transport.start_recording();

    let mut durations = Vec::new();
    for _ in 0..10 {
        studio.audio.push("mic-1", &vec![0.1; BLOCK]);
        studio.transport.advance(192);
        recording.tick();
        durations.push(studio.audio_regions()[0].duration);
    }
    assert!(durations.windows(2).all(|pair| pair[0] < pair[1]));

    studio.transport.stop_recording();
    recording.stop();

    let regions = studio.audio_regions();
    assert_eq!(regions.len(), 1);
    let region = &regions[0];
    assert_eq!(region.position, 1920);

    let frames = pulses_to_samples(region.duration as f64, 120.0, SAMPLE_RATE).round() as u64;
    assert_eq!(samples_to_pulses(frames, 120.0, SAMPLE_RATE) as u64, region.duration);

    let path = WavSampleStorage::new(dir.path()).unwrap().path_of(region.file);
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as u64, frames);
    assert!(matches!(samples.get(region.file), Some(Sample::Ready(_))));
}

#[tokio::test]
async fn test_empty_take_persists_nothing() {
    let dir = tempdir().unwrap();
    let mut config = CaptureConfig::default();
    config.recording.recordings_dir = Some(dir.path().to_path_buf());
    let samples = Arc::new(config.recording.sample_manager().unwrap());
    let studio = Studio::with_config(config);

    let (unit, _) = studio.audio_unit("mic-1", 1);
    studio.devices.set_arm(unit, true).await;
    let recording = Recording::start(&studio.devices, &studio.context(samples.clone()))
        .await
        .unwrap();

    studio.transport.start_recording();
    recording.tick();
    studio.transport.stop_recording();
    recording.stop();

    assert!(studio.audio_regions().is_empty());
    assert!(samples.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_deleting_unit_mid_recording_discards_take() {
    let studio = Studio::new();
    let samples = Arc::new(SampleManager::new());
    let (unit, _) = studio.audio_unit("mic-1", 1);
    studio.devices.set_arm(unit, true).await;
    let recording = Recording::start(&studio.devices, &studio.context(samples.clone()))
        .await
        .unwrap();

    studio.transport.start_recording();
    studio.audio.push("mic-1", &vec![0.1; BLOCK]);
    recording.tick();
    assert_eq!(studio.audio_regions().len(), 1);

    studio.project.editing().modify(|graph| graph.remove_audio_unit(unit), true);
    assert!(studio.devices.get(unit).is_none());
    assert_eq!(studio.audio.active_streams(), 0);

    recording.tick();
    recording.stop();
    assert!(samples.is_empty());
}

#[tokio::test]
async fn test_midi_take_through_transport_task() {
    let studio = Studio::new();
    let samples = Arc::new(SampleManager::new());
    let unit = studio.midi_unit("kb", 0);
    studio.devices.set_arm(unit, true).await;
    let recording = Recording::start(&studio.devices, &studio.context(samples))
        .await
        .unwrap();

    studio.transport.set_position(100);
    studio.transport.start_recording();
    tokio::task::yield_now().await;

    studio.midi.send("kb", &note_on(0, 64, 80));
    studio.midi.send("kb", &note_on(1, 65, 80));
    studio.transport.set_position(580);
    studio.midi.send("kb", &note_off(0, 64));
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    studio.transport.stop_recording();
    recording.stop();

    let (regions, events) = studio.project.editing().read(|graph| {
        (
            graph.all::<NoteRegionBox>().cloned().collect::<Vec<_>>(),
            graph.all::<NoteEventBox>().cloned().collect::<Vec<_>>(),
        )
    });
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].position, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pitch, 64);
    assert_eq!(events[0].position, 100);
    assert_eq!(events[0].duration, 480);
    assert!(studio.notifier.warnings().is_empty());
}
