// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio recording.
//!
//! The capture's stream feeds a recording worklet through a gain stage.
//! Only frames arriving while the transport records enter the worklet,
//! and the audio region grows with the frames it has received. On stop the worklet is trimmed to exactly the
//! region's length and the take is handed to the sample manager.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RecordTrack, RecordingEngine, REGION_LABEL};
use crate::audio::{db_to_gain, AudioContext, MediaStream, RecordingWorklet};
use crate::project::{generate_hue, AudioFileBox, AudioRegionBox, Project, TimelineBox, TrackType};
use crate::samples::SampleManager;
use crate::timing::ppqn::{from_signature, pulses_to_samples, quantize_floor, samples_to_pulses};
use crate::timing::Ppqn;

/// Inputs of an audio recording
pub struct RecordAudioContext {
    pub worklet: Arc<RecordingWorklet>,
    pub stream: Arc<dyn MediaStream>,
    /// Transport's recording flag; gates the stream into the worklet
    pub recording: watch::Receiver<bool>,
    pub sample_manager: Arc<SampleManager>,
    pub audio_context: AudioContext,
    pub project: Arc<Project>,
    pub audio_unit: Uuid,
    pub gain_db: f64,
    pub file_prefix: String,
}

/// Region created for the take
#[derive(Debug, Clone, Copy)]
struct Take {
    region: Uuid,
    position: Ppqn,
}

pub struct RecordAudio {
    ctx: RecordAudioContext,
    take: Option<Take>,
    finished: bool,
}

impl RecordAudio {
    /// Connect the stream to the worklet and register the sample.
    pub fn start(ctx: RecordAudioContext) -> Self {
        let gain = db_to_gain(ctx.gain_db) as f32;
        if let Some(mut input) = ctx.worklet.take_input() {
            let recording = ctx.recording.clone();
            let mut scaled = Vec::new();
            ctx.stream.connect(Box::new(move |frames: &[f32]| {
                if !*recording.borrow() {
                    return;
                }
                if gain == 1.0 {
                    input.write(frames);
                } else {
                    scaled.clear();
                    scaled.extend(frames.iter().map(|sample| sample * gain));
                    input.write(&scaled);
                }
            }));
        }
        ctx.sample_manager.record(Arc::clone(&ctx.worklet));
        info!(
            "Recording audio unit {} into sample {} ({} ch, {:.1} dB)",
            ctx.audio_unit,
            ctx.worklet.uuid(),
            ctx.worklet.channel_count(),
            ctx.gain_db
        );
        Self {
            ctx,
            take: None,
            finished: false,
        }
    }

    /// Uuid of the sample and its audio file box
    pub fn sample(&self) -> Uuid {
        self.ctx.worklet.uuid()
    }

    /// Region of the take, once the transport recorded
    pub fn region(&self) -> Option<Uuid> {
        self.take.map(|take| take.region)
    }

    /// Start of the region on the timeline
    pub fn position(&self) -> Option<Ppqn> {
        self.take.map(|take| take.position)
    }

    fn sample_rate(&self) -> u32 {
        self.ctx.audio_context.sample_rate
    }

    fn pulses(&self, frames: u64, bpm: f64) -> Ppqn {
        samples_to_pulses(frames, bpm, self.sample_rate()).floor() as Ppqn
    }

    fn seconds(&self, frames: u64) -> f64 {
        frames as f64 / self.sample_rate() as f64
    }

    fn create_region(&self, position: Ppqn, timeline: &TimelineBox, duration: Ppqn, seconds: f64) -> Take {
        let start = quantize_floor(position, from_signature(1, timeline.denominator));
        let file = self.ctx.worklet.uuid();
        let file_name = format!("{} {}", self.ctx.file_prefix, Local::now().format("%Y-%m-%d %H.%M.%S"));
        let audio_unit = self.ctx.audio_unit;

        let region = self.ctx.project.editing().modify(
            move |graph| {
                let track = RecordTrack::find_or_create(graph, audio_unit, TrackType::Audio);
                graph.insert(AudioFileBox {
                    uuid: file,
                    file_name,
                    end_in_seconds: seconds,
                });
                graph.insert(AudioRegionBox {
                    uuid: Uuid::new_v4(),
                    track,
                    file,
                    position: start,
                    duration,
                    loop_duration: duration,
                    hue: generate_hue(TrackType::Audio),
                    label: REGION_LABEL.to_string(),
                })
            },
            false,
        );
        debug!("Created audio region {} at {}", region, start);
        Take {
            region,
            position: start,
        }
    }

    /// Set the region's length. Returns false if the region is gone.
    fn resize(&self, region: Uuid, duration: Ppqn, seconds: f64, track_undo: bool) -> bool {
        let file = self.ctx.worklet.uuid();
        self.ctx.project.editing().modify(
            |graph| {
                let alive = graph
                    .update::<AudioRegionBox, _>(region, |r| {
                        r.duration = duration;
                        r.loop_duration = duration;
                    })
                    .is_some();
                if alive {
                    graph.update::<AudioFileBox, _>(file, |f| f.end_in_seconds = seconds);
                }
                alive
            },
            track_undo,
        )
    }

    /// Drop the take without persisting anything.
    fn discard(&mut self) {
        self.finished = true;
        self.ctx.stream.disconnect();
        let file = self.ctx.worklet.uuid();
        if let Some(take) = self.take.take() {
            self.ctx.project.editing().modify(
                |graph| {
                    graph.remove(take.region);
                    graph.remove(file);
                },
                false,
            );
        }
        self.ctx.sample_manager.remove(file);
        self.ctx.worklet.terminate();
        info!("Discarded recording {}", file);
    }
}

impl RecordingEngine for RecordAudio {
    fn tick(&mut self, position: Ppqn, recording: bool) {
        if self.finished {
            return;
        }
        if !self.ctx.stream.is_live() {
            warn!("Input of audio unit {} ended while recording", self.ctx.audio_unit);
            self.discard();
            return;
        }
        self.ctx.worklet.drain();
        if !recording {
            return;
        }

        let frames = self.ctx.worklet.number_of_frames();
        let timeline = self.ctx.project.timeline();
        let duration = self.pulses(frames, timeline.bpm);
        let seconds = self.seconds(frames);

        match self.take {
            None => self.take = Some(self.create_region(position, &timeline, duration, seconds)),
            Some(take) => {
                if !self.resize(take.region, duration, seconds, false) {
                    warn!("Region {} was removed while recording", take.region);
                    self.discard();
                }
            }
        }
    }

    fn stop(&mut self) {
        if self.finished {
            return;
        }
        self.ctx.stream.disconnect();
        self.ctx.worklet.drain();

        let frames = self.ctx.worklet.number_of_frames();
        let Some(take) = self.take else {
            debug!("Recording stopped before the transport recorded");
            self.discard();
            return;
        };
        let bpm = self.ctx.project.timeline().bpm;
        let duration = self.pulses(frames, bpm);
        if duration == 0 {
            debug!("Recording captured no audio");
            self.discard();
            return;
        }

        // Every frame the region covers, never past what was captured
        let total = (pulses_to_samples(duration as f64, bpm, self.sample_rate()).ceil() as u64).min(frames);
        if !self.resize(take.region, duration, self.seconds(total), true) {
            warn!("Region {} was removed while recording", take.region);
            self.discard();
            return;
        }
        self.finished = true;

        let file = self.ctx.worklet.uuid();
        self.ctx.worklet.limit(total);
        match self.ctx.worklet.finalize() {
            Some(data) => {
                if let Err(e) = self.ctx.sample_manager.complete(file, data) {
                    warn!("Could not store sample {}: {}", file, e);
                }
            }
            None => warn!("Sample {} had nothing to finalize", file),
        }
        info!(
            "Finished recording {}: {} frames, region {} ({} pulses at {})",
            file, total, take.region, duration, take.position
        );
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fixtures::Fixture;
    use crate::capture::{Capture, RecordingContext};
    use crate::project::CaptureAudioBox;
    use crate::recording::Recorder;
    use crate::samples::Sample;

    const BLOCK: usize = 4800;

    async fn start(fx: &Fixture, channels: u8, latency: f64) -> (Capture, Recorder) {
        let capture = fx.audio_capture("mic-1", channels);
        capture.set_armed(true).await;
        let ctx = fx.context(Some(latency));
        capture.prepare_recording(&ctx).await.unwrap();
        let recorder = capture.start_recording(&ctx);
        (capture, recorder)
    }

    fn region(fx: &Fixture) -> Option<AudioRegionBox> {
        fx.project()
            .editing()
            .read(|graph| graph.all::<AudioRegionBox>().next().cloned())
    }

    fn feed(fx: &Fixture, recorder: &Recorder, value: f32) {
        fx.audio.push("mic-1", &vec![value; BLOCK]);
        recorder.tick();
    }

    #[tokio::test]
    async fn test_region_starts_on_beat_and_grows() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.transport.set_position(2208);
        fx.transport.start_recording();

        feed(&fx, &recorder, 0.5);
        let first = region(&fx).unwrap();
        assert_eq!(first.position, 1920);
        assert_eq!(first.duration, 192);
        assert_eq!(first.label, REGION_LABEL);

        let mut last = first.duration;
        for _ in 0..9 {
            fx.transport.advance(192);
            feed(&fx, &recorder, 0.5);
            let duration = region(&fx).unwrap().duration;
            assert!(duration > last);
            last = duration;
        }

        fx.transport.stop_recording();
        recorder.stop();
        let finished = region(&fx).unwrap();
        assert_eq!(finished.duration, 1920);
        assert_eq!(finished.loop_duration, 1920);

        let Some(Sample::Ready(data)) = fx.samples.get(finished.file) else {
            panic!("sample not finalized");
        };
        assert_eq!(data.number_of_frames(), 48_000);
        let file = fx
            .project()
            .editing()
            .read(|graph| graph.get_as::<AudioFileBox>(finished.file).cloned())
            .unwrap();
        assert!(file.file_name.starts_with("Recording "));
        assert!((file.end_in_seconds - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_audio_outside_recording_pass_is_not_taken() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.audio.push("mic-1", &vec![0.9; BLOCK]);
        fx.transport.start_recording();
        feed(&fx, &recorder, 0.5);
        let take = region(&fx).unwrap();
        assert_eq!(take.duration, 192);

        fx.transport.stop_recording();
        fx.audio.push("mic-1", &vec![0.9; BLOCK]);
        recorder.stop();

        assert_eq!(region(&fx).unwrap().duration, 192);
        let Some(Sample::Ready(data)) = fx.samples.get(take.file) else {
            panic!("sample not finalized");
        };
        assert_eq!(data.number_of_frames(), BLOCK);
        assert!(data.channels()[0].iter().all(|sample| *sample == 0.5));
    }

    #[tokio::test]
    async fn test_trim_keeps_every_frame_of_the_region() {
        let fx = Fixture::new();
        let capture = fx.audio_capture("mic-1", 1);
        capture.set_armed(true).await;
        let ctx = RecordingContext::new(
            fx.project().clone(),
            AudioContext::new(44_100, Some(0.0)),
            fx.samples.clone(),
        );
        capture.prepare_recording(&ctx).await.unwrap();
        let recorder = capture.start_recording(&ctx);

        fx.transport.start_recording();
        fx.audio.push("mic-1", &vec![0.5; 391]);
        recorder.tick();
        fx.transport.stop_recording();
        recorder.stop();

        let take = region(&fx).unwrap();
        assert_eq!(take.duration, 17);
        let frames = fx.samples.get(take.file).unwrap().number_of_frames();
        assert_eq!(frames, 391);
        assert_eq!(samples_to_pulses(frames, 120.0, 44_100).floor() as Ppqn, take.duration);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick_leaves_nothing() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.transport.start_recording();
        fx.audio.push("mic-1", &vec![0.5; BLOCK]);
        recorder.stop();

        assert!(region(&fx).is_none());
        assert!(fx.samples.is_empty());
        assert!(recorder.is_finished());
    }

    #[tokio::test]
    async fn test_zero_frames_removes_region() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.transport.start_recording();
        recorder.tick();
        assert!(region(&fx).is_some());

        recorder.stop();
        assert!(region(&fx).is_none());
        assert_eq!(fx.project().editing().read(|graph| graph.all::<AudioFileBox>().count()), 0);
        assert!(fx.samples.is_empty());
    }

    #[tokio::test]
    async fn test_removed_region_aborts_recording() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.transport.start_recording();
        feed(&fx, &recorder, 0.5);
        let take = region(&fx).unwrap();

        fx.project().editing().modify(|graph| graph.remove(take.uuid), true);
        feed(&fx, &recorder, 0.5);
        assert!(recorder.is_finished());
        assert!(fx.samples.is_empty());
        assert!(!fx.project().editing().read(|graph| graph.contains(take.file)));
    }

    #[tokio::test]
    async fn test_unplugged_device_aborts_recording() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.0).await;
        fx.transport.start_recording();
        feed(&fx, &recorder, 0.5);

        fx.audio.unplug("mic-1");
        recorder.tick();
        assert!(recorder.is_finished());
        assert!(region(&fx).is_none());
        assert!(fx.samples.is_empty());
    }

    #[tokio::test]
    async fn test_gain_is_applied() {
        let fx = Fixture::new();
        let capture = fx.audio_capture("mic-1", 2);
        fx.project().editing().modify(
            |graph| graph.update::<CaptureAudioBox, _>(capture.capture_box(), |b| b.gain_db = -6.0),
            false,
        );
        capture.set_armed(true).await;
        let ctx = fx.context(Some(0.0));
        capture.prepare_recording(&ctx).await.unwrap();
        let recorder = capture.start_recording(&ctx);

        fx.transport.start_recording();
        for _ in 0..10 {
            fx.audio.push("mic-1", &vec![1.0; BLOCK * 2]);
            recorder.tick();
        }
        recorder.stop();

        let take = region(&fx).unwrap();
        let Some(Sample::Ready(data)) = fx.samples.get(take.file) else {
            panic!("sample not finalized");
        };
        assert_eq!(data.channel_count(), 2);
        assert!((data.channels()[1][0] as f64 - db_to_gain(-6.0)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_output_latency_is_skipped() {
        let fx = Fixture::new();
        let (_capture, recorder) = start(&fx, 1, 0.01).await;
        fx.transport.start_recording();
        feed(&fx, &recorder, 0.5);
        let take = region(&fx).unwrap();
        assert_eq!(fx.samples.get(take.file).unwrap().number_of_frames(), (BLOCK - 480) as u64);
    }
}
