// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording worklets.
//!
//! A worklet is split in two halves joined by an rtrb ring buffer:
//! - [`WorkletInput`] lives on the audio thread and pushes whole frames
//! - [`RecordingWorklet`] lives on the control thread, drains the ring into
//!   planar channel buffers and hands the finished take to the sample manager
//!
//! The frame counter only counts frames that made it into the ring, so the
//! reported length always matches the data that will be persisted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AudioContext, RENDER_QUANTUM};
use crate::samples::SampleData;

/// Audio-thread half of a recording worklet
pub struct WorkletInput {
    producer: Producer<f32>,
    channel_count: usize,
    frames: Arc<AtomicU64>,
    skip: u64,
    dropped: u64,
}

impl WorkletInput {
    /// Push interleaved frames. Returns how many frames were accepted.
    ///
    /// Frames that do not fit are dropped whole; partial frames never enter
    /// the ring.
    pub fn write(&mut self, interleaved: &[f32]) -> usize {
        let ch = self.channel_count;
        let mut frames = &interleaved[..interleaved.len() / ch * ch];

        // Output latency compensation
        if self.skip > 0 {
            let skipped = (frames.len() / ch).min(self.skip as usize);
            self.skip -= skipped as u64;
            frames = &frames[skipped * ch..];
        }

        let available = frames.len() / ch;
        let writable = (self.producer.slots() / ch).min(available);
        for sample in &frames[..writable * ch] {
            if self.producer.push(*sample).is_err() {
                break;
            }
        }
        if writable < available {
            self.dropped += (available - writable) as u64;
        }
        self.frames.fetch_add(writable as u64, Ordering::Release);
        writable
    }

    /// Frames lost to a full ring
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Recording,
    Finalized,
    Terminated,
}

struct Recorded {
    channels: Vec<Vec<f32>>,
    limit: Option<u64>,
    status: Status,
}

/// Control-thread half of a recording worklet
pub struct RecordingWorklet {
    uuid: Uuid,
    channel_count: usize,
    sample_rate: u32,
    input: Mutex<Option<WorkletInput>>,
    consumer: Mutex<Consumer<f32>>,
    frames: Arc<AtomicU64>,
    recorded: Mutex<Recorded>,
}

impl RecordingWorklet {
    /// Create a worklet with room for `num_chunks` render quanta per channel.
    pub fn new(
        channel_count: u16,
        num_chunks: usize,
        sample_rate: u32,
        output_latency: Option<f64>,
    ) -> Self {
        let channel_count = channel_count.max(1) as usize;
        let capacity = channel_count * num_chunks.max(1) * RENDER_QUANTUM;
        let (producer, consumer) = RingBuffer::new(capacity);
        let frames = Arc::new(AtomicU64::new(0));
        let skip = output_latency
            .map(|latency| (latency.max(0.0) * sample_rate as f64).round() as u64)
            .unwrap_or(0);

        Self {
            uuid: Uuid::new_v4(),
            channel_count,
            sample_rate,
            input: Mutex::new(Some(WorkletInput {
                producer,
                channel_count,
                frames: Arc::clone(&frames),
                skip,
                dropped: 0,
            })),
            consumer: Mutex::new(consumer),
            frames,
            recorded: Mutex::new(Recorded {
                channels: vec![Vec::new(); channel_count],
                limit: None,
                status: Status::Recording,
            }),
        }
    }

    /// Identity of the recorded sample
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames captured so far
    pub fn number_of_frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Take the audio-thread half. Returns None after the first call.
    pub fn take_input(&self) -> Option<WorkletInput> {
        self.input.lock().take()
    }

    /// Move everything in the ring into the channel buffers.
    pub fn drain(&self) -> usize {
        let mut consumer = self.consumer.lock();
        let mut recorded = self.recorded.lock();
        if recorded.status != Status::Recording {
            return 0;
        }

        let ch = self.channel_count;
        let available = consumer.slots() / ch * ch;
        if available == 0 {
            return 0;
        }
        if let Ok(chunk) = consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            for (i, sample) in first.iter().chain(second.iter()).enumerate() {
                recorded.channels[i % ch].push(*sample);
            }
            chunk.commit_all();
        }
        available / ch
    }

    /// Cap the persisted length at `total` frames.
    pub fn limit(&self, total: u64) {
        self.recorded.lock().limit = Some(total);
    }

    /// Drain what is left and hand out the take. Returns None when the
    /// worklet was already finalized or terminated.
    pub fn finalize(&self) -> Option<SampleData> {
        self.drain();
        let mut recorded = self.recorded.lock();
        if recorded.status != Status::Recording {
            warn!("Worklet {} finalized twice", self.uuid);
            return None;
        }
        recorded.status = Status::Finalized;

        let limit = recorded.limit;
        let mut channels = std::mem::take(&mut recorded.channels);
        if let Some(limit) = limit {
            for channel in &mut channels {
                channel.truncate(limit as usize);
            }
        }
        debug!(
            "Worklet {} finalized: {} frames",
            self.uuid,
            channels.first().map_or(0, Vec::len)
        );
        Some(SampleData::new(self.sample_rate, channels))
    }

    /// Discard everything and release the audio-thread half.
    pub fn terminate(&self) {
        let mut recorded = self.recorded.lock();
        recorded.status = Status::Terminated;
        recorded.channels.clear();
        self.input.lock().take();
    }

    pub fn is_terminated(&self) -> bool {
        self.recorded.lock().status == Status::Terminated
    }
}

/// Factory for worklets bound to one audio context
#[derive(Debug, Clone)]
pub struct AudioWorklets {
    context: AudioContext,
}

impl AudioWorklets {
    pub fn new(context: AudioContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> AudioContext {
        self.context
    }

    /// Create a recording worklet with a ring of
    /// `channel_count * num_chunks * RENDER_QUANTUM` samples.
    pub fn create_recording(
        &self,
        channel_count: u16,
        num_chunks: usize,
        output_latency: Option<f64>,
    ) -> Arc<RecordingWorklet> {
        Arc::new(RecordingWorklet::new(
            channel_count,
            num_chunks,
            self.context.sample_rate,
            output_latency,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(frames: usize, value: f32) -> Vec<f32> {
        (0..frames).flat_map(|i| [value + i as f32, -(value + i as f32)]).collect()
    }

    #[test]
    fn test_frames_flow_to_planar_channels() {
        let worklet = RecordingWorklet::new(2, 4, 48_000, None);
        let mut input = worklet.take_input().unwrap();
        assert!(worklet.take_input().is_none());

        assert_eq!(input.write(&stereo(3, 1.0)), 3);
        assert_eq!(worklet.number_of_frames(), 3);
        assert_eq!(worklet.drain(), 3);

        let data = worklet.finalize().unwrap();
        assert_eq!(data.channels()[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(data.channels()[1], vec![-1.0, -2.0, -3.0]);
        assert!(worklet.finalize().is_none());
    }

    #[test]
    fn test_full_ring_drops_whole_frames() {
        // one chunk per channel: 128 frames of room
        let worklet = RecordingWorklet::new(2, 1, 48_000, None);
        let mut input = worklet.take_input().unwrap();

        assert_eq!(input.write(&stereo(100, 0.0)), 100);
        assert_eq!(input.write(&stereo(100, 0.0)), 28);
        assert_eq!(input.dropped_frames(), 72);
        assert_eq!(worklet.number_of_frames(), 128);

        worklet.drain();
        assert_eq!(input.write(&stereo(10, 0.0)), 10);
        assert_eq!(worklet.finalize().unwrap().number_of_frames(), 138);
    }

    #[test]
    fn test_limit_truncates_take() {
        let worklet = RecordingWorklet::new(1, 8, 48_000, None);
        let mut input = worklet.take_input().unwrap();
        input.write(&[0.5; 300]);

        worklet.limit(256);
        let data = worklet.finalize().unwrap();
        assert_eq!(data.number_of_frames(), 256);
    }

    #[test]
    fn test_output_latency_skips_leading_frames() {
        // 1ms at 48kHz
        let worklet = RecordingWorklet::new(1, 8, 48_000, Some(0.001));
        let mut input = worklet.take_input().unwrap();
        assert_eq!(input.write(&[0.0; 40]), 0);
        assert_eq!(input.write(&[1.0; 40]), 32);
        assert_eq!(worklet.number_of_frames(), 32);
    }

    #[test]
    fn test_terminate_discards() {
        let worklet = RecordingWorklet::new(1, 2, 44_100, None);
        let mut input = worklet.take_input().unwrap();
        input.write(&[0.1; 64]);
        worklet.terminate();
        assert!(worklet.is_terminated());
        assert_eq!(worklet.drain(), 0);
        assert!(worklet.finalize().is_none());
    }

    #[test]
    fn test_factory_uses_context_rate() {
        let worklets = AudioWorklets::new(AudioContext::new(44_100, Some(0.0)));
        let worklet = worklets.create_recording(2, 128, Some(0.0));
        assert_eq!(worklet.sample_rate(), 44_100);
        assert_eq!(worklet.channel_count(), 2);
        assert_ne!(worklet.uuid(), Uuid::nil());
    }
}
