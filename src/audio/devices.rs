// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Platform seam for audio inputs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CaptureResult;

/// Receives interleaved input frames on the audio thread
pub type FrameSink = Box<dyn FnMut(&[f32]) + Send>;

/// Constraints for acquiring an input stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConstraints {
    /// Exact device to open (None = platform default)
    pub device_id: Option<String>,
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Bits per sample
    pub sample_size: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl StreamConstraints {
    /// Constraints for an unprocessed recording input
    pub fn raw(device_id: Option<String>, channel_count: u16, sample_rate: u32) -> Self {
        Self {
            device_id,
            channel_count,
            sample_rate,
            sample_size: 32,
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

/// Settings of the audio track a platform actually granted
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSettings {
    pub device_id: String,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub label: String,
}

/// An input device as enumerated by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInputInfo {
    pub id: String,
    pub label: String,
    pub max_channels: u16,
}

/// A live input stream
pub trait MediaStream: Send + Sync {
    /// Settings of the first audio track, None once the stream has no tracks
    fn settings(&self) -> Option<TrackSettings>;

    /// Route frames to `sink`, replacing any previous sink.
    fn connect(&self, sink: FrameSink);

    /// Stop routing frames.
    fn disconnect(&self);

    /// Stop all tracks. The stream is unusable afterwards.
    fn stop(&self);

    /// Whether the tracks are still delivering
    fn is_live(&self) -> bool;
}

/// Platform access to audio inputs
#[async_trait]
pub trait AudioDevices: Send + Sync {
    /// Acquire a stream satisfying `constraints`.
    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<Arc<dyn MediaStream>>;

    /// Enumerate input devices. May ask for permission first.
    async fn available_inputs(&self) -> CaptureResult<Vec<AudioInputInfo>>;
}
