// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio input layer.
//!
//! This module provides:
//! - The [`AudioDevices`] platform seam for acquiring input streams
//! - Recording worklets that move frames from the audio thread to the
//!   control thread through a lock-free ring buffer
//! - cpal (native) and in-process virtual backends

pub mod devices;
#[cfg(feature = "native")]
pub mod cpal_backend;
pub mod virtual_devices;
pub mod worklet;

pub use devices::{AudioDevices, AudioInputInfo, FrameSink, MediaStream, StreamConstraints, TrackSettings};
pub use virtual_devices::VirtualAudioDevices;
pub use worklet::{AudioWorklets, RecordingWorklet, WorkletInput};

/// Frames processed per audio render call
pub const RENDER_QUANTUM: usize = 128;

/// Properties of the audio graph recordings run in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioContext {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Output latency in seconds, if the platform reports it
    pub output_latency: Option<f64>,
}

impl AudioContext {
    pub fn new(sample_rate: u32, output_latency: Option<f64>) -> Self {
        Self {
            sample_rate,
            output_latency,
        }
    }
}

/// Convert decibels to linear gain
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
