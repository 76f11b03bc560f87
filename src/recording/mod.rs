// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording engines.
//!
//! This module provides:
//! - Audio recording into growing audio regions
//! - MIDI recording into note regions
//! - A tick driver that follows the engine's transport
//! - Session orchestration across all armed captures

pub mod audio;
pub mod driver;
pub mod midi;
pub mod session;
pub mod track;

pub use audio::{RecordAudio, RecordAudioContext};
pub use driver::Recorder;
pub use midi::{RecordMidi, RecordMidiContext};
pub use session::Recording;
pub use track::RecordTrack;

use crate::timing::Ppqn;

/// Label of regions created by recording
pub const REGION_LABEL: &str = "Recording";

/// A recording fed with transport ticks
pub trait RecordingEngine: Send {
    /// Follow the transport to `position`. `recording` mirrors the
    /// engine's recording flag.
    fn tick(&mut self, position: Ppqn, recording: bool);

    /// Finalize or discard the take. Calling it again does nothing.
    fn stop(&mut self);

    fn is_finished(&self) -> bool;
}
