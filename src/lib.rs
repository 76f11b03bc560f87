// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Input capture and recording for a project-graph based DAW.
//!
//! Captures arm audio and MIDI inputs for audio units, recorders turn what
//! they deliver into regions, note events and samples while the transport
//! runs.

pub mod audio;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod midi;
pub mod notifier;
pub mod project;
pub mod recording;
pub mod runtime;
pub mod samples;
pub mod timing;

pub use capture::{Capture, CaptureDevices, CaptureEnv, RecordingContext};
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult, StorageError};
pub use recording::{Recorder, Recording};
