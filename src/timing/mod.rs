// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Musical time.
//!
//! Positions and durations on the timeline are measured in pulses (PPQN),
//! with 960 pulses per quarter note. Recorders convert between pulses and
//! sample frames using the current tempo and the audio sample rate.

pub mod ppqn;
pub mod quantize;

pub use ppqn::{Ppqn, BAR, QUARTER};
pub use quantize::QuantizeSettings;
