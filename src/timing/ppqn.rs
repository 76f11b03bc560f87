// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pulse arithmetic and pulse/sample conversion.

/// Timeline position or duration in pulses
pub type Ppqn = u64;

/// Pulses per quarter note
pub const QUARTER: Ppqn = 960;

/// Pulses in one 4/4 bar
pub const BAR: Ppqn = QUARTER * 4;

/// Length of `nominator` notes of the given `denominator` value.
///
/// `from_signature(1, 4)` is one quarter note, `from_signature(3, 8)` three
/// eighth notes.
pub fn from_signature(nominator: u32, denominator: u32) -> Ppqn {
    assert!(denominator > 0, "signature denominator must be positive");
    BAR * nominator as Ppqn / denominator as Ppqn
}

/// Converts a sample frame count into (fractional) pulses.
pub fn samples_to_pulses(samples: u64, bpm: f64, sample_rate: u32) -> f64 {
    samples as f64 * bpm * QUARTER as f64 / (60.0 * sample_rate as f64)
}

/// Converts pulses into (fractional) sample frames.
pub fn pulses_to_samples(pulses: f64, bpm: f64, sample_rate: u32) -> f64 {
    pulses * 60.0 * sample_rate as f64 / (bpm * QUARTER as f64)
}

/// Converts seconds into (fractional) pulses.
pub fn seconds_to_pulses(seconds: f64, bpm: f64) -> f64 {
    seconds * bpm * QUARTER as f64 / 60.0
}

/// Converts pulses into seconds.
pub fn pulses_to_seconds(pulses: f64, bpm: f64) -> f64 {
    pulses * 60.0 / (bpm * QUARTER as f64)
}

/// Rounds `value` down to a multiple of `step`. A zero step leaves the value as is.
pub fn quantize_floor(value: Ppqn, step: Ppqn) -> Ppqn {
    if step == 0 {
        return value;
    }
    value / step * step
}

/// Rounds `value` up to a multiple of `step`.
pub fn quantize_ceil(value: Ppqn, step: Ppqn) -> Ppqn {
    if step == 0 {
        return value;
    }
    value.div_ceil(step) * step
}
