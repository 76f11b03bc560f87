// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Grid quantization for recorded note events.

use serde::{Deserialize, Serialize};

use super::ppqn::{Ppqn, QUARTER};

/// Quantization settings applied to incoming notes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeSettings {
    /// Quantize grid in pulses (0 = no quantization)
    pub grid: Ppqn,
    /// Quantize strength (0.0 = none, 1.0 = full)
    pub strength: f64,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        Self {
            grid: 0,
            strength: 1.0,
        }
    }
}

impl QuantizeSettings {
    /// Quarter note grid
    pub fn quarter() -> Self {
        Self {
            grid: QUARTER,
            ..Default::default()
        }
    }

    /// Sixteenth note grid
    pub fn sixteenth() -> Self {
        Self {
            grid: QUARTER / 4,
            ..Default::default()
        }
    }

    /// Whether quantization does anything
    pub fn is_enabled(&self) -> bool {
        self.grid > 0 && self.strength > 0.0
    }

    /// Moves `pulse` toward the nearest grid line by `strength`.
    pub fn quantize(&self, pulse: Ppqn) -> Ppqn {
        if !self.is_enabled() {
            return pulse;
        }

        let quantized = (pulse + self.grid / 2) / self.grid * self.grid;

        if self.strength >= 1.0 {
            quantized
        } else {
            let diff = quantized as f64 - pulse as f64;
            (pulse as f64 + diff * self.strength).round().max(0.0) as Ppqn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let q = QuantizeSettings::default();
        assert!(!q.is_enabled());
        assert_eq!(q.quantize(1234), 1234);
    }

    #[test]
    fn test_full_strength() {
        let q = QuantizeSettings::quarter();
        assert_eq!(q.quantize(470), 0);
        assert_eq!(q.quantize(490), 960);
        assert_eq!(q.quantize(1900), 1920);
    }

    #[test]
    fn test_half_strength() {
        let q = QuantizeSettings {
            grid: QUARTER,
            strength: 0.5,
        };
        assert_eq!(q.quantize(1000), 980);
    }
}
