// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Capture configuration.
//!
//! Loaded from YAML; every field has a default so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::samples::{SampleManager, WavSampleStorage};
use crate::timing::QuantizeSettings;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CaptureConfig {
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub midi: MidiConfig,
}

impl CaptureConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.recording.num_chunks == 0 {
            bail!("recording.num_chunks must be at least 1");
        }
        if self.recording.file_prefix.trim().is_empty() {
            bail!("recording.file_prefix must not be empty");
        }
        if !(1..=2).contains(&self.audio.default_channels) {
            bail!(
                "audio.default_channels must be 1 or 2 (got {})",
                self.audio.default_channels
            );
        }
        if !matches!(self.audio.sample_size, 16 | 24 | 32) {
            bail!("audio.sample_size must be 16, 24 or 32 (got {})", self.audio.sample_size);
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if !(0.0..=1.0).contains(&self.midi.quantize.strength) {
            bail!(
                "midi.quantize.strength must be within 0.0 - 1.0 (got {})",
                self.midi.quantize.strength
            );
        }
        Ok(())
    }
}

/// Recording settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Ring buffer size per channel, in render quanta
    #[serde(default = "default_num_chunks")]
    pub num_chunks: usize,
    /// Where finished takes are written (None = keep in memory)
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
    /// Prefix of recorded file names
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Undo steps kept by the editor
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
}

fn default_num_chunks() -> usize {
    128
}

fn default_file_prefix() -> String {
    "Recording".to_string()
}

fn default_undo_depth() -> usize {
    crate::project::editing::DEFAULT_UNDO_DEPTH
}

impl RecordingConfig {
    /// Sample manager persisting into `recordings_dir`, or in memory only.
    pub fn sample_manager(&self) -> Result<SampleManager> {
        match &self.recordings_dir {
            Some(dir) => {
                let storage = WavSampleStorage::new(dir)
                    .with_context(|| format!("Failed to open recordings directory: {:?}", dir))?;
                Ok(SampleManager::with_storage(Arc::new(storage)))
            }
            None => Ok(SampleManager::new()),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            num_chunks: default_num_chunks(),
            recordings_dir: None,
            file_prefix: default_file_prefix(),
            undo_depth: default_undo_depth(),
        }
    }
}

/// Audio input settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Channels requested when a capture asks for neither 1 nor 2
    #[serde(default = "default_channels")]
    pub default_channels: u16,
    /// Bits per sample requested from inputs
    #[serde(default = "default_sample_size")]
    pub sample_size: u16,
    /// Sample rate of the host's audio context
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_channels() -> u16 {
    1
}

fn default_sample_size() -> u16 {
    32
}

fn default_sample_rate() -> u32 {
    48_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_channels: default_channels(),
            sample_size: default_sample_size(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// MIDI recording settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MidiConfig {
    /// Quantization applied to recorded note starts
    #[serde(default)]
    pub quantize: QuantizeSettings,
}
