// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Durable sample storage.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use super::SampleData;
use crate::error::StorageError;

/// Persists finished samples
pub trait SampleStorage: Send + Sync {
    fn save(&self, uuid: Uuid, data: &SampleData) -> Result<(), StorageError>;
    fn load(&self, uuid: Uuid) -> Result<SampleData, StorageError>;
    fn remove(&self, uuid: Uuid) -> Result<(), StorageError>;
    fn contains(&self, uuid: Uuid) -> bool;
}

/// One 32-bit float WAV file per sample, named by uuid
#[derive(Debug, Clone)]
pub struct WavSampleStorage {
    dir: PathBuf,
}

impl WavSampleStorage {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, uuid: Uuid) -> PathBuf {
        self.dir.join(format!("{}.wav", uuid))
    }
}

impl SampleStorage for WavSampleStorage {
    fn save(&self, uuid: Uuid, data: &SampleData) -> Result<(), StorageError> {
        if data.channel_count() == 0 {
            return Err(StorageError::Invalid("sample has no channels".into()));
        }
        let spec = hound::WavSpec {
            channels: data.channel_count() as u16,
            sample_rate: data.sample_rate(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let path = self.path_of(uuid);
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for frame in 0..data.number_of_frames() {
            for channel in data.channels() {
                writer.write_sample(channel[frame])?;
            }
        }
        writer.finalize()?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn load(&self, uuid: Uuid) -> Result<SampleData, StorageError> {
        let path = self.path_of(uuid);
        if !path.exists() {
            return Err(StorageError::NotFound(uuid));
        }
        let mut reader = hound::WavReader::open(&path)?;
        let spec = reader.spec();
        let channel_count = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<_, _>>()?
            }
        };

        let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
        for (i, sample) in interleaved.into_iter().enumerate() {
            channels[i % channel_count].push(sample);
        }
        Ok(SampleData::new(spec.sample_rate, channels))
    }

    fn remove(&self, uuid: Uuid) -> Result<(), StorageError> {
        let path = self.path_of(uuid);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn contains(&self, uuid: Uuid) -> bool {
        self.path_of(uuid).exists()
    }
}
