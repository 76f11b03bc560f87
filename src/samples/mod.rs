// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sample registry.
//!
//! Every audio file in the project is backed by a sample. While a take is
//! being recorded the sample is its worklet; once finalized it becomes
//! plain [`SampleData`] and is written to storage.

pub mod storage;

pub use storage::{SampleStorage, WavSampleStorage};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::RecordingWorklet;
use crate::error::StorageError;

/// Planar audio with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleData {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn number_of_frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.number_of_frames() as f64 / self.sample_rate as f64
    }
}

/// State of a registered sample
#[derive(Clone)]
pub enum Sample {
    /// Still being recorded
    Recording(Arc<RecordingWorklet>),
    /// Finalized or loaded from storage
    Ready(Arc<SampleData>),
}

impl Sample {
    /// Frames available so far
    pub fn number_of_frames(&self) -> u64 {
        match self {
            Sample::Recording(worklet) => worklet.number_of_frames(),
            Sample::Ready(data) => data.number_of_frames() as u64,
        }
    }
}

/// Registry of samples keyed by audio file uuid
pub struct SampleManager {
    samples: RwLock<HashMap<Uuid, Sample>>,
    storage: Option<Arc<dyn SampleStorage>>,
}

impl SampleManager {
    /// In-memory registry without persistence
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(HashMap::new()),
            storage: None,
        }
    }

    pub fn with_storage(storage: Arc<dyn SampleStorage>) -> Self {
        Self {
            samples: RwLock::new(HashMap::new()),
            storage: Some(storage),
        }
    }

    /// Register a worklet as the source of the sample with its uuid.
    pub fn record(&self, worklet: Arc<RecordingWorklet>) {
        debug!("Recording sample {}", worklet.uuid());
        self.samples
            .write()
            .insert(worklet.uuid(), Sample::Recording(worklet));
    }

    /// Replace the recording with its finished take and persist it.
    pub fn complete(&self, uuid: Uuid, data: SampleData) -> Result<(), StorageError> {
        let data = Arc::new(data);
        self.samples.write().insert(uuid, Sample::Ready(Arc::clone(&data)));
        if let Some(storage) = &self.storage {
            storage.save(uuid, &data)?;
        }
        info!(
            "Sample {} complete ({} frames, {:.2}s)",
            uuid,
            data.number_of_frames(),
            data.duration_seconds()
        );
        Ok(())
    }

    /// Forget a sample. Nothing is persisted for it afterwards.
    pub fn remove(&self, uuid: Uuid) {
        if self.samples.write().remove(&uuid).is_some() {
            debug!("Removed sample {}", uuid);
        }
    }

    pub fn get(&self, uuid: Uuid) -> Option<Sample> {
        self.samples.read().get(&uuid).cloned()
    }

    /// Registered sample, or one loaded from storage.
    pub fn get_or_create(&self, uuid: Uuid) -> Result<Sample, StorageError> {
        if let Some(sample) = self.get(uuid) {
            return Ok(sample);
        }
        let storage = self.storage.as_ref().ok_or(StorageError::NotFound(uuid))?;
        let sample = Sample::Ready(Arc::new(storage.load(uuid)?));
        self.samples.write().insert(uuid, sample.clone());
        Ok(sample)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.samples.read().contains_key(&uuid)
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SampleManager {
    fn default() -> Self {
        Self::new()
    }
}
