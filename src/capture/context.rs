// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::sync::Arc;

use crate::audio::{AudioContext, AudioWorklets};
use crate::project::Project;
use crate::samples::SampleManager;

/// Everything a recording session needs
#[derive(Clone)]
pub struct RecordingContext {
    project: Arc<Project>,
    worklets: AudioWorklets,
    audio_context: AudioContext,
    sample_manager: Arc<SampleManager>,
}

impl RecordingContext {
    pub fn new(project: Arc<Project>, audio_context: AudioContext, sample_manager: Arc<SampleManager>) -> Self {
        Self {
            project,
            worklets: AudioWorklets::new(audio_context),
            audio_context,
            sample_manager,
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn worklets(&self) -> &AudioWorklets {
        &self.worklets
    }

    pub fn audio_context(&self) -> AudioContext {
        self.audio_context
    }

    pub fn sample_manager(&self) -> &Arc<SampleManager> {
        &self.sample_manager
    }
}
