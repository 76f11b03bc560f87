// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording sessions across all armed captures.

use tracing::{info, warn};
use uuid::Uuid;

use super::Recorder;
use crate::capture::{CaptureDevices, RecordingContext};
use crate::error::CaptureResult;

/// Recorders of one transport recording pass
pub struct Recording {
    recorders: Vec<(Uuid, Recorder)>,
}

impl Recording {
    /// Prepare every armed capture, then start them all.
    ///
    /// Nothing starts unless every capture prepared successfully. Failures
    /// other than user cancellations are reported as warnings.
    pub async fn start(devices: &CaptureDevices, ctx: &RecordingContext) -> CaptureResult<Self> {
        let captures = devices.filter_armed();
        for capture in &captures {
            if let Err(e) = capture.prepare_recording(ctx).await {
                if !e.is_abort() {
                    warn!("Could not prepare capture {}: {}", capture.uuid(), e);
                    ctx.project().notifier().warn(&e.to_string());
                }
                return Err(e);
            }
        }

        let recorders: Vec<(Uuid, Recorder)> = captures
            .iter()
            .map(|capture| (capture.uuid(), capture.start_recording(ctx)))
            .collect();
        info!("Recording started with {} capture(s)", recorders.len());
        Ok(Self { recorders })
    }

    /// Audio units being recorded
    pub fn audio_units(&self) -> Vec<Uuid> {
        self.recorders.iter().map(|(unit, _)| *unit).collect()
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }

    /// Feed the current transport state to every recorder.
    pub fn tick(&self) {
        for (_, recorder) in &self.recorders {
            recorder.tick();
        }
    }

    /// Finalize every take before returning.
    pub fn stop(self) {
        for (_, recorder) in &self.recorders {
            recorder.stop();
        }
        info!("Recording stopped");
    }
}
