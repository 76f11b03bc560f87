// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir-backed MIDI platform (ALSA, CoreMIDI, WinMM).
//!
//! Port names double as input ids since they are stable across sessions.

use std::sync::Arc;

use async_trait::async_trait;
use midir::{Ignore, MidiInput};
use tracing::{debug, info};

use super::devices::{MidiAccess, MidiCallback, MidiInputHandle, MidiInputInfo, MidiPlatform};
use crate::error::{CaptureError, CaptureResult};

const CLIENT_NAME: &str = "recdeck";

/// System MIDI through midir
#[derive(Debug, Default)]
pub struct MidirPlatform;

#[async_trait]
impl MidiPlatform for MidirPlatform {
    async fn request_access(&self) -> CaptureResult<Arc<dyn MidiAccess>> {
        // Probe once so a missing MIDI subsystem surfaces as a permission failure
        MidiInput::new(CLIENT_NAME)
            .map_err(|e| CaptureError::PermissionDenied(format!("Could not request MIDI: {}", e)))?;
        info!("midir MIDI access ready");
        Ok(Arc::new(MidirAccess))
    }
}

struct MidirAccess;

impl MidiAccess for MidirAccess {
    fn inputs(&self) -> Vec<MidiInputInfo> {
        let Ok(midi_in) = MidiInput::new(CLIENT_NAME) else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .map(|name| MidiInputInfo {
                id: name.clone(),
                name,
            })
            .collect()
    }

    fn connect(&self, input_id: &str, callback: MidiCallback) -> CaptureResult<MidiInputHandle> {
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| CaptureError::Platform(e.to_string()))?;
        midi_in.ignore(Ignore::All);

        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| name == input_id)
                    .unwrap_or(false)
            })
            .ok_or_else(|| CaptureError::DeviceNotFound(input_id.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "recdeck-capture",
                move |_timestamp, message, _| callback(message),
                (),
            )
            .map_err(|e| CaptureError::Platform(e.to_string()))?;

        debug!("midir connected to '{}'", input_id);
        Ok(MidiInputHandle::new(connection))
    }
}

/// Print available MIDI inputs to stdout
pub fn print_inputs() {
    let inputs = MidirAccess.inputs();
    if inputs.is_empty() {
        println!("No MIDI inputs found.");
        return;
    }
    println!("MIDI inputs:");
    for (i, input) in inputs.iter().enumerate() {
        println!("  {}: {}", i, input.name);
    }
}
