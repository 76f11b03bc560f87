// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-process MIDI backend.
//!
//! Inputs are declared by the host and fed with [`VirtualMidiPlatform::send`].
//! Used for headless sessions and by the test suites.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::devices::{MidiAccess, MidiCallback, MidiInputHandle, MidiInputInfo, MidiPlatform};
use crate::error::{CaptureError, CaptureResult};

#[derive(Default)]
struct VirtualState {
    inputs: Vec<MidiInputInfo>,
    connections: Vec<(u64, String, MidiCallback)>,
    next_id: u64,
}

/// MIDI platform with host-controlled inputs
pub struct VirtualMidiPlatform {
    supported: bool,
    deny: AtomicBool,
    requests: AtomicUsize,
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualMidiPlatform {
    pub fn new() -> Self {
        Self {
            supported: true,
            deny: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            state: Arc::new(Mutex::new(VirtualState::default())),
        }
    }

    /// A platform without MIDI support
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn add_input(&self, id: &str, name: &str) {
        self.state.lock().inputs.push(MidiInputInfo {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Remove an input as if its cable was pulled. Its listeners go silent.
    pub fn unplug(&self, id: &str) {
        let mut state = self.state.lock();
        state.inputs.retain(|input| input.id != id);
        state.connections.retain(|(_, input, _)| input != id);
    }

    /// Make the next access requests fail
    pub fn deny_access(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Number of access requests made so far
    pub fn access_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of open connections across all inputs
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Deliver raw bytes from the given input to its listeners.
    pub fn send(&self, input_id: &str, bytes: &[u8]) {
        let callbacks: Vec<MidiCallback> = self
            .state
            .lock()
            .connections
            .iter()
            .filter(|(_, input, _)| input == input_id)
            .map(|(_, _, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(bytes);
        }
    }
}

impl Default for VirtualMidiPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MidiPlatform for VirtualMidiPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_access(&self) -> CaptureResult<Arc<dyn MidiAccess>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.deny.load(Ordering::SeqCst) {
            return Err(CaptureError::PermissionDenied("Could not request MIDI".into()));
        }
        Ok(Arc::new(VirtualAccess {
            state: Arc::clone(&self.state),
        }))
    }
}

struct VirtualAccess {
    state: Arc<Mutex<VirtualState>>,
}

impl MidiAccess for VirtualAccess {
    fn inputs(&self) -> Vec<MidiInputInfo> {
        self.state.lock().inputs.clone()
    }

    fn connect(&self, input_id: &str, callback: MidiCallback) -> CaptureResult<MidiInputHandle> {
        let mut state = self.state.lock();
        if !state.inputs.iter().any(|input| input.id == input_id) {
            return Err(CaptureError::DeviceNotFound(input_id.to_string()));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.connections.push((id, input_id.to_string(), callback));
        Ok(MidiInputHandle::new(VirtualConnection {
            id,
            state: Arc::downgrade(&self.state),
        }))
    }
}

struct VirtualConnection {
    id: u64,
    state: Weak<Mutex<VirtualState>>,
}

impl Drop for VirtualConnection {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().connections.retain(|(id, _, _)| *id != self.id);
        }
    }
}
