// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Shared MIDI access.
//!
//! [`MidiDevices`] owns the platform handle. Permission is requested at
//! most once at a time; every capture waits on the same request. Callers
//! observe availability through [`MidiDevices::subscribe_available`].

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::messages::{CHANNELS, NOTES};
use crate::error::{CaptureError, CaptureResult};

/// Callback receiving raw MIDI bytes on the backend's thread
pub type MidiCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// An input port as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInputInfo {
    pub id: String,
    pub name: String,
}

/// Keeps a platform input connection open until dropped.
pub struct MidiInputHandle {
    _connection: Box<dyn Send>,
}

impl MidiInputHandle {
    pub fn new<C: Send + 'static>(connection: C) -> Self {
        Self {
            _connection: Box::new(connection),
        }
    }
}

impl std::fmt::Debug for MidiInputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MidiInputHandle")
    }
}

/// Granted access to the platform's MIDI inputs
pub trait MidiAccess: Send + Sync {
    /// Currently connected input ports
    fn inputs(&self) -> Vec<MidiInputInfo>;

    /// Attach `callback` to the input with the given id.
    fn connect(&self, input_id: &str, callback: MidiCallback) -> CaptureResult<MidiInputHandle>;
}

/// Platform entry point
#[async_trait]
pub trait MidiPlatform: Send + Sync {
    /// Whether the platform has MIDI at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Ask the platform (and possibly the user) for MIDI access.
    async fn request_access(&self) -> CaptureResult<Arc<dyn MidiAccess>>;
}

/// Process-wide MIDI service shared by all MIDI captures
pub struct MidiDevices {
    platform: Arc<dyn MidiPlatform>,
    access: RwLock<Option<Arc<dyn MidiAccess>>>,
    requesting: tokio::sync::Mutex<()>,
    available: watch::Sender<bool>,
    callbacks: Mutex<Vec<Weak<dyn Fn(&[u8]) + Send + Sync>>>,
}

impl MidiDevices {
    pub fn new(platform: Arc<dyn MidiPlatform>) -> Self {
        let (available, _) = watch::channel(false);
        Self {
            platform,
            access: RwLock::new(None),
            requesting: tokio::sync::Mutex::new(()),
            available,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn can_request_access(&self) -> bool {
        self.platform.is_supported()
    }

    /// Request MIDI access unless already granted.
    ///
    /// Concurrent callers share one platform request.
    pub async fn request_permission(&self) -> CaptureResult<()> {
        if !self.platform.is_supported() {
            return Err(CaptureError::MidiUnsupported);
        }
        let _guard = self.requesting.lock().await;
        if self.access.read().is_some() {
            return Ok(());
        }

        match self.platform.request_access().await {
            Ok(access) => {
                info!("MIDI access granted ({} inputs)", access.inputs().len());
                *self.access.write() = Some(access);
                self.available.send_replace(true);
                Ok(())
            }
            Err(e) => {
                warn!("Could not request MIDI: {}", e);
                Err(e)
            }
        }
    }

    /// Granted access, if any
    pub fn get(&self) -> Option<Arc<dyn MidiAccess>> {
        self.access.read().clone()
    }

    /// Inputs of the granted access (empty without access)
    pub fn inputs(&self) -> Vec<MidiInputInfo> {
        self.get().map(|access| access.inputs()).unwrap_or_default()
    }

    /// Observe whether access has been granted
    pub fn subscribe_available(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }

    /// Attach a callback through the granted access.
    ///
    /// Callbacks connected this way also receive the note-offs sent by
    /// [`MidiDevices::panic`].
    pub fn connect(&self, input_id: &str, callback: MidiCallback) -> CaptureResult<MidiInputHandle> {
        let access = self.get().ok_or(CaptureError::MidiUnavailable)?;
        let handle = access.connect(input_id, Arc::clone(&callback))?;

        let mut callbacks = self.callbacks.lock();
        callbacks.retain(|cb| cb.strong_count() > 0);
        callbacks.push(Arc::downgrade(&callback));
        debug!("Connected MIDI input '{}'", input_id);
        Ok(handle)
    }

    /// Send note-off for every note on every channel to all live callbacks.
    pub fn panic(&self) {
        let callbacks: Vec<MidiCallback> = self
            .callbacks
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        info!("MIDI panic ({} listeners)", callbacks.len());
        for callback in callbacks {
            for channel in 0..CHANNELS {
                for note in 0..NOTES {
                    callback(&super::note_off(channel, note));
                }
            }
        }
    }
}
