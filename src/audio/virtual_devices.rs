// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-process audio inputs.
//!
//! Devices are declared by the host and fed with
//! [`VirtualAudioDevices::push`]. Requests can be held at a gate to model
//! slow permission prompts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::devices::{AudioDevices, AudioInputInfo, FrameSink, MediaStream, StreamConstraints, TrackSettings};
use crate::error::{CaptureError, CaptureResult};

/// Audio platform with host-controlled devices
pub struct VirtualAudioDevices {
    devices: Mutex<Vec<AudioInputInfo>>,
    streams: Mutex<Vec<Weak<VirtualStream>>>,
    fallback: Mutex<Option<String>>,
    deny: AtomicBool,
    requests: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl VirtualAudioDevices {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            devices: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
            fallback: Mutex::new(None),
            deny: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            gate,
        }
    }

    /// Declare a device. The first device is the default.
    pub fn add_device(&self, id: &str, label: &str, max_channels: u16) {
        self.devices.lock().push(AudioInputInfo {
            id: id.to_string(),
            label: label.to_string(),
            max_channels,
        });
    }

    /// Remove a device. Its streams stop delivering.
    pub fn unplug(&self, id: &str) {
        self.devices.lock().retain(|device| device.id != id);
        for stream in self.live_streams() {
            if stream.settings.device_id == id {
                stream.stop();
            }
        }
    }

    /// Grant `id` whenever an unknown device is requested, like a platform
    /// that silently substitutes another input.
    pub fn substitute_missing_with(&self, id: Option<&str>) {
        *self.fallback.lock() = id.map(str::to_string);
    }

    pub fn deny_permission(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Hold new and pending requests until [`VirtualAudioDevices::resume`]
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Number of stream requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of streams that have not been stopped
    pub fn active_streams(&self) -> usize {
        self.live_streams().len()
    }

    /// Deliver interleaved frames to every live stream of the device.
    pub fn push(&self, device_id: &str, interleaved: &[f32]) {
        for stream in self.live_streams() {
            if stream.settings.device_id == device_id {
                stream.deliver(interleaved);
            }
        }
    }

    fn live_streams(&self) -> Vec<Arc<VirtualStream>> {
        let mut streams = self.streams.lock();
        streams.retain(|stream| stream.strong_count() > 0);
        streams
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|stream| stream.is_live())
            .collect()
    }
}

impl Default for VirtualAudioDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDevices for VirtualAudioDevices {
    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<Arc<dyn MediaStream>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.deny.load(Ordering::SeqCst) {
            return Err(CaptureError::PermissionDenied("Permission denied".into()));
        }

        let device = {
            let devices = self.devices.lock();
            match &constraints.device_id {
                None => devices.first().cloned(),
                Some(id) => devices.iter().find(|d| &d.id == id).cloned().or_else(|| {
                    let fallback = self.fallback.lock().clone()?;
                    devices.iter().find(|d| d.id == fallback).cloned()
                }),
            }
        };
        let device = device.ok_or_else(|| {
            CaptureError::DeviceNotFound(constraints.device_id.clone().unwrap_or_default())
        })?;

        let stream = Arc::new(VirtualStream {
            settings: TrackSettings {
                device_id: device.id.clone(),
                channel_count: constraints.channel_count.clamp(1, device.max_channels.max(1)),
                sample_rate: constraints.sample_rate,
                label: device.label.clone(),
            },
            sink: Mutex::new(None),
            live: AtomicBool::new(true),
        });
        debug!(
            "Virtual stream opened on '{}' ({} channels)",
            device.id, stream.settings.channel_count
        );
        self.streams.lock().push(Arc::downgrade(&stream));
        Ok(stream)
    }

    async fn available_inputs(&self) -> CaptureResult<Vec<AudioInputInfo>> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(CaptureError::PermissionDenied("Permission denied".into()));
        }
        Ok(self.devices.lock().clone())
    }
}

struct VirtualStream {
    settings: TrackSettings,
    sink: Mutex<Option<FrameSink>>,
    live: AtomicBool,
}

impl VirtualStream {
    fn deliver(&self, interleaved: &[f32]) {
        if let Some(sink) = self.sink.lock().as_mut() {
            sink(interleaved);
        }
    }
}

impl MediaStream for VirtualStream {
    fn settings(&self) -> Option<TrackSettings> {
        self.is_live().then(|| self.settings.clone())
    }

    fn connect(&self, sink: FrameSink) {
        *self.sink.lock() = Some(sink);
    }

    fn disconnect(&self) {
        self.sink.lock().take();
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.disconnect();
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
