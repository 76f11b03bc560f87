// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio input via cpal (ALSA, Core Audio, WASAPI).
//!
//! cpal streams cannot leave the thread that built them, so every input
//! stream gets its own thread that keeps the stream alive until stopped.
//! Device names serve as device ids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::devices::{AudioDevices, AudioInputInfo, FrameSink, MediaStream, StreamConstraints, TrackSettings};
use crate::error::{CaptureError, CaptureResult};

type SharedSink = Arc<Mutex<Option<FrameSink>>>;

/// System audio inputs through cpal
#[derive(Debug, Default)]
pub struct CpalAudioDevices;

#[async_trait]
impl AudioDevices for CpalAudioDevices {
    async fn request_stream(&self, constraints: &StreamConstraints) -> CaptureResult<Arc<dyn MediaStream>> {
        let constraints = constraints.clone();
        let sink: SharedSink = Arc::new(Mutex::new(None));
        let live = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_sink = Arc::clone(&sink);
        let thread_live = Arc::clone(&live);
        std::thread::Builder::new()
            .name("recdeck-input".into())
            .spawn(move || match open_input(&constraints, thread_sink, Arc::clone(&thread_live)) {
                Ok((stream, settings)) => {
                    let _ = ready_tx.send(Ok(settings));
                    let _ = stop_rx.recv();
                    drop(stream);
                    thread_live.store(false, Ordering::SeqCst);
                    debug!("Input stream thread finished");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| CaptureError::Platform(e.to_string()))?;

        let settings = ready_rx
            .await
            .map_err(|_| CaptureError::Platform("input stream thread exited".into()))??;
        info!(
            "Opened input '{}' ({} ch @ {} Hz)",
            settings.device_id, settings.channel_count, settings.sample_rate
        );

        Ok(Arc::new(CpalStream {
            settings,
            sink,
            live,
            stop: stop_tx,
        }))
    }

    async fn available_inputs(&self) -> CaptureResult<Vec<AudioInputInfo>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

        Ok(devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                Some(AudioInputInfo {
                    id: name.clone(),
                    label: name,
                    max_channels: max_input_channels(&device),
                })
            })
            .collect())
    }
}

fn find_device(device_id: Option<&str>) -> CaptureResult<Device> {
    let host = cpal::default_host();
    match device_id {
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotFound("default".into())),
        Some(id) => host
            .input_devices()
            .map_err(|e| CaptureError::Platform(e.to_string()))?
            .find(|device| device.name().map(|name| name == id).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(id.to_string())),
    }
}

fn max_input_channels(device: &Device) -> u16 {
    device
        .supported_input_configs()
        .ok()
        .and_then(|configs| configs.map(|c| c.channels()).max())
        .unwrap_or(1)
}

fn open_input(
    constraints: &StreamConstraints,
    sink: SharedSink,
    live: Arc<AtomicBool>,
) -> CaptureResult<(Stream, TrackSettings)> {
    let device = find_device(constraints.device_id.as_deref())?;
    let name = device.name().unwrap_or_else(|_| "Default".into());
    let channels = constraints
        .channel_count
        .clamp(1, max_input_channels(&device).max(1));

    let config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(constraints.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Never block the audio thread on a sink swap
                if let Some(mut guard) = sink.try_lock() {
                    if let Some(sink) = guard.as_mut() {
                        sink(data);
                    }
                }
            },
            move |err| {
                error!("Input stream error: {}", err);
                live.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| CaptureError::Platform(format!("Failed to build input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| CaptureError::Platform(format!("Failed to start input stream: {}", e)))?;

    Ok((
        stream,
        TrackSettings {
            device_id: name.clone(),
            channel_count: channels,
            sample_rate: constraints.sample_rate,
            label: name,
        },
    ))
}

struct CpalStream {
    settings: TrackSettings,
    sink: SharedSink,
    live: Arc<AtomicBool>,
    stop: crossbeam_channel::Sender<()>,
}

impl MediaStream for CpalStream {
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
        let _ = self.stop.try_send(());
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.stop.try_send(());
    }
}

/// Print available audio inputs to stdout
pub fn print_inputs() {
    let host = cpal::default_host();
    let devices: Vec<Device> = match host.input_devices() {
        Ok(devices) => devices.collect(),
        Err(e) => {
            println!("Could not enumerate audio inputs: {}", e);
            return;
        }
    };
    if devices.is_empty() {
        println!("No audio inputs found.");
        return;
    }
    println!("Audio inputs:");
    for (i, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());
        println!("  {}: {} (up to {} ch)", i, name, max_input_channels(device));
    }
}
