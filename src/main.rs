// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
#[cfg(feature = "native")]
use std::path::Path;

use anyhow::Result;
#[cfg(feature = "native")]
use recdeck::CaptureConfig;

const CONFIG_FILE: &str = "recdeck.yaml";

fn print_usage() {
    println!("RECDECK - Audio and MIDI capture");
    println!();
    println!("Usage: recdeck [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-audio-inputs          List available audio inputs");
    println!("  --list-midi-inputs           List available MIDI inputs");
    println!("  --monitor-midi [DEVICE_ID]   Arm a MIDI capture and print its notes");
    println!("  --help                       Show this help message");
    println!();
    println!("Settings are read from ./{} when present.", CONFIG_FILE);
}

#[cfg(feature = "native")]
fn load_config() -> Result<CaptureConfig> {
    if Path::new(CONFIG_FILE).exists() {
        CaptureConfig::load(CONFIG_FILE)
    } else {
        Ok(CaptureConfig::default())
    }
}

#[cfg(feature = "native")]
mod native {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use recdeck::audio::cpal_backend::CpalAudioDevices;
    use recdeck::engine::Transport;
    use recdeck::midi::midir_backend::MidirPlatform;
    use recdeck::midi::{MidiDevices, NoteEvent};
    use recdeck::project::{BoxGraph, Project};
    use recdeck::runtime::LogNotifier;
    use recdeck::{CaptureConfig, CaptureDevices, CaptureEnv};

    pub use recdeck::audio::cpal_backend::print_inputs as print_audio_inputs;
    pub use recdeck::midi::midir_backend::print_inputs as print_midi_inputs;

    pub async fn monitor_midi(config: CaptureConfig, device_id: Option<&str>) -> Result<()> {
        let transport = Arc::new(Transport::new(config.audio.sample_rate));
        let project = Arc::new(Project::with_undo_depth(
            BoxGraph::new(),
            config.recording.undo_depth,
            transport,
            Arc::new(LogNotifier::new()),
        ));
        let devices = CaptureDevices::new(CaptureEnv {
            project: Arc::clone(&project),
            audio_devices: Arc::new(CpalAudioDevices),
            midi_devices: Arc::new(MidiDevices::new(Arc::new(MidirPlatform))),
            config: Arc::new(config),
        });

        let unit = project.editing().modify(
            |graph| {
                let unit = graph.create_audio_unit("Monitor");
                graph.attach_midi_capture(unit, device_id.unwrap_or(""), -1);
                unit
            },
            false,
        );
        let capture = devices
            .get(unit)
            .ok_or_else(|| anyhow!("Capture was not created"))?;
        let midi = capture
            .as_midi()
            .ok_or_else(|| anyhow!("Capture is not a MIDI capture"))?;
        let _notes = midi.subscribe_notes(|event: &NoteEvent| println!("{:?}", event));

        devices.set_arm(unit, true).await;
        if !capture.is_armed() {
            return Err(anyhow!("Could not arm MIDI capture"));
        }
        println!("{} (press Ctrl+C to stop)...", capture.label());
        println!();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
        }

        devices.terminate();
        println!();
        println!("Monitor complete!");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("RECDECK - Audio and MIDI capture");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_usage();
        }
        #[cfg(feature = "native")]
        "--list-audio-inputs" => {
            native::print_audio_inputs();
        }
        #[cfg(feature = "native")]
        "--list-midi-inputs" => {
            native::print_midi_inputs();
        }
        #[cfg(feature = "native")]
        "--monitor-midi" => {
            let config = load_config()?;
            native::monitor_midi(config, args.get(2).map(String::as_str)).await?;
        }
        #[cfg(not(feature = "native"))]
        "--list-audio-inputs" | "--list-midi-inputs" | "--monitor-midi" => {
            eprintln!("Error: {} needs hardware access; rebuild with --features native", args[1]);
            std::process::exit(1);
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
