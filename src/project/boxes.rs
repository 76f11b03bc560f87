// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project boxes.
//!
//! A box is one node of the project graph. Boxes reference each other by
//! uuid; the graph resolves the references.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timing::Ppqn;

/// Kind of content a track holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    Audio,
    Notes,
}

/// Base hue of each track type, in degrees
fn base_hue(kind: TrackType) -> f32 {
    match kind {
        TrackType::Audio => 200.0,
        TrackType::Notes => 30.0,
    }
}

/// A hue near the track type's base hue, for newly created regions.
pub fn generate_hue(kind: TrackType) -> f32 {
    let jitter: f32 = rand::thread_rng().gen_range(-15.0..15.0);
    (base_hue(kind) + jitter).rem_euclid(360.0)
}

/// Channel strip owning tracks and, optionally, a capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioUnitBox {
    pub uuid: Uuid,
    pub label: String,
    /// CaptureAudioBox or CaptureMidiBox
    pub capture: Option<Uuid>,
    pub index: u32,
}

/// Audio capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureAudioBox {
    pub uuid: Uuid,
    /// Empty for the platform default device
    pub device_id: String,
    /// 1 or 2; anything else falls back to the default
    pub request_channels: u8,
    pub gain_db: f64,
}

/// MIDI capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMidiBox {
    pub uuid: Uuid,
    /// Empty to listen to all devices
    pub device_id: String,
    /// 0-15, or -1 for all channels
    pub channel: i8,
}

/// Instrument or effect chain feeding an audio unit's input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentBox {
    pub uuid: Uuid,
    /// Audio unit whose input this plugs into
    pub host: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackBox {
    pub uuid: Uuid,
    pub audio_unit: Uuid,
    pub kind: TrackType,
    pub index: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFileBox {
    /// Same uuid as the sample
    pub uuid: Uuid,
    pub file_name: String,
    pub end_in_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRegionBox {
    pub uuid: Uuid,
    pub track: Uuid,
    pub file: Uuid,
    pub position: Ppqn,
    pub duration: Ppqn,
    pub loop_duration: Ppqn,
    pub hue: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEventCollectionBox {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRegionBox {
    pub uuid: Uuid,
    pub track: Uuid,
    pub events: Uuid,
    pub position: Ppqn,
    pub duration: Ppqn,
    pub loop_duration: Ppqn,
    pub hue: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEventBox {
    pub uuid: Uuid,
    pub events: Uuid,
    /// Relative to the owning region
    pub position: Ppqn,
    pub duration: Ppqn,
    pub pitch: u8,
    /// 0.0 - 1.0
    pub velocity: f32,
}

/// Tempo and meter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineBox {
    pub bpm: f64,
    pub nominator: u32,
    pub denominator: u32,
}

impl Default for TimelineBox {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            nominator: 4,
            denominator: 4,
        }
    }
}

/// Discriminant of a [`ProjectBox`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxKind {
    AudioUnit,
    CaptureAudio,
    CaptureMidi,
    Instrument,
    Track,
    AudioFile,
    AudioRegion,
    NoteEventCollection,
    NoteRegion,
    NoteEvent,
}

/// Any box stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectBox {
    AudioUnit(AudioUnitBox),
    CaptureAudio(CaptureAudioBox),
    CaptureMidi(CaptureMidiBox),
    Instrument(InstrumentBox),
    Track(TrackBox),
    AudioFile(AudioFileBox),
    AudioRegion(AudioRegionBox),
    NoteEventCollection(NoteEventCollectionBox),
    NoteRegion(NoteRegionBox),
    NoteEvent(NoteEventBox),
}

/// Typed access into [`ProjectBox`]
pub trait BoxType: Sized {
    const KIND: BoxKind;
    fn from_box(b: &ProjectBox) -> Option<&Self>;
    fn from_box_mut(b: &mut ProjectBox) -> Option<&mut Self>;
    fn into_box(self) -> ProjectBox;
}

macro_rules! box_types {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        impl ProjectBox {
            pub fn uuid(&self) -> Uuid {
                match self {
                    $(ProjectBox::$variant(b) => b.uuid,)*
                }
            }

            pub fn kind(&self) -> BoxKind {
                match self {
                    $(ProjectBox::$variant(_) => BoxKind::$variant,)*
                }
            }
        }

        $(
            impl BoxType for $ty {
                const KIND: BoxKind = BoxKind::$variant;

                fn from_box(b: &ProjectBox) -> Option<&Self> {
                    match b {
                        ProjectBox::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_box_mut(b: &mut ProjectBox) -> Option<&mut Self> {
                    match b {
                        ProjectBox::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn into_box(self) -> ProjectBox {
                    ProjectBox::$variant(self)
                }
            }
        )*
    };
}

box_types! {
    AudioUnit => AudioUnitBox,
    CaptureAudio => CaptureAudioBox,
    CaptureMidi => CaptureMidiBox,
    Instrument => InstrumentBox,
    Track => TrackBox,
    AudioFile => AudioFileBox,
    AudioRegion => AudioRegionBox,
    NoteEventCollection => NoteEventCollectionBox,
    NoteRegion => NoteRegionBox,
    NoteEvent => NoteEventBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let uuid = Uuid::new_v4();
        let b = NoteEventCollectionBox { uuid }.into_box();
        assert_eq!(b.uuid(), uuid);
        assert_eq!(b.kind(), BoxKind::NoteEventCollection);
        assert!(NoteEventCollectionBox::from_box(&b).is_some());
        assert!(TrackBox::from_box(&b).is_none());
    }

    #[test]
    fn test_generated_hue_near_base() {
        for _ in 0..100 {
            let hue = generate_hue(TrackType::Audio);
            assert!((185.0..215.0).contains(&hue));
        }
        let hue = generate_hue(TrackType::Notes);
        assert!((0.0..360.0).contains(&hue));
    }
}
