// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The box graph.
//!
//! Mutations are recorded as [`GraphUpdate`]s and handed to listeners once
//! the surrounding edit commits.

use std::collections::HashMap;

use uuid::Uuid;

use super::boxes::*;
use crate::timing::Ppqn;

/// Structural change to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphUpdate {
    Added { uuid: Uuid, kind: BoxKind },
    Removed { uuid: Uuid, kind: BoxKind },
    Changed { uuid: Uuid, kind: BoxKind },
    TimelineChanged,
}

impl GraphUpdate {
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            GraphUpdate::Added { uuid, .. }
            | GraphUpdate::Removed { uuid, .. }
            | GraphUpdate::Changed { uuid, .. } => Some(*uuid),
            GraphUpdate::TimelineChanged => None,
        }
    }

    pub fn kind(&self) -> Option<BoxKind> {
        match self {
            GraphUpdate::Added { kind, .. }
            | GraphUpdate::Removed { kind, .. }
            | GraphUpdate::Changed { kind, .. } => Some(*kind),
            GraphUpdate::TimelineChanged => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoxGraph {
    boxes: HashMap<Uuid, ProjectBox>,
    timeline: TimelineBox,
    updates: Vec<GraphUpdate>,
}

impl BoxGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&ProjectBox> {
        self.boxes.get(&uuid)
    }

    pub fn get_as<T: BoxType>(&self, uuid: Uuid) -> Option<&T> {
        self.boxes.get(&uuid).and_then(T::from_box)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.boxes.contains_key(&uuid)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> impl Iterator<Item = &ProjectBox> {
        self.boxes.values()
    }

    /// All boxes of one type
    pub fn all<'a, T: BoxType + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.boxes.values().filter_map(T::from_box)
    }

    /// Insert or replace a box.
    pub fn insert(&mut self, b: impl BoxType) -> Uuid {
        let b = b.into_box();
        let uuid = b.uuid();
        let kind = b.kind();
        let update = if self.boxes.insert(uuid, b).is_some() {
            GraphUpdate::Changed { uuid, kind }
        } else {
            GraphUpdate::Added { uuid, kind }
        };
        self.updates.push(update);
        uuid
    }

    pub fn remove(&mut self, uuid: Uuid) -> Option<ProjectBox> {
        let removed = self.boxes.remove(&uuid)?;
        self.updates.push(GraphUpdate::Removed {
            uuid,
            kind: removed.kind(),
        });
        Some(removed)
    }

    /// Mutate a box in place. Returns None if no box of that type exists.
    pub fn update<T: BoxType, R>(&mut self, uuid: Uuid, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let inner = self.boxes.get_mut(&uuid).and_then(T::from_box_mut)?;
        let result = f(inner);
        self.updates.push(GraphUpdate::Changed {
            uuid,
            kind: T::KIND,
        });
        Some(result)
    }

    pub fn timeline(&self) -> &TimelineBox {
        &self.timeline
    }

    pub fn set_timeline(&mut self, timeline: TimelineBox) {
        self.timeline = timeline;
        self.updates.push(GraphUpdate::TimelineChanged);
    }

    /// Updates recorded since the last call
    pub fn take_updates(&mut self) -> Vec<GraphUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Updates that turn `self` into `other`
    pub fn diff(&self, other: &BoxGraph) -> Vec<GraphUpdate> {
        let mut updates = Vec::new();
        for (uuid, b) in &self.boxes {
            match other.boxes.get(uuid) {
                None => updates.push(GraphUpdate::Removed {
                    uuid: *uuid,
                    kind: b.kind(),
                }),
                Some(o) if o != b => updates.push(GraphUpdate::Changed {
                    uuid: *uuid,
                    kind: o.kind(),
                }),
                Some(_) => {}
            }
        }
        for (uuid, b) in &other.boxes {
            if !self.boxes.contains_key(uuid) {
                updates.push(GraphUpdate::Added {
                    uuid: *uuid,
                    kind: b.kind(),
                });
            }
        }
        if self.timeline != other.timeline {
            updates.push(GraphUpdate::TimelineChanged);
        }
        updates
    }

    /// Copy of the boxes without pending updates
    pub(crate) fn snapshot(&self) -> BoxGraph {
        BoxGraph {
            boxes: self.boxes.clone(),
            timeline: self.timeline,
            updates: Vec::new(),
        }
    }

    /// Whether something is plugged into the unit's input
    pub fn has_input(&self, audio_unit: Uuid) -> bool {
        self.all::<InstrumentBox>()
            .any(|instrument| instrument.host == audio_unit)
    }

    /// Tracks of an audio unit ordered by index
    pub fn tracks_of(&self, audio_unit: Uuid) -> Vec<&TrackBox> {
        let mut tracks: Vec<&TrackBox> = self
            .all::<TrackBox>()
            .filter(|track| track.audio_unit == audio_unit)
            .collect();
        tracks.sort_by_key(|track| track.index);
        tracks
    }

    /// Note events of a collection ordered by position
    pub fn events_of(&self, collection: Uuid) -> Vec<&NoteEventBox> {
        let mut events: Vec<&NoteEventBox> = self
            .all::<NoteEventBox>()
            .filter(|event| event.events == collection)
            .collect();
        events.sort_by_key(|event| (event.position, event.pitch));
        events
    }

    pub fn audio_regions_of(&self, track: Uuid) -> Vec<&AudioRegionBox> {
        let mut regions: Vec<&AudioRegionBox> = self
            .all::<AudioRegionBox>()
            .filter(|region| region.track == track)
            .collect();
        regions.sort_by_key(|region| region.position);
        regions
    }

    pub fn note_regions_of(&self, track: Uuid) -> Vec<&NoteRegionBox> {
        let mut regions: Vec<&NoteRegionBox> = self
            .all::<NoteRegionBox>()
            .filter(|region| region.track == track)
            .collect();
        regions.sort_by_key(|region| region.position);
        regions
    }

    // Convenience builders

    /// Add an audio unit without capture
    pub fn create_audio_unit(&mut self, label: &str) -> Uuid {
        let index = self.all::<AudioUnitBox>().count() as u32;
        self.insert(AudioUnitBox {
            uuid: Uuid::new_v4(),
            label: label.to_string(),
            capture: None,
            index,
        })
    }

    /// Give an audio unit an audio capture plus an input so it can record.
    pub fn attach_audio_capture(&mut self, audio_unit: Uuid, device_id: &str, channels: u8) -> Uuid {
        let capture = self.insert(CaptureAudioBox {
            uuid: Uuid::new_v4(),
            device_id: device_id.to_string(),
            request_channels: channels,
            gain_db: 0.0,
        });
        self.attach_capture(audio_unit, capture)
    }

    /// Give an audio unit a MIDI capture plus an instrument input.
    pub fn attach_midi_capture(&mut self, audio_unit: Uuid, device_id: &str, channel: i8) -> Uuid {
        let capture = self.insert(CaptureMidiBox {
            uuid: Uuid::new_v4(),
            device_id: device_id.to_string(),
            channel,
        });
        self.attach_capture(audio_unit, capture)
    }

    fn attach_capture(&mut self, audio_unit: Uuid, capture: Uuid) -> Uuid {
        self.update::<AudioUnitBox, _>(audio_unit, |unit| unit.capture = Some(capture));
        if !self.has_input(audio_unit) {
            self.insert(InstrumentBox {
                uuid: Uuid::new_v4(),
                host: audio_unit,
                name: "Input".to_string(),
            });
        }
        capture
    }

    /// Remove a unit together with its capture, inputs, tracks and regions.
    pub fn remove_audio_unit(&mut self, audio_unit: Uuid) {
        let Some(ProjectBox::AudioUnit(unit)) = self.remove(audio_unit) else {
            return;
        };
        if let Some(capture) = unit.capture {
            self.remove(capture);
        }
        let instruments: Vec<Uuid> = self
            .all::<InstrumentBox>()
            .filter(|i| i.host == audio_unit)
            .map(|i| i.uuid)
            .collect();
        let tracks: Vec<Uuid> = self.tracks_of(audio_unit).iter().map(|t| t.uuid).collect();
        for uuid in instruments {
            self.remove(uuid);
        }
        for track in tracks {
            let regions: Vec<Uuid> = self
                .audio_regions_of(track)
                .iter()
                .map(|r| r.uuid)
                .chain(self.note_regions_of(track).iter().map(|r| r.uuid))
                .collect();
            for region in regions {
                self.remove(region);
            }
            self.remove(track);
        }
    }

    /// End of the furthest region on a track
    pub fn track_end(&self, track: Uuid) -> Ppqn {
        let audio = self
            .audio_regions_of(track)
            .iter()
            .map(|r| r.position + r.duration)
            .max()
            .unwrap_or(0);
        let notes = self
            .note_regions_of(track)
            .iter()
            .map(|r| r.position + r.duration)
            .max()
            .unwrap_or(0);
        audio.max(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_update_remove_are_recorded() {
        let mut graph = BoxGraph::new();
        let unit = graph.create_audio_unit("Vox");
        graph.update::<AudioUnitBox, _>(unit, |u| u.label = "Lead".into());
        graph.remove(unit);

        let updates = graph.take_updates();
        assert_eq!(
            updates,
            vec![
                GraphUpdate::Added { uuid: unit, kind: BoxKind::AudioUnit },
                GraphUpdate::Changed { uuid: unit, kind: BoxKind::AudioUnit },
                GraphUpdate::Removed { uuid: unit, kind: BoxKind::AudioUnit },
            ]
        );
        assert!(graph.take_updates().is_empty());
    }

    #[test]
    fn test_update_wrong_type_is_none() {
        let mut graph = BoxGraph::new();
        let unit = graph.create_audio_unit("Vox");
        assert!(graph.update::<TrackBox, _>(unit, |_| ()).is_none());
        assert!(graph.update::<TrackBox, _>(Uuid::new_v4(), |_| ()).is_none());
    }

    #[test]
    fn test_all_yields_boxes_of_one_type() {
        let mut graph = BoxGraph::new();
        let a = graph.create_audio_unit("A");
        let b = graph.create_audio_unit("B");
        graph.attach_midi_capture(a, "", -1);

        let mut units: Vec<Uuid> = graph.all::<AudioUnitBox>().map(|u| u.uuid).collect();
        units.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(units, expected);
        assert_eq!(graph.all::<CaptureMidiBox>().count(), 1);
        assert_eq!(graph.all::<CaptureAudioBox>().count(), 0);
    }

    #[test]
    fn test_attach_capture_adds_input() {
        let mut graph = BoxGraph::new();
        let unit = graph.create_audio_unit("Vox");
        assert!(!graph.has_input(unit));

        let capture = graph.attach_audio_capture(unit, "mic-1", 2);
        assert!(graph.has_input(unit));
        assert_eq!(graph.get_as::<AudioUnitBox>(unit).unwrap().capture, Some(capture));
        assert_eq!(graph.get_as::<CaptureAudioBox>(capture).unwrap().request_channels, 2);
    }

    #[test]
    fn test_diff() {
        let mut a = BoxGraph::new();
        let unit = a.create_audio_unit("A");
        let mut b = a.snapshot();
        b.update::<AudioUnitBox, _>(unit, |u| u.label = "B".into());
        let added = b.create_audio_unit("C");

        let diff = a.diff(&b);
        assert_eq!(diff.len(), 2);
        assert!(diff.contains(&GraphUpdate::Changed { uuid: unit, kind: BoxKind::AudioUnit }));
        assert!(diff.contains(&GraphUpdate::Added { uuid: added, kind: BoxKind::AudioUnit }));
        assert!(a.diff(&a.snapshot()).is_empty());
    }

    #[test]
    fn test_remove_audio_unit_cascades() {
        let mut graph = BoxGraph::new();
        let unit = graph.create_audio_unit("Keys");
        graph.attach_midi_capture(unit, "", -1);
        graph.insert(TrackBox {
            uuid: Uuid::new_v4(),
            audio_unit: unit,
            kind: TrackType::Notes,
            index: 0,
            enabled: true,
        });
        graph.remove_audio_unit(unit);
        assert!(graph.is_empty());
    }
}
