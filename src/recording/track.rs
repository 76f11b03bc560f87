// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use uuid::Uuid;

use crate::project::{BoxGraph, TrackBox, TrackType};

/// Track lookup for recordings
pub struct RecordTrack;

impl RecordTrack {
    /// First track of `kind` on the audio unit, created if there is none.
    pub fn find_or_create(graph: &mut BoxGraph, audio_unit: Uuid, kind: TrackType) -> Uuid {
        let tracks = graph.tracks_of(audio_unit);
        if let Some(track) = tracks.iter().find(|track| track.kind == kind) {
            return track.uuid;
        }
        let index = tracks.iter().map(|track| track.index + 1).max().unwrap_or(0);
        graph.insert(TrackBox {
            uuid: Uuid::new_v4(),
            audio_unit,
            kind,
            index,
            enabled: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_or_create() {
        let mut graph = BoxGraph::new();
        let unit = graph.create_audio_unit("Vox");

        let audio = RecordTrack::find_or_create(&mut graph, unit, TrackType::Audio);
        assert_eq!(RecordTrack::find_or_create(&mut graph, unit, TrackType::Audio), audio);

        let notes = RecordTrack::find_or_create(&mut graph, unit, TrackType::Notes);
        assert_ne!(notes, audio);
        let tracks = graph.tracks_of(unit);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].uuid, notes);
        assert_eq!(tracks[1].index, 1);
    }

    #[test]
    fn test_tracks_of_other_units_are_ignored() {
        let mut graph = BoxGraph::new();
        let a = graph.create_audio_unit("A");
        let b = graph.create_audio_unit("B");
        let track = RecordTrack::find_or_create(&mut graph, a, TrackType::Audio);
        assert_ne!(RecordTrack::find_or_create(&mut graph, b, TrackType::Audio), track);
    }
}
