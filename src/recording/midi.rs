// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI recording.
//!
//! Note events arrive stamped with the playhead position and are written
//! as note event boxes into a region that starts on the beat where the
//! transport began recording. Held notes grow with the playhead and are
//! closed when the recording stops.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RecordTrack, RecordingEngine, REGION_LABEL};
use crate::midi::NoteEvent;
use crate::notifier::Subscription;
use crate::project::{
    generate_hue, BoxGraph, NoteEventBox, NoteEventCollectionBox, NoteRegionBox, Project, TrackType,
};
use crate::timing::ppqn::{from_signature, quantize_floor};
use crate::timing::{Ppqn, QuantizeSettings};

/// Inputs of a MIDI recording
pub struct RecordMidiContext {
    pub project: Arc<Project>,
    pub audio_unit: Uuid,
    /// Notes stamped with the playhead position on arrival
    pub events: Receiver<(Ppqn, NoteEvent)>,
    /// Keeps the capture publishing into `events`
    pub subscription: Subscription,
    pub quantize: QuantizeSettings,
}

/// Region and collection created for the take
#[derive(Debug, Clone, Copy)]
struct Take {
    region: Uuid,
    collection: Uuid,
    position: Ppqn,
}

/// Note event waiting for its note-off
#[derive(Debug, Clone, Copy)]
struct OpenNote {
    event: Uuid,
    /// Relative to the region
    start: Ppqn,
}

pub struct RecordMidi {
    project: Arc<Project>,
    audio_unit: Uuid,
    events: Receiver<(Ppqn, NoteEvent)>,
    subscription: Option<Subscription>,
    quantize: QuantizeSettings,
    take: Option<Take>,
    open: HashMap<(u8, u8), OpenNote>,
    position: Ppqn,
    finished: bool,
}

impl RecordMidi {
    pub fn start(ctx: RecordMidiContext) -> Self {
        info!("Recording MIDI into audio unit {}", ctx.audio_unit);
        Self {
            project: ctx.project,
            audio_unit: ctx.audio_unit,
            events: ctx.events,
            subscription: Some(ctx.subscription),
            quantize: ctx.quantize,
            take: None,
            open: HashMap::new(),
            position: 0,
            finished: false,
        }
    }

    /// Region of the take, once the transport recorded
    pub fn region(&self) -> Option<Uuid> {
        self.take.map(|take| take.region)
    }

    /// Notes still waiting for their note-off
    pub fn held_notes(&self) -> usize {
        self.open.len()
    }

    fn create_region(&self, position: Ppqn) -> Take {
        let denominator = self.project.timeline().denominator;
        let start = quantize_floor(position, from_signature(1, denominator));
        let audio_unit = self.audio_unit;

        let (region, collection) = self.project.editing().modify(
            |graph| {
                let track = RecordTrack::find_or_create(graph, audio_unit, TrackType::Notes);
                let collection = graph.insert(NoteEventCollectionBox { uuid: Uuid::new_v4() });
                let region = graph.insert(NoteRegionBox {
                    uuid: Uuid::new_v4(),
                    track,
                    events: collection,
                    position: start,
                    duration: 0,
                    loop_duration: 0,
                    hue: generate_hue(TrackType::Notes),
                    label: REGION_LABEL.to_string(),
                });
                (region, collection)
            },
            false,
        );
        debug!("Created note region {} at {}", region, start);
        Take {
            region,
            collection,
            position: start,
        }
    }

    /// Write pending events and grow open notes and the region.
    /// Returns false if the region is gone.
    fn apply(&mut self, take: Take, pending: Vec<(Ppqn, NoteEvent)>, close_all: bool, track_undo: bool) -> bool {
        let position = self.position;
        let quantize = self.quantize;
        let open = &mut self.open;

        self.project.editing().modify(
            |graph| {
                if !graph.contains(take.region) {
                    return false;
                }
                for (at, event) in pending {
                    match event {
                        NoteEvent::On { channel, pitch, velocity } => {
                            let start = quantize.quantize(at).saturating_sub(take.position);
                            if let Some(previous) = open.remove(&(channel, pitch)) {
                                close(graph, previous, start);
                            }
                            let event = graph.insert(NoteEventBox {
                                uuid: Uuid::new_v4(),
                                events: take.collection,
                                position: start,
                                duration: 0,
                                pitch,
                                velocity: velocity as f32 / 127.0,
                            });
                            open.insert((channel, pitch), OpenNote { event, start });
                        }
                        NoteEvent::Off { channel, pitch } => {
                            if let Some(note) = open.remove(&(channel, pitch)) {
                                close(graph, note, at.saturating_sub(take.position));
                            }
                        }
                    }
                }

                let now = position.saturating_sub(take.position);
                if close_all {
                    for (_, note) in open.drain() {
                        close(graph, note, now);
                    }
                } else {
                    for note in open.values() {
                        graph.update::<NoteEventBox, _>(note.event, |e| e.duration = now.saturating_sub(note.start));
                    }
                }

                let end = graph
                    .events_of(take.collection)
                    .iter()
                    .map(|e| e.position + e.duration)
                    .max()
                    .unwrap_or(0)
                    .max(now);
                graph.update::<NoteRegionBox, _>(take.region, |r| {
                    r.duration = end;
                    r.loop_duration = end;
                });
                true
            },
            track_undo,
        )
    }

    fn abort(&mut self) {
        warn!("Note region of audio unit {} was removed while recording", self.audio_unit);
        self.finished = true;
        self.open.clear();
        self.subscription.take();
        if let Some(take) = self.take.take() {
            let collection = take.collection;
            self.project.editing().modify(
                |graph| {
                    let events: Vec<Uuid> = graph.events_of(collection).iter().map(|e| e.uuid).collect();
                    for event in events {
                        graph.remove(event);
                    }
                    graph.remove(collection);
                },
                false,
            );
        }
    }
}

/// Give a note event its final length, at least one pulse.
fn close(graph: &mut BoxGraph, note: OpenNote, end: Ppqn) {
    graph.update::<NoteEventBox, _>(note.event, |e| e.duration = end.saturating_sub(note.start).max(1));
}

impl RecordingEngine for RecordMidi {
    fn tick(&mut self, position: Ppqn, recording: bool) {
        if self.finished {
            return;
        }
        let pending: Vec<(Ppqn, NoteEvent)> = self.events.try_iter().collect();
        if !recording {
            return;
        }
        self.position = position;

        let take = match self.take {
            Some(take) => take,
            None => {
                let take = self.create_region(position);
                self.take = Some(take);
                take
            }
        };
        if !self.apply(take, pending, false, false) {
            self.abort();
        }
    }

    fn stop(&mut self) {
        if self.finished {
            return;
        }
        self.subscription.take();
        let pending: Vec<(Ppqn, NoteEvent)> = self.events.try_iter().collect();

        let Some(take) = self.take else {
            self.finished = true;
            debug!("MIDI recording stopped before the transport recorded");
            return;
        };

        let has_notes = !pending.is_empty()
            || self
                .project
                .editing()
                .read(|graph| !graph.events_of(take.collection).is_empty());
        if !has_notes {
            debug!("MIDI recording captured no notes");
            self.finished = true;
            self.take = None;
            self.project.editing().modify(
                |graph| {
                    graph.remove(take.region);
                    graph.remove(take.collection);
                },
                false,
            );
            return;
        }

        if !self.apply(take, pending, true, true) {
            self.abort();
            return;
        }
        self.finished = true;
        info!("Finished MIDI recording into region {}", take.region);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
