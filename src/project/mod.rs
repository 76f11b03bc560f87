// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project model: boxes, the graph that holds them and transactional editing.

pub mod boxes;
pub mod editing;
pub mod graph;

pub use boxes::{
    generate_hue, AudioFileBox, AudioRegionBox, AudioUnitBox, BoxKind, BoxType, CaptureAudioBox,
    CaptureMidiBox, InstrumentBox, NoteEventBox, NoteEventCollectionBox, NoteRegionBox, ProjectBox,
    TimelineBox, TrackBox, TrackType,
};
pub use editing::Editing;
pub use graph::{BoxGraph, GraphUpdate};

use std::sync::Arc;

use crate::engine::Engine;
use crate::runtime::RuntimeNotifier;

/// A project bound to its engine and user-facing notifier
pub struct Project {
    editing: Editing,
    engine: Arc<dyn Engine>,
    notifier: Arc<dyn RuntimeNotifier>,
}

impl Project {
    pub fn new(graph: BoxGraph, engine: Arc<dyn Engine>, notifier: Arc<dyn RuntimeNotifier>) -> Self {
        Self {
            editing: Editing::new(graph),
            engine,
            notifier,
        }
    }

    /// Keep at most `undo_depth` undo steps.
    pub fn with_undo_depth(
        graph: BoxGraph,
        undo_depth: usize,
        engine: Arc<dyn Engine>,
        notifier: Arc<dyn RuntimeNotifier>,
    ) -> Self {
        Self {
            editing: Editing::with_undo_depth(graph, undo_depth),
            engine,
            notifier,
        }
    }

    pub fn editing(&self) -> &Editing {
        &self.editing
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn notifier(&self) -> &Arc<dyn RuntimeNotifier> {
        &self.notifier
    }

    /// Current tempo and meter
    pub fn timeline(&self) -> TimelineBox {
        self.editing.read(|graph| *graph.timeline())
    }
}
