// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transactional editing with undo/redo.
//!
//! Every mutation of the graph runs inside [`Editing::modify`]. The closure
//! gets exclusive access; readers block until it commits. Listeners hear
//! about the commit afterwards, outside the lock, so they may read the
//! graph or start new edits.
//!
//! Undo restores whole-graph snapshots taken before tracked edits.
//! Untracked edits (progress updates during a recording) leave no history.

use std::cell::Cell;

use parking_lot::Mutex;
use tracing::trace;

use super::graph::{BoxGraph, GraphUpdate};
use crate::notifier::{Notifier, Subscription};

/// Default number of undo steps kept
pub const DEFAULT_UNDO_DEPTH: usize = 100;

thread_local! {
    static IN_TRANSACTION: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a transaction until dropped.
struct TransactionGuard;

impl TransactionGuard {
    fn enter() -> Self {
        IN_TRANSACTION.with(|flag| {
            assert!(!flag.get(), "Editing transactions cannot be nested");
            flag.set(true);
        });
        TransactionGuard
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        IN_TRANSACTION.with(|flag| flag.set(false));
    }
}

struct UndoStack {
    undo: Vec<BoxGraph>,
    redo: Vec<BoxGraph>,
    max_depth: usize,
}

impl UndoStack {
    fn push(&mut self, snapshot: BoxGraph) {
        self.undo.push(snapshot);
        self.redo.clear();
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }
}

/// Owner of the project graph
pub struct Editing {
    graph: Mutex<BoxGraph>,
    history: Mutex<UndoStack>,
    listeners: Notifier<[GraphUpdate]>,
}

impl Editing {
    pub fn new(graph: BoxGraph) -> Self {
        Self::with_undo_depth(graph, DEFAULT_UNDO_DEPTH)
    }

    pub fn with_undo_depth(mut graph: BoxGraph, max_depth: usize) -> Self {
        graph.take_updates();
        Self {
            graph: Mutex::new(graph),
            history: Mutex::new(UndoStack {
                undo: Vec::new(),
                redo: Vec::new(),
                max_depth,
            }),
            listeners: Notifier::new(),
        }
    }

    /// Run `f` as one transaction.
    ///
    /// With `track_undo` the edit becomes one undo step (if it changed
    /// anything).
    ///
    /// # Panics
    /// When called from inside another transaction on the same thread.
    pub fn modify<R>(&self, f: impl FnOnce(&mut BoxGraph) -> R, track_undo: bool) -> R {
        let (result, updates) = {
            let _guard = TransactionGuard::enter();
            let mut graph = self.graph.lock();
            let before = track_undo.then(|| graph.snapshot());
            let result = f(&mut graph);
            let updates = graph.take_updates();
            if let Some(before) = before {
                if !updates.is_empty() {
                    self.history.lock().push(before);
                }
            }
            (result, updates)
        };

        if !updates.is_empty() {
            trace!("Committed {} graph updates", updates.len());
            self.listeners.notify(&updates);
        }
        result
    }

    /// Read the committed graph.
    ///
    /// # Panics
    /// When called from inside a transaction; use the transaction's graph.
    pub fn read<R>(&self, f: impl FnOnce(&BoxGraph) -> R) -> R {
        IN_TRANSACTION.with(|flag| {
            assert!(!flag.get(), "Cannot read the graph while a transaction is open")
        });
        let graph = self.graph.lock();
        f(&graph)
    }

    /// Listen to committed updates.
    pub fn subscribe(&self, listener: impl Fn(&[GraphUpdate]) + Send + Sync + 'static) -> Subscription {
        self.listeners.subscribe(listener)
    }

    /// Listen to committed updates, first receiving every existing box as added.
    pub fn catchup_and_subscribe(
        &self,
        listener: impl Fn(&[GraphUpdate]) + Send + Sync + 'static,
    ) -> Subscription {
        let existing: Vec<GraphUpdate> = self.read(|graph| {
            graph
                .boxes()
                .map(|b| GraphUpdate::Added {
                    uuid: b.uuid(),
                    kind: b.kind(),
                })
                .collect()
        });
        if !existing.is_empty() {
            listener(&existing);
        }
        self.listeners.subscribe(listener)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.lock().redo.is_empty()
    }

    /// Revert the last tracked edit. Returns false if there is nothing to undo.
    pub fn undo(&self) -> bool {
        self.step(|history| history.undo.pop(), |history, current| history.redo.push(current))
    }

    /// Reapply the last undone edit.
    pub fn redo(&self) -> bool {
        self.step(|history| history.redo.pop(), |history, current| history.undo.push(current))
    }

    fn step(
        &self,
        take: impl FnOnce(&mut UndoStack) -> Option<BoxGraph>,
        keep: impl FnOnce(&mut UndoStack, BoxGraph),
    ) -> bool {
        let updates = {
            let _guard = TransactionGuard::enter();
            let mut graph = self.graph.lock();
            let mut history = self.history.lock();
            let Some(target) = take(&mut history) else {
                return false;
            };
            let current = graph.snapshot();
            let updates = current.diff(&target);
            keep(&mut history, current);
            *graph = target;
            updates
        };

        if !updates.is_empty() {
            self.listeners.notify(&updates);
        }
        true
    }
}

impl Default for Editing {
    fn default() -> Self {
        Self::new(BoxGraph::new())
    }
}
