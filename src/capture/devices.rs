// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Capture registry.
//!
//! One capture per audio unit that has a capture box, kept in lockstep
//! with the project graph. Structural changes are applied synchronously
//! from the graph listener; capture box edits are queued and renegotiated
//! asynchronously by [`CaptureDevices::process_changes`] or
//! [`CaptureDevices::run`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Capture, CaptureEnv};
use crate::notifier::Subscription;
use crate::project::{AudioUnitBox, BoxKind, GraphUpdate};

struct Registry {
    env: CaptureEnv,
    captures: Mutex<HashMap<Uuid, Arc<Capture>>>,
    changes_tx: mpsc::UnboundedSender<Uuid>,
    changes_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Uuid>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Registry {
    fn on_updates(&self, updates: &[GraphUpdate]) {
        let mut structural = false;
        for update in updates {
            match *update {
                GraphUpdate::Changed { uuid, kind: BoxKind::CaptureAudio | BoxKind::CaptureMidi } => {
                    let _ = self.changes_tx.send(uuid);
                }
                GraphUpdate::Added { kind, .. } | GraphUpdate::Removed { kind, .. }
                    if matches!(kind, BoxKind::CaptureAudio | BoxKind::CaptureMidi) =>
                {
                    structural = true;
                }
                GraphUpdate::Added { kind: BoxKind::AudioUnit, .. }
                | GraphUpdate::Removed { kind: BoxKind::AudioUnit, .. }
                | GraphUpdate::Changed { kind: BoxKind::AudioUnit, .. } => structural = true,
                _ => {}
            }
        }
        if structural {
            self.reconcile();
        }
    }

    /// Create and terminate captures until the registry mirrors the graph.
    fn reconcile(&self) {
        let wanted: HashMap<Uuid, (Uuid, BoxKind)> = self.env.project.editing().read(|graph| {
            graph
                .all::<AudioUnitBox>()
                .filter_map(|unit| {
                    let capture_box = unit.capture?;
                    let kind = graph.get(capture_box)?.kind();
                    Some((unit.uuid, (capture_box, kind)))
                })
                .collect()
        });

        let mut removed = Vec::new();
        {
            let mut captures = self.captures.lock();
            captures.retain(|unit, capture| {
                let keep = wanted.get(unit).map(|(b, _)| *b) == Some(capture.capture_box());
                if !keep {
                    removed.push(Arc::clone(capture));
                }
                keep
            });
            for (unit, (capture_box, kind)) in &wanted {
                if !captures.contains_key(unit) {
                    let capture = Capture::create(self.env.clone(), *unit, *capture_box, *kind);
                    info!("Created {:?} capture for audio unit {}", capture.kind(), unit);
                    captures.insert(*unit, Arc::new(capture));
                }
            }
        }

        for capture in removed {
            info!("Removed capture for audio unit {}", capture.uuid());
            capture.terminate();
        }
    }

    fn find_by_box(&self, capture_box: Uuid) -> Option<Arc<Capture>> {
        self.captures
            .lock()
            .values()
            .find(|capture| capture.capture_box() == capture_box)
            .cloned()
    }
}

/// Registry of the project's captures
#[derive(Clone)]
pub struct CaptureDevices {
    registry: Arc<Registry>,
}

impl CaptureDevices {
    pub fn new(env: CaptureEnv) -> Self {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Registry {
            env,
            captures: Mutex::new(HashMap::new()),
            changes_tx,
            changes_rx: tokio::sync::Mutex::new(changes_rx),
            subscription: Mutex::new(None),
        });

        let weak: Weak<Registry> = Arc::downgrade(&registry);
        let subscription = registry
            .env
            .project
            .editing()
            .catchup_and_subscribe(move |updates| {
                if let Some(registry) = weak.upgrade() {
                    registry.on_updates(updates);
                }
            });
        *registry.subscription.lock() = Some(subscription);

        Self { registry }
    }

    pub fn env(&self) -> &CaptureEnv {
        &self.registry.env
    }

    /// Capture of an audio unit
    pub fn get(&self, audio_unit: Uuid) -> Option<Arc<Capture>> {
        self.registry.captures.lock().get(&audio_unit).cloned()
    }

    pub fn captures(&self) -> Vec<Arc<Capture>> {
        self.registry.captures.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.registry.captures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggle a capture's armed flag.
    ///
    /// With `exclusive` every other capture is disarmed first and the
    /// target ends up armed regardless of its previous state.
    pub async fn set_arm(&self, audio_unit: Uuid, exclusive: bool) {
        let Some(target) = self.get(audio_unit) else {
            debug!("No capture for audio unit {}", audio_unit);
            return;
        };
        if exclusive {
            for capture in self.captures() {
                if capture.uuid() != audio_unit && capture.is_armed() {
                    capture.set_armed(false).await;
                }
            }
            target.set_armed(true).await;
        } else {
            let armed = target.is_armed();
            target.set_armed(!armed).await;
        }
    }

    /// Captures that are armed and have something plugged into their input
    pub fn filter_armed(&self) -> Vec<Arc<Capture>> {
        let armed: Vec<Arc<Capture>> = self
            .captures()
            .into_iter()
            .filter(|capture| capture.is_armed())
            .collect();
        self.registry.env.project.editing().read(|graph| {
            armed
                .into_iter()
                .filter(|capture| graph.has_input(capture.uuid()))
                .collect()
        })
    }

    /// Renegotiate captures whose box changed. Returns the number handled.
    pub async fn process_changes(&self) -> usize {
        let pending: Vec<Uuid> = {
            let mut changes = self.registry.changes_rx.lock().await;
            std::iter::from_fn(|| changes.try_recv().ok()).collect()
        };
        let mut handled = 0;
        for capture_box in dedup(pending) {
            if let Some(capture) = self.registry.find_by_box(capture_box) {
                capture.refresh().await;
                handled += 1;
            }
        }
        handled
    }

    /// Keep renegotiating changed captures until the registry is dropped.
    pub async fn run(&self) {
        loop {
            let next = self.registry.changes_rx.lock().await.recv().await;
            let Some(capture_box) = next else {
                return;
            };
            if let Some(capture) = self.registry.find_by_box(capture_box) {
                capture.refresh().await;
            }
        }
    }

    /// Detach from the graph and release every capture.
    pub fn terminate(&self) {
        self.registry.subscription.lock().take();
        let captures: Vec<Arc<Capture>> = self.registry.captures.lock().drain().map(|(_, c)| c).collect();
        for capture in captures {
            capture.terminate();
        }
    }
}

fn dedup(mut uuids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    uuids.retain(|uuid| seen.insert(*uuid));
    uuids
}
