// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tick driver.
//!
//! A recorder owns one recording engine and feeds it the engine's
//! position and recording flag. Inside a tokio runtime a task follows the
//! transport's watch channels; every tick, automatic or manual, goes
//! through the same lock so graph edits never interleave.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::RecordingEngine;
use crate::engine::Engine;
use crate::timing::Ppqn;

type SharedEngine = Arc<Mutex<Box<dyn RecordingEngine>>>;

/// Running recording. Dropping it stops the recording.
pub struct Recorder {
    engine: SharedEngine,
    position: watch::Receiver<Ppqn>,
    recording: watch::Receiver<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Recorder {
    /// Start following `transport`. Outside a tokio runtime the recorder
    /// only advances through [`Recorder::tick`].
    pub fn spawn(engine: impl RecordingEngine + 'static, transport: Arc<dyn Engine>) -> Self {
        let engine: SharedEngine = Arc::new(Mutex::new(Box::new(engine)));
        let position = transport.position();
        let recording = transport.is_recording();

        let task = Handle::try_current().ok().map(|handle| {
            let engine = Arc::clone(&engine);
            let mut position = position.clone();
            let mut recording = recording.clone();
            handle.spawn(async move {
                loop {
                    tokio::select! {
                        changed = position.changed() => if changed.is_err() { break },
                        changed = recording.changed() => if changed.is_err() { break },
                    }
                    let now = *position.borrow_and_update();
                    let rec = *recording.borrow_and_update();
                    let mut engine = engine.lock();
                    engine.tick(now, rec);
                    if engine.is_finished() {
                        break;
                    }
                }
                debug!("Recorder task ended");
            })
        });

        Self {
            engine,
            position,
            recording,
            task: Mutex::new(task),
        }
    }

    /// Feed the current transport state to the engine.
    pub fn tick(&self) {
        let now = *self.position.borrow();
        let rec = *self.recording.borrow();
        self.engine.lock().tick(now, rec);
    }

    /// Finalize or discard the take. Returns once the graph reflects it.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.engine.lock().stop();
    }

    pub fn is_finished(&self) -> bool {
        self.engine.lock().is_finished()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Transport;

    #[derive(Default)]
    struct Log {
        ticks: Vec<(Ppqn, bool)>,
        stops: usize,
    }

    struct Probe(Arc<Mutex<Log>>);

    impl RecordingEngine for Probe {
        fn tick(&mut self, position: Ppqn, recording: bool) {
            self.0.lock().ticks.push((position, recording));
        }

        fn stop(&mut self) {
            self.0.lock().stops += 1;
        }

        fn is_finished(&self) -> bool {
            self.0.lock().stops > 0
        }
    }

    #[test]
    fn test_manual_ticks_without_runtime() {
        let transport = Arc::new(Transport::new(48_000));
        let log = Arc::new(Mutex::new(Log::default()));
        let recorder = Recorder::spawn(Probe(log.clone()), transport.clone());

        transport.start_recording();
        transport.set_position(480);
        recorder.tick();
        assert_eq!(log.lock().ticks, vec![(480, true)]);

        drop(recorder);
        assert_eq!(log.lock().stops, 1);
    }

    #[tokio::test]
    async fn test_task_follows_transport() {
        let transport = Arc::new(Transport::new(48_000));
        let log = Arc::new(Mutex::new(Log::default()));
        let recorder = Recorder::spawn(Probe(log.clone()), transport.clone());

        transport.start_recording();
        transport.set_position(960);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(log.lock().ticks.last(), Some(&(960, true)));

        recorder.stop();
        assert_eq!(log.lock().stops, 1);
        transport.set_position(1920);
        tokio::task::yield_now().await;
        assert_ne!(log.lock().ticks.last(), Some(&(1920, true)));
    }
}
