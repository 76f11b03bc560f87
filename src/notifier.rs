// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Synchronous event fan-out with drop-to-unsubscribe handles.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Delivers values to every subscribed listener on the calling thread.
///
/// Listeners run without the registry lock held, so a listener may
/// subscribe or unsubscribe while being notified.
pub struct Notifier<T: ?Sized> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T: ?Sized + 'static> Notifier<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or terminated.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let registry = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Deliver `value` to all current listeners.
    pub fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(value);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle that runs its cleanup exactly once, on `terminate` or drop.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to clean up
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Run the cleanup now.
    pub fn terminate(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_reaches_subscribers() {
        let notifier: Notifier<u32> = Notifier::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let _sub = notifier.subscribe(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        notifier.notify(&3);
        notifier.notify(&4);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let notifier: Notifier<u32> = Notifier::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let sub = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifier.len(), 1);

        drop(sub);
        notifier.notify(&1);
        assert!(notifier.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsized_payload() {
        let notifier: Notifier<[u8]> = Notifier::new();
        let total = Arc::new(AtomicUsize::new(0));
        let sink = total.clone();
        let _sub = notifier.subscribe(move |bytes: &[u8]| {
            sink.fetch_add(bytes.len(), Ordering::SeqCst);
        });
        notifier.notify(&[1, 2, 3][..]);
        assert_eq!(total.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_terminate_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.terminate();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
