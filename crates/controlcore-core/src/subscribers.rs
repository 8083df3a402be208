// ── Subscriber registry ──
//
// Callbacks live in an `ArcSwap<Vec<..>>`. Registration and removal
// publish a new vector; dispatch loads one snapshot and walks it, so a
// callback that (un)subscribes mid-dispatch affects the next message only.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::model::Reading;

pub(crate) type Callback = Arc<dyn Fn(&Reading) + Send + Sync>;

/// Opaque handle identifying one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<(SubscriptionId, Callback)>>,
}

impl SubscriberRegistry {
    pub(crate) fn register(&self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push((id, Arc::clone(&callback)));
            next
        });
        id
    }

    /// Returns `true` if `id` was registered.
    pub(crate) fn deregister(&self, id: SubscriptionId) -> bool {
        let previous = self.entries.rcu(|current| {
            current
                .iter()
                .filter(|(entry, _)| *entry != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Invoke every callback in registration order. Returns how many ran to
    /// completion; a panicking callback is logged and skipped.
    pub(crate) fn dispatch(&self, reading: &Reading) -> usize {
        let snapshot = self.entries.load_full();
        let mut completed = 0;

        for (id, callback) in snapshot.iter() {
            match catch_unwind(AssertUnwindSafe(|| callback(reading))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".into());
                    tracing::warn!(
                        subscription = id.0,
                        sensor_id = %reading.sensor_id,
                        panic = %message,
                        "Subscriber panicked"
                    );
                }
            }
        }

        completed
    }
}

/// Registration returned by [`Client::subscribe`](crate::Client::subscribe).
///
/// Dropping it does **not** unsubscribe; call [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: &Arc<SubscriberRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove exactly this callback. Returns `false` if it was already
    /// removed or the client is gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.deregister(self.id))
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fixtures::reading;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Callback {
        let log = Arc::clone(log);
        Arc::new(move |r: &Reading| log.lock().unwrap().push(format!("{tag}:{}", r.sensor_id)))
    }

    #[test]
    fn dispatch_runs_in_registration_order() {
        let registry = SubscriberRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(recorder(&log, "first"));
        registry.register(recorder(&log, "second"));

        assert_eq!(registry.dispatch(&reading("x", "S1", "C1", "temp")), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:x", "second:x"]);
    }

    #[test]
    fn unsubscribing_first_keeps_second() {
        let registry = Arc::new(SubscriberRegistry::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Subscription::new(registry.register(recorder(&log, "first")), &registry);
        let _second = Subscription::new(registry.register(recorder(&log, "second")), &registry);

        assert!(first.clone().unsubscribe());
        assert!(!first.unsubscribe());

        registry.dispatch(&reading("a", "S1", "C1", "temp"));
        registry.dispatch(&reading("b", "S1", "C1", "temp"));
        assert_eq!(*log.lock().unwrap(), vec!["second:a", "second:b"]);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_others() {
        let registry = SubscriberRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(Arc::new(|_: &Reading| panic!("boom")));
        registry.register(recorder(&log, "after"));

        assert_eq!(registry.dispatch(&reading("x", "S1", "C1", "temp")), 1);
        assert_eq!(*log.lock().unwrap(), vec!["after:x"]);
    }

    #[test]
    fn unsubscribe_after_registry_dropped_is_false() {
        let registry = Arc::new(SubscriberRegistry::default());
        let sub = Subscription::new(registry.register(Arc::new(|_: &Reading| {})), &registry);
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}
