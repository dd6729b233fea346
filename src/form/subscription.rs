//! SubscriptionHub: scoped value watchers with RAII handles
//!
//! Callbacks are owned by the hub. A [`Subscription`] handle only holds a
//! liveness flag: dropping it (or calling `unsubscribe`) marks the slot dead
//! and the hub discards it before the next delivery. Dropping the hub, i.e.
//! tearing the form down, releases every callback and deactivates every
//! outstanding handle.

use super::path::FieldPath;
use super::value::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static NULL: Value = Value::Null;

/// What a subscriber wants to hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchFilter {
    All,
    Path(FieldPath),
}

impl WatchFilter {
    fn matches(&self, changed: &[FieldPath]) -> bool {
        match self {
            WatchFilter::All => true,
            WatchFilter::Path(path) => changed.iter().any(|c| c.overlaps(path)),
        }
    }
}

/// Delivered to a subscriber once per mutation
#[derive(Debug)]
pub struct WatchEvent<'a> {
    /// Every path the mutation wrote
    pub changed: &'a [FieldPath],
    /// The whole tree for `All`, the watched subtree for `Path`
    pub value: &'a Value,
}

type Callback = Box<dyn FnMut(&WatchEvent<'_>) + Send>;

struct Slot {
    filter: WatchFilter,
    callback: Callback,
    alive: Arc<AtomicBool>,
}

/// Handle keeping a watcher registered; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    alive: Arc<AtomicBool>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// False once unsubscribed or once the form is gone
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub struct SubscriptionHub {
    slots: Vec<Slot>,
}

impl std::fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("subscribers", &self.slots.len())
            .finish()
    }
}

impl SubscriptionHub {
    pub fn subscribe<F>(&mut self, filter: WatchFilter, callback: F) -> Subscription
    where
        F: FnMut(&WatchEvent<'_>) + Send + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        self.slots.push(Slot {
            filter,
            callback: Box::new(callback),
            alive: alive.clone(),
        });
        Subscription { alive }
    }

    /// Deliver one mutation to every interested subscriber.
    ///
    /// Each subscriber is called at most once, however many of the
    /// `changed` paths it watches. Returns the number of deliveries.
    pub fn notify(&mut self, changed: &[FieldPath], values: &Value) -> usize {
        self.slots.retain(|slot| slot.alive.load(Ordering::Acquire));
        if changed.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for slot in &mut self.slots {
            if !slot.filter.matches(changed) {
                continue;
            }
            let value = match &slot.filter {
                WatchFilter::All => values,
                WatchFilter::Path(path) => values.get(path).unwrap_or(&NULL),
            };
            (slot.callback)(&WatchEvent { changed, value });
            delivered += 1;
        }
        delivered
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.alive.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SubscriptionHub {
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.alive.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tree() -> Value {
        Value::object([
            ("username", Value::text("bob")),
            ("social", Value::object([("twitter", Value::text("@bob"))])),
        ])
    }

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl FnMut(&WatchEvent<'_>) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event: &WatchEvent<'_>| {
            sink.lock().unwrap().push(event.value.clone())
        })
    }

    #[test]
    fn test_ancestor_subscriber_sees_nested_change() {
        let mut hub = SubscriptionHub::default();
        let (seen, callback) = recorder();
        let _sub = hub.subscribe(WatchFilter::Path(FieldPath::of("social")), callback);

        hub.notify(&[FieldPath::of("social.twitter")], &tree());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::object([("twitter", Value::text("@bob"))])]
        );
    }

    #[test]
    fn test_unrelated_path_not_notified() {
        let mut hub = SubscriptionHub::default();
        let (seen, callback) = recorder();
        let _sub = hub.subscribe(WatchFilter::Path(FieldPath::of("username")), callback);
        hub.notify(&[FieldPath::of("social.twitter")], &tree());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_one_delivery_per_mutation() {
        let mut hub = SubscriptionHub::default();
        let (seen, callback) = recorder();
        let _sub = hub.subscribe(WatchFilter::All, callback);
        let changed = [
            FieldPath::of("phNumbers"),
            FieldPath::of("phNumbers.0.number"),
            FieldPath::of("phNumbers.1.number"),
        ];
        assert_eq!(hub.notify(&changed, &tree()), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let mut hub = SubscriptionHub::default();
        let (seen, callback) = recorder();
        let sub = hub.subscribe(WatchFilter::All, callback);
        assert_eq!(hub.len(), 1);
        sub.unsubscribe();
        assert_eq!(hub.notify(&[FieldPath::of("username")], &tree()), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert!(hub.is_empty());
    }

    #[test]
    fn test_hub_teardown_deactivates_handles() {
        let mut hub = SubscriptionHub::default();
        let (_seen, callback) = recorder();
        let sub = hub.subscribe(WatchFilter::All, callback);
        assert!(sub.is_active());
        drop(hub);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_missing_scoped_value_is_null() {
        let mut hub = SubscriptionHub::default();
        let (seen, callback) = recorder();
        let _sub = hub.subscribe(WatchFilter::Path(FieldPath::of("channel")), callback);
        hub.notify(&[FieldPath::of("channel")], &Value::empty_object());
        assert_eq!(*seen.lock().unwrap(), vec![Value::Null]);
    }
}
