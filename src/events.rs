//! Event substrate bridging host-side events to extension listeners.
//!
//! Every `on*` surface in the `chrome.*` shim is a channel on one
//! process-wide [`EventBus`], keyed by `(extension_id, channel)`. Delivery
//! is fire-and-forget in registration order; events published before a
//! listener registered are not replayed. Subscribers get an explicit
//! [`SubscriptionHandle`] so a torn-down extension context does not leak
//! listeners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use crate::ExtensionId;

/// Callback invoked once per pushed event.
pub type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: EventCallback,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    channels: HashMap<(ExtensionId, String), Vec<Subscriber>>,
}

/// Process-wide publish/subscribe bus for extension events.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a listener for one `(extension, channel)` pair.
    ///
    /// Listeners fire in registration order. The returned handle removes
    /// the listener when dropped or explicitly unsubscribed.
    pub fn subscribe(
        self: &Arc<Self>,
        extension_id: &str,
        channel: &str,
        callback: EventCallback,
    ) -> SubscriptionHandle {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .channels
            .entry((extension_id.to_string(), channel.to_string()))
            .or_default()
            .push(Subscriber { id, callback });

        SubscriptionHandle {
            bus: Arc::downgrade(self),
            key: (extension_id.to_string(), channel.to_string()),
            id,
        }
    }

    /// Push an event to every listener on `(extension, channel)`.
    ///
    /// Callbacks run outside the bus lock so a listener may publish or
    /// subscribe reentrantly.
    pub fn publish(&self, extension_id: &str, channel: &str, args: &[Value]) {
        let callbacks: Vec<EventCallback> = {
            let inner = self.lock();
            match inner
                .channels
                .get(&(extension_id.to_string(), channel.to_string()))
            {
                Some(subs) => subs.iter().map(|s| s.callback.clone()).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            callback(args);
        }
    }

    /// Number of live listeners on one channel.
    pub fn listener_count(&self, extension_id: &str, channel: &str) -> usize {
        let inner = self.lock();
        inner
            .channels
            .get(&(extension_id.to_string(), channel.to_string()))
            .map_or(0, Vec::len)
    }

    /// Drop every listener an extension registered, on context teardown.
    pub fn drop_extension(&self, extension_id: &str) {
        let mut inner = self.lock();
        inner.channels.retain(|(ext, _), _| ext != extension_id);
    }

    fn remove(&self, key: &(String, String), id: u64) {
        let mut inner = self.lock();
        if let Some(subs) = inner.channels.get_mut(key) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                inner.channels.remove(key);
            }
        }
    }
}

/// Handle to a registered listener. Dropping it unsubscribes.
pub struct SubscriptionHandle {
    bus: Weak<EventBus>,
    key: (String, String),
    id: u64,
}

impl SubscriptionHandle {
    /// Explicitly remove the listener.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    /// The channel this handle listens on.
    pub fn channel(&self) -> &str {
        &self.key.1
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.key, self.id);
        }
    }
}

/// Handle given to the shell when a notification is shown, so OS-level
/// click/close interactions flow back into the owning extension's
/// `notifications.on*` channels.
#[derive(Clone)]
pub struct NotificationSignal {
    bus: Arc<EventBus>,
    extension_id: ExtensionId,
    notification_id: String,
}

impl NotificationSignal {
    pub(crate) fn new(bus: Arc<EventBus>, extension_id: &str, notification_id: &str) -> Self {
        Self {
            bus,
            extension_id: extension_id.to_string(),
            notification_id: notification_id.to_string(),
        }
    }

    /// Report that the user clicked the notification body.
    pub fn clicked(&self) {
        self.bus.publish(
            &self.extension_id,
            "notifications.onClicked",
            &[Value::String(self.notification_id.clone())],
        );
    }

    /// Report that the notification was dismissed.
    pub fn closed(&self, by_user: bool) {
        self.bus.publish(
            &self.extension_id,
            "notifications.onClosed",
            &[
                Value::String(self.notification_id.clone()),
                Value::Bool(by_user),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let _h1 = bus.subscribe("ext", "tick", Arc::new(move |_| s1.lock().unwrap().push(1)));
        let s2 = seen.clone();
        let _h2 = bus.subscribe("ext", "tick", Arc::new(move |_| s2.lock().unwrap().push(2)));

        bus.publish("ext", "tick", &[]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_channel_isolation() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let _h = bus.subscribe("a", "tick", Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish("b", "tick", &[]);
        bus.publish("a", "tock", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish("a", "tick", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let handle = bus.subscribe("ext", "tick", Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(bus.listener_count("ext", "tick"), 1);

        handle.unsubscribe();
        assert_eq!(bus.listener_count("ext", "tick"), 0);

        bus.publish("ext", "tick", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_extension_clears_listeners() {
        let bus = EventBus::new();
        let _h1 = bus.subscribe("gone", "a", Arc::new(|_| {}));
        let _h2 = bus.subscribe("gone", "b", Arc::new(|_| {}));
        let _h3 = bus.subscribe("stays", "a", Arc::new(|_| {}));

        bus.drop_extension("gone");
        assert_eq!(bus.listener_count("gone", "a"), 0);
        assert_eq!(bus.listener_count("gone", "b"), 0);
        assert_eq!(bus.listener_count("stays", "a"), 1);
    }

    #[test]
    fn test_no_replay_for_late_subscriber() {
        let bus = EventBus::new();
        bus.publish("ext", "tick", &[Value::from(1)]);

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _h = bus.subscribe("ext", "tick", Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
