//! Named-event publish/subscribe registry.
//!
//! The bus has no knowledge of sockets. The client emits lifecycle events and
//! decoded inbound frames on it, and the heartbeat listens on it for acks.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use socket_webox::EventBus;
//!
//! let bus = EventBus::new();
//! let id = bus.on("greeting", |frame| println!("got {frame}"));
//!
//! assert_eq!(bus.emit("greeting", &json!({ "kind": "greeting" })), 1);
//!
//! bus.off("greeting", Some(id));
//! assert!(!bus.contains("greeting"));
//! ```
//!
//! # Delivery
//!
//! - Callbacks run synchronously inside `emit`, on the caller's task.
//! - The registration list is snapshotted before any callback runs, so a
//!   callback may call `on`/`off`/`emit` on the same bus.
//! - A panicking callback is logged and skipped; the rest still run.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Shared event callback.
///
/// Registering the same `Arc` twice under one name yields one registration.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// One entry in the registry.
struct Registration {
    id: SubscriptionId,
    callback: Callback,
    once: bool,
}

/// Map of event names to their registrations.
type Registry = FxHashMap<String, Vec<Registration>>;

// ============================================================================
// EventBus
// ============================================================================

/// Named-event registry.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        let mut names: Vec<_> = registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

// ============================================================================
// EventBus - Registration
// ============================================================================

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `name`.
    pub fn on<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(callback), false)
    }

    /// Registers a shared callback under `name`.
    ///
    /// If the same `Arc` is already registered under `name`, the existing
    /// handle is returned and nothing is added.
    pub fn on_callback(&self, name: impl Into<String>, callback: Callback) -> SubscriptionId {
        self.insert(name.into(), callback, false)
    }

    /// Registers `callback` for a single emission of `name`.
    ///
    /// Passing the returned handle to [`off`](Self::off) before the event
    /// fires cancels the registration.
    pub fn once<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(callback), true)
    }

    /// Registers a shared callback for a single emission of `name`.
    pub fn once_callback(&self, name: impl Into<String>, callback: Callback) -> SubscriptionId {
        self.insert(name.into(), callback, true)
    }

    fn insert(&self, name: String, callback: Callback, once: bool) -> SubscriptionId {
        let mut registry = self.inner.registry.lock();
        let entries = registry.entry(name).or_default();

        if let Some(existing) = entries
            .iter()
            .find(|r| r.once == once && Arc::ptr_eq(&r.callback, &callback))
        {
            trace!(id = %existing.id, "Callback already registered");
            return existing.id;
        }

        let id = SubscriptionId::next(&self.inner.next_id);
        entries.push(Registration { id, callback, once });
        id
    }
}

// ============================================================================
// EventBus - Dispatch
// ============================================================================

impl EventBus {
    /// Invokes every callback registered under `name` with `args`.
    ///
    /// Returns how many callbacks ran. Emitting a name nobody listens to is
    /// a no-op.
    pub fn emit(&self, name: &str, args: &Value) -> usize {
        let callbacks: Vec<Callback> = {
            let mut registry = self.inner.registry.lock();
            let Some(entries) = registry.get_mut(name) else {
                debug!(event = name, "Emit skipped, no listeners");
                return 0;
            };

            let snapshot = entries.iter().map(|r| Arc::clone(&r.callback)).collect();

            // One-shot registrations retire before they run
            entries.retain(|r| !r.once);
            if entries.is_empty() {
                registry.remove(name);
            }

            snapshot
        };

        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(args))).is_err() {
                error!(event = name, "Event callback panicked");
            }
        }

        trace!(event = name, count = callbacks.len(), "Event emitted");
        callbacks.len()
    }
}

// ============================================================================
// EventBus - Removal
// ============================================================================

impl EventBus {
    /// Removes one registration, or every registration when `id` is `None`.
    ///
    /// Returns `true` if anything was removed.
    pub fn off(&self, name: &str, id: Option<SubscriptionId>) -> bool {
        let mut registry = self.inner.registry.lock();

        let Some(entries) = registry.get_mut(name) else {
            warn!(event = name, "Off skipped, event not registered");
            return false;
        };

        let removed = match id {
            Some(id) => {
                let before = entries.len();
                entries.retain(|r| r.id != id);
                if entries.len() == before {
                    debug!(event = name, %id, "Off skipped, subscription not found");
                }
                entries.len() != before
            }
            None => {
                entries.clear();
                true
            }
        };

        if entries.is_empty() {
            registry.remove(name);
        }
        removed
    }

    /// Removes a registration by handle, whatever name it lives under.
    pub fn off_subscription(&self, id: SubscriptionId) -> bool {
        let mut registry = self.inner.registry.lock();

        let Some(name) = registry
            .iter()
            .find(|(_, entries)| entries.iter().any(|r| r.id == id))
            .map(|(name, _)| name.clone())
        else {
            return false;
        };

        if let Some(entries) = registry.get_mut(&name) {
            entries.retain(|r| r.id != id);
            if entries.is_empty() {
                registry.remove(&name);
            }
        }
        true
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.inner.registry.lock().clear();
    }
}

// ============================================================================
// EventBus - Accessors
// ============================================================================

impl EventBus {
    /// Returns the number of registrations under `name`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner.registry.lock().get(name).map_or(0, Vec::len)
    }

    /// Returns `true` if `name` has at least one registration.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.lock().contains_key(name)
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registry.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;
    use serde_json::json;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &Value| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_invokes_each_callback_once() {
        let bus = EventBus::new();
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        bus.on("tick", cb_a);
        bus.on("tick", cb_b);

        assert_eq!(bus.emit("tick", &Value::Null), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_passes_arguments() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        bus.on("greeting", move |v| *s.lock() = Some(v.clone()));

        let frame = json!({ "kind": "greeting", "payload": 42 });
        bus.emit("greeting", &frame);
        assert_eq!(seen.lock().as_ref(), Some(&frame));
    }

    #[test]
    fn test_emit_unregistered_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("missing", &Value::Null), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_off_stops_delivery() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let id = bus.on("tick", cb);

        bus.emit("tick", &Value::Null);
        assert!(bus.off("tick", Some(id)));
        bus.emit("tick", &Value::Null);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.contains("tick"));
    }

    #[test]
    fn test_off_without_id_removes_all() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let shared: Callback = Arc::new(cb);
        bus.on_callback("tick", Arc::clone(&shared));
        bus.on("tick", |_| {});

        assert!(bus.off("tick", None));
        assert_eq!(bus.emit("tick", &Value::Null), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_keeps_other_registrations() {
        let bus = EventBus::new();
        let first = bus.on("tick", |_| {});
        bus.on("tick", |_| {});

        bus.off("tick", Some(first));
        assert_eq!(bus.listener_count("tick"), 1);
    }

    #[test]
    fn test_off_unknown_name() {
        let bus = EventBus::new();
        assert!(!bus.off("nothing", None));
    }

    #[test]
    fn test_once_fires_once() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.once("tick", cb);

        bus.emit("tick", &Value::Null);
        bus.emit("tick", &Value::Null);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.contains("tick"));
    }

    #[test]
    fn test_once_removed_before_firing() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let id = bus.once("tick", cb);

        assert!(bus.off("tick", Some(id)));
        bus.emit("tick", &Value::Null);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_callback_is_deduplicated() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let shared: Callback = Arc::new(cb);

        let a = bus.on_callback("tick", Arc::clone(&shared));
        let b = bus.on_callback("tick", Arc::clone(&shared));

        assert_eq!(a, b);
        assert_eq!(bus.listener_count("tick"), 1);
        bus.emit("tick", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_subscription() {
        let bus = EventBus::new();
        let id = bus.on("a", |_| {});
        bus.on("b", |_| {});

        assert!(bus.off_subscription(id));
        assert!(!bus.off_subscription(id));
        assert!(!bus.contains("a"));
        assert!(bus.contains("b"));
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        bus.on("a", |_| {});
        bus.once("b", |_| {});
        bus.clear();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.on("tick", |_| panic!("boom"));
        bus.on("tick", cb);

        assert_eq!(bus.emit("tick", &Value::Null), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_off_from_callback() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let handle = bus.clone();
        bus.on("tick", move |_| {
            handle.off("tick", None);
        });
        bus.on("tick", cb);

        // Snapshot still delivers to both on this emission
        assert_eq!(bus.emit("tick", &Value::Null), 2);
        assert_eq!(bus.emit("tick", &Value::Null), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_emit_from_once() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let handle = bus.clone();
        bus.once("tick", move |v| {
            cb(v);
            handle.emit("tick", v);
        });

        bus.emit("tick", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #[test]
        fn prop_removed_callbacks_never_fire(
            keep in proptest::collection::vec(any::<bool>(), 1..16),
            emissions in 1usize..5,
        ) {
            let bus = EventBus::new();
            let mut expected = 0;
            let fired = Arc::new(AtomicUsize::new(0));

            for &kept in &keep {
                let f = Arc::clone(&fired);
                let id = bus.on("evt", move |_| {
                    f.fetch_add(1, Ordering::SeqCst);
                });
                if kept {
                    expected += 1;
                } else {
                    bus.off("evt", Some(id));
                }
            }

            for _ in 0..emissions {
                bus.emit("evt", &Value::Null);
            }

            prop_assert_eq!(fired.load(Ordering::SeqCst), expected * emissions);
            prop_assert_eq!(bus.contains("evt"), expected > 0);
        }
    }
}
