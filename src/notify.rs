use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::tables::TableDescriptor;

/// A logical resource whose mutation invalidates materialized results.
///
/// Usually a table, sometimes a derived view; one result may listen on
/// several keys at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey(String);

impl NotificationKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn table(desc: &TableDescriptor) -> Self {
        Self(desc.name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NotificationKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Callback interface for invalidation delivery. Implementations must be
/// prepared to be called from an arbitrary thread.
pub trait ChangeObserver: Send + Sync {
    fn on_invalidated(&self, key: &NotificationKey);
}

/// Central fan-out point between writers and live results.
///
/// Holds only weak back-references to listeners: a result dropped without
/// an explicit `close` cannot be kept alive (or leaked) by the bus. Dead
/// entries are pruned on every delivery.
#[derive(Default)]
pub struct ChangeBus {
    listeners: Mutex<HashMap<NotificationKey, Vec<Weak<WatchState>>>>,
}

impl ChangeBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Announce an external mutation of `key` to every listening result.
    pub fn notify_change(&self, key: &NotificationKey) {
        self.dispatch(key, std::ptr::null());
    }

    fn dispatch(&self, key: &NotificationKey, skip: *const WatchState) {
        let targets: Vec<Arc<WatchState>> = {
            let mut listeners = self.listeners.lock().expect("bus mutex poisoned");
            let mut targets = Vec::new();
            let mut drained = false;
            if let Some(entries) = listeners.get_mut(key) {
                entries.retain(|weak| weak.strong_count() > 0);
                targets = entries
                    .iter()
                    .filter_map(Weak::upgrade)
                    .filter(|state| !std::ptr::eq(Arc::as_ptr(state), skip))
                    .collect();
                drained = entries.is_empty();
            }
            if drained {
                listeners.remove(key);
            }
            targets
        };
        // Delivery happens outside the bus lock; each target takes its own
        // state mutex and may call back into the bus.
        for state in targets {
            state.deliver_external(key);
        }
    }

    fn register(&self, key: &NotificationKey, state: &Arc<WatchState>) {
        let mut listeners = self.listeners.lock().expect("bus mutex poisoned");
        let entries = listeners.entry(key.clone()).or_default();
        if !entries
            .iter()
            .any(|weak| weak.as_ptr() == Arc::as_ptr(state))
        {
            entries.push(Arc::downgrade(state));
        }
    }

    fn unregister(&self, state: *const WatchState) {
        let mut listeners = self.listeners.lock().expect("bus mutex poisoned");
        for entries in listeners.values_mut() {
            entries.retain(|weak| weak.strong_count() > 0 && weak.as_ptr() != state);
        }
        listeners.retain(|_, entries| !entries.is_empty());
    }
}

struct WatchInner {
    keys: Vec<NotificationKey>,
    /// Keys mutated externally since the last requery. Late observers are
    /// replayed these so a subscription after the write still learns of it.
    pending: HashSet<NotificationKey>,
    armed: bool,
    closed: bool,
    observers: Vec<Arc<dyn ChangeObserver>>,
}

/// Shared half of a watched result; also serves as the single internal
/// listener installed on the bus.
pub struct WatchState {
    bus: Arc<ChangeBus>,
    inner: Mutex<WatchInner>,
}

impl WatchState {
    fn deliver_external(&self, key: &NotificationKey) {
        let observers: Vec<Arc<dyn ChangeObserver>> = {
            let mut inner = self.inner.lock().expect("watch mutex poisoned");
            if inner.closed || !inner.armed {
                return;
            }
            if !inner.keys.contains(key) {
                return;
            }
            inner.pending.insert(key.clone());
            inner.observers.clone()
        };
        for observer in observers {
            observer.on_invalidated(key);
        }
    }
}

/// A materialized query result wrapped with change tracking.
///
/// States: inactive (no keys registered), active (internal listener armed
/// on every registered key), closed (terminal). All state transitions and
/// delivery paths run under one mutex because the bus may fire on a
/// different thread than the consumer's.
pub struct WatchedRows<T> {
    rows: Vec<T>,
    state: Arc<WatchState>,
}

impl<T> WatchedRows<T> {
    pub fn new(rows: Vec<T>, bus: Arc<ChangeBus>) -> Self {
        let state = Arc::new(WatchState {
            bus,
            inner: Mutex::new(WatchInner {
                keys: Vec::new(),
                pending: HashSet::new(),
                armed: false,
                closed: false,
                observers: Vec::new(),
            }),
        });
        Self { rows, state }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Associate this result with a further notification key. The first
    /// registration arms the internal listener; later ones fan it out.
    pub fn register_key(&self, key: NotificationKey) {
        {
            let mut inner = self.state.inner.lock().expect("watch mutex poisoned");
            if inner.closed {
                return;
            }
            if !inner.keys.contains(&key) {
                inner.keys.push(key.clone());
            }
            inner.armed = true;
        }
        self.state.bus.register(&key, &self.state);
    }

    pub fn keys(&self) -> Vec<NotificationKey> {
        let inner = self.state.inner.lock().expect("watch mutex poisoned");
        inner.keys.clone()
    }

    /// React to a mutation.
    ///
    /// External changes mark the key pending and notify attached observers.
    /// A self-originated change instead re-announces every registered key
    /// outward: "I changed, propagate to everyone depending on any of my
    /// keys", without echoing back to this result.
    pub fn on_change(&self, self_change: bool, key: Option<&NotificationKey>) {
        if self_change {
            let keys: Vec<NotificationKey> = {
                let inner = self.state.inner.lock().expect("watch mutex poisoned");
                if inner.closed {
                    return;
                }
                inner.keys.clone()
            };
            for key in &keys {
                self.state.bus.dispatch(key, Arc::as_ptr(&self.state));
            }
        } else if let Some(key) = key {
            self.state.deliver_external(key);
        }
    }

    /// Attach an observer. If changes already arrived, the observer is
    /// immediately replayed a synthetic notification per pending key,
    /// exactly once each, so there is no missed-wakeup race.
    pub fn add_observer(&self, observer: Arc<dyn ChangeObserver>) {
        let pending: Vec<NotificationKey> = {
            let mut inner = self.state.inner.lock().expect("watch mutex poisoned");
            if inner.closed {
                return;
            }
            inner.observers.push(observer.clone());
            let mut keys: Vec<NotificationKey> = inner.pending.iter().cloned().collect();
            keys.sort();
            keys
        };
        for key in &pending {
            observer.on_invalidated(key);
        }
    }

    /// Swap in a fresh row set after re-running the query. Clears the
    /// pending changed-by set; the listener stays armed only if it was.
    pub fn requery(&mut self, rows: Vec<T>) {
        let rearm: Vec<NotificationKey> = {
            let mut inner = self.state.inner.lock().expect("watch mutex poisoned");
            if inner.closed {
                return;
            }
            inner.pending.clear();
            if inner.armed {
                inner.keys.clone()
            } else {
                Vec::new()
            }
        };
        self.rows = rows;
        for key in &rearm {
            self.state.bus.register(key, &self.state);
        }
    }

    /// Terminal. Unregisters from the bus and drops observers; any delivery
    /// arriving afterwards is a no-op.
    pub fn close(&self) {
        {
            let mut inner = self.state.inner.lock().expect("watch mutex poisoned");
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.armed = false;
            inner.observers.clear();
            inner.pending.clear();
        }
        self.state.bus.unregister(Arc::as_ptr(&self.state));
        debug!(target: "walletbook", event = "watched_rows_closed");
    }
}

impl<T> Drop for WatchedRows<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        seen: Mutex<Vec<NotificationKey>>,
        calls: AtomicUsize,
    }

    impl CountingObserver {
        fn seen(&self) -> Vec<NotificationKey> {
            self.seen.lock().unwrap().clone()
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChangeObserver for CountingObserver {
        fn on_invalidated(&self, key: &NotificationKey) {
            self.seen.lock().unwrap().push(key.clone());
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn key(name: &str) -> NotificationKey {
        NotificationKey::new(name)
    }

    #[test]
    fn external_writes_notify_attached_observers() {
        let bus = ChangeBus::new();
        let result = WatchedRows::new(vec![1, 2, 3], bus.clone());
        result.register_key(key("transactions"));
        result.register_key(key("wallets"));

        let observer = Arc::new(CountingObserver::default());
        result.add_observer(observer.clone());

        bus.notify_change(&key("transactions"));
        bus.notify_change(&key("wallets"));

        assert_eq!(
            observer.seen(),
            vec![key("transactions"), key("wallets")]
        );
    }

    #[test]
    fn late_observer_gets_each_pending_key_exactly_once() {
        let bus = ChangeBus::new();
        let result = WatchedRows::new(Vec::<i64>::new(), bus.clone());
        result.register_key(key("transactions"));
        result.register_key(key("wallets"));

        // Two writes to the same key coalesce into one pending entry.
        bus.notify_change(&key("transactions"));
        bus.notify_change(&key("transactions"));
        bus.notify_change(&key("wallets"));

        let late = Arc::new(CountingObserver::default());
        result.add_observer(late.clone());

        let mut seen = late.seen();
        seen.sort();
        assert_eq!(seen, vec![key("transactions"), key("wallets")]);
        assert_eq!(late.calls(), 2);
    }

    #[test]
    fn self_change_reannounces_every_registered_key_to_others() {
        let bus = ChangeBus::new();
        let writer = WatchedRows::new(Vec::<i64>::new(), bus.clone());
        writer.register_key(key("transactions"));
        writer.register_key(key("wallets"));

        let reader_tx = WatchedRows::new(Vec::<i64>::new(), bus.clone());
        reader_tx.register_key(key("transactions"));
        let tx_observer = Arc::new(CountingObserver::default());
        reader_tx.add_observer(tx_observer.clone());

        let reader_w = WatchedRows::new(Vec::<i64>::new(), bus.clone());
        reader_w.register_key(key("wallets"));
        let w_observer = Arc::new(CountingObserver::default());
        reader_w.add_observer(w_observer.clone());

        let self_observer = Arc::new(CountingObserver::default());
        writer.add_observer(self_observer.clone());

        writer.on_change(true, None);

        assert_eq!(tx_observer.seen(), vec![key("transactions")]);
        assert_eq!(w_observer.seen(), vec![key("wallets")]);
        // The writer does not echo its own change back to itself.
        assert_eq!(self_observer.calls(), 0);
    }

    #[test]
    fn requery_clears_pending_set() {
        let bus = ChangeBus::new();
        let mut result = WatchedRows::new(vec![1], bus.clone());
        result.register_key(key("budgets"));
        bus.notify_change(&key("budgets"));

        result.requery(vec![1, 2]);
        assert_eq!(result.rows(), &[1, 2]);

        let late = Arc::new(CountingObserver::default());
        result.add_observer(late.clone());
        assert_eq!(late.calls(), 0);

        // Still armed: the next external write is delivered.
        bus.notify_change(&key("budgets"));
        assert_eq!(late.calls(), 1);
    }

    #[test]
    fn close_is_terminal() {
        let bus = ChangeBus::new();
        let result = WatchedRows::new(vec![1], bus.clone());
        result.register_key(key("debts"));
        let observer = Arc::new(CountingObserver::default());
        result.add_observer(observer.clone());

        result.close();
        bus.notify_change(&key("debts"));
        assert_eq!(observer.calls(), 0);

        // Registration after close is a no-op.
        result.register_key(key("wallets"));
        bus.notify_change(&key("wallets"));
        assert_eq!(observer.calls(), 0);
    }

    #[test]
    fn dropped_result_does_not_linger_on_the_bus() {
        let bus = ChangeBus::new();
        {
            let result = WatchedRows::new(vec![1], bus.clone());
            result.register_key(key("savings"));
        }
        // Delivery to a dropped result must not panic or deliver.
        bus.notify_change(&key("savings"));
        assert!(bus.listeners.lock().unwrap().is_empty());
    }

    #[test]
    fn delivery_from_another_thread_is_safe() {
        let bus = ChangeBus::new();
        let result = WatchedRows::new(Vec::<i64>::new(), bus.clone());
        result.register_key(key("transactions"));
        let observer = Arc::new(CountingObserver::default());
        result.add_observer(observer.clone());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        bus.notify_change(&NotificationKey::new("transactions"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(observer.calls(), 200);
    }
}
