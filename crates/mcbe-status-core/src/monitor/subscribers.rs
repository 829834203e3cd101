// # Subscriber List
//
// Callbacks registered on a monitor. Each registration gets an id; the
// returned `Subscription` removes exactly that id, so unsubscribing does not
// depend on comparing callbacks.
//
// Notification takes a snapshot of the callbacks, ordered by registration,
// and releases the lock before calling them. A callback may therefore read the monitor's state or
// unsubscribe itself while being notified.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::error;

/// Callback invoked once per completed update cycle
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registrations {
    next_id: u64,
    callbacks: HashMap<u64, UpdateCallback>,
}

/// Registered update callbacks of one monitor
#[derive(Default)]
pub(crate) struct SubscriberList {
    inner: Arc<Mutex<Registrations>>,
}

impl SubscriberList {
    pub(crate) fn subscribe(&self, callback: UpdateCallback) -> Subscription {
        let mut registrations = lock(&self.inner);
        let id = registrations.next_id;
        registrations.next_id += 1;
        registrations.callbacks.insert(id, callback);

        Subscription {
            id,
            list: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    /// Call every registered callback once, in registration order
    ///
    /// A panicking callback is logged and skipped. Returns the number of
    /// callbacks that returned normally.
    pub(crate) fn notify(&self) -> usize {
        let mut snapshot: Vec<(u64, UpdateCallback)> = lock(&self.inner)
            .callbacks
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();
        snapshot.sort_unstable_by_key(|(id, _)| *id);

        let mut delivered = 0;
        for (_, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Update subscriber panicked, continuing with remaining subscribers"),
            }
        }
        delivered
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle leaves the callback registered.
#[must_use = "the callback stays registered until `unsubscribe` is called"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    list: Weak<Mutex<Registrations>>,
}

impl Subscription {
    /// Remove the callback
    ///
    /// Returns `false` if the monitor is already gone.
    pub fn unsubscribe(self) -> bool {
        match self.list.upgrade() {
            Some(list) => lock(&list).callbacks.remove(&self.id).is_some(),
            None => false,
        }
    }
}

fn lock(registrations: &Mutex<Registrations>) -> MutexGuard<'_, Registrations> {
    registrations.lock().unwrap_or_else(PoisonError::into_inner)
}
