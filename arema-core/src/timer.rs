use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use actlet::CancellationToken;
use actlet::Spawn;

/// Identifies an armed timer.
///
/// A new ID is assigned every time a timer is armed, so that a handler can
/// tell an expiration of the current timer from a stale one which was
/// already in the mailbox when the timer was re-armed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Keyed one-shot timers.
///
/// At most one timer is armed for each key.  Arming a key cancels the timer
/// previously armed for it.  All timers are cancelled when the map is
/// dropped.
pub struct Timers<K> {
    armed: HashMap<K, (TimerId, CancellationToken)>,
    next_id: u64,
}

impl<K> Timers<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Timers {
            armed: Default::default(),
            next_id: 0,
        }
    }

    /// Arms a timer for `key`.
    ///
    /// `on_expired` is called with the ID of the new timer and the returned
    /// future runs on a task spawned by `spawner` after `delay`.  The task is
    /// cancelled when the timer is re-armed or cancelled, and when the
    /// owner of `spawner` stops.
    pub fn arm<S, F, Fut>(&mut self, spawner: &S, key: K, delay: Duration, on_expired: F) -> TimerId
    where
        S: Spawn,
        F: FnOnce(TimerId) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(&key);
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let fut = on_expired(id);
        let token = spawner.spawn_task(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });
        self.armed.insert(key, (id, token));
        id
    }

    /// Cancels the timer armed for `key`.
    ///
    /// Returns `true` if a timer was armed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.armed.remove(key) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, token)) in self.armed.drain() {
            token.cancel();
        }
    }

    /// Consumes an expiration.
    ///
    /// Returns `true` if `id` is the timer currently armed for `key`.  The
    /// entry is removed in that case.
    pub fn expire(&mut self, key: &K, id: TimerId) -> bool {
        match self.armed.get(key) {
            Some((armed_id, _)) if *armed_id == id => {
                self.armed.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.armed.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

impl<K> Default for Timers<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for Timers<K> {
    fn drop(&mut self) {
        for (_, (_, token)) in self.armed.drain() {
            token.cancel();
        }
    }
}

// </coverage:exclude>
