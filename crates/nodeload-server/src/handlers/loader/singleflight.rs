//! Singleflight for collapsing concurrent loads of the same key.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Result of trying to acquire a singleflight slot.
pub enum SingleflightSlot<V> {
    /// We won the race and should execute the operation.
    /// Contains the sender to broadcast results.
    Leader(broadcast::Sender<V>),
    /// Another task is executing; wait for its result.
    Follower(broadcast::Receiver<V>),
}

/// Map of in-flight operations keyed by what they compute.
///
/// The first caller for a key becomes the leader and runs the operation;
/// callers arriving while it runs subscribe to the leader's broadcast and
/// receive the same value.
pub struct Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    in_flight: DashMap<K, broadcast::Sender<V>>,
}

impl<K, V> Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Atomically try to acquire a slot for this key.
    ///
    /// Uses DashMap's entry API so that check-and-insert cannot race.
    pub fn acquire(&self, key: K) -> SingleflightSlot<V> {
        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => SingleflightSlot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                SingleflightSlot::Leader(tx)
            }
        }
    }

    /// Remove a completed in-flight operation.
    pub fn complete(&self, key: &K) {
        self.in_flight.remove(key);
    }

    /// Number of operations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that clears the in-flight entry when the leader goes away.
///
/// If the leader's future is dropped or panics before completing, the
/// entry is removed and the broadcast sender closes, which wakes every
/// follower with a receive error so one of them can take over.
pub struct SingleflightGuard<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    singleflight: &'a Singleflight<K, V>,
    key: K,
    completed: bool,
}

impl<'a, K, V> SingleflightGuard<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(singleflight: &'a Singleflight<K, V>, key: K) -> Self {
        Self {
            singleflight,
            key,
            completed: false,
        }
    }

    /// Mark as completed (normal path).
    pub fn complete(mut self) {
        self.singleflight.complete(&self.key);
        self.completed = true;
    }
}

impl<K, V> Drop for SingleflightGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.singleflight.complete(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_caller_leads_and_others_follow() {
        let flights: Singleflight<&str, u32> = Singleflight::new();

        let SingleflightSlot::Leader(sender) = flights.acquire("course:10") else {
            panic!("first caller must lead");
        };
        let SingleflightSlot::Follower(mut receiver) = flights.acquire("course:10") else {
            panic!("second caller must follow");
        };
        assert!(matches!(
            flights.acquire("course:11"),
            SingleflightSlot::Leader(_)
        ));

        sender.send(7).unwrap();
        assert_eq!(receiver.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_guard_wakes_followers() {
        let flights: Singleflight<u64, u32> = Singleflight::new();

        let SingleflightSlot::Leader(sender) = flights.acquire(1) else {
            panic!("first caller must lead");
        };
        let guard = SingleflightGuard::new(&flights, 1);
        let SingleflightSlot::Follower(mut receiver) = flights.acquire(1) else {
            panic!("second caller must follow");
        };

        drop(guard);
        drop(sender);

        assert_eq!(flights.in_flight(), 0);
        assert!(receiver.recv().await.is_err());
        assert!(matches!(flights.acquire(1), SingleflightSlot::Leader(_)));
    }

    #[test]
    fn test_completed_guard_clears_entry() {
        let flights: Singleflight<u64, u32> = Singleflight::new();
        let _slot = flights.acquire(1);

        SingleflightGuard::new(&flights, 1).complete();

        assert_eq!(flights.in_flight(), 0);
    }
}
