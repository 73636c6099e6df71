//! # Identity Stores
//!
//! Expire-after-write maps shared by every session worker.
//!
//! ## Design
//!
//! - One `parking_lot::Mutex` per store; compound operations hold it
//!   across the read and the write, which makes them atomic per key
//! - Expired entries are invisible immediately and reclaimed lazily or
//!   through [`TtlStore::purge_expired`]
//! - Every operation has an `_at` twin taking the current instant so
//!   tests can move time without sleeping
//!
//! Persistent backends are not part of this crate; they plug in through
//! [`IdentityStore`].

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Minimal key-value surface a persistence layer has to provide.
pub trait IdentityStore<K, V>: Send + Sync {
    /// True if a live entry exists for `key`.
    fn contains(&self, key: &K) -> bool;

    /// Live value for `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or replaces the value for `key`.
    fn put(&self, key: K, value: V);

    /// Removes `key`, returning its live value.
    fn remove(&self, key: &K) -> Option<V>;

    /// Number of live entries.
    fn size(&self) -> usize;
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    written: Instant,
}

/// In-memory store whose entries expire a fixed time after their last write.
#[derive(Debug)]
pub struct TtlStore<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlStore<K, V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Time-to-live applied to every write.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.written) < self.ttl
    }

    /// Live value for `key` as seen at `now`.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entries = self.entries.lock();
        entries.get(key).filter(|entry| self.is_live(entry, now)).map(|entry| entry.value.clone())
    }

    /// Writes `value` at `now`, restarting its expiry.
    pub fn put_at(&self, key: K, value: V, now: Instant) {
        self.entries.lock().insert(key, Entry { value, written: now });
    }

    /// Inserts only if no live entry exists. Returns whether it inserted.
    pub fn insert_if_absent_at(&self, key: K, value: V, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(&key).is_some_and(|entry| self.is_live(entry, now)) {
            return false;
        }
        entries.insert(key, Entry { value, written: now });
        true
    }

    /// Atomically replaces the value of `key`.
    ///
    /// `update` receives the live value (if any) and returns the value to
    /// write, or `None` to remove the key. A write restarts the expiry.
    pub fn compute_at<F>(&self, key: K, now: Instant, update: F) -> Option<V>
    where
        F: FnOnce(Option<V>) -> Option<V>,
    {
        let mut entries = self.entries.lock();
        let current = entries.remove(&key).filter(|entry| self.is_live(entry, now)).map(|entry| entry.value);
        let next = update(current)?;
        entries.insert(key, Entry { value: next.clone(), written: now });
        Some(next)
    }

    /// Number of live entries at `now`.
    pub fn size_at(&self, now: Instant) -> usize {
        self.entries.lock().values().filter(|entry| self.is_live(entry, now)).count()
    }

    /// Drops every entry that expired before `now`. Returns how many.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.written) < self.ttl);
        before - entries.len()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Removes everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K, V> IdentityStore<K, V> for TtlStore<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn contains(&self, key: &K) -> bool {
        self.get_at(key, Instant::now()).is_some()
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: K, value: V) {
        self.put_at(key, value, Instant::now());
    }

    fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries.lock().remove(key).filter(|entry| self.is_live(entry, now)).map(|entry| entry.value)
    }

    fn size(&self) -> usize {
        self.size_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    #[test]
    fn test_entries_expire_after_write() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();
        store.put_at("steve", 1, start);

        assert_eq!(store.get_at(&"steve", start + Duration::from_secs(9)), Some(1));
        assert_eq!(store.get_at(&"steve", start + TTL), None);
    }

    #[test]
    fn test_rewrite_restarts_expiry() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();
        store.put_at("steve", 1, start);
        store.put_at("steve", 2, start + Duration::from_secs(8));

        assert_eq!(store.get_at(&"steve", start + Duration::from_secs(15)), Some(2));
    }

    #[test]
    fn test_insert_if_absent_respects_live_entries() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();

        assert!(store.insert_if_absent_at("a", (), start));
        assert!(!store.insert_if_absent_at("a", (), start + Duration::from_secs(5)));
        assert!(store.insert_if_absent_at("a", (), start + TTL));
    }

    #[test]
    fn test_compute_sees_only_live_values() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();
        store.put_at("a", 5, start);

        let bumped = store.compute_at("a", start + Duration::from_secs(1), |old| Some(old.unwrap_or(0) + 1));
        assert_eq!(bumped, Some(6));

        let fresh = store.compute_at("a", start + Duration::from_secs(30), |old| Some(old.unwrap_or(0) + 1));
        assert_eq!(fresh, Some(1));
    }

    #[test]
    fn test_compute_none_removes() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();
        store.put_at("a", 5, start);

        assert_eq!(store.compute_at("a", start, |_| None), None);
        assert_eq!(store.size_at(start), 0);
    }

    #[test]
    fn test_purge_expired() {
        let store = TtlStore::new(TTL);
        let start = Instant::now();
        store.put_at(1, "old", start);
        store.put_at(2, "new", start + Duration::from_secs(5));

        assert_eq!(store.purge_expired_at(start + Duration::from_secs(12)), 1);
        assert_eq!(store.size_at(start + Duration::from_secs(12)), 1);
    }

    #[test]
    fn test_trait_surface() {
        let store: TtlStore<u32, &str> = TtlStore::new(TTL);
        let dyn_store: &dyn IdentityStore<u32, &str> = &store;

        dyn_store.put(7, "seven");
        assert!(dyn_store.contains(&7));
        assert_eq!(dyn_store.size(), 1);
        assert_eq!(dyn_store.remove(&7), Some("seven"));
        assert!(!dyn_store.contains(&7));
    }
}
