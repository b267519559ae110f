//! In-flight request tracking
//!
//! RADIUS clients retransmit a request with the same Identifier when no reply
//! arrives in time. While the handler for the first copy is still running,
//! retransmissions are dropped. The entry is removed as soon as the handler
//! finishes, so a retransmission that arrives afterwards is serviced again.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Request key: remote socket address and packet identifier
///
/// Per RFC 2865 Section 3: "The Identifier field aids in matching requests and
/// replies." Two clients behind the same IP but on different ports are
/// distinct requesters.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct InFlightKey {
    /// Remote address as `ip:port`
    pub remote: String,
    /// Request identifier (0-255)
    pub identifier: u8,
}

impl InFlightKey {
    pub fn new(remote: SocketAddr, identifier: u8) -> Self {
        InFlightKey {
            remote: remote.to_string(),
            identifier,
        }
    }
}

/// Set of requests whose handler is currently running
///
/// Thread-safe; the check-and-insert in [`InFlightSet::try_insert`] is atomic
/// with respect to other inserts of the same key.
#[derive(Debug, Default)]
pub struct InFlightSet {
    entries: Arc<DashMap<InFlightKey, Instant>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as in flight
    ///
    /// Returns `None` if the key is already present, otherwise a guard that
    /// removes the key when dropped.
    pub fn try_insert(&self, key: InFlightKey) -> Option<InFlightGuard> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                Some(InFlightGuard {
                    entries: Arc::clone(&self.entries),
                    key,
                })
            }
        }
    }

    pub fn contains(&self, key: &InFlightKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the number of requests in flight
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Removes its key from the [`InFlightSet`] on drop
///
/// Dropped on every exit path of a request task, including a panicking
/// handler.
#[derive(Debug)]
pub struct InFlightGuard {
    entries: Arc<DashMap<InFlightKey, Instant>>,
    key: InFlightKey,
}

impl InFlightGuard {
    pub fn key(&self) -> &InFlightKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some((key, started)) = self.entries.remove(&self.key) {
            trace!(
                client_addr = %key.remote,
                request_id = key.identifier,
                elapsed_us = started.elapsed().as_micros() as u64,
                "Request completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(port: u16, identifier: u8) -> InFlightKey {
        InFlightKey::new(SocketAddr::from(([192, 168, 1, 1], port)), identifier)
    }

    #[test]
    fn test_key_uses_full_socket_address() {
        let k = key(40000, 42);
        assert_eq!(k.remote, "192.168.1.1:40000");
        assert_eq!(k.identifier, 42);
        assert_ne!(key(40000, 42), key(40001, 42));
        assert_ne!(key(40000, 42), key(40000, 43));
    }

    #[test]
    fn test_duplicate_rejected_while_in_flight() {
        let set = InFlightSet::new();

        let guard = set.try_insert(key(40000, 42));
        assert!(guard.is_some());

        // Same requester, same identifier
        assert!(set.try_insert(key(40000, 42)).is_none());
        // Different identifier is a different request
        assert!(set.try_insert(key(40000, 43)).is_some());

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_guard_drop_allows_reservice() {
        let set = InFlightSet::new();

        let guard = set.try_insert(key(40000, 7)).unwrap();
        assert!(set.contains(guard.key()));
        drop(guard);

        assert!(set.is_empty());
        assert!(set.try_insert(key(40000, 7)).is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let set = InFlightSet::new();
        let k = key(40000, 9);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = set.try_insert(k.clone()).unwrap();
            panic!("handler failed");
        }));

        assert!(result.is_err());
        assert!(!set.contains(&k));
    }

    #[test]
    fn test_concurrent_inserts_admit_one() {
        let set = Arc::new(InFlightSet::new());
        let k = key(40000, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                let k = k.clone();
                std::thread::spawn(move || set.try_insert(k).map(std::mem::forget).is_some())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 1);
    }
}
