//! In-process expiring session store.
//!
//! Maps an opaque token to an authenticated identity with a TTL. One
//! long-lived [`SessionStore`] instance is shared by all request tasks;
//! every method takes `&self` and is safe to call concurrently.
//!
//! Expiry is lazy: an expired entry is evicted by the next `get` that
//! touches it. [`SessionStore::cleanup_expired`] exists only to bound
//! memory when invoked by an external scheduler — `get` correctness never
//! depends on it.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: String,
    expires_at_ms: u64,
}

/// Process-wide token → identity store with time-based expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_millis() as u64
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or refreshes a session. Re-setting an existing token resets
    /// its clock unconditionally.
    pub fn set(&self, token: &str, identity: &str, ttl_secs: u64) {
        self.set_at(token, identity, ttl_secs, now_ms());
    }

    /// Clock-injected variant of [`set`](Self::set).
    pub fn set_at(&self, token: &str, identity: &str, ttl_secs: u64, now_ms: u64) {
        let entry = SessionEntry {
            identity: identity.to_string(),
            expires_at_ms: now_ms + ttl_secs * 1000,
        };
        self.entries
            .write()
            .unwrap()
            .insert(token.to_string(), entry);
    }

    /// Returns the identity for a live token.
    ///
    /// An expired entry is removed as a side effect and reported as absent;
    /// an unknown token is absent with no side effect.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<String> {
        self.get_at(token, now_ms())
    }

    /// Clock-injected variant of [`get`](Self::get).
    #[must_use]
    pub fn get_at(&self, token: &str, now_ms: u64) -> Option<String> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(token) {
                Some(entry) if entry.expires_at_ms > now_ms => {
                    return Some(entry.identity.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: evict under the write lock. Re-check the deadline in case
        // a concurrent set refreshed the token between the two locks.
        let mut entries = self.entries.write().unwrap();
        match entries.get(token) {
            Some(entry) if entry.expires_at_ms > now_ms => Some(entry.identity.clone()),
            Some(_) => {
                entries.remove(token);
                tracing::debug!(token, "evicted expired session");
                None
            }
            None => None,
        }
    }

    /// Deletes a session. Removing an absent token is not an error.
    pub fn remove(&self, token: &str) {
        self.entries.write().unwrap().remove(token);
    }

    /// Sweeps all expired entries and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(now_ms())
    }

    /// Clock-injected variant of [`cleanup_expired`](Self::cleanup_expired).
    pub fn cleanup_expired_at(&self, now_ms: u64) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at_ms > now_ms);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired sessions");
        }
        removed
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
