//! Flag store port
//!
//! The tracker never owns its inputs. Flags live in a host-provided key-value
//! store that other flows (and other processes) mutate; the tracker reads it
//! through [`FlagStore`] and may subscribe to out-of-band change signals.
//!
//! Two backends are provided:
//! - [`MemoryFlagStore`] for tests and embedding
//! - [`SqliteFlagStore`] for the CLI, shared between processes through one
//!   database file

pub mod memory;
pub mod sqlite;

pub use memory::MemoryFlagStore;
pub use sqlite::SqliteFlagStore;

use crate::models::{Flag, FlagRecord, FlagSet};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Signal that a key changed outside the reader's own execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    /// Changed key, when the backend can tell
    pub key: Option<String>,
}

/// Receiving end of a change subscription.
///
/// Dropping it raises the stop flag, so a backend's watcher thread exits on
/// its next poll instead of waiting for a change it can no longer deliver.
pub struct Subscription {
    rx: Receiver<FlagChange>,
    stop: Option<Arc<AtomicBool>>,
}

impl Subscription {
    /// A subscription whose producer notices the drop through the channel
    pub fn new(rx: Receiver<FlagChange>) -> Self {
        Self { rx, stop: None }
    }

    /// A subscription that raises `stop` when dropped
    pub fn with_stop(rx: Receiver<FlagChange>, stop: Arc<AtomicBool>) -> Self {
        Self { rx, stop: Some(stop) }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<FlagChange, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(stop) = &self.stop {
            stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Key-value flag storage with no transactional guarantees
pub trait FlagStore: Send + Sync {
    /// Read a flag. `Ok(None)` means the key is absent or not a boolean.
    fn get(&self, key: &str) -> Result<Option<bool>>;

    fn set(&self, key: &str, value: bool) -> Result<()>;

    /// Remove a key (explicit reset)
    fn remove(&self, key: &str) -> Result<()>;

    /// All stored keys, sorted by key
    fn list(&self) -> Result<Vec<FlagRecord>>;

    /// Subscribe to changes made by other execution contexts.
    /// Returns `None` when the backend has no change signal; callers
    /// must fall back to polling either way.
    fn subscribe(&self) -> Option<Subscription> {
        None
    }
}

impl<T: FlagStore + ?Sized> FlagStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<FlagRecord>> {
        (**self).list()
    }

    fn subscribe(&self) -> Option<Subscription> {
        (**self).subscribe()
    }
}

/// Read a fresh flag snapshot.
///
/// Flags are read one at a time, so a concurrent writer can produce a torn
/// snapshot; the next read corrects it. Missing or unreadable flags are false.
pub fn read_flags<S: FlagStore + ?Sized>(store: &S) -> FlagSet {
    Flag::ALL.iter().fold(FlagSet::default(), |flags, flag| {
        let value = match store.get(flag.key()) {
            Ok(Some(value)) => value,
            Ok(None) => false,
            Err(e) => {
                log::warn!("Unreadable flag '{}', treating as false: {:#}", flag.key(), e);
                false
            }
        };
        flags.with(*flag, value)
    })
}

/// Parse a stored or user-supplied flag value
pub fn parse_flag_value(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl FlagStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<bool>> {
            if key == Flag::EntityCreated.key() {
                anyhow::bail!("disk on fire")
            }
            Ok(Some(true))
        }
        fn set(&self, _key: &str, _value: bool) -> Result<()> {
            Ok(())
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn list(&self) -> Result<Vec<FlagRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_read_flags_unreadable_is_false() {
        let flags = read_flags(&BrokenStore);
        assert!(flags.company_profile_done);
        assert!(!flags.entity_created);
        assert!(flags.entity_verified);
    }

    #[test]
    fn test_read_flags_missing_is_false() {
        let store = MemoryFlagStore::new();
        assert_eq!(read_flags(&store), FlagSet::default());
    }

    #[test]
    fn test_parse_flag_value() {
        assert_eq!(parse_flag_value("true"), Some(true));
        assert_eq!(parse_flag_value(" TRUE "), Some(true));
        assert_eq!(parse_flag_value("1"), Some(true));
        assert_eq!(parse_flag_value("false"), Some(false));
        assert_eq!(parse_flag_value("0"), Some(false));
        assert_eq!(parse_flag_value("undefined"), None);
        assert_eq!(parse_flag_value(""), None);
    }

    #[test]
    fn test_arc_store_delegates() {
        let store = Arc::new(MemoryFlagStore::new());
        store.set("entityCreated", true).unwrap();
        let shared: Arc<MemoryFlagStore> = Arc::clone(&store);
        assert_eq!(read_flags(&shared), FlagSet::new(false, true, false));
    }

    #[test]
    fn test_dropping_subscription_raises_stop() {
        let (_tx, rx) = std::sync::mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let subscription = Subscription::with_stop(rx, Arc::clone(&stop));
        assert!(!stop.load(Ordering::Relaxed));

        drop(subscription);
        assert!(stop.load(Ordering::Relaxed));
    }
}
