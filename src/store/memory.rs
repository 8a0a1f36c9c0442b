use crate::models::FlagRecord;
use crate::store::{FlagChange, FlagStore, Subscription};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard};

/// In-process flag store.
///
/// Every write notifies all live subscribers, which makes it a stand-in for
/// a store mutated from another execution context.
#[derive(Default)]
pub struct MemoryFlagStore {
    values: Mutex<BTreeMap<String, (bool, i64)>>,
    subscribers: Mutex<Vec<Sender<FlagChange>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given flags
    pub fn with_flags(flags: &[(&str, bool)]) -> Self {
        let store = Self::new();
        {
            let mut values = lock(&store.values);
            let now = chrono::Utc::now().timestamp();
            for (key, value) in flags {
                values.insert(key.to_string(), (*value, now));
            }
        }
        store
    }

    fn notify(&self, key: &str) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| {
            tx.send(FlagChange { key: Some(key.to_string()) }).is_ok()
        });
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        Ok(lock(&self.values).get(key).map(|(value, _)| *value))
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        lock(&self.values).insert(key.to_string(), (value, now));
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = lock(&self.values).remove(key).is_some();
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<FlagRecord>> {
        Ok(lock(&self.values)
            .iter()
            .map(|(key, (value, ts))| FlagRecord {
                key: key.clone(),
                value: Some(*value),
                modified_ts: Some(*ts),
            })
            .collect())
    }

    fn subscribe(&self) -> Option<Subscription> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        Some(Subscription::new(rx))
    }
}
