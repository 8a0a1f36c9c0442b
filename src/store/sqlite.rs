use crate::db::DbConnection;
use crate::models::FlagRecord;
use crate::repo::FlagRepo;
use crate::store::{FlagChange, FlagStore, Subscription};
use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Flag store backed by a SQLite file shared between processes.
///
/// `subscribe` starts a watcher on its own connection that compares
/// `PRAGMA data_version`, which changes whenever another connection commits.
/// The watcher exits once its [`Subscription`] or the store is dropped.
pub struct SqliteFlagStore {
    path: PathBuf,
    conn: Mutex<Connection>,
    watch_interval: Duration,
    closed: Arc<AtomicBool>,
}

impl SqliteFlagStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = DbConnection::connect(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            watch_interval: DEFAULT_WATCH_INTERVAL,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// How often subscription watchers check for external commits
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Write raw text for a key, as a foreign writer might
    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        FlagRepo::set_raw(&self.conn(), key, value)
    }

    /// Run `f` with the store's connection (history queries, tests)
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        f(&self.conn())
    }
}

impl Drop for SqliteFlagStore {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

impl FlagStore for SqliteFlagStore {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        FlagRepo::get(&self.conn(), key)
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        FlagRepo::set(&self.conn(), key, value)?;
        log::info!("Set flag {}={}", key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if FlagRepo::remove(&self.conn(), key)? {
            log::info!("Removed flag {}", key);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<FlagRecord>> {
        FlagRepo::list(&self.conn())
    }

    fn subscribe(&self) -> Option<Subscription> {
        let conn = match DbConnection::connect_existing(&self.path) {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("Change notifications unavailable, polling only: {:#}", e);
                return None;
            }
        };
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let watcher = ChangeWatcher {
            conn,
            interval: self.watch_interval,
            closed: Arc::clone(&self.closed),
            stop: Arc::clone(&stop),
        };
        let spawned = thread::Builder::new()
            .name("ontrack-flag-watch".to_string())
            .spawn(move || watcher.run(tx));
        match spawned {
            Ok(_) => Some(Subscription::with_stop(rx, stop)),
            Err(e) => {
                log::warn!("Failed to start flag watcher, polling only: {}", e);
                None
            }
        }
    }
}

struct ChangeWatcher {
    conn: Connection,
    interval: Duration,
    /// Owning store dropped
    closed: Arc<AtomicBool>,
    /// Subscription dropped
    stop: Arc<AtomicBool>,
}

impl ChangeWatcher {
    fn stopped(&self) -> bool {
        self.closed.load(Ordering::Relaxed) || self.stop.load(Ordering::Relaxed)
    }

    fn data_version(&self) -> Result<i64> {
        Ok(self.conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }

    fn run(self, tx: Sender<FlagChange>) {
        let (mut version, mut last_id) = match (self.data_version(), FlagRepo::last_history_id(&self.conn)) {
            (Ok(version), Ok(last_id)) => (version, last_id),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Flag watcher stopped: {:#}", e);
                return;
            }
        };

        loop {
            thread::sleep(self.interval);
            if self.stopped() {
                log::debug!("Flag watcher unsubscribed");
                return;
            }

            let current = match self.data_version() {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("Flag watcher stopped: {:#}", e);
                    return;
                }
            };
            if current == version {
                continue;
            }
            version = current;

            // Writers that bypass the history log still produce one keyless change
            let events = match FlagRepo::history_since(&self.conn, last_id) {
                Ok(events) => events,
                Err(e) => {
                    log::warn!("Flag history unreadable, reporting a keyless change: {:#}", e);
                    Vec::new()
                }
            };
            let changes: Vec<FlagChange> = if events.is_empty() {
                vec![FlagChange { key: None }]
            } else {
                last_id = events.last().map(|e| e.id).unwrap_or(last_id);
                events.into_iter().map(|e| FlagChange { key: Some(e.key) }).collect()
            };

            for change in changes {
                log::debug!("External flag change: {:?}", change.key);
                if tx.send(change).is_err() {
                    return;
                }
            }
        }
    }
}
