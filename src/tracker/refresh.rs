use crate::store::Subscription;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

/// Why a recomputation happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// First evaluation after starting to watch
    Initial,
    /// Poll interval elapsed
    Tick,
    /// The store signalled an out-of-band change
    Changed(Option<String>),
}

impl Trigger {
    pub fn label(&self) -> String {
        match self {
            Trigger::Initial => "initial".to_string(),
            Trigger::Tick => "tick".to_string(),
            Trigger::Changed(Some(key)) => format!("changed:{}", key),
            Trigger::Changed(None) => "changed".to_string(),
        }
    }
}

/// Merges poll ticks and store change notifications into one stream.
///
/// Yields `Initial` first, then blocks until either a change arrives or the
/// interval elapses. If the notification channel disconnects the source keeps
/// ticking. The iterator never ends; bound it with `take`.
pub struct TriggerSource {
    changes: Option<Subscription>,
    interval: Duration,
    started: bool,
}

impl TriggerSource {
    pub fn new(changes: Option<Subscription>, interval: Duration) -> Self {
        Self {
            changes,
            interval,
            started: false,
        }
    }

    /// Polling only
    pub fn polling(interval: Duration) -> Self {
        Self::new(None, interval)
    }

    pub fn has_notifications(&self) -> bool {
        self.changes.is_some()
    }

    fn wait(&mut self) -> Trigger {
        let Some(rx) = &self.changes else {
            thread::sleep(self.interval);
            return Trigger::Tick;
        };

        match rx.recv_timeout(self.interval) {
            Ok(change) => Trigger::Changed(change.key),
            Err(RecvTimeoutError::Timeout) => Trigger::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("Change notifications closed, continuing with polling");
                self.changes = None;
                thread::sleep(self.interval);
                Trigger::Tick
            }
        }
    }
}

impl Iterator for TriggerSource {
    type Item = Trigger;

    fn next(&mut self) -> Option<Trigger> {
        if !self.started {
            self.started = true;
            return Some(Trigger::Initial);
        }
        Some(self.wait())
    }
}
