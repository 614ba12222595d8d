//! In-process stores for thresholds, alert history, and delivery logs
//!
//! The registry, evaluator, and dispatcher take these as trait objects so a
//! durable backend can be swapped in without touching the core. The memory
//! implementations guard every collection with a lock; the runtime is
//! multi-threaded tokio.

use parking_lot::RwLock;
use std::collections::VecDeque;

use crate::models::{AlertEvent, Threshold, WebhookLog};

/// Cap for the alert event history
pub const DEFAULT_EVENT_CAP: usize = 100;

/// Cap for the webhook delivery log
pub const DEFAULT_LOG_CAP: usize = 100;

/// Storage for threshold rules
pub trait ThresholdStore: Send + Sync {
    /// All thresholds in insertion order
    fn list(&self) -> Vec<Threshold>;

    /// Look up a threshold by id
    fn get(&self, id: &str) -> Option<Threshold>;

    /// Append a new threshold
    fn insert(&self, threshold: Threshold);

    /// Replace the record with the same id; `false` when absent
    fn replace(&self, threshold: Threshold) -> bool;

    /// Remove by id; `false` when absent
    fn remove(&self, id: &str) -> bool;

    /// Replace the entire set
    fn replace_all(&self, thresholds: Vec<Threshold>);
}

/// Storage for alert event history (most recent first)
pub trait EventStore: Send + Sync {
    /// Prepend a batch of new events, dropping the oldest past the cap.
    /// Batch order is preserved at the front of the history.
    fn prepend(&self, events: &[AlertEvent]);

    /// Full history, most recent first
    fn list(&self) -> Vec<AlertEvent>;

    /// Mark an event acknowledged. Idempotent; `true` for any known id,
    /// `false` when the id is unknown.
    fn acknowledge(&self, id: &str) -> bool;

    /// Mark every unacknowledged event; returns the number transitioned
    fn acknowledge_all(&self) -> usize;
}

/// Storage for webhook delivery records
pub trait LogStore: Send + Sync {
    /// Append a record, dropping the oldest past the cap
    fn append(&self, log: WebhookLog);

    /// All records in insertion order
    fn list(&self) -> Vec<WebhookLog>;
}

/// Lock-guarded in-memory threshold store
#[derive(Default)]
pub struct MemoryThresholdStore {
    thresholds: RwLock<Vec<Threshold>>,
}

impl MemoryThresholdStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThresholdStore for MemoryThresholdStore {
    fn list(&self) -> Vec<Threshold> {
        self.thresholds.read().clone()
    }

    fn get(&self, id: &str) -> Option<Threshold> {
        self.thresholds.read().iter().find(|t| t.id == id).cloned()
    }

    fn insert(&self, threshold: Threshold) {
        self.thresholds.write().push(threshold);
    }

    fn replace(&self, threshold: Threshold) -> bool {
        let mut thresholds = self.thresholds.write();
        match thresholds.iter_mut().find(|t| t.id == threshold.id) {
            Some(slot) => {
                *slot = threshold;
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: &str) -> bool {
        let mut thresholds = self.thresholds.write();
        let before = thresholds.len();
        thresholds.retain(|t| t.id != id);
        thresholds.len() < before
    }

    fn replace_all(&self, new: Vec<Threshold>) {
        *self.thresholds.write() = new;
    }
}

/// Lock-guarded in-memory event history with a fixed cap
pub struct MemoryEventStore {
    events: RwLock<VecDeque<AlertEvent>>,
    cap: usize,
}

impl MemoryEventStore {
    /// Create a store with the default cap
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_EVENT_CAP)
    }

    /// Create a store holding at most `cap` events
    pub fn with_cap(cap: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            cap,
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    fn prepend(&self, new: &[AlertEvent]) {
        let mut events = self.events.write();
        for event in new.iter().rev() {
            events.push_front(event.clone());
        }
        events.truncate(self.cap);
    }

    fn list(&self) -> Vec<AlertEvent> {
        self.events.read().iter().cloned().collect()
    }

    fn acknowledge(&self, id: &str) -> bool {
        let mut events = self.events.write();
        match events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.acknowledged = true;
                true
            }
            None => false,
        }
    }

    fn acknowledge_all(&self) -> usize {
        let mut events = self.events.write();
        let mut transitioned = 0;
        for event in events.iter_mut() {
            if !event.acknowledged {
                event.acknowledged = true;
                transitioned += 1;
            }
        }
        transitioned
    }
}

/// Lock-guarded in-memory delivery log with a fixed cap
pub struct MemoryLogStore {
    logs: RwLock<VecDeque<WebhookLog>>,
    cap: usize,
}

impl MemoryLogStore {
    /// Create a store with the default cap
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_LOG_CAP)
    }

    /// Create a store holding at most `cap` records
    pub fn with_cap(cap: usize) -> Self {
        Self {
            logs: RwLock::new(VecDeque::new()),
            cap,
        }
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, log: WebhookLog) {
        let mut logs = self.logs.write();
        logs.push_back(log);
        while logs.len() > self.cap {
            logs.pop_front();
        }
    }

    fn list(&self) -> Vec<WebhookLog> {
        self.logs.read().iter().cloned().collect()
    }
}
