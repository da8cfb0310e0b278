//! # Alert Bus — drift exceedance routing to external sinks
//!
//! The monitor publishes a [`DriftAlert`] whenever a feature's divergence
//! score exceeds the configured threshold. Delivery is in-process and
//! synchronous: sinks (log shipper, pager bridge, etc.) register a callback
//! and forward however they like. Every alert also lands in a bounded
//! in-memory log for later inspection.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum alerts held in the in-memory log before oldest are pruned.
const MAX_ALERT_LOG: usize = 5_000;
/// Maximum registered subscribers.
const MAX_SUBSCRIBERS: usize = 64;

// ── Alert Types ──────────────────────────────────────────────────────────────

/// Severity levels, ordered so subscribers can set a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// A threshold exceedance for one tracked feature.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DriftAlert {
    /// Unix timestamp (seconds) when the exceedance was observed
    pub timestamp: i64,
    /// Severity graded from how far the score exceeds the threshold
    pub severity: Severity,
    /// The drifting feature
    pub feature: String,
    /// The divergence score that tripped the threshold
    pub score: f64,
    /// The threshold in force when the alert fired
    pub threshold: f64,
}

// ── Subscriber ───────────────────────────────────────────────────────────────

/// A subscriber callback invoked synchronously for each published alert.
pub type AlertHandler = Arc<dyn Fn(&DriftAlert) + Send + Sync>;

struct Subscription {
    id: u64,
    name: String,
    min_severity: Option<Severity>,
    handler: AlertHandler,
}

// ── Alert Bus ────────────────────────────────────────────────────────────────

/// In-process alert channel with a bounded log.
pub struct AlertBus {
    /// All subscriptions
    subscriptions: RwLock<Vec<Subscription>>,
    /// Recent alert log (ring buffer semantics via pruning)
    alert_log: RwLock<Vec<DriftAlert>>,
    /// Monotonic subscription ID counter
    next_sub_id: AtomicU64,
    /// Stats
    total_published: AtomicU64,
    total_delivered: AtomicU64,
    total_dropped: AtomicU64,
}

impl AlertBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            alert_log: RwLock::new(Vec::with_capacity(256)),
            next_sub_id: AtomicU64::new(1),
            total_published: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
        }
    }

    // ── Publishing ───────────────────────────────────────────────────────

    /// Publish an alert: deliver to every subscriber whose severity floor
    /// matches, then append to the bounded log.
    ///
    /// Delivery is synchronous under the subscription lock; a handler that
    /// calls [`subscribe`](Self::subscribe) or
    /// [`unsubscribe`](Self::unsubscribe) from inside the callback will
    /// deadlock.
    pub fn publish(&self, alert: DriftAlert) {
        self.total_published.fetch_add(1, Ordering::Relaxed);

        debug!(
            feature = %alert.feature,
            score = alert.score,
            sev = ?alert.severity,
            "Alert published"
        );

        let subs = self.subscriptions.read();
        for sub in subs.iter() {
            if sub.min_severity.map_or(true, |floor| alert.severity >= floor) {
                (sub.handler)(&alert);
                self.total_delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
        drop(subs);

        let mut log = self.alert_log.write();
        if log.len() >= MAX_ALERT_LOG {
            log.remove(0);
            self.total_dropped.fetch_add(1, Ordering::Relaxed);
        }
        log.push(alert);
    }

    // ── Subscribing ──────────────────────────────────────────────────────

    /// Register a sink. `min_severity` of `None` receives everything.
    /// Returns a subscription ID for later unsubscribe.
    pub fn subscribe(&self, name: &str, min_severity: Option<Severity>, handler: AlertHandler) -> u64 {
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write();
        if subs.len() >= MAX_SUBSCRIBERS {
            warn!(name = %subs[0].name, "Max alert subscribers reached, dropping oldest");
            subs.remove(0);
        }
        subs.push(Subscription {
            id,
            name: name.into(),
            min_severity,
            handler,
        });
        id
    }

    /// Remove a subscription by ID.
    pub fn unsubscribe(&self, sub_id: u64) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != sub_id);
        subs.len() < before
    }

    // ── Querying ─────────────────────────────────────────────────────────

    /// Most recent alerts, newest first, up to `limit`.
    pub fn recent(&self, limit: usize) -> Vec<DriftAlert> {
        let log = self.alert_log.read();
        log.iter().rev().take(limit).cloned().collect()
    }

    /// Registered sink names, in subscription order.
    pub fn subscriber_names(&self) -> Vec<String> {
        self.subscriptions.read().iter().map(|s| s.name.clone()).collect()
    }

    // ── Stats ────────────────────────────────────────────────────────────

    pub fn total_published(&self) -> u64 { self.total_published.load(Ordering::Relaxed) }
    pub fn total_delivered(&self) -> u64 { self.total_delivered.load(Ordering::Relaxed) }
    pub fn total_dropped(&self) -> u64 { self.total_dropped.load(Ordering::Relaxed) }
    pub fn log_size(&self) -> usize { self.alert_log.read().len() }
    pub fn subscriber_count(&self) -> usize { self.subscriptions.read().len() }
}
