//! Drift Monitor — reference/live distribution comparison per feature.
//!
//! Detects when a feature's live value distribution has moved away from its
//! stored reference distribution, using histogram KL-divergence:
//!
//! - **Fixed tracked set** — the feature map is built once at construction
//!   and never gains or loses keys afterward
//! - **Permissive ingestion** — payload keys outside the tracked set are
//!   counted and skipped, so callers can forward superset payloads
//! - **Caller-scheduled baselines** — `update_reference` copies live window
//!   contents over the reference; the monitor never schedules this itself
//! - **Threshold alerting** — exceedances found by `check_drift` are
//!   published through the [`AlertBus`]
//! - **Passive reporting** — `drift_report` scores without alerting
//!
//! All state sits behind one `RwLock` over the feature map, so `ingest`,
//! `update_reference`, and `check_drift` each observe a consistent snapshot
//! and never interleave mid-replacement.

use crate::alert::{AlertBus, AlertHandler, DriftAlert, Severity};
use crate::config::MonitorConfig;
use crate::divergence::kl_divergence;
use crate::error::{DriftError, DriftResult};
use crate::window::SampleWindow;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

// ── Feature State ────────────────────────────────────────────────────────────

/// Lifecycle of a feature's window pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FeatureStatus {
    /// Reference window is empty; scores against it are not meaningful yet
    Uninitialized,
    /// Reference populated (seeded or snapshotted), no live traffic yet
    Seeded,
    /// Both windows hold samples; drift scores are meaningful
    Evaluatable,
}

struct FeatureState {
    reference: SampleWindow,
    live: SampleWindow,
}

impl FeatureState {
    fn status(&self) -> FeatureStatus {
        if self.reference.is_empty() {
            FeatureStatus::Uninitialized
        } else if self.live.is_empty() {
            FeatureStatus::Seeded
        } else {
            FeatureStatus::Evaluatable
        }
    }
}

// ── Reports ──────────────────────────────────────────────────────────────────

/// One row of a [`DriftReport`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureDriftReport {
    pub feature: String,
    pub score: f64,
    /// Whether `score` exceeds the configured threshold
    pub exceeded: bool,
    pub status: FeatureStatus,
    pub reference_len: usize,
    pub live_len: usize,
    pub reference_mean: f64,
    pub live_mean: f64,
}

/// Point-in-time assessment across all tracked features.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DriftReport {
    /// Unix timestamp (seconds) when the report was generated
    pub generated_at: i64,
    pub threshold: f64,
    /// Per-feature rows, most drifted first
    pub features: Vec<FeatureDriftReport>,
}

// ── Drift Monitor ────────────────────────────────────────────────────────────

pub struct DriftMonitor {
    /// Per-feature window pairs, keys fixed at construction
    features: RwLock<HashMap<String, FeatureState>>,
    config: MonitorConfig,
    bus: AlertBus,
    /// Stats
    total_observations: AtomicU64,
    total_ignored: AtomicU64,
    total_checks: AtomicU64,
    total_alerts: AtomicU64,
}

impl DriftMonitor {
    /// Create a monitor tracking exactly `feature_names`. The set is
    /// immutable afterward; observations for other names are dropped.
    pub fn new<I, S>(feature_names: I, config: MonitorConfig) -> DriftResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;
        let features: HashMap<String, FeatureState> = feature_names
            .into_iter()
            .map(|name| {
                let state = FeatureState {
                    reference: SampleWindow::new(config.reference_capacity),
                    live: SampleWindow::new(config.live_capacity),
                };
                (name.into(), state)
            })
            .collect();

        info!(
            features = features.len(),
            reference_capacity = config.reference_capacity,
            live_capacity = config.live_capacity,
            bin_count = config.bin_count,
            threshold = config.threshold,
            "Drift monitor created"
        );

        Ok(Self {
            features: RwLock::new(features),
            config,
            bus: AlertBus::new(),
            total_observations: AtomicU64::new(0),
            total_ignored: AtomicU64::new(0),
            total_checks: AtomicU64::new(0),
            total_alerts: AtomicU64::new(0),
        })
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Push one observation event into the live windows.
    ///
    /// Every payload key in the tracked set has its value pushed onto that
    /// feature's live window; other keys are skipped without error. Tracked
    /// entries are validated before any window is touched, so a rejected
    /// payload leaves no partial state. Returns the number of values
    /// applied.
    pub fn ingest(&self, observations: &HashMap<String, f64>) -> DriftResult<usize> {
        let mut features = self.features.write();

        for (name, &value) in observations {
            if features.contains_key(name) && !value.is_finite() {
                return Err(DriftError::NonFiniteSample {
                    feature: name.clone(),
                    value,
                });
            }
        }

        let mut applied = 0usize;
        for (name, &value) in observations {
            match features.get_mut(name) {
                Some(state) => {
                    state.live.push(value);
                    applied += 1;
                }
                None => {
                    self.total_ignored.fetch_add(1, Ordering::Relaxed);
                    debug!(feature = %name, "Dropping observation for untracked feature");
                }
            }
        }
        self.total_observations.fetch_add(applied as u64, Ordering::Relaxed);
        Ok(applied)
    }

    /// Seed a feature's reference window before live traffic arrives.
    ///
    /// Replaces the current reference contents; when `samples` exceeds the
    /// reference capacity, only the most recent samples are retained.
    /// Unlike [`ingest`](Self::ingest), an unknown feature name is an error
    /// here: seeding is explicit setup, not a streaming payload. Returns
    /// the number of samples retained.
    pub fn seed_reference(&self, feature: &str, samples: &[f64]) -> DriftResult<usize> {
        let mut features = self.features.write();
        let state = features
            .get_mut(feature)
            .ok_or_else(|| DriftError::UnknownFeature(feature.to_string()))?;

        if let Some(&bad) = samples.iter().find(|v| !v.is_finite()) {
            return Err(DriftError::NonFiniteSample {
                feature: feature.to_string(),
                value: bad,
            });
        }

        state.reference.replace(samples);
        let retained = state.reference.len();
        debug!(feature = %feature, retained, "Reference window seeded");
        Ok(retained)
    }

    // ── Baselines ────────────────────────────────────────────────────────

    /// Re-baseline every feature: copy the live window's contents over the
    /// reference window (full overwrite, truncated to reference capacity).
    /// When to call this is the caller's business (periodic job, deploy
    /// hook, etc.).
    pub fn update_reference(&self) {
        let mut features = self.features.write();
        for (name, state) in features.iter_mut() {
            let live = state.live.snapshot();
            state.reference.replace(&live);
            debug!(
                feature = %name,
                samples = state.reference.len(),
                "Reference window refreshed from live"
            );
        }
        info!(features = features.len(), "Reference baselines updated");
    }

    // ── Drift Evaluation ─────────────────────────────────────────────────

    /// Score every feature and alert on threshold exceedances.
    ///
    /// Returns the full score map, sub-threshold features included. A
    /// feature with an empty window still gets a score (its histogram is
    /// all zeros); consult [`status`](Self::status) or
    /// [`drift_report`](Self::drift_report) to tell those apart from
    /// meaningful comparisons.
    ///
    /// Alerts go out after scoring completes and the feature lock is
    /// released, so subscriber callbacks may call back into the monitor;
    /// see [`on_alert`](Self::on_alert) for the remaining restriction.
    pub fn check_drift(&self) -> DriftResult<HashMap<String, f64>> {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        let now = chrono::Utc::now().timestamp();
        let features = self.features.read();
        let mut scores = HashMap::with_capacity(features.len());
        let mut exceedances = Vec::new();

        for (name, state) in features.iter() {
            let score = self.score(state)?;
            if score > self.config.threshold {
                exceedances.push(DriftAlert {
                    timestamp: now,
                    severity: severity_for(score, self.config.threshold),
                    feature: name.clone(),
                    score,
                    threshold: self.config.threshold,
                });
            } else {
                debug!(feature = %name, score, "Feature within drift threshold");
            }
            scores.insert(name.clone(), score);
        }
        drop(features);

        // Deliver outside the feature lock so handlers can call back in
        for alert in exceedances {
            self.total_alerts.fetch_add(1, Ordering::Relaxed);
            warn!(
                feature = %alert.feature,
                score = alert.score,
                threshold = alert.threshold,
                "Feature drift threshold exceeded"
            );
            self.bus.publish(alert);
        }
        Ok(scores)
    }

    /// Passive point-in-time assessment: same scoring as
    /// [`check_drift`](Self::check_drift), but nothing is published and no
    /// check counters move.
    pub fn drift_report(&self) -> DriftResult<DriftReport> {
        let features = self.features.read();
        let mut rows = Vec::with_capacity(features.len());

        for (name, state) in features.iter() {
            let score = self.score(state)?;
            rows.push(FeatureDriftReport {
                feature: name.clone(),
                score,
                exceeded: score > self.config.threshold,
                status: state.status(),
                reference_len: state.reference.len(),
                live_len: state.live.len(),
                reference_mean: state.reference.mean(),
                live_mean: state.live.mean(),
            });
        }
        rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(DriftReport {
            generated_at: chrono::Utc::now().timestamp(),
            threshold: self.config.threshold,
            features: rows,
        })
    }

    fn score(&self, state: &FeatureState) -> DriftResult<f64> {
        let reference = state.reference.histogram(self.config.bin_count);
        let live = state.live.histogram(self.config.bin_count);
        kl_divergence(&reference, &live, self.config.epsilon)
    }

    // ── Introspection ────────────────────────────────────────────────────

    /// Lifecycle status for one tracked feature.
    pub fn status(&self, feature: &str) -> DriftResult<FeatureStatus> {
        self.features
            .read()
            .get(feature)
            .map(|state| state.status())
            .ok_or_else(|| DriftError::UnknownFeature(feature.to_string()))
    }

    /// Tracked feature names, sorted.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.features.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn config(&self) -> &MonitorConfig { &self.config }

    // ── Alert Plumbing ───────────────────────────────────────────────────

    /// Register an external alert sink. See [`AlertBus::subscribe`].
    ///
    /// Handlers run synchronously on the thread calling
    /// [`check_drift`](Self::check_drift), after the feature lock has been
    /// released, so a handler may call back into the monitor. Delivery
    /// does hold the bus's subscription lock: a handler must not subscribe
    /// or unsubscribe from inside the callback.
    pub fn on_alert(&self, name: &str, min_severity: Option<Severity>, handler: AlertHandler) -> u64 {
        self.bus.subscribe(name, min_severity, handler)
    }

    /// Remove an alert sink by subscription ID.
    pub fn unsubscribe(&self, sub_id: u64) -> bool { self.bus.unsubscribe(sub_id) }

    /// Most recent alerts, newest first, up to `limit`.
    pub fn alerts(&self, limit: usize) -> Vec<DriftAlert> { self.bus.recent(limit) }

    pub fn alert_bus(&self) -> &AlertBus { &self.bus }

    // ── Stats ────────────────────────────────────────────────────────────

    pub fn total_observations(&self) -> u64 { self.total_observations.load(Ordering::Relaxed) }
    pub fn total_ignored(&self) -> u64 { self.total_ignored.load(Ordering::Relaxed) }
    pub fn total_checks(&self) -> u64 { self.total_checks.load(Ordering::Relaxed) }
    pub fn total_alerts(&self) -> u64 { self.total_alerts.load(Ordering::Relaxed) }
}

/// Grade an exceedance: twice the threshold or more is critical.
fn severity_for(score: f64, threshold: f64) -> Severity {
    if score >= threshold * 2.0 {
        Severity::Critical
    } else {
        Severity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64 as TestCounter;
    use std::sync::Arc;

    fn small_config() -> MonitorConfig {
        MonitorConfig {
            reference_capacity: 8,
            live_capacity: 8,
            bin_count: 4,
            threshold: 0.5,
            ..MonitorConfig::default()
        }
    }

    fn observation(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_ingest_tracked_and_untracked() {
        let monitor = DriftMonitor::new(["a", "b"], small_config()).unwrap();

        let applied = monitor
            .ingest(&observation(&[("a", 1.0), ("b", 2.0), ("ghost", 3.0)]))
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(monitor.total_observations(), 2);
        assert_eq!(monitor.total_ignored(), 1);

        // Untracked key altered no windows
        let report = monitor.drift_report().unwrap();
        assert_eq!(report.features.len(), 2);
        assert!(report.features.iter().all(|f| f.live_len == 1));
    }

    #[test]
    fn test_ingest_rejects_non_finite_without_partial_state() {
        let monitor = DriftMonitor::new(["a", "b"], small_config()).unwrap();

        let err = monitor
            .ingest(&observation(&[("a", 1.0), ("b", f64::NAN)]))
            .unwrap_err();
        assert!(matches!(err, DriftError::NonFiniteSample { .. }));

        let report = monitor.drift_report().unwrap();
        assert!(report.features.iter().all(|f| f.live_len == 0));
        assert_eq!(monitor.total_observations(), 0);
    }

    #[test]
    fn test_non_finite_in_untracked_key_is_ignored() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        let applied = monitor
            .ingest(&observation(&[("a", 1.0), ("ghost", f64::INFINITY)]))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_seed_reference_unknown_feature() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        let err = monitor.seed_reference("ghost", &[1.0]).unwrap_err();
        assert!(matches!(err, DriftError::UnknownFeature(name) if name == "ghost"));
    }

    #[test]
    fn test_seed_reference_rejects_non_finite() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        let err = monitor.seed_reference("a", &[1.0, f64::NEG_INFINITY]).unwrap_err();
        assert!(matches!(err, DriftError::NonFiniteSample { .. }));
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Uninitialized);
    }

    #[test]
    fn test_seed_reference_truncates_to_capacity() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        let samples: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let retained = monitor.seed_reference("a", &samples).unwrap();
        assert_eq!(retained, 8);

        // Most recent samples survive: 12..=19, mean 15.5
        let report = monitor.drift_report().unwrap();
        assert!((report.features[0].reference_mean - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_status_transitions() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Uninitialized);

        monitor.seed_reference("a", &[1.0, 2.0]).unwrap();
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Seeded);

        monitor.ingest(&observation(&[("a", 1.5)])).unwrap();
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Evaluatable);

        assert!(monitor.status("ghost").is_err());
    }

    #[test]
    fn test_update_reference_then_check_is_zero() {
        let monitor = DriftMonitor::new(["a", "b"], small_config()).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            monitor.ingest(&observation(&[("a", v), ("b", v * 10.0)])).unwrap();
        }

        monitor.update_reference();
        let scores = monitor.check_drift().unwrap();
        assert!(scores["a"].abs() < 1e-9);
        assert!(scores["b"].abs() < 1e-9);
        assert!(monitor.alerts(10).is_empty());
    }

    #[test]
    fn test_update_reference_with_empty_live_empties_reference() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        monitor.seed_reference("a", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Seeded);

        // Full overwrite: a live window with no traffic wipes the seeded
        // reference rather than preserving it
        monitor.update_reference();
        assert_eq!(monitor.status("a").unwrap(), FeatureStatus::Uninitialized);

        let scores = monitor.check_drift().unwrap();
        assert_eq!(scores["a"], 0.0);
        assert!(monitor.alerts(10).is_empty());
        assert_eq!(monitor.total_alerts(), 0);

        let report = monitor.drift_report().unwrap();
        assert_eq!(report.features[0].reference_len, 0);
        assert!(!report.features[0].exceeded);
    }

    #[test]
    fn test_check_drift_alerts_on_exceedance() {
        let monitor = DriftMonitor::new(["a"], small_config()).unwrap();
        let counter = Arc::new(TestCounter::new(0));
        let c = counter.clone();
        monitor.on_alert("test_sink", None, Arc::new(move |alert| {
            assert_eq!(alert.feature, "a");
            c.fetch_add(1, Ordering::Relaxed);
        }));

        monitor.seed_reference("a", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        // Constant live window concentrates all mass in one bin
        for _ in 0..4 {
            monitor.ingest(&observation(&[("a", 9.0)])).unwrap();
        }

        let scores = monitor.check_drift().unwrap();
        assert!(scores["a"] > 0.5);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(monitor.total_alerts(), 1);

        let alerts = monitor.alerts(10);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].feature, "a");
        assert_eq!(alerts[0].severity, Severity::Critical); // far past 2x threshold
        assert_eq!(alerts[0].threshold, 0.5);
    }

    #[test]
    fn test_alert_handler_may_reenter_monitor() {
        let monitor = Arc::new(DriftMonitor::new(["a"], small_config()).unwrap());

        // A sink that reacts to drift by feeding the monitor; ingest takes
        // the feature write lock, so this deadlocks unless alerts are
        // delivered with that lock released
        let inner = Arc::clone(&monitor);
        monitor.on_alert("feedback_sink", None, Arc::new(move |alert| {
            let obs = HashMap::from([(alert.feature.clone(), 9.0)]);
            inner.ingest(&obs).unwrap();
        }));

        monitor.seed_reference("a", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for _ in 0..4 {
            monitor.ingest(&observation(&[("a", 9.0)])).unwrap();
        }

        let scores = monitor.check_drift().unwrap();
        assert!(scores["a"] > 0.5);
        // 4 direct ingests plus 1 from inside the handler
        assert_eq!(monitor.total_observations(), 5);
        assert_eq!(monitor.alerts(10).len(), 1);
    }

    #[test]
    fn test_check_drift_returns_sub_threshold_scores() {
        let monitor = DriftMonitor::new(["quiet"], small_config()).unwrap();
        monitor.seed_reference("quiet", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            monitor.ingest(&observation(&[("quiet", v)])).unwrap();
        }

        let scores = monitor.check_drift().unwrap();
        assert!(scores.contains_key("quiet"));
        assert!(scores["quiet"].abs() < 1e-9); // identical distributions
        assert!(monitor.alerts(10).is_empty());
        assert_eq!(monitor.total_checks(), 1);
    }

    #[test]
    fn test_drift_report_ranks_most_drifted_first() {
        let monitor = DriftMonitor::new(["stable", "shifty"], small_config()).unwrap();
        for f in ["stable", "shifty"] {
            monitor.seed_reference(f, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        }
        for v in [1.0, 2.0, 3.0, 4.0] {
            monitor.ingest(&observation(&[("stable", v), ("shifty", 50.0)])).unwrap();
        }

        let report = monitor.drift_report().unwrap();
        assert_eq!(report.features[0].feature, "shifty");
        assert!(report.features[0].exceeded);
        assert!(!report.features[1].exceeded);
        assert_eq!(report.features[0].status, FeatureStatus::Evaluatable);
        assert_eq!(report.threshold, 0.5);
        // Passive: no alerts were published
        assert!(monitor.alerts(10).is_empty());
        assert_eq!(monitor.total_checks(), 0);
    }

    #[test]
    fn test_empty_feature_set() {
        let monitor = DriftMonitor::new(Vec::<String>::new(), small_config()).unwrap();
        assert!(monitor.feature_names().is_empty());
        monitor.update_reference();
        assert!(monitor.check_drift().unwrap().is_empty());
        assert!(monitor.drift_report().unwrap().features.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = small_config();
        config.bin_count = 0;
        assert!(DriftMonitor::new(["a"], config).is_err());
    }

    #[test]
    fn test_feature_names_sorted() {
        let monitor = DriftMonitor::new(["zeta", "alpha", "mid"], small_config()).unwrap();
        assert_eq!(monitor.feature_names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_severity_grading() {
        assert_eq!(severity_for(0.6, 0.5), Severity::High);
        assert_eq!(severity_for(0.99, 0.5), Severity::High);
        assert_eq!(severity_for(1.0, 0.5), Severity::Critical);
        assert_eq!(severity_for(12.0, 0.5), Severity::Critical);
    }
}
