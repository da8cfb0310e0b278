//! # Driftwatch — streaming feature drift detection
//!
//! Tracks per-feature numeric observations from a live model-serving
//! pipeline against stored reference distributions, and flags features whose
//! histogram KL-divergence exceeds a configurable threshold. Built as a
//! lightweight monitoring sidecar:
//!
//! - **Bounded windows** — fixed-capacity FIFO sample buffers per feature,
//!   one reference and one live
//! - **Histogram estimation** — fixed-bin probability mass with explicit
//!   policies for empty and constant-valued windows
//! - **Approximate KL scoring** — epsilon-smoothed and asymmetric; a
//!   relative measure for ranking and thresholding
//! - **Threshold alerting** — publish/subscribe [`AlertBus`] with a bounded
//!   in-memory alert log
//! - **Caller-driven lifecycle** — ingestion, reference snapshotting, and
//!   drift checks are all invoked by the embedding pipeline; the crate
//!   schedules nothing itself
//!
//! ```rust
//! use driftwatch::{DriftMonitor, MonitorConfig};
//! use std::collections::HashMap;
//!
//! let monitor = DriftMonitor::new(["latency_ms"], MonitorConfig::default())?;
//! monitor.seed_reference("latency_ms", &[12.0, 14.0, 13.5, 15.2])?;
//! monitor.ingest(&HashMap::from([("latency_ms".to_string(), 13.9)]))?;
//! let scores = monitor.check_drift()?;
//! assert!(scores.contains_key("latency_ms"));
//! # Ok::<(), driftwatch::DriftError>(())
//! ```

pub mod alert;
pub mod config;
pub mod divergence;
pub mod error;
pub mod histogram;
pub mod monitor;
pub mod window;


pub use alert::{AlertBus, AlertHandler, DriftAlert, Severity};
pub use config::MonitorConfig;
pub use divergence::{kl_divergence, DEFAULT_EPSILON};
pub use error::{DriftError, DriftResult};
pub use monitor::{DriftMonitor, DriftReport, FeatureDriftReport, FeatureStatus};
pub use window::SampleWindow;
