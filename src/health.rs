//! HealthGate: a circuit breaker over search-backend health
//!
//! The gate caches a routing verdict for the query path and re-probes the
//! cluster on an exponentially lengthening schedule. Readers may observe a
//! stale verdict between probes; a single-flight guard keeps at most one
//! probe in flight.

use crate::backend::SearchBackend;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base re-probe interval
const BACKOFF_BASE: Duration = Duration::from_secs(30);

/// Added per consecutive failure
const BACKOFF_STEP: Duration = Duration::from_secs(10);

/// Re-probe interval ceiling
const BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Cached routing verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Unknown,
    Up,
    Down,
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Unknown => write!(f, "unknown"),
            GateStatus::Up => write!(f, "up"),
            GateStatus::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone)]
struct GateState {
    status: GateStatus,
    last_check: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

/// A point-in-time copy of the gate's state
#[derive(Debug, Clone)]
pub struct GateSnapshot {
    pub status: GateStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// Stateful circuit breaker around backend health checks
#[derive(Clone)]
pub struct HealthGate {
    backend: Arc<dyn SearchBackend>,
    state: Arc<RwLock<GateState>>,
    /// Probe deadline; a healthy answer slower than this counts as DOWN
    probe_timeout: Duration,
    /// Single-flight guard: at most one probe in flight
    probe_lock: Arc<tokio::sync::Mutex<()>>,
}

impl HealthGate {
    pub fn new(backend: Arc<dyn SearchBackend>, probe_timeout: Duration) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(GateState {
                status: GateStatus::Unknown,
                last_check: None,
                consecutive_failures: 0,
            })),
            probe_timeout,
            probe_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Current routing verdict. Returns the cached value between probes;
    /// probes the backend when the re-probe interval has elapsed.
    pub async fn is_available(&self) -> bool {
        let (needs_probe, cached) = {
            let state = self.state.read();
            let due = match state.last_check {
                None => true,
                Some(last) => {
                    let interval = backoff_interval(state.consecutive_failures);
                    Utc::now()
                        .signed_duration_since(last)
                        .to_std()
                        .map(|elapsed| elapsed >= interval)
                        .unwrap_or(true)
                }
            };
            (due, state.status == GateStatus::Up)
        };

        if !needs_probe {
            return cached;
        }

        // Single flight: when a probe is already running, answer from the
        // cache instead of piling on.
        match self.probe_lock.try_lock() {
            Ok(_guard) => self.probe().await,
            Err(_) => cached,
        }
    }

    /// Record a backend failure observed outside the probe path (e.g. a
    /// search request timing out)
    pub fn record_failure(&self) {
        let mut state = self.state.write();
        state.status = GateStatus::Down;
        state.last_check = Some(Utc::now());
        state.consecutive_failures += 1;
        warn!(
            consecutive_failures = state.consecutive_failures,
            "Search backend failure recorded; gate down"
        );
    }

    /// Run one health probe and update the verdict
    async fn probe(&self) -> bool {
        let verdict = match self.backend.cluster_health(None, self.probe_timeout).await {
            Ok(health) => {
                let healthy = health.status.is_operational() && health.elapsed < self.probe_timeout;
                if !healthy {
                    debug!(
                        status = %health.status,
                        elapsed_ms = health.elapsed.as_millis() as u64,
                        "Probe answered but backend is degraded"
                    );
                }
                healthy
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        };

        let mut state = self.state.write();
        let previous = state.status;
        state.last_check = Some(Utc::now());
        if verdict {
            state.status = GateStatus::Up;
            state.consecutive_failures = 0;
        } else {
            state.status = GateStatus::Down;
            state.consecutive_failures += 1;
        }

        if previous != state.status {
            info!(
                from = %previous,
                to = %state.status,
                consecutive_failures = state.consecutive_failures,
                "HealthGate state transition"
            );
        }

        verdict
    }

    /// Snapshot of the gate's state for diagnostics
    pub fn snapshot(&self) -> GateSnapshot {
        let state = self.state.read();
        GateSnapshot {
            status: state.status,
            last_check: state.last_check,
            consecutive_failures: state.consecutive_failures,
        }
    }
}

/// Re-probe interval: lengthens by 10s per consecutive failure, capped at
/// five minutes
fn backoff_interval(consecutive_failures: u32) -> Duration {
    (BACKOFF_BASE + BACKOFF_STEP * consecutive_failures).min(BACKOFF_CAP)
}
