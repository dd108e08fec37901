//! Sliding-window security event monitor.
//!
//! # Responsibilities
//! - Record security events per `(event_type, identifier)`
//! - Report when a key reaches its configured threshold
//! - Answer window queries and operator purges
//!
//! # Data Flow
//! ```text
//! record_event(type, id, metadata)
//!     → DashMap entry (shard lock held for this key only)
//!     → prune events with age >= window
//!     → append, count
//!     → ThresholdOutcome { exceeded: count >= threshold, count }
//! ```
//!
//! # Design Decisions
//! - Per-key atomicity via the entry guard; distinct keys never contend on
//!   a global lock
//! - Every exceeding call is logged, no debouncing
//! - Empty windows are dropped on access; `purge_expired` sweeps the rest
//! - Time comes from an injected [`Clock`]

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::metrics;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Window length and threshold for one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowPolicy {
    /// Sliding window length in seconds.
    pub window_secs: u64,
    /// Count at which the key is reported as exceeded.
    pub threshold: u32,
}

impl WindowPolicy {
    pub const fn new(window_secs: u64, threshold: u32) -> Self {
        Self {
            window_secs,
            threshold,
        }
    }

    fn window(&self) -> Duration {
        i64::try_from(self.window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::new(300, 5)
    }
}

/// Policies keyed by event type, with a fallback for unknown types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicies {
    default_policy: WindowPolicy,
    event_types: BTreeMap<String, WindowPolicy>,
}

impl MonitorPolicies {
    pub fn new(default_policy: WindowPolicy, event_types: BTreeMap<String, WindowPolicy>) -> Self {
        Self {
            default_policy,
            event_types,
        }
    }

    /// The site's standard policies.
    pub fn standard() -> Self {
        let event_types = [
            ("failedLogins", WindowPolicy::new(300, 5)),
            ("suspiciousRequests", WindowPolicy::new(60, 10)),
            ("csrfViolations", WindowPolicy::new(300, 3)),
            ("invalidSignature", WindowPolicy::new(300, 5)),
            ("validationFailures", WindowPolicy::new(60, 20)),
            ("registration", WindowPolicy::new(3600, 5)),
            ("api", WindowPolicy::new(900, 100)),
            ("emailSend", WindowPolicy::new(3600, 10)),
            ("passwordReset", WindowPolicy::new(3600, 3)),
        ]
        .into_iter()
        .map(|(name, policy)| (name.to_string(), policy))
        .collect();
        Self::new(WindowPolicy::default(), event_types)
    }

    pub fn policy_for(&self, event_type: &str) -> WindowPolicy {
        self.event_types
            .get(event_type)
            .copied()
            .unwrap_or(self.default_policy)
    }

    pub fn default_policy(&self) -> WindowPolicy {
        self.default_policy
    }

    pub fn event_types(&self) -> &BTreeMap<String, WindowPolicy> {
        &self.event_types
    }
}

impl Default for MonitorPolicies {
    fn default() -> Self {
        Self::standard()
    }
}

/// One recorded occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Result of [`SecurityEventMonitor::record_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdOutcome {
    pub exceeded: bool,
    pub count: usize,
}

/// Result of [`SecurityEventMonitor::query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub count: usize,
    pub events: Vec<SecurityEvent>,
}

/// Monitor-wide counts for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub tracked_keys: usize,
    pub total_events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey(String, String);

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[derive(Debug)]
struct EventWindow {
    policy: WindowPolicy,
    events: VecDeque<SecurityEvent>,
}

impl EventWindow {
    fn new(policy: WindowPolicy) -> Self {
        Self {
            policy,
            events: VecDeque::new(),
        }
    }

    /// Drop events whose age reached the window. Events are kept in
    /// timestamp order, so pruning stops at the first survivor.
    fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.policy.window();
        while self
            .events
            .front()
            .is_some_and(|event| now - event.timestamp >= window)
        {
            self.events.pop_front();
        }
    }
}

/// In-memory sliding-window counter of security events.
pub struct SecurityEventMonitor {
    windows: DashMap<WindowKey, EventWindow>,
    policies: MonitorPolicies,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SecurityEventMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityEventMonitor")
            .field("tracked_keys", &self.windows.len())
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

impl SecurityEventMonitor {
    pub fn new(policies: MonitorPolicies) -> Self {
        Self::with_clock(policies, Arc::new(SystemClock))
    }

    pub fn with_clock(policies: MonitorPolicies, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            policies,
            clock,
        }
    }

    pub fn policies(&self) -> &MonitorPolicies {
        &self.policies
    }

    /// Record one event and report whether the key is over threshold.
    pub fn record_event(&self, event_type: &str, identifier: &str, metadata: Option<Value>) -> ThresholdOutcome {
        let key = WindowKey(event_type.to_string(), identifier.to_string());
        let policy = self.policies.policy_for(event_type);

        let count = {
            let mut window = self
                .windows
                .entry(key.clone())
                .or_insert_with(|| EventWindow::new(policy));
            let now = self.clock.now();
            window.prune(now);
            window.events.push_back(SecurityEvent {
                timestamp: now,
                metadata,
            });
            window.events.len()
        };

        let threshold = usize::try_from(policy.threshold).unwrap_or(usize::MAX);
        let exceeded = count >= threshold;

        metrics::record_security_event(event_type);
        metrics::set_tracked_windows(self.windows.len());

        if exceeded {
            tracing::warn!(
                event_type = %event_type,
                identifier = %identifier,
                count = count,
                threshold = policy.threshold,
                window_secs = policy.window_secs,
                "Security threshold exceeded"
            );
            metrics::record_threshold_exceeded(event_type);
        } else {
            tracing::debug!(key = %key, count = count, "Security event recorded");
        }

        ThresholdOutcome { exceeded, count }
    }

    /// Current window contents for a key. Prunes as a side effect and drops
    /// the window once it is empty.
    pub fn query(&self, event_type: &str, identifier: &str) -> WindowSnapshot {
        let key = WindowKey(event_type.to_string(), identifier.to_string());
        let now = self.clock.now();

        let snapshot = match self.windows.get_mut(&key) {
            Some(mut window) => {
                window.prune(now);
                WindowSnapshot {
                    count: window.events.len(),
                    events: window.events.iter().cloned().collect(),
                }
            }
            None => {
                return WindowSnapshot {
                    count: 0,
                    events: Vec::new(),
                }
            }
        };

        if snapshot.count == 0 {
            self.windows.remove_if(&key, |_, window| window.events.is_empty());
            metrics::set_tracked_windows(self.windows.len());
        }
        snapshot
    }

    /// Prune every window and drop the empty ones. Returns how many were
    /// dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(now);
            !window.events.is_empty()
        });
        let dropped = before.saturating_sub(self.windows.len());
        metrics::set_tracked_windows(self.windows.len());
        tracing::info!(dropped = dropped, remaining = self.windows.len(), "Expired windows purged");
        dropped
    }

    pub fn stats(&self) -> MonitorStats {
        let total_events = self.windows.iter().map(|entry| entry.events.len()).sum();
        MonitorStats {
            tracked_keys: self.windows.len(),
            total_events,
        }
    }
}

impl Default for SecurityEventMonitor {
    fn default() -> Self {
        Self::new(MonitorPolicies::standard())
    }
}
