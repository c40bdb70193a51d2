//! Cooldown and frequency tracking for dispatched alerts.
//!
//! Per alert key (`service:message`) the tracker remembers when it last
//! fired and how often it fired. Entries are never evicted implicitly; the
//! map grows with the number of distinct keys until [`AlertTracker::prune`]
//! is called.
//!
//! The cooldown check and the post-dispatch update are two separate critical
//! sections, so two identical alerts racing through the dispatcher may both
//! pass the check before either is recorded.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use bulwark_domain::constants::RECENT_VOLUME_WINDOW_SECS;
use bulwark_domain::{Alert, AlertLevel};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Frequency record for one alert key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedAlert {
    /// Alert key, `service:message`.
    pub key: String,
    /// Times the key was routed.
    pub occurrences: u64,
    /// Monotonic time of the latest occurrence.
    pub last_seen: Instant,
    /// Wall-clock time of the latest occurrence.
    pub last_occurrence: DateTime<Utc>,
}

/// Point-in-time copy of the tracker's counters.
#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    /// One record per tracked alert key.
    pub entries: Vec<TrackedAlert>,
    /// Alerts routed so far.
    pub total_processed: u64,
    /// Alerts dropped by the cooldown.
    pub suppressed: u64,
    /// Routed alerts per level.
    pub by_level: BTreeMap<AlertLevel, u64>,
    /// Routed alerts per service.
    pub by_service: BTreeMap<String, u64>,
    /// Alerts routed within the last hour.
    pub last_hour: u64,
}

#[derive(Debug, Default)]
struct TrackerInner {
    keys: HashMap<String, TrackedAlert>,
    rule_fires: HashMap<(String, String), Instant>,
    recent: VecDeque<Instant>,
    total_processed: u64,
    suppressed: u64,
    by_level: BTreeMap<AlertLevel, u64>,
    by_service: BTreeMap<String, u64>,
}

impl TrackerInner {
    fn trim_recent(&mut self, now: Instant) {
        let window = recent_window();
        while self.recent.front().is_some_and(|at| now.saturating_duration_since(*at) > window) {
            self.recent.pop_front();
        }
    }
}

fn recent_window() -> Duration {
    Duration::from_secs(RECENT_VOLUME_WINDOW_SECS)
}

fn within(now: Instant, then: Instant, window: Duration) -> bool {
    now.saturating_duration_since(then) < window
}

/// Cooldown and frequency bookkeeping shared by all dispatches.
#[derive(Debug, Default)]
pub struct AlertTracker {
    inner: Mutex<TrackerInner>,
}

impl AlertTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` fired less than `cooldown` ago.
    pub fn in_cooldown(&self, key: &str, now: Instant, cooldown: Duration) -> bool {
        self.inner.lock().keys.get(key).is_some_and(|entry| within(now, entry.last_seen, cooldown))
    }

    /// Whether `rule_id` fired for `key` less than `cooldown` ago.
    pub fn rule_in_cooldown(
        &self,
        rule_id: &str,
        key: &str,
        now: Instant,
        cooldown: Duration,
    ) -> bool {
        self.inner
            .lock()
            .rule_fires
            .get(&(rule_id.to_string(), key.to_string()))
            .is_some_and(|at| within(now, *at, cooldown))
    }

    /// Count an alert dropped by the cooldown.
    pub fn record_suppressed(&self) {
        self.inner.lock().suppressed += 1;
    }

    /// Record a routed alert and the rules that contributed channels to it.
    pub fn record_dispatch(
        &self,
        alert: &Alert,
        key: &str,
        fired_rules: &[String],
        now: Instant,
        wall_now: DateTime<Utc>,
    ) {
        let mut inner = self.inner.lock();

        let entry = inner.keys.entry(key.to_string()).or_insert_with(|| TrackedAlert {
            key: key.to_string(),
            occurrences: 0,
            last_seen: now,
            last_occurrence: wall_now,
        });
        entry.occurrences += 1;
        entry.last_seen = now;
        entry.last_occurrence = wall_now;

        for rule_id in fired_rules {
            inner.rule_fires.insert((rule_id.clone(), key.to_string()), now);
        }

        inner.total_processed += 1;
        *inner.by_level.entry(alert.level).or_default() += 1;
        *inner.by_service.entry(alert.service_or_unknown().to_string()).or_default() += 1;
        inner.recent.push_back(now);
        inner.trim_recent(now);
    }

    /// Copy of the counters as of `now`.
    pub fn snapshot(&self, now: Instant) -> TrackerSnapshot {
        let mut inner = self.inner.lock();
        inner.trim_recent(now);

        TrackerSnapshot {
            entries: inner.keys.values().cloned().collect(),
            total_processed: inner.total_processed,
            suppressed: inner.suppressed,
            by_level: inner.by_level.clone(),
            by_service: inner.by_service.clone(),
            last_hour: inner.recent.len() as u64,
        }
    }

    /// Drop keys and rule firings last seen more than `older_than` ago.
    /// Returns the number of alert keys removed.
    pub fn prune(&self, older_than: Duration, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.keys.len();
        inner.keys.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= older_than);
        inner.rule_fires.retain(|_, at| now.saturating_duration_since(*at) <= older_than);
        before - inner.keys.len()
    }

    /// Number of alert keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().keys.len()
    }
}
