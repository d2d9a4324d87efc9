//! Per-backend usage statistics and health
//!
//! Counters are updated by the orchestrator around every backend attempt.
//! Health is derived from consecutive failures: one or two failures in a
//! row mark a backend degraded, three or more mark it unavailable, and the
//! next success restores it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Consecutive failures after which a backend is reported unavailable
pub const UNAVAILABLE_AFTER: u32 = 3;

/// Coarse health of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Available,
    Degraded,
    Unavailable,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderStatus::Available => "available",
            ProviderStatus::Degraded => "degraded",
            ProviderStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Usage counters for one backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub name: String,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,

    /// Mean latency over successful calls only
    pub average_response_time_ms: f64,

    pub last_used: Option<DateTime<Utc>>,
    pub status: ProviderStatus,
    pub consecutive_failures: u32,
}

impl ProviderStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requests: 0,
            successes: 0,
            failures: 0,
            average_response_time_ms: 0.0,
            last_used: None,
            status: ProviderStatus::Available,
            consecutive_failures: 0,
        }
    }

    /// Fraction of requests that succeeded, 0.0 before any request
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successes as f64 / self.requests as f64
        }
    }

    fn score(&self) -> f64 {
        self.success_rate() * 100.0 - self.average_response_time_ms / 1000.0
    }
}

/// Health summary for one backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub name: String,
    pub status: ProviderStatus,
    pub healthy: bool,
    pub success_rate: f64,
    pub average_response_time_ms: f64,
    pub consecutive_failures: u32,
}

impl From<&ProviderStats> for ProviderHealth {
    fn from(stats: &ProviderStats) -> Self {
        Self {
            name: stats.name.clone(),
            status: stats.status,
            healthy: stats.status == ProviderStatus::Available,
            success_rate: stats.success_rate(),
            average_response_time_ms: stats.average_response_time_ms,
            consecutive_failures: stats.consecutive_failures,
        }
    }
}

/// Tracks stats for a fixed list of backends, in registration order
pub struct HealthTracker {
    stats: Mutex<Vec<ProviderStats>>,
}

impl HealthTracker {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stats = names
            .into_iter()
            .map(|name| ProviderStats::new(name.as_ref()))
            .collect();
        Self {
            stats: Mutex::new(stats),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProviderStats>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut ProviderStats)) {
        let mut stats = self.lock();
        match stats.iter_mut().find(|s| s.name == name) {
            Some(entry) => f(entry),
            None => {
                let mut entry = ProviderStats::new(name);
                f(&mut entry);
                stats.push(entry);
            }
        }
    }

    /// Count an attempt against `name`
    pub fn record_request(&self, name: &str) {
        let now = Utc::now();
        self.update(name, |s| {
            s.requests += 1;
            s.last_used = Some(now);
        });
    }

    pub fn record_success(&self, name: &str, elapsed: Duration) {
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.update(name, |s| {
            s.successes += 1;
            let n = s.successes as f64;
            s.average_response_time_ms += (sample - s.average_response_time_ms) / n;
            s.consecutive_failures = 0;
            s.status = ProviderStatus::Available;
        });
    }

    pub fn record_failure(&self, name: &str) {
        self.update(name, |s| {
            s.failures += 1;
            s.consecutive_failures += 1;
            s.status = if s.consecutive_failures >= UNAVAILABLE_AFTER {
                ProviderStatus::Unavailable
            } else {
                ProviderStatus::Degraded
            };
        });
    }

    /// Snapshot of every backend's counters
    pub fn stats(&self) -> Vec<ProviderStats> {
        self.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<ProviderStats> {
        self.lock().iter().find(|s| s.name == name).cloned()
    }

    pub fn health(&self) -> Vec<ProviderHealth> {
        self.lock().iter().map(ProviderHealth::from).collect()
    }

    /// Number of backends currently marked available
    pub fn healthy_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|s| s.status == ProviderStatus::Available)
            .count()
    }

    /// Highest scoring available backend
    ///
    /// Score is success rate (as a percentage) minus mean latency in
    /// seconds. Ties go to the backend registered first.
    pub fn best_backend(&self) -> Option<String> {
        let stats = self.lock();
        let mut best: Option<&ProviderStats> = None;

        for candidate in stats
            .iter()
            .filter(|s| s.status == ProviderStatus::Available)
        {
            if best.is_none_or(|b| candidate.score() > b.score()) {
                best = Some(candidate);
            }
        }

        best.map(|s| s.name.clone())
    }

    /// Zero every counter, keeping the backend list
    pub fn reset(&self) {
        for entry in self.lock().iter_mut() {
            *entry = ProviderStats::new(&entry.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_zeroed() {
        let tracker = HealthTracker::new(["a", "b"]);
        let stats = tracker.stats();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "a");
        assert_eq!(stats[1].requests, 0);
        assert_eq!(stats[1].status, ProviderStatus::Available);
        assert!(stats[1].last_used.is_none());
        assert_eq!(stats[0].success_rate(), 0.0);
    }

    #[test]
    fn test_average_over_successes_only() {
        let tracker = HealthTracker::new(["a"]);

        tracker.record_request("a");
        tracker.record_success("a", Duration::from_millis(100));
        tracker.record_request("a");
        tracker.record_failure("a");
        tracker.record_request("a");
        tracker.record_success("a", Duration::from_millis(300));

        let stats = tracker.get("a").unwrap();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.failures, 1);
        assert!((stats.average_response_time_ms - 200.0).abs() < 1e-9);
        assert!(stats.last_used.is_some());
    }

    #[test]
    fn test_status_transitions() {
        let tracker = HealthTracker::new(["a"]);

        tracker.record_failure("a");
        assert_eq!(tracker.get("a").unwrap().status, ProviderStatus::Degraded);
        tracker.record_failure("a");
        assert_eq!(tracker.get("a").unwrap().status, ProviderStatus::Degraded);
        tracker.record_failure("a");
        assert_eq!(tracker.get("a").unwrap().status, ProviderStatus::Unavailable);
        assert_eq!(tracker.healthy_count(), 0);

        tracker.record_success("a", Duration::from_millis(10));
        let stats = tracker.get("a").unwrap();
        assert_eq!(stats.status, ProviderStatus::Available);
        assert_eq!(stats.consecutive_failures, 0);
    }

    #[test]
    fn test_best_backend_prefers_reliable_then_fast() {
        let tracker = HealthTracker::new(["flaky", "slow", "fast"]);

        for _ in 0..2 {
            tracker.record_request("flaky");
        }
        tracker.record_success("flaky", Duration::from_millis(50));
        tracker.record_failure("flaky");
        tracker.record_request("flaky");
        tracker.record_success("flaky", Duration::from_millis(50));

        tracker.record_request("slow");
        tracker.record_success("slow", Duration::from_secs(4));
        tracker.record_request("fast");
        tracker.record_success("fast", Duration::from_millis(500));

        assert_eq!(tracker.best_backend().as_deref(), Some("fast"));
    }

    #[test]
    fn test_best_backend_skips_unhealthy() {
        let tracker = HealthTracker::new(["a", "b"]);
        tracker.record_request("a");
        tracker.record_success("a", Duration::from_millis(10));
        tracker.record_request("a");
        tracker.record_failure("a");

        assert_eq!(tracker.best_backend().as_deref(), Some("b"));

        tracker.record_failure("b");
        assert_eq!(tracker.best_backend(), None);
    }

    #[test]
    fn test_best_backend_tie_goes_to_first() {
        let tracker = HealthTracker::new(["a", "b"]);
        assert_eq!(tracker.best_backend().as_deref(), Some("a"));
    }

    #[test]
    fn test_health_summary() {
        let tracker = HealthTracker::new(["a"]);
        tracker.record_request("a");
        tracker.record_failure("a");

        let health = tracker.health();
        assert_eq!(health[0].status, ProviderStatus::Degraded);
        assert!(!health[0].healthy);
        assert_eq!(health[0].consecutive_failures, 1);

        let json = serde_json::to_value(&health[0]).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["consecutiveFailures"], 1);
    }

    #[test]
    fn test_reset() {
        let tracker = HealthTracker::new(["a", "b"]);
        tracker.record_request("a");
        tracker.record_failure("a");
        tracker.reset();

        let stats = tracker.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0], ProviderStats::new("a"));
    }

    #[test]
    fn test_unknown_backend_is_tracked() {
        let tracker = HealthTracker::new(Vec::<String>::new());
        tracker.record_request("late");
        assert_eq!(tracker.get("late").unwrap().requests, 1);
    }
}
