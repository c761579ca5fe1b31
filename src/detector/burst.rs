//! Adaptive burst-rate tracking for mass-modification detection
//!
//! A user saves a handful of files per minute; ransomware rewrites hundreds.
//! Each watch scope gets a sliding window of recent change timestamps, and
//! the trigger threshold scales with the observed rate so that legitimately
//! busy periods (bulk copies, build tooling) raise the bar automatically
//! while quiet periods stay sensitive.

use crate::config::BurstConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks change timestamps per watch scope
///
/// One lock guards the whole tracker; scope cardinality is the number of
/// watch roots, which is small. Stale timestamps are pruned on every read
/// and write, so windows never grow beyond the horizon.
pub struct BurstTracker {
    window: Duration,
    base_threshold: f64,
    adaptation_factor: f64,
    scopes: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl BurstTracker {
    pub fn new(cfg: &BurstConfig) -> Self {
        Self {
            window: Duration::from_millis(cfg.window_ms),
            base_threshold: cfg.base_threshold,
            adaptation_factor: cfg.adaptation_factor,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Record a change timestamp for a scope
    pub fn observe(&self, scope: &str, at: Instant) {
        let mut scopes = self.scopes.lock().unwrap();
        let events = scopes.entry(scope.to_string()).or_default();
        Self::prune(events, at, self.window);
        events.push_back(at);
    }

    /// Events currently inside the window for a scope
    pub fn recent_count(&self, scope: &str, now: Instant) -> usize {
        let mut scopes = self.scopes.lock().unwrap();
        match scopes.get_mut(scope) {
            Some(events) => {
                Self::prune(events, now, self.window);
                events.len()
            }
            None => 0,
        }
    }

    /// Observed events per second over the window horizon
    pub fn rate(&self, scope: &str, now: Instant) -> f64 {
        let count = self.recent_count(scope, now);
        count as f64 / self.window.as_secs_f64()
    }

    /// The adaptive threshold for a scope: `max(base, rate * factor)`
    ///
    /// Zero observed events yields the base threshold.
    pub fn current_threshold(&self, scope: &str, now: Instant) -> f64 {
        let rate = self.rate(scope, now);
        (rate * self.adaptation_factor).max(self.base_threshold)
    }

    /// Discard the window for one scope
    pub fn drop_scope(&self, scope: &str) {
        self.scopes.lock().unwrap().remove(scope);
    }

    /// Keep only the windows for scopes still being watched
    pub fn retain_scopes(&self, keep: &[String]) {
        self.scopes
            .lock()
            .unwrap()
            .retain(|scope, _| keep.iter().any(|k| k == scope));
    }

    /// Discard all windows
    pub fn clear(&self) {
        self.scopes.lock().unwrap().clear();
    }

    fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = events.front() {
            if now.saturating_duration_since(oldest) > window {
                events.pop_front();
            } else {
                break;
            }
        }
    }
}
