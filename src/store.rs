//! Bounded in-memory repository for events and alerts
//!
//! The append logs are the core's only shared mutable collections: one
//! lock-guarded store object is injected into the pipeline instead of
//! ambient globals. Both logs are size-capped; at capacity the oldest
//! record is silently evicted, never surfaced as an error.

use crate::config::StoreConfig;
use crate::detector::{Alert, Classification, FileEvent, Severity};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Aggregate counters over the retained alert/event logs
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Metrics {
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub ransomware_alerts: usize,
    pub raas_alerts: usize,
    pub recent_events: usize,
}

#[derive(Default)]
struct Inner {
    alerts: VecDeque<Alert>,
    events: VecDeque<FileEvent>,
    next_alert_id: u64,
    next_event_id: u64,
}

/// Lock-guarded, size-capped append logs with monotonic ids
pub struct EventStore {
    max_alerts: usize,
    max_events: usize,
    inner: Mutex<Inner>,
}

impl EventStore {
    pub fn new(cfg: &StoreConfig) -> Self {
        Self {
            max_alerts: cfg.max_alerts,
            max_events: cfg.max_events,
            inner: Mutex::new(Inner {
                next_alert_id: 1,
                next_event_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Append a file event, assigning its id; returns the stored record
    pub fn push_event(&self, mut event: FileEvent) -> FileEvent {
        let mut inner = self.inner.lock().unwrap();
        event.id = inner.next_event_id;
        inner.next_event_id += 1;

        inner.events.push_back(event.clone());
        while inner.events.len() > self.max_events {
            inner.events.pop_front();
        }
        event
    }

    /// Append an alert, assigning its id; returns the stored record
    pub fn push_alert(&self, mut alert: Alert) -> Alert {
        let mut inner = self.inner.lock().unwrap();
        alert.id = inner.next_alert_id;
        inner.next_alert_id += 1;

        inner.alerts.push_back(alert.clone());
        while inner.alerts.len() > self.max_alerts {
            inner.alerts.pop_front();
        }
        alert
    }

    /// Retained alerts, most recent first
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let inner = self.inner.lock().unwrap();
        inner.alerts.iter().rev().take(limit).cloned().collect()
    }

    /// Retained file events, most recent first
    pub fn recent_events(&self, limit: usize) -> Vec<FileEvent> {
        let inner = self.inner.lock().unwrap();
        inner.events.iter().rev().take(limit).cloned().collect()
    }

    /// Aggregate counters over the retained records
    pub fn metrics(&self) -> Metrics {
        let inner = self.inner.lock().unwrap();

        let count_severity = |s: Severity| inner.alerts.iter().filter(|a| a.severity == s).count();
        let count_class =
            |c: Classification| inner.alerts.iter().filter(|a| a.classification == c).count();

        Metrics {
            total_alerts: inner.alerts.len(),
            critical_alerts: count_severity(Severity::Critical),
            high_alerts: count_severity(Severity::High),
            ransomware_alerts: count_class(Classification::Ransomware),
            raas_alerts: count_class(Classification::RaaS),
            recent_events: inner.events.len(),
        }
    }
}
