//! Monitoring session lifecycle and the classification entry point
//!
//! A session owns the watch scope, the burst tracker, and the fan-out
//! channel. Raw change notifications enter through one bounded queue and
//! are classified by a dedicated worker, so ingestion rate and
//! classification rate are decoupled and the drop policy is explicit.

use crate::config::Config;
use crate::detector::burst::BurstTracker;
use crate::detector::{classifier, entropy, patterns, Alert, FileAction, FileEvent};
use crate::store::EventStore;
use crate::watcher::RawChange;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Rejection of an invalid watch scope at start time
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no watch paths were provided")]
    EmptyPathSet,
    #[error("watch path is empty")]
    BlankPath,
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Stopped,
    Running,
}

/// Point-in-time view of the session for the surrounding service layer
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    pub watched_paths: Vec<String>,
    /// Adaptive threshold of the busiest scope
    pub abt: f64,
    /// Window count of the busiest scope
    pub recent_events: usize,
}

/// Record pushed to subscribers for every stored event and alert
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Notification {
    NewAlert(Alert),
    NewFileEvent(FileEvent),
}

/// Result of classifying one raw change
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    pub event: FileEvent,
    pub alert: Option<Alert>,
}

struct State {
    status: SessionStatus,
    watched: BTreeSet<String>,
}

/// Single-instance monitor session
///
/// Created stopped; `start` binds the watch scope and `stop` releases it.
/// `stop` only prevents new notifications from entering the pipeline; a
/// classification already in flight completes against the old state.
pub struct MonitorSession {
    config: Config,
    host: String,
    burst: BurstTracker,
    store: Arc<EventStore>,
    notifier: broadcast::Sender<Notification>,
    state: Mutex<State>,
}

impl MonitorSession {
    pub fn new(config: Config, store: Arc<EventStore>) -> Self {
        let host = nix::unistd::gethostname()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        let (notifier, _) = broadcast::channel(config.pipeline.queue_depth.max(16));
        let burst = BurstTracker::new(&config.burst);

        Self {
            config,
            host,
            burst,
            store,
            notifier,
            state: Mutex::new(State {
                status: SessionStatus::Stopped,
                watched: BTreeSet::new(),
            }),
        }
    }

    /// Subscribe to the fan-out stream of stored events and alerts
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Bind the watch scope and transition to running
    ///
    /// Calling `start` while already running rebinds to the new path set;
    /// burst windows for paths dropped from the set are discarded, windows
    /// for retained paths keep their history.
    pub fn start<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), SessionError> {
        if paths.is_empty() {
            return Err(SessionError::EmptyPathSet);
        }

        let mut watched = BTreeSet::new();
        for path in paths {
            let s = path.as_ref().to_string_lossy().into_owned();
            if s.trim().is_empty() {
                return Err(SessionError::BlankPath);
            }
            watched.insert(s);
        }

        let mut state = self.state.lock().unwrap();
        if state.status == SessionStatus::Running {
            let keep: Vec<String> = watched.iter().cloned().collect();
            self.burst.retain_scopes(&keep);
            info!(paths = ?watched, "monitor session rebound");
        } else {
            self.burst.clear();
            info!(paths = ?watched, "monitor session started");
        }

        state.watched = watched;
        state.status = SessionStatus::Running;
        Ok(())
    }

    /// Release the watch scope and transition to stopped; idempotent
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if state.status == SessionStatus::Stopped {
            return;
        }
        state.status = SessionStatus::Stopped;
        state.watched.clear();
        self.burst.clear();
        info!("monitor session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().status == SessionStatus::Running
    }

    /// Current status plus live burst statistics for the busiest scope
    pub fn status(&self) -> StatusReport {
        let state = self.state.lock().unwrap();
        let now = Instant::now();

        let mut abt = self.config.burst.base_threshold;
        let mut recent_events = 0;
        for scope in &state.watched {
            let count = self.burst.recent_count(scope, now);
            if count >= recent_events {
                recent_events = count;
                abt = self.burst.current_threshold(scope, now);
            }
        }

        StatusReport {
            status: state.status,
            watched_paths: state.watched.iter().cloned().collect(),
            abt,
            recent_events,
        }
    }

    /// Classify one observed filesystem change
    ///
    /// Always emits a FileEvent; additionally emits an Alert when the risk
    /// score clears the alerting cutoff. Deletions skip content analysis
    /// and burst accounting. A missing buffer for a live file (vanished or
    /// unreadable between notification and read) degrades to zero entropy
    /// with no indicators instead of failing the event. Returns `None` when
    /// the session is stopped.
    pub fn handle_raw_change(
        &self,
        path: &Path,
        action: FileAction,
        buffer: Option<&[u8]>,
    ) -> Option<ChangeOutcome> {
        if !self.is_running() {
            return None;
        }

        let timestamp = Utc::now();
        let path_str = path.to_string_lossy().into_owned();

        let (event, alert) = if action == FileAction::Deleted {
            let event = self.store.push_event(FileEvent {
                id: 0,
                path: path_str,
                action,
                timestamp,
                entropy: 0.0,
            });
            (event, None)
        } else {
            let data = buffer.unwrap_or(&[]);
            let entropy_score = entropy::sampled(data, self.config.detection.sample_window);
            let tags = patterns::scan(path, data, &self.config.detection);

            let scope = self.scope_for(path);
            let now = Instant::now();
            self.burst.observe(&scope, now);
            let threshold = self.burst.current_threshold(&scope, now);
            let count = self.burst.recent_count(&scope, now);

            let event = self.store.push_event(FileEvent {
                id: 0,
                path: path_str,
                action,
                timestamp,
                entropy: entropy_score,
            });

            let alert = classifier::classify(
                &event,
                &tags,
                count,
                threshold,
                &self.config.detection,
                &self.host,
            )
            .map(|a| self.store.push_alert(a));

            (event, alert)
        };

        match &alert {
            Some(a) => warn!(
                path = %event.path,
                severity = ?a.severity,
                class = ?a.classification,
                score = a.risk_score,
                "alert raised"
            ),
            None => debug!(path = %event.path, action = ?event.action, "file event recorded"),
        }

        let _ = self.notifier.send(Notification::NewFileEvent(event.clone()));
        if let Some(a) = &alert {
            let _ = self.notifier.send(Notification::NewAlert(a.clone()));
        }

        Some(ChangeOutcome { event, alert })
    }

    /// Map a changed path to its burst scope: the longest watch root that
    /// contains it, falling back to the parent directory during rebind races
    fn scope_for(&self, path: &Path) -> String {
        let state = self.state.lock().unwrap();

        let mut best: Option<&String> = None;
        for root in &state.watched {
            if path.starts_with(Path::new(root)) {
                match best {
                    Some(b) if b.len() >= root.len() => {}
                    _ => best = Some(root),
                }
            }
        }

        match best {
            Some(root) => root.clone(),
            None => path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        }
    }

    /// Spawn the worker that drains the change queue into classification
    ///
    /// The worker exits when the channel closes. A stopped session drops
    /// notifications instead of processing them, so `stop` takes effect
    /// without tearing the queue down.
    pub fn spawn_worker(
        session: Arc<Self>,
        mut rx: mpsc::Receiver<RawChange>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                if !session.is_running() {
                    continue;
                }
                if change.is_dir || session.config.is_excluded(&change.path) {
                    continue;
                }

                let buffer = if change.action == FileAction::Deleted {
                    None
                } else {
                    read_capped(&change.path, session.config.pipeline.read_cap)
                        .await
                        .ok()
                };

                session.handle_raw_change(&change.path, change.action, buffer.as_deref());
            }
        })
    }
}

/// Read at most `cap` bytes from a file
pub async fn read_capped(path: &Path, cap: usize) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(cap.min(64 * 1024));
    file.take(cap as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    fn session() -> MonitorSession {
        let mut config = Config::default();
        config.watch = vec![PathBuf::from("/watch")];
        config.exclude = vec![];
        MonitorSession::new(config, Arc::new(EventStore::new(&StoreConfig::default())))
    }

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut state: u64 = 0xdead_beef_cafe_f00d;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn starts_stopped_and_start_requires_paths() {
        let s = session();
        assert!(!s.is_running());
        assert_eq!(s.start::<PathBuf>(&[]), Err(SessionError::EmptyPathSet));
        assert!(!s.is_running());

        assert_eq!(s.start(&[PathBuf::from("  ")]), Err(SessionError::BlankPath));
        assert!(!s.is_running());

        s.start(&[PathBuf::from("/watch")]).unwrap();
        assert!(s.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();
        s.stop();
        assert_eq!(s.status().status, SessionStatus::Stopped);
        s.stop();
        assert_eq!(s.status().status, SessionStatus::Stopped);
        assert!(s.status().watched_paths.is_empty());
    }

    #[test]
    fn rebind_keeps_watched_scopes_and_drops_the_rest() {
        let s = session();
        s.start(&[PathBuf::from("/watch"), PathBuf::from("/other")]).unwrap();

        let now = Instant::now();
        s.burst.observe("/watch", now);
        s.burst.observe("/other", now);

        s.start(&[PathBuf::from("/watch")]).unwrap();
        assert!(s.is_running());
        assert_eq!(s.burst.recent_count("/watch", now), 1);
        assert_eq!(s.burst.recent_count("/other", now), 0);
    }

    #[test]
    fn stopped_session_processes_nothing() {
        let s = session();
        assert!(s
            .handle_raw_change(Path::new("/watch/a.txt"), FileAction::Created, Some(b"x"))
            .is_none());
        assert!(s.store.recent_events(10).is_empty());
    }

    #[test]
    fn benign_change_emits_event_only() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();

        let outcome = s
            .handle_raw_change(Path::new("/watch/doc.txt"), FileAction::Modified, Some(b"hello world"))
            .unwrap();

        assert!(outcome.alert.is_none());
        assert_eq!(outcome.event.action, FileAction::Modified);
        assert!(outcome.event.entropy < 7.5);
        assert_eq!(s.store.recent_events(10).len(), 1);
        assert!(s.store.recent_alerts(10).is_empty());
    }

    #[test]
    fn encrypted_locked_file_raises_critical_alert() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();
        let body = random_bytes(4096);

        let outcome = s
            .handle_raw_change(Path::new("/watch/photos.zip.locked"), FileAction::Created, Some(&body))
            .unwrap();

        let alert = outcome.alert.expect("alert");
        assert_eq!(alert.severity, crate::detector::Severity::Critical);
        assert_eq!(alert.classification, crate::detector::Classification::Ransomware);
        assert!(alert.risk_score >= 95);
        assert_eq!(alert.id, 1);
    }

    #[test]
    fn deletion_records_zero_entropy_and_skips_burst() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();

        let outcome = s
            .handle_raw_change(Path::new("/watch/gone.txt"), FileAction::Deleted, None)
            .unwrap();

        assert!(outcome.alert.is_none());
        assert_eq!(outcome.event.entropy, 0.0);
        assert_eq!(s.burst.recent_count("/watch", Instant::now() + Duration::from_millis(1)), 0);
    }

    #[test]
    fn vanished_file_degrades_to_zero_entropy() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();

        // Notification raced a deletion: no buffer could be read
        let outcome = s
            .handle_raw_change(Path::new("/watch/racing.txt"), FileAction::Modified, None)
            .unwrap();

        assert_eq!(outcome.event.entropy, 0.0);
        assert!(outcome.alert.is_none());
    }

    #[test]
    fn burst_of_changes_raises_alert_without_high_entropy() {
        let s = session();
        s.start(&[PathBuf::from("/watch")]).unwrap();

        let mut last = None;
        for i in 0..10 {
            let path = format!("/watch/file{i}.txt");
            last = s.handle_raw_change(Path::new(&path), FileAction::Modified, Some(b"plain text"));
        }

        let alert = last.unwrap().alert.expect("burst alert");
        assert!(alert.severity >= crate::detector::Severity::Low);
        assert!(alert.reasons.iter().any(|r| r.starts_with("Rapid file modifications")));
    }

    #[test]
    fn notifications_fan_out_in_record_shape() {
        let s = session();
        let mut rx = s.subscribe();
        s.start(&[PathBuf::from("/watch")]).unwrap();

        s.handle_raw_change(Path::new("/watch/doc.txt"), FileAction::Created, Some(b"hello"))
            .unwrap();

        match rx.try_recv().unwrap() {
            Notification::NewFileEvent(event) => {
                let json = serde_json::to_value(&Notification::NewFileEvent(event)).unwrap();
                assert_eq!(json["type"], "new_file_event");
                assert!(json["data"].get("fme").is_some());
            }
            other => panic!("expected file event, got {other:?}"),
        }
    }

    #[test]
    fn scope_resolution_prefers_longest_root() {
        let s = session();
        s.start(&[PathBuf::from("/watch"), PathBuf::from("/watch/nested")]).unwrap();

        assert_eq!(s.scope_for(Path::new("/watch/nested/a.txt")), "/watch/nested");
        assert_eq!(s.scope_for(Path::new("/watch/b.txt")), "/watch");
        assert_eq!(s.scope_for(Path::new("/elsewhere/c.txt")), "/elsewhere");
    }

    #[tokio::test]
    async fn worker_drains_queue_and_stores_events() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("payload.txt");
        std::fs::write(&file, b"ordinary content").unwrap();

        let mut config = Config::default();
        config.watch = vec![dir.path().to_path_buf()];
        config.exclude = vec![];
        let store = Arc::new(EventStore::new(&StoreConfig::default()));
        let session = Arc::new(MonitorSession::new(config, store.clone()));
        session.start(&[dir.path().to_path_buf()]).unwrap();

        let (tx, rx) = mpsc::channel(16);
        let worker = MonitorSession::spawn_worker(session.clone(), rx);

        tx.send(RawChange {
            path: file.clone(),
            action: FileAction::Created,
            is_dir: false,
        })
        .await
        .unwrap();
        drop(tx);
        worker.await.unwrap();

        let events = store.recent_events(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, file.to_string_lossy());
    }

    #[tokio::test]
    async fn read_capped_bounds_large_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.bin");
        std::fs::write(&file, vec![0u8; 10_000]).unwrap();

        let data = read_capped(&file, 4096).await.unwrap();
        assert_eq!(data.len(), 4096);
    }
}
