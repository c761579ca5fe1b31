//! RansomGuard - real-time ransomware detection core
//!
//! Turns raw file-system change notifications into scored, severity-graded
//! security alerts using three fused signals:
//!
//! - **Entropy analysis** - ciphertext is indistinguishable from random data
//! - **Indicator scanning** - deny-listed extensions and ransom-note language
//! - **Adaptive burst thresholds** - mass modification stands out against a
//!   threshold that scales with legitimate activity
//!
//! # Example
//!
//! ```rust,no_run
//! use ransomguard::{Config, RansomGuard};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let guard = RansomGuard::new(Config::default());
//!     guard.run().await
//! }
//! ```

pub mod config;
pub mod detector;
pub mod session;
pub mod store;
pub mod watcher;

pub use config::Config;
pub use detector::{Alert, Classification, FileAction, FileEvent, Severity};
pub use session::{ChangeOutcome, MonitorSession, Notification, SessionError, SessionStatus};
pub use store::{EventStore, Metrics};
pub use watcher::{InotifyWatcher, RawChange};

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Main engine: wires the watcher into a monitor session
pub struct RansomGuard {
    config: Config,
    store: Arc<EventStore>,
    session: Arc<MonitorSession>,
}

impl RansomGuard {
    /// Create an engine with a fresh store and a stopped session
    pub fn new(config: Config) -> Self {
        let store = Arc::new(EventStore::new(&config.store));
        let session = Arc::new(MonitorSession::new(config.clone(), store.clone()));

        Self {
            config,
            store,
            session,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn session(&self) -> &Arc<MonitorSession> {
        &self.session
    }

    /// Watch the configured paths until interrupted
    ///
    /// Starts the session, pumps watcher notifications through the bounded
    /// intake queue, and stops the session on ctrl-c. A full queue drops
    /// the notification rather than stalling the watch loop.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.session.start(&self.config.watch)?;

        let mut fs_watcher = InotifyWatcher::new()?;
        for path in &self.config.watch {
            if let Err(e) = fs_watcher.add(path) {
                warn!(path = %path.display(), error = %e, "failed to watch path");
            }
        }

        let (tx, rx) = mpsc::channel(self.config.pipeline.queue_depth);
        let worker = MonitorSession::spawn_worker(self.session.clone(), rx);

        info!(paths = ?self.config.watch, "ransomguard running");

        loop {
            tokio::select! {
                change = fs_watcher.next_change() => {
                    match change? {
                        Some(change) => {
                            if tx.try_send(change).is_err() {
                                warn!("change queue full, dropping notification");
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    break;
                }
            }
        }

        self.session.stop();
        drop(tx);
        worker.await?;

        Ok(())
    }
}
