//! File system watching
//!
//! Produces raw change notifications for the session's intake queue.
//! Delivery order is preserved per path; no ordering is guaranteed across
//! paths.

mod inotify_watcher;

pub use inotify_watcher::InotifyWatcher;

use crate::detector::FileAction;
use std::path::PathBuf;

/// A raw filesystem change notification
#[derive(Debug, Clone)]
pub struct RawChange {
    /// Path of the affected file
    pub path: PathBuf,
    /// Kind of change
    pub action: FileAction,
    /// Whether the path refers to a directory
    pub is_dir: bool,
}
