//! inotify-based recursive directory watcher

use super::RawChange;
use crate::detector::FileAction;
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};

/// Directory names never worth watching
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".cache", "target"];

fn watch_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::CLOSE_WRITE
        | WatchMask::DELETE
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
}

/// Recursive inotify watcher producing [`RawChange`] notifications
///
/// New subdirectories are added to the watch set as they appear, so a
/// ransomware process recursing into fresh directories stays visible.
pub struct InotifyWatcher {
    inotify: Inotify,
    async_fd: AsyncFd<std::os::unix::io::RawFd>,
    watches: HashMap<WatchDescriptor, PathBuf>,
    path_to_wd: HashMap<PathBuf, WatchDescriptor>,
    buffer: [u8; 4096],
}

impl InotifyWatcher {
    pub fn new() -> anyhow::Result<Self> {
        let inotify = Inotify::init()?;

        use std::os::unix::io::AsRawFd;
        let fd = inotify.as_raw_fd();

        // Non-blocking reads so the AsyncFd readiness loop never stalls
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }

        let async_fd = AsyncFd::new(fd)?;

        Ok(Self {
            inotify,
            async_fd,
            watches: HashMap::new(),
            path_to_wd: HashMap::new(),
            buffer: [0u8; 4096],
        })
    }

    /// Watch a directory tree
    pub fn add(&mut self, path: &Path) -> anyhow::Result<()> {
        let wd = self.inotify.watches().add(path, watch_mask())?;
        self.watches.insert(wd.clone(), path.to_path_buf());
        self.path_to_wd.insert(path.to_path_buf(), wd);

        if path.is_dir() {
            self.add_subdirectories(path)?;
        }

        debug!(path = %path.display(), "watching");
        Ok(())
    }

    fn add_subdirectories(&mut self, dir: &Path) -> anyhow::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if SKIP_DIRS.contains(&name) {
                continue;
            }

            match self.inotify.watches().add(&path, watch_mask()) {
                Ok(wd) => {
                    self.watches.insert(wd.clone(), path.clone());
                    self.path_to_wd.insert(path.clone(), wd);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not watch subdirectory");
                    continue;
                }
            }

            let _ = self.add_subdirectories(&path);
        }

        Ok(())
    }

    /// Stop watching a directory
    pub fn remove(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(wd) = self.path_to_wd.remove(path) {
            self.inotify.watches().remove(wd.clone())?;
            self.watches.remove(&wd);
        }
        Ok(())
    }

    /// Paths currently in the watch set
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.path_to_wd.keys().cloned().collect()
    }

    /// Next change notification (async)
    pub async fn next_change(&mut self) -> anyhow::Result<Option<RawChange>> {
        loop {
            let mut guard = self.async_fd.readable().await?;

            match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => {
                    for event in events {
                        let dir_path = match self.watches.get(&event.wd) {
                            Some(p) => p.clone(),
                            None => continue,
                        };

                        let path = match event.name {
                            Some(name) => dir_path.join(name),
                            None => dir_path,
                        };

                        let action = if event.mask.contains(EventMask::CREATE) {
                            FileAction::Created
                        } else if event.mask.contains(EventMask::CLOSE_WRITE) {
                            FileAction::Modified
                        } else if event.mask.contains(EventMask::DELETE) {
                            FileAction::Deleted
                        } else if event.mask.contains(EventMask::MOVED_FROM)
                            || event.mask.contains(EventMask::MOVED_TO)
                        {
                            FileAction::Renamed
                        } else {
                            continue;
                        };

                        let is_dir = event.mask.contains(EventMask::ISDIR);

                        // Keep new directories under watch
                        if is_dir && action == FileAction::Created {
                            let _ = self.add(&path);
                        }

                        return Ok(Some(RawChange { path, action, is_dir }));
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    guard.clear_ready();
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
