use crate::{file::EnvFileKind, resolver::LoadMode};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

/// Notification emitted after an env file has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub path: PathBuf,
    pub kind: EnvFileKind,
    pub mode: LoadMode,
    /// Number of key/value pairs the file contained
    pub variables: usize,
}

/// Receives a [`LoadEvent`] for every file that was applied
///
/// Observers are fire-and-forget and cannot influence resolution.
pub trait EnvFileObserver: Send + Sync {
    fn file_loaded(&self, event: &LoadEvent);
}

impl<F> EnvFileObserver for F
where
    F: Fn(&LoadEvent) + Send + Sync,
{
    fn file_loaded(&self, event: &LoadEvent) {
        self(event)
    }
}

/// Records every loaded env file so development tooling can watch them
///
/// Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded files in first-seen order, without duplicates
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().iter().any(|p| p == path.as_ref())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        // a panicking observer elsewhere must not disable watching
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EnvFileObserver for WatchList {
    fn file_loaded(&self, event: &LoadEvent) {
        let mut paths = self.lock();
        if !paths.contains(&event.path) {
            paths.push(event.path.clone());
        }
    }
}
