//! Exclusive write lock tied to a backing store.
//!
//! Every handle to the same store shares one `tokio::sync::Mutex`, so services
//! opened over one store serialize their mutations. File stores also hold a
//! lock file in the data directory while the guard lives, which serializes
//! separate processes sharing that directory.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::error::{AttendanceError, Result};

/// Poll interval while another process holds the lock file
const LOCK_FILE_POLL: Duration = Duration::from_millis(50);

/// Handle to a store's write lock. Clones share the same lock.
#[derive(Debug, Clone)]
pub struct StoreLock {
    mutex: Arc<Mutex<()>>,
    lock_file: Option<PathBuf>,
}

impl Default for StoreLock {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreLock {
    /// A lock private to one in-process store.
    pub fn new() -> Self {
        Self {
            mutex: Arc::new(Mutex::new(())),
            lock_file: None,
        }
    }

    /// The lock for a data directory. Every handle for the same directory in
    /// this process shares one mutex; `lock_file` guards against other
    /// processes.
    pub fn for_directory(data_dir: &Path, lock_file: PathBuf) -> Self {
        static REGISTRY: OnceLock<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

        let key = fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        let mut registry = REGISTRY
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mutex = registry.entry(key).or_default().clone();

        Self {
            mutex,
            lock_file: Some(lock_file),
        }
    }

    /// Acquire the lock, waiting at most `timeout`.
    pub async fn acquire(&self, timeout: Duration) -> Result<StoreGuard> {
        tokio::time::timeout(timeout, self.acquire_inner())
            .await
            .map_err(|_| AttendanceError::LockTimeout { waited: timeout })?
    }

    async fn acquire_inner(&self) -> Result<StoreGuard> {
        let guard = self.mutex.clone().lock_owned().await;
        let Some(ref path) = self.lock_file else {
            return Ok(StoreGuard {
                _guard: guard,
                lock_file: None,
            });
        };

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // pid for diagnosing a stale lock file
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %path.display(), "Acquired store lock file");
                    return Ok(StoreGuard {
                        _guard: guard,
                        lock_file: Some(path.clone()),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tokio::time::sleep(LOCK_FILE_POLL).await;
                }
                Err(e) => return Err(AttendanceError::storage(path, e)),
            }
        }
    }
}

/// Held while a mutation runs; dropping it releases the lock.
#[derive(Debug)]
pub struct StoreGuard {
    _guard: OwnedMutexGuard<()>,
    lock_file: Option<PathBuf>,
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        if let Some(ref path) = self.lock_file {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove store lock file");
            }
        }
    }
}
