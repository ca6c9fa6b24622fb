use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

/// Default lock timeout (5 minutes) - prevents indefinite hangs
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A guard that holds an exclusive lock on a cache root.
/// Lock is released when dropped.
#[derive(Debug)]
pub struct RepoLock {
    file: File,
}

/// Lock file for a cache root: `<parent>/.<name>.lock`.
///
/// Kept outside the root so a rejected session leaves the root untouched.
pub fn lock_path_for(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    let lock_name = format!(".{}.lock", name);
    match root.parent() {
        Some(parent) => parent.join(lock_name),
        None => PathBuf::from(lock_name),
    }
}

impl RepoLock {
    /// Acquire the lock for a cache root, blocking until available or timeout.
    pub fn for_root(root: &Path) -> io::Result<Self> {
        Self::acquire(&lock_path_for(root))
    }

    /// Acquire an exclusive lock, blocking until available or timeout.
    /// Creates the lock file and parent dirs if needed.
    pub fn acquire(lock_path: &Path) -> io::Result<Self> {
        Self::acquire_with_timeout(lock_path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire an exclusive lock with a custom timeout.
    /// Returns an error with `ErrorKind::TimedOut` if the lock cannot be acquired
    /// within the specified duration.
    pub fn acquire_with_timeout(lock_path: &Path, timeout: Duration) -> io::Result<Self> {
        let file = open_lock_file(lock_path)?;

        // Poll with exponential backoff
        let start = Instant::now();
        let mut sleep_duration = Duration::from_millis(10);
        let max_sleep = Duration::from_millis(500);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= timeout {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("lock acquisition timed out after {:?}", timeout),
                        ));
                    }
                    log::debug!("waiting for lock {}", lock_path.display());
                    std::thread::sleep(sleep_duration);
                    sleep_duration = (sleep_duration * 2).min(max_sleep);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn open_lock_file(lock_path: &Path) -> io::Result<File> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
