use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

/// Name of the lock file inside the data directory
const LOCK_FILE: &str = ".lock";

/// Advisory lock on the data directory.
///
/// Held by `pl` write commands for the duration of one read-modify-write so
/// that two invocations cannot interleave and drop each other's changes.
pub struct DataLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("data directory {path} is locked by another pl process")]
    Timeout { path: PathBuf },
}

impl DataLock {
    /// Acquire the lock, creating the data directory if needed.
    /// Waits up to `timeout` for a concurrent holder to release it.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = data_dir.join(LOCK_FILE);
        let create_error = |e| LockError::CreateError {
            path: lock_path.clone(),
            source: e,
        };
        fs::create_dir_all(data_dir).map_err(create_error)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(create_error)?;

        let start = Instant::now();
        let mut waited = false;
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    if waited {
                        debug!(elapsed = ?start.elapsed(), "acquired data lock after waiting");
                    }
                    return Ok(DataLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(_) if start.elapsed() < timeout => {
                    waited = true;
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path: lock_path }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Try to acquire an exclusive flock on the file (non-blocking).
/// The lock is released when the file handle is dropped.
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
