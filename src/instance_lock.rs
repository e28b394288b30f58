//! Single instance lock per node role using a Unix socket.
//!
//! Two masters on one bus would fight over the actuators, so each binary
//! holds a lock named after its role. The socket is released by the OS when
//! the process dies, so no stale lock files are left behind.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another {0} instance is already running")]
    AlreadyRunning(String),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the process should be the only one of its role.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `role` in the runtime directory.
    pub fn acquire(role: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_in(&runtime_dir(), role)
    }

    /// Acquire the lock for `role` with its socket placed in `dir`.
    pub fn acquire_in(dir: &Path, role: &str) -> Result<Self, InstanceLockError> {
        let path = socket_path(dir, role);

        // A socket nobody answers on was left by a killed process
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(role.to_string()));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(role.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `XDG_RUNTIME_DIR` when set, `/tmp` otherwise.
pub fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

pub fn socket_path(dir: &Path, role: &str) -> PathBuf {
    dir.join(format!("climate-{}.sock", role))
}
