//! Advisory, re-entrant exclusive lock on `instance.lock` (C2, I1).

use crate::error::{LauncherError, Result};

use nix::fcntl::{flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Holds the open `instance.lock` file descriptor and a re-entrancy count.
/// The OS-level flock is taken once, on the first acquire, and released
/// once the count returns to zero or [`InstanceLock::abort`] is called.
pub struct InstanceLock {
    path: PathBuf,
    file: File,
    count: u32,
}

impl InstanceLock {
    /// Open (creating if absent) and take a non-blocking exclusive lock on
    /// `<instance_dir>/instance.lock`.
    pub fn acquire(instance_dir: &Path) -> Result<InstanceLock> {
        let path = instance_dir.join("instance.lock");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|source| LauncherError::InstanceIo {
                path: path.clone(),
                source,
            })?;

        flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock).map_err(|errno| {
            if errno == nix::errno::Errno::EWOULDBLOCK || errno == nix::errno::Errno::EAGAIN {
                LauncherError::InstanceBusy { path: path.clone() }
            } else {
                LauncherError::InstanceIo {
                    path: path.clone(),
                    source: std::io::Error::from_raw_os_error(errno as i32),
                }
            }
        })?;

        Ok(InstanceLock { path, file, count: 1 })
    }

    /// Bump the re-entrancy count for a nested acquire of an already-held
    /// lock. Saturating past `u32::MAX` (mirroring the design's `INT_MAX`
    /// saturation rule) is a fatal configuration error -- it can only happen
    /// if a caller is acquiring in a runaway loop.
    pub fn reacquire(&mut self) -> Result<()> {
        self.count = self.count.checked_add(1).ok_or_else(|| {
            LauncherError::Config(format!(
                "instance lock re-entrancy count saturated for {}",
                self.path.display()
            ))
        })?;
        Ok(())
    }

    /// Release one level of re-entrancy. The underlying flock is dropped
    /// only once the count reaches zero.
    pub fn release(&mut self) -> Result<()> {
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.unlock()?;
        }
        Ok(())
    }

    /// Force the lock released regardless of the re-entrancy count, for use
    /// on an unrecoverable error path.
    pub fn abort(&mut self) -> Result<()> {
        self.count = 0;
        self.unlock()
    }

    fn unlock(&self) -> Result<()> {
        flock(self.file.as_raw_fd(), FlockArg::Unlock).map_err(|errno| LauncherError::InstanceIo {
            path: self.path.clone(),
            source: std::io::Error::from(errno),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if self.count > 0 {
            let _ = self.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = InstanceLock::acquire(dir.path()).unwrap();
        assert!(lock.path().is_file());
    }

    #[test]
    fn reacquire_then_release_keeps_lock_until_count_reaches_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = InstanceLock::acquire(dir.path()).unwrap();
        lock.reacquire().unwrap();
        lock.release().unwrap();
        // Still held once more; dropping here releases it for real.
        lock.release().unwrap();
    }

    #[test]
    fn second_process_level_acquire_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let _held = InstanceLock::acquire(dir.path()).unwrap();

        let path = dir.path().join("instance.lock");
        let second = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let result = flock(second.as_raw_fd(), FlockArg::LockExclusiveNonblock);
        assert!(result.is_err());
    }
}
