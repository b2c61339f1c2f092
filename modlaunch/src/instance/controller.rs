//! Instance Controller (C2): owns the on-disk instance directory, enforces
//! single-writer access, and persists the three effective property maps.

use crate::error::{LauncherError, Result};
use crate::properties::{self, PropertyMap};

use super::lock::InstanceLock;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ETC_DIR: &str = "etc";
const CONF_DIR: &str = "conf";
const DATA_DIR: &str = "data";
const FRAMEWORK_PROPERTIES: &str = "framework.properties";
const LAUNCHING_PROPERTIES: &str = "launching.properties";
const SYSTEM_PROPERTIES: &str = "system.properties";

/// A held instance: the directory path and its lock, released on drop.
pub struct InstanceController {
    root: PathBuf,
    lock: InstanceLock,
}

impl InstanceController {
    /// Acquire exclusive ownership of `root`, creating the directory and
    /// its `etc/` subdirectory if absent.
    pub fn acquire(root: &Path) -> Result<InstanceController> {
        std::fs::create_dir_all(root).map_err(|source| LauncherError::InstanceIo {
            path: root.to_path_buf(),
            source,
        })?;

        let lock = InstanceLock::acquire(root)?;

        let etc = root.join(ETC_DIR);
        std::fs::create_dir_all(&etc).map_err(|source| LauncherError::InstanceIo { path: etc, source })?;

        debug!(instance = %root.display(), "instance acquired");

        Ok(InstanceController {
            root: root.to_path_buf(),
            lock,
        })
    }

    /// Re-enter an already-held instance (bump the lock's re-entrancy
    /// count) without performing directory setup again.
    pub fn reacquire(&mut self) -> Result<()> {
        self.lock.reacquire()
    }

    pub fn release(&mut self) -> Result<()> {
        self.lock.release()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(CONF_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    fn etc_dir(&self) -> PathBuf {
        self.root.join(ETC_DIR)
    }

    /// An instance path "looks valid" iff its `etc/` subdirectory exists,
    /// without requiring the lock to be held.
    pub fn looks_valid(root: &Path) -> bool {
        root.join(ETC_DIR).is_dir()
    }

    /// Persist the three effective property maps under `etc/`, keys sorted,
    /// no timestamp comment (matching [`crate::properties::file::save`]).
    pub fn persist(
        &self,
        system: &PropertyMap,
        launching: &PropertyMap,
        framework: &PropertyMap,
    ) -> Result<()> {
        properties::save(&self.etc_dir().join(SYSTEM_PROPERTIES), system)?;
        properties::save(&self.etc_dir().join(LAUNCHING_PROPERTIES), launching)?;
        properties::save(&self.etc_dir().join(FRAMEWORK_PROPERTIES), framework)?;
        Ok(())
    }

    /// Restore the three persisted maps, merging each into the caller's
    /// in-memory map without overwriting a key already present there (CLI
    /// overrides dominate).
    pub fn restore_into(
        &self,
        system: &mut PropertyMap,
        launching: &mut PropertyMap,
        framework: &mut PropertyMap,
    ) -> Result<()> {
        restore_one(&self.etc_dir().join(SYSTEM_PROPERTIES), system)?;
        restore_one(&self.etc_dir().join(LAUNCHING_PROPERTIES), launching)?;
        restore_one(&self.etc_dir().join(FRAMEWORK_PROPERTIES), framework)?;
        Ok(())
    }

    /// Delete the instance directory. Removes everything but the lock file,
    /// then the lock file itself, then the now-empty directory -- an order
    /// that tolerates a concurrent acquire attempt racing the final unlink.
    ///
    /// An instance that no longer looks valid (already deleted, or never
    /// materialized) is treated as a no-op success: deleting is idempotent.
    pub fn delete(root: &Path) -> Result<()> {
        if !Self::looks_valid(root) {
            info!(instance = %root.display(), "instance already absent; nothing to delete");
            return Ok(());
        }

        let lock_path = root.join("instance.lock");
        for entry in std::fs::read_dir(root).map_err(|source| LauncherError::InstanceIo {
            path: root.to_path_buf(),
            source,
        })? {
            let entry = entry.map_err(|source| LauncherError::InstanceIo {
                path: root.to_path_buf(),
                source,
            })?;
            if entry.path() == lock_path {
                continue;
            }
            remove_entry(&entry.path())?;
        }

        if lock_path.is_file() {
            std::fs::remove_file(&lock_path).map_err(|source| LauncherError::InstanceIo {
                path: lock_path.clone(),
                source,
            })?;
        }

        std::fs::remove_dir(root).map_err(|source| LauncherError::InstanceIo {
            path: root.to_path_buf(),
            source,
        })
    }
}

fn remove_entry(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(|source| LauncherError::InstanceIo {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
    .map_err(|source| LauncherError::InstanceIo {
        path: path.to_path_buf(),
        source,
    })
}

fn restore_one(path: &Path, into: &mut PropertyMap) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    match properties::load(path) {
        Ok(persisted) => {
            properties::restore_without_override(into, &persisted);
            Ok(())
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to restore persisted properties");
            Err(err)
        }
    }
}
