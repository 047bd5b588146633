//! Filesystem vault for sensitive working state.
//!
//! The vault is a single directory subtree. It can be ensured (created if
//! absent) or purged (deleted recursively and recreated empty). Purge is the
//! gateway's last-resort security action, so its failures always propagate.

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Creating the vault root failed.
    #[error("Failed to create vault at {}: {}", .path.display(), .source)]
    Create {
        /// Vault root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Removing the vault subtree failed.
    #[error("Failed to purge vault at {}: {}", .path.display(), .source)]
    Purge {
        /// Vault root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A destructive security capability triggered by a guard.
///
/// Implementations must leave the protected state wiped when `purge`
/// returns `Ok`, and must report any failure rather than swallow it.
pub trait SecurityAction: Send + Sync {
    /// Irreversibly wipe the protected state.
    fn purge(&self) -> Result<(), VaultError>;
}

/// Directory-backed vault.
#[derive(Debug)]
pub struct Vault {
    root: PathBuf,
    /// Serializes purges so a delete never races a recreate on the same path.
    purge_lock: Mutex<()>,
}

impl Vault {
    /// Create a handle for the vault rooted at `root`. Does not touch the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            purge_lock: Mutex::new(()),
        }
    }

    /// Vault root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the vault root currently exists as a directory.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Whether the vault root exists and holds no entries.
    pub fn is_empty(&self) -> bool {
        std::fs::read_dir(&self.root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }

    /// Create the vault root if absent. Idempotent.
    pub fn ensure(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(&self.root).map_err(|source| VaultError::Create {
            path: self.root.clone(),
            source,
        })
    }

    /// Delete the entire vault subtree and recreate it empty.
    pub fn purge(&self) -> Result<(), VaultError> {
        let _guard = self.purge_lock.lock();

        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            // Already gone (never created, or removed by another process)
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(VaultError::Purge {
                    path: self.root.clone(),
                    source,
                })
            }
        }

        self.ensure()?;

        tracing::warn!(vault = %self.root.display(), "Vault purged");
        Ok(())
    }
}

impl SecurityAction for Vault {
    fn purge(&self) -> Result<(), VaultError> {
        Vault::purge(self)
    }
}
