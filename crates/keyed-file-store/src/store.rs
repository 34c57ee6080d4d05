//! Core keyed file store implementation.

use crate::{
    error::{CacheStoreError, Result},
    keys::{STAGING_PREFIX, STAGING_SUFFIX, file_name_for_key, key_for_file_name},
    security::{set_secure_permissions, validate_entry_path},
};

use serde::Serialize;
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tokio::fs;

const DEFAULT_EXTENSION: &str = "bin";

/// Statistics about stored entries.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub root_directory: PathBuf,
}

/// Keyed on-disk blob store.
///
/// Each key owns at most one file directly under the root directory. The
/// directory listing is the only index.
#[derive(Clone, Debug)]
pub struct KeyedFileStore {
    root: PathBuf,
    extension: String,
}

impl KeyedFileStore {
    /// Create a new builder for configuring the store.
    #[must_use]
    pub fn builder() -> KeyedFileStoreBuilder {
        KeyedFileStoreBuilder::new()
    }

    /// Root directory holding the entries.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root
    }

    /// Extension appended to every entry file name.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether an entry file exists for `key`.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or the filesystem cannot be queried.
    pub async fn exists<K: AsRef<str>>(&self, key: K) -> Result<bool> {
        let path = self.entry_path(key.as_ref())?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the entry stored under `key`.
    ///
    /// # Errors
    /// Returns [`CacheStoreError::NotFound`] when no entry exists.
    pub async fn read<K: AsRef<str>>(&self, key: K) -> Result<Vec<u8>> {
        let key = key.as_ref();
        let path = self.entry_path(key)?;
        fs::read(&path)
            .await
            .map_err(|e| CacheStoreError::from_io(key, e))
    }

    /// Store `contents` under `key`, replacing any previous entry.
    ///
    /// The bytes are staged in a hidden file inside the root, flushed to
    /// disk and renamed over the entry, so readers see either the previous
    /// entry or the complete new one.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or any filesystem step fails.
    /// A failed write leaves the previous entry untouched.
    pub async fn write<K: AsRef<str>>(&self, key: K, contents: &[u8]) -> Result<()> {
        let key = key.as_ref();
        let target = self.entry_path(key)?;
        let root = self.root.clone();
        let contents = contents.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut staged = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .suffix(STAGING_SUFFIX)
                .tempfile_in(&root)?;
            staged.write_all(&contents)?;
            staged.as_file().sync_all()?;
            staged.persist(&target).map_err(|e| CacheStoreError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| CacheStoreError::Io(std::io::Error::other(e)))??;

        tracing::trace!("Stored entry '{}' in {:?}", key, self.root);
        Ok(())
    }

    /// Remove the entry stored under `key`.
    ///
    /// # Errors
    /// Returns [`CacheStoreError::NotFound`] when no entry exists.
    pub async fn remove<K: AsRef<str>>(&self, key: K) -> Result<()> {
        let key = key.as_ref();
        let path = self.entry_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| CacheStoreError::from_io(key, e))
    }

    /// Remove the entry stored under `key`, treating absence as success.
    ///
    /// Returns `true` when an entry was actually removed.
    ///
    /// # Errors
    /// Returns an error for invalid keys and filesystem failures other than absence.
    pub async fn remove_if_exists<K: AsRef<str>>(&self, key: K) -> Result<bool> {
        match self.remove(key).await {
            Ok(()) => Ok(true),
            Err(CacheStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Enumerate every stored key by listing the root directory.
    ///
    /// Staged writes and files that do not belong to the store are skipped.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be read.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                tracing::debug!("Skipping non UTF-8 file name in {:?}", self.root);
                continue;
            };
            if let Some(key) = key_for_file_name(file_name, &self.extension) {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    /// Remove every entry and stray staged write from the root directory.
    /// Files the store does not own are left in place. Returns the number of
    /// files removed.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be read or a file cannot be removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_name = entry.file_name();
            let owned = file_name.to_str().is_some_and(|name| {
                name.starts_with(STAGING_PREFIX)
                    || key_for_file_name(name, &self.extension).is_some()
            });
            if !owned {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                tracing::warn!("Leaving unexpected directory in store root: {:?}", path);
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Raced with a concurrent remove
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!("Cleared {} file(s) from {:?}", removed, self.root);
        Ok(removed)
    }

    /// Entry count and total size of the store.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be read.
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            entries: 0,
            total_bytes: 0,
            root_directory: self.root.clone(),
        };
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let is_entry = file_name
                .to_str()
                .and_then(|name| key_for_file_name(name, &self.extension))
                .is_some();
            if !is_entry {
                continue;
            }
            match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => {
                    stats.entries += 1;
                    stats.total_bytes += metadata.len();
                }
                _ => {}
            }
        }

        Ok(stats)
    }

    /// Absolute path of the entry for `key`.
    ///
    /// # Errors
    /// Returns [`CacheStoreError::InvalidKey`] when the key cannot be mapped.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let file_name = file_name_for_key(key, &self.extension)?;
        let path = self.root.join(file_name);
        validate_entry_path(&path, &self.root)?;
        Ok(path)
    }
}

/// Builder for creating a configured `KeyedFileStore`.
#[derive(Debug, Default)]
pub struct KeyedFileStoreBuilder {
    root_directory: Option<PathBuf>,
    extension: Option<String>,
    clear_on_open: bool,
}

impl KeyedFileStoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory. Created if missing.
    #[must_use]
    pub fn root_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.root_directory = Some(path.into());
        self
    }

    /// Set the entry file extension (without the leading dot).
    #[must_use]
    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Remove all existing files when the store is opened.
    #[must_use]
    pub const fn clear_on_open(mut self, clear: bool) -> Self {
        self.clear_on_open = clear;
        self
    }

    /// Build the `KeyedFileStore`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Root directory is not set or the extension is malformed
    /// - Root directory cannot be created or secured
    /// - Clearing the existing contents fails
    pub async fn build(self) -> Result<KeyedFileStore> {
        let root = self
            .root_directory
            .ok_or_else(|| CacheStoreError::Configuration {
                message: "Root directory is required".to_string(),
            })?;

        let extension = self
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let extension_is_valid = !extension.is_empty()
            && extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric());
        if !extension_is_valid {
            return Err(CacheStoreError::Configuration {
                message: format!("Extension must be non-empty ASCII alphanumerics, got {extension:?}"),
            });
        }

        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheStoreError::DirectoryCreation {
                path: root.clone(),
                source: e,
            })?;

        set_secure_permissions(&root).await?;

        let store = KeyedFileStore { root, extension };

        if self.clear_on_open {
            let removed = store.clear().await?;
            tracing::info!(
                "Cleared {} file(s) from {:?} on open",
                removed,
                store.root
            );
        }

        tracing::info!(
            "KeyedFileStore initialized - root: {:?}, extension: {}",
            store.root,
            store.extension
        );

        Ok(store)
    }
}
