//! Mapping between store keys and on-disk file names.
//!
//! Keys are opaque strings. A key is percent-encoded (RFC 3986 unreserved
//! characters are kept as-is) and suffixed with the store extension, so the
//! mapping is deterministic, reversible and never produces a path separator.

use crate::error::{CacheStoreError, Result};

/// Most filesystems cap a single path component at 255 bytes.
const MAX_FILE_NAME_LEN: usize = 255;

/// Prefix for staged writes. Staged files never carry the entry extension.
pub(crate) const STAGING_PREFIX: &str = ".staged-";
pub(crate) const STAGING_SUFFIX: &str = ".partial";

/// Build the file name for `key` under the given extension.
///
/// # Errors
/// Returns [`CacheStoreError::InvalidKey`] when the key is empty or the
/// encoded file name would exceed the filesystem component limit.
pub fn file_name_for_key(key: &str, extension: &str) -> Result<String> {
    if key.is_empty() {
        return Err(CacheStoreError::InvalidKey {
            key: key.to_string(),
            reason: "key cannot be empty".to_string(),
        });
    }

    // A leading dot would hide the entry and could collide with staged writes
    let encoded = urlencoding::encode(key);
    let file_name = match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}.{extension}"),
        None => format!("{encoded}.{extension}"),
    };
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(CacheStoreError::InvalidKey {
            key: key.to_string(),
            reason: format!(
                "encoded file name is {} bytes (max {MAX_FILE_NAME_LEN})",
                file_name.len()
            ),
        });
    }

    Ok(file_name)
}

/// Recover the key from a file name produced by [`file_name_for_key`].
///
/// Returns `None` for anything that is not an entry of this store: staged
/// writes, foreign files, or names that do not decode.
pub fn key_for_file_name(file_name: &str, extension: &str) -> Option<String> {
    if file_name.starts_with(STAGING_PREFIX) {
        return None;
    }
    let encoded = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    if encoded.is_empty() {
        return None;
    }
    let key = urlencoding::decode(encoded).ok()?.into_owned();
    // Only the canonical encoding of a key belongs to the store, otherwise
    // the listed key would point at a different file
    let canonical = file_name_for_key(&key, extension).ok()?;
    (canonical == file_name).then_some(key)
}
