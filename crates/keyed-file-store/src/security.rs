//! Security utilities for the store root.

use crate::error::{CacheStoreError, Result};
use std::path::Path;

/// Sets owner-only permissions on a directory (Unix only).
pub async fn set_secure_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(path, perms)
            .await
            .map_err(|_e| CacheStoreError::Permission {
                operation: "set secure permissions".to_string(),
                path: path.to_path_buf(),
            })?;
    }

    #[cfg(not(unix))]
    {
        if !path.exists() {
            return Err(CacheStoreError::Configuration {
                message: format!("Root directory does not exist: {}", path.display()),
            });
        }
    }

    Ok(())
}

/// Validates that an entry path is a direct child of the store root.
pub fn validate_entry_path(entry_path: &Path, root: &Path) -> Result<()> {
    if entry_path.parent() != Some(root) {
        return Err(CacheStoreError::InvalidKey {
            key: entry_path.display().to_string(),
            reason: format!("entry path is not directly under {}", root.display()),
        });
    }
    Ok(())
}
