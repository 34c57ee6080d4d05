//! Error type definitions for the poster cache.

use keyed_file_store::CacheStoreError;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream catalog errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Cache store errors
    #[error("Storage error: {0}")]
    Storage(#[from] CacheStoreError),

    /// Operation already in progress errors
    #[error("Operation already in progress: {operation_type} on {resource}")]
    OperationInProgress {
        operation_type: String,
        resource: String,
    },
}

/// Errors talking to the upstream media catalog
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Connection, timeout or body read failures
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Body or headers could not be interpreted
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from the image transform stage
#[derive(Error, Debug)]
pub enum TransformError {
    /// Input is not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// JPEG encoder rejected the image
    #[error("Failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    /// The blocking transform task did not complete
    #[error("Transform worker failed: {message}")]
    Worker { message: String },
}

/// Outcome of a failed on-demand poster lookup
#[derive(Error, Debug)]
pub enum PosterError {
    /// Upstream has no image for the item
    #[error("No poster for item {item_id}")]
    NotFound { item_id: String },

    /// Upstream could not be reached or answered with an error
    #[error("Upstream unavailable for item {item_id}: {source}")]
    UpstreamUnavailable {
        item_id: String,
        #[source]
        source: UpstreamError,
    },

    /// Upstream bytes could not be transformed
    #[error("Failed to transform poster for item {item_id}: {source}")]
    TransformFailure {
        item_id: String,
        #[source]
        source: TransformError,
    },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create an operation in progress error
    pub fn operation_in_progress<O: Into<String>, R: Into<String>>(
        operation_type: O,
        resource: R,
    ) -> Self {
        Self::OperationInProgress {
            operation_type: operation_type.into(),
            resource: resource.into(),
        }
    }
}

impl UpstreamError {
    /// Whether upstream answered 404 for the resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl PosterError {
    /// Map an upstream fetch failure for `item_id` onto the poster taxonomy.
    pub fn from_upstream<S: Into<String>>(item_id: S, source: UpstreamError) -> Self {
        let item_id = item_id.into();
        if source.is_not_found() {
            Self::NotFound { item_id }
        } else {
            Self::UpstreamUnavailable { item_id, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_404_becomes_not_found() {
        let err = PosterError::from_upstream(
            "abc",
            UpstreamError::Status {
                status: 404,
                url: "http://jellyfin/Items/abc/Images/Primary".to_string(),
            },
        );
        assert!(matches!(err, PosterError::NotFound { ref item_id } if item_id == "abc"));
    }

    #[test]
    fn test_other_status_is_unavailable() {
        let err = PosterError::from_upstream(
            "abc",
            UpstreamError::Status {
                status: 503,
                url: "http://jellyfin/Items/abc/Images/Primary".to_string(),
            },
        );
        assert!(matches!(err, PosterError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_operation_in_progress_message() {
        let err = AppError::operation_in_progress("reconcile", "poster cache");
        assert_eq!(
            err.to_string(),
            "Operation already in progress: reconcile on poster cache"
        );
    }
}
