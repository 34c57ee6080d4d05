//! Centralized error handling for the poster cache
//!
//! # Error Categories
//!
//! - **Upstream Errors**: catalog listing, image probe and fetch failures
//! - **Transform Errors**: decode and re-encode failures
//! - **Poster Errors**: the outcome of a single on-demand poster lookup
//! - **Storage Errors**: cache store failures (from `keyed-file-store`)
//!
//! # Usage
//!
//! ```rust
//! use poster_cache::errors::{AppError, AppResult};
//!
//! async fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for upstream catalog Results
pub type UpstreamResult<T> = Result<T, UpstreamError>;
