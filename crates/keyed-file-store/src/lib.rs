//! # Keyed File Store
//!
//! A flat, keyed, on-disk blob store. Each key maps to exactly one file
//! directly under a root directory, and the directory listing is the only
//! index: there is no manifest to keep in sync.
//!
//! ## Features
//!
//! - **Atomic writes**: entries are staged in the root, flushed and renamed
//!   into place, so concurrent readers never observe a partial entry
//! - **Reversible key mapping**: keys are percent-encoded into file names and
//!   decoded back when listing
//! - **Clear on open**: optionally start from an empty root
//! - **Owner-only root**: the root directory is created with `0o700` on Unix
//!
//! ## Basic Usage
//!
//! ```rust
//! use keyed_file_store::KeyedFileStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = KeyedFileStore::builder()
//!     .root_directory("/var/cache/posters")
//!     .extension("jpg")
//!     .clear_on_open(true)
//!     .build()
//!     .await?;
//!
//! store.write("5f3c9a0b", b"jpeg bytes").await?;
//! let bytes = store.read("5f3c9a0b").await?;
//! let keys = store.list_keys().await?;
//! store.remove_if_exists("5f3c9a0b").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keys;
pub mod security;
pub mod store;

pub use error::{CacheStoreError, Result};
pub use store::{KeyedFileStore, KeyedFileStoreBuilder, StoreStats};
