//! Web handlers module
//!
//! HTTP request handlers organized by domain. Handlers stay thin and
//! delegate to the service layer.

pub mod cache;
pub mod health;
pub mod images;
pub mod reconcile;
