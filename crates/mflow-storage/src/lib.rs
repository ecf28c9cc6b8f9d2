//! Locator resolution and artifact publishing.
//!
//! This crate provides:
//! - Fetching input locators into local files: http/https URLs, plus `file://`
//!   URLs and absolute paths under an opt-in local input root
//! - Publishing finished artifacts under a public download URL

pub mod error;
pub mod local;
pub mod resolver;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStorage, StorageConfig};
pub use resolver::LocatorResolver;
