//! Locator resolver seam.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use mflow_models::JobId;

use crate::error::StorageResult;

/// Turns remote locators into local files and local artifacts into public locators.
#[async_trait]
pub trait LocatorResolver: Send + Sync {
    /// Materialize `locator` as a local file in `dest_dir`, named for `job_id`.
    async fn fetch(&self, locator: &str, dest_dir: &Path, job_id: &JobId) -> StorageResult<PathBuf>;

    /// Make a local artifact retrievable and return its public locator.
    async fn publish(&self, path: &Path, file_name: &str) -> StorageResult<String>;

    /// Local directory backing published artifacts.
    fn root(&self) -> &Path;
}
