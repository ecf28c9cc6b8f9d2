//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use mflow_queue::Scheduler;
use mflow_worker::MediaJobHandler;

use crate::config::ApiConfig;

/// Scheduler driving media jobs.
pub type MediaScheduler = Scheduler<MediaJobHandler>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub scheduler: MediaScheduler,
    /// Directory served under `/download`
    pub download_root: Arc<PathBuf>,
}

impl AppState {
    pub fn new(config: ApiConfig, scheduler: MediaScheduler, download_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            scheduler,
            download_root: Arc::new(download_root.into()),
        }
    }
}
