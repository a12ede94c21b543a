//! Progress reporting
//!
//! Lifecycle operations report through callbacks so callers can render
//! progress however they like. The library itself never prints.

use std::fmt;
use std::sync::Arc;

use crate::infra::download::ProgressCallback;

/// Download progress of one archive
///
/// Downloads may run concurrently; `label` tells them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    Start { label: String, url: String },
    Update { label: String, downloaded: u64, total: u64 },
    End { label: String, success: bool, message: String },
}

/// Named install/uninstall step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress {
    pub name: String,
    pub message: String,
    pub completed: bool,
}

impl TaskProgress {
    pub fn started(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: String::new(),
            completed: false,
        }
    }

    pub fn completed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            completed: true,
        }
    }
}

pub type DownloadProgressCallback = Arc<dyn Fn(&DownloadProgress) + Send + Sync>;
pub type TaskProgressCallback = Arc<dyn Fn(&TaskProgress) + Send + Sync>;

/// Pair of optional callbacks passed to lifecycle operations
#[derive(Clone, Default)]
pub struct Progress {
    download: Option<DownloadProgressCallback>,
    task: Option<TaskProgressCallback>,
}

impl Progress {
    pub fn new(download: DownloadProgressCallback, task: TaskProgressCallback) -> Self {
        Self {
            download: Some(download),
            task: Some(task),
        }
    }

    /// Report nothing
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn download(&self, event: &DownloadProgress) {
        if let Some(cb) = &self.download {
            cb(event);
        }
    }

    pub fn task(&self, event: &TaskProgress) {
        if let Some(cb) = &self.task {
            cb(event);
        }
    }

    /// Byte counter for the downloader, forwarding `Update` events for `label`
    pub fn byte_callback(&self, label: &str) -> Option<ProgressCallback> {
        let cb = self.download.clone()?;
        let label = label.to_string();
        Some(Box::new(move |downloaded, total| {
            cb(&DownloadProgress::Update {
                label: label.clone(),
                downloaded,
                total,
            });
        }))
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("download", &self.download.is_some())
            .field("task", &self.task.is_some())
            .finish()
    }
}
