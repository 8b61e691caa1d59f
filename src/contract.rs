//! # contract: trait seams for the export and publish boundaries
//!
//! This module defines the two remote-facing traits (`Exporter`, `Publisher`)
//! and the error types shared across the pipeline. Concrete implementations
//! live in `export` (Notion API) and `publish` (Facebook Graph API); tests
//! consume the generated `MockExporter` / `MockPublisher`.
//!
//! Both traits are async and strictly sequential from the caller's point of
//! view: the orchestrator awaits every call before issuing the next one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;

/// Errors from the export boundary (trigger, poll, download).
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("export API rejected the request: {0}")]
    Api(String),
    #[error("export did not complete after {0} polls")]
    TimedOut(u32),
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("failed writing downloaded export: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the publish boundary.
///
/// `Authentication` is the one kind the reconciler pattern-matches on to
/// trigger its create-fallback; every other variant is terminal for the run.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish API authentication failed: {kind}, {code}")]
    Authentication { kind: String, code: String },
    #[error("publish API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("publish API reported failure: {0}")]
    Api(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Snapshot of an export task as reported by the remote API.
#[derive(Debug, Clone, Default)]
pub struct ExportStatus {
    /// Remote task state, e.g. "in_progress" or "success".
    pub state: Option<String>,
    /// Download link for the finished archive, present once complete.
    pub export_url: Option<String>,
}

impl ExportStatus {
    /// An export is complete once the API hands back a download link.
    pub fn is_complete(&self) -> bool {
        self.export_url.is_some()
    }
}

/// Trait for driving a remote workspace export: enqueue a task, poll it,
/// download the resulting archive. Implemented by the Notion client and by
/// test mocks.
#[cfg_attr(any(test, feature = "test-publish-mocks"), automock)]
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Enqueue an export task for the given block and return its task id.
    async fn trigger_export(&self, block_id: &str) -> Result<String, ExportError>;

    /// Fetch the current status of an export task.
    async fn export_status(&self, task_id: &str) -> Result<ExportStatus, ExportError>;

    /// Download the finished archive to `save_to`, optionally under a fixed
    /// file name, and return the path it was saved at.
    async fn download_export<'a>(
        &self,
        url: &str,
        save_to: &Path,
        save_as: Option<&'a str>,
    ) -> Result<PathBuf, ExportError>;
}

/// Trait for publishing and updating remote posts.
///
/// The implementor owns the target (page id) and credentials; callers only
/// hand over content. Mirrors the single-writer batch contract: one call at
/// a time, no retries beyond what the reconciler decides.
#[cfg_attr(any(test, feature = "test-publish-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a brand-new remote post and return its remote id.
    async fn create_post(&self, message: &str) -> Result<String, PublishError>;

    /// Update an existing remote post in place.
    async fn update_post(&self, post_id: &str, message: &str) -> Result<(), PublishError>;
}
