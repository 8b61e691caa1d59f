use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Fully merged run configuration: static YAML plus env-injected secrets.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyndicateConfig {
    pub export: ExportConfig,
    pub curate: CurateConfig,
    pub publish: PublishConfig,
}

impl SyndicateConfig {
    pub fn trace_loaded(&self) {
        info!(
            block_id = %self.export.block_id,
            output_dir = %self.export.output_dir.display(),
            page_id = %self.publish.page_id,
            statuses = ?self.curate.statuses,
            "Loaded SyndicateConfig"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// What to export from the workspace and where to put the archive.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    pub block_id: String,
    pub output_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Notion `token_v2` session cookie; injected from the environment,
    /// never from the YAML file.
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_polls() -> u32 {
    60
}

/// Which pages survive filtering and whether attachments get optimized.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurateConfig {
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub optimize_images: bool,
}

fn default_statuses() -> Vec<String> {
    vec!["published".to_string(), "reviewed".to_string()]
}

/// Where posts go and how the local-to-remote mapping is persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishConfig {
    pub page_id: String,
    pub mapping_csv: PathBuf,
    #[serde(default = "default_append_notion_id")]
    pub append_notion_id: bool,
    /// Page access token; injected from the environment, never from the
    /// YAML file.
    #[serde(skip)]
    pub page_token: Option<String>,
}

fn default_append_notion_id() -> bool {
    true
}
