use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info};

use crate::config::SyndicateConfig;

/// Loads a static YAML config file (no secrets) and injects required env
/// vars for secrets. Returns a fully merged SyndicateConfig or an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyndicateConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: SyndicateConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let notion_token = match std::env::var("NOTION_TOKEN_V2") {
        Ok(token) => {
            info!("NOTION_TOKEN_V2 found in env");
            token
        }
        Err(e) => {
            error!(error = ?e, "NOTION_TOKEN_V2 environment variable not set");
            return Err(anyhow::anyhow!(
                "NOTION_TOKEN_V2 environment variable not set: {e}"
            ));
        }
    };

    let page_token = match std::env::var("FB_PAGE_TOKEN") {
        Ok(token) => {
            info!("FB_PAGE_TOKEN found in env");
            token
        }
        Err(e) => {
            error!(error = ?e, "FB_PAGE_TOKEN environment variable not set");
            return Err(anyhow::anyhow!(
                "FB_PAGE_TOKEN environment variable not set: {e}"
            ));
        }
    };

    if config.export.block_id.is_empty() {
        error!("export.block_id must not be empty");
        anyhow::bail!("export.block_id must not be empty");
    }
    if config.publish.page_id.is_empty() {
        error!("publish.page_id must not be empty");
        anyhow::bail!("publish.page_id must not be empty");
    }

    config.export.token = Some(notion_token);
    config.publish.page_token = Some(page_token);

    config.trace_loaded();
    info!(
        output_dir = %config.export.output_dir.display(),
        mapping_csv = %config.publish.mapping_csv.display(),
        "Config loaded and merged successfully"
    );
    Ok(config)
}
