//! Notion export client: enqueue a workspace export task, poll it until the
//! archive is ready, and download the archive to disk.
//!
//! Notion's task API is cookie-authenticated (`token_v2`); every call here
//! attaches that cookie. All calls block the pipeline until they return.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::COOKIE;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::contract::{Exporter, ExportError, ExportStatus};
use crate::mapping::canonical_uuid;

const DEFAULT_API_BASE: &str = "https://www.notion.so/api/v3";

static DISPOSITION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(.+)"$"#).expect("disposition filename regex must compile"));

/// Client for the Notion task API.
pub struct NotionExporter {
    client: Client,
    token: String,
    api_base: String,
}

impl NotionExporter {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE.to_string())
    }

    /// Point the client at a different API base, for tests against a stub.
    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            client: Client::new(),
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn cookie(&self) -> String {
        format!("token_v2={}", self.token)
    }

    /// Validate the session token by fetching the caller's analytics
    /// settings; a valid token yields a `user_id` in the response.
    pub async fn can_connect(&self) -> bool {
        let url = format!("{}/getUserAnalyticsSettings", self.api_base);
        let res = self
            .client
            .post(&url)
            .header(COOKIE, self.cookie())
            .json(&serde_json::json!({ "platform": "web" }))
            .send()
            .await;
        match res {
            Ok(res) if res.status().is_success() => {
                info!("Received response from notion, checking token validity");
                match res.json::<serde_json::Value>().await {
                    Ok(body) => match body.get("user_id").and_then(|v| v.as_str()) {
                        Some(user_id) => {
                            info!(user_id, "Validated token");
                            true
                        }
                        None => {
                            warn!("Likely invalidated token");
                            false
                        }
                    },
                    Err(_) => false,
                }
            }
            _ => {
                warn!("Cannot connect to notion");
                false
            }
        }
    }
}

#[async_trait]
impl Exporter for NotionExporter {
    async fn trigger_export(&self, block_id: &str) -> Result<String, ExportError> {
        if block_id.is_empty() {
            return Err(ExportError::MissingParameter("block_id"));
        }
        let url = format!("{}/enqueueTask", self.api_base);
        let payload = serde_json::json!({
            "task": {
                "eventName": "exportBlock",
                "request": {
                    "blockId": canonical_uuid(block_id),
                    "recursive": true,
                    "exportOptions": {
                        "exportType": "markdown",
                        "timeZone": "America/New_York",
                        "locale": "en",
                    },
                },
            },
        });

        let res = self
            .client
            .post(&url)
            .header(COOKIE, self.cookie())
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ExportError::Api(format!(
                "failed to trigger export: {body}"
            )));
        }
        let body: serde_json::Value = res.json().await?;
        let task_id = body
            .get("taskId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ExportError::Api("enqueueTask response had no taskId".to_string()))?
            .to_string();
        info!(task_id, "Succeeded in triggering export");
        Ok(task_id)
    }

    async fn export_status(&self, task_id: &str) -> Result<ExportStatus, ExportError> {
        let url = format!("{}/getTasks", self.api_base);
        let payload = serde_json::json!({ "taskIds": [task_id] });

        let res = self
            .client
            .post(&url)
            .header(COOKIE, self.cookie())
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ExportError::Api(format!(
                "failed to get export status: {body}"
            )));
        }
        let body: serde_json::Value = res.json().await?;
        let status = ExportStatus {
            state: body
                .pointer("/results/0/state")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            export_url: body
                .pointer("/results/0/status/exportURL")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        debug!(task_id, state = ?status.state, "Fetched export status");
        Ok(status)
    }

    async fn download_export<'a>(
        &self,
        url: &str,
        save_to: &Path,
        save_as: Option<&'a str>,
    ) -> Result<PathBuf, ExportError> {
        let filename = match save_as {
            Some(name) => name.to_string(),
            None => export_filename(url),
        };
        let output_path = save_to.join(filename);

        let mut res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(ExportError::Api(format!(
                "download returned status {}",
                res.status()
            )));
        }
        let mut file = File::create(&output_path)?;
        while let Some(chunk) = res.chunk().await? {
            file.write_all(&chunk)?;
        }
        info!(path = %output_path.display(), "Downloaded export archive");
        Ok(output_path)
    }
}

/// Derive the archive file name from the download link's
/// `response-content-disposition` query parameter; when the link carries no
/// usable disposition, fall back to a timestamped name.
pub fn export_filename(link: &str) -> String {
    let from_disposition = reqwest::Url::parse(link).ok().and_then(|url| {
        let disposition = url
            .query_pairs()
            .find(|(key, _)| key == "response-content-disposition")
            .map(|(_, value)| value.into_owned())?;
        DISPOSITION_FILENAME
            .captures(&disposition)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });
    match from_disposition {
        Some(name) => name,
        None => {
            warn!("Cannot determine filename, creating a timestamp filename");
            let now = Local::now().format("%Y%m%d%H%M%S");
            format!("Export-no-name-{now}.zip")
        }
    }
}

/// Poll the export task until the archive link appears, sleeping
/// `interval_secs` between polls. Strictly sequential; gives up after
/// `max_polls` attempts.
pub async fn wait_for_export<E: Exporter + ?Sized>(
    exporter: &E,
    task_id: &str,
    interval_secs: u64,
    max_polls: u32,
) -> Result<String, ExportError> {
    for attempt in 1..=max_polls {
        let status = exporter.export_status(task_id).await?;
        if let Some(url) = status.export_url {
            info!(task_id, attempt, "Export complete");
            return Ok(url);
        }
        debug!(task_id, attempt, state = ?status.state, "Export not ready yet");
        if attempt < max_polls {
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        }
    }
    Err(ExportError::TimedOut(max_polls))
}
