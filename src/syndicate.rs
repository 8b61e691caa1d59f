//! High-level pipeline: export → extract → filter → clean → publish.
//!
//! `syndicate` drives a full run against the two remote boundaries
//! ([`Exporter`], [`Publisher`]) and the filesystem stages in between.
//! Every stage is awaited before the next begins and any stage error aborts
//! the run; there is no partial recovery beyond the reconciler's single
//! documented create-fallback.
//!
//! `batch_send_posts` is the reconciler: for each cleaned page it decides
//! create-vs-update from the persisted mapping table, rewriting the whole
//! table after every mutation.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::config::SyndicateConfig;
use crate::contract::{Exporter, ExportError, Publisher, PublishError};
use crate::curate::{self, CurateError};
use crate::export::wait_for_export;
use crate::images::{self, ImageOptError};
use crate::mapping::{self, MappingError, MappingTable};

/// Errors aborting a syndication run, tagged by the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum SyndicateError {
    #[error("export stage failed: {0}")]
    Export(#[from] ExportError),
    #[error("curate stage failed: {0}")]
    Curate(#[from] CurateError),
    #[error("image optimization failed: {0}")]
    Images(#[from] ImageOptError),
    #[error("publish stage failed: {0}")]
    Publish(#[from] PublishError),
    #[error("mapping table failure: {0}")]
    Mapping(#[from] MappingError),
    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one page during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    /// No mapping existed; a new remote post was created.
    Created,
    /// The mapped remote post was updated in place.
    Updated,
    /// The mapped post was gone remotely; a new post replaced it.
    Remapped,
}

/// Outcome for one page.
#[derive(Debug)]
pub struct PostReport {
    pub notion_id: String,
    pub fb_id: String,
    pub action: PostAction,
}

/// Aggregated run outcome, printed by the CLI.
#[derive(Debug)]
pub struct SyndicateReport {
    pub posts: Vec<PostReport>,
}

/// Run the full pipeline according to `config`.
pub async fn syndicate<E, P>(
    config: &SyndicateConfig,
    exporter: &E,
    publisher: &P,
) -> Result<SyndicateReport, SyndicateError>
where
    E: Exporter + ?Sized,
    P: Publisher + ?Sized,
{
    info!("[SYNDICATE] Starting full syndication pipeline");
    fs::create_dir_all(&config.export.output_dir)?;

    let task_id = exporter.trigger_export(&config.export.block_id).await?;
    info!(task_id, "[SYNDICATE] Export triggered");

    let export_url = wait_for_export(
        exporter,
        &task_id,
        config.export.poll_interval_secs,
        config.export.max_polls,
    )
    .await?;

    let archive = exporter
        .download_export(&export_url, &config.export.output_dir, None)
        .await?;
    info!(archive = %archive.display(), "[SYNDICATE] Export downloaded");

    let extracted = curate::extract_zip(&archive, &config.export.output_dir)?;
    let filtered = curate::filter_texts(&extracted, &config.curate.statuses)?;

    if config.curate.optimize_images {
        images::resize_images_in_path(&filtered)?;
        images::crunch_images_in_path(&filtered)?;
    }

    let cleaned = curate::clean_texts(&filtered)?;

    let posts = batch_send_posts(
        &cleaned,
        &config.publish.mapping_csv,
        publisher,
        config.publish.append_notion_id,
    )
    .await?;

    info!(posts = posts.len(), "[SYNDICATE] Pipeline complete");
    Ok(SyndicateReport { posts })
}

/// Read one cleaned page, deriving its local id from the file name and
/// optionally appending that id as a trailing line for traceability.
fn extract_notion_text(
    path: &Path,
    filename: &str,
    append_notion_id: bool,
) -> Result<(String, String), std::io::Error> {
    let notion_id = mapping::notion_id(filename);
    let mut message = fs::read_to_string(path)?;
    if append_notion_id {
        message.push_str(&format!("\n\n{notion_id}"));
    }
    Ok((notion_id, message))
}

/// Reconcile every cleaned page against the remote feed.
///
/// Mapped pages get an update; an update rejected with the authentication
/// error kind means the remote post is gone, so a fresh post is created and
/// the mapping entry overwritten. Unmapped pages get a create. Every table
/// mutation triggers a full rewrite of the mapping file; successful updates
/// leave the file untouched. Pages are visited in whatever order the
/// directory listing yields.
pub async fn batch_send_posts<P>(
    cleaned_dir: &Path,
    mapping_path: &Path,
    publisher: &P,
    append_notion_id: bool,
) -> Result<Vec<PostReport>, SyndicateError>
where
    P: Publisher + ?Sized,
{
    let mut map = MappingTable::load(mapping_path)?;
    let mut reports = Vec::new();

    for entry in fs::read_dir(cleaned_dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !path.is_file() || !name.ends_with(".md") {
            continue;
        }
        let (notion_id, message) = extract_notion_text(&path, &name, append_notion_id)?;

        if let Some(fb_id) = map.get(&notion_id).map(str::to_string) {
            match publisher.update_post(&fb_id, &message).await {
                Ok(()) => {
                    info!(notion_id, fb_id, "Updated existing post");
                    reports.push(PostReport {
                        notion_id,
                        fb_id,
                        action: PostAction::Updated,
                    });
                }
                Err(PublishError::Authentication { kind, code }) => {
                    warn!(
                        notion_id,
                        fb_id,
                        kind,
                        code,
                        "Cannot find post on the page anymore, publishing a new one"
                    );
                    let new_id = publisher.create_post(&message).await?;
                    map.insert(notion_id.clone(), new_id.clone());
                    map.save(mapping_path)?;
                    reports.push(PostReport {
                        notion_id,
                        fb_id: new_id,
                        action: PostAction::Remapped,
                    });
                }
                Err(e) => {
                    error!(notion_id, fb_id, error = ?e, "Update failed fatally");
                    return Err(e.into());
                }
            }
        } else {
            let fb_id = publisher.create_post(&message).await?;
            map.insert(notion_id.clone(), fb_id.clone());
            map.save(mapping_path)?;
            info!(notion_id, fb_id, "Added new post to mapping");
            reports.push(PostReport {
                notion_id,
                fb_id,
                action: PostAction::Created,
            });
        }
    }
    Ok(reports)
}
