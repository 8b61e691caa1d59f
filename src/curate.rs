//! Archive handling and page curation: unpack the exported zip, keep only
//! pages whose database status marks them publication-ready, and produce the
//! cleaned documents the publisher consumes.
//!
//! Directory layout produced next to the extracted archive:
//! `<archive>/` → `<archive>-filtered/` → `<archive>-cleaned/`.

use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::clean::{self, CleanError};

/// Errors while extracting, filtering, or cleaning an export.
#[derive(Debug, thiserror::Error)]
pub enum CurateError {
    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed extracting archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed reading database csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no database csv found under {0}")]
    NoDatabase(PathBuf),
    #[error("database csv has no '{0}' column")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Clean(#[from] CleanError),
}

/// Append a suffix to a directory name, e.g. `export` → `export-filtered`.
fn suffixed_dir(dir: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", dir.display(), suffix))
}

/// Remove a stale directory if present (logged, since it discards a previous
/// run's output) and recreate it empty.
fn recreate_dir(path: &Path) -> Result<(), CurateError> {
    if path.exists() {
        fs::remove_dir_all(path)?;
        warn!(path = %path.display(), "Deleted existing directory");
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Extract `input` into a directory named after the archive stem under
/// `output`, replacing any previous extraction, and return that directory.
pub fn extract_zip(input: &Path, output: &Path) -> Result<PathBuf, CurateError> {
    let folder_name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let path = output.join(folder_name);
    recreate_dir(&path)?;

    let mut archive = zip::ZipArchive::new(File::open(input)?)?;
    archive.extract(&path)?;
    info!(archive = %input.display(), path = %path.display(), "Extracted zip file");
    Ok(path)
}

/// Locate the exported database csv. Notion puts exactly one csv in the
/// archive, so the first one found wins.
fn find_database_csv(directory: &Path) -> Result<PathBuf, CurateError> {
    fn visit_dir(dir: &Path, found: &mut Option<PathBuf>) -> Result<(), CurateError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if found.is_some() {
                return Ok(());
            }
            if path.is_dir() {
                visit_dir(&path, found)?;
            } else if path.extension().is_some_and(|e| e == "csv") {
                *found = Some(path);
                return Ok(());
            }
        }
        Ok(())
    }
    let mut found = None;
    visit_dir(directory, &mut found)?;
    found.ok_or_else(|| CurateError::NoDatabase(directory.to_path_buf()))
}

/// Read the database csv and return the page names whose status matches one
/// of `statuses` (all comparisons lower-cased).
fn wanted_texts(csv_path: &Path, statuses: &[String]) -> Result<Vec<String>, CurateError> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let status_idx = headers
        .iter()
        .position(|h| h == "status")
        .ok_or(CurateError::MissingColumn("status"))?;
    let text_idx = headers
        .iter()
        .position(|h| h == "text")
        .ok_or(CurateError::MissingColumn("text"))?;

    let statuses: Vec<String> = statuses.iter().map(|s| s.to_lowercase()).collect();
    let mut wanted = Vec::new();
    for record in reader.records() {
        let record = record?;
        let status = record.get(status_idx).unwrap_or("").trim().to_lowercase();
        if statuses.contains(&status) {
            if let Some(text) = record.get(text_idx) {
                wanted.push(text.trim().to_string());
            }
        }
    }
    Ok(wanted)
}

/// Recursively copy every file under `dir` flat into `target`.
fn copy_dir_flat(dir: &Path, target: &Path) -> Result<(), CurateError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            copy_dir_flat(&path, target)?;
        } else if let Some(name) = path.file_name() {
            fs::copy(&path, target.join(name))?;
        }
    }
    Ok(())
}

/// Keep only the pages with a publication-ready status.
///
/// Creates `<directory>-filtered` holding the matching `.md` files plus the
/// contents of their attachment directories, copied flat, and returns it.
/// The page files live in the directory named after the database csv with
/// the `.csv` suffix removed.
pub fn filter_texts(directory: &Path, statuses: &[String]) -> Result<PathBuf, CurateError> {
    let csv_path = find_database_csv(directory)?;
    let wanted = wanted_texts(&csv_path, statuses)?;
    info!(
        csv = %csv_path.display(),
        wanted = wanted.len(),
        "Selected publication-ready pages from database"
    );

    let text_dir = PathBuf::from(
        csv_path
            .display()
            .to_string()
            .trim_end_matches(".csv")
            .to_string(),
    );

    let filtered_dir = suffixed_dir(directory, "-filtered");
    recreate_dir(&filtered_dir)?;

    for entry in fs::read_dir(&text_dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let is_wanted = |n: &str| wanted.iter().any(|w| !w.is_empty() && n.starts_with(w));
        if path.is_file() && name.ends_with(".md") && is_wanted(&name) {
            fs::copy(&path, filtered_dir.join(&name))?;
            info!(page = %name, target = %filtered_dir.display(), "Copied page");
        } else if path.is_dir() && is_wanted(&name) {
            // Attachment directory for a wanted page: flatten its files so
            // relative image paths keep resolving after the copy.
            copy_dir_flat(&path, &filtered_dir)?;
            info!(attachments = %name, target = %filtered_dir.display(), "Copied attachments");
        }
    }
    Ok(filtered_dir)
}

/// Strip metadata and inline images for every page in `filtered_dir`,
/// producing the sibling `-cleaned` directory.
pub fn clean_texts(filtered_dir: &Path) -> Result<PathBuf, CurateError> {
    let dir_str = filtered_dir.display().to_string();
    let cleaned_dir = match dir_str.strip_suffix("-filtered") {
        Some(stem) => PathBuf::from(format!("{stem}-cleaned")),
        None => suffixed_dir(filtered_dir, "-cleaned"),
    };
    recreate_dir(&cleaned_dir)?;

    for entry in fs::read_dir(filtered_dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !path.is_file() || !name.ends_with(".md") {
            continue;
        }
        let output = cleaned_dir.join(&name);
        clean::process_markdown_file(&path, &output)?;
    }
    info!(path = %cleaned_dir.display(), "Cleaned filtered pages");
    Ok(cleaned_dir)
}
