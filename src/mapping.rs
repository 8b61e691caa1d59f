//! Local-to-remote id mapping: canonical id formatting and the persisted
//! CSV table that drives the create-vs-update decision.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

/// Errors reading or rewriting the mapping CSV.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed reading mapping file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed mapping file: {0}")]
    Csv(#[from] csv::Error),
}

/// Reformat a hyphen-less id into the 8-4-4-8 grouping Notion block ids use.
///
/// Ids that already contain a hyphen are returned unchanged, which makes the
/// function idempotent: the first pass inserts hyphens, every later pass is
/// the identity.
pub fn canonical_uuid(id: &str) -> String {
    if id.contains('-') {
        return id.to_string();
    }
    let mut out = String::with_capacity(id.len() + 3);
    for (i, ch) in id.chars().enumerate() {
        if i == 8 || i == 12 || i == 16 {
            out.push('-');
        }
        out.push(ch);
    }
    out
}

/// Derive the canonical local id from an exported file name.
///
/// Notion names exported pages `<title> <id>.md`; the id is the token after
/// the last space with the `.md` suffix stripped.
pub fn notion_id(filename: &str) -> String {
    let token = filename.rsplit(' ').next().unwrap_or(filename);
    let token = token.strip_suffix(".md").unwrap_or(token);
    canonical_uuid(token)
}

/// In-memory view of the persisted `notion_id,fb_id` table.
///
/// The whole file is loaded at the start of a reconciliation run and fully
/// rewritten (header plus every row) after each mutation; rows are never
/// appended. Rewrites are not atomic: a single-writer batch job is assumed.
#[derive(Debug, Default)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    /// Load the table from `path`. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        if !path.exists() {
            debug!(path = %path.display(), "No mapping file yet, starting empty");
            return Ok(Self::default());
        }
        let mut entries = BTreeMap::new();
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.records() {
            let record = record?;
            if let (Some(notion_id), Some(fb_id)) = (record.get(0), record.get(1)) {
                entries.insert(notion_id.trim().to_string(), fb_id.trim().to_string());
            }
        }
        info!(path = %path.display(), rows = entries.len(), "Loaded mapping table");
        Ok(Self { entries })
    }

    /// Remote id mapped to `notion_id`, if any.
    pub fn get(&self, notion_id: &str) -> Option<&str> {
        self.entries.get(notion_id).map(String::as_str)
    }

    /// Insert or overwrite a mapping. Callers persist afterwards.
    pub fn insert(&mut self, notion_id: String, fb_id: String) {
        self.entries.insert(notion_id, fb_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole table at `path`: header first, then every row.
    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["notion_id", "fb_id"])?;
        for (notion_id, fb_id) in &self.entries {
            writer.write_record([notion_id, fb_id])?;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = self.entries.len(), "Rewrote mapping table");
        Ok(())
    }
}
