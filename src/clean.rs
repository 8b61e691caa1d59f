//! Metadata block stripping for exported markdown pages.
//!
//! Notion prepends a short run of `key: value` property lines to every
//! exported page. Rather than parse YAML, the block is detected heuristically:
//! a leading contiguous run of colon-separated lines within the first few
//! lines of the document. Any early content line that happens to contain a
//! colon will be caught too; that is a known caveat of the heuristic, not a
//! bug to fix here.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::embed::{self, EmbedError};

/// How many leading lines are scanned for a metadata block.
pub const DEFAULT_METADATA_WINDOW: usize = 20;

static METADATA_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.+?:.+").expect("metadata line regex must compile")
});

fn is_likely_metadata(line: &str) -> bool {
    METADATA_LINE.is_match(line)
}

/// Errors while cleaning a single document.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("failed reading or writing document: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Embed(#[from] EmbedError),
}

/// Locate a leading contiguous `key: value` block within the first
/// `max_lines` lines, returning its inclusive line range.
///
/// The block opens at the first metadata-like line and extends only while
/// consecutive lines keep matching; the first non-matching line after the
/// block has opened closes it for good, even if matching lines reappear
/// later in the window. `None` when nothing in the window matches.
pub fn find_metadata(lines: &[String], max_lines: usize) -> Option<(usize, usize)> {
    let mut span: Option<(usize, usize)> = None;
    for i in 0..max_lines.min(lines.len()) {
        let curr = is_likely_metadata(&lines[i]);
        let prev = i > 0 && is_likely_metadata(&lines[i - 1]);
        match span {
            None if curr => span = Some((i, i)),
            Some((start, _)) if prev && curr => span = Some((start, i)),
            Some(_) if !curr => break,
            _ => {}
        }
    }
    span
}

/// Slice the detected metadata block out of the document. `None` is the
/// identity; `Some((start, end))` drops lines `start..=end`.
pub fn remove_notion_metadata(lines: Vec<String>, span: Option<(usize, usize)>) -> Vec<String> {
    match span {
        None => lines,
        Some((start, end)) => {
            let mut cleaned = Vec::with_capacity(lines.len().saturating_sub(end - start + 1));
            for (i, line) in lines.into_iter().enumerate() {
                if i < start || i > end {
                    cleaned.push(line);
                }
            }
            cleaned
        }
    }
}

/// Strip the metadata block from `input` and inline its image references,
/// writing the cleaned document to `output`.
///
/// Image paths are resolved relative to the document's own directory.
pub fn process_markdown_file(input: &Path, output: &Path) -> Result<(), CleanError> {
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let content = fs::read_to_string(input)?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();

    let span = find_metadata(&lines, DEFAULT_METADATA_WINDOW);
    let lines = remove_notion_metadata(lines, span);

    let mut embedded = Vec::with_capacity(lines.len());
    for line in &lines {
        embedded.push(embed::embed_image(line, base_dir)?);
    }

    fs::write(output, embedded.join("\n") + "\n")?;
    info!(
        input = %input.display(),
        output = %output.display(),
        "Processed markdown file"
    );
    Ok(())
}
