//! Image inlining: rewrite `![alt](path)` markdown references into
//! self-contained `![b64|gzip|<ext>](<base64>)` tags.
//!
//! The tag label always reads `b64|gzip|` whether or not gzip was applied;
//! downstream consumers key off the extension field, so the label is kept
//! verbatim rather than corrected.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::info;

// Rust's regex engine has no lookahead, so the trailing space-or-end guard
// is a consuming group; only capture 1 (the tag itself) is used.
static IMAGE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!\[.+?\]\(.+?\))( |$)").expect("image tag regex must compile")
});

/// Errors while inlining a single image reference.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("image tag has no `](` separator: {0}")]
    MalformedTag(String),
    #[error("failed reading image {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("gzip compression failed: {0}")]
    Gzip(std::io::Error),
}

/// First `![alt](path)` occurrence in `line` that is followed by a space or
/// the end of the line; empty string when there is none.
pub fn check_image_tag(line: &str) -> String {
    IMAGE_TAG
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extension of `path` as `splitext` reports it: includes the leading dot,
/// empty for dotless names and for dotfiles.
fn path_extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) if i > 0 => &name[i..],
        _ => "",
    }
}

/// Convert a matched image tag into its inlined form.
///
/// The tag inner text is split on the literal `](` and the second segment
/// is taken as the path; a path that itself contains `](` gets truncated at
/// the next occurrence. Markdown exports do not produce such paths, so the
/// simple split is kept.
fn convert_image_to_b64(tag: &str, base_dir: &Path) -> Result<String, EmbedError> {
    let inner = &tag[2..tag.len() - 1];
    let encoded_path = inner
        .split("](")
        .nth(1)
        .ok_or_else(|| EmbedError::MalformedTag(tag.to_string()))?;

    // Extension comes from the encoded path; the gzip branch compares it
    // against the bare string "svg", which the dot-prefixed extension never
    // equals. Kept as-is: published payloads rely on the current format.
    let ext = path_extension(encoded_path);
    let decoded_path = percent_decode_str(encoded_path).decode_utf8_lossy();
    let full_path = base_dir.join(decoded_path.as_ref());

    let bytes = fs::read(&full_path).map_err(|source| EmbedError::Io {
        path: full_path.clone(),
        source,
    })?;

    let payload = if ext == "svg" {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).map_err(EmbedError::Gzip)?;
        encoder.finish().map_err(EmbedError::Gzip)?
    } else {
        bytes
    };
    let base64_string = BASE64.encode(payload);

    info!(path = %full_path.display(), "Converted image to string");
    Ok(format!("![b64|gzip|{ext}]({base64_string})"))
}

/// Inline the first image reference in `line`, resolving the image path
/// relative to `base_dir`. Lines without image markup pass through unchanged.
pub fn embed_image(line: &str, base_dir: &Path) -> Result<String, EmbedError> {
    let tag = check_image_tag(line);
    if tag.is_empty() {
        return Ok(line.to_string());
    }
    let replacement = convert_image_to_b64(&tag, base_dir)?;
    Ok(line.replacen(&tag, &replacement, 1))
}
