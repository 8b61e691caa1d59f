//! Raster image optimization collaborators: PNG crunching through the
//! external `crunch` binary and bitmap downscaling for feed-friendly widths.
//!
//! Both steps are best-effort preparation of attachments before inlining; a
//! missing `crunch` binary skips crunching rather than failing the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::imageops::FilterType;
use image::ImageFormat;
use tracing::{error, info, warn};

/// Widest a feed-embedded image is allowed to be, in pixels.
const MAX_WIDTH: u32 = 380;

/// Errors while resizing an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageOptError {
    #[error("filesystem operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed decoding or encoding image: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// All `.png` files under `path`, recursively.
pub fn pngs_in_path(path: &Path) -> io::Result<Vec<PathBuf>> {
    fn visit_dir(dir: &Path, results: &mut Vec<PathBuf>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit_dir(&path, results)?;
            } else if path.extension().is_some_and(|e| e == "png") {
                results.push(path);
            }
        }
        Ok(())
    }
    let mut pngs = Vec::new();
    visit_dir(path, &mut pngs)?;
    Ok(pngs)
}

/// Run the external `crunch` binary over every PNG under `path`.
///
/// A missing binary is a skip, not a failure; a non-zero exit is logged but
/// does not abort the run since crunching is an optimization.
pub fn crunch_images_in_path(path: &Path) -> io::Result<()> {
    let pngs = pngs_in_path(path)?;
    if pngs.is_empty() {
        return Ok(());
    }
    match Command::new("crunch").args(&pngs).output() {
        Ok(output) if output.status.success() => {
            info!("Crunch successful");
            info!(stdout = %String::from_utf8_lossy(&output.stdout), "Crunch output");
        }
        Ok(output) => {
            error!(
                status = ?output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Something went wrong with crunch"
            );
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Crunch not found, skipping crunching");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Delete PNGs whose path contains any of `patterns`, e.g. the suffixes the
/// cruncher appends to its outputs.
pub fn delete_processed_pngs(path: &Path, patterns: &[String]) -> io::Result<()> {
    for png in pngs_in_path(path)? {
        let png_str = png.display().to_string();
        if patterns.iter().any(|pattern| png_str.contains(pattern)) {
            fs::remove_file(&png)?;
            info!(path = %png.display(), "Deleted processed png");
        }
    }
    Ok(())
}

/// Downscale `input` to at most [`MAX_WIDTH`] pixels wide, preserving aspect
/// ratio, written alongside as `<stem>-resized<ext>`. Images already narrow
/// enough are copied through unscaled.
pub fn resize_image(input: &Path) -> Result<PathBuf, ImageOptError> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let format = match ext.as_str() {
        "png" => ImageFormat::Png,
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        other => return Err(ImageOptError::UnsupportedFormat(other.to_string())),
    };

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = input.with_file_name(format!("{stem}-resized.{ext}"));

    let mut img = image::open(input)?;
    let (width, height) = (img.width(), img.height());
    if width > MAX_WIDTH {
        let ratio = height as f64 / width as f64;
        let new_height = (ratio * MAX_WIDTH as f64).floor() as u32;
        img = img.resize_exact(MAX_WIDTH, new_height, FilterType::CatmullRom);
    }
    img.save_with_format(&output, format)?;
    info!(input = %input.display(), output = %output.display(), "Resized image");
    Ok(output)
}

/// Resize every PNG under `path`.
pub fn resize_images_in_path(path: &Path) -> Result<(), ImageOptError> {
    for png in pngs_in_path(path)? {
        resize_image(&png)?;
    }
    Ok(())
}
