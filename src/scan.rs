//! Filesystem scanning of the images root.
//!
//! First step of manifest generation. Walks the images root exactly one level
//! down: every immediate subdirectory is a candidate album, and the qualifying
//! image files directly inside it become that album's images.
//!
//! ## Directory Structure
//!
//! ```text
//! public/images/                 # Images root
//! ├── manifest.json              # Written by the emitter, ignored here
//! ├── nature/                    # Album "nature"
//! │   ├── a.png
//! │   ├── b.jpg
//! │   └── readme.txt             # Not an image, skipped
//! ├── city-lights/               # Album "city-lights"
//! │   └── bridge.webp
//! └── empty/                     # No qualifying files, omitted entirely
//! ```
//!
//! ## Rules
//!
//! - Only immediate subdirectories are albums; files at the root and deeper
//!   directories are ignored.
//! - A file qualifies when its extension is in [`SUPPORTED_EXTENSIONS`],
//!   compared case-insensitively.
//! - Directories with zero qualifying files do not become empty albums.
//! - Albums and files are visited in file-name order, so repeated scans of an
//!   unchanged tree produce identical output.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Images root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Image extensions accepted by the scanner, lowercase, without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// One album as found on disk, before any formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedAlbum {
    /// Raw folder name.
    pub id: String,
    /// Qualifying files sorted by filename.
    pub files: Vec<ScannedFile>,
}

/// A qualifying file with the metadata captured at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Whether a path names a supported image, judged by its extension only.
///
/// Works for paths that no longer exist (removal events), since nothing is
/// read from disk.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether a path is an existing regular file with a supported extension.
pub fn is_image_file(path: &Path) -> bool {
    path.is_file() && has_image_extension(path)
}

/// Scan the images root into albums.
///
/// Fails with [`ScanError::RootNotFound`] when `root` is missing or not a
/// directory. Creating it is left to the caller.
pub fn scan(root: &Path) -> Result<Vec<ScannedAlbum>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut albums = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();
        let files = scan_album(entry.path())?;
        if files.is_empty() {
            tracing::debug!(album = %id, "skipping directory without images");
            continue;
        }
        albums.push(ScannedAlbum { id, files });
    }

    Ok(albums)
}

fn scan_album(dir: &Path) -> Result<Vec<ScannedFile>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_image_extension(entry.path()) {
            continue;
        }
        let metadata = entry.metadata()?;
        let modified = metadata.modified()?;
        files.push(ScannedFile {
            filename: entry.file_name().to_string_lossy().to_string(),
            size: metadata.len(),
            modified: DateTime::<Utc>::from(modified),
        });
    }
    Ok(files)
}
