//! Shared test utilities for the pinwall test suite.
//!
//! Provides fixture setup, lookup helpers, and bulk extractors that work with
//! scan-phase and manifest data structures (`ScannedAlbum`, `Manifest`,
//! `Album`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let manifest = Manifest::build(scan(tmp.path()).unwrap(), "images", Utc::now());
//!
//! let album = find_album(&manifest, "city-lights");
//! assert_eq!(image_titles(album), vec!["01 Bridge", "Harbor", "Night Sky"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::manifest::{Album, Manifest};
use crate::scan::ScannedAlbum;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/images/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/images");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Create `root/<album>/` holding one small file per name.
///
/// Names need not be images; non-image names exercise the classifier.
pub fn write_album(root: &Path, album: &str, files: &[&str]) {
    let dir = root.join(album);
    std::fs::create_dir_all(&dir).unwrap();
    for name in files {
        std::fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

// =========================================================================
// Manifest lookups: panic with a clear message on miss
// =========================================================================

/// Find an album by id. Panics if not found.
pub fn find_album<'a>(manifest: &'a Manifest, id: &str) -> &'a Album {
    manifest.album(id).unwrap_or_else(|| {
        let ids: Vec<&str> = manifest.albums().iter().map(|a| a.id()).collect();
        panic!("album '{id}' not found. Available: {ids:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Scanned album ids in scan order.
pub fn album_ids(albums: &[ScannedAlbum]) -> Vec<&str> {
    albums.iter().map(|a| a.id.as_str()).collect()
}

/// All image filenames in album order.
pub fn image_filenames(album: &Album) -> Vec<&str> {
    album.images().iter().map(|i| i.filename()).collect()
}

/// All image titles in album order.
pub fn image_titles(album: &Album) -> Vec<&str> {
    album.images().iter().map(|i| i.title()).collect()
}
