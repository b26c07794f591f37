//! The versioned gallery manifest.
//!
//! A [`Manifest`] is the canonical snapshot of every album and image under the
//! images root at one point in time. It is only ever produced by
//! [`Manifest::build`] (from scanner output) or by deserializing a previously
//! emitted document, and both paths enforce the same invariants:
//!
//! - `totalAlbums == albums.len()`
//! - `totalImages == Σ album.imageCount`
//! - `album.imageCount == album.images.len()`, and every album has images
//! - image filenames are unique within their album
//! - `image.url == album.path + "/" + image.filename`
//!
//! Counts are always recomputed, never copied from input. A document whose
//! stored counts disagree with its contents is rejected instead of repaired.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "generated": "2026-10-16T09:30:00Z",
//!   "version": "1.0.0",
//!   "totalAlbums": 1,
//!   "totalImages": 2,
//!   "albums": [{
//!     "id": "nature",
//!     "name": "Nature",
//!     "path": "/images/nature",
//!     "imageCount": 2,
//!     "images": [
//!       { "filename": "a.png", "title": "A", "url": "/images/nature/a.png",
//!         "size": 1024, "lastModified": "2026-10-01T12:00:00Z" }
//!     ]
//!   }]
//! }
//! ```
//!
//! The `url` key is written for consumers' convenience but ignored on read:
//! it is re-derived from the album path.

use crate::naming::{format_folder_name, format_image_title};
use crate::scan::{ScannedAlbum, ScannedFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

/// Schema version of the manifest document. Bump when the shape changes.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported manifest version {found} (expected {expected})", expected = SCHEMA_VERSION)]
    UnsupportedVersion { found: String },
    #[error("{field} is {stored} but the manifest contains {actual}")]
    CountMismatch {
        field: String,
        stored: usize,
        actual: usize,
    },
    #[error("Malformed manifest: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawManifest")]
pub struct Manifest {
    generated: DateTime<Utc>,
    version: String,
    total_albums: usize,
    total_images: usize,
    albums: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    id: String,
    name: String,
    path: String,
    image_count: usize,
    images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    filename: String,
    title: String,
    url: String,
    size: u64,
    last_modified: DateTime<Utc>,
}

/// Public URL path of an album: `/<publicPath>/<albumId>`.
pub fn album_url_path(public_path: &str, album_id: &str) -> String {
    let prefix = public_path.trim_matches('/');
    if prefix.is_empty() {
        format!("/{album_id}")
    } else {
        format!("/{prefix}/{album_id}")
    }
}

/// Public URL of an image: `/<publicPath>/<albumId>/<filename>`.
pub fn image_url(public_path: &str, album_id: &str, filename: &str) -> String {
    format!("{}/{filename}", album_url_path(public_path, album_id))
}

impl Manifest {
    /// Assemble scanner output into a manifest stamped with `generated`.
    ///
    /// Scanned albums without files are dropped, so the result never holds
    /// an empty album.
    pub fn build(scanned: Vec<ScannedAlbum>, public_path: &str, generated: DateTime<Utc>) -> Self {
        let albums = scanned
            .into_iter()
            .filter(|album| !album.files.is_empty())
            .map(|album| Album::from_scanned(album, public_path))
            .collect();
        Self::from_albums(albums, generated)
    }

    fn from_albums(albums: Vec<Album>, generated: DateTime<Utc>) -> Self {
        let total_images = albums.iter().map(|a| a.image_count).sum();
        Self {
            generated,
            version: SCHEMA_VERSION.to_string(),
            total_albums: albums.len(),
            total_images,
            albums,
        }
    }

    /// Parse and validate a manifest from JSON text.
    ///
    /// Syntax and shape errors are [`ManifestError::Json`]; a readable
    /// document that breaks an invariant gets its own variant, so callers can
    /// branch on an unsupported version.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Pretty-printed JSON, the format of both emitted sinks.
    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 over the album list, hex encoded.
    ///
    /// Excludes `generated`, so two builds of an unchanged tree share a
    /// fingerprint.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.albums).expect("album list must serialize");
        format!("{:x}", Sha256::digest(&bytes))
    }

    pub fn generated(&self) -> DateTime<Utc> {
        self.generated
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn total_albums(&self) -> usize {
        self.total_albums
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn album(&self, id: &str) -> Option<&Album> {
        self.albums.iter().find(|a| a.id == id)
    }
}

impl Album {
    fn from_scanned(scanned: ScannedAlbum, public_path: &str) -> Self {
        let path = album_url_path(public_path, &scanned.id);
        let images: Vec<Image> = scanned
            .files
            .into_iter()
            .map(|file| Image::from_scanned(file, &path))
            .collect();
        Self {
            name: format_folder_name(&scanned.id),
            id: scanned.id,
            path,
            image_count: images.len(),
            images,
        }
    }

    /// Raw folder name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name derived from the folder name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public URL path of the album directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }
}

impl Image {
    fn from_scanned(file: ScannedFile, album_path: &str) -> Self {
        Self {
            title: format_image_title(&file.filename),
            url: format!("{album_path}/{}", file.filename),
            filename: file.filename,
            size: file.size,
            last_modified: file.modified,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

// ============================================================================
// Read-back validation
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    generated: DateTime<Utc>,
    version: String,
    total_albums: usize,
    total_images: usize,
    albums: Vec<RawAlbum>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlbum {
    id: String,
    #[serde(default)]
    name: Option<String>,
    path: String,
    image_count: usize,
    images: Vec<RawImage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImage {
    filename: String,
    #[serde(default)]
    title: Option<String>,
    size: u64,
    last_modified: DateTime<Utc>,
}

impl TryFrom<RawManifest> for Manifest {
    type Error = ManifestError;

    fn try_from(raw: RawManifest) -> Result<Self, Self::Error> {
        if raw.version != SCHEMA_VERSION {
            return Err(ManifestError::UnsupportedVersion { found: raw.version });
        }

        let albums = raw
            .albums
            .into_iter()
            .map(Album::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        {
            let mut seen = HashSet::new();
            if let Some(dup) = albums.iter().find(|a| !seen.insert(a.id.as_str())) {
                return Err(ManifestError::Malformed(format!(
                    "duplicate album id '{}'",
                    dup.id
                )));
            }
        }

        let manifest = Self::from_albums(albums, raw.generated);
        check_count("totalAlbums", raw.total_albums, manifest.total_albums)?;
        check_count("totalImages", raw.total_images, manifest.total_images)?;
        Ok(manifest)
    }
}

impl TryFrom<RawAlbum> for Album {
    type Error = ManifestError;

    fn try_from(raw: RawAlbum) -> Result<Self, Self::Error> {
        if raw.images.is_empty() {
            return Err(ManifestError::Malformed(format!(
                "album '{}' has no images",
                raw.id
            )));
        }
        check_count(
            &format!("albums[{}].imageCount", raw.id),
            raw.image_count,
            raw.images.len(),
        )?;

        let path = raw.path.trim_end_matches('/').to_string();
        let mut seen = HashSet::new();
        let mut images = Vec::with_capacity(raw.images.len());
        for img in raw.images {
            if !seen.insert(img.filename.clone()) {
                return Err(ManifestError::Malformed(format!(
                    "duplicate image '{}' in album '{}'",
                    img.filename, raw.id
                )));
            }
            images.push(Image {
                title: img
                    .title
                    .unwrap_or_else(|| format_image_title(&img.filename)),
                url: format!("{path}/{}", img.filename),
                filename: img.filename,
                size: img.size,
                last_modified: img.last_modified,
            });
        }

        Ok(Self {
            name: raw.name.unwrap_or_else(|| format_folder_name(&raw.id)),
            id: raw.id,
            path,
            image_count: images.len(),
            images,
        })
    }
}

fn check_count(field: &str, stored: usize, actual: usize) -> Result<(), ManifestError> {
    if stored == actual {
        Ok(())
    } else {
        Err(ManifestError::CountMismatch {
            field: field.to_string(),
            stored,
            actual,
        })
    }
}
