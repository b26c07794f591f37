//! Client-side gallery shape.
//!
//! Both loader paths normalize into [`Gallery`]: the build-time manifest and
//! the runtime fallback scan. Downstream code (layout, CLI output) only ever
//! sees this shape, so it never needs to know which path produced the data.

use crate::manifest::Manifest;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a [`Gallery`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GallerySource {
    /// The manifest emitted at build time.
    Manifest,
    /// Runtime discovery by probing the image server.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gallery {
    pub source: GallerySource,
    pub albums: Vec<GalleryAlbum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryAlbum {
    pub id: String,
    pub name: String,
    pub path: String,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    /// Synthetic `<albumId>-<position>`.
    pub id: String,
    pub filename: String,
    pub title: String,
    pub url: String,
    /// Unknown for probe-discovered images.
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Synthetic image id: album id plus zero-based position.
pub fn image_id(album_id: &str, position: usize) -> String {
    format!("{album_id}-{position}")
}

impl Gallery {
    pub fn album(&self, id: &str) -> Option<&GalleryAlbum> {
        self.albums.iter().find(|a| a.id == id)
    }

    pub fn total_images(&self) -> usize {
        self.albums.iter().map(|a| a.images.len()).sum()
    }
}

impl From<&Manifest> for Gallery {
    fn from(manifest: &Manifest) -> Self {
        let albums = manifest
            .albums()
            .iter()
            .map(|album| GalleryAlbum {
                id: album.id().to_string(),
                name: album.name().to_string(),
                path: album.path().to_string(),
                images: album
                    .images()
                    .iter()
                    .enumerate()
                    .map(|(pos, image)| GalleryImage {
                        id: image_id(album.id(), pos),
                        filename: image.filename().to_string(),
                        title: image.title().to_string(),
                        url: image.url().to_string(),
                        size: Some(image.size()),
                        last_modified: Some(image.last_modified()),
                    })
                    .collect(),
            })
            .collect();
        Self {
            source: GallerySource::Manifest,
            albums,
        }
    }
}

impl GalleryAlbum {
    /// Images whose title contains `query`, case-insensitively, in album order.
    ///
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&GalleryImage> {
        let needle = query.to_lowercase();
        self.images
            .iter()
            .filter(|image| image.title.to_lowercase().contains(&needle))
            .collect()
    }
}
