//! Client-side manifest loading with runtime fallback.
//!
//! [`ManifestLoader::load`] tries the build-time manifest first. Any failure
//! to obtain it (missing file, unparseable module, HTTP error, invalid
//! document) is logged and recovered by running runtime discovery instead.
//! Either result is normalized into a [`Gallery`].
//!
//! A manifest that loads but lists no albums is authoritative: the gallery is
//! empty and no probing happens.

use crate::config::GalleryConfig;
use crate::emit::{MANIFEST_FILENAME, ModuleSink};
use crate::manifest::{Manifest, album_url_path};
use crate::probe::{ProbeError, RuntimeScanner};
use crate::types::{Gallery, GallerySource};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Manifest unreachable at {location}: {reason}")]
    ManifestUnreachable { location: String, reason: String },
    #[error("No albums available: no manifest could be loaded and runtime discovery found nothing")]
    NoAlbumsAvailable,
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),
}

/// A place the build-time manifest can be read from.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Path or URL, for log and error messages.
    fn location(&self) -> String;

    /// Fails only with [`LoadError::ManifestUnreachable`].
    async fn fetch(&self) -> Result<Manifest, LoadError>;
}

/// Reads the emitted source module from disk.
pub struct ModuleFileSource {
    path: PathBuf,
}

impl ModuleFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn unreachable(&self, reason: impl ToString) -> LoadError {
        LoadError::ManifestUnreachable {
            location: self.location(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ManifestSource for ModuleFileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Manifest, LoadError> {
        let source = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.unreachable(e))?;
        ModuleSink::parse(&source).map_err(|e| self.unreachable(e))
    }
}

/// Where the JSON artifact is served: `<base_url>/<publicPath>/manifest.json`.
pub fn manifest_url(base_url: &str, public_path: &str) -> String {
    let path = album_url_path(public_path, MANIFEST_FILENAME);
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Fetches `manifest.json` over HTTP.
pub struct HttpJsonSource {
    client: reqwest::Client,
    url: String,
}

impl HttpJsonSource {
    pub fn new(url: impl Into<String>) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pinwall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProbeError::from)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn unreachable(&self, reason: impl ToString) -> LoadError {
        LoadError::ManifestUnreachable {
            location: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ManifestSource for HttpJsonSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Manifest, LoadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.unreachable(e))?;
        let body = response.text().await.map_err(|e| self.unreachable(e))?;
        Manifest::from_json(&body).map_err(|e| self.unreachable(e))
    }
}

/// Build-time source first, runtime discovery second.
pub struct ManifestLoader {
    source: Box<dyn ManifestSource>,
    scanner: RuntimeScanner,
}

impl ManifestLoader {
    pub fn new(source: Box<dyn ManifestSource>, scanner: RuntimeScanner) -> Self {
        Self { source, scanner }
    }

    /// Loader wired from config: the module at `output_file`, or the JSON
    /// artifact at `json_url` when given, falling back to HTTP probing of
    /// `probe.base_url`.
    pub fn from_config(config: &GalleryConfig, json_url: Option<&str>) -> Result<Self, LoadError> {
        let source: Box<dyn ManifestSource> = match json_url {
            Some(url) => Box::new(HttpJsonSource::new(url)?),
            None => Box::new(ModuleFileSource::new(&config.output_file)),
        };
        Ok(Self::new(source, RuntimeScanner::from_config(config)?))
    }

    pub async fn load(&self) -> Result<Gallery, LoadError> {
        match self.source.fetch().await {
            Ok(manifest) => {
                tracing::info!(
                    location = %self.source.location(),
                    albums = manifest.total_albums(),
                    images = manifest.total_images(),
                    "loaded manifest"
                );
                return Ok(Gallery::from(&manifest));
            }
            Err(err) => {
                tracing::warn!(error = %err, "falling back to runtime discovery");
            }
        }
        self.refresh().await
    }

    /// Skip the build-time manifest and rediscover albums by probing.
    pub async fn refresh(&self) -> Result<Gallery, LoadError> {
        let albums = self.scanner.scan(&[]).await;
        if albums.is_empty() {
            return Err(LoadError::NoAlbumsAvailable);
        }
        Ok(Gallery {
            source: GallerySource::Fallback,
            albums,
        })
    }
}
