//! Runtime fallback discovery.
//!
//! When no manifest can be loaded, albums are discovered by asking the image
//! server for a fixed catalog of likely filenames and keeping whatever
//! answers. This is best-effort: albums whose files follow none of the
//! catalog's patterns are invisible, so results are possibly incomplete.
//!
//! ## Candidate catalog
//!
//! For each album, patterns are tried in order, each with every extension in
//! [`PROBE_EXTENSIONS`]:
//!
//! ```text
//! 1 .. 20              1.jpg, 1.jpeg, 1.png, 1.gif, 1.webp, 2.jpg, ...
//! image1 .. image20
//! img1 .. img20
//! photo1 .. photo20
//! main hero banner featured cover sample demo test example
//! ```
//!
//! ## Bounds
//!
//! [`probe_album`] is a lazy stream that ends on whichever comes first:
//!
//! - the catalog is exhausted;
//! - `max_attempts` probes have been issued (checked before every probe);
//! - at a pattern boundary, the last `max_consecutive_failures` or more probes
//!   all missed. Once a pattern starts, all of its extensions are tried.
//!
//! Each probe runs under a timeout. A probe that times out or fails at the
//! transport level counts as a miss and is never retried.

use crate::config::{GalleryConfig, ProbeConfig};
use crate::manifest::{album_url_path, image_url};
use crate::naming::{format_folder_name, format_image_title};
use crate::types::{GalleryAlbum, GalleryImage, image_id};
use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Albums probed when the caller names none.
pub const DEFAULT_ALBUMS: &[&str] = &[
    "nature",
    "architecture",
    "art",
    "portraits",
    "travel",
    "food",
    "animals",
    "landscapes",
    "urban",
    "abstract",
];

/// Extensions tried for every pattern, in order.
pub const PROBE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const NUMBERED_PREFIXES: &[&str] = &["", "image", "img", "photo"];
const NUMBERED_COUNT: usize = 20;
const NAMED_PATTERNS: &[&str] = &[
    "main", "hero", "banner", "featured", "cover", "sample", "demo", "test", "example",
];

/// Filename stems in probe order.
pub fn candidate_patterns() -> Vec<String> {
    NUMBERED_PREFIXES
        .iter()
        .flat_map(|prefix| (1..=NUMBERED_COUNT).map(move |n| format!("{prefix}{n}")))
        .chain(NAMED_PATTERNS.iter().map(|name| name.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeLimits {
    pub timeout: Duration,
    pub max_attempts: usize,
    pub max_consecutive_failures: usize,
}

impl Default for ProbeLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            max_attempts: 50,
            max_consecutive_failures: 5,
        }
    }
}

impl From<&ProbeConfig> for ProbeLimits {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_attempts: config.max_attempts,
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    Missing,
    /// The probe did not answer within the timeout. Treated as missing.
    TimedOut,
}

/// One issued probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub filename: String,
    /// Relative URL: `/<publicPath>/<album>/<filename>`.
    pub url: String,
    pub outcome: ProbeOutcome,
}

/// Existence check for one image URL.
///
/// Implementations answer `false` for anything short of a loadable image,
/// including transport errors. Timeouts are applied by the caller.
#[async_trait]
pub trait ImageProber: Send + Sync {
    async fn exists(&self, url: &str) -> bool;
}

/// Probes by issuing `GET <base_url><url>`.
///
/// An image exists when the response has a success status and an `image/*`
/// content type.
pub struct HttpProber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProber {
    pub fn new(base_url: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pinwall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ImageProber for HttpProber {
    async fn exists(&self, url: &str) -> bool {
        let full = format!("{}{url}", self.base_url);
        match self.client.get(&full).send().await {
            Ok(response) => {
                response.status().is_success()
                    && response
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|ct| ct.starts_with("image/"))
            }
            Err(err) => {
                tracing::debug!(url = %full, error = %err, "probe request failed");
                false
            }
        }
    }
}

/// Position in the candidate catalog plus the bounding counters.
#[derive(Debug, Default)]
struct Cursor {
    pattern: usize,
    extension: usize,
    attempts: usize,
    consecutive_failures: usize,
}

impl Cursor {
    /// Next filename to probe, or `None` once a bound ends the album.
    fn advance(&mut self, patterns: &[String], limits: &ProbeLimits) -> Option<String> {
        if self.attempts >= limits.max_attempts {
            return None;
        }
        if self.extension == PROBE_EXTENSIONS.len() {
            self.pattern += 1;
            self.extension = 0;
        }
        if self.extension == 0
            && (self.pattern >= patterns.len()
                || self.consecutive_failures >= limits.max_consecutive_failures)
        {
            return None;
        }
        let filename = format!(
            "{}.{}",
            patterns[self.pattern], PROBE_EXTENSIONS[self.extension]
        );
        self.extension += 1;
        Some(filename)
    }

    fn record(&mut self, outcome: ProbeOutcome) {
        self.attempts += 1;
        if outcome == ProbeOutcome::Found {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }
}

/// Lazily probe one album's candidate catalog.
///
/// Yields every issued probe with its outcome. Nothing is requested until the
/// stream is polled, and dropping the stream stops probing.
pub fn probe_album<'a>(
    prober: &'a dyn ImageProber,
    album: &'a str,
    public_path: &'a str,
    limits: ProbeLimits,
) -> impl Stream<Item = Probe> + Send + 'a {
    let state = (Cursor::default(), candidate_patterns());
    stream::unfold(state, move |(mut cursor, patterns)| async move {
        let filename = cursor.advance(&patterns, &limits)?;
        let url = image_url(public_path, album, &filename);
        let outcome = match tokio::time::timeout(limits.timeout, prober.exists(&url)).await {
            Ok(true) => ProbeOutcome::Found,
            Ok(false) => ProbeOutcome::Missing,
            Err(_) => ProbeOutcome::TimedOut,
        };
        cursor.record(outcome);
        tracing::debug!(%url, ?outcome, "probe");
        Some((
            Probe {
                filename,
                url,
                outcome,
            },
            (cursor, patterns),
        ))
    })
}

/// Discovers albums by probing, one album at a time.
pub struct RuntimeScanner {
    prober: Box<dyn ImageProber>,
    public_path: String,
    limits: ProbeLimits,
    candidates: Vec<String>,
}

impl RuntimeScanner {
    pub fn new(prober: Box<dyn ImageProber>, public_path: &str, limits: ProbeLimits) -> Self {
        Self {
            prober,
            public_path: public_path.to_string(),
            limits,
            candidates: DEFAULT_ALBUMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// HTTP-backed scanner for `probe.base_url` with the configured limits
    /// and candidate albums.
    pub fn from_config(config: &GalleryConfig) -> Result<Self, ProbeError> {
        let prober = HttpProber::new(&config.probe.base_url)?;
        Ok(Self::new(
            Box::new(prober),
            &config.public_path,
            ProbeLimits::from(&config.probe),
        )
        .with_candidates(config.probe.albums.clone()))
    }

    /// Replace the album list used when [`scan`](Self::scan) is given none.
    /// An empty list keeps the built-in candidates.
    pub fn with_candidates(mut self, albums: Vec<String>) -> Self {
        if !albums.is_empty() {
            self.candidates = albums;
        }
        self
    }

    /// Probe `known_albums`, or the candidate list when empty.
    ///
    /// Albums where nothing was found are left out.
    pub async fn scan(&self, known_albums: &[String]) -> Vec<GalleryAlbum> {
        let albums = if known_albums.is_empty() {
            self.candidates.as_slice()
        } else {
            known_albums
        };

        let mut found = Vec::new();
        for album in albums {
            let images = self.scan_album(album).await;
            if images.is_empty() {
                tracing::debug!(%album, "no images discovered");
                continue;
            }
            tracing::info!(%album, images = images.len(), "discovered album");
            found.push(GalleryAlbum {
                id: album.clone(),
                name: format_folder_name(album),
                path: album_url_path(&self.public_path, album),
                images,
            });
        }
        found
    }

    async fn scan_album(&self, album: &str) -> Vec<GalleryImage> {
        let hits: Vec<Probe> = probe_album(
            self.prober.as_ref(),
            album,
            &self.public_path,
            self.limits,
        )
        .filter(|probe| futures_util::future::ready(probe.outcome == ProbeOutcome::Found))
        .collect()
        .await;

        hits.into_iter()
            .enumerate()
            .map(|(n, probe)| GalleryImage {
                id: image_id(album, n),
                title: format_image_title(&probe.filename),
                filename: probe.filename,
                url: probe.url,
                size: None,
                last_modified: None,
            })
            .collect()
    }
}

/// Periodic fallback rescan.
///
/// Owns the polling task. The callback runs after a tick whose scan changed
/// some album's image count, including an album disappearing. Dropping the
/// handle also ends polling, but without waiting for an in-flight scan.
pub struct RuntimeWatch {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RuntimeWatch {
    /// Start polling every `interval`. The first scan runs one interval after
    /// start, and any album it finds counts as a change.
    pub fn start<F>(scanner: RuntimeScanner, interval: Duration, on_update: F) -> Self
    where
        F: FnMut(Vec<GalleryAlbum>) + Send + 'static,
    {
        Self::start_after(scanner, interval, &[], on_update)
    }

    /// Like [`start`](Self::start), but changes are judged against
    /// `baseline`, a scan the caller already has.
    pub fn start_after<F>(
        scanner: RuntimeScanner,
        interval: Duration,
        baseline: &[GalleryAlbum],
        mut on_update: F,
    ) -> Self
    where
        F: FnMut(Vec<GalleryAlbum>) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let mut last_counts = album_counts(baseline);
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                let albums = scanner.scan(&[]).await;
                let counts = album_counts(&albums);
                if counts != last_counts {
                    tracing::info!(albums = albums.len(), "runtime scan changed");
                    last_counts = counts;
                    on_update(albums);
                }
            }
        });
        Self { stop_tx, task }
    }

    /// Stop polling and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "runtime watch task ended abnormally");
        }
    }
}

fn album_counts(albums: &[GalleryAlbum]) -> HashMap<String, usize> {
    albums
        .iter()
        .map(|a| (a.id.clone(), a.images.len()))
        .collect()
}
