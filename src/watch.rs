//! Development watcher: keeps the manifest in sync while images change.
//!
//! [`start`] builds and publishes once, then subscribes to filesystem events
//! under the images root. Bursts of qualifying events collapse into a single
//! rebuild through [`RebuildGate`]:
//!
//! ```text
//!            event                    deadline passed
//!   Idle ───────────► Debounced ─────────────────────► Scanning
//!    ▲                 │    ▲                            │   │
//!    │                 └────┘ event: deadline slides     │   │ event: pending = true
//!    │                                                   │   ▼
//!    └──────────── done, nothing pending ◄───────────────┘ (stays Scanning)
//!                  done, pending ──────► Debounced
//! ```
//!
//! A qualifying event is a create, remove, or rename of a non-directory path
//! under the images root whose extension is a supported image. Everything
//! else, including the manifest writes themselves, is ignored.
//!
//! After each rebuild the hook is told about the new manifest, unless its
//! [fingerprint](Manifest::fingerprint) matches the last published one; then
//! nothing is written either. A failing rebuild is logged and the watcher
//! keeps going.

use crate::config::GalleryConfig;
use crate::emit::{EmitError, JsonSink, ModuleSink, PublishReport, Sink, publish};
use crate::manifest::Manifest;
use crate::scan::{ScanError, has_image_extension, scan};
use chrono::Utc;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub images_dir: PathBuf,
    pub output_file: PathBuf,
    pub public_path: String,
    /// When false, [`start`] only runs the initial build.
    pub watch: bool,
    pub debounce: Duration,
}

impl From<&GalleryConfig> for WatchOptions {
    fn from(config: &GalleryConfig) -> Self {
        Self {
            images_dir: config.images_dir.clone(),
            output_file: config.output_file.clone(),
            public_path: config.public_path.clone(),
            watch: config.watch,
            debounce: Duration::from_millis(config.watcher.debounce_ms),
        }
    }
}

/// Receives every manifest the watcher publishes after the initial build.
pub trait ReloadHook: Send + 'static {
    fn manifest_changed(&mut self, manifest: &Manifest, report: &PublishReport);
}

impl<F> ReloadHook for F
where
    F: FnMut(&Manifest, &PublishReport) + Send + 'static,
{
    fn manifest_changed(&mut self, manifest: &Manifest, report: &PublishReport) {
        self(manifest, report)
    }
}

// ============================================================================
// Rebuild state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Debounced { deadline: Instant },
    Scanning { pending: bool },
}

/// Debounce and single-flight bookkeeping, free of any I/O.
#[derive(Debug, Clone)]
pub struct RebuildGate {
    state: WatchState,
    debounce: Duration,
}

impl RebuildGate {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: WatchState::Idle,
            debounce,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// When the current burst closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::Debounced { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// A qualifying event arrived at `now`.
    pub fn on_event(&mut self, now: Instant) {
        self.state = match self.state {
            WatchState::Idle | WatchState::Debounced { .. } => WatchState::Debounced {
                deadline: now + self.debounce,
            },
            WatchState::Scanning { .. } => WatchState::Scanning { pending: true },
        };
    }

    /// Returns `true`, entering `Scanning`, when a rebuild should start.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::Debounced { deadline } if now >= deadline => {
                self.state = WatchState::Scanning { pending: false };
                true
            }
            _ => false,
        }
    }

    /// The rebuild started by [`poll`](Self::poll) finished at `now`.
    pub fn finish(&mut self, now: Instant) {
        self.state = match self.state {
            WatchState::Scanning { pending: true } => WatchState::Debounced {
                deadline: now + self.debounce,
            },
            _ => WatchState::Idle,
        };
    }
}

/// Whether `event` should trigger a rebuild of the manifest for `root`.
pub fn is_qualifying(event: &Event, root: &Path) -> bool {
    let kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    kind && event
        .paths
        .iter()
        .any(|p| p.starts_with(root) && !p.is_dir() && has_image_extension(p))
}

// ============================================================================
// Rebuild
// ============================================================================

struct Rebuilder {
    root: PathBuf,
    public_path: String,
    json: JsonSink,
    module: ModuleSink,
    last_fingerprint: Option<String>,
}

impl Rebuilder {
    fn new(root: PathBuf, options: &WatchOptions) -> Self {
        Self {
            json: JsonSink::in_images_dir(&root),
            module: ModuleSink::new(&options.output_file),
            public_path: options.public_path.clone(),
            last_fingerprint: None,
            root,
        }
    }

    fn build(&self) -> Result<Manifest, WatchError> {
        Ok(Manifest::build(
            scan(&self.root)?,
            &self.public_path,
            Utc::now(),
        ))
    }

    fn commit(&mut self, manifest: &Manifest) -> Result<PublishReport, WatchError> {
        let report = publish(manifest, &[&self.json as &dyn Sink, &self.module])?;
        self.last_fingerprint = Some(manifest.fingerprint());
        tracing::info!(
            albums = manifest.total_albums(),
            images = manifest.total_images(),
            "manifest published"
        );
        Ok(report)
    }

    /// Scan and publish. `None` when the content matches the last publish.
    fn rebuild(&mut self) -> Result<Option<(Manifest, PublishReport)>, WatchError> {
        let manifest = self.build()?;
        if self.last_fingerprint.as_deref() == Some(manifest.fingerprint().as_str()) {
            tracing::debug!("manifest unchanged, skipping publish");
            return Ok(None);
        }
        let report = self.commit(&manifest)?;
        Ok(Some((manifest, report)))
    }
}

// ============================================================================
// Handle
// ============================================================================

/// A running (or inert) watcher.
///
/// Owns the filesystem subscription and the rebuild task. Dropping it without
/// [`stop`](Self::stop) unsubscribes too, but does not wait for an in-flight
/// rebuild.
pub struct WatchHandle {
    manifest: Manifest,
    report: PublishReport,
    running: Option<Running>,
}

struct Running {
    watcher: RecommendedWatcher,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// The manifest published by the initial build.
    pub fn initial_manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn initial_report(&self) -> &PublishReport {
        &self.report
    }

    /// Whether file changes are being followed.
    pub fn is_watching(&self) -> bool {
        self.running.is_some()
    }

    /// Unsubscribe and wait for the rebuild task to exit.
    pub async fn stop(self) {
        let Some(running) = self.running else {
            return;
        };
        drop(running.watcher);
        let _ = running.stop_tx.send(());
        if let Err(err) = running.task.await {
            tracing::warn!(error = %err, "watch task ended abnormally");
        }
        tracing::info!("watcher stopped");
    }
}

/// Build once, then follow changes under the images root.
///
/// Must be called from within a tokio runtime when `options.watch` is set.
/// Fails if the initial build fails or the subscription cannot be set up.
pub fn start(options: WatchOptions, hook: impl ReloadHook) -> Result<WatchHandle, WatchError> {
    if !options.images_dir.is_dir() {
        return Err(ScanError::RootNotFound(options.images_dir.clone()).into());
    }
    let root = options
        .images_dir
        .canonicalize()
        .map_err(ScanError::from)?;

    let mut rebuilder = Rebuilder::new(root.clone(), &options);
    let manifest = rebuilder.build()?;
    let report = rebuilder.commit(&manifest)?;

    if !options.watch {
        tracing::info!("watching disabled, initial build only");
        return Ok(WatchHandle {
            manifest,
            report,
            running: None,
        });
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = event_tx.send(res);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    tracing::info!(
        root = %root.display(),
        debounce_ms = options.debounce.as_millis() as u64,
        "watching for image changes"
    );

    let (stop_tx, stop_rx) = oneshot::channel();
    let gate = RebuildGate::new(options.debounce);
    let task = tokio::spawn(run(rebuilder, gate, Box::new(hook), event_rx, stop_rx));

    Ok(WatchHandle {
        manifest,
        report,
        running: Some(Running {
            watcher,
            stop_tx,
            task,
        }),
    })
}

async fn run(
    mut rebuilder: Rebuilder,
    mut gate: RebuildGate,
    mut hook: Box<dyn ReloadHook>,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            received = events.recv() => match received {
                Some(event) => observe(&mut gate, &rebuilder.root, event),
                None => break,
            },
            _ = wait_until(gate.deadline()) => {
                if !gate.poll(Instant::now()) {
                    continue;
                }
                match rebuilder.rebuild() {
                    Ok(Some((manifest, report))) => hook.manifest_changed(&manifest, &report),
                    Ok(None) => {}
                    Err(err) => tracing::error!(error = %err, "rebuild failed"),
                }
                while let Ok(event) = events.try_recv() {
                    observe(&mut gate, &rebuilder.root, event);
                }
                gate.finish(Instant::now());
                if gate.deadline().is_some() {
                    tracing::debug!("changes arrived during rebuild, queueing another");
                }
            }
        }
    }
}

fn observe(gate: &mut RebuildGate, root: &Path, event: notify::Result<Event>) {
    match event {
        Ok(event) if is_qualifying(&event, root) => {
            tracing::debug!(paths = ?event.paths, kind = ?event.kind, "image change");
            gate.on_event(Instant::now());
        }
        Ok(event) => tracing::trace!(paths = ?event.paths, "ignored event"),
        Err(err) => tracing::warn!(error = %err, "watch error"),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    // =========================================================================
    // RebuildGate
    // =========================================================================

    #[test]
    fn burst_of_three_events_is_one_rebuild() {
        let mut gate = RebuildGate::new(DEBOUNCE);
        let t0 = Instant::now();
        gate.on_event(t0);
        gate.on_event(t0 + Duration::from_millis(100));
        gate.on_event(t0 + Duration::from_millis(200));

        let rebuilds = (0..=10)
            .map(|i| t0 + Duration::from_millis(i * 100))
            .filter(|now| gate.poll(*now))
            .count();

        assert_eq!(rebuilds, 1);
        assert_eq!(gate.state(), WatchState::Scanning { pending: false });
        gate.finish(t0 + Duration::from_secs(2));
        assert_eq!(gate.state(), WatchState::Idle);
    }

    #[test]
    fn deadline_slides_with_each_event() {
        let mut gate = RebuildGate::new(DEBOUNCE);
        let t0 = Instant::now();
        gate.on_event(t0);
        gate.on_event(t0 + Duration::from_millis(250));
        assert!(!gate.poll(t0 + Duration::from_millis(400)));
        assert_eq!(gate.deadline(), Some(t0 + Duration::from_millis(550)));
        assert!(gate.poll(t0 + Duration::from_millis(550)));
    }

    #[test]
    fn events_while_scanning_queue_one_rebuild() {
        let mut gate = RebuildGate::new(DEBOUNCE);
        let t0 = Instant::now();
        gate.on_event(t0);
        assert!(gate.poll(t0 + DEBOUNCE));

        gate.on_event(t0 + DEBOUNCE);
        gate.on_event(t0 + DEBOUNCE);
        assert_eq!(gate.state(), WatchState::Scanning { pending: true });

        let done = t0 + Duration::from_secs(1);
        gate.finish(done);
        assert_eq!(gate.deadline(), Some(done + DEBOUNCE));
        assert!(gate.poll(done + DEBOUNCE));
        gate.finish(done + DEBOUNCE);
        assert_eq!(gate.state(), WatchState::Idle);
    }

    #[test]
    fn idle_gate_never_fires() {
        let mut gate = RebuildGate::new(DEBOUNCE);
        assert!(!gate.poll(Instant::now() + Duration::from_secs(60)));
        assert_eq!(gate.deadline(), None);
    }

    // =========================================================================
    // Event classification
    // =========================================================================

    #[test]
    fn image_create_and_remove_qualify() {
        let root = Path::new("/srv/images");
        let jpg = root.join("nature/a.jpg");
        assert!(is_qualifying(
            &event(EventKind::Create(CreateKind::File), jpg.clone()),
            root
        ));
        assert!(is_qualifying(
            &event(EventKind::Remove(RemoveKind::File), jpg.clone()),
            root
        ));
        assert!(is_qualifying(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                root.join("nature/B.PNG")
            ),
            root
        ));
    }

    #[test]
    fn non_image_files_are_ignored() {
        let root = Path::new("/srv/images");
        for name in ["manifest.json", "nature/readme.txt", "nature/.tmpA1b2C3"] {
            assert!(
                !is_qualifying(&event(EventKind::Create(CreateKind::File), root.join(name)), root),
                "{name}"
            );
        }
    }

    #[test]
    fn content_edits_and_reads_are_ignored() {
        let root = Path::new("/srv/images");
        let jpg = root.join("nature/a.jpg");
        assert!(!is_qualifying(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), jpg.clone()),
            root
        ));
        assert!(!is_qualifying(
            &event(EventKind::Access(AccessKind::Any), jpg),
            root
        ));
    }

    #[test]
    fn paths_outside_root_are_ignored() {
        let root = Path::new("/srv/images");
        let elsewhere = PathBuf::from("/srv/other/a.jpg");
        assert!(!is_qualifying(
            &event(EventKind::Create(CreateKind::File), elsewhere),
            root
        ));
    }

    // =========================================================================
    // Rebuilder
    // =========================================================================

    fn options(root: &Path, out: &Path, watch: bool) -> WatchOptions {
        WatchOptions {
            images_dir: root.to_path_buf(),
            output_file: out.join("imageManifest.js"),
            public_path: "images".to_string(),
            watch,
            debounce: Duration::from_millis(50),
        }
    }

    #[test]
    fn unchanged_tree_is_not_republished() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let opts = options(tmp.path(), out.path(), true);
        let mut rebuilder = Rebuilder::new(tmp.path().to_path_buf(), &opts);

        assert!(rebuilder.rebuild().unwrap().is_some());
        assert!(rebuilder.rebuild().unwrap().is_none());

        write_album(tmp.path(), "art", &["one.gif"]);
        let (manifest, report) = rebuilder.rebuild().unwrap().unwrap();
        assert!(manifest.album("art").is_some());
        assert_eq!(report.written.len(), 2);
    }

    // =========================================================================
    // start / stop
    // =========================================================================

    #[tokio::test]
    async fn missing_root_fails_to_start() {
        let tmp = TempDir::new().unwrap();
        let opts = options(&tmp.path().join("nope"), tmp.path(), true);
        let result = start(opts, |_: &Manifest, _: &PublishReport| {});
        assert!(matches!(result, Err(WatchError::Scan(ScanError::RootNotFound(_)))));
    }

    #[tokio::test]
    async fn watch_disabled_only_builds() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let reloads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reloads);
        let handle = start(
            options(tmp.path(), out.path(), false),
            move |_: &Manifest, _: &PublishReport| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        assert!(!handle.is_watching());
        assert_eq!(handle.initial_manifest().total_images(), 5);
        assert!(tmp.path().join("manifest.json").exists());
        assert!(out.path().join("imageManifest.js").exists());
        handle.stop().await;
        assert_eq!(reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn new_images_trigger_reload() {
        let tmp = setup_fixtures();
        let out = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = start(
            options(tmp.path(), out.path(), true),
            move |manifest: &Manifest, _: &PublishReport| {
                let _ = tx.send(manifest.clone());
            },
        )
        .unwrap();
        assert!(handle.is_watching());

        // Give the OS watcher a moment to register before touching files.
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Existing album: files in a freshly created directory can land before
        // the recursive watch on it is registered.
        write_album(tmp.path(), "nature", &["c.jpg", "d.jpg", "e.jpg"]);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        let mut latest: Option<Manifest> = None;
        while latest.as_ref().and_then(|m| m.album("nature")).map(|a| a.image_count()) != Some(5) {
            let manifest = tokio::time::timeout_at(deadline, rx.recv())
                .await
                .expect("timed out waiting for reload")
                .expect("hook channel closed");
            latest = Some(manifest);
        }

        let on_disk = fs::read_to_string(tmp.path().join("manifest.json")).unwrap();
        let published = Manifest::from_json(&on_disk).unwrap();
        assert_eq!(published.album("nature").unwrap().image_count(), 5);

        handle.stop().await;
    }
}
