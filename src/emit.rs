//! Publishing a manifest to its sinks.
//!
//! Every manifest is written to two places:
//!
//! | Sink | Default path | Consumer |
//! |------|--------------|----------|
//! | [`JsonSink`] | `public/images/manifest.json` | fetched at runtime by the static site |
//! | [`ModuleSink`] | `src/data/imageManifest.js` | imported by the front-end build |
//!
//! Both are rendered from the [`Manifest`] alone, so they can never describe
//! different file sets unless a write fails halfway, which [`publish`]
//! prevents:
//!
//! 1. **Render** every sink in memory.
//! 2. **Stage** each rendering into a temp file in the target's directory.
//! 3. **Commit** by renaming the temp files over their targets, in order. If
//!    a rename fails, the sinks already committed are put back to their
//!    previous contents before the error is returned. If one of them cannot
//!    be restored either, the error is [`EmitError::PartialPublish`].
//!
//! Readers of either file therefore see the old pair or the new pair. Temp
//! files are owned by [`NamedTempFile`] handles and removed on every exit
//! path that does not persist them.

use crate::manifest::{Manifest, ManifestError};
use chrono::SecondsFormat;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// File name of the JSON artifact inside the images root.
pub const MANIFEST_FILENAME: &str = "manifest.json";

const MODULE_EXPORT: &str = "export const imageManifest = ";
const MODULE_TAIL: &str = "\n\nexport const albums = imageManifest.albums";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to render {sink}: {source}")]
    Render {
        sink: &'static str,
        #[source]
        source: ManifestError,
    },
    #[error("Failed to write {sink} sink at {}: {source}", .path.display())]
    SinkWriteFailure {
        sink: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A commit failed and some already-committed sinks could not be put
    /// back, so they now hold the new manifest while the rest hold the old.
    #[error(
        "Failed to write {sink} sink at {}: {source}; could not restore {}",
        .path.display(),
        .unrestored.join(", ")
    )]
    PartialPublish {
        sink: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
        unrestored: Vec<&'static str>,
    },
}

/// A destination for a rendered manifest.
pub trait Sink {
    /// Short label used in reports and errors.
    fn name(&self) -> &'static str;

    /// Target file.
    fn path(&self) -> &Path;

    /// Full file contents for `manifest`.
    fn render(&self, manifest: &Manifest) -> Result<String, ManifestError>;
}

/// Static JSON document served next to the images.
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known location: `<images_dir>/manifest.json`.
    pub fn in_images_dir(images_dir: &Path) -> Self {
        Self::new(images_dir.join(MANIFEST_FILENAME))
    }
}

impl Sink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, manifest: &Manifest) -> Result<String, ManifestError> {
        manifest.to_json_pretty()
    }
}

/// ES module exposing the manifest to the front-end build.
#[derive(Debug, Clone)]
pub struct ModuleSink {
    path: PathBuf,
}

impl ModuleSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back a manifest from module source produced by [`Sink::render`].
    pub fn parse(source: &str) -> Result<Manifest, ManifestError> {
        let start = source
            .find(MODULE_EXPORT)
            .ok_or_else(|| ManifestError::Malformed("missing imageManifest export".into()))?
            + MODULE_EXPORT.len();
        let rest = &source[start..];
        let end = rest
            .find(MODULE_TAIL)
            .ok_or_else(|| ManifestError::Malformed("missing albums export".into()))?;
        Manifest::from_json(&rest[..end])
    }
}

impl Sink for ModuleSink {
    fn name(&self) -> &'static str {
        "module"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, manifest: &Manifest) -> Result<String, ManifestError> {
        let json = manifest.to_json_pretty()?;
        let generated = manifest
            .generated()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(format!(
            "// Auto-generated image manifest - Do not edit manually\n\
             // Generated: {generated}\n\
             \n\
             {MODULE_EXPORT}{json}{MODULE_TAIL}\n\
             export const totalImages = imageManifest.totalImages\n\
             export const totalAlbums = imageManifest.totalAlbums\n\
             \n\
             export default imageManifest\n"
        ))
    }
}

/// One committed sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub sink: &'static str,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Outcome of a successful [`publish`]: every sink, in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub written: Vec<SinkReport>,
}

/// Write `manifest` to every sink, or to none of them.
pub fn publish(manifest: &Manifest, sinks: &[&dyn Sink]) -> Result<PublishReport, EmitError> {
    let mut rendered = Vec::with_capacity(sinks.len());
    for sink in sinks {
        let contents = sink.render(manifest).map_err(|source| EmitError::Render {
            sink: sink.name(),
            source,
        })?;
        rendered.push(contents);
    }

    let mut staged = Vec::with_capacity(sinks.len());
    for (sink, contents) in sinks.iter().zip(&rendered) {
        let target = sink.path();
        let temp = stage(target, contents.as_bytes()).map_err(|e| write_failure(*sink, target, e))?;
        let previous = read_previous(target).map_err(|e| write_failure(*sink, target, e))?;
        staged.push((temp, previous));
    }

    let mut committed: Vec<(&dyn Sink, Option<Vec<u8>>)> = Vec::with_capacity(sinks.len());
    let mut report = PublishReport::default();
    for ((sink, contents), (temp, previous)) in sinks.iter().zip(&rendered).zip(staged) {
        let target = sink.path();
        if let Err(err) = temp.persist(target) {
            let unrestored = rollback(&committed);
            if unrestored.is_empty() {
                return Err(write_failure(*sink, target, err.error));
            }
            return Err(EmitError::PartialPublish {
                sink: sink.name(),
                path: target.to_path_buf(),
                source: err.error,
                unrestored,
            });
        }
        tracing::debug!(sink = sink.name(), path = %target.display(), "sink committed");
        report.written.push(SinkReport {
            sink: sink.name(),
            path: target.to_path_buf(),
            bytes: contents.len(),
        });
        committed.push((*sink, previous));
    }

    Ok(report)
}

fn stage(target: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

fn read_previous(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Put already-committed sinks back the way they were, newest first.
///
/// Returns the names of sinks that could not be restored.
fn rollback(committed: &[(&dyn Sink, Option<Vec<u8>>)]) -> Vec<&'static str> {
    let mut unrestored = Vec::new();
    for (sink, previous) in committed.iter().rev() {
        let target = sink.path();
        let result = match previous {
            Some(bytes) => stage(target, bytes)
                .and_then(|temp| temp.persist(target).map(|_| ()).map_err(|e| e.error)),
            None => fs::remove_file(target),
        };
        if let Err(e) = result {
            tracing::error!(
                sink = sink.name(),
                path = %target.display(),
                error = %e,
                "failed to restore sink after aborted publish"
            );
            unrestored.push(sink.name());
        }
    }
    unrestored
}

fn write_failure(sink: &dyn Sink, path: &Path, source: io::Error) -> EmitError {
    EmitError::SinkWriteFailure {
        sink: sink.name(),
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ScannedAlbum, ScannedFile};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_manifest() -> Manifest {
        let modified = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Manifest::build(
            vec![ScannedAlbum {
                id: "nature".into(),
                files: vec![
                    ScannedFile {
                        filename: "a.png".into(),
                        size: 10,
                        modified,
                    },
                    ScannedFile {
                        filename: "b.jpg".into(),
                        size: 20,
                        modified,
                    },
                ],
            }],
            "images",
            Utc.timestamp_opt(1_760_000_000, 0).unwrap(),
        )
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with(".tmp"))
            .collect()
    }

    #[test]
    fn publish_writes_both_sinks() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::in_images_dir(&tmp.path().join("public/images"));
        let module = ModuleSink::new(tmp.path().join("src/data/imageManifest.js"));
        let manifest = sample_manifest();

        let report = publish(&manifest, &[&json, &module]).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.written[0].sink, "json");
        assert_eq!(report.written[1].sink, "module");

        let from_json = Manifest::from_json(&fs::read_to_string(json.path()).unwrap()).unwrap();
        let from_module = ModuleSink::parse(&fs::read_to_string(module.path()).unwrap()).unwrap();
        assert_eq!(from_json, manifest);
        assert_eq!(from_module, manifest);
    }

    #[test]
    fn module_has_convenience_exports() {
        let module = ModuleSink::new("imageManifest.js");
        let source = module.render(&sample_manifest()).unwrap();

        assert!(source.starts_with("// Auto-generated image manifest"));
        assert!(source.contains("// Generated: 2025-10-09T08:53:20.000Z"));
        assert!(source.contains("export const albums = imageManifest.albums"));
        assert!(source.contains("export const totalImages = imageManifest.totalImages"));
        assert!(source.contains("export const totalAlbums = imageManifest.totalAlbums"));
        assert!(source.trim_end().ends_with("export default imageManifest"));
    }

    #[test]
    fn parse_rejects_foreign_module() {
        let err = ModuleSink::parse("export default {}").unwrap_err();
        assert!(matches!(err, ManifestError::Malformed(_)));
    }

    #[test]
    fn publish_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "stale").unwrap();

        publish(&sample_manifest(), &[&json]).unwrap();

        let contents = fs::read_to_string(json.path()).unwrap();
        assert!(contents.contains("\"totalImages\": 2"));
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn unwritable_sink_fails_before_anything_changes() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "old").unwrap();
        // A regular file where the module's directory should be.
        fs::write(tmp.path().join("blocked"), "").unwrap();
        let module = ModuleSink::new(tmp.path().join("blocked/imageManifest.js"));

        let err = publish(&sample_manifest(), &[&json, &module]).unwrap_err();

        assert!(matches!(err, EmitError::SinkWriteFailure { sink: "module", .. }));
        assert_eq!(fs::read_to_string(json.path()).unwrap(), "old");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn directory_in_place_of_sink_leaves_pair_untouched() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "old").unwrap();
        let module_path = tmp.path().join("imageManifest.js");
        fs::create_dir_all(module_path.join("occupied")).unwrap();
        let module = ModuleSink::new(&module_path);

        let err = publish(&sample_manifest(), &[&json, &module]).unwrap_err();

        assert!(matches!(err, EmitError::SinkWriteFailure { sink: "module", .. }));
        assert_eq!(fs::read_to_string(json.path()).unwrap(), "old");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn rollback_restores_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "new").unwrap();

        let unrestored = rollback(&[(&json as &dyn Sink, Some(b"old".to_vec()))]);

        assert!(unrestored.is_empty());
        assert_eq!(fs::read_to_string(json.path()).unwrap(), "old");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn rollback_removes_sink_that_did_not_exist() {
        let tmp = TempDir::new().unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "new").unwrap();

        assert!(rollback(&[(&json as &dyn Sink, None)]).is_empty());

        assert!(!json.path().exists());
    }

    #[test]
    fn error_names_sink_and_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocked"), "").unwrap();
        let json = JsonSink::new(tmp.path().join("blocked/manifest.json"));

        let err = publish(&sample_manifest(), &[&json]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("json"));
        assert!(msg.contains("blocked"));
    }

    /// Sink whose target turns unusable after `good_calls` lookups of its
    /// path. `publish` resolves a sink's path once when staging, once when
    /// committing and once when restoring.
    struct ShiftingSink {
        name: &'static str,
        good: PathBuf,
        bad: PathBuf,
        good_calls: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl ShiftingSink {
        fn new(name: &'static str, good: PathBuf, bad: PathBuf, good_calls: usize) -> Self {
            Self {
                name,
                good,
                bad,
                good_calls,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    impl Sink for ShiftingSink {
        fn name(&self) -> &'static str {
            self.name
        }

        fn path(&self) -> &Path {
            let n = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < self.good_calls { &self.good } else { &self.bad }
        }

        fn render(&self, manifest: &Manifest) -> Result<String, ManifestError> {
            manifest.to_json_pretty()
        }
    }

    #[test]
    fn failed_commit_restores_earlier_sinks() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocked"), "").unwrap();
        let json = JsonSink::new(tmp.path().join("manifest.json"));
        fs::write(json.path(), "old").unwrap();
        let second = ShiftingSink::new(
            "second",
            tmp.path().join("second.json"),
            tmp.path().join("blocked/second.json"),
            1,
        );

        let err = publish(&sample_manifest(), &[&json, &second]).unwrap_err();

        assert!(
            matches!(err, EmitError::SinkWriteFailure { sink: "second", .. }),
            "got {err:?}"
        );
        assert_eq!(fs::read_to_string(json.path()).unwrap(), "old");
        assert!(!tmp.path().join("second.json").exists());
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[test]
    fn failed_restore_is_reported_as_partial_publish() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocked"), "").unwrap();
        let first_path = tmp.path().join("first.json");
        fs::write(&first_path, "old").unwrap();
        let first = ShiftingSink::new(
            "first",
            first_path.clone(),
            tmp.path().join("blocked/first.json"),
            2,
        );
        let second = ShiftingSink::new(
            "second",
            tmp.path().join("second.json"),
            tmp.path().join("blocked/second.json"),
            1,
        );

        let err = publish(&sample_manifest(), &[&first, &second]).unwrap_err();

        match &err {
            EmitError::PartialPublish {
                sink, unrestored, ..
            } => {
                assert_eq!(*sink, "second");
                assert_eq!(unrestored, &vec!["first"]);
            }
            other => panic!("expected PartialPublish, got {other:?}"),
        }
        assert!(err.to_string().contains("could not restore first"));
        // The first sink kept the new manifest.
        assert!(
            fs::read_to_string(&first_path)
                .unwrap()
                .contains("\"totalImages\": 2")
        );
    }
}
