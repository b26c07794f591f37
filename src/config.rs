//! Project configuration.
//!
//! Handles loading, validating, and merging `pinwall.toml`. The file is
//! optional: stock defaults cover the conventional layout of a front-end
//! project that serves its images from `public/images`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_dir = "public/images"               # Root scanned for album folders
//! output_file = "src/data/imageManifest.js"  # Importable manifest module
//! public_path = "images"                     # URL prefix the images are served under
//! watch = true                               # Rebuild on file changes in `watch`
//!
//! [watcher]
//! debounce_ms = 300         # Quiet period that closes a burst of file events
//!
//! [probe]
//! base_url = "http://localhost:3000"
//! timeout_ms = 3000         # Per-probe timeout; a timeout counts as "absent"
//! max_attempts = 50         # Probe budget per album
//! max_consecutive_failures = 5
//! albums = []               # Empty = built-in candidate list
//!
//! [runtime]
//! poll_interval_secs = 10   # Fallback rescan interval for `probe --poll`
//!
//! [layout]
//! breakpoints = [[640, 2], [1024, 3], [1536, 4]]  # [below-width, columns]
//! max_columns = 5                                  # Columns at or above the last breakpoint
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! images_dir = "static/photos"
//!
//! [probe]
//! base_url = "https://gallery.example.com"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Command-line flags win
//! over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "pinwall.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `pinwall.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Images root; every immediate subdirectory is an album.
    pub images_dir: PathBuf,
    /// Path of the generated source module.
    pub output_file: PathBuf,
    /// URL prefix under which `images_dir` is served.
    pub public_path: String,
    /// Whether `watch` subscribes to file changes after the initial build.
    pub watch: bool,
    pub watcher: WatcherConfig,
    pub probe: ProbeConfig,
    pub runtime: RuntimeConfig,
    pub layout: LayoutConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("public/images"),
            output_file: PathBuf::from("src/data/imageManifest.js"),
            public_path: "images".to_string(),
            watch: true,
            watcher: WatcherConfig::default(),
            probe: ProbeConfig::default(),
            runtime: RuntimeConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("images_dir must not be empty".into()));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output_file must not be empty".into()));
        }
        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "probe.timeout_ms must be non-zero".into(),
            ));
        }
        if self.probe.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "probe.max_attempts must be non-zero".into(),
            ));
        }
        if self.probe.max_consecutive_failures == 0 {
            return Err(ConfigError::Validation(
                "probe.max_consecutive_failures must be non-zero".into(),
            ));
        }
        if self.runtime.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "runtime.poll_interval_secs must be non-zero".into(),
            ));
        }
        self.layout.validate()
    }
}

/// Dev watcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Quiet period after the last qualifying event before a rebuild starts.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Runtime fallback discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Origin serving the images root.
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_attempts: usize,
    pub max_consecutive_failures: usize,
    /// Albums to probe. Empty means the built-in candidate list.
    pub albums: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 3000,
            max_attempts: 50,
            max_consecutive_failures: 5,
            albums: Vec::new(),
        }
    }
}

/// Runtime polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub poll_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

/// Column breakpoints for the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// `[width, columns]` pairs: widths below `width` get `columns`.
    pub breakpoints: Vec<[u32; 2]>,
    /// Columns for widths at or above the last breakpoint.
    pub max_columns: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![[640, 2], [1024, 3], [1536, 4]],
            max_columns: 5,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_columns == 0 || self.breakpoints.iter().any(|[_, cols]| *cols == 0) {
            return Err(ConfigError::Validation(
                "layout column counts must be non-zero".into(),
            ));
        }
        if self.breakpoints.windows(2).any(|pair| pair[0][0] >= pair[1][0]) {
            return Err(ConfigError::Validation(
                "layout.breakpoints widths must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GalleryConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `pinwall.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Pinwall Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
# Command-line flags override values from this file.

# Images root. Every immediate subdirectory becomes an album; its image files
# (jpg, jpeg, png, gif, webp, svg) become the album's images.
images_dir = "public/images"

# Generated ES module exposing the manifest to the front-end build.
# The JSON manifest is always written to <images_dir>/manifest.json.
output_file = "src/data/imageManifest.js"

# URL prefix the images root is served under: /<public_path>/<album>/<file>.
public_path = "images"

# Rebuild the manifest when images are added or removed while `pinwall watch`
# runs. When false, `watch` only performs the initial build.
watch = true

# ---------------------------------------------------------------------------
# Dev watcher
# ---------------------------------------------------------------------------
[watcher]
# A burst of file events closes after this many quiet milliseconds, then the
# manifest is rebuilt once.
debounce_ms = 300

# ---------------------------------------------------------------------------
# Runtime fallback discovery (used when no manifest can be loaded)
# ---------------------------------------------------------------------------
[probe]
# Origin that serves the images root.
base_url = "http://localhost:3000"

# Per-probe timeout. A probe that times out counts as a missing image.
timeout_ms = 3000

# Upper bound on probes per album.
max_attempts = 50

# Stop probing an album after this many misses in a row.
max_consecutive_failures = 5

# Album folders to probe. Empty = built-in list (nature, architecture, art, ...).
albums = []

# ---------------------------------------------------------------------------
# Runtime polling
# ---------------------------------------------------------------------------
[runtime]
# Seconds between fallback rescans in `pinwall probe --poll`.
poll_interval_secs = 10

# ---------------------------------------------------------------------------
# Column layout
# ---------------------------------------------------------------------------
[layout]
# [width, columns] pairs: container widths below `width` use `columns`.
breakpoints = [[640, 2], [1024, 3], [1536, 4]]

# Columns for widths at or above the last breakpoint.
max_columns = 5
"##
}
