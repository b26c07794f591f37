//! # Pinwall
//!
//! Folder-driven image galleries. The filesystem is the data source: every
//! directory under the images root is an album, every supported image inside
//! it is one of the album's images, and display names come from the names on
//! disk. There is no database and no per-image metadata file.
//!
//! # Architecture: Build Time and Run Time
//!
//! ```text
//! build time   images/  ──scan──►  Manifest  ──publish──►  manifest.json
//!                                     ▲                    imageManifest.js
//!                        watch: rebuild on change
//!
//! run time     imageManifest.js / manifest.json ──load──►  Gallery ──► columns
//!                        │ unavailable
//!                        └──► probe the image server ──────►  Gallery (fallback)
//! ```
//!
//! The [`manifest::Manifest`] is the contract between the two halves. It is
//! versioned, carries its own counts, and is validated whenever it is read
//! back, so a front end can trust whatever the loader hands it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Folder names and filenames to display names |
//! | [`scan`] | Walks the images root into albums of supported image files |
//! | [`manifest`] | The versioned manifest document and its invariants |
//! | [`emit`] | Publishes a manifest to the JSON and module sinks, all or nothing |
//! | [`watch`] | Republishes on image changes with debounced, coalesced rebuilds |
//! | [`probe`] | Runtime discovery by probing likely filenames over HTTP |
//! | [`loader`] | Manifest first, probing second; normalizes into a [`types::Gallery`] |
//! | [`types`] | Client-facing gallery types and title search |
//! | [`layout`] | Responsive column counts and round-robin distribution |
//! | [`config`] | `pinwall.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Two Sinks, One Snapshot
//!
//! Static hosts fetch `manifest.json`; bundlers import `imageManifest.js`.
//! Both are rendered from the same in-memory manifest and committed together,
//! so they never describe different file sets. See [`emit::publish`].
//!
//! ## Discovery Is Best-Effort
//!
//! Without a manifest, nothing can list a directory over HTTP. The
//! [`probe`] module asks for a fixed catalog of common filenames instead and
//! stops early on long runs of misses. Albums whose images are named
//! differently are not found; a published manifest is always preferred.

pub mod config;
pub mod emit;
pub mod layout;
pub mod loader;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod probe;
pub mod scan;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
