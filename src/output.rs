//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output leads with what an entity *is* (display name and position), with
//! paths and URLs as indented context lines underneath. Albums and images use
//! the same two-level pattern in every command, so a gallery printed by
//! `generate`, `load`, or `probe` reads the same way.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Albums
//! 001 City Lights (3 images)
//!     Source: city-lights/
//!     001 01 Bridge
//!         Source: 01-bridge.jpg
//!
//! Published
//!     json: public/images/manifest.json (1532 bytes)
//!     module: src/data/imageManifest.js (1797 bytes)
//!
//! Generated 2 albums, 5 images
//! ```
//!
//! ## Load / Probe
//!
//! ```text
//! Gallery (fallback)
//! 001 Nature (2 images)
//!     Path: /images/nature
//!     001 1 → /images/nature/1.jpg
//! ```
//!
//! ## Layout
//!
//! ```text
//! Nature: 3 columns at 900px
//! Column 1
//!     001 A
//!     004 D
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::emit::PublishReport;
use crate::manifest::Manifest;
use crate::types::{Gallery, GalleryImage, GallerySource};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Album header: positional index, display name, image count.
///
/// ```text
/// 001 City Lights (3 images)
/// ```
fn album_header(index: usize, name: &str, count: usize) -> String {
    format!("{} {} ({})", format_index(index), name, plural(count, "image"))
}

/// Image line: titled images show the title, untitled ones the filename in parens.
///
/// ```text
/// 001 Night Sky
/// 002 (.jpg)        // title formats to nothing
/// ```
fn image_line(index: usize, title: &str, filename: &str) -> String {
    if title.is_empty() {
        format!("{} ({})", format_index(index), filename)
    } else {
        format!("{} {}", format_index(index), title)
    }
}

fn publish_lines(report: &PublishReport) -> Vec<String> {
    report
        .written
        .iter()
        .map(|sink| {
            format!(
                "{}{}: {} ({} bytes)",
                indent(1),
                sink.sink,
                sink.path.display(),
                sink.bytes
            )
        })
        .collect()
}

fn summary_line(verb: &str, albums: usize, images: usize) -> String {
    format!("{verb} {}, {}", plural(albums, "album"), plural(images, "image"))
}

// ============================================================================
// generate
// ============================================================================

/// Format the result of a one-shot generation.
pub fn format_generate_output(manifest: &Manifest, report: &PublishReport) -> Vec<String> {
    let mut lines = vec!["Albums".to_string()];

    for (i, album) in manifest.albums().iter().enumerate() {
        lines.push(album_header(i + 1, album.name(), album.image_count()));
        lines.push(format!("{}Source: {}/", indent(1), album.id()));
        for (j, image) in album.images().iter().enumerate() {
            lines.push(format!(
                "{}{}",
                indent(1),
                image_line(j + 1, image.title(), image.filename())
            ));
            if !image.title().is_empty() {
                lines.push(format!("{}Source: {}", indent(2), image.filename()));
            }
        }
    }
    if manifest.albums().is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }

    lines.push(String::new());
    lines.push("Published".to_string());
    lines.extend(publish_lines(report));

    lines.push(String::new());
    lines.push(summary_line(
        "Generated",
        manifest.total_albums(),
        manifest.total_images(),
    ));
    lines
}

pub fn print_generate_output(manifest: &Manifest, report: &PublishReport) {
    for line in format_generate_output(manifest, report) {
        println!("{}", line);
    }
}

// ============================================================================
// watch
// ============================================================================

/// One line per hot reload.
pub fn format_reload(manifest: &Manifest) -> String {
    summary_line(
        "Manifest updated:",
        manifest.total_albums(),
        manifest.total_images(),
    )
}

pub fn print_reload(manifest: &Manifest) {
    println!("{}", format_reload(manifest));
}

// ============================================================================
// load / probe
// ============================================================================

fn source_label(source: GallerySource) -> &'static str {
    match source {
        GallerySource::Manifest => "manifest",
        GallerySource::Fallback => "fallback",
    }
}

/// Format a loaded or discovered gallery with every image URL.
pub fn format_gallery(gallery: &Gallery) -> Vec<String> {
    let mut lines = vec![format!("Gallery ({})", source_label(gallery.source))];

    for (i, album) in gallery.albums.iter().enumerate() {
        lines.push(album_header(i + 1, &album.name, album.images.len()));
        lines.push(format!("{}Path: {}", indent(1), album.path));
        for (j, image) in album.images.iter().enumerate() {
            lines.push(format!(
                "{}{} → {}",
                indent(1),
                image_line(j + 1, &image.title, &image.filename),
                image.url
            ));
        }
    }

    lines.push(String::new());
    lines.push(summary_line(
        "Found",
        gallery.albums.len(),
        gallery.total_images(),
    ));
    lines
}

pub fn print_gallery(gallery: &Gallery) {
    for line in format_gallery(gallery) {
        println!("{}", line);
    }
}

// ============================================================================
// layout
// ============================================================================

/// Format a column layout. Image indices are 1-based positions in the
/// laid-out sequence, so the round-robin order is visible.
pub fn format_layout(album: &str, width: u32, columns: &[Vec<&GalleryImage>]) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} at {}px",
        album,
        plural(columns.len(), "column"),
        width
    )];

    for (c, column) in columns.iter().enumerate() {
        lines.push(format!("Column {}", c + 1));
        for (row, image) in column.iter().enumerate() {
            let position = row * columns.len() + c + 1;
            lines.push(format!(
                "{}{}",
                indent(1),
                image_line(position, &image.title, &image.filename)
            ));
        }
    }
    lines
}

pub fn print_layout(album: &str, width: u32, columns: &[Vec<&GalleryImage>]) {
    for line in format_layout(album, width, columns) {
        println!("{}", line);
    }
}
