//! Display names for albums and images.
//!
//! Folder and file names on disk double as the gallery's titles. Both are
//! tokenized on `-` and `_`, every token gets its first character uppercased,
//! and the tokens are joined back with single spaces:
//!
//! - `city-lights/` → "City Lights" (album name)
//! - `night_sky.webp` → "Night Sky" (image title, extension dropped)
//! - `IMG_0042.JPG` → "IMG 0042"
//!
//! Only the first character of a token changes; the rest keeps its case, so
//! acronyms and camel-cased words survive untouched.

/// Format an album folder name for display.
///
/// Splits on `-` and `_` only, so whitespace already present in the folder
/// name stays inside its token.
pub fn format_folder_name(folder: &str) -> String {
    folder
        .split(['-', '_'])
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format an image filename into a readable title.
///
/// The final extension is removed first, then dashes and underscores become
/// spaces and every space-separated word is capitalized.
pub fn format_image_title(filename: &str) -> String {
    strip_extension(filename)
        .replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove the last `.ext` suffix, if there is a non-empty one.
///
/// `photo.tar.gz` → `photo.tar`, `trailing.` → `trailing.` (nothing after the dot).
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(dot) if dot + 1 < filename.len() && !filename[dot + 1..].contains('/') => {
            &filename[..dot]
        }
        _ => filename,
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_single_word() {
        assert_eq!(format_folder_name("nature"), "Nature");
    }

    #[test]
    fn folder_dashes_and_underscores() {
        assert_eq!(format_folder_name("city-lights"), "City Lights");
        assert_eq!(format_folder_name("street_art-2024"), "Street Art 2024");
    }

    #[test]
    fn folder_keeps_inner_case() {
        assert_eq!(format_folder_name("myPhotos-NYC"), "MyPhotos NYC");
    }

    #[test]
    fn folder_spaces_are_not_separators() {
        assert_eq!(format_folder_name("old photos"), "Old photos");
    }

    #[test]
    fn folder_empty_tokens_preserved() {
        assert_eq!(format_folder_name("a--b"), "A  B");
    }

    #[test]
    fn image_title_drops_extension() {
        assert_eq!(format_image_title("a.png"), "A");
        assert_eq!(format_image_title("b.jpg"), "B");
    }

    #[test]
    fn image_title_separators_become_spaces() {
        assert_eq!(format_image_title("night_sky.webp"), "Night Sky");
        assert_eq!(format_image_title("mountain-view-1.jpg"), "Mountain View 1");
    }

    #[test]
    fn image_title_existing_spaces_split_too() {
        assert_eq!(format_image_title("old harbor.jpg"), "Old Harbor");
    }

    #[test]
    fn image_title_only_last_extension_removed() {
        assert_eq!(format_image_title("archive.tar.gz"), "Archive.tar");
    }

    #[test]
    fn image_title_uppercase_preserved() {
        assert_eq!(format_image_title("IMG_0042.JPG"), "IMG 0042");
    }

    #[test]
    fn strip_extension_edge_cases() {
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("trailing."), "trailing.");
        assert_eq!(strip_extension(".hidden"), "");
    }

    #[test]
    fn capitalize_non_ascii() {
        assert_eq!(format_folder_name("été"), "Été");
    }
}
