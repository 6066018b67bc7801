//! Known input container formats.

use std::path::Path;

/// Input container extensions offered by the file selection filter.
///
/// A hint only: any path handed to the dispatcher is attempted
/// regardless of extension, and ffmpeg decides what it can read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mov", "avi", "mp4", "mkv"];

/// Whether the path carries one of the known input container
/// extensions (case-insensitive).
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}
