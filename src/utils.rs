use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ImageOrder, ImageSelection};
use crate::error::{Error, Result};

/// Progress bar over the images of one split, prefixed with the split name
pub fn create_progress_bar(len: u64, split: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{prefix:>12.bold} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} images {msg}")
        .progress_chars("=> ");
    let pb = ProgressBar::new(len).with_style(style);
    pb.set_prefix(split.to_string());
    pb
}

/// Create a directory (and its parents) unless it already exists
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    Ok(path.to_path_buf())
}

/// List the image files of a split directory in id-assignment order.
///
/// Only regular files whose extension is selected are returned; sub-directories
/// and annotation files are skipped. In numeric order, names without digits
/// come after every numbered name.
pub fn list_image_files(dir: &Path, selection: &ImageSelection) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && selection.matches(&path) {
            images.push(path);
        }
    }

    match selection.order {
        ImageOrder::Listing => {}
        ImageOrder::Lexicographic => images.sort_by_cached_key(|path| file_name_of(path)),
        ImageOrder::Numeric => {
            images.sort_by_cached_key(|path| {
                (
                    trailing_number(path).unwrap_or(u64::MAX),
                    file_name_of(path),
                )
            })
        }
    }
    Ok(images)
}

/// The file name as a `String`, lossily converted.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Last run of ASCII digits in the file stem, e.g. `Image_00014.png` -> 14.
pub fn trailing_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let end = stem.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = stem[..end]
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .len();
    stem[start..end].parse().ok()
}
