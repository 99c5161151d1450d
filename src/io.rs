use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::SplitSpec;
use crate::error::{Error, Result};
use crate::types::OutputDirs;
use crate::utils::{create_output_directory, file_name_of};

/// Set up `annotations/` and one image directory per split target
pub fn setup_output_directories(output_dir: &Path, splits: &[SplitSpec]) -> Result<OutputDirs> {
    let annotations_dir = create_output_directory(&output_dir.join("annotations"))?;
    let split_image_dirs = splits
        .iter()
        .map(|split| create_output_directory(&output_dir.join(&split.target)))
        .collect::<Result<Vec<_>>>()?;

    Ok(OutputDirs {
        annotations_dir,
        split_image_dirs,
    })
}

/// Serialize `value` as compact JSON and move it over `path` in one step.
///
/// The document is written to a temporary file next to `path` first, so a
/// failure leaves any existing file at `path` untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer(&mut writer, value).map_err(|source| Error::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| Error::io(temp.path(), e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;

    info!("Wrote {}", path.display());
    Ok(())
}

/// Copy images into `dest_dir`, keeping their file names. Returns how many were copied.
///
/// Nothing is copied when `dest_dir` is the directory the images already live in.
pub fn copy_images(images: &[PathBuf], dest_dir: &Path) -> Result<usize> {
    let mut copied = 0;
    for image in images {
        let target = dest_dir.join(file_name_of(image));
        if same_file(image, &target) {
            debug!("{} already in place", image.display());
            continue;
        }
        fs::copy(image, &target).map_err(|e| Error::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
