//! Error type shared by every stage of the conversion pipeline.

use std::path::{Path, PathBuf};

/// Errors raised while converting, previewing or running the external model.
///
/// Every variant carries the path (or program) it concerns so the binary can
/// report the offending file without extra context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed annotation {}: {reason}", .path.display())]
    MalformedAnnotation { path: PathBuf, reason: String },

    #[error("image {} has no annotation file (expected {})", .image.display(), .expected.display())]
    MissingAnnotation { image: PathBuf, expected: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image error on {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{program} exited with {}", describe_exit(.code))]
    ExternalCommand { program: String, code: Option<i32> },
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Error::MalformedAnnotation {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// The file the error refers to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::MalformedAnnotation { path, .. }
            | Error::Io { path, .. }
            | Error::Serialize { path, .. }
            | Error::Image { path, .. } => Some(path),
            Error::MissingAnnotation { image, .. } => Some(image),
            Error::ExternalCommand { .. } => None,
        }
    }
}
