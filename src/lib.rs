//! Pascal VOC to COCO converter
//!
//! This library converts a directory of images with per-image Pascal VOC XML
//! annotations into the COCO detection layout expected by DINO, draws box
//! previews, and launches the external DINO entry point.

pub mod coco;
pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod external;
pub mod io;
pub mod overlay;
pub mod types;
pub mod utils;
pub mod voc;

// Re-export commonly used types and functions
pub use config::{Cli, ConvertConfig, ImageOrder, ImageSelection, PreviewConfig, SplitSpec};
pub use conversion::{build_coco_file, convert_split, ConvertedSplit};
pub use dataset::process_dataset;
pub use error::{Error, Result};
pub use types::{BoundingBox, ConversionStats};
pub use voc::parse_annotation;

// COCO-specific exports
pub use coco::{Annotation, Category, CocoFile, Image, Info};
