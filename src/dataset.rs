use log::info;

use crate::coco::CocoFile;
use crate::config::{ConvertConfig, SplitSpec};
use crate::conversion::convert_split;
use crate::error::Result;
use crate::io::{copy_images, setup_output_directories};
use crate::types::ConversionStats;

/// Main dataset processing pipeline
///
/// Converts every split in order into `annotations/instances_<target>.json`
/// and copies the split's images into `<output_dir>/<target>/`. The first
/// failing split aborts the run; splits already written stay on disk.
pub fn process_dataset(config: &ConvertConfig) -> Result<Vec<(SplitSpec, ConversionStats)>> {
    let output_dirs = setup_output_directories(&config.output_dir, &config.splits)?;

    let mut summaries = Vec::with_capacity(config.splits.len());
    for (split, images_dir) in config.splits.iter().zip(&output_dirs.split_image_dirs) {
        let split_dir = config.dataset_dir.join(&split.source);
        let output_path = output_dirs
            .annotations_dir
            .join(split.annotation_file_name());
        let template = CocoFile::template(split.description(&config.description));

        info!(
            "Converting split {} -> {}",
            split_dir.display(),
            output_path.display()
        );
        let converted = convert_split(
            &split_dir,
            &split.target,
            &template,
            &output_path,
            &config.selection,
        )?;
        let mut stats = converted.stats;

        if config.copy_images {
            stats.images_copied = copy_images(&converted.images, images_dir)?;
        }

        stats.print_summary(&split.target);
        summaries.push((split.clone(), stats));
    }

    info!("Conversion process completed successfully.");
    Ok(summaries)
}
