use indicatif::ProgressBar;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::coco::{Annotation, CocoFile, Image};
use crate::config::ImageSelection;
use crate::error::{Error, Result};
use crate::io::write_json_atomic;
use crate::types::ConversionStats;
use crate::utils::{create_progress_bar, file_name_of, list_image_files};
use crate::voc::parse_annotation;

/// Result of converting one split directory
#[derive(Debug, Clone)]
pub struct ConvertedSplit {
    pub coco: CocoFile,
    /// Source image paths, indexed by image id
    pub images: Vec<PathBuf>,
    pub stats: ConversionStats,
}

/// The VOC XML file expected next to an image
pub fn annotation_path_for(image_path: &Path) -> PathBuf {
    image_path.with_extension("xml")
}

/// Convert a split directory into a COCO document held in memory.
///
/// `template` supplies `info` and `categories`; its `images` and
/// `annotations` are replaced. Image ids follow `selection.order` and
/// annotation ids run from 0 in the same order.
pub fn build_coco_file(
    split_dir: &Path,
    template: &CocoFile,
    selection: &ImageSelection,
) -> Result<ConvertedSplit> {
    build_labelled(split_dir, template, selection, &file_name_of(split_dir))
}

fn build_labelled(
    split_dir: &Path,
    template: &CocoFile,
    selection: &ImageSelection,
    split_name: &str,
) -> Result<ConvertedSplit> {
    let images = list_image_files(split_dir, selection)?;
    info!(
        "Found {} image(s) in {}",
        images.len(),
        split_dir.display()
    );

    let pb = create_progress_bar(images.len() as u64, split_name);
    let assembled = assemble(&images, template, &pb);
    match &assembled {
        Ok(_) => pb.finish_with_message("conversion complete"),
        Err(_) => pb.abandon(),
    }
    let (coco, stats) = assembled?;

    Ok(ConvertedSplit {
        coco,
        images,
        stats,
    })
}

fn assemble(
    images: &[PathBuf],
    template: &CocoFile,
    pb: &ProgressBar,
) -> Result<(CocoFile, ConversionStats)> {
    let mut coco = CocoFile {
        info: template.info.clone(),
        images: Vec::with_capacity(images.len()),
        annotations: Vec::new(),
        categories: template.categories.clone(),
    };
    let mut stats = ConversionStats::new();
    let mut next_annotation_id: u64 = 0;

    for (image_id, image_path) in (0u64..).zip(images) {
        let xml_path = annotation_path_for(image_path);
        if !xml_path.is_file() {
            return Err(Error::MissingAnnotation {
                image: image_path.clone(),
                expected: xml_path,
            });
        }

        let boxes = parse_annotation(&xml_path)?;
        debug!("{}: {} box(es)", xml_path.display(), boxes.len());

        coco.images
            .push(Image::new(file_name_of(image_path), image_id));
        for bbox in &boxes {
            coco.annotations
                .push(Annotation::from_box(next_annotation_id, image_id, bbox));
            next_annotation_id += 1;
        }

        stats.record_image(boxes.len());
        pb.inc(1);
    }

    Ok((coco, stats))
}

/// Convert a split directory and write the COCO JSON to `output_path`.
///
/// `split_name` labels the progress bar, normally the split's target name.
/// The whole split is converted before anything is written; on error the
/// output file is left as it was.
pub fn convert_split(
    split_dir: &Path,
    split_name: &str,
    template: &CocoFile,
    output_path: &Path,
    selection: &ImageSelection,
) -> Result<ConvertedSplit> {
    let converted = build_labelled(split_dir, template, selection, split_name)?;
    write_json_atomic(output_path, &converted.coco)?;
    Ok(converted)
}
