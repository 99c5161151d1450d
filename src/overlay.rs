//! Bounding-box overlays for eyeballing a split before training.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use indicatif::ProgressBar;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PreviewConfig;
use crate::conversion::annotation_path_for;
use crate::error::{Error, Result};
use crate::types::BoundingBox;
use crate::utils::{create_output_directory, create_progress_bar, file_name_of, list_image_files};
use crate::voc::parse_annotation;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: i64 = 2;

/// Draw one box outline onto `image` and hand the image back.
pub fn draw_rectangle(mut image: RgbImage, bbox: &BoundingBox) -> RgbImage {
    draw_box(&mut image, bbox);
    image
}

/// Draw every box once; parts outside the image are clipped.
pub fn draw_boxes(image: &mut RgbImage, boxes: &[BoundingBox]) {
    for bbox in boxes {
        draw_box(image, bbox);
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox) {
    // inner rings make up the thickness
    for inset in 0..BOX_THICKNESS {
        let width = bbox.width() - 2 * inset;
        let height = bbox.height() - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(to_i32(bbox.xmin + inset), to_i32(bbox.ymin + inset))
            .of_size(to_u32(width), to_u32(height));
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn to_u32(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}

/// Write a copy of every image in the split with its boxes drawn on it.
///
/// Returns the number of images written. Images are visited in the same
/// order the converter assigns ids in.
pub fn preview_split(config: &PreviewConfig) -> Result<usize> {
    if same_dir(&config.split_dir, &config.output_dir) {
        return Err(Error::io(
            &config.output_dir,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "preview output would overwrite the source images",
            ),
        ));
    }

    let images = list_image_files(&config.split_dir, &config.selection)?;
    let output_dir = create_output_directory(&config.output_dir)?;

    let pb = create_progress_bar(images.len() as u64, "Preview");
    let rendered = render_all(&images, &output_dir, &pb);
    match &rendered {
        Ok(_) => pb.finish_with_message("preview complete"),
        Err(_) => pb.abandon(),
    }
    rendered?;

    info!(
        "Wrote {} preview image(s) to {}",
        images.len(),
        output_dir.display()
    );
    Ok(images.len())
}

fn render_all(images: &[PathBuf], output_dir: &Path, pb: &ProgressBar) -> Result<()> {
    for image_path in images {
        let xml_path = annotation_path_for(image_path);
        if !xml_path.is_file() {
            return Err(Error::MissingAnnotation {
                image: image_path.clone(),
                expected: xml_path,
            });
        }
        let boxes = parse_annotation(&xml_path)?;

        let mut image = image::open(image_path)
            .map_err(|source| Error::Image {
                path: image_path.clone(),
                source,
            })?
            .to_rgb8();
        draw_boxes(&mut image, &boxes);

        let target = output_dir.join(file_name_of(image_path));
        image.save(&target).map_err(|source| Error::Image {
            path: target.clone(),
            source,
        })?;
        debug!("{}: drew {} box(es)", target.display(), boxes.len());
        pb.inc(1);
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
