use std::path::PathBuf;

// Image extensions accepted by `--image_ext`
pub const IMG_FORMATS: &[&str] = &[
    "bmp", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

/// Axis-aligned box in pixel coordinates, as stored in Pascal VOC `<bndbox>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl BoundingBox {
    pub fn new(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    // Saturating. The parser rejects any box whose `checked_area` overflows.
    pub fn width(&self) -> i64 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> i64 {
        self.ymax.saturating_sub(self.ymin)
    }

    pub fn area(&self) -> i64 {
        self.width().saturating_mul(self.height())
    }

    /// Area, or `None` when the width, height or area does not fit in an `i64`.
    pub fn checked_area(&self) -> Option<i64> {
        let width = self.xmax.checked_sub(self.xmin)?;
        let height = self.ymax.checked_sub(self.ymin)?;
        width.checked_mul(height)
    }

    /// `[x, y, width, height]`, the layout COCO uses for `bbox`.
    pub fn to_xywh(&self) -> [i64; 4] {
        [self.xmin, self.ymin, self.width(), self.height()]
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

// Paths to the output directories of a prepared dataset
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub annotations_dir: PathBuf,
    /// One image directory per split, in split order
    pub split_image_dirs: Vec<PathBuf>,
}

// Struct to hold conversion statistics for one split
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub images: usize,
    pub annotations: usize,
    pub images_without_objects: usize,
    pub images_copied: usize,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_image(&mut self, boxes: usize) {
        self.images += 1;
        self.annotations += boxes;
        if boxes == 0 {
            self.images_without_objects += 1;
        }
    }

    pub fn print_summary(&self, split: &str) {
        log::info!("=== {} summary ===", split);
        log::info!("Images: {}", self.images);
        log::info!("Annotations: {}", self.annotations);
        log::info!("Images copied: {}", self.images_copied);
        if self.images_without_objects > 0 {
            log::warn!(
                "{} image(s) in {} have no annotated objects",
                self.images_without_objects,
                split
            );
        }
    }
}
