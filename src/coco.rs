//! COCO format data structures
//!
//! Only the subset of the COCO detection schema consumed by the DINO data
//! loader is produced: a single `person` category, no licenses and no
//! segmentation. Field order follows the order the files are written in.

use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

pub const PERSON_CATEGORY_ID: u32 = 1;

/// COCO dataset information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub description: String,
}

/// COCO category information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub supercategory: String,
    pub id: u32,
    pub name: String,
}

impl Category {
    pub fn person() -> Self {
        Self {
            supercategory: "person".to_string(),
            id: PERSON_CATEGORY_ID,
            name: "person".to_string(),
        }
    }
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub file_name: String,
    pub id: u64,
}

impl Image {
    pub fn new(file_name: String, id: u64) -> Self {
        Self { file_name, id }
    }
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub iscrowd: u32,
    pub image_id: u64,
    pub bbox: [i64; 4], // [x, y, width, height]
    pub area: i64,
    pub category_id: u32,
    pub id: u64,
}

impl Annotation {
    /// Build a non-crowd `person` annotation from a VOC box.
    pub fn from_box(id: u64, image_id: u64, bbox: &BoundingBox) -> Self {
        Self {
            iscrowd: 0,
            image_id,
            bbox: bbox.to_xywh(),
            area: bbox.area(),
            category_id: PERSON_CATEGORY_ID,
            id,
        }
    }
}

/// Complete COCO dataset structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoFile {
    pub info: Info,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

impl CocoFile {
    /// An empty document carrying `info` and the single `person` category.
    pub fn template(description: impl Into<String>) -> Self {
        Self {
            info: Info {
                description: description.into(),
            },
            images: Vec::new(),
            annotations: Vec::new(),
            categories: vec![Category::person()],
        }
    }
}
