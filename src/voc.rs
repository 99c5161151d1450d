//! Pascal VOC annotation parsing
//!
//! Only the parts of a VOC document the converter needs are read: every
//! `<object>` element, wherever it sits, and the coordinates of its first
//! direct `<bndbox>` child. Everything else (`<filename>`, `<size>`,
//! `<name>`, `<part>` ...) is skipped. The whole document is read before any
//! object is validated, so a file that is not well-formed XML is always
//! reported as such.

use std::fs;
use std::path::Path;
use xml::reader::{ParserConfig, XmlEvent};

use crate::error::{Error, Result};
use crate::types::BoundingBox;

const COORDINATES: [&str; 4] = ["xmin", "ymin", "xmax", "ymax"];

/// Raw fields of one `<object>`, in document order
#[derive(Debug, Default)]
struct VocObject {
    has_bndbox: bool,
    coordinates: [Option<String>; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BndBoxState {
    Absent,
    Open { depth: usize },
    Closed,
}

/// An `<object>` whose end tag has not been seen yet
#[derive(Debug)]
struct OpenObject {
    index: usize,
    depth: usize,
    bndbox: BndBoxState,
    /// Coordinate slot and depth of the element whose text is being read
    reading: Option<(usize, usize)>,
}

#[derive(Debug, Default)]
struct ObjectCollector {
    objects: Vec<VocObject>,
    open: Vec<OpenObject>,
}

impl ObjectCollector {
    fn start(&mut self, name: &str, depth: usize) {
        if let Some(current) = self.open.last_mut() {
            match current.bndbox {
                BndBoxState::Absent if name == "bndbox" && depth == current.depth + 1 => {
                    current.bndbox = BndBoxState::Open { depth };
                    self.objects[current.index].has_bndbox = true;
                }
                BndBoxState::Open { depth: bndbox_depth } if depth == bndbox_depth + 1 => {
                    let slot = COORDINATES.iter().position(|c| *c == name);
                    let coordinates = &mut self.objects[current.index].coordinates;
                    if let Some(slot) = slot {
                        // first occurrence wins
                        if coordinates[slot].is_none() {
                            coordinates[slot] = Some(String::new());
                            current.reading = Some((slot, depth));
                        }
                    }
                }
                _ => {}
            }
        }

        if name == "object" {
            self.open.push(OpenObject {
                index: self.objects.len(),
                depth,
                bndbox: BndBoxState::Absent,
                reading: None,
            });
            self.objects.push(VocObject::default());
        }
    }

    fn text(&mut self, text: &str, depth: usize) {
        if let Some(current) = self.open.last() {
            if let Some((slot, reading_depth)) = current.reading {
                if reading_depth == depth {
                    if let Some(value) = &mut self.objects[current.index].coordinates[slot] {
                        value.push_str(text);
                    }
                }
            }
        }
    }

    fn end(&mut self, depth: usize) {
        let Some(current) = self.open.last_mut() else {
            return;
        };
        if matches!(current.reading, Some((_, reading_depth)) if reading_depth == depth) {
            current.reading = None;
        }
        if current.bndbox == (BndBoxState::Open { depth }) {
            current.bndbox = BndBoxState::Closed;
        }
        if current.depth == depth {
            self.open.pop();
        }
    }
}

impl VocObject {
    fn coordinate(&self, slot: usize, index: usize, path: &Path) -> Result<i64> {
        let name = COORDINATES[slot];
        let text = self.coordinates[slot].as_deref().ok_or_else(|| {
            Error::malformed(path, format!("object #{} has no <{}>", index, name))
        })?;
        text.trim().parse::<i64>().map_err(|_| {
            Error::malformed(
                path,
                format!("object #{} has a non-integer <{}>: {:?}", index, name, text),
            )
        })
    }

    fn to_box(&self, index: usize, path: &Path) -> Result<BoundingBox> {
        if !self.has_bndbox {
            return Err(Error::malformed(
                path,
                format!("object #{} has no <bndbox>", index),
            ));
        }
        let xmin = self.coordinate(0, index, path)?;
        let ymin = self.coordinate(1, index, path)?;
        let xmax = self.coordinate(2, index, path)?;
        let ymax = self.coordinate(3, index, path)?;

        let bbox = BoundingBox::new(xmin, ymin, xmax, ymax);
        let describe = || {
            format!(
                "(xmin={}, ymin={}, xmax={}, ymax={})",
                xmin, ymin, xmax, ymax
            )
        };
        if bbox.checked_area().is_none() {
            return Err(Error::malformed(
                path,
                format!("object #{} has a box too large to measure {}", index, describe()),
            ));
        }
        if bbox.is_degenerate() {
            return Err(Error::malformed(
                path,
                format!("object #{} has a degenerate box {}", index, describe()),
            ));
        }
        Ok(bbox)
    }
}

/// Read a VOC XML file and return its boxes in document order.
pub fn parse_annotation(path: &Path) -> Result<Vec<BoundingBox>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_annotation_str(&content, path)
}

/// Parse VOC XML already held in memory. `path` is only used for error reporting.
pub fn parse_annotation_str(xml: &str, path: &Path) -> Result<Vec<BoundingBox>> {
    let reader = ParserConfig::new()
        .trim_whitespace(true)
        .cdata_to_characters(true)
        .allow_multiple_root_elements(false)
        .create_reader(xml.as_bytes());

    let mut collector = ObjectCollector::default();
    let mut depth = 0usize;
    for event in reader {
        match event.map_err(|e| Error::malformed(path, e.to_string()))? {
            XmlEvent::StartElement { name, .. } => {
                depth += 1;
                collector.start(&name.local_name, depth);
            }
            XmlEvent::Characters(text) => collector.text(&text, depth),
            XmlEvent::EndElement { .. } => {
                collector.end(depth);
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    collector
        .objects
        .iter()
        .enumerate()
        .map(|(index, object)| object.to_box(index, path))
        .collect()
}
