//! Core types used throughout the m2c library.
//!
//! This module contains the fundamental data structures:
//! - [`Point`] - Integer pixel coordinate
//! - [`BoundingBox`] - Axis-aligned pixel rectangle
//! - [`TextBlock`] - Cleaned OCR text with its polygon
//! - [`ComponentKind`] / [`Component`] - Classified UI regions
//! - [`GeometricFeatures`] - Per-region shape descriptors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pixel coordinate in the processed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Min/max envelope of a point set. `None` for an empty slice or when
    /// the extent does not fit in an `i32`.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x.checked_sub(min_x)?,
            height: max_y.checked_sub(min_y)?,
        })
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// True when the two rectangles share a region of positive area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Half-open containment: left/top edges inside, right/bottom edges outside.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// True when the rectangle lies entirely inside a `width` x `height` canvas.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && i64::from(self.right()) <= i64::from(width)
            && i64::from(self.bottom()) <= i64::from(height)
    }
}

/// A recognized, cleaned text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    pub polygon: Vec<Point>,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

impl TextBlock {
    /// Builds a block whose bounding box is derived from `polygon`.
    ///
    /// Returns `None` unless the polygon has at least three points and a
    /// positive enclosed area.
    pub fn new(text: impl Into<String>, polygon: Vec<Point>, confidence: f32) -> Option<Self> {
        if polygon.len() < 3 || polygon_area(&polygon) <= 0.0 {
            return None;
        }
        let bounding_box = BoundingBox::from_points(&polygon)?;
        Some(Self {
            text: text.into(),
            polygon,
            bounding_box,
            confidence,
        })
    }
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
    }
    (twice_area / 2.0).abs()
}

/// UI component variants recognized by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Button,
    Input,
    Container,
}

impl ComponentKind {
    pub fn all() -> [ComponentKind; 3] {
        [
            ComponentKind::Button,
            ComponentKind::Input,
            ComponentKind::Container,
        ]
    }

    /// Prefix for generated CSS class names (`btn-3`, `input-0`, `card-7`).
    pub fn class_prefix(&self) -> &'static str {
        match self {
            ComponentKind::Button => "btn",
            ComponentKind::Input => "input",
            ComponentKind::Container => "card",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Button => "button",
            ComponentKind::Input => "input",
            ComponentKind::Container => "container",
        };
        f.write_str(name)
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "button" => Ok(ComponentKind::Button),
            "input" => Ok(ComponentKind::Input),
            "container" => Ok(ComponentKind::Container),
            other => Err(format!(
                "Unknown component kind '{other}'; expected button, input or container"
            )),
        }
    }
}

/// A classified UI region.
///
/// Components come out of detection with no text. Matching produces a new
/// sequence where `text` holds exactly one block's cleaned string and
/// `text_block` records that block's index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub kind: ComponentKind,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_block: Option<usize>,
}

impl Component {
    pub fn new(kind: ComponentKind, bounding_box: BoundingBox) -> Self {
        Self {
            kind,
            bounding_box,
            text: String::new(),
            text_block: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>, block_index: usize) -> Self {
        self.text = text.into();
        self.text_block = Some(block_index);
        self
    }

    pub fn has_text(&self) -> bool {
        self.text_block.is_some()
    }
}

/// Shape descriptors computed once per candidate region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometricFeatures {
    /// Enclosed contour area in px².
    pub area: f64,
    /// Bounding box width / height.
    pub aspect_ratio: f64,
    /// Contour area / convex hull area, 0 when the hull is degenerate.
    pub solidity: f64,
}
