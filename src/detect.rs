//! UI component detection and heuristic classification.
//!
//! Edges of a blurred grayscale copy are merged with the binary mask, closed,
//! and traced into external contours. Each contour yields a bounding box and
//! [`GeometricFeatures`]; an ordered rule table then assigns a
//! [`ComponentKind`] or drops the region.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::convex_hull;
use imageproc::morphology::close;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::error::{M2cError, Result};
use crate::preprocess::Preprocessed;
use crate::types::{polygon_area, BoundingBox, Component, ComponentKind, GeometricFeatures, Point};

pub const BUTTON_MIN_ASPECT: f64 = 0.8;
pub const BUTTON_MAX_ASPECT: f64 = 3.5;
pub const BUTTON_MIN_AREA: f64 = 1000.0;
pub const BUTTON_MAX_AREA: f64 = 50000.0;
pub const BUTTON_MIN_SOLIDITY: f64 = 0.85;

pub const INPUT_MIN_ASPECT: f64 = 3.0;
pub const INPUT_MIN_AREA: f64 = 2000.0;
pub const INPUT_MIN_SOLIDITY: f64 = 0.7;

pub const CONTAINER_MIN_AREA: f64 = 10000.0;
pub const CONTAINER_MIN_SOLIDITY: f64 = 0.6;

/// One row of the classification table. All bounds are exclusive; a missing
/// bound does not constrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_aspect: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_aspect: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area: Option<f64>,
    #[serde(default)]
    pub min_solidity: f64,
}

impl ClassificationRule {
    pub fn matches(&self, features: &GeometricFeatures) -> bool {
        let above = |value: f64, bound: Option<f64>| bound.map_or(true, |b| value > b);
        let below = |value: f64, bound: Option<f64>| bound.map_or(true, |b| value < b);
        above(features.aspect_ratio, self.min_aspect)
            && below(features.aspect_ratio, self.max_aspect)
            && above(features.area, self.min_area)
            && below(features.area, self.max_area)
            && features.solidity > self.min_solidity
    }

    /// Button, then Input, then Container. Ranges overlap, so order matters.
    pub fn default_table() -> Vec<ClassificationRule> {
        vec![
            ClassificationRule {
                kind: ComponentKind::Button,
                min_aspect: Some(BUTTON_MIN_ASPECT),
                max_aspect: Some(BUTTON_MAX_ASPECT),
                min_area: Some(BUTTON_MIN_AREA),
                max_area: Some(BUTTON_MAX_AREA),
                min_solidity: BUTTON_MIN_SOLIDITY,
            },
            ClassificationRule {
                kind: ComponentKind::Input,
                min_aspect: Some(INPUT_MIN_ASPECT),
                max_aspect: None,
                min_area: Some(INPUT_MIN_AREA),
                max_area: None,
                min_solidity: INPUT_MIN_SOLIDITY,
            },
            ClassificationRule {
                kind: ComponentKind::Container,
                min_aspect: None,
                max_aspect: None,
                min_area: Some(CONTAINER_MIN_AREA),
                max_area: None,
                min_solidity: CONTAINER_MIN_SOLIDITY,
            },
        ]
    }
}

/// Area floor plus first-match evaluation of `rules`.
pub fn classify(
    features: &GeometricFeatures,
    min_area: f64,
    rules: &[ClassificationRule],
) -> Option<ComponentKind> {
    if features.area < min_area {
        return None;
    }
    rules.iter().find(|r| r.matches(features)).map(|r| r.kind)
}

/// True when the aspect ratio lies outside `[1 / max_ratio, max_ratio]`.
pub fn is_sliver(aspect_ratio: f64, max_ratio: f64) -> bool {
    aspect_ratio < 1.0 / max_ratio || aspect_ratio > max_ratio
}

/// Why a region did or did not become a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionVerdict {
    Classified(ComponentKind),
    BelowMinArea,
    Sliver,
    Unmatched,
}

/// A traced region with its features and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub bounding_box: BoundingBox,
    pub features: GeometricFeatures,
    pub verdict: RegionVerdict,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionReport {
    /// External contours traced before any filtering.
    pub contour_count: usize,
    pub regions: Vec<Region>,
}

impl RegionReport {
    /// Classified regions, in detection order, as text-less components.
    pub fn components(&self) -> Vec<Component> {
        self.regions
            .iter()
            .filter_map(|r| match r.verdict {
                RegionVerdict::Classified(kind) => Some(Component::new(kind, r.bounding_box)),
                _ => None,
            })
            .collect()
    }
}

pub fn detect_components(pre: &Preprocessed, config: &DetectionConfig) -> Result<Vec<Component>> {
    Ok(analyze_regions(pre, config)?.components())
}

/// Traces external contours and records a verdict for every one of them.
pub fn analyze_regions(pre: &Preprocessed, config: &DetectionConfig) -> Result<RegionReport> {
    if config.max_ratio < 1.0 {
        return Err(M2cError::preprocess(format!(
            "detection.max_ratio must be >= 1.0, got {}",
            config.max_ratio
        )));
    }

    let outline = outline_map(pre, config);
    let contours = find_contours::<i32>(&outline);
    let external: Vec<&Contour<i32>> = contours
        .iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .collect();

    let mut regions = Vec::with_capacity(external.len());
    for contour in &external {
        let Some((bounding_box, features)) = region_features(&contour.points) else {
            continue;
        };
        let verdict = if features.area < config.min_area {
            RegionVerdict::BelowMinArea
        } else if is_sliver(features.aspect_ratio, config.max_ratio) {
            RegionVerdict::Sliver
        } else {
            match classify(&features, config.min_area, &config.rules) {
                Some(kind) => RegionVerdict::Classified(kind),
                None => RegionVerdict::Unmatched,
            }
        };
        if verdict != RegionVerdict::BelowMinArea {
            debug!(?bounding_box, ?features, ?verdict, "region");
        }
        regions.push(Region {
            bounding_box,
            features,
            verdict,
        });
    }

    let report = RegionReport {
        contour_count: external.len(),
        regions,
    };
    info!(
        contours = report.contour_count,
        components = report
            .regions
            .iter()
            .filter(|r| matches!(r.verdict, RegionVerdict::Classified(_)))
            .count(),
        "detected components"
    );
    Ok(report)
}

/// Canny edges of the blurred gray image merged with the binary mask, then
/// closed so broken outlines become single regions.
pub fn outline_map(pre: &Preprocessed, config: &DetectionConfig) -> GrayImage {
    let blurred = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(&pre.gray, config.blur_sigma)
    } else {
        pre.gray.clone()
    };
    let mut edges = canny(&blurred, config.canny_low, config.canny_high);

    if pre.mask.dimensions() == edges.dimensions() {
        for (edge, mask) in edges.pixels_mut().zip(pre.mask.pixels()) {
            *edge = Luma([edge.0[0].max(mask.0[0])]);
        }
    }

    if config.edge_close_radius == 0 {
        edges
    } else {
        close(&edges, Norm::LInf, config.edge_close_radius)
    }
}

/// Bounding box and shape features of a traced contour.
///
/// The box is pixel-inclusive (`width = max_x - min_x + 1`). Returns `None`
/// for an empty contour.
pub fn region_features(points: &[imageproc::point::Point<i32>]) -> Option<(BoundingBox, GeometricFeatures)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let bounding_box = BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);

    let outline: Vec<Point> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
    let area = polygon_area(&outline);
    let hull_area = if points.len() < 3 {
        0.0
    } else {
        let hull: Vec<Point> = convex_hull(points)
            .into_iter()
            .map(|p| Point::new(p.x, p.y))
            .collect();
        polygon_area(&hull)
    };

    Some((
        bounding_box,
        GeometricFeatures {
            area,
            aspect_ratio: f64::from(bounding_box.width) / f64::from(bounding_box.height),
            solidity: solidity(area, hull_area),
        },
    ))
}

/// `area / hull_area` clamped to [0, 1]; 0 for a degenerate hull.
pub fn solidity(area: f64, hull_area: f64) -> f64 {
    if hull_area <= 0.0 || !hull_area.is_finite() {
        return 0.0;
    }
    (area / hull_area).clamp(0.0, 1.0)
}
