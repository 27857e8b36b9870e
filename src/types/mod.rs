mod core;
mod result;

pub use self::core::{
    polygon_area, BoundingBox, Component, ComponentKind, GeometricFeatures, Point, TextBlock,
};
pub use self::result::{
    orphan_blocks, PipelineResult, StageTimings, FAILED_MARKUP, FAILED_SCRIPT, FAILED_STYLESHEET,
};
