//! Terminal artifact of a pipeline run.

use serde::{Deserialize, Serialize};

use super::core::{Component, TextBlock};

/// Placeholder markup emitted by failed runs.
pub const FAILED_MARKUP: &str = "<!-- m2c: conversion failed; no markup generated -->";
/// Placeholder stylesheet emitted by failed runs.
pub const FAILED_STYLESHEET: &str = "/* m2c: conversion failed; no stylesheet generated */";
/// Placeholder script emitted by failed runs.
pub const FAILED_SCRIPT: &str = "// m2c: conversion failed; no script generated";

/// Wall-clock duration of each stage in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub load_ms: u64,
    pub preprocess_ms: u64,
    pub text_ms: u64,
    pub detect_ms: u64,
    pub match_ms: u64,
    pub generate_ms: u64,
}

/// Outcome of [`crate::pipeline::Pipeline::run`].
///
/// Callers must inspect `success`: failures are reported here rather than
/// through `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub markup: String,
    pub stylesheet: String,
    pub script: String,
    /// Annotated preview as a `data:image/png;base64,...` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
    pub components: Vec<Component>,
    pub text_blocks: Vec<TextBlock>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub contour_count: usize,
    #[serde(default)]
    pub timings: StageTimings,
}

impl PipelineResult {
    /// A fully-labeled failure: no components, no text, placeholder code.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            markup: FAILED_MARKUP.to_string(),
            stylesheet: FAILED_STYLESHEET.to_string(),
            script: FAILED_SCRIPT.to_string(),
            preview_image: None,
            components: Vec::new(),
            text_blocks: Vec::new(),
            success: false,
            error: Some(message.into()),
            width: 0,
            height: 0,
            contour_count: 0,
            timings: StageTimings::default(),
        }
    }

    /// Text blocks not attached to any component.
    pub fn orphan_text_blocks(&self) -> Vec<&TextBlock> {
        orphan_blocks(&self.components, &self.text_blocks)
    }
}

/// Blocks whose index is not referenced by any component's `text_block`.
pub fn orphan_blocks<'a>(components: &[Component], blocks: &'a [TextBlock]) -> Vec<&'a TextBlock> {
    let mut claimed = vec![false; blocks.len()];
    for idx in components.iter().filter_map(|c| c.text_block) {
        if let Some(slot) = claimed.get_mut(idx) {
            *slot = true;
        }
    }
    blocks
        .iter()
        .zip(claimed)
        .filter_map(|(block, used)| (!used).then_some(block))
        .collect()
}
