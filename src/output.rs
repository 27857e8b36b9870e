use crate::codegen::{CssMode, Framework};
use crate::error::ErrorPayload;
use crate::pipeline::DetectionSummary;
use crate::types::PipelineResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const M2C_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum M2cOutput {
    Convert(ConvertOutput),
    Detect(DetectOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOutput {
    pub version: String,
    pub input: String,
    pub framework: Framework,
    pub css_mode: CssMode,
    #[serde(flatten)]
    pub result: PipelineResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub written_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectOutput {
    pub version: String,
    pub input: String,
    #[serde(flatten)]
    pub detection: DetectionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Summary {
    /// Human-readable notes about a finished conversion, or `None` when
    /// there is nothing worth mentioning.
    pub fn for_result(result: &PipelineResult) -> Option<Summary> {
        let mut notes = Vec::new();
        if result.success && result.components.is_empty() {
            notes.push("No UI components detected; markup contains only the page skeleton.".to_string());
        }
        let orphans = result.orphan_text_blocks().len();
        if orphans > 0 {
            notes.push(format!(
                "{orphans} text block(s) did not fall inside any component and were emitted as standalone text."
            ));
        }
        let unlabeled = result
            .components
            .iter()
            .filter(|c| !c.has_text())
            .count();
        if unlabeled > 0 {
            notes.push(format!("{unlabeled} component(s) received no text."));
        }
        (!notes.is_empty()).then_some(Summary { notes })
    }
}
