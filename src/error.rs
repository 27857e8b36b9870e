use crate::image_loader::ImageLoadError;
use crate::ocr::OcrError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum M2cError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Preprocessing error: {0}")]
    Preprocess(String),

    #[error("Text recognition error: {0}")]
    Recognition(String),

    #[error("Code generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl M2cError {
    pub fn decode(message: impl Into<String>) -> Self {
        M2cError::Decode(message.into())
    }

    pub fn preprocess(message: impl Into<String>) -> Self {
        M2cError::Preprocess(message.into())
    }

    pub fn recognition(message: impl Into<String>) -> Self {
        M2cError::Recognition(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        M2cError::Generation(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            M2cError::Decode(_) => ErrorCategory::Decode,
            M2cError::Preprocess(_) => ErrorCategory::Preprocess,
            M2cError::Recognition(_) => ErrorCategory::Recognition,
            M2cError::Generation(_) => ErrorCategory::Generation,
            M2cError::Timeout(_) => ErrorCategory::Timeout,
            M2cError::Io(_) | M2cError::Serialization(_) | M2cError::Config(_) => {
                ErrorCategory::Config
            }
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let remediation = match self {
            M2cError::Decode(msg) => {
                if msg.to_ascii_lowercase().contains("not found") {
                    "Verify the file exists; use an absolute path or run from the working directory."
                } else {
                    "Verify the image is a readable png, jpg, gif, webp, bmp, tiff, tga or ico file."
                }
            }
            M2cError::Preprocess(_) => {
                "Check the [preprocess] section of the config; re-run with --verbose for details."
            }
            M2cError::Recognition(_) => {
                "Check the OCR engine installation (tessdata / TESSDATA_PREFIX) or pass --ocr-json."
            }
            M2cError::Generation(_) => "This is a bug; please file an issue with the input image.",
            M2cError::Io(_) => "Check file paths/permissions.",
            M2cError::Serialization(_) => {
                "Check JSON inputs (e.g., --ocr-json); run with --verbose for details."
            }
            M2cError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("framework") {
                    "Use --framework plain or --framework react."
                } else if lower.contains("css") {
                    "Use --css-mode external or --css-mode inline."
                } else if lower.contains("toml") || lower.contains("config") {
                    "Fix the config file syntax or remove it to use built-in defaults."
                } else {
                    "Check flags/paths and config values."
                }
            }
            M2cError::Timeout(_) => {
                "Increase pipeline.timeout in the config or use a smaller image / lower loader.max_width."
            }
        };
        ErrorPayload::new(self.category(), self.to_string(), remediation)
    }
}

impl From<ImageLoadError> for M2cError {
    fn from(err: ImageLoadError) -> Self {
        M2cError::decode(err.to_string())
    }
}

impl From<OcrError> for M2cError {
    fn from(err: OcrError) -> Self {
        M2cError::recognition(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, M2cError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Decode,
    Preprocess,
    Recognition,
    Generation,
    Config,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
