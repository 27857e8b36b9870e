//! Mockup to Code (m2c) Library
//!
//! Converts UI screenshots, wireframes and sketches into positioned
//! HTML/CSS (or a React-style component) by detecting rectangular UI
//! regions, recognizing text and attaching that text to the regions.
//!
//! # Module Overview
//!
//! - [`image_loader`] - Decoding from paths or bytes, width limiting
//! - [`preprocess`] - Contrast equalization, denoising, thresholding
//! - [`ocr`] / [`text`] - OCR capability and text block extraction
//! - [`detect`] - Contour analysis and rule-table classification
//! - [`matcher`] - Text-to-component spatial matching
//! - [`codegen`] - Markup, stylesheet and script templates
//! - [`preview`] - Annotated preview image
//! - [`pipeline`] - Orchestration, parallel stages, timeout
//! - [`export`] - Writing artifacts to disk
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types and structures
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use m2c_lib::{Config, CssMode, DisabledOcr, Framework, ImageSource, Pipeline};
//!
//! # async fn example() -> m2c_lib::Result<()> {
//! let pipeline = Pipeline::new(Config::default(), Arc::new(DisabledOcr))?;
//! let result = pipeline
//!     .run(ImageSource::from(std::path::Path::new("mockup.png")), Framework::Plain, CssMode::External)
//!     .await;
//! if result.success {
//!     println!("{}", result.markup);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codegen;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod image_loader;
pub mod logging;
pub mod matcher;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod preview;
pub mod text;
pub mod types;

pub use codegen::{generate, CssMode, Framework, GeneratedCode};
pub use config::{Config, ConfigLoadError, MatchStrategy};
pub use detect::{classify, ClassificationRule, Region, RegionReport, RegionVerdict};
pub use error::{ErrorCategory, ErrorPayload, M2cError, Result};
pub use export::write_bundle;
pub use image_loader::{load, ImageLoadError, ImageSource, PixelBuffer};
pub use matcher::{default_matcher, BruteForceMatcher, TextMatcher};
#[cfg(feature = "spatial-index")]
pub use matcher::IndexedMatcher;
pub use ocr::{DisabledOcr, OcrEngine, OcrError, OcrOptions, PrecomputedOcr, RawDetection, TesseractEngine};
pub use output::{ConvertOutput, DetectOutput, ErrorOutput, M2cOutput, Summary, M2C_OUTPUT_VERSION};
pub use pipeline::{DetectionSummary, Pipeline};
pub use text::clean_text;
pub use types::{
    BoundingBox, Component, ComponentKind, GeometricFeatures, PipelineResult, Point,
    StageTimings, TextBlock,
};
