//! Orchestrates a full conversion: load, preprocess, text extraction and
//! component detection in parallel, matching, generation, preview.
//!
//! [`Pipeline::run`] never returns an error: any stage failure (or the
//! whole-run timeout) becomes a [`PipelineResult`] with `success = false`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codegen::{self, CssMode, Framework};
use crate::config::Config;
use crate::detect::{self, RegionReport};
use crate::error::{M2cError, Result};
use crate::image_loader::{self, ImageSource, PixelBuffer};
use crate::matcher::{self, TextMatcher};
use crate::ocr::OcrEngine;
use crate::preprocess::{self, Preprocessed};
use crate::preview;
use crate::text;
use crate::types::{PipelineResult, StageTimings};

/// Regions found by the detector, without text or code generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub report: RegionReport,
}

/// A reusable converter. The OCR engine and matcher are created once and
/// shared by every run; runs hold no other state.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    ocr: Arc<dyn OcrEngine>,
    matcher: Arc<dyn TextMatcher>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ocr", &self.ocr.name())
            .field("matcher", &self.matcher.name())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validates `config` and resolves the configured matching strategy.
    pub fn new(config: Config, ocr: Arc<dyn OcrEngine>) -> Result<Self> {
        config.validate().map_err(M2cError::Config)?;
        let matcher = matcher::matcher_for(config.matching.strategy).ok_or_else(|| {
            M2cError::Config(
                "matching.strategy = \"indexed\" requires the spatial-index feature".to_string(),
            )
        })?;
        Ok(Self {
            config: Arc::new(config),
            ocr,
            matcher: Arc::from(matcher),
        })
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn TextMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ocr_engine(&self) -> &str {
        self.ocr.name()
    }

    pub fn matcher_name(&self) -> &str {
        self.matcher.name()
    }

    pub async fn run(
        &self,
        source: ImageSource,
        framework: Framework,
        css_mode: CssMode,
    ) -> PipelineResult {
        match self.run_checked(source, framework, css_mode).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, category = ?err.category(), "conversion failed");
                PipelineResult::failure(err.to_string())
            }
        }
    }

    /// Same as [`Pipeline::run`] but surfaces the typed stage error instead
    /// of folding it into the result.
    pub async fn run_checked(
        &self,
        source: ImageSource,
        framework: Framework,
        css_mode: CssMode,
    ) -> Result<PipelineResult> {
        let limit = self.config.pipeline.timeout;
        tokio::time::timeout(limit, self.execute(source, framework, css_mode))
            .await
            .map_err(|_| M2cError::Timeout(limit))?
    }

    async fn execute(
        &self,
        source: ImageSource,
        framework: Framework,
        css_mode: CssMode,
    ) -> Result<PipelineResult> {
        let mut timings = StageTimings::default();
        info!(source = %source.describe(), %framework, %css_mode, "starting conversion");

        let (buffer, pre) = self.load_and_preprocess(source, &mut timings).await?;
        let (width, height) = buffer.dimensions();

        let text_task = {
            let ocr = Arc::clone(&self.ocr);
            let buffer = Arc::clone(&buffer);
            let config = Arc::clone(&self.config);
            blocking(M2cError::Recognition, move || {
                let started = Instant::now();
                let blocks = text::extract_text(ocr.as_ref(), &buffer, &config.ocr)?;
                Ok((blocks, elapsed_ms(started)))
            })
        };
        let detect_task = {
            let pre = Arc::clone(&pre);
            let config = Arc::clone(&self.config);
            blocking(M2cError::Preprocess, move || {
                let started = Instant::now();
                let report = detect::analyze_regions(&pre, &config.detection)?;
                Ok((report, elapsed_ms(started)))
            })
        };
        let ((text_blocks, text_ms), (report, detect_ms)) =
            tokio::try_join!(text_task, detect_task)?;
        timings.text_ms = text_ms;
        timings.detect_ms = detect_ms;

        let started = Instant::now();
        let detected = report.components();
        let components = self.matcher.match_text(&detected, &text_blocks);
        timings.match_ms = elapsed_ms(started);

        let started = Instant::now();
        let code = codegen::generate(&components, &text_blocks, framework, css_mode)?;
        timings.generate_ms = elapsed_ms(started);

        let preview_image = if self.config.pipeline.preview {
            let buffer = Arc::clone(&buffer);
            let components = components.clone();
            let text_blocks = text_blocks.clone();
            Some(
                blocking(M2cError::Generation, move || {
                    preview::preview_data_uri(&buffer, &components, &text_blocks)
                })
                .await?,
            )
        } else {
            None
        };

        info!(
            components = components.len(),
            text_blocks = text_blocks.len(),
            contours = report.contour_count,
            "conversion finished"
        );

        Ok(PipelineResult {
            markup: code.markup,
            stylesheet: code.stylesheet,
            script: code.script,
            preview_image,
            components,
            text_blocks,
            success: true,
            error: None,
            width,
            height,
            contour_count: report.contour_count,
            timings,
        })
    }

    /// Loader, preprocessor and detector only. Bounded by the same timeout
    /// as a full run.
    pub async fn detect(&self, source: ImageSource) -> Result<DetectionSummary> {
        let limit = self.config.pipeline.timeout;
        let work = async {
            let mut timings = StageTimings::default();
            let (buffer, pre) = self.load_and_preprocess(source, &mut timings).await?;
            let config = Arc::clone(&self.config);
            let report = blocking(M2cError::Preprocess, move || {
                detect::analyze_regions(&pre, &config.detection)
            })
            .await?;
            let (width, height) = buffer.dimensions();
            Ok(DetectionSummary {
                width,
                height,
                report,
            })
        };
        tokio::time::timeout(limit, work)
            .await
            .map_err(|_| M2cError::Timeout(limit))?
    }

    async fn load_and_preprocess(
        &self,
        source: ImageSource,
        timings: &mut StageTimings,
    ) -> Result<(Arc<PixelBuffer>, Arc<Preprocessed>)> {
        let config = Arc::clone(&self.config);
        let started = Instant::now();
        let buffer = blocking(M2cError::Decode, move || {
            Ok(image_loader::load(&source, &config.loader)?)
        })
        .await?;
        timings.load_ms = elapsed_ms(started);
        let buffer = Arc::new(buffer);

        let config = Arc::clone(&self.config);
        let for_preprocess = Arc::clone(&buffer);
        let started = Instant::now();
        let pre = blocking(M2cError::Preprocess, move || {
            preprocess::preprocess(&for_preprocess, &config.preprocess)
        })
        .await?;
        timings.preprocess_ms = elapsed_ms(started);

        Ok((buffer, Arc::new(pre)))
    }
}

/// Runs CPU-bound stage work off the async runtime. A panicking stage is
/// reported through `on_panic`.
async fn blocking<T, F>(on_panic: fn(String) -> M2cError, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| on_panic(format!("stage task failed: {e}")))?
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
