//! OCR (Optical Character Recognition) capability.
//!
//! Recognition itself is an external collaborator: the pipeline only consumes
//! `(polygon, text, confidence)` triples through the [`OcrEngine`] trait.
//! Engines are created once and shared as `Arc<dyn OcrEngine>` across runs.
//!
//! Available engines:
//! - [`TesseractEngine`] - Tesseract via `leptess` on a dedicated worker thread
//!   (requires the `ocr` feature)
//! - [`PrecomputedOcr`] - detections read from JSON produced by any OCR tool
//! - [`DisabledOcr`] - recognizes nothing
//!
//! # System Requirements (`ocr` feature)
//!
//! - Tesseract OCR must be installed on the system
//! - The `tessdata` directory must be accessible (typically at `/usr/share/tesseract-ocr/tessdata`
//!   or set via `TESSDATA_PREFIX` environment variable)

use std::path::Path;
#[cfg(any(feature = "ocr", test))]
use std::sync::{mpsc, Mutex};
#[cfg(any(feature = "ocr", test))]
use std::thread;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
#[cfg(any(feature = "ocr", test))]
use tracing::debug;
use tracing::warn;

use crate::config::OcrConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitError(String),
    #[error("Failed to load image for OCR: {0}")]
    ImageLoadError(String),
    #[error("OCR processing failed: {0}")]
    ProcessingError(String),
    #[error("Invalid precomputed OCR data: {0}")]
    InvalidData(String),
    #[error("Tesseract not available - install Tesseract OCR and enable the 'ocr' feature")]
    NotAvailable,
}

/// Engine options. Passed through untouched; engines honor what they support.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub language: String,
    /// Group detections into paragraph-level blocks.
    pub paragraph: bool,
    pub text_threshold: f32,
    pub link_threshold: f32,
    pub batch_size: usize,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self::from(&OcrConfig::default())
    }
}

impl From<&OcrConfig> for OcrOptions {
    fn from(cfg: &OcrConfig) -> Self {
        Self {
            language: cfg.language.clone(),
            paragraph: cfg.paragraph,
            text_threshold: cfg.text_threshold,
            link_threshold: cfg.link_threshold,
            batch_size: cfg.batch_size,
        }
    }
}

/// One recognized region as reported by an engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    pub polygon: Vec<(f32, f32)>,
    pub text: String,
    pub confidence: f32,
}

/// Accepts both `{polygon, text, confidence}` objects and
/// `[[[x, y], ...], text, confidence]` triples.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDetectionRepr {
    Object {
        #[serde(alias = "bbox", alias = "box")]
        polygon: Vec<(f32, f32)>,
        text: String,
        #[serde(alias = "conf")]
        confidence: f32,
    },
    Triple(Vec<(f32, f32)>, String, f32),
}

impl<'de> Deserialize<'de> for RawDetection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (polygon, text, confidence) = match RawDetectionRepr::deserialize(deserializer)? {
            RawDetectionRepr::Object {
                polygon,
                text,
                confidence,
            } => (polygon, text, confidence),
            RawDetectionRepr::Triple(polygon, text, confidence) => (polygon, text, confidence),
        };
        Ok(RawDetection {
            polygon,
            text,
            confidence,
        })
    }
}

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(
        &self,
        image: &RgbImage,
        options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError>;
}

/// Recognizes nothing. Used when no engine is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn recognize(
        &self,
        _image: &RgbImage,
        _options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        warn!("OCR engine disabled; no text will be extracted");
        Ok(Vec::new())
    }
}

/// Replays detections computed ahead of time by an external tool.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedOcr {
    detections: Vec<RawDetection>,
}

impl PrecomputedOcr {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, OcrError> {
        let detections: Vec<RawDetection> =
            serde_json::from_str(raw).map_err(|e| OcrError::InvalidData(e.to_string()))?;
        Ok(Self::new(detections))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, OcrError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OcrError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }
}

impl OcrEngine for PrecomputedOcr {
    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn recognize(
        &self,
        _image: &RgbImage,
        _options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        Ok(self.detections.clone())
    }
}

/// A recognizer that stays on the thread that created it.
#[cfg(any(feature = "ocr", test))]
trait Recognizer {
    fn recognize(
        &mut self,
        image: &RgbImage,
        options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError>;
}

#[cfg(any(feature = "ocr", test))]
type Reply = mpsc::Sender<Result<Vec<RawDetection>, OcrError>>;

#[cfg(any(feature = "ocr", test))]
struct Job {
    image: RgbImage,
    options: OcrOptions,
    reply: Reply,
}

/// Dedicated OCR thread. The recognizer is built and used only on that
/// thread; callers queue jobs and wait for the reply. The thread exits when
/// the worker is dropped.
#[cfg(any(feature = "ocr", test))]
struct OcrWorker {
    jobs: Mutex<mpsc::Sender<Job>>,
}

#[cfg(any(feature = "ocr", test))]
impl OcrWorker {
    fn spawn<R, F>(name: &str, init: F) -> Result<Self, OcrError>
    where
        R: Recognizer + 'static,
        F: FnOnce() -> Result<R, OcrError> + Send + 'static,
    {
        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), OcrError>>();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut recognizer = match init() {
                    Ok(recognizer) => {
                        let _ = ready_tx.send(Ok(()));
                        recognizer
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                for job in queue {
                    let result = recognizer.recognize(&job.image, &job.options);
                    let _ = job.reply.send(result);
                }
                debug!("OCR worker stopped");
            })
            .map_err(|e| OcrError::InitError(format!("failed to start OCR worker: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| OcrError::InitError("OCR worker exited during startup".to_string()))??;
        Ok(Self {
            jobs: Mutex::new(jobs),
        })
    }

    fn recognize(
        &self,
        image: &RgbImage,
        options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        let (reply, answer) = mpsc::channel();
        let job = Job {
            image: image.clone(),
            options: options.clone(),
            reply,
        };
        self.jobs
            .lock()
            .map_err(|_| OcrError::ProcessingError("OCR job queue poisoned".to_string()))?
            .send(job)
            .map_err(|_| OcrError::ProcessingError("OCR worker has stopped".to_string()))?;
        answer
            .recv()
            .map_err(|_| OcrError::ProcessingError("OCR worker dropped the request".to_string()))?
    }
}

/// Tesseract via leptess, running on its own worker thread.
#[cfg(feature = "ocr")]
pub struct TesseractEngine {
    worker: OcrWorker,
}

#[cfg(feature = "ocr")]
struct Tesseract(leptess::LepTess);

#[cfg(feature = "ocr")]
impl Recognizer for Tesseract {
    fn recognize(
        &mut self,
        image: &RgbImage,
        options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        use std::io::Cursor;

        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .map_err(|e| OcrError::ImageLoadError(e.to_string()))?;

        let lt = &mut self.0;
        lt.set_image_from_mem(png.get_ref())
            .map_err(|e| OcrError::ImageLoadError(format!("{:?}", e)))?;

        let level = if options.paragraph {
            leptess::capi::TessPageIteratorLevel_RIL_PARA
        } else {
            leptess::capi::TessPageIteratorLevel_RIL_TEXTLINE
        };

        let Some(boxes) = lt.get_component_boxes(level, true) else {
            return Ok(Vec::new());
        };

        let mut detections = Vec::new();
        for b in &boxes {
            let g = b.get_geometry();
            lt.set_rectangle(g.x, g.y, g.w, g.h);

            let text = lt.get_utf8_text().unwrap_or_default();
            if text.trim().is_empty() {
                continue;
            }

            let (x0, y0) = (g.x as f32, g.y as f32);
            let (x1, y1) = ((g.x + g.w) as f32, (g.y + g.h) as f32);
            detections.push(RawDetection {
                polygon: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
                text,
                confidence: lt.mean_text_conf() as f32 / 100.0,
            });
        }

        Ok(detections)
    }
}

#[cfg(feature = "ocr")]
impl TesseractEngine {
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let language = language.to_string();
        let worker = OcrWorker::spawn("m2c-tesseract", move || {
            leptess::LepTess::new(None, &language)
                .map(Tesseract)
                .map_err(|e| OcrError::InitError(format!("{:?}", e)))
        })?;
        Ok(Self { worker })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(
        &self,
        image: &RgbImage,
        options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        self.worker.recognize(image, options)
    }
}

/// Stub when the `ocr` feature is disabled.
#[cfg(not(feature = "ocr"))]
pub struct TesseractEngine;

#[cfg(not(feature = "ocr"))]
impl TesseractEngine {
    pub fn new(_language: &str) -> Result<Self, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

#[cfg(not(feature = "ocr"))]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(
        &self,
        _image: &RgbImage,
        _options: &OcrOptions,
    ) -> Result<Vec<RawDetection>, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

/// Check if Tesseract is compiled into this build.
#[inline]
pub const fn is_available() -> bool {
    cfg!(feature = "ocr")
}
