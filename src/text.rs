//! Text extraction: runs the injected OCR engine and turns its raw
//! detections into cleaned [`TextBlock`]s.
//!
//! Rules, applied in order:
//! 1. drop detections below the minimum confidence,
//! 2. clean the string (allow-list, whitespace collapse, trim),
//! 3. drop blocks whose cleaned text is at most one character.
//!
//! Engine ordering is preserved.

use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::Result;
use crate::image_loader::PixelBuffer;
use crate::ocr::{OcrEngine, OcrOptions, RawDetection};
use crate::types::{Point, TextBlock};

/// Punctuation kept by [`clean_text`] besides word characters and whitespace.
pub const UI_PUNCTUATION: &str = "-_@#&*$%+=<>/\\:;,.?!";

pub fn extract_text(
    engine: &dyn OcrEngine,
    buffer: &PixelBuffer,
    config: &OcrConfig,
) -> Result<Vec<TextBlock>> {
    let options = OcrOptions::from(config);
    let raw = engine.recognize(buffer.as_rgb(), &options)?;
    let total = raw.len();
    let blocks = filter_detections(raw, config.min_confidence);
    info!(
        engine = engine.name(),
        raw = total,
        kept = blocks.len(),
        "extracted text blocks"
    );
    Ok(blocks)
}

/// Confidence filter, cleaning and noise removal over raw detections.
pub fn filter_detections(raw: Vec<RawDetection>, min_confidence: f32) -> Vec<TextBlock> {
    raw.into_iter()
        .filter_map(|det| {
            if !det.confidence.is_finite() || det.confidence < min_confidence {
                debug!(text = %det.text, confidence = det.confidence, "below confidence floor");
                return None;
            }
            let text = clean_text(&det.text);
            if text.chars().count() <= 1 {
                return None;
            }
            let polygon = det
                .polygon
                .iter()
                .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
                .collect();
            let block = TextBlock::new(text, polygon, det.confidence.clamp(0.0, 1.0));
            if block.is_none() {
                debug!(text = %det.text, "dropping detection with degenerate polygon");
            }
            block
        })
        .collect()
}

/// Keeps word characters, whitespace and common UI punctuation, collapses
/// whitespace runs to one space and trims. Idempotent.
pub fn clean_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || c.is_whitespace() || UI_PUNCTUATION.contains(c))
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrError, PrecomputedOcr};
    use image::RgbImage;

    fn det(text: &str, confidence: f32) -> RawDetection {
        RawDetection {
            polygon: vec![(10.0, 10.0), (60.0, 10.0), (60.0, 30.0), (10.0, 30.0)],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn clean_text_strips_and_collapses() {
        assert_eq!(clean_text("  Sign   in™ \n now!  "), "Sign in now!");
        assert_eq!(clean_text("user@example.com"), "user@example.com");
        assert_eq!(clean_text("«Save»"), "Save");
        assert_eq!(clean_text("a\u{a0}\u{a0}b"), "a b");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let samples = [
            "",
            "   ",
            "Hello,   World!",
            "«quoted» (paren) [brack] {brace}",
            "tab\tseparated\nlines",
            "émoji 🚀 rocket",
            "path/to\\file: 50% +1 = <2>",
            "__init__ ; #tag & *star* $5 ?",
        ];
        for s in samples {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn low_confidence_and_short_blocks_are_dropped() {
        let blocks = filter_detections(
            vec![det("Submit", 0.95), det("Cancel", 0.5), det(" x ", 0.99), det("«»", 0.9)],
            0.7,
        );
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Submit"]);
    }

    #[test]
    fn non_finite_confidence_is_dropped() {
        let blocks = filter_detections(
            vec![det("Ghost", f32::NAN), det("Inf", f32::INFINITY), det("Real", 0.8)],
            0.7,
        );
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Real"]);
    }

    #[test]
    fn out_of_range_polygon_drops_only_that_block() {
        let huge = RawDetection {
            polygon: vec![(-3e9, 0.0), (3e9, 0.0), (3e9, 10.0), (-3e9, 10.0)],
            text: "Overflow".to_string(),
            confidence: 0.9,
        };
        let blocks = filter_detections(vec![huge, det("Kept", 0.9)], 0.7);
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Kept"]);
    }

    #[test]
    fn bounding_box_follows_polygon_extremes() {
        let raw = RawDetection {
            polygon: vec![(12.4, 40.0), (80.0, 37.6), (82.0, 60.0), (9.6, 61.0)],
            text: "Email".to_string(),
            confidence: 0.9,
        };
        let blocks = filter_detections(vec![raw], 0.7);
        let bbox = blocks[0].bounding_box;
        assert_eq!((bbox.x, bbox.y), (10, 38));
        assert_eq!((bbox.width, bbox.height), (72, 23));
    }

    #[test]
    fn order_of_engine_output_is_preserved() {
        let blocks = filter_detections(
            vec![det("Zeta", 0.9), det("Alpha", 0.9), det("Mid", 0.9)],
            0.7,
        );
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn extract_text_uses_engine_output() {
        let engine = PrecomputedOcr::new(vec![det("Log in", 0.8)]);
        let buffer = PixelBuffer::new(RgbImage::new(100, 50));
        let blocks = extract_text(&engine, &buffer, &OcrConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Log in");
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn recognize(
            &self,
            _image: &RgbImage,
            _options: &OcrOptions,
        ) -> std::result::Result<Vec<RawDetection>, OcrError> {
            Err(OcrError::ProcessingError("model missing".to_string()))
        }
    }

    #[test]
    fn engine_failure_is_a_recognition_error() {
        let buffer = PixelBuffer::new(RgbImage::new(10, 10));
        let err = extract_text(&FailingEngine, &buffer, &OcrConfig::default()).unwrap_err();
        assert!(matches!(err, crate::error::M2cError::Recognition(_)));
    }
}
