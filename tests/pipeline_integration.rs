use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use m2c_lib::ocr::RawDetection;
use m2c_lib::{
    write_bundle, BruteForceMatcher, ComponentKind, Config, CssMode, DisabledOcr, Framework,
    ImageSource, Pipeline, PipelineResult, PrecomputedOcr,
};

const INK: Rgb<u8> = Rgb([40, 40, 40]);

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    for py in y..y + h {
        for px in x..x + w {
            img.put_pixel(px, py, INK);
        }
    }
}

/// 600x400 form: a button, a wide input and a tall card, none nested.
fn form_mockup() -> RgbImage {
    let mut img = RgbImage::from_pixel(600, 400, Rgb([255, 255, 255]));
    fill(&mut img, 40, 60, 160, 64);
    fill(&mut img, 40, 200, 320, 80);
    fill(&mut img, 400, 60, 180, 260);
    img
}

fn png(img: &RgbImage) -> Vec<u8> {
    m2c_lib::preview::encode_png(img).expect("encode png")
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Vec<(f32, f32)> {
    vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
}

fn form_ocr() -> PrecomputedOcr {
    PrecomputedOcr::new(vec![
        RawDetection {
            polygon: rect(40.0, 10.0, 260.0, 30.0),
            text: "Welcome   back".to_string(),
            confidence: 0.95,
        },
        RawDetection {
            polygon: rect(70.0, 80.0, 90.0, 24.0),
            text: "Sign in".to_string(),
            confidence: 0.91,
        },
        RawDetection {
            polygon: rect(60.0, 225.0, 150.0, 28.0),
            text: "Email address".to_string(),
            confidence: 0.88,
        },
        RawDetection {
            polygon: rect(420.0, 80.0, 80.0, 24.0),
            text: "Profile".to_string(),
            confidence: 0.9,
        },
        RawDetection {
            polygon: rect(420.0, 150.0, 80.0, 24.0),
            text: "smudge".to_string(),
            confidence: 0.3,
        },
    ])
}

fn texts_by_kind(result: &PipelineResult) -> HashMap<ComponentKind, String> {
    result
        .components
        .iter()
        .map(|c| (c.kind, c.text.clone()))
        .collect()
}

async fn convert(pipeline: &Pipeline, framework: Framework, css_mode: CssMode) -> PipelineResult {
    pipeline
        .run(ImageSource::from(png(&form_mockup())), framework, css_mode)
        .await
}

#[tokio::test]
async fn form_mockup_converts_with_matched_text() {
    let pipeline = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");
    let result = convert(&pipeline, Framework::Plain, CssMode::External).await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.components.len(), 3);

    let texts = texts_by_kind(&result);
    assert_eq!(texts.get(&ComponentKind::Button).map(String::as_str), Some("Sign in"));
    assert_eq!(texts.get(&ComponentKind::Input).map(String::as_str), Some("Email address"));
    assert_eq!(texts.get(&ComponentKind::Container).map(String::as_str), Some("Profile"));

    // Low-confidence "smudge" is dropped; "Welcome back" is cleaned and orphaned.
    assert_eq!(result.text_blocks.len(), 4);
    let orphans: Vec<&str> = result
        .orphan_text_blocks()
        .iter()
        .map(|b| b.text.as_str())
        .collect();
    assert_eq!(orphans, vec!["Welcome back"]);

    assert!(result.markup.contains(">Sign in</button>"));
    assert!(result.markup.contains("placeholder=\"Email address\""));
    assert!(result.markup.contains("<p>Profile</p>"));
    assert!(result.markup.contains("<span class=\"text-0\">Welcome back</span>"));
    assert!(result.stylesheet.contains(".text-0 {"));
    assert!(result.script.contains("DOMContentLoaded"));
    assert!(result.preview_image.is_some());

    for component in &result.components {
        assert!(component
            .bounding_box
            .fits_within(result.width, result.height));
    }
}

#[tokio::test]
async fn react_variant_shares_the_element_tree() {
    let pipeline = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");
    let plain = convert(&pipeline, Framework::Plain, CssMode::External).await;
    let react = convert(&pipeline, Framework::ReactLike, CssMode::External).await;

    assert!(react.success);
    assert_eq!(plain.components, react.components);
    assert_eq!(plain.stylesheet, react.stylesheet);
    assert!(react.script.is_empty());
    assert!(react.markup.contains("export default function GeneratedUI()"));
    assert!(react.markup.contains("import './styles.css';"));
    assert!(react.markup.contains("className=\"text-0\""));
}

#[tokio::test]
async fn brute_force_agrees_on_non_nested_layouts() {
    let indexed = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");
    let brute = indexed.clone().with_matcher(Arc::new(BruteForceMatcher));

    let a = convert(&indexed, Framework::Plain, CssMode::External).await;
    let b = convert(&brute, Framework::Plain, CssMode::External).await;
    assert_eq!(texts_by_kind(&a), texts_by_kind(&b));
}

#[tokio::test]
async fn concurrent_runs_share_one_engine_and_agree() {
    let pipeline = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            convert(&pipeline, Framework::ReactLike, CssMode::Inline).await
        }));
    }

    let mut markups = Vec::new();
    for handle in handles {
        let result = handle.await.expect("task joined");
        assert!(result.success);
        markups.push(result.markup);
    }
    assert!(markups.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn wide_images_are_downscaled_before_processing() {
    let wide = RgbImage::from_pixel(1600, 400, Rgb([255, 255, 255]));
    let pipeline = Pipeline::new(Config::default(), Arc::new(DisabledOcr)).expect("pipeline");
    let result = pipeline
        .run(ImageSource::from(png(&wide)), Framework::Plain, CssMode::External)
        .await;
    assert!(result.success);
    assert_eq!((result.width, result.height), (800, 200));

    let mut config = Config::default();
    config.loader.max_width = 0;
    let pipeline = Pipeline::new(config, Arc::new(DisabledOcr)).expect("pipeline");
    let result = pipeline
        .run(ImageSource::from(png(&wide)), Framework::Plain, CssMode::External)
        .await;
    assert_eq!((result.width, result.height), (1600, 400));
}

#[tokio::test]
async fn missing_file_is_a_labeled_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = Pipeline::new(Config::default(), Arc::new(DisabledOcr)).expect("pipeline");
    let result = pipeline
        .run(
            ImageSource::from(dir.path().join("nope.png")),
            Framework::Plain,
            CssMode::External,
        )
        .await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("Decode error"));
    assert!(result.markup.starts_with("<!--"));
    assert!(result.components.is_empty() && result.text_blocks.is_empty());
}

#[tokio::test]
async fn file_sources_match_byte_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("form.png");
    form_mockup().save(&path).expect("save mockup");

    let pipeline = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");
    let from_file = pipeline
        .run(ImageSource::from(path), Framework::Plain, CssMode::Inline)
        .await;
    let from_bytes = convert(&pipeline, Framework::Plain, CssMode::Inline).await;
    assert_eq!(from_file.markup, from_bytes.markup);
    assert!(from_file.stylesheet.is_empty());
    assert!(from_file.script.is_empty());
}

#[tokio::test]
async fn export_bundle_round_trips_to_disk() {
    let pipeline = Pipeline::new(Config::default(), Arc::new(form_ocr())).expect("pipeline");
    let result = convert(&pipeline, Framework::Plain, CssMode::External).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let written = write_bundle(&result, Framework::Plain, dir.path()).expect("export");
    assert_eq!(written.len(), 4);

    let html = std::fs::read_to_string(dir.path().join("index.html")).expect("index.html");
    assert_eq!(html, result.markup);
    let css = std::fs::read_to_string(dir.path().join("styles.css")).expect("styles.css");
    assert_eq!(css, result.stylesheet);
    let preview = image::open(dir.path().join("preview.png")).expect("preview.png");
    assert_eq!(preview.width(), 600);
}
