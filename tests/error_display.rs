use std::time::Duration;

use m2c_lib::{ErrorCategory, ImageLoadError, M2cError, OcrError};

#[test]
fn config_error_display_includes_message() {
    let err = M2cError::Config("unknown framework: svelte".to_string());

    assert_eq!(
        format!("{}", err),
        "Configuration error: unknown framework: svelte"
    );
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: M2cError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn loader_errors_become_decode_errors() {
    let err: M2cError = ImageLoadError::NotFound("shot.png".to_string()).into();

    assert_eq!(format!("{}", err), "Decode error: File not found: shot.png");
    assert_eq!(err.category(), ErrorCategory::Decode);
}

#[test]
fn ocr_errors_become_recognition_errors() {
    let err: M2cError = OcrError::NotAvailable.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("Text recognition error: "));
    assert!(rendered.contains("Tesseract not available"));
}

#[test]
fn generation_helper_uses_message() {
    let err = M2cError::generation("component 2 references text block 9");

    assert_eq!(
        format!("{}", err),
        "Code generation error: component 2 references text block 9"
    );
}

#[test]
fn timeout_display_names_the_budget() {
    let err = M2cError::Timeout(Duration::from_secs(5));

    assert_eq!(format!("{}", err), "Pipeline timed out after 5s");
    assert_eq!(err.to_payload().category, ErrorCategory::Timeout);
}
