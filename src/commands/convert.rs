use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use m2c_lib::output::{ConvertOutput, Summary, M2C_OUTPUT_VERSION};
use m2c_lib::{
    write_bundle, CssMode, DisabledOcr, Framework, ImageSource, M2cError, M2cOutput, OcrEngine,
    Pipeline, PrecomputedOcr, TesseractEngine,
};
use tracing::info;

use crate::cli::{CssModeArg, FrameworkArg, OutputFormat};
use crate::formatting::{render_error, write_output};
use crate::settings::{apply_overrides, format_effective_config, load_config, FlagSources};

/// Run the convert command.
#[allow(clippy::too_many_arguments)]
pub async fn run_convert(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    input: PathBuf,
    framework: FrameworkArg,
    css_mode: CssModeArg,
    ocr_json: Option<PathBuf>,
    tesseract: bool,
    max_width: u32,
    timeout: u64,
    out_dir: Option<PathBuf>,
    include_preview: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let output = output.as_deref();
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let flags = FlagSources::from_args(raw_args);
    let config = match apply_overrides(config, max_width, Some(timeout), &flags) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    if verbose {
        info!("{}", format_effective_config(&config, config_path.as_deref()));
    }

    let engine = match select_engine(ocr_json, tesseract, &config.ocr.language) {
        Ok(engine) => engine,
        Err(err) => return render_error(err, format, output),
    };
    let pipeline = match Pipeline::new(config, engine) {
        Ok(p) => p,
        Err(err) => return render_error(err, format, output),
    };
    info!(
        ocr = pipeline.ocr_engine(),
        matcher = pipeline.matcher_name(),
        "pipeline ready"
    );

    let framework = Framework::from(framework);
    let css_mode = CssMode::from(css_mode);
    let mut result = match pipeline
        .run_checked(ImageSource::from(input.clone()), framework, css_mode)
        .await
    {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output),
    };

    let written_files = match &out_dir {
        Some(dir) => match write_bundle(&result, framework, dir) {
            Ok(files) => files,
            Err(err) => return render_error(err, format, output),
        },
        None => Vec::new(),
    };

    if !include_preview {
        result.preview_image = None;
    }
    let summary = Summary::for_result(&result);
    let body = M2cOutput::Convert(ConvertOutput {
        version: M2C_OUTPUT_VERSION.to_string(),
        input: input.display().to_string(),
        framework,
        css_mode,
        result,
        written_files,
        summary,
    });
    if let Err(err) = write_output(&body, format, output) {
        return render_error(err, format, output);
    }
    ExitCode::SUCCESS
}

/// `--ocr-json` replays saved detections, `--tesseract` runs the engine,
/// otherwise text recognition is disabled.
fn select_engine(
    ocr_json: Option<PathBuf>,
    tesseract: bool,
    language: &str,
) -> Result<Arc<dyn OcrEngine>, M2cError> {
    if let Some(path) = ocr_json {
        let engine = PrecomputedOcr::from_json_file(&path)?;
        return Ok(Arc::new(engine));
    }
    if tesseract {
        let engine = TesseractEngine::new(language)?;
        return Ok(Arc::new(engine));
    }
    Ok(Arc::new(DisabledOcr))
}
