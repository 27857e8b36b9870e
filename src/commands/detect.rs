use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use m2c_lib::output::{DetectOutput, M2C_OUTPUT_VERSION};
use m2c_lib::{DisabledOcr, ImageSource, M2cOutput, Pipeline};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{apply_overrides, load_config, FlagSources};

/// Run the detect command.
pub async fn run_detect(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    input: PathBuf,
    max_width: u32,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let output = output.as_deref();
    let config = match load_config(config_path.as_deref())
        .and_then(|cfg| apply_overrides(cfg, max_width, None, &FlagSources::from_args(raw_args)))
    {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let pipeline = match Pipeline::new(config, Arc::new(DisabledOcr)) {
        Ok(p) => p,
        Err(err) => return render_error(err, format, output),
    };

    let detection = match pipeline.detect(ImageSource::from(input.clone())).await {
        Ok(d) => d,
        Err(err) => return render_error(err, format, output),
    };

    let body = M2cOutput::Detect(DetectOutput {
        version: M2C_OUTPUT_VERSION.to_string(),
        input: input.display().to_string(),
        detection,
    });
    if let Err(err) = write_output(&body, format, output) {
        return render_error(err, format, output);
    }
    ExitCode::SUCCESS
}
