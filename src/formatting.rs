use std::fmt::Write as FmtWrite;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use m2c_lib::output::M2C_OUTPUT_VERSION;
use m2c_lib::{ComponentKind, ErrorOutput, M2cError, M2cOutput, RegionVerdict};

use crate::cli::OutputFormat;

/// Exit status of every run that ends in an `error` document.
const FATAL_EXIT: u8 = 2;

/// Concrete layout of a document once its destination is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    CompactJson,
    IndentedJson,
    Human,
}

impl Layout {
    /// `pretty` only becomes human text on an interactive stdout; files and
    /// pipes keep the JSON shape.
    fn resolve(format: OutputFormat, to_file: bool, stdout_is_tty: bool) -> Self {
        match format {
            OutputFormat::Json => Layout::CompactJson,
            OutputFormat::Pretty if !to_file && stdout_is_tty => Layout::Human,
            OutputFormat::Pretty => Layout::IndentedJson,
        }
    }

    fn render(self, body: &M2cOutput) -> Result<String, M2cError> {
        Ok(match self {
            Layout::CompactJson => serde_json::to_string(body)?,
            Layout::IndentedJson => serde_json::to_string_pretty(body)?,
            Layout::Human => format_pretty(body, true),
        })
    }
}

/// Writes a document to `output`, or stdout when `None`.
pub fn write_output(
    body: &M2cOutput,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), M2cError> {
    let layout = Layout::resolve(format, output.is_some(), std::io::stdout().is_terminal());
    let content = layout.render(body)?;
    match output {
        Some(path) => std::fs::write(path, content)?,
        None => println!("{content}"),
    }
    Ok(())
}

/// The `error` document for a failed command.
pub fn error_document(err: &M2cError) -> M2cOutput {
    let payload = err.to_payload();
    M2cOutput::Error(ErrorOutput {
        version: M2C_OUTPUT_VERSION.to_string(),
        message: Some(payload.message.clone()),
        error: payload,
    })
}

/// Reports `err` and returns the fatal exit code. An unwritable `output`
/// falls back to stdout so the error document is never lost.
pub fn render_error(err: M2cError, format: OutputFormat, output: Option<&Path>) -> ExitCode {
    let body = error_document(&err);
    if let Err(write_err) = write_output(&body, format, output) {
        eprintln!("Failed to write error output: {write_err}");
        if output.is_some() {
            if let Err(write_err) = write_output(&body, format, None) {
                eprintln!("Failed to write error output: {write_err}");
            }
        }
    }
    ExitCode::from(FATAL_EXIT)
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &M2cOutput, colorize: bool) -> String {
    match body {
        M2cOutput::Convert(out) => {
            let mut buf = String::new();
            let result = &out.result;
            let header = paint("[CONVERT]", "36", colorize);
            let status = if result.success {
                paint("OK", "32", colorize)
            } else {
                paint("FAILED", "31", colorize)
            };
            writeln!(
                buf,
                "{header} {status} {} -> {} ({} css)",
                out.input, out.framework, out.css_mode
            )
            .ok();
            writeln!(
                buf,
                "Image: {}x{}, contours: {}",
                result.width, result.height, result.contour_count
            )
            .ok();

            let count = |kind: ComponentKind| {
                result
                    .components
                    .iter()
                    .filter(|c| c.kind == kind)
                    .count()
            };
            writeln!(
                buf,
                "Components: {} (buttons {}, inputs {}, containers {})",
                result.components.len(),
                count(ComponentKind::Button),
                count(ComponentKind::Input),
                count(ComponentKind::Container)
            )
            .ok();
            writeln!(
                buf,
                "Text blocks: {} ({} standalone)",
                result.text_blocks.len(),
                result.orphan_text_blocks().len()
            )
            .ok();
            for (i, c) in result.components.iter().enumerate() {
                let b = c.bounding_box;
                let label = if c.text.is_empty() { "-" } else { c.text.as_str() };
                writeln!(
                    buf,
                    "- #{i:<3} {:10} {}x{} at ({}, {})  {label}",
                    c.kind.to_string(),
                    b.width,
                    b.height,
                    b.x,
                    b.y
                )
                .ok();
            }
            if let Some(err) = &result.error {
                writeln!(buf, "Error: {err}").ok();
            }
            if let Some(summary) = &out.summary {
                if !summary.notes.is_empty() {
                    writeln!(buf, "Notes:").ok();
                    for note in &summary.notes {
                        writeln!(buf, "- {note}").ok();
                    }
                }
            }
            if !out.written_files.is_empty() {
                writeln!(buf, "Files:").ok();
                for path in &out.written_files {
                    writeln!(buf, "- {}", path.display()).ok();
                }
            }
            buf
        }
        M2cOutput::Detect(out) => {
            let mut buf = String::new();
            let detection = &out.detection;
            let header = paint("[DETECT]", "34", colorize);
            writeln!(
                buf,
                "{header} {} ({}x{}), {} contours, {} regions",
                out.input,
                detection.width,
                detection.height,
                detection.report.contour_count,
                detection.report.regions.len()
            )
            .ok();
            for region in &detection.report.regions {
                let b = region.bounding_box;
                let f = region.features;
                let verdict = match region.verdict {
                    RegionVerdict::Classified(kind) => paint(&kind.to_string(), "32", colorize),
                    RegionVerdict::BelowMinArea => "below-min-area".to_string(),
                    RegionVerdict::Sliver => "sliver".to_string(),
                    RegionVerdict::Unmatched => paint("unmatched", "33", colorize),
                };
                writeln!(
                    buf,
                    "- {}x{} at ({}, {})  area {:.0}, aspect {:.2}, solidity {:.2}  {verdict}",
                    b.width, b.height, b.x, b.y, f.area, f.aspect_ratio, f.solidity
                )
                .ok();
            }
            buf
        }
        M2cOutput::Error(out) => {
            let mut buf = String::new();
            let header = paint("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Wraps `text` in an ANSI SGR sequence when `enabled`.
fn paint(text: &str, sgr: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{sgr}m{text}\x1b[0m")
    } else {
        text.to_owned()
    }
}
