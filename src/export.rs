//! Writes the generated artifacts of a successful run to a directory.
//!
//! | framework  | files                                              |
//! |------------|----------------------------------------------------|
//! | plain      | `index.html`, `styles.css`*, `script.js`*          |
//! | react-like | `App.jsx`, `styles.css`*                           |
//!
//! `*` only in external mode; inline markup embeds them. `preview.png` is added whenever
//! the result carries a preview.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::codegen::Framework;
use crate::error::{M2cError, Result};
use crate::preview;
use crate::types::PipelineResult;

pub fn write_bundle(result: &PipelineResult, framework: Framework, dir: &Path) -> Result<Vec<PathBuf>> {
    if !result.success {
        return Err(M2cError::Config(format!(
            "cannot export a failed conversion: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )));
    }
    std::fs::create_dir_all(dir)?;

    let markup_name = match framework {
        Framework::Plain => "index.html",
        Framework::ReactLike => "App.jsx",
    };
    let mut files: Vec<(&str, Vec<u8>)> = vec![(markup_name, result.markup.clone().into_bytes())];
    if !result.stylesheet.is_empty() {
        files.push(("styles.css", result.stylesheet.clone().into_bytes()));
    }
    if !result.script.is_empty() {
        files.push(("script.js", result.script.clone().into_bytes()));
    }
    if let Some(uri) = &result.preview_image {
        let png = preview::decode_data_uri(uri)
            .ok_or_else(|| M2cError::generation("preview image is not a base64 PNG data URI"))?;
        files.push(("preview.png", png));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        std::fs::write(&path, contents)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "wrote export bundle");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{generate, CssMode};

    fn result_for(framework: Framework, css_mode: CssMode) -> PipelineResult {
        let code = generate(&[], &[], framework, css_mode).unwrap();
        let mut result = PipelineResult::failure("unused");
        result.success = true;
        result.error = None;
        result.markup = code.markup;
        result.stylesheet = code.stylesheet;
        result.script = code.script;
        result
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn plain_external_bundle_has_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_bundle(
            &result_for(Framework::Plain, CssMode::External),
            Framework::Plain,
            dir.path(),
        )
        .unwrap();
        assert_eq!(names(&written), vec!["index.html", "styles.css", "script.js"]);
        let html = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(html.contains("styles.css"));
    }

    #[test]
    fn plain_inline_bundle_is_a_single_document() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_bundle(
            &result_for(Framework::Plain, CssMode::Inline),
            Framework::Plain,
            dir.path(),
        )
        .unwrap();
        assert_eq!(names(&written), vec!["index.html"]);
        let html = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(html.contains("<script>"));
        assert!(!html.contains("script.js"));
        assert!(!dir.path().join("script.js").exists());
    }

    #[test]
    fn react_inline_bundle_is_a_single_component_file() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_bundle(
            &result_for(Framework::ReactLike, CssMode::Inline),
            Framework::ReactLike,
            dir.path().join("nested").as_path(),
        )
        .unwrap();
        assert_eq!(names(&written), vec!["App.jsx"]);
    }

    #[test]
    fn preview_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = result_for(Framework::Plain, CssMode::External);
        let img = image::RgbImage::new(4, 4);
        result.preview_image = Some(preview::to_data_uri(&preview::encode_png(&img).unwrap()));
        let written = write_bundle(&result, Framework::Plain, dir.path()).unwrap();
        assert!(names(&written).contains(&"preview.png".to_string()));
        assert!(image::open(dir.path().join("preview.png")).is_ok());
    }

    #[test]
    fn failed_result_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_bundle(
            &PipelineResult::failure("Decode error: bad"),
            Framework::Plain,
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Decode error: bad"));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
