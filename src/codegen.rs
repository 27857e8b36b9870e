//! Template-based code generation.
//!
//! Output is a pure function of the matched components and text blocks:
//! elements are emitted in detection order, orphan text blocks follow in
//! extraction order, and nothing time- or environment-dependent is embedded.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{M2cError, Result};
use crate::types::{orphan_blocks, BoundingBox, Component, ComponentKind, TextBlock};

/// Label used for buttons that received no text.
pub const DEFAULT_BUTTON_LABEL: &str = "Button";
/// Lower bound for orphan text font size, in px.
pub const MIN_FONT_SIZE_PX: i32 = 12;
/// Orphan font size as a fraction of the block height.
pub const FONT_HEIGHT_RATIO: f64 = 0.7;

const PRIMARY_COLOR: &str = "#007bff";
const ON_PRIMARY_COLOR: &str = "#ffffff";
const BORDER_COLOR: &str = "#dddddd";
const SURFACE_COLOR: &str = "#ffffff";
const TEXT_COLOR: &str = "#212529";
const RADIUS_PX: i32 = 4;
const INPUT_PADDING_PX: i32 = 8;
const CARD_RADIUS_PX: i32 = 8;
const CARD_PADDING_PX: i32 = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    /// Standalone HTML document plus a DOM-ready behavior script.
    #[default]
    Plain,
    /// A single function component; no behavior script.
    ReactLike,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Framework::Plain => "plain",
            Framework::ReactLike => "react-like",
        })
    }
}

impl FromStr for Framework {
    type Err = M2cError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "vanilla" | "html" => Ok(Framework::Plain),
            "react" | "react-like" | "jsx" => Ok(Framework::ReactLike),
            other => Err(M2cError::Config(format!(
                "Unsupported framework '{other}'; supported: plain, react-like"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CssMode {
    /// Stylesheet returned separately and linked from the markup.
    #[default]
    External,
    /// Stylesheet embedded in the markup; the returned stylesheet is empty.
    Inline,
}

impl fmt::Display for CssMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CssMode::External => "external",
            CssMode::Inline => "inline",
        })
    }
}

impl FromStr for CssMode {
    type Err = M2cError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external" => Ok(CssMode::External),
            "inline" => Ok(CssMode::Inline),
            other => Err(M2cError::Config(format!(
                "Unsupported css mode '{other}'; supported: external, inline"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub markup: String,
    pub stylesheet: String,
    pub script: String,
}

/// One element of the generated tree, independent of framework.
enum Element<'a> {
    Component {
        class: String,
        component: &'a Component,
    },
    Text {
        class: String,
        block: &'a TextBlock,
    },
}

impl Element<'_> {
    fn class(&self) -> &str {
        match self {
            Element::Component { class, .. } | Element::Text { class, .. } => class,
        }
    }
}

pub fn generate(
    components: &[Component],
    text_blocks: &[TextBlock],
    framework: Framework,
    css_mode: CssMode,
) -> Result<GeneratedCode> {
    for (i, component) in components.iter().enumerate() {
        if let Some(idx) = component.text_block {
            if idx >= text_blocks.len() {
                return Err(M2cError::generation(format!(
                    "component {i} references text block {idx}, but only {} were extracted",
                    text_blocks.len()
                )));
            }
        }
    }

    let elements = element_tree(components, text_blocks);
    let css = stylesheet(&elements).map_err(format_failure)?;

    let (markup, script) = match framework {
        Framework::Plain => {
            let script = click_logging_script();
            let markup = plain_document(&elements, &css, &script, css_mode).map_err(format_failure)?;
            (markup, script)
        }
        Framework::ReactLike => {
            let markup = react_component(&elements, &css, css_mode).map_err(format_failure)?;
            (markup, String::new())
        }
    };

    debug!(
        %framework,
        %css_mode,
        elements = elements.len(),
        markup_bytes = markup.len(),
        "generated code"
    );

    // Inline output carries everything in the markup.
    let (stylesheet, script) = match css_mode {
        CssMode::External => (css, script),
        CssMode::Inline => (String::new(), String::new()),
    };
    Ok(GeneratedCode {
        markup,
        stylesheet,
        script,
    })
}

fn format_failure(_: fmt::Error) -> M2cError {
    M2cError::generation("failed to format generated code")
}

fn element_tree<'a>(components: &'a [Component], text_blocks: &'a [TextBlock]) -> Vec<Element<'a>> {
    let mut elements: Vec<Element<'a>> = components
        .iter()
        .enumerate()
        .map(|(i, component)| Element::Component {
            class: format!("{}-{i}", component.kind.class_prefix()),
            component,
        })
        .collect();

    let orphans = orphan_blocks(components, text_blocks);
    elements.extend(
        orphans
            .into_iter()
            .enumerate()
            .map(|(j, block)| Element::Text {
                class: format!("text-{j}"),
                block,
            }),
    );
    elements
}

/// `max(12, round(height * 0.7))`.
pub fn orphan_font_size(height: i32) -> i32 {
    let scaled = (f64::from(height.max(0)) * FONT_HEIGHT_RATIO).round() as i32;
    scaled.max(MIN_FONT_SIZE_PX)
}

fn stylesheet(elements: &[Element<'_>]) -> std::result::Result<String, fmt::Error> {
    let mut css = String::new();
    writeln!(css, ":root {{")?;
    writeln!(css, "  --m2c-primary: {PRIMARY_COLOR};")?;
    writeln!(css, "  --m2c-on-primary: {ON_PRIMARY_COLOR};")?;
    writeln!(css, "  --m2c-border: {BORDER_COLOR};")?;
    writeln!(css, "  --m2c-surface: {SURFACE_COLOR};")?;
    writeln!(css, "  --m2c-text: {TEXT_COLOR};")?;
    writeln!(css, "  --m2c-radius: {RADIUS_PX}px;")?;
    writeln!(css, "}}")?;
    writeln!(css)?;
    writeln!(css, "*, *::before, *::after {{")?;
    writeln!(css, "  box-sizing: border-box;")?;
    writeln!(css, "}}")?;
    writeln!(css)?;
    writeln!(css, "body {{")?;
    writeln!(css, "  margin: 0;")?;
    writeln!(
        css,
        "  font-family: -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, sans-serif;"
    )?;
    writeln!(css, "  color: var(--m2c-text);")?;
    writeln!(css, "}}")?;
    writeln!(css)?;
    writeln!(css, ".m2c-root {{")?;
    writeln!(css, "  position: relative;")?;
    writeln!(css, "  min-height: 100vh;")?;
    writeln!(css, "}}")?;

    for element in elements {
        writeln!(css)?;
        writeln!(css, ".{} {{", element.class())?;
        match element {
            Element::Component { component, .. } => {
                position_rules(&mut css, &component.bounding_box, true)?;
                variant_rules(&mut css, component.kind)?;
            }
            Element::Text { block, .. } => {
                position_rules(&mut css, &block.bounding_box, false)?;
                writeln!(
                    css,
                    "  font-size: {}px;",
                    orphan_font_size(block.bounding_box.height)
                )?;
                writeln!(css, "  line-height: 1.2;")?;
                writeln!(css, "  white-space: nowrap;")?;
            }
        }
        writeln!(css, "}}")?;
    }
    Ok(css)
}

fn position_rules(
    css: &mut String,
    bbox: &BoundingBox,
    sized: bool,
) -> std::result::Result<(), fmt::Error> {
    writeln!(css, "  position: absolute;")?;
    writeln!(css, "  left: {}px;", bbox.x)?;
    writeln!(css, "  top: {}px;", bbox.y)?;
    if sized {
        writeln!(css, "  width: {}px;", bbox.width.max(0))?;
        writeln!(css, "  height: {}px;", bbox.height.max(0))?;
    }
    Ok(())
}

fn variant_rules(css: &mut String, kind: ComponentKind) -> std::result::Result<(), fmt::Error> {
    match kind {
        ComponentKind::Button => {
            writeln!(css, "  background: var(--m2c-primary);")?;
            writeln!(css, "  color: var(--m2c-on-primary);")?;
            writeln!(css, "  border: none;")?;
            writeln!(css, "  border-radius: var(--m2c-radius);")?;
            writeln!(css, "  font-size: 14px;")?;
            writeln!(css, "  cursor: pointer;")?;
        }
        ComponentKind::Input => {
            writeln!(css, "  padding: {INPUT_PADDING_PX}px;")?;
            writeln!(css, "  border: 1px solid var(--m2c-border);")?;
            writeln!(css, "  border-radius: var(--m2c-radius);")?;
            writeln!(css, "  font-size: 14px;")?;
        }
        ComponentKind::Container => {
            writeln!(css, "  padding: {CARD_PADDING_PX}px;")?;
            writeln!(css, "  background: var(--m2c-surface);")?;
            writeln!(css, "  border: 1px solid var(--m2c-border);")?;
            writeln!(css, "  border-radius: {CARD_RADIUS_PX}px;")?;
            writeln!(css, "  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);")?;
        }
    }
    Ok(())
}

fn click_logging_script() -> String {
    [
        "document.addEventListener('DOMContentLoaded', () => {",
        "  document.querySelectorAll('[data-m2c-clickable]').forEach((el) => {",
        "    el.addEventListener('click', () => {",
        "      console.log('m2c: clicked', el.className, el.textContent.trim());",
        "    });",
        "  });",
        "});",
        "",
    ]
    .join("\n")
}

fn plain_document(
    elements: &[Element<'_>],
    css: &str,
    script: &str,
    css_mode: CssMode,
) -> std::result::Result<String, fmt::Error> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "  <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(html, "  <title>Generated UI</title>")?;
    match css_mode {
        CssMode::External => writeln!(html, "  <link rel=\"stylesheet\" href=\"styles.css\">")?,
        CssMode::Inline => {
            writeln!(html, "  <style>")?;
            html.push_str(css);
            writeln!(html, "  </style>")?;
        }
    }
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "  <div class=\"m2c-root\">")?;
    for element in elements {
        html.push_str("    ");
        html.push_str(&element_markup(element, Dialect::Html));
        html.push('\n');
    }
    writeln!(html, "  </div>")?;
    match css_mode {
        CssMode::External => writeln!(html, "  <script src=\"script.js\"></script>")?,
        CssMode::Inline => {
            writeln!(html, "  <script>")?;
            html.push_str(script);
            writeln!(html, "  </script>")?;
        }
    }
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

fn react_component(
    elements: &[Element<'_>],
    css: &str,
    css_mode: CssMode,
) -> std::result::Result<String, fmt::Error> {
    let mut jsx = String::new();
    writeln!(jsx, "import React from 'react';")?;
    match css_mode {
        CssMode::External => writeln!(jsx, "import './styles.css';")?,
        CssMode::Inline => {
            writeln!(jsx)?;
            writeln!(jsx, "const styles = `")?;
            jsx.push_str(&css.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${"));
            writeln!(jsx, "`;")?;
        }
    }
    writeln!(jsx)?;
    writeln!(jsx, "export default function GeneratedUI() {{")?;
    writeln!(jsx, "  return (")?;

    let indent = match css_mode {
        CssMode::External => "    ",
        CssMode::Inline => {
            writeln!(jsx, "    <>")?;
            writeln!(jsx, "      <style>{{styles}}</style>")?;
            "      "
        }
    };
    writeln!(jsx, "{indent}<div className=\"m2c-root\">")?;
    for element in elements {
        writeln!(jsx, "{indent}  {}", element_markup(element, Dialect::Jsx))?;
    }
    writeln!(jsx, "{indent}</div>")?;
    if css_mode == CssMode::Inline {
        writeln!(jsx, "    </>")?;
    }

    writeln!(jsx, "  );")?;
    writeln!(jsx, "}}")?;
    Ok(jsx)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Html,
    Jsx,
}

impl Dialect {
    fn class_attr(self) -> &'static str {
        match self {
            Dialect::Html => "class",
            Dialect::Jsx => "className",
        }
    }

    fn void_close(self) -> &'static str {
        match self {
            Dialect::Html => ">",
            Dialect::Jsx => " />",
        }
    }

    fn comment(self, text: &str) -> String {
        match self {
            Dialect::Html => format!("<!-- {text} -->"),
            Dialect::Jsx => format!("{{/* {text} */}}"),
        }
    }

    fn escape(self, raw: &str) -> String {
        let mut out = escape_html(raw);
        if self == Dialect::Jsx {
            out = out.replace('{', "&#123;").replace('}', "&#125;");
        }
        out
    }
}

fn element_markup(element: &Element<'_>, dialect: Dialect) -> String {
    let class_attr = dialect.class_attr();
    match element {
        Element::Component { class, component } => match component.kind {
            ComponentKind::Button => {
                let label = if component.text.is_empty() {
                    DEFAULT_BUTTON_LABEL
                } else {
                    component.text.as_str()
                };
                format!(
                    "<button type=\"button\" {class_attr}=\"{class}\" data-m2c-clickable=\"true\">{}</button>",
                    dialect.escape(label)
                )
            }
            ComponentKind::Input => {
                let label = if component.text.is_empty() {
                    String::new()
                } else {
                    let text = dialect.escape(&component.text);
                    format!(" placeholder=\"{text}\" aria-label=\"{text}\"")
                };
                format!(
                    "<input type=\"text\" {class_attr}=\"{class}\"{label}{}",
                    dialect.void_close()
                )
            }
            ComponentKind::Container => {
                let body = if component.text.is_empty() {
                    dialect.comment("container")
                } else {
                    format!("<p>{}</p>", dialect.escape(&component.text))
                };
                format!("<div {class_attr}=\"{class}\">{body}</div>")
            }
        },
        Element::Text { class, block } => {
            format!(
                "<span {class_attr}=\"{class}\">{}</span>",
                dialect.escape(&block.text)
            )
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn button() -> Component {
        Component::new(ComponentKind::Button, BoundingBox::new(100, 110, 200, 80))
    }

    fn block(text: &str, x: i32, y: i32, w: i32, h: i32) -> TextBlock {
        TextBlock::new(
            text,
            vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ],
            0.9,
        )
        .expect("valid block")
    }

    #[test]
    fn empty_input_yields_boilerplate_only() {
        let code = generate(&[], &[], Framework::Plain, CssMode::External).unwrap();
        assert!(code.markup.starts_with("<!DOCTYPE html>"));
        assert!(code.markup.contains("<link rel=\"stylesheet\" href=\"styles.css\">"));
        assert!(code.markup.contains("<div class=\"m2c-root\">\n  </div>"));
        assert!(!code.markup.contains("<button"));
        assert!(!code.stylesheet.contains(".btn-"));
        assert!(code.stylesheet.contains("--m2c-primary: #007bff;"));
    }

    #[test]
    fn react_wraps_single_button_and_has_no_script() {
        let components = vec![button()];
        let code = generate(&components, &[], Framework::ReactLike, CssMode::External).unwrap();
        assert!(code.markup.contains("export default function GeneratedUI() {"));
        assert!(code.markup.contains("return ("));
        assert!(code.markup.contains("className=\"btn-0\""));
        assert!(code.script.is_empty());
    }

    #[test]
    fn plain_single_button_has_click_logging_script() {
        let components = vec![button()];
        let code = generate(&components, &[], Framework::Plain, CssMode::External).unwrap();
        assert!(!code.script.is_empty());
        assert!(code.script.contains("DOMContentLoaded"));
        assert!(code.script.contains("console.log"));
        assert!(code
            .markup
            .contains("<button type=\"button\" class=\"btn-0\" data-m2c-clickable=\"true\">Button</button>"));
    }

    #[test]
    fn component_rules_carry_absolute_geometry() {
        let components = vec![button()];
        let code = generate(&components, &[], Framework::Plain, CssMode::External).unwrap();
        let rule = code
            .stylesheet
            .split(".btn-0 {")
            .nth(1)
            .expect("btn-0 rule present");
        assert!(rule.contains("position: absolute;"));
        assert!(rule.contains("left: 100px;"));
        assert!(rule.contains("top: 110px;"));
        assert!(rule.contains("width: 200px;"));
        assert!(rule.contains("height: 80px;"));
    }

    #[test]
    fn negative_sizes_are_clamped() {
        let components = vec![Component::new(
            ComponentKind::Container,
            BoundingBox::new(5, 5, -10, -3),
        )];
        let code = generate(&components, &[], Framework::Plain, CssMode::External).unwrap();
        assert!(code.stylesheet.contains("width: 0px;"));
        assert!(code.stylesheet.contains("height: 0px;"));
        assert!(!code.stylesheet.contains("-10px"));
    }

    #[test]
    fn class_names_follow_detection_index() {
        let components = vec![
            Component::new(ComponentKind::Container, BoundingBox::new(0, 0, 300, 200)),
            Component::new(ComponentKind::Input, BoundingBox::new(10, 10, 200, 30)),
            button(),
        ];
        let code = generate(&components, &[], Framework::Plain, CssMode::External).unwrap();
        let card = code.markup.find("card-0").unwrap();
        let input = code.markup.find("input-1").unwrap();
        let btn = code.markup.find("btn-2").unwrap();
        assert!(card < input && input < btn);
    }

    #[test]
    fn matched_text_labels_components() {
        let blocks = vec![block("Email", 20, 15, 60, 20), block("Sign <in>", 150, 130, 80, 25)];
        let components = vec![
            Component::new(ComponentKind::Input, BoundingBox::new(10, 10, 200, 30)).with_text("Email", 0),
            button().with_text("Sign <in>", 1),
            Component::new(ComponentKind::Input, BoundingBox::new(10, 60, 200, 30)),
        ];
        let code = generate(&components, &blocks, Framework::Plain, CssMode::External).unwrap();
        assert!(code
            .markup
            .contains("<input type=\"text\" class=\"input-0\" placeholder=\"Email\" aria-label=\"Email\">"));
        assert!(code.markup.contains(">Sign &lt;in&gt;</button>"));
        assert!(code.markup.contains("<input type=\"text\" class=\"input-2\">"));
        assert!(!code.markup.contains("text-0"));
    }

    #[test]
    fn orphan_text_is_positioned_with_scaled_font() {
        let blocks = vec![block("Welcome back", 40, 20, 180, 30)];
        let code = generate(&[], &blocks, Framework::Plain, CssMode::External).unwrap();
        assert!(code.markup.contains("<span class=\"text-0\">Welcome back</span>"));
        let rule = code.stylesheet.split(".text-0 {").nth(1).unwrap();
        assert!(rule.contains("left: 40px;"));
        assert!(rule.contains("top: 20px;"));
        assert!(rule.contains("font-size: 21px;"));
    }

    #[test]
    fn orphan_font_size_has_floor() {
        assert_eq!(orphan_font_size(10), 12);
        assert_eq!(orphan_font_size(0), 12);
        assert_eq!(orphan_font_size(30), 21);
        assert_eq!(orphan_font_size(45), 32);
    }

    #[test]
    fn inline_mode_embeds_styles_and_empties_stylesheet() {
        let components = vec![button()];
        let plain = generate(&components, &[], Framework::Plain, CssMode::Inline).unwrap();
        assert!(plain.stylesheet.is_empty());
        assert!(plain.script.is_empty());
        assert!(plain.markup.contains("<style>"));
        assert!(plain.markup.contains("DOMContentLoaded"));
        assert!(!plain.markup.contains("script.js"));
        assert!(plain.markup.contains(".btn-0 {"));
        assert!(!plain.markup.contains("styles.css"));

        let react = generate(&components, &[], Framework::ReactLike, CssMode::Inline).unwrap();
        assert!(react.stylesheet.is_empty());
        assert!(react.markup.contains("const styles = `"));
        assert!(react.markup.contains("<style>{styles}</style>"));
        assert!(!react.markup.contains("import './styles.css';"));
    }

    #[test]
    fn generation_is_deterministic() {
        let blocks = vec![block("Hello", 10, 10, 50, 20), block("World", 300, 300, 50, 20)];
        let components = vec![button().with_text("Hello", 0)];
        for framework in [Framework::Plain, Framework::ReactLike] {
            for css_mode in [CssMode::External, CssMode::Inline] {
                let a = generate(&components, &blocks, framework, css_mode).unwrap();
                let b = generate(&components, &blocks, framework, css_mode).unwrap();
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn jsx_escapes_braces() {
        let blocks = vec![block("{name}", 10, 10, 60, 20)];
        let code = generate(&[], &blocks, Framework::ReactLike, CssMode::External).unwrap();
        assert!(code.markup.contains("&#123;name&#125;"));
    }

    #[test]
    fn dangling_text_reference_is_a_generation_error() {
        let components = vec![button().with_text("Ghost", 3)];
        let err = generate(&components, &[], Framework::Plain, CssMode::External).unwrap_err();
        assert!(matches!(err, M2cError::Generation(_)));
    }

    #[test]
    fn framework_and_css_mode_parse_aliases() {
        assert_eq!("vanilla".parse::<Framework>().unwrap(), Framework::Plain);
        assert_eq!("React".parse::<Framework>().unwrap(), Framework::ReactLike);
        assert_eq!("react-like".parse::<Framework>().unwrap(), Framework::ReactLike);
        assert_eq!("INLINE".parse::<CssMode>().unwrap(), CssMode::Inline);
        assert!("vue".parse::<Framework>().is_err());
        assert!(matches!(
            "scoped".parse::<CssMode>(),
            Err(M2cError::Config(msg)) if msg.contains("css")
        ));
    }
}
