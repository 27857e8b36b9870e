use clap::{Parser, Subcommand, ValueEnum};
use m2c_lib::{CssMode, Framework};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "m2c")]
#[command(
    version,
    about = "Mockup to Code - Convert UI screenshots and wireframes into positioned HTML/CSS",
    long_about = "Mockup to Code (m2c)\n\nModes:\n- convert: detect UI components and text in an image and generate markup, stylesheet and script.\n- detect: run detection only and report every traced region with its features and verdict.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) with stage thresholds and timeout; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a mockup image into code
    Convert {
        #[arg(long, help = "Input image (png, jpg, gif, webp, bmp, tiff, tga, ico)")]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "plain", help = "Target framework")]
        framework: FrameworkArg,

        #[arg(
            long,
            value_enum,
            default_value = "external",
            help = "Return the stylesheet separately (external) or embed it in the markup (inline)"
        )]
        css_mode: CssModeArg,

        #[arg(
            long,
            value_name = "PATH",
            help = "JSON file with precomputed OCR detections ({polygon,text,confidence} objects or [polygon,text,confidence] triples)"
        )]
        ocr_json: Option<PathBuf>,

        #[arg(
            long,
            conflicts_with = "ocr_json",
            help = "Recognize text with Tesseract (requires a build with the 'ocr' feature)"
        )]
        tesseract: bool,

        #[arg(
            long,
            default_value = "800",
            value_name = "PX",
            help = "Downscale images wider than this before processing (0 disables)"
        )]
        max_width: u32,

        #[arg(
            long,
            default_value = "60",
            value_name = "SECS",
            help = "Timeout (seconds) for the whole conversion"
        )]
        timeout: u64,

        #[arg(
            long,
            value_name = "DIR",
            help = "Write index.html/App.jsx, styles.css, script.js and preview.png to this directory"
        )]
        out_dir: Option<PathBuf>,

        #[arg(long, help = "Include the base64 preview image in the JSON output")]
        include_preview: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Detect UI regions without recognizing text or generating code
    Detect {
        #[arg(long, help = "Input image")]
        input: PathBuf,

        #[arg(
            long,
            default_value = "800",
            value_name = "PX",
            help = "Downscale images wider than this before processing (0 disables)"
        )]
        max_width: u32,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum FrameworkArg {
    #[value(aliases = ["vanilla", "html"])]
    Plain,
    #[value(aliases = ["react-like", "jsx"])]
    React,
}

impl From<FrameworkArg> for Framework {
    fn from(arg: FrameworkArg) -> Self {
        match arg {
            FrameworkArg::Plain => Framework::Plain,
            FrameworkArg::React => Framework::ReactLike,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum CssModeArg {
    External,
    Inline,
}

impl From<CssModeArg> for CssMode {
    fn from(arg: CssModeArg) -> Self {
        match arg {
            CssModeArg::External => CssMode::External,
            CssModeArg::Inline => CssMode::Inline,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
