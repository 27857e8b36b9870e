mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_convert, run_detect};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    m2c_lib::logging::init(args.verbose);

    match args.command {
        Commands::Convert {
            input,
            framework,
            css_mode,
            ocr_json,
            tesseract,
            max_width,
            timeout,
            out_dir,
            include_preview,
            format,
            output,
        } => {
            run_convert(
                &raw_args,
                args.config,
                args.verbose,
                input,
                framework,
                css_mode,
                ocr_json,
                tesseract,
                max_width,
                timeout,
                out_dir,
                include_preview,
                format,
                output,
            )
            .await
        }
        Commands::Detect {
            input,
            max_width,
            format,
            output,
        } => run_detect(&raw_args, args.config, input, max_width, format, output).await,
    }
}
