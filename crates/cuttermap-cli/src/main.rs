mod cli;
mod extract_cmd;
mod render_cmd;
mod shared;
mod validate_cmd;
mod words_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    shared::init_logging(cli.verbose);

    let result = shared::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        cli::Commands::Extract {
            ref file,
            format,
            ref output,
        } => extract_cmd::run(file, format, output.as_deref(), &config.extract),
        cli::Commands::Validate { ref file, format } => {
            validate_cmd::run(file, format, &config.extract)
        }
        cli::Commands::Render {
            ref file,
            format,
            ref output,
            ref chromium,
            ref backends,
        } => render_cmd::run(
            &render_cmd::RenderArgs {
                file,
                format,
                output,
                chromium: chromium.as_deref(),
                backends: backends.as_deref(),
            },
            &config.extract,
            &config.render,
            &config.slides,
        ),
        cli::Commands::Words { ref file, format } => words_cmd::run(file, format, &config.extract),
    });

    if let Err(code) = result {
        std::process::exit(code);
    }
}
