use std::path::Path;

use cuttermap::{
    CutterMapError, ExtractOptions, ExtractionResult, RenderOptions, SlideOptions, extract,
    from_json,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Contents of a `--config` file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractOptions,
    pub render: RenderOptions,
    pub slides: SlideOptions,
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_config(path: Option<&Path>) -> Result<Config, i32> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = read_file(path)?;
    let text = String::from_utf8(text).map_err(|_| {
        eprintln!("Error: config is not UTF-8: {}", path.display());
        1
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: invalid config {}: {e}", path.display());
        1
    })
}

/// Read a file with user-friendly error messages.
pub fn read_file(path: &Path) -> Result<Vec<u8>, i32> {
    if !path.exists() {
        eprintln!("Error: file not found: {}", path.display());
        return Err(1);
    }
    std::fs::read(path).map_err(|e| {
        eprintln!("Error: failed to read {}: {e}", path.display());
        1
    })
}

pub fn report(err: &CutterMapError) -> i32 {
    eprintln!("Error: {err}");
    1
}

/// Load an extraction record: PDFs are extracted, anything else is parsed
/// as extraction JSON.
pub fn load_result(path: &Path, options: &ExtractOptions) -> Result<ExtractionResult, i32> {
    let bytes = read_file(path)?;
    if bytes.starts_with(b"%PDF") {
        info!(path = %path.display(), "input is a PDF, extracting");
        return extract(&bytes, options).map_err(|e| report(&e));
    }
    let text = String::from_utf8(bytes).map_err(|_| {
        eprintln!("Error: {} is neither a PDF nor UTF-8 JSON", path.display());
        1
    })?;
    from_json(&text).map_err(|e| report(&e))
}

/// Write `bytes` to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), i32> {
    match path {
        Some(path) => std::fs::write(path, bytes).map_err(|e| {
            eprintln!("Error: failed to write {}: {e}", path.display());
            1
        }),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes).map_err(|e| {
                eprintln!("Error: failed to write output: {e}");
                1
            })
        }
    }
}
