use std::path::Path;

use cuttermap::{ExtractOptions, decode_page};

use crate::cli::OutputFormat;
use crate::shared::{read_file, report};

pub fn run(file: &Path, format: OutputFormat, options: &ExtractOptions) -> Result<(), i32> {
    let bytes = read_file(file)?;
    let decoded = decode_page(&bytes, &options.decode).map_err(|e| report(&e))?;
    let words = &decoded.content.words;

    match format {
        OutputFormat::Text => {
            println!("line\ttext\tx0\ttop\tx1\tbottom");
            for w in words {
                println!(
                    "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
                    w.line, w.text, w.bbox.x0, w.bbox.top, w.bbox.x1, w.bbox.bottom
                );
            }
        }
        OutputFormat::Json => {
            let all: Vec<serde_json::Value> = words
                .iter()
                .map(|w| {
                    serde_json::json!({
                        "line": w.line,
                        "text": w.text,
                        "x0": w.bbox.x0,
                        "top": w.bbox.top,
                        "x1": w.bbox.x1,
                        "bottom": w.bbox.bottom,
                    })
                })
                .collect();
            println!("{}", serde_json::Value::Array(all));
        }
    }
    for warning in &decoded.warnings {
        eprintln!("warning: {}: {}", warning.code.as_str(), warning.description);
    }
    Ok(())
}
