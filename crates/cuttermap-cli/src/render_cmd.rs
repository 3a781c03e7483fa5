use std::path::{Path, PathBuf};

use cuttermap::{ExtractOptions, RenderOptions, SlideOptions, render_pdf, render_pptx};

use crate::cli::RenderFormat;
use crate::shared::{load_result, report, write_output};

pub struct RenderArgs<'a> {
    pub file: &'a Path,
    pub format: RenderFormat,
    pub output: &'a Path,
    pub chromium: Option<&'a str>,
    pub backends: Option<&'a [String]>,
}

pub fn run(
    args: &RenderArgs<'_>,
    extract: &ExtractOptions,
    render: &RenderOptions,
    slides: &SlideOptions,
) -> Result<(), i32> {
    let result = load_result(args.file, extract)?;
    let mut render = render.clone();
    if let Some(path) = args.chromium {
        render.chromium = Some(path.to_string());
    }
    if let Some(backends) = args.backends {
        render.backends = backends.to_vec();
    }

    let (bytes, backend, file_type) = match args.format {
        RenderFormat::Pdf => {
            let file = render_pdf(&result, &render).map_err(|e| report(&e))?;
            (file.bytes, file.backend, file.file_type)
        }
        RenderFormat::Pptx => {
            let bytes = render_pptx(&result, &render, slides).map_err(|e| report(&e))?;
            (bytes, "pptx".to_string(), "pptx".to_string())
        }
    };
    let path = output_path(args.output, &file_type);
    write_output(Some(&path), &bytes)?;
    println!("{}\t{backend}\t{file_type}", path.display());
    Ok(())
}

/// `output` with its extension replaced by the produced file type.
fn output_path(output: &Path, file_type: &str) -> PathBuf {
    output.with_extension(file_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_fallback_changes_extension() {
        assert_eq!(output_path(Path::new("out/map.pdf"), "html"), PathBuf::from("out/map.html"));
        assert_eq!(output_path(Path::new("map"), "pdf"), PathBuf::from("map.pdf"));
    }
}
