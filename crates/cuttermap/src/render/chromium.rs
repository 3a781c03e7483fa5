use std::path::{Path, PathBuf};
use std::process::Command;

use cuttermap_core::{CutterMapError, RenderOptions};
use tracing::debug;

use super::{PdfRenderer, RenderJob, RenderOutcome, RenderedFile};

/// Environment variable naming the browser executable.
pub const CHROMIUM_ENV: &str = "CUTTERMAP_CHROMIUM";

const CANDIDATES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];

/// Prints the job's HTML with a headless Chromium-family browser.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
    scratch: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// Use this executable, skipping discovery.
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
            scratch: None,
        }
    }

    /// Write the HTML and PDF under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch = Some(dir.into());
        self
    }

    /// Configured path first, then [`CHROMIUM_ENV`], then `PATH`.
    pub fn from_options(options: &RenderOptions) -> Self {
        let executable = options
            .chromium
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CHROMIUM_ENV).map(PathBuf::from))
            .or_else(|| CANDIDATES.iter().find_map(|name| which::which(name).ok()));
        Self {
            executable,
            scratch: None,
        }
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    fn print(&self, exe: &Path, html: &str) -> Result<RenderOutcome, CutterMapError> {
        let dir = match &self.scratch {
            Some(base) => tempfile::tempdir_in(base),
            None => tempfile::tempdir(),
        };
        let dir = match dir {
            Ok(dir) => dir,
            Err(e) => return Ok(RenderOutcome::TryNext(format!("no scratch directory: {e}"))),
        };
        let input = dir.path().join("input.html");
        let output = dir.path().join("output.pdf");
        if let Err(e) = std::fs::write(&input, html) {
            return Ok(RenderOutcome::TryNext(format!(
                "cannot write {}: {e}",
                input.display()
            )));
        }

        let result = Command::new(exe)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(format!("file://{}", input.display()))
            .output();
        let status = match result {
            Ok(out) => out,
            Err(e) => {
                return Ok(RenderOutcome::TryNext(format!(
                    "failed to launch {}: {e}",
                    exe.display()
                )));
            }
        };
        if !status.status.success() {
            debug!(stderr = %String::from_utf8_lossy(&status.stderr), "chromium stderr");
            return Ok(RenderOutcome::TryNext(format!(
                "{} exited with {}",
                exe.display(),
                status.status
            )));
        }

        let bytes = match std::fs::read(&output) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(RenderOutcome::TryNext(format!("no PDF written: {e}"))),
        };
        if !bytes.starts_with(b"%PDF") {
            return Ok(RenderOutcome::TryNext("output is not a PDF".to_string()));
        }
        Ok(RenderOutcome::Rendered(RenderedFile {
            bytes,
            backend: "chromium".to_string(),
            file_type: "pdf".to_string(),
        }))
    }
}

impl PdfRenderer for ChromiumRenderer {
    fn name(&self) -> &str {
        "chromium"
    }

    fn render(&self, job: &RenderJob) -> Result<RenderOutcome, CutterMapError> {
        match &self.executable {
            Some(exe) => self.print(exe, &job.html),
            None => Ok(RenderOutcome::TryNext("no Chromium executable found".to_string())),
        }
    }
}
