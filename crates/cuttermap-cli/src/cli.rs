use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Extract, validate and regenerate PDF cutter maps.
#[derive(Debug, Parser)]
#[command(name = "cuttermap", about, version)]
pub struct Cli {
    /// JSON config with optional `extract`, `render` and `slides` sections
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract the header, BOM, blades and images from a cutter map PDF
    Extract {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-validate an extraction record, e.g. after editing it
    Validate {
        /// Extraction JSON (or a PDF, extracted first)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Regenerate a cutter map as PDF or PPTX
    Render {
        /// Extraction JSON (or a PDF, extracted first)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output document type
        #[arg(long, value_enum, default_value_t = RenderFormat::Pdf)]
        format: RenderFormat,

        /// Output path; the extension follows the file actually produced
        #[arg(short, long)]
        output: PathBuf,

        /// Browser executable for the chromium backend
        #[arg(long, value_name = "PATH")]
        chromium: Option<String>,

        /// PDF backends to try, in order (e.g. 'native' or 'chromium,native')
        #[arg(long, value_delimiter = ',')]
        backends: Option<Vec<String>>,
    },

    /// Dump the decoded words of the first page
    Words {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Pdf,
    Pptx,
}
