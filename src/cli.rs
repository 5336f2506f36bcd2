//! Command-line interface definitions
//!
//! # Commands
//!
//! - `detect` - List repeated text blocks that look like watermarks
//! - `clean` - Redact keywords and mask header/footer bands
//! - `preview` - Render the cleaned first page as PNG
//! - `serve` - Run the HTTP service (feature `web`)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::cleaner::parse_keyword_list;
use crate::config::CliOverrides;

/// Process exit codes
pub mod exit_codes {
    /// Completed successfully
    pub const SUCCESS: i32 = 0;
    /// Unclassified failure
    pub const GENERAL_ERROR: i32 = 1;
    /// Invalid command-line arguments
    pub const INVALID_ARGS: i32 = 2;
    /// Input file missing
    pub const INPUT_NOT_FOUND: i32 = 3;
    /// Input could not be parsed or output could not be written
    pub const PROCESSING_ERROR: i32 = 4;
    /// Some pages could not be cleaned
    pub const PARTIAL_FAILURE: i32 = 5;
}

/// Prefix of default output file names
pub const OUTPUT_PREFIX: &str = "Clean_";

/// Remove repeated watermark text from PDF documents
#[derive(Debug, Parser)]
#[command(name = "pdf-watermark-remover", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ./watermark-remover.toml or user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect watermark candidates
    Detect(DetectArgs),
    /// Write a cleaned copy of a PDF
    Clean(CleanArgs),
    /// Render a PNG preview of the cleaned first page
    Preview(PreviewArgs),
    /// Start the web server
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Input PDF file
    pub input: PathBuf,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Number of leading pages to scan
    #[arg(long)]
    pub max_pages: Option<usize>,
}

/// Cleaning flags shared by `clean` and `preview`
#[derive(Debug, Clone, Default, Args)]
pub struct CleanFlags {
    /// Keyword to redact (repeatable)
    #[arg(short, long = "keyword")]
    pub keyword: Vec<String>,

    /// Comma-separated keyword list
    #[arg(long)]
    pub keywords: Option<String>,

    /// Header band height in PDF units
    #[arg(long = "header")]
    pub header: Option<f32>,

    /// Footer band height in PDF units
    #[arg(long = "footer")]
    pub footer: Option<f32>,

    /// Only redact matches with the exact keyword case
    #[arg(long)]
    pub match_case: bool,

    /// Use detected candidates when no keywords are given
    #[arg(long)]
    pub auto: bool,
}

impl CleanFlags {
    /// Keywords from `-k` and `--keywords`, in command-line order
    pub fn keyword_list(&self) -> Vec<String> {
        let mut keywords: Vec<String> = self
            .keyword
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if let Some(list) = &self.keywords {
            keywords.extend(parse_keyword_list(list));
        }
        keywords
    }

    /// Overrides for values the user actually passed
    pub fn to_overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides::new();
        let keywords = self.keyword_list();
        if !keywords.is_empty() {
            overrides = overrides.with_keywords(keywords);
        }
        if let Some(height) = self.header {
            overrides = overrides.with_header_height(height);
        }
        if let Some(height) = self.footer {
            overrides = overrides.with_footer_height(height);
        }
        if self.match_case {
            overrides = overrides.with_match_case(true);
        }
        overrides
    }
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input PDF file
    pub input: PathBuf,

    /// Output file (default: Clean_<input name> next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub flags: CleanFlags,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input PDF file
    pub input: PathBuf,

    /// Output PNG (default: <input stem>_preview.png next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub flags: CleanFlags,
}

#[cfg(feature = "web")]
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Maximum upload size in MB
    #[arg(long)]
    pub upload_limit: Option<usize>,
}

/// `Clean_<name>` beside `input`
pub fn default_clean_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    input.with_file_name(format!("{OUTPUT_PREFIX}{name}"))
}

/// `<stem>_preview.png` beside `input`
pub fn default_preview_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_preview.png"))
}
