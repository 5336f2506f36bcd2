//! Document pipeline
//!
//! Ties parsing, cleaning and serialization together for the two
//! request types the service supports.
//!
//! # Features
//!
//! - **Full processing** - Strip metadata, clean every page, re-serialize
//! - **Preview** - Clean page 1 only and render it as a 150 dpi PNG
//! - **Per-page outcomes** - A failing page is recorded and skipped, never fatal
//! - **Progress callbacks** ([`ProgressCallback`]) for CLI and server front ends

mod document_pipeline;
mod types;

// Re-export public API
pub use document_pipeline::DocumentPipeline;
pub use types::{
    CleanOutput, NoopProgress, PageOutcome, PipelineError, Preview, ProgressCallback, Result,
    PREVIEW_DPI,
};
