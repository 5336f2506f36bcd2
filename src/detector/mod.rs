//! Watermark candidate detection
//!
//! Scans the first pages of a document, counts how often each text block
//! appears and reports the blocks that repeat on (nearly) every page.
//!
//! # Features
//!
//! - Bounded page prefix (5 pages by default)
//! - Short-block filter (page numbers, bullets)
//! - Exact-text repetition counting in first-seen order
//! - Never fails: unreadable input yields no candidates
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_watermark_remover::{CandidateDetector, DetectorOptions};
//!
//! let bytes = std::fs::read("report.pdf").unwrap();
//! let detector = CandidateDetector::new(DetectorOptions::default());
//! for candidate in detector.detect(&bytes) {
//!     println!("{candidate}");
//! }
//! ```

mod detect;
mod types;

// Re-export public API
pub use detect::CandidateDetector;
pub use types::{
    CandidateCount, CandidateReport, CandidateSet, DetectorOptions, DetectorOptionsBuilder,
    DEFAULT_MAX_PAGES, DEFAULT_MIN_BLOCK_CHARS, DEFAULT_MIN_THRESHOLD,
};
