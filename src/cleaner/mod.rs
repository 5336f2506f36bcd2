//! Page cleaning
//!
//! Removes keyword text from a page and paints background-colored bands over
//! its header and footer margins.
//!
//! # Features
//!
//! - **Redaction** - Every keyword match is removed from the content stream in one pass
//! - **Case filter** - Optional exact-case check on each match
//! - **Background sampling** ([`sample_background`]) - Mask color taken from the page itself
//! - **Band masking** - Full-width header and footer rectangles
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_watermark_remover::{CleanParams, PageCleaner, PdfDocument};
//!
//! let bytes = std::fs::read("report.pdf").unwrap();
//! let mut doc = PdfDocument::from_bytes(&bytes).unwrap();
//! let cleaner = PageCleaner::new(
//!     CleanParams::builder()
//!         .keyword("DRAFT")
//!         .footer_height(25.0)
//!         .build(),
//! );
//! let mut page = doc.page(0).unwrap();
//! let report = cleaner.clean(&mut page).unwrap();
//! println!("{} matches removed", report.redactions);
//! ```

mod background;
mod keywords;
mod page_cleaner;
mod types;

// Re-export public API
pub use background::{sample_rect, sample_background};
pub use keywords::{join_keyword_list, parse_keyword_list};
pub use page_cleaner::PageCleaner;
pub use types::{
    CleanError, CleanParams, CleanParamsBuilder, PageReport, Result, DEFAULT_FOOTER_HEIGHT,
    DEFAULT_HEADER_HEIGHT,
};
