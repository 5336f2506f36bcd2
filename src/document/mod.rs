//! In-memory PDF document model
//!
//! Wraps `lopdf` with the page-level operations the detector and cleaner need:
//!
//! # Features
//!
//! - **Content streams** (`stream`) - Decoding that keeps inline images intact and flags partial parses
//! - **Content interpretation** ([`content`]) - Glyph, path and image placement, descending into form XObjects
//! - **Resources** (`resources`, `fonts`, `images`) - Fonts with CID and `ToUnicode` support, forms, image decoding
//! - **Text** ([`text`]) - Lines, blocks, literal search and clipped extraction
//! - **Redaction** ([`redact`]) - Remove glyphs and images under an area, inside forms too, not just cover them
//! - **Rasterization** ([`raster`]) - Approximate RGB rendering and PNG encoding
//! - **Handles** ([`PdfDocument`], [`Page`]) - Owned document, borrowed pages

pub mod content;
mod fonts;
mod images;
mod objects;
mod page;
mod pdf;
pub mod raster;
pub mod redact;
mod resources;
mod stream;
pub mod text;
mod types;

// Re-export public API
pub use content::{PageGeometry, PageLayout};
pub use page::Page;
pub use pdf::PdfDocument;
pub use redact::RedactionSummary;
pub use text::TextBlock;
pub use types::{Color, DocumentError, Matrix, Rect, Result};
