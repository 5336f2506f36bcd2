//! Repeated-text detection over a page prefix

use super::types::{CandidateReport, CandidateSet, DetectorOptions};
use crate::document::{PdfDocument, Result};

/// Finds text blocks that repeat across the leading pages of a document
#[derive(Debug, Clone, Default)]
pub struct CandidateDetector {
    options: DetectorOptions,
}

impl CandidateDetector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Candidate strings for `bytes`, empty when anything goes wrong.
    ///
    /// Detection is advisory: parse or extraction failures are logged and
    /// reported as "no confident candidates".
    pub fn detect(&self, bytes: &[u8]) -> Vec<String> {
        match self.analyze(bytes) {
            Ok(report) => report.candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Candidate detection failed");
                Vec::new()
            }
        }
    }

    /// Parse `bytes` and run a full analysis
    pub fn analyze(&self, bytes: &[u8]) -> Result<CandidateReport> {
        let mut doc = PdfDocument::from_bytes(bytes)?;
        self.analyze_document(&mut doc)
    }

    /// Count block repetitions across the first pages of an open document
    pub fn analyze_document(&self, doc: &mut PdfDocument) -> Result<CandidateReport> {
        let page_count = doc.page_count();
        let pages_scanned = page_count.min(self.options.max_pages);
        let mut counts = CandidateSet::new();

        for index in 0..pages_scanned {
            let page = doc.page(index)?;
            for block in page.text_blocks() {
                let text = block.text.trim();
                if text.chars().count() > self.options.min_block_chars {
                    counts.record(text);
                }
            }
        }

        let threshold = self.options.threshold_for(pages_scanned);
        let candidates = counts.at_least(threshold);
        tracing::debug!(
            page_count,
            pages_scanned,
            threshold,
            distinct = counts.len(),
            candidates = candidates.len(),
            "Candidate detection finished"
        );

        Ok(CandidateReport {
            page_count,
            pages_scanned,
            threshold,
            counts,
            candidates,
        })
    }
}
