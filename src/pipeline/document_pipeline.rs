//! Whole-document processing and single-page preview

use std::time::Instant;

use super::types::{
    CleanOutput, NoopProgress, PageOutcome, PipelineError, Preview, ProgressCallback, Result,
    PREVIEW_DPI,
};
use crate::cleaner::{CleanError, CleanParams, PageCleaner};
use crate::document::{raster, PdfDocument};

/// Runs the page cleaner over documents with one fixed set of parameters
#[derive(Debug, Clone, Default)]
pub struct DocumentPipeline {
    cleaner: PageCleaner,
}

impl DocumentPipeline {
    pub fn new(params: CleanParams) -> Self {
        Self {
            cleaner: PageCleaner::new(params),
        }
    }

    pub fn params(&self) -> &CleanParams {
        self.cleaner.params()
    }

    /// Clean every page and return the rewritten document
    pub fn process(&self, bytes: &[u8]) -> Result<CleanOutput> {
        self.process_with_progress(bytes, &NoopProgress)
    }

    /// Clean every page, reporting progress after each one.
    ///
    /// Parse and serialization failures abort the run. A page that fails to
    /// clean is recorded as [`PageOutcome::Failed`] and the run continues.
    pub fn process_with_progress(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressCallback,
    ) -> Result<CleanOutput> {
        let start = Instant::now();
        let mut doc = PdfDocument::from_bytes(bytes)?;
        doc.strip_metadata();

        let total = doc.page_count();
        progress.on_step_start("Cleaning pages");
        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            let result = doc
                .page(index)
                .map_err(CleanError::from)
                .and_then(|mut page| self.cleaner.clean(&mut page));

            let outcome = match result {
                Ok(report) => PageOutcome::Cleaned(report),
                Err(e) => {
                    tracing::warn!(page = index, error = %e, "Page cleaning failed, continuing");
                    progress.on_debug(&format!("page {}: {e}", index + 1));
                    PageOutcome::Failed {
                        page: index,
                        reason: e.to_string(),
                    }
                }
            };
            pages.push(outcome);
            progress.on_step_progress(index + 1, total);
        }
        let failed = pages.iter().filter(|p| !p.is_cleaned()).count();
        progress.on_step_complete(
            "Cleaning pages",
            &format!("{} cleaned, {} failed", total - failed, failed),
        );

        progress.on_step_start("Writing PDF");
        let bytes = doc.to_bytes()?;
        progress.on_step_complete("Writing PDF", &format!("{} bytes", bytes.len()));

        tracing::info!(
            pages = total,
            failed,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Document cleaned"
        );
        Ok(CleanOutput { bytes, pages })
    }

    /// Clean the first page only and render it as PNG at [`PREVIEW_DPI`].
    ///
    /// A first page that cannot be cleaned is an error; the uncleaned page
    /// is never rendered in its place.
    pub fn preview(&self, bytes: &[u8]) -> Result<Preview> {
        let mut doc = PdfDocument::from_bytes(bytes)?;
        if doc.page_count() == 0 {
            tracing::debug!("Preview unavailable: document has no pages");
            return Ok(Preview::Unavailable);
        }

        let mut page = doc.page(0)?;
        self.cleaner
            .clean(&mut page)
            .map_err(|e| PipelineError::Render(format!("page 1 could not be cleaned: {e}")))?;
        let image = page.render(PREVIEW_DPI, None)?;
        let png = raster::encode_png(&image)?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            bytes = png.len(),
            "Rendered preview"
        );
        Ok(Preview::Image(png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_rejects_garbage() {
        let pipeline = DocumentPipeline::default();
        assert!(matches!(
            pipeline.process(b"garbage"),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_preview_rejects_garbage() {
        let pipeline = DocumentPipeline::default();
        assert!(matches!(
            pipeline.preview(b"garbage"),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_default_params() {
        let pipeline = DocumentPipeline::default();
        assert_eq!(pipeline.params(), &CleanParams::default());
    }
}
