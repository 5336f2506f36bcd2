//! Per-page cleaning: redaction, background sampling and band masking

use super::background::sample_background;
use super::types::{CleanParams, PageReport, Result};
use crate::document::{Page, Rect};

/// Applies one set of [`CleanParams`] to pages, one page at a time
#[derive(Debug, Clone, Default)]
pub struct PageCleaner {
    params: CleanParams,
}

impl PageCleaner {
    pub fn new(params: CleanParams) -> Self {
        Self {
            params: params.normalized(),
        }
    }

    pub fn params(&self) -> &CleanParams {
        &self.params
    }

    /// Clean one page in place.
    ///
    /// Steps run in a fixed order: all keyword matches are redacted in a
    /// single pass, then the background is sampled, then the footer and
    /// header bands are painted over whatever is left.
    pub fn clean(&self, page: &mut Page<'_>) -> Result<PageReport> {
        let (redactions, glyphs_removed) = self.redact(page)?;

        let background = sample_background(page)?;

        let mut masks_drawn = 0;
        for band in self.bands(page.width(), page.height()) {
            page.draw_rect(&band, Some(background), Some(background))?;
            masks_drawn += 1;
        }

        tracing::debug!(
            page = page.index(),
            redactions,
            glyphs_removed,
            masks_drawn,
            "Cleaned page"
        );

        Ok(PageReport {
            page_index: page.index(),
            redactions,
            glyphs_removed,
            masks_drawn,
            background,
        })
    }

    /// Mark every accepted keyword match, then apply them together
    fn redact(&self, page: &mut Page<'_>) -> Result<(usize, usize)> {
        if self.params.keywords.is_empty() {
            return Ok((0, 0));
        }

        let mut accepted = 0;
        for keyword in &self.params.keywords {
            for hit in page.search_for(keyword) {
                if self.params.match_case && !page.text_in(&hit).contains(keyword.as_str()) {
                    tracing::trace!(page = page.index(), keyword = %keyword, "Rejected case mismatch");
                    continue;
                }
                page.add_redaction(hit);
                accepted += 1;
            }
        }

        let summary = page.apply_redactions()?;
        Ok((accepted, summary.glyphs_removed))
    }

    /// Footer band first, then header band, both full width
    fn bands(&self, width: f32, height: f32) -> Vec<Rect> {
        let mut bands = Vec::new();
        let footer = self.params.footer_height.min(height);
        if footer > 0.0 {
            bands.push(Rect::new(0.0, height - footer, width, height));
        }
        let header = self.params.header_height.min(height);
        if header > 0.0 {
            bands.push(Rect::new(0.0, 0.0, width, header));
        }
        bands
    }
}
