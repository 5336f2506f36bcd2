//! Owned PDF document handle

use lopdf::{Document, Object, ObjectId};

use super::page::Page;
use super::types::{DocumentError, Result};

/// A parsed document, owned by one request for its whole lifetime.
///
/// Pages are borrowed one at a time through [`PdfDocument::page`]. Dropping
/// the handle releases everything; there is no separate close step.
pub struct PdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.inner.version)
            .field("pages", &self.page_ids.len())
            .finish()
    }
}

impl PdfDocument {
    /// Parse a document from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes).map_err(|e| DocumentError::Parse(e.to_string()))?;
        let page_ids = inner.get_pages().into_values().collect();
        Ok(Self { inner, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Open page `index` (zero-based) for reading and editing
    pub fn page(&mut self, index: usize) -> Result<Page<'_>> {
        let id = *self.page_ids.get(index).ok_or(DocumentError::PageOutOfRange {
            index,
            count: self.page_ids.len(),
        })?;
        Page::load(&mut self.inner, id, index)
    }

    /// Remove the document information dictionary and XMP metadata
    pub fn strip_metadata(&mut self) {
        self.inner.trailer.remove(b"Info");

        let root = self
            .inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference);
        if let Ok(root) = root {
            if let Ok(catalog) = self.inner.get_object_mut(root).and_then(Object::as_dict_mut) {
                catalog.remove(b"Metadata");
            }
        }
    }

    /// Serialize the document, dropping unreferenced objects
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.inner.prune_objects();
        self.inner.compress();

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        Ok(buffer)
    }
}

impl Drop for PdfDocument {
    fn drop(&mut self) {
        tracing::trace!(pages = self.page_ids.len(), "Released document");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn build(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|i| {
                let content = format!("BT /F1 12 Tf 72 700 Td (Page {i}) Tj ET");
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Secret title"),
            "Author" => Object::string_literal("Someone"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_parse_and_count_pages() {
        let doc = PdfDocument::from_bytes(&build(3)).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_invalid_bytes_fail_to_parse() {
        let result = PdfDocument::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_page_out_of_range() {
        let mut doc = PdfDocument::from_bytes(&build(1)).unwrap();
        assert!(doc.page(0).is_ok());
        assert!(matches!(
            doc.page(1),
            Err(DocumentError::PageOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_pages_in_order() {
        let mut doc = PdfDocument::from_bytes(&build(2)).unwrap();
        assert_eq!(doc.page(0).unwrap().text(), "Page 0");
        assert_eq!(doc.page(1).unwrap().text(), "Page 1");
    }

    #[test]
    fn test_strip_metadata_removes_info() {
        let mut doc = PdfDocument::from_bytes(&build(1)).unwrap();
        doc.strip_metadata();
        let bytes = doc.to_bytes().unwrap();

        let reloaded = Document::load_mem(&bytes).unwrap();
        assert!(reloaded.trailer.get(b"Info").is_err());
        assert!(!bytes.windows(12).any(|w| w == b"Secret title"));
    }
}
