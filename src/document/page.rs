//! Page handle: text access, redaction, drawing and rasterization
//!
//! A [`Page`] borrows its document mutably for as long as it lives, so at most
//! one page of a document can be edited at a time. Every mutation updates the
//! page dictionary immediately; the next serialization of the document picks
//! it up without any explicit flush.
//!
//! Shapes drawn with [`Page::draw_rect`] go into a separate overlay stream
//! appended to `/Contents`, so the original streams are referenced unchanged.
//! Only redaction rewrites content, and only the streams it edits: the page's
//! own operators, or private copies of the form XObjects the page draws.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbImage;
use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::content::{interpret_with_overlay, PageGeometry, PageLayout, StreamKind};
use super::objects::{inherited, rect_array, resolve_dict, stream_data};
use super::raster;
use super::redact::{self, RedactionSummary, StreamEdit};
use super::resources::{FormXObject, Resources};
use super::stream::{self, DecodedContent};
use super::text::{build_blocks, build_lines, search, text_in, TextBlock, TextLine};
use super::types::{Color, DocumentError, Rect, Result};

/// Name path of a form XObject as reached from the page
type FormPath = Vec<Vec<u8>>;

struct FormEdit {
    form: Arc<FormXObject>,
    /// `None` when only forms nested inside are edited
    edit: Option<StreamEdit>,
}

pub struct Page<'a> {
    doc: &'a mut Document,
    id: ObjectId,
    index: usize,
    geometry: PageGeometry,
    resources: Arc<Resources>,
    content: DecodedContent,
    /// `/Contents` entries holding the page's own operators
    base: Vec<Object>,
    /// Shapes drawn on top, in a clean graphics state
    overlay: Vec<Operation>,
    /// Streams wrapping the base in `q ... Q` and holding the overlay
    overlay_ids: Option<(ObjectId, ObjectId)>,
    layout: PageLayout,
    lines: Vec<TextLine>,
    pending: Vec<Rect>,
}

impl<'a> Page<'a> {
    pub(crate) fn load(doc: &'a mut Document, id: ObjectId, index: usize) -> Result<Self> {
        let geometry = page_geometry(doc, id);
        let resources = Resources::for_page(doc, id);
        let stream_ids = doc.get_page_contents(id);

        let mut bytes = Vec::new();
        for stream_id in &stream_ids {
            let data = doc
                .get_object(*stream_id)
                .and_then(Object::as_stream)
                .ok()
                .and_then(stream_data)
                .ok_or_else(|| {
                    DocumentError::Content(format!("page {index}: content stream {stream_id:?} could not be read"))
                })?;
            bytes.extend_from_slice(&data);
            bytes.push(b'\n');
        }
        let content = stream::decode(&bytes).map_err(|e| DocumentError::Content(format!("page {index}: {e}")))?;
        if !content.lossless {
            tracing::warn!(page = index, "Content stream only partially parsed");
        }

        let mut page = Self {
            doc,
            id,
            index,
            geometry,
            resources,
            content,
            base: stream_ids.into_iter().map(Object::Reference).collect(),
            overlay: Vec::new(),
            overlay_ids: None,
            layout: PageLayout::default(),
            lines: Vec::new(),
            pending: Vec::new(),
        };
        page.relayout();
        Ok(page)
    }

    /// Zero-based page number
    pub fn index(&self) -> usize {
        self.index
    }

    /// Page bounds in page space (origin top-left, y down)
    pub fn rect(&self) -> Rect {
        self.geometry.rect()
    }

    pub fn width(&self) -> f32 {
        self.geometry.width()
    }

    pub fn height(&self) -> f32 {
        self.geometry.height()
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// False when part of the page's content could not be parsed
    pub fn is_fully_parsed(&self) -> bool {
        self.content.lossless
    }

    /// Text blocks in content order, recomputed on every call
    pub fn text_blocks(&self) -> Vec<TextBlock> {
        build_blocks(&self.lines)
    }

    /// All page text, one line per text line
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Case-insensitive literal search, one rectangle per occurrence
    pub fn search_for(&self, needle: &str) -> Vec<Rect> {
        search(&self.lines, &self.layout.glyphs, needle)
    }

    /// Text whose glyph centers lie inside `clip`
    pub fn text_in(&self, clip: &Rect) -> String {
        text_in(&self.lines, &self.layout.glyphs, clip)
    }

    // ============================================================
    // Redaction
    // ============================================================

    /// Mark an area for removal; nothing changes until [`Page::apply_redactions`]
    pub fn add_redaction(&mut self, area: Rect) {
        self.pending.push(area);
    }

    pub fn pending_redactions(&self) -> &[Rect] {
        &self.pending
    }

    /// Remove the content under all pending areas in one pass.
    ///
    /// Fails without touching the page when a stream that would have to be
    /// rewritten was only partially parsed; writing it back would lose the
    /// part that could not be read.
    pub fn apply_redactions(&mut self) -> Result<RedactionSummary> {
        if self.pending.is_empty() {
            return Ok(RedactionSummary::default());
        }
        let areas = std::mem::take(&mut self.pending);
        let plan = redact::plan(&self.layout, &areas);
        let summary = plan.summary;

        if !summary.is_empty() {
            let mut page_edit = None;
            let mut overlay_edit = None;
            let mut form_edits: HashMap<FormPath, FormEdit> = HashMap::new();
            for (stream, edit) in plan.edits {
                match self.layout.streams.get(stream) {
                    Some(StreamKind::Page) => {
                        if !self.content.lossless {
                            return Err(self.partial_content_error("page content"));
                        }
                        page_edit = Some(edit);
                    }
                    Some(StreamKind::Overlay) => overlay_edit = Some(edit),
                    Some(StreamKind::Form { path, form }) => {
                        if !form.content.lossless {
                            return Err(self.partial_content_error("form XObject"));
                        }
                        form_edits.insert(
                            path.clone(),
                            FormEdit {
                                form: Arc::clone(form),
                                edit: Some(edit),
                            },
                        );
                    }
                    None => {}
                }
            }
            self.add_parent_forms(&mut form_edits);

            if let Some(edit) = page_edit {
                self.content.operations = redact::rewrite(&self.content.operations, &edit);
                let bytes = stream::encode(&self.content.operations).map_err(|e| self.content_error(e))?;
                let stream_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));
                self.base = vec![stream_id.into()];
            }
            if let Some(edit) = overlay_edit {
                self.overlay = redact::rewrite(&self.overlay, &edit);
            }
            if !form_edits.is_empty() {
                self.commit_forms(&form_edits)?;
                self.resources = Resources::for_page(self.doc, self.id);
            }
            self.write_contents()?;
            self.relayout();
        }

        tracing::debug!(
            page = self.index,
            areas = areas.len(),
            glyphs = summary.glyphs_removed,
            placements = summary.placements_removed,
            "Applied redactions"
        );
        Ok(summary)
    }

    // ============================================================
    // Drawing & Rendering
    // ============================================================

    /// Paint a rectangle (page space) on top of the existing content.
    ///
    /// With neither color given nothing is drawn.
    pub fn draw_rect(&mut self, rect: &Rect, stroke: Option<Color>, fill: Option<Color>) -> Result<()> {
        let paint = match (stroke.is_some(), fill.is_some()) {
            (true, true) => "B",
            (false, true) => "f",
            (true, false) => "S",
            (false, false) => return Ok(()),
        };

        let (x, y, w, h) = self.geometry.to_user_rect(rect);
        self.overlay.push(Operation::new("q", vec![]));
        if let Some(color) = stroke {
            self.overlay.push(Operation::new("RG", color_operands(color)));
        }
        if let Some(color) = fill {
            self.overlay.push(Operation::new("rg", color_operands(color)));
        }
        self.overlay.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        self.overlay.push(Operation::new(paint, vec![]));
        self.overlay.push(Operation::new("Q", vec![]));

        self.write_contents()?;
        self.relayout();
        Ok(())
    }

    /// Rasterize the page, or the `clip` part of it, at `dpi`
    pub fn render(&self, dpi: f32, clip: Option<&Rect>) -> Result<RgbImage> {
        raster::render(&self.layout, &self.rect(), dpi, clip)
    }

    // ============================================================
    // Internal
    // ============================================================

    fn relayout(&mut self) {
        self.layout = interpret_with_overlay(
            self.doc,
            &self.content.operations,
            &self.overlay,
            &self.resources,
            &self.geometry,
        );
        self.lines = build_lines(&self.layout.glyphs);
    }

    fn content_error(&self, message: impl std::fmt::Display) -> DocumentError {
        DocumentError::Content(format!("page {}: {message}", self.index))
    }

    fn partial_content_error(&self, what: &str) -> DocumentError {
        self.content_error(format_args!(
            "{what} could not be fully parsed, refusing to rewrite it"
        ))
    }

    /// Point `/Contents` at the base streams plus the overlay, if any
    fn write_contents(&mut self) -> Result<()> {
        let contents: Vec<Object> = if self.overlay.is_empty() {
            self.base.clone()
        } else {
            let mut tail = b"Q\n".to_vec();
            tail.extend(stream::encode(&self.overlay).map_err(|e| self.content_error(e))?);

            let (head_id, tail_id) = match self.overlay_ids {
                Some(ids) => ids,
                None => {
                    let head_id = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
                    let tail_id = self.doc.new_object_id();
                    self.overlay_ids = Some((head_id, tail_id));
                    (head_id, tail_id)
                }
            };
            self.doc
                .objects
                .insert(tail_id, Object::Stream(Stream::new(dictionary! {}, tail)));

            let mut contents = Vec::with_capacity(self.base.len() + 2);
            contents.push(head_id.into());
            contents.extend(self.base.iter().cloned());
            contents.push(tail_id.into());
            contents
        };

        let page = self.page_dict()?;
        match <[Object; 1]>::try_from(contents) {
            Ok([single]) => page.set("Contents", single),
            Err(many) => page.set("Contents", many),
        }
        Ok(())
    }

    fn page_dict(&mut self) -> Result<&mut Dictionary> {
        let index = self.index;
        self.doc
            .get_object_mut(self.id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| DocumentError::InvalidPage(format!("page {index}: {e}")))
    }

    /// Forms that only lead to edited forms still need copies
    fn add_parent_forms(&self, edits: &mut HashMap<FormPath, FormEdit>) {
        let paths: Vec<FormPath> = edits.keys().cloned().collect();
        for path in paths {
            for depth in 1..path.len() {
                let prefix = &path[..depth];
                if edits.contains_key(prefix) {
                    continue;
                }
                let form = self.layout.streams.iter().find_map(|kind| match kind {
                    StreamKind::Form { path, form } if path.as_slice() == prefix => Some(Arc::clone(form)),
                    _ => None,
                });
                if let Some(form) = form {
                    edits.insert(prefix.to_vec(), FormEdit { form, edit: None });
                }
            }
        }
    }

    /// Give this page private copies of the edited forms.
    ///
    /// Other pages drawing the same forms keep the originals.
    fn commit_forms(&mut self, edits: &HashMap<FormPath, FormEdit>) -> Result<()> {
        let original = inherited(self.doc, self.id, b"Resources")
            .and_then(|o| resolve_dict(self.doc, o))
            .cloned()
            .unwrap_or_default();
        let mut resources = original.clone();

        for path in edits.keys().filter(|p| p.len() == 1) {
            let copy = self.copy_form(path, &original, edits)?;
            set_xobject(self.doc, &mut resources, &path[0], copy);
        }
        self.page_dict()?.set("Resources", resources);
        Ok(())
    }

    fn copy_form(&mut self, path: &[Vec<u8>], parent: &Dictionary, edits: &HashMap<FormPath, FormEdit>) -> Result<ObjectId> {
        let Some(entry) = edits.get(path) else {
            return Err(self.content_error("missing form edit"));
        };
        let mut copy = self
            .doc
            .get_object(entry.form.id)
            .and_then(Object::as_stream)
            .map_err(|e| self.content_error(e))?
            .clone();

        if let Some(edit) = &entry.edit {
            let operations = redact::rewrite(&entry.form.content.operations, edit);
            let bytes = stream::encode(&operations).map_err(|e| self.content_error(e))?;
            copy.dict.remove(b"Filter");
            copy.dict.remove(b"DecodeParms");
            copy.set_content(bytes);
        }

        let children: Vec<Vec<u8>> = edits
            .keys()
            .filter(|p| p.len() == path.len() + 1 && p.starts_with(path))
            .map(|p| p[path.len()].clone())
            .collect();
        if !children.is_empty() {
            let mut resources = copy
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|o| resolve_dict(self.doc, o))
                .cloned()
                .unwrap_or_else(|| parent.clone());
            let lookup = resources.clone();
            for name in children {
                let mut child = path.to_vec();
                child.push(name.clone());
                let child_id = self.copy_form(&child, &lookup, edits)?;
                set_xobject(self.doc, &mut resources, &name, child_id);
            }
            copy.dict.set("Resources", resources);
        }

        let copy_id = self.doc.add_object(copy);
        tracing::trace!(page = self.index, form = ?entry.form.id, copy = ?copy_id, "Copied form XObject");
        Ok(copy_id)
    }
}

/// Point `name` in a resource dictionary's `/XObject` entry at `id`
fn set_xobject(doc: &Document, resources: &mut Dictionary, name: &[u8], id: ObjectId) {
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
        .cloned()
        .unwrap_or_default();
    xobjects.set(name.to_vec(), id);
    resources.set("XObject", xobjects);
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![color.r.into(), color.g.into(), color.b.into()]
}

/// Visible box: CropBox, then MediaBox, then US Letter
fn page_geometry(doc: &Document, id: ObjectId) -> PageGeometry {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .iter()
        .filter_map(|key| inherited(doc, id, key).and_then(|o| rect_array(doc, o)))
        .find(|[x0, y0, x1, y1]| x1 > x0 && y1 > y0)
        .map(PageGeometry::new)
        .unwrap_or(PageGeometry::LETTER)
}
