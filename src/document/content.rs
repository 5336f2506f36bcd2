//! Content stream interpretation
//!
//! Walks decoded page operators and records what ends up on the page:
//! positioned glyphs, filled paths, images and XObject placements. Form
//! XObjects are descended with their own resources, so text drawn inside a
//! form is placed like any other text. The result feeds text extraction,
//! search, redaction and rasterization.
//!
//! # Supported operators
//!
//! - Graphics state: `q` `Q` `cm`
//! - Fill color: `g` `rg` `k` `sc` `scn` `cs`
//! - Paths: `re` `m` `l` `c` `v` `y` `h` (curves are flattened)
//! - Painting: `f` `F` `f*` `B` `B*` `b` `b*` `S` `s` `n`
//! - Text: `BT` `ET` `Tf` `Tc` `Tw` `Tz` `TL` `Ts` `Tr` `Td` `TD` `Tm` `T*`
//!   `Tj` `TJ` `'` `"`
//! - XObjects: `Do` (forms are descended, images are placed)
//! - Inline images: `BI` as preserved by [`super::stream`]

use std::sync::Arc;

use lopdf::content::Operation;
use lopdf::{Document, Object};

use super::images::ImageSource;
use super::objects::number;
use super::resources::{FormXObject, Resources, XObject, MAX_FORM_DEPTH};
use super::stream::inline_parts;
use super::types::{Color, Matrix, Rect};

/// Line segments used per Bézier curve
const CURVE_SEGMENTS: usize = 8;

// ============================================================
// Page Geometry
// ============================================================

/// Visible page box and the mapping from PDF user space to page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[llx, lly, urx, ury]` in PDF user space
    pub bounds: [f32; 4],
}

impl PageGeometry {
    /// US Letter, used when a page has no usable box
    pub const LETTER: PageGeometry = PageGeometry {
        bounds: [0.0, 0.0, 612.0, 792.0],
    };

    pub fn new(bounds: [f32; 4]) -> Self {
        Self { bounds }
    }

    pub fn width(&self) -> f32 {
        self.bounds[2] - self.bounds[0]
    }

    pub fn height(&self) -> f32 {
        self.bounds[3] - self.bounds[1]
    }

    /// Page rectangle in page space (origin top-left)
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    /// Convert a user-space point to page space
    pub fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.bounds[0], self.bounds[3] - y)
    }

    /// Convert a page-space rect to user space `(x, y, width, height)`
    pub fn to_user_rect(&self, rect: &Rect) -> (f32, f32, f32, f32) {
        (
            self.bounds[0] + rect.x0,
            self.bounds[3] - rect.y1,
            rect.width(),
            rect.height(),
        )
    }

    /// Page space to PDF user space
    pub fn page_to_user(&self) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, -1.0, self.bounds[0], self.bounds[3])
    }

    fn map_points(&self, matrix: &Matrix, points: &[(f32, f32)]) -> Option<Rect> {
        let mapped: Vec<(f32, f32)> = points
            .iter()
            .map(|&(x, y)| {
                let (ux, uy) = matrix.apply(x, y);
                self.to_page(ux, uy)
            })
            .collect();
        Rect::from_points(&mapped)
    }
}

// ============================================================
// Layout Records
// ============================================================

/// Where the operators of a content stream come from
#[derive(Debug, Clone)]
pub enum StreamKind {
    /// The page's own content
    Page,
    /// Shapes drawn on top of the page by this crate
    Overlay,
    /// A form XObject, reached through the `Do` names in `path`
    Form {
        path: Vec<Vec<u8>>,
        form: Arc<FormXObject>,
    },
}

/// Location of a glyph's character code inside an operator list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphSource {
    /// Index into [`PageLayout::streams`]
    pub stream: usize,
    /// Index of the show operator
    pub op_index: usize,
    /// Operand index for `Tj`/`'`/`"`, array index for `TJ`
    pub element: usize,
    /// Byte offset inside the string
    pub byte: usize,
    /// Bytes of the character code
    pub len: usize,
}

/// A single positioned glyph
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Unicode text of the glyph, usually one character
    pub text: String,
    /// Glyph box in page space
    pub bbox: Rect,
    /// Baseline y in page space
    pub baseline: f32,
    /// Em height in page space
    pub size: f32,
    /// Text-space advance before horizontal scaling
    pub advance: f32,
    /// Font size operand in effect (`Tf`)
    pub font_size: f32,
    pub color: Color,
    /// False for invisible render modes (`3 Tr`, `7 Tr`)
    pub visible: bool,
    /// Paint order across the page
    pub order: usize,
    pub source: GlyphSource,
}

impl Glyph {
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// A filled axis-aligned rectangle
#[derive(Debug, Clone, Copy)]
pub struct FilledRect {
    pub order: usize,
    pub stream: usize,
    pub op_index: usize,
    pub rect: Rect,
    pub color: Color,
}

/// A filled polygon (page space), from general paths or rotated rectangles
#[derive(Debug, Clone)]
pub struct FilledShape {
    pub order: usize,
    pub stream: usize,
    pub op_index: usize,
    pub points: Vec<(f32, f32)>,
    pub color: Color,
}

/// An XObject invocation (`Do`) or an inline image
#[derive(Debug, Clone)]
pub struct Placement {
    pub stream: usize,
    pub op_index: usize,
    /// Resource name, empty for inline images
    pub name: Vec<u8>,
    pub bbox: Rect,
}

/// An image painted on the page
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    pub order: usize,
    pub stream: usize,
    pub op_index: usize,
    pub bbox: Rect,
    /// Page space to the image's unit square
    pub inverse: Matrix,
    pub source: Arc<ImageSource>,
}

/// Everything painted by a page's content streams
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub streams: Vec<StreamKind>,
    pub glyphs: Vec<Glyph>,
    pub fills: Vec<FilledRect>,
    pub shapes: Vec<FilledShape>,
    pub images: Vec<ImagePlacement>,
    pub placements: Vec<Placement>,
}

impl PageLayout {
    /// Index of the page's own content stream
    pub fn page_stream(&self) -> Option<usize> {
        self.streams.iter().position(|s| matches!(s, StreamKind::Page))
    }
}

// ============================================================
// Interpreter
// ============================================================

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Color,
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
    render_mode: i64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Color::BLACK,
            font: Vec::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
        }
    }
}

/// Path under construction, in page space
#[derive(Debug, Default)]
struct PathBuilder {
    rects: Vec<Rect>,
    polygons: Vec<Vec<(f32, f32)>>,
    current: Vec<(f32, f32)>,
    /// Current point in user space, for curve control points
    point: (f32, f32),
    start: (f32, f32),
}

impl PathBuilder {
    fn close_subpath(&mut self) {
        if self.current.len() >= 3 {
            self.polygons.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    geometry: &'a PageGeometry,
    resources: Arc<Resources>,
    stream: usize,
    form_path: Vec<Vec<u8>>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: PathBuilder,
    depth: usize,
    order: usize,
    layout: PageLayout,
}

/// Interpret a page's operators into a layout.
///
/// Malformed operands are skipped rather than reported; a partially
/// understood page still yields whatever could be placed.
pub fn interpret(
    doc: &Document,
    operations: &[Operation],
    resources: &Arc<Resources>,
    geometry: &PageGeometry,
) -> PageLayout {
    interpret_with_overlay(doc, operations, &[], resources, geometry)
}

/// Interpret page operators followed by an overlay drawn in a clean state
pub fn interpret_with_overlay(
    doc: &Document,
    operations: &[Operation],
    overlay: &[Operation],
    resources: &Arc<Resources>,
    geometry: &PageGeometry,
) -> PageLayout {
    let mut interpreter = Interpreter {
        doc,
        geometry,
        resources: Arc::clone(resources),
        stream: 0,
        form_path: Vec::new(),
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        path: PathBuilder::default(),
        depth: 0,
        order: 0,
        layout: PageLayout::default(),
    };

    interpreter.layout.streams.push(StreamKind::Page);
    interpreter.run(operations);

    if !overlay.is_empty() {
        interpreter.layout.streams.push(StreamKind::Overlay);
        interpreter.stream = interpreter.layout.streams.len() - 1;
        interpreter.state = GraphicsState::default();
        interpreter.stack.clear();
        interpreter.path = PathBuilder::default();
        interpreter.run(overlay);
    }
    interpreter.layout
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

impl Interpreter<'_> {
    fn run(&mut self, operations: &[Operation]) {
        for (index, op) in operations.iter().enumerate() {
            self.step(index, op);
        }
    }

    fn next_order(&mut self) -> usize {
        self.order += 1;
        self.order
    }

    fn step(&mut self, index: usize, op: &Operation) {
        let args = &op.operands;
        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let [a, b, c, d, e, f] = numbers(args)[..] {
                    self.state.ctm = Matrix::new(a, b, c, d, e, f).then(&self.state.ctm);
                }
            }

            // Fill color
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = color_from(&numbers(args)) {
                    self.state.fill = color;
                }
            }
            "cs" => self.state.fill = Color::BLACK,

            // Paths
            "re" => {
                if let [x, y, w, h] = numbers(args)[..] {
                    self.rectangle(x, y, w, h);
                }
            }
            "m" => {
                if let [x, y] = numbers(args)[..] {
                    self.path.close_subpath();
                    self.path.start = (x, y);
                    self.line_to(x, y);
                }
            }
            "l" => {
                if let [x, y] = numbers(args)[..] {
                    self.line_to(x, y);
                }
            }
            "c" => {
                if let [x1, y1, x2, y2, x3, y3] = numbers(args)[..] {
                    self.curve_to((x1, y1), (x2, y2), (x3, y3));
                }
            }
            "v" => {
                if let [x2, y2, x3, y3] = numbers(args)[..] {
                    self.curve_to(self.path.point, (x2, y2), (x3, y3));
                }
            }
            "y" => {
                if let [x1, y1, x3, y3] = numbers(args)[..] {
                    self.curve_to((x1, y1), (x3, y3), (x3, y3));
                }
            }
            "h" => {
                let (x, y) = self.path.start;
                self.path.point = (x, y);
                self.path.close_subpath();
            }
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                self.fill_path(index);
                self.path = PathBuilder::default();
            }
            "S" | "s" | "n" => self.path = PathBuilder::default(),

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (args.first(), args.get(1).and_then(number))
                {
                    self.state.font = name.clone();
                    self.state.font_size = size;
                }
            }
            "Tc" => self.set_scalar(args, |s, v| s.char_spacing = v),
            "Tw" => self.set_scalar(args, |s, v| s.word_spacing = v),
            "Tz" => self.set_scalar(args, |s, v| s.horizontal_scale = v / 100.0),
            "TL" => self.set_scalar(args, |s, v| s.leading = v),
            "Ts" => self.set_scalar(args, |s, v| s.rise = v),
            "Tr" => {
                if let Some(Object::Integer(mode)) = args.first() {
                    self.state.render_mode = *mode;
                }
            }

            // Text positioning
            "Td" => {
                if let [tx, ty] = numbers(args)[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = numbers(args)[..] {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let [a, b, c, d, e, f] = numbers(args)[..] {
                    self.line_matrix = Matrix::new(a, b, c, d, e, f);
                    self.text_matrix = self.line_matrix;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(bytes, index, 0);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(bytes, index, 0);
                }
            }
            "\"" => {
                if let [aw, ac] = numbers(args.get(..2).unwrap_or(&[]))[..] {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = args.get(2) {
                    self.show(bytes, index, 2);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = args.first() {
                    for (element, item) in items.iter().enumerate() {
                        match item {
                            Object::String(bytes, _) => self.show(bytes, index, element),
                            other => {
                                if let Some(adjust) = number(other) {
                                    self.advance(-adjust / 1000.0 * self.state.font_size);
                                }
                            }
                        }
                    }
                }
            }

            // XObjects and inline images
            "Do" => {
                if let Some(Object::Name(name)) = args.first() {
                    match self.resources.xobjects.get(name).cloned() {
                        Some(XObject::Form(form)) => self.run_form(index, name, form),
                        Some(XObject::Image(source)) => self.place_image(index, name, source),
                        None => {
                            if let Some(bbox) = self.unit_square() {
                                self.place(index, name, bbox);
                            }
                        }
                    }
                }
            }
            "BI" => {
                if let Some((dict, data)) = inline_parts(op) {
                    let source = ImageSource::inline(self.doc, dict, data, self.resources.color_spaces.as_ref());
                    self.place_image(index, &[], Arc::new(source));
                }
            }
            _ => {}
        }
    }

    fn set_scalar(&mut self, args: &[Object], apply: impl FnOnce(&mut GraphicsState, f32)) {
        if let Some(value) = args.first().and_then(number) {
            apply(&mut self.state, value);
        }
    }

    // ---- paths ----

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let (ux, uy) = self.state.ctm.apply(x, y);
        self.geometry.to_page(ux, uy)
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.path.close_subpath();
        let ctm = &self.state.ctm;
        if ctm.b == 0.0 && ctm.c == 0.0 {
            let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)];
            if let Some(rect) = self.geometry.map_points(ctm, &corners) {
                self.path.rects.push(rect);
            }
        } else {
            let polygon = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
                .iter()
                .map(|&(px, py)| self.map(px, py))
                .collect();
            self.path.polygons.push(polygon);
        }
        self.path.start = (x, y);
        self.path.point = (x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let mapped = self.map(x, y);
        self.path.current.push(mapped);
        self.path.point = (x, y);
    }

    fn curve_to(&mut self, c1: (f32, f32), c2: (f32, f32), end: (f32, f32)) {
        let p0 = self.path.point;
        for step in 1..=CURVE_SEGMENTS {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            let u = 1.0 - t;
            let x = u * u * u * p0.0 + 3.0 * u * u * t * c1.0 + 3.0 * u * t * t * c2.0 + t * t * t * end.0;
            let y = u * u * u * p0.1 + 3.0 * u * u * t * c1.1 + 3.0 * u * t * t * c2.1 + t * t * t * end.1;
            self.line_to(x, y);
        }
    }

    fn fill_path(&mut self, op_index: usize) {
        self.path.close_subpath();
        let color = self.state.fill;
        for rect in std::mem::take(&mut self.path.rects) {
            let order = self.next_order();
            self.layout.fills.push(FilledRect {
                order,
                stream: self.stream,
                op_index,
                rect,
                color,
            });
        }
        for points in std::mem::take(&mut self.path.polygons) {
            let order = self.next_order();
            self.layout.shapes.push(FilledShape {
                order,
                stream: self.stream,
                op_index,
                points,
                color,
            });
        }
    }

    // ---- text ----

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    /// Advance the text matrix by a text-space distance (before `Tz` scaling)
    fn advance(&mut self, distance: f32) {
        let tx = distance * self.state.horizontal_scale;
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8], op_index: usize, element: usize) {
        let resources = Arc::clone(&self.resources);
        let font = resources.fonts.get(&self.state.font);
        let ascent = font.ascent / 1000.0;
        let descent = font.descent / 1000.0;
        let visible = !matches!(self.state.render_mode, 3 | 7);

        for code in font.codes(bytes) {
            let w0 = font.width(code.value) / 1000.0;
            let state = &self.state;
            let rendering = Matrix::new(
                state.font_size * state.horizontal_scale,
                0.0,
                0.0,
                state.font_size,
                0.0,
                state.rise,
            )
            .then(&self.text_matrix)
            .then(&state.ctm);

            let space = code.len == 1 && code.value == 32;
            let spacing = state.char_spacing + if space { state.word_spacing } else { 0.0 };
            let advance = w0 * state.font_size + spacing;

            let corners = [(0.0, descent), (w0, descent), (0.0, ascent), (w0, ascent)];
            if let Some(bbox) = self.geometry.map_points(&rendering, &corners) {
                let (ox, oy) = rendering.apply(0.0, 0.0);
                let (ux, uy) = rendering.apply(0.0, 1.0);
                let size = ((ux - ox).powi(2) + (uy - oy).powi(2)).sqrt();
                let (_, baseline) = self.geometry.to_page(ox, oy);
                let font_size = state.font_size;
                let color = state.fill;
                let order = self.next_order();

                self.layout.glyphs.push(Glyph {
                    text: font.text(code.value),
                    bbox,
                    baseline,
                    size,
                    advance,
                    font_size,
                    color,
                    visible,
                    order,
                    source: GlyphSource {
                        stream: self.stream,
                        op_index,
                        element,
                        byte: code.offset,
                        len: code.len,
                    },
                });
            }
            self.advance(advance);
        }
    }

    // ---- XObjects ----

    fn unit_square(&self) -> Option<Rect> {
        let unit = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        self.geometry.map_points(&self.state.ctm, &unit)
    }

    fn place(&mut self, op_index: usize, name: &[u8], bbox: Rect) {
        self.layout.placements.push(Placement {
            stream: self.stream,
            op_index,
            name: name.to_vec(),
            bbox,
        });
    }

    fn place_image(&mut self, op_index: usize, name: &[u8], source: Arc<ImageSource>) {
        let Some(bbox) = self.unit_square() else {
            return;
        };
        self.place(op_index, name, bbox);
        let Some(to_unit) = self.state.ctm.invert() else {
            return;
        };
        let order = self.next_order();
        self.layout.images.push(ImagePlacement {
            order,
            stream: self.stream,
            op_index,
            bbox,
            inverse: self.geometry.page_to_user().then(&to_unit),
            source,
        });
    }

    /// Stream index for a form reached through `path`, shared by repeated invocations
    fn form_stream(&mut self, path: &[Vec<u8>], form: &Arc<FormXObject>) -> usize {
        let existing = self.layout.streams.iter().position(|kind| {
            matches!(kind, StreamKind::Form { path: known, .. } if known.as_slice() == path)
        });
        existing.unwrap_or_else(|| {
            self.layout.streams.push(StreamKind::Form {
                path: path.to_vec(),
                form: Arc::clone(form),
            });
            self.layout.streams.len() - 1
        })
    }

    fn run_form(&mut self, op_index: usize, name: &[u8], form: Arc<FormXObject>) {
        if self.depth >= MAX_FORM_DEPTH {
            return;
        }
        let matrix = form.matrix.then(&self.state.ctm);
        let bbox = match form.bbox {
            Some([x0, y0, x1, y1]) => self.geometry.map_points(&matrix, &[(x0, y0), (x1, y0), (x0, y1), (x1, y1)]),
            None => Some(self.geometry.rect()),
        };
        if let Some(bbox) = bbox {
            self.place(op_index, name, bbox);
        }

        let saved_state = self.state.clone();
        let saved_stack = std::mem::take(&mut self.stack);
        let saved_text = (self.text_matrix, self.line_matrix);
        let saved_path = std::mem::take(&mut self.path);
        let saved_resources = std::mem::replace(&mut self.resources, Arc::clone(&form.resources));
        let saved_stream = self.stream;

        self.form_path.push(name.to_vec());
        let path = self.form_path.clone();
        self.stream = self.form_stream(&path, &form);
        self.state.ctm = matrix;
        self.depth += 1;

        self.run(&form.content.operations);

        self.depth -= 1;
        self.form_path.pop();
        self.state = saved_state;
        self.stack = saved_stack;
        (self.text_matrix, self.line_matrix) = saved_text;
        self.path = saved_path;
        self.resources = saved_resources;
        self.stream = saved_stream;
    }
}

/// Interpret fill color operands by component count
fn color_from(components: &[f32]) -> Option<Color> {
    match *components {
        [gray] => Some(Color::gray(gray)),
        [r, g, b] => Some(Color::new(r, g, b)),
        [c, m, y, k] => Some(Color::from_cmyk(c, m, y, k)),
        _ => None,
    }
}
