//! Approximate page rasterizer
//!
//! Paints the recorded layout onto an RGB canvas in content order: filled
//! rectangles and polygons in their own color, images resampled from their
//! decoded pixels, and every visible glyph as a solid box in its fill color.
//! The output is good enough for previews and background sampling; it is not
//! a faithful renderer.
//!
//! # Features
//!
//! - Arbitrary resolution (`dpi / 72` scale)
//! - Clip rectangle in page space
//! - Nearest-neighbour image sampling through the inverse placement matrix
//! - PNG encoding

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;

use super::content::{ImagePlacement, PageLayout};
use super::types::{Color, DocumentError, Rect, Result};

/// Resolution of PDF user space
pub const BASE_DPI: f32 = 72.0;

/// Largest canvas side the rasterizer will allocate
pub const MAX_DIMENSION: u32 = 20_000;

/// Something painted on the canvas
enum Paint<'a> {
    Rect(Rect, Color),
    Polygon(&'a [(f32, f32)], Color),
    Image(&'a ImagePlacement),
}

/// Canvas size and the page-space area it shows
struct Viewport {
    clip: Rect,
    scale: f32,
    width: u32,
    height: u32,
}

impl Viewport {
    fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.clip.x0) * self.scale, (y - self.clip.y0) * self.scale)
    }

    /// Page-space position of a pixel center
    fn to_page(&self, px: u32, py: u32) -> (f32, f32) {
        (
            self.clip.x0 + (px as f32 + 0.5) / self.scale,
            self.clip.y0 + (py as f32 + 0.5) / self.scale,
        )
    }

    fn span(&self, rect: &Rect) -> Option<((u32, u32), (u32, u32))> {
        let xs = pixel_span(rect.x0, rect.x1, self.clip.x0, self.scale, self.width)?;
        let ys = pixel_span(rect.y0, rect.y1, self.clip.y0, self.scale, self.height)?;
        Some((xs, ys))
    }
}

/// Render `clip` (page space, `None` = whole page) at `dpi`
pub fn render(layout: &PageLayout, page: &Rect, dpi: f32, clip: Option<&Rect>) -> Result<RgbImage> {
    if !(dpi.is_finite() && dpi > 0.0) {
        return Err(DocumentError::Render(format!("invalid resolution: {dpi}")));
    }
    let clip = clip.copied().unwrap_or(*page);
    if clip.is_empty() {
        return Err(DocumentError::Render("empty clip rectangle".to_string()));
    }

    let scale = dpi / BASE_DPI;
    let width = ((clip.width() * scale).round() as u32).max(1);
    let height = ((clip.height() * scale).round() as u32).max(1);
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DocumentError::Render(format!(
            "canvas too large: {width}x{height}"
        )));
    }
    let view = Viewport {
        clip,
        scale,
        width,
        height,
    };

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(Color::WHITE.to_rgb8()));

    let mut paints: Vec<(usize, Paint<'_>)> = Vec::new();
    paints.extend(layout.fills.iter().map(|f| (f.order, Paint::Rect(f.rect, f.color))));
    paints.extend(
        layout
            .shapes
            .iter()
            .map(|s| (s.order, Paint::Polygon(&s.points, s.color))),
    );
    paints.extend(layout.images.iter().map(|i| (i.order, Paint::Image(i))));
    paints.extend(
        layout
            .glyphs
            .iter()
            .filter(|g| g.visible && !g.is_blank())
            .map(|g| (g.order, Paint::Rect(g.bbox, g.color))),
    );
    paints.sort_by_key(|(order, _)| *order);

    for (_, paint) in &paints {
        match paint {
            Paint::Rect(rect, color) => paint_rect(&mut canvas, &view, rect, *color),
            Paint::Polygon(points, color) => paint_polygon(&mut canvas, &view, points, *color),
            Paint::Image(placed) => paint_image(&mut canvas, &view, placed),
        }
    }

    Ok(canvas)
}

fn paint_rect(canvas: &mut RgbImage, view: &Viewport, rect: &Rect, color: Color) {
    let Some(((x0, x1), (y0, y1))) = view.span(rect) else {
        return;
    };
    let area = imageproc::rect::Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
    draw_filled_rect_mut(canvas, area, Rgb(color.to_rgb8()));
}

fn paint_polygon(canvas: &mut RgbImage, view: &Viewport, points: &[(f32, f32)], color: Color) {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let (cx, cy) = view.to_canvas(x, y);
        let point = Point::new(cx.round() as i32, cy.round() as i32);
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }
    // The polygon is closed implicitly; a repeated first point is not allowed
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() < 3 {
        return;
    }
    draw_polygon_mut(canvas, &polygon, Rgb(color.to_rgb8()));
}

fn paint_image(canvas: &mut RgbImage, view: &Viewport, placed: &ImagePlacement) {
    let Some(((x0, x1), (y0, y1))) = view.span(&placed.bbox) else {
        return;
    };
    let Some(pixels) = placed.source.decode() else {
        tracing::trace!(op_index = placed.op_index, "Image not decoded, area left as is");
        return;
    };
    let (width, height) = pixels.dimensions();

    for py in y0..y1 {
        for px in x0..x1 {
            let (x, y) = view.to_page(px, py);
            let (u, v) = placed.inverse.apply(x, y);
            if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
                continue;
            }
            // Image row 0 is the top of the unit square
            let sx = ((u * width as f32) as u32).min(width - 1);
            let sy = (((1.0 - v) * height as f32) as u32).min(height - 1);
            canvas.put_pixel(px, py, *pixels.get_pixel(sx, sy));
        }
    }
}

/// Pixels whose centers fall inside `[from, to)` after mapping to the canvas
fn pixel_span(from: f32, to: f32, origin: f32, scale: f32, limit: u32) -> Option<(u32, u32)> {
    let start = ((from - origin) * scale - 0.5).ceil().max(0.0);
    let end = ((to - origin) * scale - 0.5).ceil().min(limit as f32);
    (end > start).then_some((start as u32, end as u32))
}

/// Encode a rendered page as PNG
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| DocumentError::Render(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::document::content::{interpret, PageGeometry};
    use crate::document::resources::Resources;
    use lopdf::{dictionary, Document, Stream};

    fn layout_in(doc: &Document, resources: &Arc<Resources>, stream: &[u8]) -> PageLayout {
        let content = crate::document::stream::decode(stream).unwrap();
        interpret(doc, &content.operations, resources, &PageGeometry::LETTER)
    }

    fn layout_of(stream: &str) -> PageLayout {
        let doc = Document::with_version("1.5");
        layout_in(&doc, &Arc::new(Resources::default()), stream.as_bytes())
    }

    /// Document whose page resources hold a 2x1 gray image `Im0` (black, white)
    fn image_resources() -> (Document, Arc<Resources>) {
        let mut doc = Document::with_version("1.5");
        let image = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 2, "Height" => 1, "BitsPerComponent" => 8, "ColorSpace" => "DeviceGray",
            },
            vec![0, 255],
        ));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image } },
        });
        let resources = Resources::for_page(&doc, page);
        (doc, resources)
    }

    #[test]
    fn test_blank_page_is_white() {
        let page = PageGeometry::LETTER.rect();
        let image = render(&PageLayout::default(), &page, 72.0, None).unwrap();
        assert_eq!(image.dimensions(), (612, 792));
        assert_eq!(image.get_pixel(300, 400), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_dimensions_scale_with_dpi() {
        let page = PageGeometry::LETTER.rect();
        let image = render(&PageLayout::default(), &page, 150.0, None).unwrap();
        // 612 * 150 / 72 = 1275, 792 * 150 / 72 = 1650
        assert_eq!(image.dimensions(), (1275, 1650));
    }

    #[test]
    fn test_fill_painted_in_order() {
        let layout = layout_of("0.5 g 0 0 612 792 re f 1 0 0 rg 0 0 100 100 re f");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        assert_eq!(image.get_pixel(300, 300), &Rgb(Color::gray(0.5).to_rgb8()));
        // Red square sits in the bottom-left corner of the page
        assert_eq!(image.get_pixel(10, 785), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_clip_single_pixel() {
        let layout = layout_of("0.9 g 0 0 612 792 re f");
        let page = PageGeometry::LETTER.rect();
        let clip = Rect::new(0.0, 782.0, 1.0, 783.0);
        let image = render(&layout, &page, 72.0, Some(&clip)).unwrap();
        assert_eq!(image.dimensions(), (1, 1));
        assert_eq!(image.get_pixel(0, 0), &Rgb(Color::gray(0.9).to_rgb8()));
    }

    #[test]
    fn test_glyphs_are_painted() {
        let layout = layout_of("BT /F1 40 Tf 100 600 Td (M) Tj ET");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        // Baseline at y = 192, glyph extends above it
        assert_eq!(image.get_pixel(110, 180), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_invalid_resolution() {
        let page = PageGeometry::LETTER.rect();
        assert!(render(&PageLayout::default(), &page, 0.0, None).is_err());
    }

    #[test]
    fn test_encode_png_signature() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_polygon_fill() {
        let layout = layout_of("1 0 0 rg 0 792 m 100 792 l 0 692 l h f");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        // Triangle in the top-left corner, right angle at the origin
        assert_eq!(image.get_pixel(10, 10), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(90, 90), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_image_is_sampled_into_its_placement() {
        let (doc, resources) = image_resources();
        let layout = layout_in(&doc, &resources, b"q 100 0 0 50 0 742 cm /Im0 Do Q");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        // Left half of the placement is the black sample, right half white
        assert_eq!(image.get_pixel(25, 25), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(75, 25), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(25, 60), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_flipped_image_placement() {
        let (doc, resources) = image_resources();
        let layout = layout_in(&doc, &resources, b"q -100 0 0 50 100 742 cm /Im0 Do Q");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        assert_eq!(image.get_pixel(25, 25), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(75, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_later_paint_covers_image() {
        let (doc, resources) = image_resources();
        let layout = layout_in(&doc, &resources, b"q 100 0 0 50 0 742 cm /Im0 Do Q 0 0 1 rg 0 782 10 10 re f");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        assert_eq!(image.get_pixel(5, 5), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(15, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_inline_image_is_painted() {
        let doc = Document::with_version("1.5");
        let resources = Arc::new(Resources::default());
        let layout = layout_in(&doc, &resources, b"q 10 0 0 10 100 100 cm BI /W 1 /H 1 /CS /G /BPC 8 ID \x80 EI Q");
        let page = PageGeometry::LETTER.rect();
        let image = render(&layout, &page, 72.0, None).unwrap();
        assert_eq!(image.get_pixel(105, 687), &Rgb([128, 128, 128]));
        assert_eq!(image.get_pixel(115, 687), &Rgb([255, 255, 255]));
    }
}
