//! Image XObject and inline image decoding
//!
//! Turns image samples into an RGB buffer for the rasterizer. Supported:
//!
//! - Filters: none, `FlateDecode`, `LZWDecode`, `ASCII85Decode` (via lopdf)
//!   and `DCTDecode` (via the `image` crate's JPEG decoder)
//! - Color spaces: gray, RGB, CMYK, `ICCBased` (by component count),
//!   `Indexed`, and names defined in the resource `/ColorSpace` dictionary
//! - 1, 2, 4, 8 and 16 bits per component, with `/Decode` arrays
//!
//! Stencil masks, JPEG 2000, CCITT and JBIG2 images are not decoded; the
//! rasterizer leaves their area untouched.

use image::{ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};

use super::objects::{number, resolve, resolve_dict, resolve_number, stream_data};
use super::types::Color;

/// Largest image (in pixels) decoded for rendering
pub const MAX_IMAGE_PIXELS: u64 = 16_000_000;

/// Nesting limit for color spaces defined in terms of other color spaces
const MAX_COLOR_SPACE_DEPTH: usize = 4;

// ============================================================
// Color Models
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette entries are `base` components, one byte each
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    /// Resolve a `/ColorSpace` value. `named` is the resource `/ColorSpace`
    /// dictionary used for names that are not device spaces.
    pub fn resolve(doc: &Document, object: &Object, named: Option<&Dictionary>) -> Option<Self> {
        Self::resolve_at(doc, object, named, 0)
    }

    fn resolve_at(doc: &Document, object: &Object, named: Option<&Dictionary>, depth: usize) -> Option<Self> {
        if depth > MAX_COLOR_SPACE_DEPTH {
            return None;
        }
        match resolve(doc, object)? {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
                b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
                b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
                other => {
                    let defined = named?.get(other).ok()?;
                    Self::resolve_at(doc, defined, None, depth + 1)
                }
            },
            Object::Array(items) => {
                let family = items.first()?.as_name().ok()?;
                match family {
                    b"CalGray" => Some(ColorModel::Gray),
                    b"CalRGB" => Some(ColorModel::Rgb),
                    b"ICCBased" => {
                        let profile = resolve_dict(doc, items.get(1)?)?;
                        if let Some(alternate) = profile
                            .get(b"Alternate")
                            .ok()
                            .and_then(|alt| Self::resolve_at(doc, alt, named, depth + 1))
                        {
                            return Some(alternate);
                        }
                        match profile.get(b"N").ok().and_then(|n| resolve_number(doc, n))? as i64 {
                            1 => Some(ColorModel::Gray),
                            3 => Some(ColorModel::Rgb),
                            4 => Some(ColorModel::Cmyk),
                            _ => None,
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = Self::resolve_at(doc, items.get(1)?, named, depth + 1)?;
                        let hival = resolve_number(doc, items.get(2)?)?.clamp(0.0, 255.0) as usize;
                        let palette = match resolve(doc, items.get(3)?)? {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(stream) => stream_data(stream)?,
                            _ => return None,
                        };
                        let wanted = (hival + 1) * base.components();
                        Some(ColorModel::Indexed {
                            base: Box::new(base),
                            palette: palette.into_iter().take(wanted).collect(),
                        })
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Components per sample
    pub fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }

    fn guess(components: usize) -> Option<Self> {
        match components {
            1 => Some(ColorModel::Gray),
            3 => Some(ColorModel::Rgb),
            4 => Some(ColorModel::Cmyk),
            _ => None,
        }
    }

    /// Convert decoded components (each in `0..=1`, or a palette index) to RGB
    fn to_rgb(&self, values: &[f32]) -> [u8; 3] {
        match self {
            ColorModel::Gray => Color::gray(values[0]).to_rgb8(),
            ColorModel::Rgb => Color::new(values[0], values[1], values[2]).to_rgb8(),
            ColorModel::Cmyk => Color::from_cmyk(values[0], values[1], values[2], values[3]).to_rgb8(),
            ColorModel::Indexed { base, palette } => {
                let n = base.components();
                let start = values[0].max(0.0) as usize * n;
                match palette.get(start..start + n) {
                    Some(entry) => {
                        let mut components = [0.0f32; 4];
                        for (slot, byte) in components.iter_mut().zip(entry) {
                            *slot = *byte as f32 / 255.0;
                        }
                        base.to_rgb(&components[..n])
                    }
                    None => Color::BLACK.to_rgb8(),
                }
            }
        }
    }
}

// ============================================================
// Image Sources
// ============================================================

/// An image XObject or inline image ready to be decoded
#[derive(Debug, Clone)]
pub struct ImageSource {
    stream: Stream,
    color: Option<ColorModel>,
}

impl ImageSource {
    /// `color_spaces` is the `/ColorSpace` resource dictionary in effect
    pub fn new(doc: &Document, stream: Stream, color_spaces: Option<&Dictionary>) -> Self {
        let color = stream
            .dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| ColorModel::resolve(doc, cs, color_spaces));
        Self { stream, color }
    }

    /// Inline image from its (expanded) dictionary and sample bytes
    pub fn inline(doc: &Document, dict: &Dictionary, data: &[u8], color_spaces: Option<&Dictionary>) -> Self {
        Self::new(doc, Stream::new(dict.clone(), data.to_vec()), color_spaces)
    }

    pub fn width(&self) -> u32 {
        self.dimension(b"Width")
    }

    pub fn height(&self) -> u32 {
        self.dimension(b"Height")
    }

    fn dimension(&self, key: &[u8]) -> u32 {
        self.stream
            .dict
            .get(key)
            .ok()
            .and_then(number)
            .map_or(0, |v| v.max(0.0) as u32)
    }

    fn filters(&self) -> Vec<Vec<u8>> {
        match self.stream.dict.get(b"Filter") {
            Ok(Object::Name(name)) => vec![name.clone()],
            Ok(Object::Array(names)) => names
                .iter()
                .filter_map(|n| n.as_name().ok().map(<[u8]>::to_vec))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decode to RGB, `None` when the image uses an unsupported encoding
    pub fn decode(&self) -> Option<RgbImage> {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 || width as u64 * height as u64 > MAX_IMAGE_PIXELS {
            return None;
        }
        if matches!(self.stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
            return None;
        }

        let filters = self.filters();
        if filters.iter().any(|f| matches!(f.as_slice(), b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode")) {
            return None;
        }
        if filters.last().is_some_and(|f| f == b"DCTDecode") {
            return self.decode_jpeg(&filters);
        }

        let data = stream_data(&self.stream)?;
        self.decode_samples(&data, width, height)
    }

    fn decode_jpeg(&self, filters: &[Vec<u8>]) -> Option<RgbImage> {
        let encoded = if filters.len() == 1 {
            self.stream.content.clone()
        } else {
            let mut outer = self.stream.clone();
            outer.dict.set(
                "Filter",
                Object::Array(filters[..filters.len() - 1].iter().map(|f| Object::Name(f.clone())).collect()),
            );
            stream_data(&outer)?
        };
        match image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg) {
            Ok(image) => Some(image.to_rgb8()),
            Err(e) => {
                tracing::debug!(error = %e, "JPEG image could not be decoded");
                None
            }
        }
    }

    fn decode_samples(&self, data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
        let bits = self
            .stream
            .dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(number)
            .map_or(8, |b| b as usize);
        if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
            return None;
        }

        let pixels = width as usize * height as usize;
        let color = match &self.color {
            Some(color) => color.clone(),
            // Unknown space: infer the component count from the data size
            None => ColorModel::guess(data.len() * 8 / bits / pixels)?,
        };
        let components = color.components();
        let stride = (width as usize * components * bits).div_ceil(8);
        if data.len() < stride * height as usize {
            tracing::debug!(
                expected = stride * height as usize,
                found = data.len(),
                "Image data is shorter than its dimensions"
            );
            return None;
        }

        let max = ((1u32 << bits) - 1) as f32;
        let indexed = matches!(color, ColorModel::Indexed { .. });
        let decode = self.decode_ranges(components, indexed, max);

        let mut image = RgbImage::new(width, height);
        let mut values = [0.0f32; 4];
        for y in 0..height as usize {
            let row = &data[y * stride..(y + 1) * stride];
            for x in 0..width as usize {
                for (c, slot) in values.iter_mut().enumerate().take(components) {
                    let raw = sample(row, x * components + c, bits) as f32;
                    let (lo, hi) = decode[c];
                    *slot = lo + raw * (hi - lo) / max;
                }
                let rgb = color.to_rgb(&values[..components]);
                image.put_pixel(x as u32, y as u32, Rgb(rgb));
            }
        }
        Some(image)
    }

    /// Per-component `(low, high)` output range for samples `0..=max`
    fn decode_ranges(&self, components: usize, indexed: bool, max: f32) -> Vec<(f32, f32)> {
        let default = if indexed { (0.0, max) } else { (0.0, 1.0) };
        let given: Vec<f32> = match self.stream.dict.get(b"Decode") {
            Ok(Object::Array(items)) => items.iter().filter_map(number).collect(),
            _ => Vec::new(),
        };
        (0..components)
            .map(|c| match given.get(2 * c..2 * c + 2) {
                Some([lo, hi]) => (*lo, *hi),
                _ => default,
            })
            .collect()
    }
}

/// Read the `index`-th sample of a packed row
fn sample(row: &[u8], index: usize, bits: usize) -> u32 {
    match bits {
        8 => row[index] as u32,
        16 => ((row[2 * index] as u32) << 8) | row[2 * index + 1] as u32,
        _ => {
            let bit = index * bits;
            let byte = row[bit / 8];
            let shift = 8 - bits - bit % 8;
            ((byte >> shift) as u32) & ((1 << bits) - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};
    use std::io::Cursor;

    fn source_of(dict: Dictionary, data: Vec<u8>) -> ImageSource {
        let doc = Document::with_version("1.5");
        ImageSource::new(&doc, Stream::new(dict, data), None)
    }

    #[test]
    fn test_gray_samples() {
        let source = source_of(
            dictionary! {
                "Width" => 2, "Height" => 1, "BitsPerComponent" => 8, "ColorSpace" => "DeviceGray",
            },
            vec![0, 128],
        );
        let decoded = source.decode().unwrap();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [128, 128, 128]);
    }

    #[test]
    fn test_one_bit_with_inverted_decode() {
        let source = source_of(
            dictionary! {
                "Width" => 3, "Height" => 2, "BitsPerComponent" => 1, "ColorSpace" => "DeviceGray",
                "Decode" => vec![1.into(), 0.into()],
            },
            // Rows are padded to whole bytes
            vec![0b1010_0000, 0b0100_0000],
        );
        let decoded = source.decode().unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 0]);
    }

    #[test]
    fn test_indexed_palette() {
        let source = source_of(
            dictionary! {
                "Width" => 2, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => vec![
                    "Indexed".into(),
                    "DeviceRGB".into(),
                    1.into(),
                    Object::String(vec![255, 0, 0, 0, 0, 255], StringFormat::Hexadecimal),
                ],
            },
            vec![1, 0],
        );
        let decoded = source.decode().unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_compressed_rgb_and_named_color_space() {
        let mut doc = Document::with_version("1.5");
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 4, "Height" => 4, "BitsPerComponent" => 8, "ColorSpace" => "CS0",
            },
            [10u8, 200, 30].repeat(16),
        );
        stream.compress().unwrap();
        let profile = doc.add_object(Stream::new(dictionary! { "N" => 3 }, Vec::new()));
        let spaces = dictionary! { "CS0" => vec!["ICCBased".into(), profile.into()] };

        let source = ImageSource::new(&doc, stream, Some(&spaces));
        let decoded = source.decode().unwrap();
        assert_eq!(decoded.get_pixel(3, 3).0, [10, 200, 30]);
    }

    #[test]
    fn test_missing_color_space_is_inferred() {
        let source = source_of(dictionary! { "Width" => 1, "Height" => 1 }, vec![1, 2, 3]);
        assert_eq!(source.decode().unwrap().get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_jpeg_data() {
        let solid = RgbImage::from_pixel(16, 16, Rgb([40, 90, 200]));
        let mut jpeg = Cursor::new(Vec::new());
        solid.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();

        let source = source_of(
            dictionary! {
                "Width" => 16, "Height" => 16, "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceRGB", "Filter" => "DCTDecode",
            },
            jpeg.into_inner(),
        );
        let decoded = source.decode().unwrap();
        let [r, g, b] = decoded.get_pixel(8, 8).0;
        assert!(r.abs_diff(40) < 8 && g.abs_diff(90) < 8 && b.abs_diff(200) < 8);
    }

    #[test]
    fn test_unsupported_images_are_skipped() {
        let mask = source_of(
            dictionary! { "Width" => 1, "Height" => 1, "ImageMask" => true },
            vec![0],
        );
        assert!(mask.decode().is_none());

        let fax = source_of(
            dictionary! { "Width" => 8, "Height" => 1, "Filter" => "CCITTFaxDecode" },
            vec![0],
        );
        assert!(fax.decode().is_none());

        let short = source_of(
            dictionary! { "Width" => 4, "Height" => 4, "ColorSpace" => "DeviceRGB" },
            vec![0; 10],
        );
        assert!(short.decode().is_none());
    }
}
