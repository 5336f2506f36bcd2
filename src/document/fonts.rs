//! Font metrics and character decoding for glyph positioning
//!
//! Simple fonts use one byte per character code. Widths come from the font
//! dictionary's `/Widths` array when present, otherwise from built-in
//! Helvetica or Courier metrics chosen by `/BaseFont`.
//!
//! Composite (`Type0`) fonts use two-byte codes (`Identity-H` and most
//! predefined CMaps) or the code length declared by an embedded encoding
//! CMap. Their widths come from the descendant font's `/W` and `/DW`.
//!
//! Text is taken from `/ToUnicode` when the font has one, then from
//! `/Differences` glyph names, then from WinAnsi for simple fonts.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use super::objects::{resolve, resolve_dict, resolve_number, stream_data};

// ============================================================
// Constants
// ============================================================

/// Helvetica advance widths for codes 32..=126 (1/1000 em)
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Fallback width for codes outside the built-in table
const DEFAULT_GLYPH_WIDTH: f32 = 556.0;

/// Monospace width used for Courier-family fonts
const COURIER_WIDTH: f32 = 600.0;

/// Width of CIDs missing from `/W` when the font has no `/DW`
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Default ascent/descent (1/1000 em) when no descriptor is available
const DEFAULT_ASCENT: f32 = 718.0;
const DEFAULT_DESCENT: f32 = -207.0;

/// Largest `bfrange` or `/W` range expanded into a lookup table
const MAX_RANGE: u32 = 0xFFFF;

/// Text for codes a composite font gives no Unicode mapping for
const UNMAPPED: char = '\u{FFFD}';

// ============================================================
// Font Metrics
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum BuiltinMetrics {
    Helvetica,
    Courier,
}

/// One character code of a shown string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCode {
    /// Byte offset inside the string
    pub offset: usize,
    /// Bytes the code occupies
    pub len: usize,
    pub value: u32,
}

/// Width, vertical extent and text decoding for one font resource
#[derive(Debug, Clone)]
pub struct FontMetrics {
    first_char: u32,
    widths: Vec<f32>,
    missing_width: Option<f32>,
    builtin: BuiltinMetrics,
    /// Bytes per code; 1 for simple fonts
    code_len: usize,
    cid_widths: HashMap<u32, f32>,
    default_cid_width: f32,
    to_unicode: HashMap<u32, String>,
    differences: HashMap<u32, char>,
    /// Ascent in 1/1000 em
    pub ascent: f32,
    /// Descent in 1/1000 em (negative)
    pub descent: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            missing_width: None,
            builtin: BuiltinMetrics::Helvetica,
            code_len: 1,
            cid_widths: HashMap::new(),
            default_cid_width: DEFAULT_CID_WIDTH,
            to_unicode: HashMap::new(),
            differences: HashMap::new(),
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }
}

impl FontMetrics {
    /// Read metrics from a font dictionary
    pub fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let mut metrics = FontMetrics::default();
        let composite = matches!(font.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Type0");

        // Composite fonts keep widths and descriptor on the descendant
        let descendant = composite
            .then(|| descendant_font(doc, font))
            .flatten();
        let metrics_dict = descendant.unwrap_or(font);

        if let Ok(Object::Name(base)) = metrics_dict.get(b"BaseFont").or_else(|_| font.get(b"BaseFont")) {
            if String::from_utf8_lossy(base).contains("Courier") {
                metrics.builtin = BuiltinMetrics::Courier;
            }
        }

        if composite {
            metrics.code_len = font
                .get(b"Encoding")
                .ok()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_stream().ok())
                .and_then(stream_data)
                .and_then(|bytes| codespace_len(&bytes))
                .unwrap_or(2);
            if let Some(dw) = metrics_dict.get(b"DW").ok().and_then(|o| resolve_number(doc, o)) {
                metrics.default_cid_width = dw;
            }
            if let Some(Object::Array(w)) = metrics_dict.get(b"W").ok().and_then(|o| resolve(doc, o)) {
                metrics.cid_widths = cid_widths(doc, w);
            }
        } else {
            if let Some(first) = font.get(b"FirstChar").ok().and_then(|o| resolve_number(doc, o)) {
                metrics.first_char = first.max(0.0) as u32;
            }
            if let Some(Object::Array(widths)) = font.get(b"Widths").ok().and_then(|o| resolve(doc, o)) {
                metrics.widths = widths
                    .iter()
                    .map(|w| resolve_number(doc, w).unwrap_or(0.0))
                    .collect();
            }
            if let Some(encoding) = font.get(b"Encoding").ok().and_then(|o| resolve_dict(doc, o)) {
                if let Some(Object::Array(diffs)) = encoding.get(b"Differences").ok().and_then(|o| resolve(doc, o)) {
                    metrics.differences = differences(diffs);
                }
            }
        }

        if let Some(descriptor) = metrics_dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve_dict(doc, o))
        {
            let read = |key: &[u8]| descriptor.get(key).ok().and_then(|o| resolve_number(doc, o));
            metrics.missing_width = read(b"MissingWidth");
            if let Some(ascent) = read(b"Ascent").filter(|a| *a > 0.0) {
                metrics.ascent = ascent;
            }
            if let Some(descent) = read(b"Descent").filter(|d| *d < 0.0) {
                metrics.descent = descent;
            }
        }

        if let Some(cmap) = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
            .and_then(stream_data)
        {
            metrics.to_unicode = parse_to_unicode(&cmap);
        }

        metrics
    }

    pub fn is_composite(&self) -> bool {
        self.code_len > 1
    }

    /// Split a shown string into character codes
    pub fn codes(&self, bytes: &[u8]) -> Vec<CharCode> {
        bytes
            .chunks(self.code_len)
            .enumerate()
            .map(|(i, chunk)| CharCode {
                offset: i * self.code_len,
                len: chunk.len(),
                value: chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
            })
            .collect()
    }

    /// Advance width of a character code in 1/1000 em
    pub fn width(&self, code: u32) -> f32 {
        if self.is_composite() {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_cid_width);
        }
        if code >= self.first_char {
            if let Some(width) = self.widths.get((code - self.first_char) as usize) {
                return *width;
            }
        }
        if let Some(missing) = self.missing_width.filter(|_| !self.widths.is_empty()) {
            return missing;
        }
        match self.builtin {
            BuiltinMetrics::Courier => COURIER_WIDTH,
            BuiltinMetrics::Helvetica => (32..=126)
                .contains(&code)
                .then(|| HELVETICA_WIDTHS[(code - 32) as usize] as f32)
                .unwrap_or(DEFAULT_GLYPH_WIDTH),
        }
    }

    /// Unicode text of a character code, never empty
    pub fn text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code).filter(|t| !t.is_empty()) {
            return text.clone();
        }
        if self.is_composite() {
            return UNMAPPED.to_string();
        }
        match self.differences.get(&code) {
            Some(ch) => ch.to_string(),
            None => decode_char(code as u8).to_string(),
        }
    }
}

fn descendant_font<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    let Object::Array(fonts) = resolve(doc, font.get(b"DescendantFonts").ok()?)? else {
        return None;
    };
    resolve_dict(doc, fonts.first()?)
}

/// Expand a CID font `/W` array: `c [w1 w2 ...]` and `c_first c_last w`
fn cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(first) = resolve_number(doc, &w[i]).map(|v| v.max(0.0) as u32) else {
            break;
        };
        match w.get(i + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, value) in list.iter().enumerate() {
                    if let Some(width) = resolve_number(doc, value) {
                        widths.insert(first + offset as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) = (
                    resolve_number(doc, last).map(|v| v.max(0.0) as u32),
                    w.get(i + 2).and_then(|o| resolve_number(doc, o)),
                ) else {
                    break;
                };
                if last >= first && last - first <= MAX_RANGE {
                    for cid in first..=last {
                        widths.insert(cid, width);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Map `/Differences` glyph names to characters
fn differences(diffs: &[Object]) -> HashMap<u32, char> {
    let mut map = HashMap::new();
    let mut code = 0u32;
    for item in diffs {
        match item {
            Object::Integer(start) => code = (*start).max(0) as u32,
            Object::Name(name) => {
                if let Some(ch) = glyph_char(name) {
                    map.insert(code, ch);
                }
                code += 1;
            }
            _ => {}
        }
    }
    map
}

/// Character for a standard glyph name
fn glyph_char(name: &[u8]) -> Option<char> {
    if let [single] = name {
        return single.is_ascii_alphabetic().then_some(*single as char);
    }
    if let Some(hex) = name.strip_prefix(b"uni").filter(|h| h.len() == 4) {
        let value = u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?;
        return char::from_u32(value);
    }
    let ch = match name {
        b"space" => ' ',
        b"exclam" => '!',
        b"quotedbl" => '"',
        b"numbersign" => '#',
        b"dollar" => '$',
        b"percent" => '%',
        b"ampersand" => '&',
        b"quotesingle" => '\'',
        b"parenleft" => '(',
        b"parenright" => ')',
        b"asterisk" => '*',
        b"plus" => '+',
        b"comma" => ',',
        b"hyphen" => '-',
        b"period" => '.',
        b"slash" => '/',
        b"zero" => '0',
        b"one" => '1',
        b"two" => '2',
        b"three" => '3',
        b"four" => '4',
        b"five" => '5',
        b"six" => '6',
        b"seven" => '7',
        b"eight" => '8',
        b"nine" => '9',
        b"colon" => ':',
        b"semicolon" => ';',
        b"less" => '<',
        b"equal" => '=',
        b"greater" => '>',
        b"question" => '?',
        b"at" => '@',
        b"bracketleft" => '[',
        b"backslash" => '\\',
        b"bracketright" => ']',
        b"underscore" => '_',
        b"quoteleft" => '‘',
        b"quoteright" => '’',
        b"endash" => '–',
        b"emdash" => '—',
        b"bullet" => '•',
        _ => return None,
    };
    Some(ch)
}

// ============================================================
// CMaps
// ============================================================

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Word(Vec<u8>),
    Open,
    Close,
}

fn cmap_tokens(bytes: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if bytes.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if bytes.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = bytes[i..].iter().position(|&b| b == b'>').map_or(bytes.len(), |p| i + p);
                let digits: Vec<u8> = bytes[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                let decoded = digits
                    .chunks(2)
                    .filter_map(|pair| {
                        let text = std::str::from_utf8(pair).ok()?;
                        let value = u8::from_str_radix(text, 16).ok()?;
                        // A trailing odd digit is padded with 0
                        Some(if pair.len() == 1 { value << 4 } else { value })
                    })
                    .collect();
                tokens.push(CMapToken::Hex(decoded));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::Open);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::Close);
                i += 1;
            }
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'(' => {
                // Literal strings only appear in CMap headers
                let mut depth = 0;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < bytes.len() && !b" \t\r\n\x0c<>[]()%".contains(&bytes[i]) {
                    i += 1;
                }
                tokens.push(CMapToken::Word(bytes[start..i].to_vec()));
                if i == start {
                    i += 1;
                }
            }
        }
    }
    tokens
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [lo] => *lo as u16,
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// `dst` with its last UTF-16 unit advanced by `offset`
fn offset_text(dst: &[u8], offset: u32) -> String {
    let mut bytes = dst.to_vec();
    if bytes.len() >= 2 {
        let at = bytes.len() - 2;
        let last = u16::from_be_bytes([bytes[at], bytes[at + 1]]).wrapping_add(offset as u16);
        bytes[at..].copy_from_slice(&last.to_be_bytes());
    } else if let Some(last) = bytes.last_mut() {
        *last = last.wrapping_add(offset as u8);
    }
    utf16_text(&bytes)
}

/// Parse the `bfchar` and `bfrange` sections of a `/ToUnicode` CMap
pub fn parse_to_unicode(cmap: &[u8]) -> HashMap<u32, String> {
    let tokens = cmap_tokens(cmap);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(word) if word == b"beginbfchar" => {
                i += 1;
                while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) = (tokens.get(i), tokens.get(i + 1)) {
                    map.insert(code_value(src), utf16_text(dst));
                    i += 2;
                }
            }
            CMapToken::Word(word) if word == b"beginbfrange" => {
                i += 1;
                while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) = (tokens.get(i), tokens.get(i + 1)) {
                    let (lo, hi) = (code_value(lo), code_value(hi));
                    i += 2;
                    match tokens.get(i) {
                        Some(CMapToken::Hex(dst)) => {
                            if hi >= lo && hi - lo <= MAX_RANGE {
                                for code in lo..=hi {
                                    map.insert(code, offset_text(dst, code - lo));
                                }
                            }
                            i += 1;
                        }
                        Some(CMapToken::Open) => {
                            i += 1;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    map.insert(code, utf16_text(dst));
                                }
                                code += 1;
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::Close) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }
    map
}

/// Code length from the first `codespacerange` entry of an encoding CMap
fn codespace_len(cmap: &[u8]) -> Option<usize> {
    let tokens = cmap_tokens(cmap);
    let start = tokens
        .iter()
        .position(|t| matches!(t, CMapToken::Word(w) if w == b"begincodespacerange"))?;
    match tokens.get(start + 1)? {
        CMapToken::Hex(lo) if (1..=4).contains(&lo.len()) => Some(lo.len()),
        _ => None,
    }
}

// ============================================================
// Font Tables
// ============================================================

/// Font metrics keyed by resource name (e.g. `F1`)
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    fonts: HashMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
}

impl FontTable {
    /// Load the `/Font` entries of a resource dictionary
    pub fn from_resources(doc: &Document, resources: &Dictionary) -> Self {
        let mut table = FontTable::default();
        let Some(fonts) = resources.get(b"Font").ok().and_then(|o| resolve_dict(doc, o)) else {
            return table;
        };

        for (name, value) in fonts.iter() {
            if let Some(font) = resolve_dict(doc, value) {
                table
                    .fonts
                    .insert(name.clone(), FontMetrics::from_dict(doc, font));
            }
        }
        table
    }

    /// Metrics for a resource name, falling back to Helvetica
    pub fn get(&self, name: &[u8]) -> &FontMetrics {
        self.fonts.get(name).unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Decode a single-byte string code to a character (WinAnsi / Latin-1)
pub fn decode_char(code: u8) -> char {
    match code {
        0x80 => '€',
        0x85 => '…',
        0x91 => '‘',
        0x92 => '’',
        0x93 => '“',
        0x94 => '”',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x99 => '™',
        other => other as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    const TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin\n\
        12 dict begin\nbegincmap\n\
        1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
        2 beginbfchar\n<0003> <0020>\n<0010> <00660069>\nendbfchar\n\
        2 beginbfrange\n<0024> <003D> <0041>\n<0050> <0052> [<0078> <0079> <007A>]\nendbfrange\n\
        endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend";

    fn composite_font(doc: &mut Document) -> Dictionary {
        let cmap_id = doc.add_object(Stream::new(dictionary! {}, TO_UNICODE.as_bytes().to_vec()));
        let descendant = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Fixture",
            "DW" => 500,
            "W" => vec![
                36.into(), vec![600.into(), 700.into()].into(),
                80.into(), 82.into(), 300.into(),
            ],
        });
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Fixture",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![descendant.into()],
            "ToUnicode" => cmap_id,
        }
    }

    #[test]
    fn test_helvetica_builtin_widths() {
        let metrics = FontMetrics::default();
        assert_eq!(metrics.width(' ' as u32), 278.0);
        assert_eq!(metrics.width('A' as u32), 667.0);
        assert_eq!(metrics.width('i' as u32), 222.0);
        assert_eq!(metrics.width('~' as u32), 584.0);
        assert_eq!(metrics.width(200), DEFAULT_GLYPH_WIDTH);
    }

    #[test]
    fn test_widths_array_takes_precedence() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "Arial",
            "FirstChar" => 65,
            "Widths" => vec![500.into(), 600.into()],
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        assert_eq!(metrics.width('A' as u32), 500.0);
        assert_eq!(metrics.width('B' as u32), 600.0);
        // Outside the array: built-in fallback
        assert_eq!(metrics.width('C' as u32), 722.0);
    }

    #[test]
    fn test_courier_is_monospace() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier-Bold",
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        assert_eq!(metrics.width('i' as u32), 600.0);
        assert_eq!(metrics.width('W' as u32), 600.0);
    }

    #[test]
    fn test_composite_font_codes_and_widths() {
        let mut doc = Document::with_version("1.5");
        let font = composite_font(&mut doc);
        let metrics = FontMetrics::from_dict(&doc, &font);

        assert!(metrics.is_composite());
        let codes = metrics.codes(&[0x00, 0x24, 0x00, 0x25, 0x00, 0x03]);
        let values: Vec<u32> = codes.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![0x24, 0x25, 0x03]);
        assert_eq!(codes[1].offset, 2);
        assert_eq!(codes[1].len, 2);

        assert_eq!(metrics.width(0x24), 600.0);
        assert_eq!(metrics.width(0x25), 700.0);
        assert_eq!(metrics.width(81), 300.0);
        assert_eq!(metrics.width(0x03), 500.0);
    }

    #[test]
    fn test_to_unicode_maps_codes() {
        let mut doc = Document::with_version("1.5");
        let font = composite_font(&mut doc);
        let metrics = FontMetrics::from_dict(&doc, &font);

        assert_eq!(metrics.text(0x24), "A");
        assert_eq!(metrics.text(0x3D), "Z");
        assert_eq!(metrics.text(0x03), " ");
        assert_eq!(metrics.text(0x10), "fi");
        assert_eq!(metrics.text(0x51), "y");
        assert_eq!(metrics.text(0x99), UNMAPPED.to_string());
    }

    #[test]
    fn test_differences_override_winansi() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => dictionary! {
                "Type" => "Encoding",
                "Differences" => vec![1.into(), Object::Name(b"D".to_vec()), Object::Name(b"hyphen".to_vec())],
            },
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        assert!(!metrics.is_composite());
        assert_eq!(metrics.text(1), "D");
        assert_eq!(metrics.text(2), "-");
        assert_eq!(metrics.text('Q' as u32), "Q");
    }

    #[test]
    fn test_codespace_length() {
        let cmap = b"1 begincodespacerange <00> <FF> endcodespacerange";
        assert_eq!(codespace_len(cmap), Some(1));
        assert_eq!(codespace_len(b"no ranges"), None);
    }

    #[test]
    fn test_decode_char() {
        assert_eq!(decode_char(b'A'), 'A');
        assert_eq!(decode_char(0xE9), 'é');
        assert_eq!(decode_char(0x96), '–');
    }
}
