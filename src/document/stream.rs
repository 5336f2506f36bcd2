//! Content stream decoding and encoding
//!
//! `lopdf::content::Content` has no notion of inline images: it stops at the
//! binary data after `ID` and returns what it parsed so far. Streams are
//! therefore split first. Inline images (`BI … ID … EI`) are cut out and kept
//! byte for byte as a single `BI` operation, and the operator runs between
//! them are decoded by lopdf.
//!
//! Every run is also scanned with a small tokenizer. When lopdf returns fewer
//! operators than the tokenizer counted, or the tokenizer meets malformed
//! syntax, the decode is marked lossy and the operator list must not be
//! written back in place of the original stream.
//!
//! An inline image operation carries three operands:
//!
//! 1. the image dictionary with abbreviations expanded,
//! 2. the raw sample data,
//! 3. the original `BI … EI` bytes, written back verbatim by [`encode`].

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};

/// Operator name used for a preserved inline image
pub const INLINE_IMAGE: &str = "BI";

/// Decoded operators plus whether they describe the whole stream
#[derive(Debug, Clone, Default)]
pub struct DecodedContent {
    pub operations: Vec<Operation>,
    /// False when part of the stream could not be represented
    pub lossless: bool,
}

/// Decode a content stream, preserving inline images.
///
/// Fails only when lopdf rejects an operator run outright.
pub fn decode(bytes: &[u8]) -> Result<DecodedContent, String> {
    let (segments, clean) = split(bytes);
    let mut decoded = DecodedContent {
        operations: Vec::new(),
        lossless: clean,
    };

    for segment in segments {
        match segment {
            Segment::Operators { start, end, count } => {
                let run = &bytes[start..end];
                if count == 0 {
                    continue;
                }
                let content = if run.contains(&b'%') {
                    Content::decode(&blank_comments(run))
                } else {
                    Content::decode(run)
                }
                .map_err(|e| e.to_string())?;
                if content.operations.len() != count {
                    tracing::debug!(
                        expected = count,
                        decoded = content.operations.len(),
                        "Operator run decoded partially"
                    );
                    decoded.lossless = false;
                }
                decoded.operations.extend(content.operations);
            }
            Segment::InlineImage { header, data, raw } => {
                match inline_image(&bytes[header.0..header.1], &bytes[data.0..data.1], &bytes[raw.0..raw.1]) {
                    Some(op) => decoded.operations.push(op),
                    None => decoded.lossless = false,
                }
            }
        }
    }
    Ok(decoded)
}

/// Replace comments with spaces; lopdf's content parser stops at them
fn blank_comments(run: &[u8]) -> Vec<u8> {
    let mut out = run.to_vec();
    let mut i = 0;
    while i < out.len() {
        match out[i] {
            b'(' => {
                let mut depth = 0usize;
                while i < out.len() {
                    match out[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            b'<' if out.get(i + 1) == Some(&b'<') => i += 1,
            b'<' => {
                while i < out.len() && out[i] != b'>' {
                    i += 1;
                }
            }
            b'%' => {
                while i < out.len() && out[i] != b'\n' && out[i] != b'\r' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    out
}

/// Encode operators back to content bytes; inline images are written verbatim
pub fn encode(operations: &[Operation]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut run: Vec<Operation> = Vec::new();

    let flush = |run: &mut Vec<Operation>, out: &mut Vec<u8>| -> Result<(), String> {
        if run.is_empty() {
            return Ok(());
        }
        let content = Content {
            operations: std::mem::take(run),
        };
        out.extend(content.encode().map_err(|e| e.to_string())?);
        out.push(b'\n');
        Ok(())
    };

    for op in operations {
        match (op.operator.as_str(), op.operands.get(2)) {
            (INLINE_IMAGE, Some(Object::String(raw, _))) => {
                flush(&mut run, &mut out)?;
                out.extend_from_slice(raw);
                out.push(b'\n');
            }
            _ => run.push(op.clone()),
        }
    }
    flush(&mut run, &mut out)?;
    Ok(out)
}

/// Image dictionary and sample data of a preserved inline image
pub fn inline_parts(op: &Operation) -> Option<(&Dictionary, &[u8])> {
    if op.operator != INLINE_IMAGE {
        return None;
    }
    match (op.operands.first(), op.operands.get(1)) {
        (Some(Object::Dictionary(dict)), Some(Object::String(data, _))) => Some((dict, data)),
        _ => None,
    }
}

// ============================================================
// Splitting
// ============================================================

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Byte range of an operator run and the number of operators it holds
    Operators { start: usize, end: usize, count: usize },
    InlineImage {
        header: (usize, usize),
        data: (usize, usize),
        raw: (usize, usize),
    },
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    /// Keyword in operator position, with its byte range
    Keyword(usize, usize),
    Operand,
    Open,
    Close,
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Next token, `Ok(None)` at end of input, `Err` on malformed syntax
    fn next_token(&mut self) -> Result<Option<Token>, ()> {
        self.skip_blank();
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let start = self.pos;
        match b {
            b'(' => {
                self.literal_string()?;
                Ok(Some(Token::Operand))
            }
            b'<' if self.bytes.get(start + 1) == Some(&b'<') => {
                self.pos += 2;
                Ok(Some(Token::Open))
            }
            b'>' if self.bytes.get(start + 1) == Some(&b'>') => {
                self.pos += 2;
                Ok(Some(Token::Close))
            }
            b'<' => {
                let end = self.bytes[start..].iter().position(|&c| c == b'>').ok_or(())?;
                self.pos = start + end + 1;
                Ok(Some(Token::Operand))
            }
            b'[' | b'{' => {
                self.pos += 1;
                Ok(Some(Token::Open))
            }
            b']' | b'}' => {
                self.pos += 1;
                Ok(Some(Token::Close))
            }
            b'/' => {
                self.pos += 1;
                self.regular();
                Ok(Some(Token::Operand))
            }
            b')' | b'>' => Err(()),
            _ => {
                self.regular();
                let word = &self.bytes[start..self.pos];
                let numeric = matches!(word[0], b'0'..=b'9' | b'+' | b'-' | b'.');
                if numeric || matches!(word, b"true" | b"false" | b"null") {
                    Ok(Some(Token::Operand))
                } else {
                    Ok(Some(Token::Keyword(start, self.pos)))
                }
            }
        }
    }

    fn regular(&mut self) {
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
    }

    fn literal_string(&mut self) -> Result<(), ()> {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(())
    }
}

/// Cut a stream into operator runs and inline images.
///
/// The flag is false when the tokenizer met malformed syntax; the rest of
/// the stream is then handed to lopdf as one run.
fn split(bytes: &[u8]) -> (Vec<Segment>, bool) {
    let mut segments = Vec::new();
    let mut lexer = Lexer::new(bytes);
    let mut run_start = 0;
    let mut count = 0;
    let mut depth = 0usize;

    loop {
        let token = match lexer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(()) => {
                segments.push(Segment::Operators {
                    start: run_start,
                    end: bytes.len(),
                    count: usize::MAX,
                });
                return (segments, false);
            }
        };
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                if depth == 0 {
                    segments.push(Segment::Operators {
                        start: run_start,
                        end: bytes.len(),
                        count: usize::MAX,
                    });
                    return (segments, false);
                }
                depth -= 1;
            }
            Token::Operand => {}
            Token::Keyword(start, end) if depth == 0 && &bytes[start..end] == b"BI" => {
                let Some((header, data, raw_end)) = inline_image_bounds(&mut lexer, end) else {
                    segments.push(Segment::Operators {
                        start: run_start,
                        end: bytes.len(),
                        count: usize::MAX,
                    });
                    return (segments, false);
                };
                segments.push(Segment::Operators {
                    start: run_start,
                    end: start,
                    count,
                });
                segments.push(Segment::InlineImage {
                    header,
                    data,
                    raw: (start, raw_end),
                });
                lexer.pos = raw_end;
                run_start = raw_end;
                count = 0;
            }
            Token::Keyword(..) => {
                if depth > 0 {
                    // Keywords are not valid inside arrays or dictionaries
                    segments.push(Segment::Operators {
                        start: run_start,
                        end: bytes.len(),
                        count: usize::MAX,
                    });
                    return (segments, false);
                }
                count += 1;
            }
        }
    }

    let clean = depth == 0;
    segments.push(Segment::Operators {
        start: run_start,
        end: bytes.len(),
        count,
    });
    (segments, clean)
}

/// Locate the header, data and end of an inline image whose `BI` ends at `after_bi`
fn inline_image_bounds(lexer: &mut Lexer<'_>, after_bi: usize) -> Option<((usize, usize), (usize, usize), usize)> {
    let bytes = lexer.bytes;
    lexer.pos = after_bi;
    let header_end = loop {
        match lexer.next_token().ok()?? {
            Token::Keyword(start, end) if &bytes[start..end] == b"ID" => break (start, end),
            Token::Keyword(..) => return None,
            _ => {}
        }
    };

    // One whitespace byte separates ID from the data
    let mut data_start = header_end.1;
    if bytes.get(data_start).copied().is_some_and(is_whitespace) {
        data_start += 1;
    }

    let header = (after_bi, header_end.0);
    let expected = header_dictionary(&bytes[header.0..header.1]).and_then(|dict| raw_length(&dict));
    if let Some(length) = expected {
        let data_end = data_start + length;
        if let Some(end) = ei_at(bytes, data_end) {
            return Some((header, (data_start, data_end), end));
        }
    }

    // Filtered data: the first EI surrounded by whitespace
    let mut at = data_start;
    while at + 2 <= bytes.len() {
        if &bytes[at..at + 2] == b"EI"
            && at > data_start
            && is_whitespace(bytes[at - 1])
            && bytes.get(at + 2).map_or(true, |&b| is_whitespace(b) || is_delimiter(b))
        {
            return Some((header, (data_start, at - 1), at + 2));
        }
        at += 1;
    }
    None
}

/// End offset of an `EI` keyword that follows `at` after optional whitespace
fn ei_at(bytes: &[u8], mut at: usize) -> Option<usize> {
    while bytes.get(at).copied().is_some_and(is_whitespace) {
        at += 1;
    }
    let end = at + 2;
    (bytes.get(at..end) == Some(b"EI".as_slice())
        && bytes.get(end).map_or(true, |&b| is_whitespace(b) || is_delimiter(b)))
    .then_some(end)
}

/// Byte length of unfiltered inline image data
fn raw_length(dict: &Dictionary) -> Option<usize> {
    if dict.has(b"Filter") {
        return None;
    }
    let int = |key: &[u8]| match dict.get(key).ok()? {
        Object::Integer(v) if *v > 0 => Some(*v as usize),
        _ => None,
    };
    let width = int(b"Width")?;
    let height = int(b"Height")?;
    let mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let bits = if mask { 1 } else { int(b"BitsPerComponent")? };
    let components = if mask {
        1
    } else {
        match dict.get(b"ColorSpace").ok()? {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"CalGray" => 1,
                b"DeviceRGB" | b"CalRGB" => 3,
                b"DeviceCMYK" => 4,
                _ => return None,
            },
            Object::Array(items) if items.first().and_then(|o| o.as_name().ok()) == Some(b"Indexed") => 1,
            _ => return None,
        }
    };
    Some((width * components * bits).div_ceil(8) * height)
}

// ============================================================
// Inline Image Dictionaries
// ============================================================

/// Parse the key/value pairs between `BI` and `ID`, expanding abbreviations
fn header_dictionary(header: &[u8]) -> Option<Dictionary> {
    let mut wrapped = Vec::with_capacity(header.len() + 10);
    wrapped.extend_from_slice(b"<< ");
    wrapped.extend_from_slice(header);
    wrapped.extend_from_slice(b" >> BI");
    let content = Content::decode(&wrapped).ok()?;
    let Some(Object::Dictionary(short)) = content.operations.first()?.operands.first() else {
        return None;
    };

    let mut dict = Dictionary::new();
    for (key, value) in short.iter() {
        dict.set(expand_key(key), expand_value(value));
    }
    Some(dict)
}

fn inline_image(header: &[u8], data: &[u8], raw: &[u8]) -> Option<Operation> {
    let dict = header_dictionary(header)?;
    Some(Operation::new(
        INLINE_IMAGE,
        vec![
            Object::Dictionary(dict),
            Object::String(data.to_vec(), StringFormat::Hexadecimal),
            Object::String(raw.to_vec(), StringFormat::Literal),
        ],
    ))
}

fn expand_key(key: &[u8]) -> Vec<u8> {
    let full: &[u8] = match key {
        b"BPC" => b"BitsPerComponent",
        b"CS" => b"ColorSpace",
        b"D" => b"Decode",
        b"DP" => b"DecodeParms",
        b"F" => b"Filter",
        b"H" => b"Height",
        b"IM" => b"ImageMask",
        b"I" => b"Interpolate",
        b"W" => b"Width",
        b"L" => b"Length",
        other => other,
    };
    full.to_vec()
}

fn expand_value(value: &Object) -> Object {
    match value {
        Object::Name(name) => {
            let full: &[u8] = match name.as_slice() {
                b"G" => b"DeviceGray",
                b"RGB" => b"DeviceRGB",
                b"CMYK" => b"DeviceCMYK",
                b"I" => b"Indexed",
                b"AHx" => b"ASCIIHexDecode",
                b"A85" => b"ASCII85Decode",
                b"LZW" => b"LZWDecode",
                b"Fl" => b"FlateDecode",
                b"RL" => b"RunLengthDecode",
                b"CCF" => b"CCITTFaxDecode",
                b"DCT" => b"DCTDecode",
                other => other,
            };
            Object::Name(full.to_vec())
        }
        Object::Array(items) => Object::Array(items.iter().map(expand_value).collect()),
        other => other.clone(),
    }
}
