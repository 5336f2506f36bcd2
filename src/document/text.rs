//! Text lines, blocks and literal search over a page layout

use super::content::Glyph;
use super::types::Rect;

/// Baseline tolerance for joining glyphs into one line (fraction of em)
const BASELINE_TOLERANCE: f32 = 0.5;

/// Horizontal gap that is rendered as a word break (fraction of em)
const WORD_GAP: f32 = 0.25;

/// Horizontal gap that splits a line into separate runs (fraction of em)
const MAX_LINE_GAP: f32 = 4.0;

/// Allowed backwards step before a glyph starts a new line (fraction of em)
const OVERLAP_TOLERANCE: f32 = 0.5;

/// Vertical gap between lines still considered the same block (fraction of line height)
const BLOCK_LINE_GAP: f32 = 0.5;

// ============================================================
// Types
// ============================================================

/// One character of a line; word breaks inferred from spacing have no glyph
#[derive(Debug, Clone, Copy)]
pub struct LineChar {
    pub ch: char,
    pub glyph: Option<usize>,
}

/// A run of glyphs sharing a baseline
#[derive(Debug, Clone)]
pub struct TextLine {
    pub chars: Vec<LineChar>,
    pub bbox: Rect,
    baseline: f32,
    size: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }
}

/// A rectangle plus the text it contains (lines joined with `\n`)
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub rect: Rect,
    pub text: String,
}

// ============================================================
// Line & Block Assembly
// ============================================================

/// Group glyphs (in content order) into lines.
///
/// A glyph whose text has several characters (ligatures, multi-character
/// `ToUnicode` entries) contributes one [`LineChar`] per character.
pub fn build_lines(glyphs: &[Glyph]) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut last: Option<usize> = None;

    for (index, glyph) in glyphs.iter().enumerate() {
        let continues = last.is_some_and(|prev| {
            let prev = &glyphs[prev];
            let em = prev.size.max(glyph.size).max(f32::EPSILON);
            let gap = glyph.bbox.x0 - prev.bbox.x1;
            (glyph.baseline - prev.baseline).abs() <= BASELINE_TOLERANCE * em
                && gap >= -OVERLAP_TOLERANCE * em
                && gap <= MAX_LINE_GAP * em
        });

        let chars = glyph.text.chars().map(|ch| LineChar {
            ch,
            glyph: Some(index),
        });
        match lines.last_mut() {
            Some(line) if continues => {
                let prev = &glyphs[last.unwrap_or(index)];
                let gap = glyph.bbox.x0 - prev.bbox.x1;
                let em = prev.size.max(glyph.size);
                if gap > WORD_GAP * em && !prev.is_blank() && !glyph.is_blank() {
                    line.chars.push(LineChar {
                        ch: ' ',
                        glyph: None,
                    });
                }
                line.chars.extend(chars);
                line.bbox = line.bbox.union(&glyph.bbox);
                line.size = line.size.max(glyph.size);
            }
            _ => lines.push(TextLine {
                chars: chars.collect(),
                bbox: glyph.bbox,
                baseline: glyph.baseline,
                size: glyph.size,
            }),
        }
        last = Some(index);
    }

    lines
}

/// Merge consecutive, vertically adjacent lines into blocks
pub fn build_blocks(lines: &[TextLine]) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut previous: Option<&TextLine> = None;

    for line in lines {
        let joins = previous.is_some_and(|prev| {
            let line_height = prev.bbox.height().max(f32::EPSILON);
            let below = line.baseline > prev.baseline + BASELINE_TOLERANCE * prev.size;
            let gap = line.bbox.y0 - prev.bbox.y1;
            below && gap <= BLOCK_LINE_GAP * line_height
        });

        match blocks.last_mut() {
            Some(block)
                if joins && line.bbox.x0 < block.rect.x1 && line.bbox.x1 > block.rect.x0 =>
            {
                block.text.push('\n');
                block.text.push_str(&line.text());
                block.rect = block.rect.union(&line.bbox);
            }
            _ => blocks.push(TextBlock {
                rect: line.bbox,
                text: line.text(),
            }),
        }
        previous = Some(line);
    }

    blocks
}

// ============================================================
// Search
// ============================================================

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// Find every case-insensitive occurrence of `needle`, one rect per hit.
///
/// Matches do not span lines. Hits are non-overlapping, scanned left to right.
pub fn search(lines: &[TextLine], glyphs: &[Glyph], needle: &str) -> Vec<Rect> {
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for line in lines {
        let folded: Vec<char> = line.chars.iter().map(|c| fold(c.ch)).collect();
        let mut start = 0;
        while start + needle.len() <= folded.len() {
            if folded[start..start + needle.len()] == needle[..] {
                let rect = line.chars[start..start + needle.len()]
                    .iter()
                    .filter_map(|c| c.glyph)
                    .map(|g| glyphs[g].bbox)
                    .reduce(|a, b| a.union(&b));
                if let Some(rect) = rect {
                    hits.push(rect);
                }
                start += needle.len();
            } else {
                start += 1;
            }
        }
    }
    hits
}

/// Text of the glyphs whose centers fall inside `clip`
pub fn text_in(lines: &[TextLine], glyphs: &[Glyph], clip: &Rect) -> String {
    let inside = |c: &LineChar| {
        c.glyph.is_some_and(|g| {
            let (x, y) = glyphs[g].bbox.center();
            clip.contains_point(x, y)
        })
    };

    let mut out: Vec<String> = Vec::new();
    for line in lines {
        let mut text = String::new();
        for (i, c) in line.chars.iter().enumerate() {
            let keep = match c.glyph {
                Some(_) => inside(c),
                // Inferred word break: keep when both neighbours are kept
                None => {
                    i > 0
                        && inside(&line.chars[i - 1])
                        && line.chars.get(i + 1).is_some_and(|next| inside(next))
                }
            };
            if keep {
                text.push(c.ch);
            }
        }
        if !text.is_empty() {
            out.push(text);
        }
    }
    out.join("\n")
}
