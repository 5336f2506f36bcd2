//! Content-level redaction
//!
//! Glyphs whose centers fall inside a redaction area are cut out of their
//! show operators. Each removed glyph is replaced by a `TJ` displacement of
//! the same width so the remaining text keeps its position. Images, inline
//! images and XObject placements that lie entirely inside an area are
//! dropped.
//!
//! A [`RedactionPlan`] groups the edits by content stream (the page itself or
//! a form XObject), so the caller can rewrite each stream once.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use super::content::PageLayout;
use super::types::Rect;

/// Counts of what a redaction pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedactionSummary {
    pub glyphs_removed: usize,
    pub placements_removed: usize,
}

impl RedactionSummary {
    pub fn is_empty(&self) -> bool {
        self.glyphs_removed == 0 && self.placements_removed == 0
    }
}

/// A character code removed from a string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    /// Displacement kept in its place, thousandths of text space
    pub displacement: f32,
    /// Bytes of the code
    pub len: usize,
}

/// Edits to one content stream
#[derive(Debug, Clone, Default)]
pub struct StreamEdit {
    /// op index -> (element, byte offset) -> cut
    cuts: HashMap<usize, HashMap<(usize, usize), Cut>>,
    /// Operators removed outright
    dropped: HashSet<usize>,
}

impl StreamEdit {
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty() && self.dropped.is_empty()
    }
}

/// Everything a set of areas removes, per stream index of the layout
#[derive(Debug, Clone, Default)]
pub struct RedactionPlan {
    pub edits: BTreeMap<usize, StreamEdit>,
    pub summary: RedactionSummary,
}

/// Resolve all areas against one layout.
///
/// All areas are resolved before any operator is touched, so overlapping or
/// neighbouring areas never see shifted coordinates.
pub fn plan(layout: &PageLayout, areas: &[Rect]) -> RedactionPlan {
    let mut plan = RedactionPlan::default();
    if areas.is_empty() {
        return plan;
    }

    for glyph in &layout.glyphs {
        let (x, y) = glyph.bbox.center();
        if !areas.iter().any(|area| area.contains_point(x, y)) {
            continue;
        }
        let displacement = if glyph.font_size.abs() > f32::EPSILON {
            -glyph.advance * 1000.0 / glyph.font_size
        } else {
            0.0
        };
        let source = glyph.source;
        plan.edits
            .entry(source.stream)
            .or_default()
            .cuts
            .entry(source.op_index)
            .or_default()
            .insert(
                (source.element, source.byte),
                Cut {
                    displacement,
                    len: source.len,
                },
            );
        plan.summary.glyphs_removed += 1;
    }

    for placement in &layout.placements {
        if areas.iter().any(|area| area.contains_rect(&placement.bbox)) {
            let edit = plan.edits.entry(placement.stream).or_default();
            if edit.dropped.insert(placement.op_index) {
                plan.summary.placements_removed += 1;
            }
        }
    }

    plan
}

/// Rewrite one stream's operators with an edit applied
pub fn rewrite(operations: &[Operation], edit: &StreamEdit) -> Vec<Operation> {
    let mut rewritten = Vec::with_capacity(operations.len());
    for (index, op) in operations.iter().enumerate() {
        if edit.dropped.contains(&index) {
            continue;
        }
        match edit.cuts.get(&index) {
            Some(cuts) => rewrite_show(op, cuts, &mut rewritten),
            None => rewritten.push(op.clone()),
        }
    }
    rewritten
}

/// Replace a show operator by an equivalent `TJ` with glyphs cut out
fn rewrite_show(op: &Operation, cuts: &HashMap<(usize, usize), Cut>, out: &mut Vec<Operation>) {
    let items: Vec<(usize, Object)> = match op.operator.as_str() {
        "Tj" | "'" => op.operands.first().cloned().map(|s| vec![(0, s)]).unwrap_or_default(),
        "\"" => op.operands.get(2).cloned().map(|s| vec![(2, s)]).unwrap_or_default(),
        "TJ" => match op.operands.first() {
            Some(Object::Array(items)) => items.iter().cloned().enumerate().collect(),
            _ => Vec::new(),
        },
        _ => {
            out.push(op.clone());
            return;
        }
    };

    // Line movement and spacing side effects of ' and " stay explicit
    match op.operator.as_str() {
        "'" => out.push(Operation::new("T*", vec![])),
        "\"" => {
            if let [aw, ac, ..] = &op.operands[..] {
                out.push(Operation::new("Tw", vec![aw.clone()]));
                out.push(Operation::new("Tc", vec![ac.clone()]));
            }
            out.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }

    let mut array: Vec<Object> = Vec::new();
    for (element, item) in items {
        match item {
            Object::String(bytes, format) => {
                let mut kept: Vec<u8> = Vec::new();
                let mut byte = 0;
                while byte < bytes.len() {
                    match cuts.get(&(element, byte)) {
                        Some(cut) => {
                            flush_run(&mut array, &mut kept, format);
                            push_displacement(&mut array, cut.displacement);
                            byte += cut.len.max(1);
                        }
                        None => {
                            kept.push(bytes[byte]);
                            byte += 1;
                        }
                    }
                }
                flush_run(&mut array, &mut kept, format);
            }
            other => array.push(other),
        }
    }

    out.push(Operation::new("TJ", vec![Object::Array(array)]));
}

fn flush_run(array: &mut Vec<Object>, kept: &mut Vec<u8>, format: StringFormat) {
    if !kept.is_empty() {
        array.push(Object::String(std::mem::take(kept), format));
    }
}

fn push_displacement(array: &mut Vec<Object>, value: f32) {
    if value == 0.0 {
        return;
    }
    if let Some(Object::Real(last)) = array.last_mut() {
        *last += value;
    } else {
        array.push(Object::Real(value));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::content::{interpret, PageGeometry};
    use crate::document::resources::Resources;
    use crate::document::text::{build_lines, search};
    use lopdf::content::Content;
    use lopdf::{dictionary, Document, Stream};

    fn layout(operations: &[Operation]) -> PageLayout {
        let doc = Document::with_version("1.5");
        interpret(&doc, operations, &Arc::new(Resources::default()), &PageGeometry::LETTER)
    }

    fn redact(stream: &str, needle: &str) -> (Vec<Operation>, RedactionSummary) {
        let content = Content::decode(stream.as_bytes()).unwrap();
        let layout = layout(&content.operations);
        let lines = build_lines(&layout.glyphs);
        let areas = search(&lines, &layout.glyphs, needle);
        let plan = plan(&layout, &areas);
        let ops = match plan.edits.get(&0) {
            Some(edit) => rewrite(&content.operations, edit),
            None => content.operations.clone(),
        };
        (ops, plan.summary)
    }

    fn text_of(operations: &[Operation]) -> String {
        layout(operations).glyphs.iter().map(|g| g.text.as_str()).collect()
    }

    #[test]
    fn test_redacts_only_matched_glyphs() {
        let (ops, summary) = redact("BT /F1 12 Tf 72 700 Td (Draft copy) Tj ET", "draft");
        assert_eq!(summary.glyphs_removed, 5);
        assert_eq!(text_of(&ops), " copy");

        let tj = ops.iter().find(|op| op.operator == "TJ").unwrap();
        let Object::Array(items) = &tj.operands[0] else {
            panic!("expected TJ array");
        };
        assert!(matches!(items[0], Object::Real(_)));
        assert!(matches!(&items[1], Object::String(bytes, _) if bytes == b" copy"));
    }

    #[test]
    fn test_remaining_glyphs_keep_position() {
        let stream = "BT /F1 12 Tf 72 700 Td (Draft copy) Tj ET";
        let content = Content::decode(stream.as_bytes()).unwrap();
        let before = layout(&content.operations);

        let (ops, _) = redact(stream, "draft");
        let after = layout(&ops);

        let c_before = before.glyphs.iter().find(|g| g.text == "c").unwrap();
        let c_after = after.glyphs.iter().find(|g| g.text == "c").unwrap();
        assert!((c_before.bbox.x0 - c_after.bbox.x0).abs() < 0.01);
    }

    #[test]
    fn test_quote_operator_keeps_line_move() {
        let (ops, summary) = redact("BT /F1 12 Tf 14 TL 72 700 Td (SECRET) ' ET", "secret");
        assert_eq!(summary.glyphs_removed, 6);
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert!(operators.contains(&"T*"));
        assert!(!operators.contains(&"'"));
        assert_eq!(text_of(&ops), "");
    }

    #[test]
    fn test_untouched_operations_are_preserved() {
        let stream = "0.9 g 0 0 612 792 re f BT /F1 12 Tf 72 700 Td (Nothing here) Tj ET";
        let content = Content::decode(stream.as_bytes()).unwrap();
        let (ops, summary) = redact(stream, "absent");
        assert!(summary.is_empty());
        assert_eq!(ops.len(), content.operations.len());
    }

    #[test]
    fn test_contained_placements_are_dropped() {
        let stream = "q 50 0 0 50 100 100 cm /Im0 Do Q q 50 0 0 50 400 400 cm /Im1 Do Q";
        let content = Content::decode(stream.as_bytes()).unwrap();
        let layout = layout(&content.operations);

        let area = Rect::new(90.0, 630.0, 160.0, 700.0);
        let plan = plan(&layout, &[area]);
        assert_eq!(plan.summary.placements_removed, 1);
        let ops = rewrite(&content.operations, &plan.edits[&0]);
        let names: Vec<&[u8]> = ops
            .iter()
            .filter(|op| op.operator == "Do")
            .filter_map(|op| op.operands[0].as_name().ok())
            .collect();
        assert_eq!(names, vec![b"Im1".as_slice()]);
    }

    #[test]
    fn test_two_byte_codes_are_cut_whole() {
        let mut doc = Document::with_version("1.5");
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Sans",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![dictionary! {
                "Type" => "Font",
                "Subtype" => "CIDFontType2",
                "DW" => 500,
            }.into()],
        });
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Resources" => dictionary! { "Font" => dictionary! { "F2" => font } },
        });
        let resources = Resources::for_page(&doc, page);

        let content = Content::decode(b"BT /F2 10 Tf 100 700 Td <000100020003> Tj ET").unwrap();
        let before = interpret(&doc, &content.operations, &resources, &PageGeometry::LETTER);
        assert_eq!(before.glyphs.len(), 3);

        // Remove the middle glyph only
        let middle = before.glyphs[1].bbox;
        let area = Rect::new(middle.x0 + 1.0, middle.y0, middle.x1 - 1.0, middle.y1);
        let plan = plan(&before, &[area]);
        assert_eq!(plan.summary.glyphs_removed, 1);
        let ops = rewrite(&content.operations, &plan.edits[&0]);

        let tj = ops.iter().find(|op| op.operator == "TJ").unwrap();
        let Object::Array(items) = &tj.operands[0] else {
            panic!("expected TJ array");
        };
        assert!(matches!(&items[0], Object::String(bytes, _) if bytes == &[0, 1]));
        assert!(matches!(items[1], Object::Real(d) if (d + 500.0).abs() < 0.01));
        assert!(matches!(&items[2], Object::String(bytes, _) if bytes == &[0, 3]));

        let after = interpret(&doc, &ops, &resources, &PageGeometry::LETTER);
        assert_eq!(after.glyphs.len(), 2);
        assert!((after.glyphs[1].bbox.x0 - before.glyphs[2].bbox.x0).abs() < 0.01);
    }

    #[test]
    fn test_edits_are_grouped_by_stream() {
        let mut doc = Document::with_version("1.5");
        let form = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form", "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()] },
            b"BT /F1 12 Tf 72 700 Td (DRAFT) Tj ET".to_vec(),
        ));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Resources" => dictionary! { "XObject" => dictionary! { "Fm0" => form } },
        });
        let resources = Resources::for_page(&doc, page);
        let content = Content::decode(b"/Fm0 Do BT /F1 12 Tf 72 600 Td (DRAFT) Tj ET").unwrap();
        let layout = interpret(&doc, &content.operations, &resources, &PageGeometry::LETTER);

        let lines = build_lines(&layout.glyphs);
        let areas = search(&lines, &layout.glyphs, "draft");
        assert_eq!(areas.len(), 2);
        let plan = plan(&layout, &areas);
        assert_eq!(plan.summary.glyphs_removed, 10);
        assert_eq!(plan.edits.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }
}
