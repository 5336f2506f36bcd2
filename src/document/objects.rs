//! Small helpers for walking lopdf object graphs

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Upper bound on reference chains, guards against cyclic files
const MAX_REFERENCE_DEPTH: usize = 32;

/// Follow indirect references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resolve an object expected to be a dictionary
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Read a numeric operand or dictionary value
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Resolve then read a number
pub(crate) fn resolve_number(doc: &Document, object: &Object) -> Option<f32> {
    resolve(doc, object).and_then(number)
}

/// Look up a page attribute, walking up the `/Parent` chain for inherited keys
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_REFERENCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(doc, parent)?;
    }
    None
}

/// Read a four-number rectangle array (`[llx lly urx ury]`)
pub(crate) fn rect_array(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(doc, object)? else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = resolve_number(doc, item)?;
    }
    Some([
        values[0].min(values[2]),
        values[1].min(values[3]),
        values[0].max(values[2]),
        values[1].max(values[3]),
    ])
}

/// Decoded bytes of a stream.
///
/// lopdf only decompresses streams that carry a `/Filter` and refuses image
/// streams outright, so both cases are handled here. `None` when a filter is
/// not supported.
pub(crate) fn stream_data(stream: &Stream) -> Option<Vec<u8>> {
    if !stream.dict.has(b"Filter") {
        return Some(stream.content.clone());
    }
    if stream.dict.has(b"Subtype") {
        let mut copy = stream.clone();
        copy.dict.remove(b"Subtype");
        return copy.decompressed_content().ok();
    }
    stream.decompressed_content().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_number() {
        assert_eq!(number(&Object::Integer(7)), Some(7.0));
        assert_eq!(number(&Object::Real(2.5)), Some(2.5));
        assert_eq!(number(&Object::Boolean(true)), None);
    }

    #[test]
    fn test_resolve_reference_chain() {
        let mut doc = Document::with_version("1.5");
        let target = doc.add_object(Object::Integer(42));
        let hop = doc.add_object(Object::Reference(target));

        let start = Object::Reference(hop);
        assert!(matches!(resolve(&doc, &start), Some(Object::Integer(42))));
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let media_box = inherited(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(rect_array(&doc, media_box), Some([0.0, 0.0, 612.0, 792.0]));
        assert!(inherited(&doc, page_id, b"CropBox").is_none());
    }

    #[test]
    fn test_stream_data_of_plain_and_image_streams() {
        let plain = Stream::new(dictionary! {}, b"0 g".to_vec());
        assert_eq!(stream_data(&plain), Some(b"0 g".to_vec()));

        let mut image = Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image" },
            vec![7u8; 64],
        );
        image.compress().unwrap();
        assert!(image.dict.has(b"Filter"));
        assert_eq!(stream_data(&image), Some(vec![7u8; 64]));
    }
}
