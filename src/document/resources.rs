//! Page resources: fonts, color spaces and XObjects
//!
//! Form XObjects are loaded eagerly with their decoded content and their own
//! resources, so interpreting a page never touches the document again for
//! them. Forms are cached by object id; a form that (directly or through
//! other forms) refers back to itself is left out of the table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::fonts::FontTable;
use super::images::ImageSource;
use super::objects::{inherited, number, rect_array, resolve, resolve_dict, stream_data};
use super::stream::{self, DecodedContent};
use super::types::Matrix;

/// Deepest chain of forms drawing other forms that is loaded
pub const MAX_FORM_DEPTH: usize = 8;

/// Resources in effect for one content stream
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub fonts: FontTable,
    pub xobjects: HashMap<Vec<u8>, XObject>,
    /// The `/ColorSpace` dictionary, for image color spaces given by name
    pub color_spaces: Option<Dictionary>,
}

#[derive(Debug, Clone)]
pub enum XObject {
    Form(Arc<FormXObject>),
    Image(Arc<ImageSource>),
}

/// A form XObject with its content decoded
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub id: ObjectId,
    /// Form space to the user space of the invoking stream
    pub matrix: Matrix,
    /// `/BBox` in form space
    pub bbox: Option<[f32; 4]>,
    pub content: DecodedContent,
    pub resources: Arc<Resources>,
}

impl Resources {
    /// Resources of a page, including inherited ones
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Arc<Resources> {
        match inherited(doc, page_id, b"Resources").and_then(|o| resolve_dict(doc, o)) {
            Some(dict) => Arc::new(Loader::new(doc).resources(dict, 0)),
            None => Arc::new(Resources::default()),
        }
    }

    pub fn form(&self, name: &[u8]) -> Option<&Arc<FormXObject>> {
        match self.xobjects.get(name) {
            Some(XObject::Form(form)) => Some(form),
            _ => None,
        }
    }
}

struct Loader<'a> {
    doc: &'a Document,
    forms: HashMap<ObjectId, Arc<FormXObject>>,
    /// Forms currently being loaded
    active: HashSet<ObjectId>,
}

impl<'a> Loader<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            forms: HashMap::new(),
            active: HashSet::new(),
        }
    }

    fn resources(&mut self, dict: &Dictionary, depth: usize) -> Resources {
        let doc = self.doc;
        let color_spaces = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| resolve_dict(doc, o))
            .cloned();
        let mut resources = Resources {
            fonts: FontTable::from_resources(doc, dict),
            xobjects: HashMap::new(),
            color_spaces,
        };

        let Some(xobjects) = dict.get(b"XObject").ok().and_then(|o| resolve_dict(doc, o)) else {
            return resources;
        };
        for (name, value) in xobjects.iter() {
            let Object::Reference(id) = value else {
                continue;
            };
            let Ok(Object::Stream(xobject)) = doc.get_object(*id) else {
                continue;
            };
            let loaded = match xobject.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => Some(XObject::Image(Arc::new(ImageSource::new(
                    doc,
                    xobject.clone(),
                    resources.color_spaces.as_ref(),
                )))),
                Ok(b"Form") => self.form(*id, dict, depth).map(XObject::Form),
                _ => None,
            };
            if let Some(loaded) = loaded {
                resources.xobjects.insert(name.clone(), loaded);
            }
        }
        resources
    }

    /// Load a form; `parent` supplies resources when the form has none
    fn form(&mut self, id: ObjectId, parent: &Dictionary, depth: usize) -> Option<Arc<FormXObject>> {
        if let Some(form) = self.forms.get(&id) {
            return Some(Arc::clone(form));
        }
        if depth >= MAX_FORM_DEPTH || self.active.contains(&id) {
            tracing::debug!(?id, depth, "Skipping nested form");
            return None;
        }

        let doc = self.doc;
        let Ok(Object::Stream(form)) = doc.get_object(id) else {
            return None;
        };
        let bytes = stream_data(form)?;
        let content = match stream::decode(&bytes) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(?id, error = %e, "Form content could not be decoded");
                return None;
            }
        };

        let matrix = match form.dict.get(b"Matrix").ok().and_then(|o| resolve(doc, o)) {
            Some(Object::Array(items)) => match items.iter().filter_map(number).collect::<Vec<_>>()[..] {
                [a, b, c, d, e, f] => Matrix::new(a, b, c, d, e, f),
                _ => Matrix::IDENTITY,
            },
            _ => Matrix::IDENTITY,
        };
        let bbox = form.dict.get(b"BBox").ok().and_then(|o| rect_array(doc, o));
        let own = form.dict.get(b"Resources").ok().and_then(|o| resolve_dict(doc, o));

        self.active.insert(id);
        let resources = self.resources(own.unwrap_or(parent), depth + 1);
        self.active.remove(&id);

        let loaded = Arc::new(FormXObject {
            id,
            matrix,
            bbox,
            content,
            resources: Arc::new(resources),
        });
        self.forms.insert(id, Arc::clone(&loaded));
        Some(loaded)
    }
}
