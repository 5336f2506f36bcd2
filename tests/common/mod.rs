//! Shared fixtures for integration tests
//!
//! Builds small PDFs in memory with lopdf: Helvetica text at fixed
//! positions, an optional full-page background fill and an optional Info
//! dictionary. Pages can also carry text drawn through a shared form
//! XObject, text in a two-byte Type0 font, a full-page gray image and raw
//! content bytes appended as-is.

#![allow(dead_code)]

use std::collections::HashMap;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

pub const PAGE_WIDTH: i64 = 612;
pub const PAGE_HEIGHT: i64 = 792;

/// Text placed at a baseline position in PDF user space
#[derive(Debug, Clone)]
pub struct TextItem {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

impl TextItem {
    pub fn new(x: f32, y: f32, text: &str) -> Self {
        Self {
            x,
            y,
            size: 12.0,
            text: text.to_string(),
        }
    }
}

/// ToUnicode map of the Type0 fixture font: CID `0x1000 + c` is `c`
const CID_TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Fixture-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<1020> <107E> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Hex string of two-byte codes for the Type0 fixture font
fn cid_hex(text: &str) -> String {
    text.bytes().map(|b| format!("{:04X}", 0x1000 + b as u32)).collect()
}

#[derive(Debug, Clone, Default)]
pub struct PageFixture {
    pub background: Option<[f32; 3]>,
    /// Gray level of an image XObject covering the whole page
    pub image: Option<u8>,
    pub items: Vec<TextItem>,
    /// Text drawn by invoking a form XObject shared between pages
    pub forms: Vec<TextItem>,
    /// Text shown with the Type0 font `F2`
    pub cid_items: Vec<TextItem>,
    pub raw: Vec<u8>,
}

impl PageFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(mut self, rgb: [f32; 3]) -> Self {
        self.background = Some(rgb);
        self
    }

    pub fn text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.items.push(TextItem::new(x, y, text));
        self
    }

    pub fn image(mut self, gray: u8) -> Self {
        self.image = Some(gray);
        self
    }

    pub fn form_text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.forms.push(TextItem::new(x, y, text));
        self
    }

    pub fn cid_text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.cid_items.push(TextItem::new(x, y, text));
        self
    }

    pub fn raw(mut self, content: &[u8]) -> Self {
        self.raw.extend_from_slice(content);
        self
    }

    fn content(&self) -> Vec<u8> {
        let mut ops = String::new();
        if let Some([r, g, b]) = self.background {
            ops.push_str(&format!("{r} {g} {b} rg 0 0 {PAGE_WIDTH} {PAGE_HEIGHT} re f\n"));
        }
        if self.image.is_some() {
            ops.push_str(&format!("q {PAGE_WIDTH} 0 0 {PAGE_HEIGHT} 0 0 cm /Im0 Do Q\n"));
        }
        for i in 0..self.forms.len() {
            ops.push_str(&format!("q /Fm{i} Do Q\n"));
        }
        for item in &self.items {
            ops.push_str(&format!(
                "0 0 0 rg BT /F1 {} Tf {} {} Td ({}) Tj ET\n",
                item.size, item.x, item.y, item.text
            ));
        }
        for item in &self.cid_items {
            ops.push_str(&format!(
                "0 0 0 rg BT /F2 {} Tf {} {} Td <{}> Tj ET\n",
                item.size,
                item.x,
                item.y,
                cid_hex(&item.text)
            ));
        }
        let mut bytes = ops.into_bytes();
        bytes.extend_from_slice(&self.raw);
        bytes
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    pages: Vec<PageFixture>,
    title: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: PageFixture) -> Self {
        self.pages.push(page);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let cid_font_id = add_type0_font(&mut doc);

        let mut forms: HashMap<String, ObjectId> = HashMap::new();
        let mut kids: Vec<Object> = Vec::new();
        for page in &self.pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, page.content()));

            let mut xobjects = lopdf::Dictionary::new();
            for (i, item) in page.forms.iter().enumerate() {
                let form_id = *forms
                    .entry(item.text.clone())
                    .or_insert_with(|| add_text_form(&mut doc, font_id, item));
                xobjects.set(format!("Fm{i}"), form_id);
            }
            if let Some(gray) = page.image {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![gray; 4],
                ));
                xobjects.set("Im0", image_id);
            }

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id, "F2" => cid_font_id },
                    "XObject" => xobjects,
                },
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
                "Producer" => Object::string_literal("fixture"),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save fixture");
        bytes
    }
}

/// Type0 font with Identity-H encoding, uniform widths and a ToUnicode map
fn add_type0_font(doc: &mut Document) -> ObjectId {
    let to_unicode = doc.add_object(Stream::new(dictionary! {}, CID_TO_UNICODE.as_bytes().to_vec()));
    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "FixtureSans",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 600,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "FixtureSans",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![descendant.into()],
        "ToUnicode" => to_unicode,
    })
}

/// Form XObject showing one line of Helvetica text in page coordinates
fn add_text_form(doc: &mut Document, font_id: ObjectId, item: &TextItem) -> ObjectId {
    let content = format!(
        "0 0 0 rg BT /F1 {} Tf {} {} Td ({}) Tj ET",
        item.size, item.x, item.y, item.text
    );
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        },
        content.into_bytes(),
    ))
}

/// Three pages whose middle page breaks off in an unterminated string
/// right after its watermark line
pub fn with_malformed_middle_page(watermark: &str) -> Vec<u8> {
    PdfBuilder::new()
        .page(PageFixture::new().text(72.0, 700.0, watermark).text(72.0, 400.0, "First body"))
        .page(
            PageFixture::new()
                .text(72.0, 700.0, watermark)
                .raw(b"BT /F1 12 Tf 72 400 Td (never closed Tj ET\n"),
        )
        .page(PageFixture::new().text(72.0, 700.0, watermark).text(72.0, 400.0, "Last body"))
        .build()
}

/// `pages` pages carrying the same watermark line plus unique body text
pub fn watermarked(pages: usize, watermark: &str) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    for i in 0..pages {
        builder = builder.page(
            PageFixture::new()
                .text(72.0, 700.0, watermark)
                .text(72.0, 400.0, &format!("Body text of page {}", i + 1)),
        );
    }
    builder.build()
}

/// Text of every page of a serialized document
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let mut doc = pdf_watermark_remover::PdfDocument::from_bytes(bytes).expect("parse output");
    (0..doc.page_count())
        .map(|i| doc.page(i).expect("page").text())
        .collect()
}
