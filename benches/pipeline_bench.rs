//! Detection, cleaning and preview benchmarks
//!
//! Documents are generated in memory: each page carries a repeated
//! watermark line, a footer and a few body lines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_watermark_remover::{clean_document, detect_candidates, render_preview, CleanParams};

/// Build a document with `pages` watermarked pages
fn sample_document(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for page in 0..pages {
        let mut content = String::from("0.95 0.95 0.95 rg 0 0 612 792 re f 0 0 0 rg\n");
        content.push_str("BT /F1 36 Tf 150 420 Td (CONFIDENTIAL DRAFT) Tj ET\n");
        for line in 0..20 {
            content.push_str(&format!(
                "BT /F1 11 Tf 72 {} Td (Line {line} of page {page} with some body text) Tj ET\n",
                720 - line * 14
            ));
        }
        content.push_str(&format!("BT /F1 9 Tf 290 20 Td (Page {}) Tj ET\n", page + 1));

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("failed to build sample document");
    bytes
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_candidates");
    for pages in [1, 5, 20] {
        let bytes = sample_document(pages);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{pages}_pages")), &bytes, |b, bytes| {
            b.iter(|| black_box(detect_candidates(black_box(bytes))));
        });
    }
    group.finish();
}

fn bench_clean(c: &mut Criterion) {
    let params = CleanParams::builder()
        .keyword("confidential draft")
        .footer_height(30.0)
        .build();

    let mut group = c.benchmark_group("clean_document");
    group.sample_size(20);
    for pages in [1, 10, 50] {
        let bytes = sample_document(pages);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{pages}_pages")), &bytes, |b, bytes| {
            b.iter(|| black_box(clean_document(black_box(bytes), &params).unwrap()));
        });
    }
    group.finish();
}

fn bench_preview(c: &mut Criterion) {
    let bytes = sample_document(1);
    let params = CleanParams::builder().keyword("confidential draft").build();

    let mut group = c.benchmark_group("render_preview");
    group.sample_size(10);
    group.bench_function("first_page_150dpi", |b| {
        b.iter(|| black_box(render_preview(black_box(&bytes), &params)));
    });
    group.finish();
}

criterion_group!(benches, bench_detect, bench_clean, bench_preview);
criterion_main!(benches);
