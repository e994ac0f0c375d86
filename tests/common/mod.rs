//! Shared helpers for integration tests.

#![allow(dead_code, clippy::expect_used)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::sync::Mutex;

use docchat::core::Progress;

/// Builds a PDF with one page per entry; an empty entry yields a blank page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    save(build_document(pages))
}

/// Ways a page's content can be broken.
#[derive(Debug, Clone, Copy)]
pub enum Corruption {
    /// Declares `FlateDecode` over bytes that aren't zlib data.
    BadFlate,
    /// Opens a text object and a string that are never closed.
    Unterminated,
    /// Points `/Contents` at an object that doesn't exist.
    DanglingReference,
}

/// Like [`pdf_with_pages`], with page `page_number` (1-based) corrupted.
pub fn pdf_with_corrupt_page(pages: &[&str], page_number: u32, corruption: Corruption) -> Vec<u8> {
    pdf_with_corrupt_pages(pages, &[page_number], corruption)
}

/// Like [`pdf_with_pages`], with every listed page corrupted the same way.
pub fn pdf_with_corrupt_pages(
    pages: &[&str],
    page_numbers: &[u32],
    corruption: Corruption,
) -> Vec<u8> {
    let mut doc = build_document(pages);
    let page_ids = doc.get_pages();
    for number in page_numbers {
        let contents: Object = match corruption {
            Corruption::BadFlate => doc
                .add_object(Stream::new(
                    dictionary! { "Filter" => "FlateDecode" },
                    b"definitely not zlib".to_vec(),
                ))
                .into(),
            Corruption::Unterminated => doc
                .add_object(Stream::new(
                    dictionary! {},
                    b"BT /F1 12 Tf 72 720 Td (Beta".to_vec(),
                ))
                .into(),
            Corruption::DanglingReference => Object::Reference((9999, 0)),
        };
        let page_id = page_ids[number];
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .expect("page dictionary")
            .set("Contents", contents);
    }
    save(doc)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serializes");
    bytes
}

fn build_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).expect("page count fits");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Records every progress value it receives.
#[derive(Default)]
pub struct Recorder {
    values: Mutex<Vec<f64>>,
}

impl Recorder {
    /// Observer that appends each report as a percentage.
    pub fn observer(&self) -> impl Fn(Progress) + Send + Sync + '_ {
        move |progress: Progress| {
            self.values
                .lock()
                .expect("recorder lock")
                .push(progress.percent());
        }
    }

    pub fn percents(&self) -> Vec<f64> {
        self.values.lock().expect("recorder lock").clone()
    }
}
