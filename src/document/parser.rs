//! PDF parsing.
//!
//! Parsing is eager only as far as the page table: the signature is
//! checked, the object graph is loaded with `lopdf`, and page object ids
//! are recorded. Page content is decoded when a page's text is requested,
//! and a page whose content streams are broken fails on its own.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

use crate::document::page::{PageHandle, PageSource};
use crate::document::text::{FontDecoder, check_operations, extract_text, page_fonts, resolve};
use crate::error::DocumentError;

/// Magic bytes that open every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// The signature must start within this many leading bytes.
const SIGNATURE_WINDOW: usize = 1024;

/// Parses raw bytes into a [`ParsedDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl DocumentParser {
    /// Validates the signature and loads the page table.
    ///
    /// The byte buffer is consumed; once the object graph is built the
    /// raw bytes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] if the signature or structure
    /// is invalid and [`DocumentError::NoPages`] if the page tree is empty.
    pub fn parse(bytes: Vec<u8>) -> Result<ParsedDocument, DocumentError> {
        if !has_signature(&bytes) {
            return Err(DocumentError::Malformed {
                reason: "missing %PDF- header".to_string(),
            });
        }

        let document = Document::load_mem(&bytes).map_err(|e| DocumentError::Malformed {
            reason: e.to_string(),
        })?;
        drop(bytes);

        // BTreeMap iteration yields pages in ascending page-number order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(DocumentError::NoPages);
        }

        debug!(pages = pages.len(), "parsed document");
        Ok(ParsedDocument { document, pages })
    }
}

/// Returns true if the PDF signature appears near the start of `bytes`.
#[must_use]
pub fn has_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .any(|w| w == PDF_SIGNATURE)
}

/// A parsed PDF with a known page set.
pub struct ParsedDocument {
    document: Document,
    pages: Vec<ObjectId>,
}

impl std::fmt::Debug for ParsedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedDocument")
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl PageSource for ParsedDocument {
    #[allow(clippy::cast_possible_truncation)]
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Result<Box<dyn PageHandle + '_>, DocumentError> {
        let count = self.page_count();
        if number == 0 || number > count {
            return Err(DocumentError::PageOutOfRange {
                page: number,
                count,
            });
        }
        let id = self.pages[(number - 1) as usize];
        Ok(Box::new(PdfPage {
            document: &self.document,
            number,
            id,
            content: None,
        }))
    }
}

/// One page of a [`ParsedDocument`].
///
/// Holds the page's decoded operations and font decoders between `text`
/// and `release`.
struct PdfPage<'a> {
    document: &'a Document,
    number: u32,
    id: ObjectId,
    content: Option<PageContent>,
}

/// Working state of a page whose text has been requested.
#[derive(Debug)]
struct PageContent {
    operations: Content,
    fonts: BTreeMap<Vec<u8>, FontDecoder>,
}

impl PdfPage<'_> {
    fn failed(&self, reason: impl std::fmt::Display) -> DocumentError {
        DocumentError::PageFailed {
            page: self.number,
            reason: reason.to_string(),
        }
    }

    /// Concatenated, decompressed bytes of the page's content streams.
    ///
    /// A page without `/Contents` is blank. A declared entry that doesn't
    /// resolve to a readable stream fails the page.
    fn content_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let page = self
            .document
            .get_dictionary(self.id)
            .map_err(|e| self.failed(e))?;
        let Ok(contents) = page.get(b"Contents") else {
            return Ok(Vec::new());
        };
        let contents = resolve(self.document, contents)
            .map_err(|e| self.failed(format!("unresolved page contents: {e}")))?;
        let entries: Vec<&Object> = match contents {
            Object::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut bytes = Vec::new();
        for entry in entries {
            let stream = resolve(self.document, entry)
                .and_then(Object::as_stream)
                .map_err(|e| self.failed(format!("unreadable content stream: {e}")))?;
            let data = if stream.dict.has(b"Filter") {
                let data = stream
                    .decompressed_content()
                    .map_err(|e| self.failed(format!("content stream filter: {e}")))?;
                if data.is_empty() && !stream.content.is_empty() {
                    return Err(self.failed("content stream filter produced no data"));
                }
                data
            } else {
                stream.content.clone()
            };
            if !bytes.is_empty() {
                bytes.push(b'\n');
            }
            bytes.extend_from_slice(&data);
        }
        Ok(bytes)
    }
}

impl PageHandle for PdfPage<'_> {
    fn number(&self) -> u32 {
        self.number
    }

    fn text(&mut self) -> Result<String, DocumentError> {
        let bytes = self.content_bytes()?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(String::new());
        }

        let operations = Content::decode(&bytes).map_err(|e| self.failed(e))?;
        check_operations(&operations.operations).map_err(|e| self.failed(e))?;
        let fonts = page_fonts(self.document, self.id).map_err(|e| self.failed(e))?;

        let content = self.content.insert(PageContent { operations, fonts });
        Ok(extract_text(&content.operations.operations, &content.fonts))
    }

    fn release(&mut self) {
        self.content = None;
    }
}
