//! Document ingestion for docchat.
//!
//! Turns a byte source into a [`SessionContext`]:
//!
//! - **Validation**: declared type and size are checked before reading
//! - **Reading**: bounded chunked read into one buffer (first half of progress)
//! - **Parsing**: signature check and page table via `lopdf`
//! - **Extraction**: page-by-page text with placeholders for failed pages
//! - **Composition**: pages joined into the context string

pub mod extractor;
pub mod input;
pub mod page;
pub mod parser;
pub mod text;

pub use extractor::{
    ExtractionResult, PageExtractor, PageOutcome, normalize_page_text, placeholder,
};
pub use input::validate_source;
pub use page::{PageHandle, PageScope, PageSource};
pub use parser::{DocumentParser, ParsedDocument, has_signature};

use serde::Serialize;
use tracing::info;

use crate::core::{ContextComposer, ProgressObserver, SessionContext};
use crate::error::Result;
use crate::io::{ByteSource, ChunkedReader};

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Name of the source.
    pub name: String,
    /// Bytes read.
    pub bytes: u64,
    /// Per-page outcomes.
    pub extraction: ExtractionResult,
    /// Composed context.
    pub context: SessionContext,
}

impl IngestReport {
    /// Number of pages in the document.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.extraction.len()
    }

    /// Number of pages replaced by placeholders.
    #[must_use]
    pub fn failed_pages(&self) -> usize {
        self.extraction.failed_count()
    }
}

/// Runs the ingestion pipeline.
///
/// # Examples
///
/// ```no_run
/// use docchat::core::NoProgress;
/// use docchat::document::Ingestor;
/// use docchat::io::FileSource;
///
/// # async fn run() -> docchat::Result<()> {
/// let mut source = FileSource::open("paper.pdf").await?;
/// let report = Ingestor::default().ingest(&mut source, &NoProgress).await?;
/// println!("{}", report.context.preview());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingestor {
    reader: ChunkedReader,
    composer: ContextComposer,
}

impl Ingestor {
    /// Creates an ingestor from a reader and a composer.
    #[must_use]
    pub const fn new(reader: ChunkedReader, composer: ContextComposer) -> Self {
        Self { reader, composer }
    }

    /// Validates, reads, parses, extracts and composes `source`.
    ///
    /// Progress runs from 0 to 50 % while reading and from 50 to 100 %
    /// while extracting pages.
    ///
    /// # Errors
    ///
    /// Returns a validation, read, malformed-document or empty-extraction
    /// error. Per-page failures are recovered and never returned.
    pub async fn ingest(
        &self,
        source: &mut dyn ByteSource,
        observer: &dyn ProgressObserver,
    ) -> Result<IngestReport> {
        validate_source(source, self.reader.max_size())?;

        let bytes = self.reader.read_all(source, observer).await?;
        let size = bytes.len() as u64;

        let document = DocumentParser::parse(bytes)?;
        let extraction = PageExtractor::extract_all(&document, observer).await;
        drop(document);

        let context = extraction.compose(&self.composer)?;

        info!(
            source = source.name(),
            bytes = size,
            pages = extraction.len(),
            failed_pages = extraction.failed_count(),
            chars = context.char_count(),
            "document ingested"
        );

        Ok(IngestReport {
            name: source.name().to_string(),
            bytes: size,
            extraction,
            context,
        })
    }
}
