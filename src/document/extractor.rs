//! Per-page text extraction with partial-failure isolation.
//!
//! Pages are visited in ascending order. A page that fails to extract is
//! replaced by a placeholder and never aborts the document.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::core::{ContextComposer, Progress, ProgressObserver, SessionContext};
use crate::document::page::{PageScope, PageSource};
use crate::error::DocumentError;

/// Placeholder substituted for a page whose text could not be extracted.
#[must_use]
pub fn placeholder(page: u32) -> String {
    format!("[Error extracting text from page {page}]")
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The page's text, whitespace-normalized.
    Extracted {
        /// Page number (1-based).
        page: u32,
        /// Extracted text.
        text: String,
    },
    /// Extraction failed; the placeholder stands in for the page.
    Placeholder {
        /// Page number (1-based).
        page: u32,
        /// Why extraction failed.
        reason: String,
    },
}

impl PageOutcome {
    /// Page number (1-based).
    #[must_use]
    pub const fn page(&self) -> u32 {
        match self {
            Self::Extracted { page, .. } | Self::Placeholder { page, .. } => *page,
        }
    }

    /// Text contributed to the context.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Extracted { text, .. } => text.clone(),
            Self::Placeholder { page, .. } => placeholder(*page),
        }
    }

    /// True if the page extracted successfully.
    #[must_use]
    pub const fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }
}

/// Ordered per-page outcomes for a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pages: Vec<PageOutcome>,
}

impl ExtractionResult {
    /// Outcomes in page order.
    #[must_use]
    pub fn pages(&self) -> &[PageOutcome] {
        &self.pages
    }

    /// Number of pages visited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True if no pages were visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of pages replaced by placeholders.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_extracted()).count()
    }

    /// Page texts in order, placeholders included.
    pub fn texts(&self) -> impl Iterator<Item = String> + '_ {
        self.pages.iter().map(PageOutcome::text)
    }

    /// Composes the page texts into a session context.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::EmptyExtraction`] if no readable text
    /// remains.
    pub fn compose(&self, composer: &ContextComposer) -> Result<SessionContext, DocumentError> {
        composer.compose(self.texts())
    }

    fn push(mut self, outcome: PageOutcome) -> Self {
        self.pages.push(outcome);
        self
    }
}

/// Collapses runs of whitespace in a page's text runs into single spaces.
///
/// # Examples
///
/// ```
/// use docchat::document::normalize_page_text;
///
/// assert_eq!(normalize_page_text("  Hello\n  world \t!\n"), "Hello world !");
/// ```
#[must_use]
#[allow(clippy::expect_used)]
pub fn normalize_page_text(raw: &str) -> String {
    static CONTROL: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let control = CONTROL
        .get_or_init(|| Regex::new(r"[\x00-\x08\x0B\x0E-\x1F\x7F\u{FFFD}]").expect("valid regex"));
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let cleaned = control.replace_all(raw, "");
    whitespace.replace_all(&cleaned, " ").trim().to_string()
}

/// Drives a [`PageSource`] page by page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageExtractor;

impl PageExtractor {
    /// Extracts one page, substituting a placeholder on failure.
    ///
    /// The page is released before this returns, whatever the outcome.
    pub fn extract_page(source: &dyn PageSource, number: u32) -> PageOutcome {
        let mut scope = match source.page(number) {
            Ok(page) => PageScope::new(page),
            Err(e) => return Self::recover(number, &e),
        };

        let outcome = match scope.text() {
            Ok(raw) => PageOutcome::Extracted {
                page: number,
                text: normalize_page_text(&raw),
            },
            Err(e) => Self::recover(number, &e),
        };
        scope.release();
        outcome
    }

    /// Extracts every page in ascending order.
    ///
    /// Progress is reported after each page as
    /// `0.5 + 0.5 * pages_done / page_count`. A cooperative yield follows
    /// every page.
    pub async fn extract_all(
        source: &dyn PageSource,
        observer: &dyn ProgressObserver,
    ) -> ExtractionResult {
        let count = source.page_count();
        let mut result = ExtractionResult {
            pages: Vec::with_capacity(count as usize),
        };

        for number in 1..=count {
            result = result.push(Self::extract_page(source, number));
            observer.on_progress(Progress::extracting(number, count));
            tokio::task::yield_now().await;
        }

        debug!(
            pages = count,
            failed = result.failed_count(),
            "extracted document text"
        );
        result
    }

    fn recover(number: u32, error: &DocumentError) -> PageOutcome {
        warn!(page = number, error = %error, "page extraction failed; using placeholder");
        PageOutcome::Placeholder {
            page: number,
            reason: error.to_string(),
        }
    }
}
