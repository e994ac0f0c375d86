//! Paged document abstraction.
//!
//! A [`PageSource`] hands out [`PageHandle`]s by 1-based page number. The
//! extractor wraps every handle in a [`PageScope`], which releases the
//! page's resources exactly once when the scope ends.

use crate::error::DocumentError;

/// A document that can produce its pages on demand.
///
/// Pages are produced lazily; requesting the same number again yields a
/// fresh handle, so the sequence can be restarted.
pub trait PageSource: Send + Sync {
    /// Number of pages, known after parsing.
    fn page_count(&self) -> u32;

    /// Returns the handle for page `number` (`1..=page_count`).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::PageOutOfRange`] for numbers outside the
    /// page set, or another [`DocumentError`] if the page can't be located.
    fn page(&self, number: u32) -> Result<Box<dyn PageHandle + '_>, DocumentError>;
}

/// One page of a document.
pub trait PageHandle: Send {
    /// Page number (1-based).
    fn number(&self) -> u32;

    /// Produces the page's plain text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::PageFailed`] if the page content is corrupt
    /// or uses an unsupported encoding.
    fn text(&mut self) -> Result<String, DocumentError>;

    /// Frees any resources acquired by [`PageHandle::text`].
    fn release(&mut self);
}

/// Owns a page for the duration of one extraction step.
///
/// Dropping the scope calls [`PageHandle::release`]; calling
/// [`PageScope::release`] early is also allowed and is not repeated on
/// drop.
pub struct PageScope<'a> {
    page: Box<dyn PageHandle + 'a>,
    released: bool,
}

impl<'a> PageScope<'a> {
    /// Takes ownership of a page handle.
    #[must_use]
    pub fn new(page: Box<dyn PageHandle + 'a>) -> Self {
        Self {
            page,
            released: false,
        }
    }

    /// Page number (1-based).
    #[must_use]
    pub fn number(&self) -> u32 {
        self.page.number()
    }

    /// Produces the page's plain text.
    ///
    /// # Errors
    ///
    /// Propagates the page's extraction error.
    pub fn text(&mut self) -> Result<String, DocumentError> {
        self.page.text()
    }

    /// Releases the page now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.page.release();
            tracing::trace!(page = self.page.number(), "released page");
        }
    }
}

impl Drop for PageScope<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}
