//! Document context shared with the conversation.
//!
//! The composer joins per-page text into one context string. The result is
//! used verbatim as the prompt prefix and offers a short preview for display.

use serde::Serialize;
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::DocumentError;

/// Separator placed between consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Default number of characters shown in a preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Default hard cap on the context length in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 2_000_000;

/// Marker appended to a truncated preview.
pub const TRUNCATION_MARKER: &str = "...";

/// Joins extracted page text into a [`SessionContext`].
///
/// Composition is pure: the same pages always yield the same context.
///
/// # Examples
///
/// ```
/// use docchat::core::ContextComposer;
///
/// let ctx = ContextComposer::new().compose(["A", "B", "C"]).unwrap();
/// assert_eq!(ctx.text(), "A\n\nB\n\nC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextComposer {
    preview_chars: usize,
    max_chars: usize,
}

impl Default for ContextComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextComposer {
    /// Creates a composer with the default preview length and hard cap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }

    /// Sets the preview length in characters.
    #[must_use]
    pub const fn preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Sets the hard cap on the full context in characters.
    #[must_use]
    pub const fn max_chars(mut self, chars: usize) -> Self {
        self.max_chars = chars;
        self
    }

    /// Joins page texts with [`PAGE_SEPARATOR`] and trims the result.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::EmptyExtraction`] if nothing but whitespace
    /// remains.
    pub fn compose<I, S>(&self, pages: I) -> Result<SessionContext, DocumentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut page_count = 0_usize;
        let mut joined = String::new();
        for page in pages {
            if page_count > 0 {
                joined.push_str(PAGE_SEPARATOR);
            }
            joined.push_str(page.as_ref());
            page_count += 1;
        }

        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return Err(DocumentError::EmptyExtraction);
        }

        let (text, truncated) = match grapheme_boundary(trimmed, self.max_chars) {
            Some(end) => {
                tracing::warn!(
                    max_chars = self.max_chars,
                    "document context exceeds the hard cap and was truncated"
                );
                (trimmed[..end].to_string(), true)
            }
            None => (trimmed.to_string(), false),
        };

        Ok(SessionContext {
            text,
            page_count,
            truncated,
            preview_chars: self.preview_chars,
        })
    }
}

/// Byte offset after the first `max` grapheme clusters, or `None` if the
/// text is not longer than that.
fn grapheme_boundary(text: &str, max: usize) -> Option<usize> {
    text.grapheme_indices(true).nth(max).map(|(idx, _)| idx)
}

/// The composed text of one document, installed into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    text: String,
    page_count: usize,
    truncated: bool,
    preview_chars: usize,
}

impl SessionContext {
    /// Full context text, used verbatim in prompts.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of pages the context was composed from.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// True if the hard cap cut the text short.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Length of the full text in characters.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Bounded preview of the context.
    #[must_use]
    pub fn preview(&self) -> ContextPreview<'_> {
        match grapheme_boundary(&self.text, self.preview_chars) {
            Some(end) => ContextPreview {
                text: &self.text[..end],
                truncated: true,
            },
            None => ContextPreview {
                text: &self.text,
                truncated: false,
            },
        }
    }
}

/// The leading part of a context, marked when cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextPreview<'a> {
    /// Leading characters of the context.
    pub text: &'a str,
    /// True if the context continues past `text`.
    pub truncated: bool,
}

impl fmt::Display for ContextPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)?;
        if self.truncated {
            f.write_str(TRUNCATION_MARKER)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_joins_with_blank_line() {
        let ctx = ContextComposer::new().compose(["A", "B", "C"]).unwrap();
        assert_eq!(ctx.text(), "A\n\nB\n\nC");
        assert_eq!(ctx.page_count(), 3);
        assert!(!ctx.is_truncated());
    }

    #[test]
    fn test_compose_trims_outer_whitespace_only() {
        let ctx = ContextComposer::new()
            .compose(["  first ", "", " last  "])
            .unwrap();
        assert_eq!(ctx.text(), "first \n\n\n\n last");
    }

    #[test]
    fn test_compose_empty_is_error() {
        let err = ContextComposer::new().compose(["", "  ", "\n"]).unwrap_err();
        assert_eq!(err, DocumentError::EmptyExtraction);

        let none: [&str; 0] = [];
        assert!(ContextComposer::new().compose(none).is_err());
    }

    #[test]
    fn test_preview_short_text_is_not_marked() {
        let ctx = ContextComposer::new().compose(["short"]).unwrap();
        let preview = ctx.preview();
        assert!(!preview.truncated);
        assert_eq!(preview.to_string(), "short");
    }

    #[test]
    fn test_preview_long_text_is_marked() {
        let long = "x".repeat(DEFAULT_PREVIEW_CHARS + 1);
        let ctx = ContextComposer::new().compose([long.as_str()]).unwrap();
        let preview = ctx.preview();
        assert!(preview.truncated);
        assert_eq!(preview.text.len(), DEFAULT_PREVIEW_CHARS);
        assert!(preview.to_string().ends_with(TRUNCATION_MARKER));
        // The full view is untouched.
        assert_eq!(ctx.char_count(), DEFAULT_PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_preview_exact_length_is_not_marked() {
        let exact = "y".repeat(DEFAULT_PREVIEW_CHARS);
        let ctx = ContextComposer::new().compose([exact.as_str()]).unwrap();
        assert!(!ctx.preview().truncated);
    }

    #[test]
    fn test_preview_respects_grapheme_boundaries() {
        let ctx = ContextComposer::new()
            .preview_chars(2)
            .compose(["e\u{301}a\u{301}o"])
            .unwrap();
        assert_eq!(ctx.preview().text, "e\u{301}a\u{301}");
    }

    #[test]
    fn test_hard_cap_truncates_full_text() {
        let ctx = ContextComposer::new()
            .max_chars(4)
            .compose(["abcdef"])
            .unwrap();
        assert_eq!(ctx.text(), "abcd");
        assert!(ctx.is_truncated());
    }
}
