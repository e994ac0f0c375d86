//! Validation at the document input boundary.
//!
//! Type and size are checked from what the source declares, before any
//! byte is read. The two rejections are kept distinct for user feedback.

use crate::error::ValidationError;
use crate::io::{ByteSource, PDF_MIME_TYPE, mime_from_path};

/// Checks that `source` declares a PDF type and fits under `max_size`.
///
/// A declared MIME type takes precedence; without one the file extension
/// decides. Type is checked before size.
///
/// # Errors
///
/// Returns [`ValidationError::WrongType`] or [`ValidationError::TooLarge`].
///
/// # Examples
///
/// ```
/// use docchat::document::validate_source;
/// use docchat::io::MemorySource;
///
/// let ok = MemorySource::new("paper.pdf", b"%PDF-1.7".to_vec());
/// assert!(validate_source(&ok, 1024).is_ok());
///
/// let wrong = MemorySource::new("notes.txt", b"hello".to_vec());
/// assert_eq!(validate_source(&wrong, 1024).unwrap_err().reason(), "wrong-type");
/// ```
pub fn validate_source(source: &dyn ByteSource, max_size: u64) -> Result<(), ValidationError> {
    let detected = source
        .content_type()
        .map(ToString::to_string)
        .or_else(|| mime_from_path(source.name()).map(ToString::to_string));

    match detected {
        Some(mime) if is_pdf_mime(&mime) => {}
        Some(mime) => {
            return Err(ValidationError::WrongType {
                name: source.name().to_string(),
                detected: mime,
            });
        }
        None => {
            return Err(ValidationError::WrongType {
                name: source.name().to_string(),
                detected: "unknown".to_string(),
            });
        }
    }

    let size = source.size();
    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// True for `application/pdf`, ignoring case and parameters.
fn is_pdf_mime(mime: &str) -> bool {
    mime.split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;
    use test_case::test_case;

    #[test_case("application/pdf", true ; "plain")]
    #[test_case("Application/PDF", true ; "mixed case")]
    #[test_case("application/pdf; charset=binary", true ; "with parameters")]
    #[test_case("text/plain", false ; "text")]
    #[test_case("application/x-pdf-ish", false ; "lookalike")]
    fn test_is_pdf_mime(mime: &str, expected: bool) {
        assert_eq!(is_pdf_mime(mime), expected);
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        let source = MemorySource::new("upload.bin", vec![0; 4]).with_content_type("application/pdf");
        assert!(validate_source(&source, 10).is_ok());

        let source = MemorySource::new("fake.pdf", vec![0; 4]).with_content_type("image/png");
        assert!(matches!(
            validate_source(&source, 10),
            Err(ValidationError::WrongType { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let source = MemorySource::new("README", vec![0; 4]);
        let err = validate_source(&source, 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                name: "README".to_string(),
                detected: "unknown".to_string()
            }
        );
    }

    #[test]
    fn test_too_large_is_distinguished() {
        let source = MemorySource::new("big.pdf", vec![0; 4]).with_declared_size(11);
        let err = validate_source(&source, 10).unwrap_err();
        assert_eq!(err.reason(), "too-large");
    }
}
