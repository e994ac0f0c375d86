//! Byte sources for document input.
//!
//! A source knows its total size before anything is read, so oversize
//! input can be rejected up front.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::error::{IoError, Result};

/// MIME type of the supported document format.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A finite source of bytes with a known total size.
///
/// Reads are issued sequentially by [`crate::io::ChunkedReader`]; each call
/// may suspend.
#[async_trait]
pub trait ByteSource: Send {
    /// Display name (file name or label).
    fn name(&self) -> &str;

    /// Total size in bytes, known before any read.
    fn size(&self) -> u64;

    /// Declared MIME type, if the source carries one.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returning fewer bytes than requested before the end of the source
    /// is treated as a read failure by the caller.
    async fn read_chunk(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>>;
}

/// Guesses a MIME type from a file extension.
///
/// # Examples
///
/// ```
/// use docchat::io::mime_from_path;
///
/// assert_eq!(mime_from_path("report.PDF"), Some("application/pdf"));
/// assert_eq!(mime_from_path("notes.txt"), Some("text/plain"));
/// assert_eq!(mime_from_path("README"), None);
/// ```
pub fn mime_from_path<P: AsRef<Path>>(path: P) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    };
    Some(mime)
}

/// A document on the local filesystem.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
    name: String,
    content_type: Option<&'static str>,
}

impl FileSource {
    /// Opens a file and records its size.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or its metadata can't be
    /// read.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref)
            .await
            .map_err(|e| IoError::ReadFailed {
                path: path_str.clone(),
                reason: e.to_string(),
            })?;

        let metadata = file.metadata().await.map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let name = path_ref
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(path_str, ToString::to_string);

        Ok(Self {
            file,
            size: metadata.len(),
            name,
            content_type: mime_from_path(path_ref),
        })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type
    }

    async fn read_chunk(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::with_capacity(len);
        (&mut self.file).take(len as u64).read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// An in-memory source, for uploads that already arrived as bytes.
///
/// # Examples
///
/// ```
/// use docchat::io::{ByteSource, MemorySource};
///
/// let source = MemorySource::new("upload.pdf", b"%PDF-1.4".to_vec());
/// assert_eq!(source.size(), 8);
/// assert_eq!(source.reads(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
    declared_size: u64,
    content_type: Option<String>,
    reads: usize,
}

impl MemorySource {
    /// Creates a source over `bytes`; the MIME type is guessed from `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_from_path(&name).map(ToString::to_string);
        Self {
            declared_size: bytes.len() as u64,
            name,
            bytes,
            content_type,
            reads: 0,
        }
    }

    /// Overrides the declared MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Overrides the declared size, as reported by an upload boundary.
    #[must_use]
    pub const fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    /// Number of chunk reads served so far.
    #[must_use]
    pub const fn reads(&self) -> usize {
        self.reads
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.declared_size
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn read_chunk(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        self.reads += 1;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.bytes.len());
        let end = start.saturating_add(len).min(self.bytes.len());
        Ok(self.bytes[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_source_size_and_name() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("doc.pdf");
        std::fs::write(&file_path, b"%PDF-1.4 hello").unwrap();

        let source = FileSource::open(&file_path).await.unwrap();
        assert_eq!(source.size(), 14);
        assert_eq!(source.name(), "doc.pdf");
        assert_eq!(source.content_type(), Some(PDF_MIME_TYPE));
    }

    #[tokio::test]
    async fn test_file_source_reads_at_offsets() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bytes.bin");
        std::fs::write(&file_path, b"0123456789").unwrap();

        let mut source = FileSource::open(&file_path).await.unwrap();
        assert_eq!(source.read_chunk(0, 4).await.unwrap(), b"0123");
        assert_eq!(source.read_chunk(4, 4).await.unwrap(), b"4567");
        assert_eq!(source.read_chunk(8, 4).await.unwrap(), b"89");
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let result = FileSource::open("/nonexistent/path/file.pdf").await;
        assert!(matches!(
            result,
            Err(crate::Error::Io(IoError::FileNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_memory_source_counts_reads() {
        let mut source = MemorySource::new("a.pdf", b"abcdef".to_vec());
        assert_eq!(source.read_chunk(2, 3).await.unwrap(), b"cde");
        assert_eq!(source.read_chunk(5, 3).await.unwrap(), b"f");
        assert_eq!(source.read_chunk(10, 3).await.unwrap(), b"");
        assert_eq!(source.reads(), 3);
    }

    #[test]
    fn test_memory_source_overrides() {
        let source = MemorySource::new("blob", vec![1, 2, 3])
            .with_content_type("application/pdf")
            .with_declared_size(4096);
        assert_eq!(source.size(), 4096);
        assert_eq!(source.content_type(), Some("application/pdf"));
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path("a.pdf"), Some(PDF_MIME_TYPE));
        assert_eq!(mime_from_path("a.bin"), Some("application/octet-stream"));
        assert_eq!(mime_from_path("noext"), None);
    }
}
