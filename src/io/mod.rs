//! I/O layer for docchat.
//!
//! Provides byte sources with a known size and the chunked reader that
//! assembles a source into memory under a fixed ceiling.

pub mod reader;
pub mod source;

pub use reader::{ChunkedReader, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE, reassemble};
pub use source::{ByteSource, FileSource, MemorySource, PDF_MIME_TYPE, mime_from_path};
