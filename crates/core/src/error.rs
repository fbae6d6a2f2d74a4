//! Error types for deck extraction.
//!
//! Only [`Error::Config`] is meant to escape a batch run. Everything else is
//! a file-level failure that the pipeline converts into a diagnostic.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or reading decks.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// Failed to parse the legacy PPT file structure.
    #[error("PPT parsing error: {0}")]
    PptParseError(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// OLE/CFB container error (for PPT).
    #[error("OLE/CFB error: {0}")]
    CfbError(String),

    /// Malformed or incomplete configuration. Fatal for the whole batch.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A cache entry could not be read or written.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Whether this error must abort the batch instead of failing one file.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
