//! Reading deck files and dispatching to the format backends.

use deck_core::{Deck, DeckFormat, Error, Result};
use deck_ppt::PptParser;
use deck_pptx::PptxParser;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;

/// Bytes needed to recognise either container signature.
const MAGIC_LEN: usize = 8;

/// A deck file read into memory, not yet parsed.
#[derive(Debug, Clone)]
pub struct DeckFile {
    /// File name without directories, used as the record source.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DeckFile {
    /// Read a deck from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }

    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Lowercase hex SHA-256 of the file contents.
    pub fn content_hash(&self) -> String {
        sha256_hex(&self.bytes)
    }

    /// Detect the container format from magic bytes, falling back to the
    /// file extension.
    pub fn format(&self) -> Result<DeckFormat> {
        let magic = &self.bytes[..self.bytes.len().min(MAGIC_LEN)];
        DeckFormat::from_magic(magic)
            .or_else(|| {
                Path::new(&self.filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(DeckFormat::from_extension)
            })
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("cannot detect deck format of {}", self.filename))
            })
    }

    /// Parse the slides with the backend for the detected format.
    pub fn parse(&self) -> Result<Deck> {
        let reader = Cursor::new(self.bytes.as_slice());
        match self.format()? {
            DeckFormat::Pptx => {
                log::debug!("{}: parsing as PPTX", self.filename);
                PptxParser::new().parse(reader, &self.filename)
            }
            DeckFormat::Ppt => {
                log::debug!("{}: parsing as legacy PPT", self.filename);
                PptParser::new().parse(reader, &self.filename)
            }
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_wins_over_extension() {
        let file = DeckFile::from_bytes("report.ppt", vec![0x50, 0x4B, 0x03, 0x04, 0, 0]);
        assert_eq!(file.format().unwrap(), DeckFormat::Pptx);
    }

    #[test]
    fn test_extension_fallback() {
        let file = DeckFile::from_bytes("report.PPTM", b"garbage".to_vec());
        assert_eq!(file.format().unwrap(), DeckFormat::Pptx);

        let file = DeckFile::from_bytes("notes.txt", b"garbage".to_vec());
        assert!(matches!(file.format(), Err(Error::UnsupportedFormat(_))));

        let file = DeckFile::from_bytes("empty", Vec::new());
        assert!(file.format().is_err());
    }

    #[test]
    fn test_content_hash() {
        let file = DeckFile::from_bytes("a.pptx", b"abc".to_vec());
        assert_eq!(
            file.content_hash(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_corrupt_zip_is_a_file_error() {
        let mut bytes = vec![0x50, 0x4B, 0x03, 0x04];
        bytes.extend_from_slice(b"truncated");
        let file = DeckFile::from_bytes("broken.pptx", bytes);
        assert!(file.parse().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = DeckFile::read(Path::new("/nonexistent/deck.pptx")).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
