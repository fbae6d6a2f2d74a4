//! PPTX (Office Open XML) slide content extractor.
//!
//! Parses .pptx/.pptm files, which are ZIP archives of XML parts, into a
//! [`deck_core::Deck`] of text blocks and flattened tables.

pub mod parser;

pub use parser::PptxParser;
