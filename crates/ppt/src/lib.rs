//! Legacy PowerPoint 97-2003 (`.ppt`) backend.
//!
//! Reads the record stream of the OLE compound file and yields text-only
//! slides for the extraction engine.

pub mod parser;

pub use parser::PptParser;
