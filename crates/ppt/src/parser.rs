//! Text extraction from legacy `.ppt` decks.
//!
//! A `.ppt` file is an OLE compound file whose `PowerPoint Document` stream
//! is a tree of records. Every record starts with an 8-byte header (version
//! and instance, type, length); records with version `0xF` are containers
//! whose payload is more records. Slide text lives in text atoms preceded by
//! a text header atom naming the text kind, and each slide persist atom
//! marks the start of the next slide's text in the slide list.
//!
//! Table structure is not recoverable from the record stream, so slides from
//! this backend only ever carry text blocks.

use cfb::CompoundFile;
use deck_core::{Deck, DeckFormat, Error, Result, SlideContent};
use std::collections::BTreeSet;
use std::io::{Read, Seek};

const DOCUMENT_STREAM: &str = "/PowerPoint Document";

/// Smallest document stream that can hold a document container with text.
const MIN_STREAM_SIZE: usize = 512;

/// Highest text header value defined by the format.
const MAX_KNOWN_TEXT_KIND: u32 = 8;

/// Streams with more truncated records than this are rejected.
const MAX_TRUNCATED_RECORDS: usize = 10;

const RECORD_HEADER_LEN: usize = 8;
const CONTAINER_VERSION: u16 = 0x0F;

mod record_types {
    pub const DOCUMENT: u16 = 0x03E8;
    pub const SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const TEXT_BYTES_ATOM: u16 = 0x0FA8;
}

/// Master and layout placeholder prompts, compared lowercased.
const PLACEHOLDER_PROMPTS: &[&str] = &[
    "click to edit",
    "click to add",
    "edit master",
    "master title",
    "master text",
    "second level",
    "third level",
    "fourth level",
    "fifth level",
];

/// Windows-1252 code points for bytes 0x80..=0x9F.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '•', '–', '—', '˜',
    '™', 'š', '›', 'œ', '\u{FFFD}', 'ž', 'Ÿ',
];

/// Kind of text announced by a text header atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextKind {
    Title,
    Body,
    Notes,
    NotUsed,
    Other,
    CenterBody,
    CenterTitle,
    HalfBody,
    QuarterBody,
}

impl TextKind {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Title,
            1 => Self::Body,
            2 => Self::Notes,
            3 => Self::NotUsed,
            5 => Self::CenterBody,
            6 => Self::CenterTitle,
            7 => Self::HalfBody,
            8 => Self::QuarterBody,
            _ => Self::Other,
        }
    }

    fn is_title(self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    fn is_visible(self) -> bool {
        !matches!(self, Self::Notes | Self::NotUsed)
    }
}

/// One record header read from the stream.
#[derive(Debug, Clone, Copy)]
struct RecordHeader {
    version: u16,
    rec_type: u16,
    content_start: usize,
    content_end: usize,
}

impl RecordHeader {
    /// Read the header at `pos`, or `None` if the record overruns `end`.
    fn read(data: &[u8], pos: usize, end: usize) -> Option<Self> {
        let version_instance = read_u16_le(data, pos);
        let rec_type = read_u16_le(data, pos + 2);
        let len = read_u32_le(data, pos + 4) as usize;
        let content_start = pos + RECORD_HEADER_LEN;
        let content_end = content_start.checked_add(len)?;
        if content_end > end || content_end > data.len() {
            return None;
        }
        Some(Self {
            version: version_instance & 0x0F,
            rec_type,
            content_start,
            content_end,
        })
    }

    fn is_container(&self) -> bool {
        self.version == CONTAINER_VERSION
    }

    fn content<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.content_start..self.content_end]
    }
}

/// What a quick scan of the document stream found.
#[derive(Debug, Default)]
struct StreamSummary {
    has_document: bool,
    text_atoms: usize,
    unknown_text_kinds: BTreeSet<u32>,
    truncated_records: usize,
}

/// A visible text atom together with where it sits in the stream.
#[derive(Debug)]
struct TextAtom {
    text: String,
    kind: TextKind,
    offset: usize,
    slide_ordinal: usize,
}

/// Parser for legacy PPT (OLE/CFB) decks.
#[derive(Debug, Default)]
pub struct PptParser;

impl PptParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a `.ppt` deck into text-only slides.
    ///
    /// A file that is not a compound file, lacks the document stream, or has
    /// a truncated record tree is a deck-level error.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Deck> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open compound file: {}", e)))?;

        let data = read_document_stream(&mut cfb)?;
        let summary = scan_stream(&data)?;
        log::debug!(
            "{}: {} byte document stream, {} text atoms",
            filename,
            data.len(),
            summary.text_atoms
        );
        if !summary.unknown_text_kinds.is_empty() {
            log::warn!(
                "{}: unknown text kinds {:?} treated as body text",
                filename,
                summary.unknown_text_kinds
            );
        }

        let mut atoms = Vec::new();
        let mut walk = WalkState::default();
        collect_text_atoms(&data, 0, data.len(), &mut walk, &mut atoms);

        let mut deck = Deck::new(filename, DeckFormat::Ppt);
        for (index, group) in group_into_slides(&atoms).into_iter().enumerate() {
            deck.add_slide(build_slide(index + 1, &group));
        }

        if deck.slides.is_empty() {
            log::warn!("{}: no slide text found", filename);
        }
        Ok(deck)
    }
}

fn read_document_stream<R: Read + Seek>(cfb: &mut CompoundFile<R>) -> Result<Vec<u8>> {
    if !cfb.is_stream(DOCUMENT_STREAM) {
        return Err(Error::UnsupportedFormat(
            "compound file has no 'PowerPoint Document' stream".to_string(),
        ));
    }

    let mut stream = cfb
        .open_stream(DOCUMENT_STREAM)
        .map_err(|e| Error::CfbError(format!("Failed to open document stream: {}", e)))?;
    let mut data = Vec::new();
    stream
        .read_to_end(&mut data)
        .map_err(|e| Error::CfbError(format!("Failed to read document stream: {}", e)))?;
    Ok(data)
}

/// Check the stream is a document record tree worth walking.
fn scan_stream(data: &[u8]) -> Result<StreamSummary> {
    if data.len() < MIN_STREAM_SIZE {
        return Err(Error::CorruptedFile(format!(
            "document stream is {} bytes, expected at least {}",
            data.len(),
            MIN_STREAM_SIZE
        )));
    }

    let mut summary = StreamSummary::default();
    scan_records(data, 0, data.len(), &mut summary);

    if !summary.has_document {
        return Err(Error::UnsupportedFormat(
            "no document record found (pre-97 or damaged file)".to_string(),
        ));
    }
    if summary.truncated_records > MAX_TRUNCATED_RECORDS {
        return Err(Error::CorruptedFile(format!(
            "{} truncated records in document stream",
            summary.truncated_records
        )));
    }
    Ok(summary)
}

fn scan_records(data: &[u8], start: usize, end: usize, summary: &mut StreamSummary) {
    let mut pos = start;
    while pos + RECORD_HEADER_LEN <= end {
        let Some(header) = RecordHeader::read(data, pos, end) else {
            summary.truncated_records += 1;
            return;
        };

        match header.rec_type {
            record_types::DOCUMENT => summary.has_document = true,
            record_types::TEXT_HEADER_ATOM => {
                let content = header.content(data);
                if content.len() >= 4 {
                    let kind = read_u32_le(content, 0);
                    if kind > MAX_KNOWN_TEXT_KIND {
                        summary.unknown_text_kinds.insert(kind);
                    }
                }
            }
            record_types::TEXT_CHARS_ATOM | record_types::TEXT_BYTES_ATOM => {
                summary.text_atoms += 1
            }
            _ => {}
        }

        if header.is_container() {
            scan_records(data, header.content_start, header.content_end, summary);
        }
        pos = header.content_end;
    }
}

#[derive(Debug)]
struct WalkState {
    kind: TextKind,
    slide_ordinal: usize,
}

impl Default for WalkState {
    fn default() -> Self {
        Self {
            kind: TextKind::Body,
            slide_ordinal: 0,
        }
    }
}

fn collect_text_atoms(
    data: &[u8],
    start: usize,
    end: usize,
    state: &mut WalkState,
    atoms: &mut Vec<TextAtom>,
) {
    let mut pos = start;
    while pos + RECORD_HEADER_LEN <= end {
        let Some(header) = RecordHeader::read(data, pos, end) else {
            return;
        };

        let text = match header.rec_type {
            record_types::SLIDE_PERSIST_ATOM => {
                state.slide_ordinal += 1;
                None
            }
            record_types::TEXT_HEADER_ATOM => {
                let content = header.content(data);
                if content.len() >= 4 {
                    state.kind = TextKind::from_u32(read_u32_le(content, 0));
                }
                None
            }
            record_types::TEXT_CHARS_ATOM => decode_utf16(header.content(data)),
            record_types::TEXT_BYTES_ATOM => decode_cp1252(header.content(data)),
            _ => None,
        };

        if let Some(text) = text.and_then(|t| visible_text(&t, state.kind)) {
            atoms.push(TextAtom {
                text,
                kind: state.kind,
                offset: pos,
                slide_ordinal: state.slide_ordinal,
            });
        }

        if header.is_container() {
            collect_text_atoms(data, header.content_start, header.content_end, state, atoms);
        }
        pos = header.content_end;
    }
}

/// Normalized text of an atom, or `None` for notes, placeholder prompts
/// and stray bullet glyphs.
fn visible_text(raw: &str, kind: TextKind) -> Option<String> {
    if !kind.is_visible() {
        return None;
    }

    // Paragraphs end in CR and soft breaks are vertical tabs.
    let text: String = raw
        .split(['\r', '\u{000B}'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return None;
    }

    let lowered = text.to_lowercase();
    if PLACEHOLDER_PROMPTS.iter().any(|p| lowered.contains(p)) {
        return None;
    }

    let mut chars = text.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        if !only.is_alphanumeric() {
            return None;
        }
    }
    Some(text)
}

/// Group atoms by the slide persist atom they follow. A stream without
/// persist boundaries is split at title text instead.
fn group_into_slides(atoms: &[TextAtom]) -> Vec<Vec<&TextAtom>> {
    let mut groups: Vec<Vec<&TextAtom>> = Vec::new();
    for atom in atoms {
        match groups.last_mut() {
            Some(group) if group[0].slide_ordinal == atom.slide_ordinal => group.push(atom),
            _ => groups.push(vec![atom]),
        }
    }

    if groups.len() == 1 && groups[0].len() > 1 {
        return split_at_titles(atoms);
    }
    groups
}

fn split_at_titles(atoms: &[TextAtom]) -> Vec<Vec<&TextAtom>> {
    let mut groups: Vec<Vec<&TextAtom>> = Vec::new();
    for atom in atoms {
        match groups.last_mut() {
            Some(group) if !atom.kind.is_title() => group.push(atom),
            _ => groups.push(vec![atom]),
        }
    }
    groups
}

/// Title text first, then the rest in stream order.
fn build_slide(slide_number: usize, group: &[&TextAtom]) -> SlideContent {
    let mut ordered = group.to_vec();
    ordered.sort_by_key(|atom| (!atom.kind.is_title(), atom.offset));

    let mut slide = SlideContent::new(slide_number);
    for atom in ordered {
        slide.add_text_block(atom.text.clone());
    }
    slide
}

/// UTF-16LE text up to the first NUL.
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0);
    let text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Windows-1252 text up to the first NUL.
fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text: String = bytes[..end]
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => char::from(b),
        })
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
