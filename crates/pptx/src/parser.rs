//! PPTX file parser implementation.

use deck_core::normalize::clean_text;
use deck_core::types::Table;
use deck_core::{Deck, DeckFormat, Error, Result, SlideContent};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    ///
    /// Fails only when the package itself is unusable. A slide that cannot be
    /// read is kept as an empty slide and recorded in [`Deck::issues`].
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Deck> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut deck = Deck::new(filename, DeckFormat::Pptx);
        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("{}: {} slides", filename, slide_order.len());

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let slide_number = idx + 1;
            match self.parse_slide(&mut archive, slide_path, slide_number) {
                Ok(slide) => deck.add_slide(slide),
                Err(e) => deck.add_unreadable_slide(slide_number, e.to_string()),
            }
        }

        Ok(deck)
    }

    /// Slide part paths in presentation order.
    ///
    /// The order comes from the slide id list in `presentation.xml`; slides
    /// it does not mention follow, ordered by the number in their part name.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self
            .read_file_from_archive(archive, PRESENTATION_RELS_PATH)
            .map_err(|e| Error::PptxParseError(format!("Missing presentation relationships: {}", e)))?;
        let rels = parse_slide_relationships(&rels_content)?;

        let listed = match self.read_file_from_archive(archive, PRESENTATION_PATH) {
            Ok(content) => parse_slide_id_list(&content)?,
            Err(e) => {
                log::warn!("Presentation part unreadable, ordering slides by name: {}", e);
                Vec::new()
            }
        };

        let mut order: Vec<String> = listed
            .iter()
            .filter_map(|rid| rels.get(rid).cloned())
            .collect();

        let mut rest: Vec<&String> = rels.values().filter(|path| !order.contains(path)).collect();
        rest.sort_by(|a, b| match (extract_slide_number(a), extract_slide_number(b)) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        order.extend(rest.into_iter().cloned());

        Ok(order)
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SlideContent> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let parsed = parse_slide_xml(&content)?;

        let mut slide = SlideContent::new(slide_number);
        for shape in parsed.shapes {
            slide.add_text_block(shape.text);
        }
        for table in parsed.tables {
            slide.add_table(table);
        }
        Ok(slide)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Map of relationship id to slide part path.
fn parse_slide_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut slides = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"Relationship" => {
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                if !rel_type.ends_with("/slide") {
                    continue;
                }
                let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) else {
                    continue;
                };
                let full_path = match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("ppt/{}", target),
                };
                slides.insert(id, full_path);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Relationship ids of `p:sldId` entries in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldId" => {
                let rid = e
                    .attributes()
                    .flatten()
                    .find(|attr| local_name(attr.key.as_ref()) == b"id" && attr.key.as_ref() != b"id")
                    .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
                if let Some(rid) = rid {
                    ids.push(rid);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing presentation: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Information about a shape extracted from XML.
#[derive(Debug, Default)]
struct ShapeInfo {
    text: String,
    x: f64,
    y: f64,
    positioned: bool,
}

/// One `a:tc` element before merge flattening.
#[derive(Debug, Default)]
struct CellInfo {
    paragraphs: Vec<String>,
    h_merge: bool,
    v_merge: bool,
}

#[derive(Debug, Default)]
struct TableBuilder {
    rows: Vec<Vec<CellInfo>>,
    current_row: Option<Vec<CellInfo>>,
    current_cell: Option<CellInfo>,
}

impl TableBuilder {
    fn start_cell(&mut self, e: &BytesStart<'_>) {
        let flag = |key: &[u8]| {
            attribute(e, key).map_or(false, |v| v == "1" || v.eq_ignore_ascii_case("true"))
        };
        self.current_cell = Some(CellInfo {
            paragraphs: Vec::new(),
            h_merge: flag(b"hMerge"),
            v_merge: flag(b"vMerge"),
        });
    }

    fn end_cell(&mut self) {
        if let (Some(cell), Some(row)) = (self.current_cell.take(), self.current_row.as_mut()) {
            row.push(cell);
        }
    }

    fn end_row(&mut self) {
        if let Some(row) = self.current_row.take() {
            self.rows.push(row);
        }
    }

    /// Grid with merged regions flattened: continuation cells repeat the
    /// value of the cell they continue.
    fn finish(self) -> Table {
        let mut grid: Table = Vec::with_capacity(self.rows.len());
        for (r, row) in self.rows.into_iter().enumerate() {
            let mut values: Vec<String> = Vec::with_capacity(row.len());
            for (c, cell) in row.into_iter().enumerate() {
                let value = if cell.h_merge && c > 0 {
                    values[c - 1].clone()
                } else if cell.v_merge && r > 0 {
                    grid[r - 1].get(c).cloned().unwrap_or_default()
                } else {
                    clean_text(&cell.paragraphs.join(" "))
                };
                values.push(value);
            }
            grid.push(values);
        }
        grid
    }
}

#[derive(Debug, Default)]
struct ParsedSlide {
    shapes: Vec<ShapeInfo>,
    tables: Vec<Table>,
}

fn apply_offset(shape: &mut ShapeInfo, e: &BytesStart<'_>) {
    if shape.positioned {
        return;
    }
    if let Some(x) = attribute(e, b"x").and_then(|v| v.parse::<f64>().ok()) {
        shape.x = x;
    }
    if let Some(y) = attribute(e, b"y").and_then(|v| v.parse::<f64>().ok()) {
        shape.y = y;
    }
    shape.positioned = true;
}

/// Extract text shapes (sorted top-to-bottom, then left-to-right) and tables
/// (document order) from slide XML.
fn parse_slide_xml(xml_content: &str) -> Result<ParsedSlide> {
    let mut parsed = ParsedSlide::default();
    let mut reader = Reader::from_str(xml_content);

    let mut current_shape: Option<ShapeInfo> = None;
    let mut shape_paragraphs: Vec<String> = Vec::new();
    let mut table: Option<TableBuilder> = None;
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    current_shape = Some(ShapeInfo::default());
                    shape_paragraphs.clear();
                }
                b"off" => {
                    if let Some(shape) = current_shape.as_mut() {
                        apply_offset(shape, e);
                    }
                }
                b"tbl" => table = Some(TableBuilder::default()),
                b"tr" => {
                    if let Some(t) = table.as_mut() {
                        t.current_row = Some(Vec::new());
                    }
                }
                b"tc" => {
                    if let Some(t) = table.as_mut() {
                        t.start_cell(e);
                    }
                }
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(shape) = current_shape.as_mut() {
                        apply_offset(shape, e);
                    }
                }
                b"tc" => {
                    if let Some(t) = table.as_mut() {
                        t.start_cell(e);
                        t.end_cell();
                    }
                }
                b"br" => paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::XmlError(format!("Bad text content: {}", err)))?;
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    match table.as_mut().and_then(|t| t.current_cell.as_mut()) {
                        Some(cell) => cell.paragraphs.push(text),
                        None if current_shape.is_some() => shape_paragraphs.push(text),
                        None => {}
                    }
                }
                b"tc" => {
                    if let Some(t) = table.as_mut() {
                        t.end_cell();
                    }
                }
                b"tr" => {
                    if let Some(t) = table.as_mut() {
                        t.end_row();
                    }
                }
                b"tbl" => {
                    if let Some(t) = table.take() {
                        parsed.tables.push(t.finish());
                    }
                }
                b"sp" => {
                    if let Some(mut shape) = current_shape.take() {
                        shape.text = shape_paragraphs
                            .iter()
                            .map(|p| p.trim())
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join("\n");
                        if !shape.text.is_empty() {
                            parsed.shapes.push(shape);
                        }
                    }
                    shape_paragraphs.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Malformed slide XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    parsed.shapes.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    Ok(parsed)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a part name like "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
