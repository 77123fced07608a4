//! Write numbers into a copy of an `.xlsx` template.
//!
//! The package is stream-copied entry by entry. Only the first worksheet's XML
//! (and the workbook's calculation flags) are rewritten, so styles, merged
//! cells, formulas and every other part of the template come through unchanged.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Elements of a workbook that come after `calcPr`
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("worksheet part not found in workbook: {0}")]
    MissingPart(String),
    #[error("invalid cell reference in worksheet xml: {0}")]
    InvalidCellRef(String),
}

/// Numeric value for one cell; `row` is 1-based, `col` 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPatch {
    pub row: u32,
    pub col: u32,
    pub value: Decimal,
}

/// `0` -> `A`, `26` -> `AA`
pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// `G9` -> `(9, 6)`
pub fn parse_cell_ref(s: &str) -> Option<(u32, u32)> {
    let split = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .bytes()
        .try_fold(0u32, |acc, b| {
            acc.checked_mul(26)?
                .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)
        })?;
    let row = digits.parse::<u32>().ok().filter(|r| *r > 0)?;
    Some((row, col - 1))
}

/// Copy `input` to `output`, writing `patches` into the first worksheet.
pub fn patch_first_sheet<R: Read + Seek, W: Write + Seek>(
    input: R,
    output: W,
    patches: &[CellPatch],
) -> Result<(), PatchError> {
    let mut archive = ZipArchive::new(input)?;
    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?;
    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?;
    let sheet_part = first_sheet_part(&workbook_xml, &rels_xml)?;
    let workbook_xml = request_full_calc(&workbook_xml)?;
    log::debug!("Patching {} cells in {}", patches.len(), sheet_part);

    let mut zip = ZipWriter::new(output);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    let mut patched_sheet = false;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if name == sheet_part {
            zip.start_file(name, options)?;
            patch_worksheet_xml(BufReader::new(&mut file), &mut zip, patches)?;
            patched_sheet = true;
        } else if name == WORKBOOK_PART {
            zip.start_file(name, options)?;
            zip.write_all(&workbook_xml)?;
        } else {
            // unchanged parts keep their original compressed bytes
            zip.raw_copy_file(file)?;
        }
    }

    if !patched_sheet {
        return Err(PatchError::MissingPart(sheet_part));
    }
    zip.finish()?;
    Ok(())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, PatchError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(PatchError::MissingPart(name.to_string()))
        }
        Err(err) => return Err(err.into()),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Resolve the package path of the first `<sheet>` listed in the workbook
fn first_sheet_part(workbook_xml: &[u8], rels_xml: &[u8]) -> Result<String, PatchError> {
    let mut reader = Reader::from_reader(workbook_xml);
    let mut buf = Vec::new();
    let mut rel_id = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                        rel_id = Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    let rel_id = rel_id.ok_or(PatchError::NoWorksheet)?;

    let mut reader = Reader::from_reader(rels_xml);
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = e.try_get_attribute("Id")?;
                if id.is_some_and(|id| id.value.as_ref() == rel_id.as_bytes()) {
                    let target = e
                        .try_get_attribute("Target")?
                        .map(|t| String::from_utf8_lossy(&t.value).into_owned())
                        .ok_or(PatchError::NoWorksheet)?;
                    return Ok(resolve_target(&target));
                }
            }
            _ => {}
        }
        buf.clear();
    }
    Err(PatchError::MissingPart(rel_id))
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn element_prefix(qualified: &[u8]) -> String {
    match qualified.iter().position(|&b| b == b':') {
        Some(i) => format!("{}:", String::from_utf8_lossy(&qualified[..i])),
        None => String::new(),
    }
}

/// Ask spreadsheet applications to recalculate formulas when the workbook opens
fn request_full_calc(workbook_xml: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut reader = Reader::from_reader(workbook_xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    let mut prefix = String::new();
    let mut depth = 0usize;
    let mut calc_written = false;

    let calc_pr = |prefix: &str, original: Option<&BytesStart>| -> Result<BytesStart<'static>, PatchError> {
        let mut elem = BytesStart::new(format!("{}calcPr", prefix));
        if let Some(original) = original {
            for attr in original.attributes() {
                let attr = attr?;
                if attr.key.as_ref() != b"fullCalcOnLoad" {
                    elem.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
                }
            }
        }
        elem.push_attribute(("fullCalcOnLoad", "1"));
        Ok(elem)
    };

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"workbook" => {
                prefix = element_prefix(e.name().as_ref());
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
                writer.write_event(event.borrow())?;
            }
            Event::Empty(ref e) if depth == 1 && e.local_name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Empty(calc_pr(&prefix, Some(e))?))?;
                calc_written = true;
            }
            Event::Start(ref e) if depth == 1 && e.local_name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Start(calc_pr(&prefix, Some(e))?))?;
                calc_written = true;
                depth += 1;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if depth == 1 && !calc_written && AFTER_CALC_PR.contains(&e.local_name().as_ref()) =>
            {
                writer.write_event(Event::Empty(calc_pr(&prefix, None)?))?;
                calc_written = true;
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
                writer.write_event(event.borrow())?;
            }
            Event::End(ref e) => {
                if depth == 1 && !calc_written && e.local_name().as_ref() == b"workbook" {
                    writer.write_event(Event::Empty(calc_pr(&prefix, None)?))?;
                    calc_written = true;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(event.borrow())?;
            }
            Event::Start(_) => {
                depth += 1;
                writer.write_event(event.borrow())?;
            }
            _ => writer.write_event(event.borrow())?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

struct OpenRow {
    cells: BTreeMap<u32, Decimal>,
    last_col: Option<u32>,
}

fn attr_string(e: &BytesStart, name: &str) -> Result<Option<String>, PatchError> {
    Ok(e.try_get_attribute(name)?
        .map(|a| String::from_utf8_lossy(&a.value).into_owned()))
}

/// Rewrite worksheet XML, replacing or inserting the patched cells.
///
/// Patched cells keep their style; their type, formula and inline content are
/// replaced by the number.
pub(crate) fn patch_worksheet_xml<R: BufRead, W: Write>(
    input: R,
    output: W,
    patches: &[CellPatch],
) -> Result<(), PatchError> {
    let mut pending: BTreeMap<u32, BTreeMap<u32, Decimal>> = BTreeMap::new();
    for patch in patches {
        pending.entry(patch.row).or_default().insert(patch.col, patch.value);
    }

    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(output);
    let mut buf = Vec::new();

    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut open_row: Option<OpenRow> = None;
    let mut current_row = 0u32;
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }

        match event {
            Event::Eof => break,

            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(e.name().as_ref());
                in_sheet_data = true;
                writer.write_event(Event::Start(e.borrow()))?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(e.name().as_ref());
                writer.write_event(Event::Start(e.borrow()))?;
                write_rows(&mut writer, &prefix, std::mem::take(&mut pending))?;
                writer.write_event(Event::End(BytesEnd::new(format!("{}sheetData", prefix))))?;
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                write_rows(&mut writer, &prefix, std::mem::take(&mut pending))?;
                in_sheet_data = false;
                writer.write_event(Event::End(e.borrow()))?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && open_row.is_none() && e.local_name().as_ref() == b"row" =>
            {
                let row = match attr_string(e, "r")? {
                    Some(r) => r.parse().map_err(|_| PatchError::InvalidCellRef(r))?,
                    None => current_row + 1,
                };
                current_row = row;
                let later = pending.split_off(&row);
                write_rows(&mut writer, &prefix, std::mem::replace(&mut pending, later))?;
                let cells = pending.remove(&row).unwrap_or_default();

                if matches!(event, Event::Start(_)) {
                    writer.write_event(Event::Start(e.borrow()))?;
                    open_row = Some(OpenRow {
                        cells,
                        last_col: None,
                    });
                } else if cells.is_empty() {
                    writer.write_event(Event::Empty(e.borrow()))?;
                } else {
                    writer.write_event(Event::Start(e.borrow()))?;
                    write_cells(&mut writer, &prefix, row, cells)?;
                    writer.write_event(Event::End(BytesEnd::new(format!("{}row", prefix))))?;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" && open_row.is_some() => {
                if let Some(state) = open_row.take() {
                    write_cells(&mut writer, &prefix, current_row, state.cells)?;
                }
                writer.write_event(Event::End(e.borrow()))?;
            }

            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let Some(state) = open_row.as_mut() else {
                    writer.write_event(event.borrow())?;
                    buf.clear();
                    continue;
                };
                let col = match attr_string(e, "r")? {
                    Some(r) => parse_cell_ref(&r).ok_or(PatchError::InvalidCellRef(r))?.1,
                    None => state.last_col.map_or(0, |c| c + 1),
                };
                state.last_col = Some(col);

                let later = state.cells.split_off(&col);
                let earlier = std::mem::replace(&mut state.cells, later);
                write_cells(&mut writer, &prefix, current_row, earlier)?;

                match state.cells.remove(&col) {
                    Some(value) => {
                        write_value_cell(&mut writer, &prefix, Some(e), current_row, col, value)?;
                        if matches!(event, Event::Start(_)) {
                            skip_depth = 1;
                        }
                    }
                    None => writer.write_event(event.borrow())?,
                }
            }

            _ => writer.write_event(event.borrow())?,
        }
        buf.clear();
    }
    Ok(())
}

fn write_rows<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    rows: BTreeMap<u32, BTreeMap<u32, Decimal>>,
) -> Result<(), PatchError> {
    for (row, cells) in rows {
        let mut start = BytesStart::new(format!("{}row", prefix));
        start.push_attribute(("r", row.to_string().as_str()));
        writer.write_event(Event::Start(start))?;
        write_cells(writer, prefix, row, cells)?;
        writer.write_event(Event::End(BytesEnd::new(format!("{}row", prefix))))?;
    }
    Ok(())
}

fn write_cells<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    row: u32,
    cells: BTreeMap<u32, Decimal>,
) -> Result<(), PatchError> {
    for (col, value) in cells {
        write_value_cell(writer, prefix, None, row, col, value)?;
    }
    Ok(())
}

fn write_value_cell<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    original: Option<&BytesStart>,
    row: u32,
    col: u32,
    value: Decimal,
) -> Result<(), PatchError> {
    let name = format!("{}c", prefix);
    let mut start = BytesStart::new(name.as_str());
    match original {
        Some(original) => {
            for attr in original.attributes() {
                let attr = attr?;
                if attr.key.as_ref() != b"t" {
                    start.push_attribute(attr);
                }
            }
        }
        None => start.push_attribute(("r", cell_ref(row, col).as_str())),
    }
    let v = format!("{}v", prefix);
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new(v.as_str())))?;
    writer.write_event(Event::Text(BytesText::new(&value.to_string())))?;
    writer.write_event(Event::End(BytesEnd::new(v.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
