//! Clipboard block codec
//!
//! Copy produces tab-separated text. Paste accepts tab-separated text and,
//! when the text is a single scalar, falls back to an HTML `<table>` payload
//! (what spreadsheet apps put next to the plain text).
//!
//! Placement:
//! - a selection at least as tall and as wide as the block gets the block
//!   tiled over it, anchored at the selection's top-left
//! - otherwise the block lands 1:1 at the active cell and may grow the grid
//!   downward
//! - columns past the last column are dropped

use celltable_core::{Bounds, CellPos};

use crate::model::{CellUpdate, TableModel};

/// A rectangular (or ragged) block of cell text.
pub type Block = Vec<Vec<String>>;

// ============================================================================
// TSV
// ============================================================================

pub fn to_tsv(block: &[Vec<String>]) -> String {
    block.iter().map(|row| row.join("\t")).collect::<Vec<_>>().join("\n")
}

/// Normalize line endings, drop one trailing empty line, split on tabs.
pub fn parse_tsv(text: &str) -> Block {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

// ============================================================================
// HTML tables
// ============================================================================

/// Extract `<tr>` rows of `<td>`/`<th>` text. Unbalanced or sloppy markup and
/// bare `&` are tolerated. On a hard error the rows read so far are kept.
pub fn parse_html_table(html: &str) -> Block {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_dangling_amp = true;
    let mut buf = Vec::new();

    let mut rows: Block = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match tag(e.name().as_ref()) {
                Tag::Row => {
                    if let Some(done) = row.take() {
                        rows.push(done);
                    }
                    row = Some(Vec::new());
                    cell = None;
                }
                Tag::Cell if row.is_some() => {
                    if let (Some(r), Some(text)) = (row.as_mut(), cell.take()) {
                        r.push(text);
                    }
                    cell = Some(String::new());
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if let (Tag::Cell, Some(r)) = (tag(e.name().as_ref()), row.as_mut()) {
                    if let Some(text) = cell.take() {
                        r.push(text);
                    }
                    r.push(String::new());
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(text) = cell.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if let Some(text) = cell.as_mut() {
                    text.push_str(&decode_entity(&String::from_utf8_lossy(e.as_ref())));
                }
            }
            Ok(Event::End(ref e)) => match tag(e.name().as_ref()) {
                Tag::Cell => {
                    if let (Some(r), Some(text)) = (row.as_mut(), cell.take()) {
                        r.push(text);
                    }
                }
                Tag::Row => {
                    if let Some(mut done) = row.take() {
                        if let Some(text) = cell.take() {
                            done.push(text);
                        }
                        rows.push(done);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::trace!("html table parse stopped at {}: {e}", reader.buffer_position());
                // a half-read cell is not trustworthy; finished cells are kept
                cell = None;
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(mut done) = row.take() {
        if let Some(text) = cell.take() {
            done.push(text);
        }
        rows.push(done);
    }
    rows
}

enum Tag {
    Row,
    Cell,
    Other,
}

fn tag(name: &[u8]) -> Tag {
    if name.eq_ignore_ascii_case(b"tr") {
        Tag::Row
    } else if name.eq_ignore_ascii_case(b"td") || name.eq_ignore_ascii_case(b"th") {
        Tag::Cell
    } else {
        Tag::Other
    }
}

/// Resolve one entity reference name (`amp`, `#160`, `#x41`).
fn decode_entity(name: &str) -> String {
    let named = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    };
    let numeric = || {
        let digits = name.strip_prefix('#')?;
        let code = match digits.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => digits.parse().ok()?,
        };
        char::from_u32(code)
    };
    match named.or_else(numeric) {
        Some(ch) => ch.to_string(),
        None => format!("&{name};"),
    }
}

// ============================================================================
// Paste planning
// ============================================================================

fn is_grid(block: &[Vec<String>]) -> bool {
    block.len() > 1 || block.first().is_some_and(|row| row.len() > 1)
}

/// Pick the block to paste: the text grid when it has more than one cell,
/// else the HTML grid if there is one, else the text scalar. `None` when
/// both payloads are empty.
pub fn choose_block(text: &str, html: Option<&str>) -> Option<Block> {
    let text_block = parse_tsv(text);
    if is_grid(&text_block) {
        return Some(text_block);
    }
    let html_block = html.map(parse_html_table).unwrap_or_default();
    let block = if html_block.is_empty() { text_block } else { html_block };
    (!block.is_empty()).then_some(block)
}

fn block_width(block: &[Vec<String>]) -> usize {
    block.iter().map(Vec::len).max().unwrap_or(0)
}

/// Turn a block into cell updates in visible coordinates.
pub fn plan_paste(
    block: &[Vec<String>],
    active: CellPos,
    selection: Option<Bounds>,
    col_count: usize,
) -> Vec<CellUpdate> {
    let height = block.len();
    let width = block_width(block);
    if height == 0 || width == 0 {
        return Vec::new();
    }

    match selection {
        Some(sel) if sel.height() >= height && sel.width() >= width => sel
            .cells()
            .filter(|p| p.c < col_count)
            .filter_map(|p| {
                let text = block[(p.r - sel.r1) % height].get((p.c - sel.c1) % width)?;
                Some(CellUpdate::new(p.r, p.c, text.as_str()))
            })
            .collect(),
        _ => block
            .iter()
            .enumerate()
            .flat_map(|(dr, row)| {
                row.iter().enumerate().map(move |(dc, text)| (active.r + dr, active.c + dc, text))
            })
            .filter(|&(_, c, _)| c < col_count)
            .map(|(r, c, text)| CellUpdate::new(r, c, text.as_str()))
            .collect(),
    }
}

// ============================================================================
// Copy
// ============================================================================

/// The selection's values, or the active cell alone.
pub fn copy_block(model: &TableModel, selection: Option<Bounds>) -> Block {
    let bounds = selection.unwrap_or_else(|| Bounds::single(model.active()));
    (bounds.r1..=bounds.r2)
        .map(|r| (bounds.c1..=bounds.c2).map(|c| model.get_value(r, c)).collect())
        .collect()
}
