//! Snapshot document parsing.
//!
//! A snapshot is a small XML document: one top-level element whose children
//! are named after the snapshot fields, each holding that field's text.
//!
//! ```text
//! <output>
//!   <timestamp>10 May 2024 at 15:51</timestamp>
//!   <title>You Make Me Feel (Radio Edit)</title>
//!   <artist>Vasscon</artist>
//!   ...
//! </output>
//! ```

use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;
use shared::{Field, Record};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ParseError;

/// Reads the snapshot at `path`.
///
/// Returns `Ok(None)` when the document is well formed but carries no usable
/// title. Fields missing from the document are absent from the record.
pub async fn parse(path: &Path) -> Result<Option<Record>, ParseError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ParseError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ParseError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let content = String::from_utf8(bytes).map_err(|e| malformed(path, e))?;
    parse_document(&content, path)
}

/// Parses snapshot content already in memory. `path` is only used in errors.
pub fn parse_document(content: &str, path: &Path) -> Result<Option<Record>, ParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut values: HashMap<Field, String> = HashMap::new();
    let mut current: Option<(Field, String)> = None;
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event().map_err(|e| malformed(path, e))? {
            Event::Start(e) => {
                if depth == 0 {
                    if seen_root {
                        return Err(malformed(path, "more than one top-level element"));
                    }
                    seen_root = true;
                } else if depth == 1 {
                    current = field_of(e.name().as_ref()).map(|f| (f, String::new()));
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    // `<output/>`: a document with no fields at all.
                    seen_root = true;
                } else if depth == 1 {
                    if let Some(field) = field_of(e.name().as_ref()) {
                        values.insert(field, String::new());
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some((field, text)) = current.take() {
                        values.insert(field, clean(&text));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&text_of(&t));
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(malformed(path, "no top-level element"));
    }
    if depth != 0 {
        return Err(malformed(path, "document ended inside an element"));
    }

    let record: Record = Field::ALL
        .iter()
        .filter_map(|f| values.remove(f).map(|v| (f.as_str(), v)))
        .collect();

    Ok(record.is_usable().then_some(record))
}

fn field_of(name: &[u8]) -> Option<Field> {
    std::str::from_utf8(name).ok()?.parse().ok()
}

// Producers do not always escape `&` in URLs; keep the raw text then.
fn text_of(t: &BytesText) -> String {
    match t.unescape() {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(t).into_owned(),
    }
}

// Line breaks are layout, not content.
fn clean(text: &str) -> String {
    text.replace(['\r', '\n'], "").trim().to_string()
}

fn malformed(path: &Path, message: impl ToString) -> ParseError {
    ParseError::Malformed {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
