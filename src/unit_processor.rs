use log::{debug, warn};
use std::collections::HashMap;

use crate::errors::UnitParseError;

// @module: Parsing of `ID:::Text` files into translation units

// @const: Delimiter between ID and text
pub const DELIMITER: &str = ":::";

// @const: Literal escaped newline marker kept verbatim in unit text
pub const ESCAPED_NEWLINE: &str = "\\n";

// @const: ID of the optional header line
pub const HEADER_ID: &str = "0";

// @struct: Single addressable line of source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    // @field: Stable identifier, unique within a file
    pub id: String,

    // @field: Text as read from the input
    pub source_text: String,

    // @field: Text produced by the model, if any
    pub translated_text: Option<String>,

    // @field: 1-based line number in the input file
    pub line: usize,
}

impl TranslationUnit {
    /// Create a unit that has not been translated yet
    pub fn new(id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_text: source_text.into(),
            translated_text: None,
            line: 0,
        }
    }

    /// Same as `new` but records the input line number
    pub fn at_line(id: impl Into<String>, source_text: impl Into<String>, line: usize) -> Self {
        Self {
            line,
            ..Self::new(id, source_text)
        }
    }

    /// Translated text when present, source text otherwise
    pub fn output_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.source_text)
    }

    pub fn is_translated(&self) -> bool {
        self.translated_text.is_some()
    }

    /// Line as it is sent to the model
    pub fn source_line(&self) -> String {
        format!("{}{}{}", self.id, DELIMITER, self.source_text)
    }

    /// Line as it is written to the output file
    pub fn output_line(&self) -> String {
        format!("{}{}{}", self.id, DELIMITER, self.output_text())
    }
}

/// Split a protocol line into `(id, text)`.
///
/// The first `:::` is the delimiter, the ID is trimmed and must be non-empty, the
/// text is returned as-is.
pub fn split_unit_line(line: &str) -> Option<(&str, &str)> {
    let (id, text) = line.split_once(DELIMITER)?;
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    Some((id, text))
}

// @enum: Position of one input line in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSlot {
    // @variant: The `0:::` header
    Header,

    // @variant: Index into `units`; the unit may span several lines
    Unit(usize),

    // @variant: Line outside the protocol, written back verbatim
    Passthrough(String),
}

// @struct: Ordered units of one input file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCollection {
    // @field: Leading `0:::` line carried through untranslated
    pub header: Option<TranslationUnit>,

    // @field: Units in order of first appearance
    pub units: Vec<TranslationUnit>,

    // @field: Output layout: header, units and passthrough lines in input order
    pub layout: Vec<LineSlot>,

    // @field: Whether the input ended with a line break
    pub trailing_newline: bool,
}

impl UnitCollection {
    /// Wrap already-built units (no header, trailing newline)
    pub fn from_units(units: Vec<TranslationUnit>) -> Self {
        Self {
            header: None,
            layout: (0..units.len()).map(LineSlot::Unit).collect(),
            units,
            trailing_newline: true,
        }
    }

    /// Parse raw file content.
    ///
    /// Lines that are not `ID:::Text` become passthrough lines, except when the
    /// previous unit's text contains a literal `\n`: then the line continues that unit and is joined to it with a real line
    /// break. Passthrough lines are never translated and keep their position.
    /// Duplicate IDs are fatal.
    pub fn parse_str(content: &str, preserve_header: bool) -> Result<Self, UnitParseError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let trailing_newline = content.ends_with('\n');

        let mut units: Vec<TranslationUnit> = Vec::new();
        let mut layout: Vec<LineSlot> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut passthrough = 0usize;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            match split_unit_line(raw) {
                Some((id, text)) => {
                    if seen.contains_key(id) {
                        return Err(UnitParseError::DuplicateId {
                            line: line_no,
                            id: id.to_string(),
                            content: raw.to_string(),
                        });
                    }
                    seen.insert(id.to_string(), line_no);
                    layout.push(LineSlot::Unit(units.len()));
                    units.push(TranslationUnit::at_line(id, text, line_no));
                }
                None => {
                    if let Some(previous) = units.last_mut() {
                        if previous.source_text.contains(ESCAPED_NEWLINE) {
                            previous.source_text.push('\n');
                            previous.source_text.push_str(raw);
                            continue;
                        }
                    }
                    if raw.trim().is_empty() {
                        debug!("Keeping blank line {}", line_no);
                    } else {
                        warn!("Line {} is not 'ID:::Text', copying it unchanged: {}", line_no, raw);
                    }
                    layout.push(LineSlot::Passthrough(raw.to_string()));
                    passthrough += 1;
                }
            }
        }

        let header = if preserve_header
            && units.first().is_some_and(|u| u.id == HEADER_ID && u.line == 1)
        {
            for slot in layout.iter_mut() {
                *slot = match std::mem::replace(slot, LineSlot::Header) {
                    LineSlot::Unit(0) => LineSlot::Header,
                    LineSlot::Unit(i) => LineSlot::Unit(i - 1),
                    other => other,
                };
            }
            Some(units.remove(0))
        } else {
            None
        };

        if units.is_empty() {
            warn!("No 'ID:::Text' lines found, nothing to translate");
        }
        if passthrough > 0 {
            debug!("Parsed {} units, {} passthrough lines", units.len(), passthrough);
        }

        Ok(Self {
            header,
            units,
            layout,
            trailing_newline,
        })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// IDs in order
    pub fn ids(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.id.as_str()).collect()
    }

    /// Number of units carrying a translation
    pub fn translated_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_translated()).count()
    }

    /// Output lines in input order; a unit with continuation lines yields one
    /// entry holding real line breaks
    pub fn output_lines(&self) -> Vec<String> {
        self.layout
            .iter()
            .filter_map(|slot| match slot {
                LineSlot::Header => self.header.as_ref().map(TranslationUnit::output_line),
                LineSlot::Unit(i) => self.units.get(*i).map(TranslationUnit::output_line),
                LineSlot::Passthrough(line) => Some(line.clone()),
            })
            .collect()
    }
}
