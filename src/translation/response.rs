/*!
 * Recovery and validation of `ID:::Text` pairs from a model response.
 *
 * Parsing mirrors the input parser so that a response echoing its request
 * reproduces the request exactly: the first `:::` splits a line, and a line
 * without one continues the previous text when that text holds a literal `\n`.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::errors::ProviderError;
use crate::unit_processor::{split_unit_line, TranslationUnit, ESCAPED_NEWLINE};

/// `12| text`, `12: text`, `12> text`, `12. text`, `12) text`, `12] text`
static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s*[|:>.)\]]\s*(.*)$").unwrap()
});

/// Non-fatal mismatch between a response and its batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A response line that is not in the line protocol
    MalformedLine { line: String },
    /// Batch IDs absent from the response; those units keep their source text
    MissingIds { ids: Vec<String> },
    /// IDs the batch never asked for; discarded
    UnexpectedIds { ids: Vec<String> },
    /// An ID answered twice; the first answer is kept
    DuplicateId { id: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine { line } => write!(f, "Malformed line: {}", line),
            Self::MissingIds { ids } => write!(f, "Missing IDs: {}", ids.join(", ")),
            Self::UnexpectedIds { ids } => write!(f, "Unexpected IDs: {}", ids.join(", ")),
            Self::DuplicateId { id } => write!(f, "Duplicate ID: {}", id),
        }
    }
}

/// Translations recovered from one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Recovered text per expected ID
    pub translations: HashMap<String, String>,

    /// Expected IDs with no translation, in batch order
    pub missing: Vec<String>,

    /// Everything noteworthy found while parsing
    pub warnings: Vec<ValidationWarning>,
}

impl ParsedResponse {
    /// Whether every expected ID was answered
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Attach recovered texts to their units and return how many were set
    pub fn apply_to(&self, units: &mut [TranslationUnit]) -> usize {
        let mut applied = 0;
        for unit in units.iter_mut() {
            if let Some(text) = self.translations.get(&unit.id) {
                unit.translated_text = Some(text.clone());
                applied += 1;
            }
        }
        applied
    }
}

/// Match a numbered line that lacks the `:::` delimiter
fn split_numbered_line(line: &str) -> Option<(&str, &str)> {
    let captures = NUMBERED_LINE.captures(line)?;
    let id = captures.get(1)?.as_str();
    let text = captures.get(2).map_or("", |m| m.as_str().trim());
    Some((id, text))
}

/// Parse `raw` against the batch's `expected` IDs.
///
/// # Returns
/// * `Ok(ParsedResponse)` when at least one line carried an ID
/// * `Err(ProviderError::EmptyResponse)` for a blank body
/// * `Err(ProviderError::UnparseableResponse)` when no line yielded an ID
pub fn parse_response(raw: &str, expected: &[&str]) -> Result<ParsedResponse, ProviderError> {
    if raw.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let expected_set: HashSet<&str> = expected.iter().copied().collect();
    let mut parsed = ParsedResponse::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut unexpected: Vec<String> = Vec::new();
    // ID whose text the next continuation line extends
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if let Some((id, text)) = split_unit_line(line) {
            current = record(&mut parsed, &mut seen, &mut unexpected, &expected_set, id, text);
            continue;
        }

        if let Some(text) = current.as_ref().and_then(|id| parsed.translations.get_mut(id)) {
            if text.contains(ESCAPED_NEWLINE) {
                text.push('\n');
                text.push_str(line);
                continue;
            }
        }

        if let Some((id, text)) = split_numbered_line(line) {
            current = record(&mut parsed, &mut seen, &mut unexpected, &expected_set, id, text);
            continue;
        }

        current = None;
        if !line.trim().is_empty() {
            debug!("Dropping response line outside the protocol: {}", line);
            parsed.warnings.push(ValidationWarning::MalformedLine {
                line: line.to_string(),
            });
        }
    }

    if seen.is_empty() {
        let preview: String = raw.chars().take(120).collect();
        return Err(ProviderError::UnparseableResponse(preview));
    }

    parsed.missing = expected
        .iter()
        .filter(|id| !parsed.translations.contains_key(**id))
        .map(|id| id.to_string())
        .collect();
    if !parsed.missing.is_empty() {
        warn!("Response is missing {} of {} IDs", parsed.missing.len(), expected.len());
        parsed.warnings.push(ValidationWarning::MissingIds {
            ids: parsed.missing.clone(),
        });
    }
    if !unexpected.is_empty() {
        warn!("Response has {} unexpected IDs", unexpected.len());
        parsed.warnings.push(ValidationWarning::UnexpectedIds { ids: unexpected });
    }

    Ok(parsed)
}

/// Store one recovered pair; returns the ID continuation lines may extend
fn record(
    parsed: &mut ParsedResponse,
    seen: &mut HashSet<String>,
    unexpected: &mut Vec<String>,
    expected: &HashSet<&str>,
    id: &str,
    text: &str,
) -> Option<String> {
    if !seen.insert(id.to_string()) {
        parsed.warnings.push(ValidationWarning::DuplicateId { id: id.to_string() });
        return None;
    }
    if !expected.contains(id) {
        unexpected.push(id.to_string());
        return None;
    }
    parsed.translations.insert(id.to_string(), text.to_string());
    Some(id.to_string())
}
