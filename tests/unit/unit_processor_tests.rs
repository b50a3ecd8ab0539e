/*!
 * Tests for ID:::Text parsing
 */

use anyhow::Result;
use linetrans::errors::UnitParseError;
use linetrans::unit_processor::{split_unit_line, LineSlot, TranslationUnit, UnitCollection};
use crate::common;

/// Test that a plain file parses into ordered units
#[test]
fn test_parse_str_withSimpleFile_shouldKeepOrder() -> Result<()> {
    let collection = UnitCollection::parse_str(&common::sample_units(5), true)?;

    assert_eq!(collection.ids(), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(collection.units[2].source_text, "Line 3");
    assert_eq!(collection.units[2].line, 3);
    assert!(collection.trailing_newline);
    assert!(collection.header.is_none());
    Ok(())
}

/// Test that only the first delimiter splits the line
#[test]
fn test_split_unit_line_withDelimiterInText_shouldSplitOnFirst() {
    assert_eq!(split_unit_line("7:::a:::b"), Some(("7", "a:::b")));
    assert_eq!(split_unit_line(" 8 :::  padded "), Some(("8", "  padded ")));
    assert_eq!(split_unit_line(":::no id"), None);
    assert_eq!(split_unit_line("no delimiter"), None);
}

/// Test that IDs are opaque strings, not numbers
#[test]
fn test_parse_str_withNonNumericIds_shouldAcceptThem() -> Result<()> {
    let collection = UnitCollection::parse_str("ui.title:::Title\n10:::Ten\n9:::Nine\n", true)?;

    assert_eq!(collection.ids(), vec!["ui.title", "10", "9"]);
    Ok(())
}

/// Test that a header line is set aside when requested
#[test]
fn test_parse_str_withHeader_shouldSeparateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_localization(temp_dir.path(), "temp.txt")?;
    let content = std::fs::read_to_string(path)?;

    let collection = UnitCollection::parse_str(&content, true)?;
    assert_eq!(collection.header.as_ref().map(|h| h.source_text.as_str()), Some("Header v1.2"));
    assert_eq!(collection.ids(), vec!["1", "2", "3"]);

    let collection = UnitCollection::parse_str(&content, false)?;
    assert!(collection.header.is_none());
    assert_eq!(collection.ids(), vec!["0", "1", "2", "3"]);
    Ok(())
}

/// Test that a line after a literal \n continues the previous unit
#[test]
fn test_parse_str_withContinuationLine_shouldJoinUnit() -> Result<()> {
    let content = "1:::First\\n\nsecond half\n2:::Next\n";

    let collection = UnitCollection::parse_str(content, true)?;

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.units[0].source_text, "First\\n\nsecond half");
    Ok(())
}

/// Test that stray lines are kept in place but never become units
#[test]
fn test_parse_str_withStrayLines_shouldKeepThemAsPassthrough() -> Result<()> {
    let content = "# comment\n1:::One\n\nnot a unit\n2:::Two";

    let collection = UnitCollection::parse_str(content, true)?;

    assert_eq!(collection.ids(), vec!["1", "2"]);
    assert!(!collection.trailing_newline);
    assert_eq!(
        collection.layout,
        vec![
            LineSlot::Passthrough("# comment".to_string()),
            LineSlot::Unit(0),
            LineSlot::Passthrough(String::new()),
            LineSlot::Passthrough("not a unit".to_string()),
            LineSlot::Unit(1),
        ]
    );
    Ok(())
}

/// Test that a byte-order mark does not end up in the first ID
#[test]
fn test_parse_str_withBom_shouldStripIt() -> Result<()> {
    let collection = UnitCollection::parse_str("\u{feff}1:::One\n", true)?;

    assert_eq!(collection.ids(), vec!["1"]);
    Ok(())
}

/// Test that duplicate IDs are fatal and report the offending line
#[test]
fn test_parse_str_withDuplicateId_shouldFail() {
    let err = UnitCollection::parse_str("1:::A\n2:::B\n1:::C\n", true).unwrap_err();

    match err {
        UnitParseError::DuplicateId { line, id, content } => {
            assert_eq!(line, 3);
            assert_eq!(id, "1");
            assert_eq!(content, "1:::C");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Test that a file without units parses into an empty collection
#[test]
fn test_parse_str_withNoUnits_shouldReturnEmptyCollection() -> Result<()> {
    let empty = UnitCollection::parse_str("", true)?;
    assert!(empty.is_empty());
    assert!(empty.output_lines().is_empty());

    let text_only = UnitCollection::parse_str("just text\n", true)?;
    assert!(text_only.is_empty());
    assert_eq!(text_only.output_lines(), vec!["just text".to_string()]);
    Ok(())
}

/// Test that output falls back to the source text
#[test]
fn test_output_line_withoutTranslation_shouldUseSource() {
    let mut unit = TranslationUnit::new("4", "Hello");
    assert_eq!(unit.output_line(), "4:::Hello");
    assert!(!unit.is_translated());

    unit.translated_text = Some("Xin chào".to_string());
    assert_eq!(unit.output_line(), "4:::Xin chào");
    assert_eq!(unit.source_line(), "4:::Hello");
}
