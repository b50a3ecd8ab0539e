/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use linetrans::file_utils::{FileManager, DEFAULT_OUTPUT_FILE};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "temp.txt", "1:::Hello")?;

    assert!(FileManager::file_exists(&test_file));

    Ok(())
}

/// Test that file_exists returns false for directories and missing files
#[test]
fn test_file_exists_withDirectoryOrMissingFile_shouldReturnFalse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.txt")));

    Ok(())
}

/// Test that the default output goes beside the input
#[test]
fn test_generate_output_path_withInputFile_shouldUseTranTxtInSameDir() {
    let output_path = FileManager::generate_output_path(Path::new("/tmp/loc/temp.txt"));

    assert_eq!(output_path, Path::new("/tmp/loc").join(DEFAULT_OUTPUT_FILE));
}

/// Test that ensure_dir creates nested directories
#[test]
fn test_ensure_dir_withNestedPath_shouldCreateAllLevels() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b").join("c");

    FileManager::ensure_dir(&nested)?;
    FileManager::ensure_dir(&nested)?;

    assert!(nested.is_dir());
    Ok(())
}

/// Test that write_atomic replaces existing content and leaves no temp files behind
#[test]
fn test_write_atomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = common::create_test_file(temp_dir.path(), "tran.txt", "old content")?;

    FileManager::write_atomic(&target, "1:::Xin chào\n")?;

    assert_eq!(fs::read_to_string(&target)?, "1:::Xin chào\n");
    let entries = fs::read_dir(temp_dir.path())?.count();
    assert_eq!(entries, 1);
    Ok(())
}

/// Test that write_atomic creates missing parent directories
#[test]
fn test_write_atomic_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("out").join("tran.txt");

    FileManager::write_atomic(&target, "1:::A")?;

    assert_eq!(FileManager::read_to_string(&target)?, "1:::A");
    Ok(())
}

/// Test that read_to_string reports the path of a missing file
#[test]
fn test_read_to_string_withMissingFile_shouldNamePathInError() {
    let err = FileManager::read_to_string("definitely_missing_input.txt").unwrap_err();

    assert!(format!("{:#}", err).contains("definitely_missing_input.txt"));
}
