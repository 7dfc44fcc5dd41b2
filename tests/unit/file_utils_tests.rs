/*!
 * Tests for file system utilities
 */

use anyhow::Result;
use std::fs;
use transcript_pdf::file_utils::FileManager;

use crate::common;

#[test]
fn test_writeAtomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = common::create_test_file(temp_dir.path(), "output_5.pdf", "old")?;

    FileManager::write_atomic(&target, b"new content")?;

    assert_eq!(fs::read(&target)?, b"new content");
    assert_eq!(common::list_files(temp_dir.path()), vec!["output_5.pdf"]);
    Ok(())
}

#[test]
fn test_ensureDir_shouldCreateNestedDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b");

    FileManager::ensure_dir(&nested)?;
    FileManager::ensure_dir(&nested)?;

    assert!(nested.is_dir());
    Ok(())
}

#[test]
fn test_readToString_withMissingFile_shouldMentionPath() {
    let err = FileManager::read_to_string("/no/such/page.html").unwrap_err();
    assert!(format!("{:#}", err).contains("page.html"));
}

#[test]
fn test_fileExists_shouldIgnoreDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_file(temp_dir.path(), "x.json", "{}")?;

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}
