#![cfg(test)]

use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

use crate::kernel::error::Result;
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}

#[test]
fn test_write_and_read_string() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let provider = LocalStorageProvider::new(temp_dir.path().to_path_buf());

    provider.write_string(&p("settings.json"), "{\"a\": 1}")?;
    assert_eq!(provider.read_to_string(&p("settings.json"))?, "{\"a\": 1}");
    assert!(provider.is_file(&p("settings.json")));

    // Overwrites replace the whole file
    provider.write_string(&p("settings.json"), "{}")?;
    assert_eq!(provider.read_to_string(&p("settings.json"))?, "{}");
    Ok(())
}

#[test]
fn test_write_creates_parent_directories() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let provider = LocalStorageProvider::new(temp_dir.path().join("not").join("yet"));

    provider.write_bytes(&p("deep/file.bin"), b"\x00\x01")?;
    assert_eq!(fs::read(temp_dir.path().join("not/yet/deep/file.bin")).unwrap(), vec![0u8, 1]);
    assert!(provider.is_dir(&p("deep")));
    Ok(())
}

#[test]
fn test_atomic_write_leaves_no_temp_files() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let provider = LocalStorageProvider::new(temp_dir.path().to_path_buf());

    for i in 0..5 {
        provider.write_string(&p("settings.json"), &format!("{{\"n\": {i}}}"))?;
    }
    assert_eq!(provider.read_dir(&p(""))?, vec![p("settings.json")]);
    Ok(())
}

#[test]
fn test_read_dir_is_relative_and_sorted() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let provider = LocalStorageProvider::new(temp_dir.path().to_path_buf());

    fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
    provider.write_string(&p("sub/b.txt"), "b")?;
    provider.write_string(&p("sub/a.txt"), "a")?;
    fs::create_dir_all(temp_dir.path().join("sub/nested")).unwrap();

    assert_eq!(
        provider.read_dir(&p("sub"))?,
        vec![p("sub/a.txt"), p("sub/b.txt"), p("sub/nested")]
    );
    assert!(provider.read_dir(&p("missing")).is_err());
    Ok(())
}

#[test]
fn test_missing_file_errors_carry_path() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let provider = LocalStorageProvider::new(temp_dir.path().to_path_buf());

    let err = provider.read_to_string(&p("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"), "{err}");
}
