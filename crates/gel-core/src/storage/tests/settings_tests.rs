#![cfg(test)]

use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

use crate::kernel::error::Result;
use crate::storage::selection::{format_selection, load_selection, parse_selection, save_selection};
use crate::storage::Settings;

#[test]
fn test_settings_file_location() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let settings = Settings::open(temp_dir.path().to_path_buf());
    assert_eq!(settings.path(), temp_dir.path().join("settings.json"));
}

#[cfg(feature = "toml-config")]
#[test]
fn test_existing_toml_settings_keep_their_format() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    std::fs::write(temp_dir.path().join("settings.toml"), "theme = \"dark\"\n").unwrap();

    let settings = Settings::open(temp_dir.path().to_path_buf());
    assert_eq!(settings.path(), temp_dir.path().join("settings.toml"));
    assert_eq!(settings.get::<String>("theme")?, Some("dark".to_string()));

    settings.set("volume", 30)?;
    let written = std::fs::read_to_string(temp_dir.path().join("settings.toml")).unwrap();
    assert!(written.contains("volume = 30"), "{written}");
    assert!(!temp_dir.path().join("settings.json").exists());
    Ok(())
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_existing_yml_settings_keep_their_file() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    std::fs::write(temp_dir.path().join("settings.yml"), "plugins: lyrics\n").unwrap();

    let settings = Settings::open(temp_dir.path().to_path_buf());
    assert_eq!(load_selection(&settings)?, vec!["lyrics"]);

    save_selection(&settings, &["lyrics", "hello"])?;
    assert!(!temp_dir.path().join("settings.json").exists());
    assert!(!temp_dir.path().join("settings.yaml").exists());
    let reopened = Settings::open(temp_dir.path().to_path_buf());
    assert_eq!(reopened.path(), temp_dir.path().join("settings.yml"));
    assert_eq!(load_selection(&reopened)?, vec!["lyrics", "hello"]);
    Ok(())
}

#[test]
fn test_get_set_remove() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let settings = Settings::open(temp_dir.path().join("eina"));

    assert_eq!(settings.get::<String>("theme")?, None);
    settings.set("theme", "dark")?;
    settings.set("volume", 30)?;
    assert_eq!(settings.get::<String>("theme")?, Some("dark".to_string()));
    assert_eq!(settings.get_or("volume", 100)?, 30);

    assert!(settings.remove("theme")?);
    assert!(!settings.remove("theme")?);

    // Written through to disk
    let reopened = Settings::open(temp_dir.path().join("eina"));
    assert_eq!(reopened.get::<i32>("volume")?, Some(30));
    assert_eq!(reopened.get::<String>("theme")?, None);
    Ok(())
}

#[test]
fn test_reload_sees_external_changes() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let settings = Settings::open(temp_dir.path().to_path_buf());
    settings.set("n", 1)?;

    std::fs::write(settings.path(), "{\"n\": 5}").unwrap();
    settings.reload();
    assert_eq!(settings.get::<i32>("n")?, Some(5));
    Ok(())
}

#[test]
fn test_concurrent_writers_keep_every_key() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let settings = Arc::new(Settings::open(temp_dir.path().to_path_buf()));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let settings = Arc::clone(&settings);
            thread::spawn(move || settings.set(&format!("key{i}"), i))
        })
        .collect();
    for worker in workers {
        worker.join().expect("writer panicked")?;
    }

    settings.reload();
    for i in 0..8 {
        assert_eq!(settings.get::<i32>(&format!("key{i}"))?, Some(i));
    }
    Ok(())
}

#[test]
fn test_parse_and_format_selection() {
    assert_eq!(parse_selection("/p/hello/libhello.so, lyrics,,lyrics"), vec!["/p/hello/libhello.so", "lyrics"]);
    assert!(parse_selection("").is_empty());
    assert_eq!(format_selection(&["a", "b"]), "a,b");
    assert_eq!(format_selection::<&str>(&[]), "");
}

#[test]
fn test_selection_persistence() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let settings = Settings::open(temp_dir.path().to_path_buf());
    assert!(load_selection(&settings)?.is_empty());

    save_selection(&settings, &["/p/hello/libhello.so", "lyrics"])?;
    let stored: Option<String> = settings.get("plugins")?;
    assert_eq!(stored.as_deref(), Some("/p/hello/libhello.so,lyrics"));

    let reopened = Settings::open(temp_dir.path().to_path_buf());
    assert_eq!(load_selection(&reopened)?, vec!["/p/hello/libhello.so", "lyrics"]);
    Ok(())
}
