//! Integration tests for persisted session settings.

use tesslab::store::{JsonSettings, SettingsStore};

#[test]
fn test_missing_file_reads_as_absent() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let settings = JsonSettings::new(dir.path().join("settings.json"));
    assert_eq!(settings.get("base_path")?, None);
    Ok(())
}

#[test]
fn test_set_then_get_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let settings = JsonSettings::new(dir.path().join("settings.json"));

    settings.set("base_path", "/data/ground_truth")?;
    assert_eq!(
        settings.get("base_path")?.as_deref(),
        Some("/data/ground_truth")
    );
    Ok(())
}

#[test]
fn test_set_overwrites_and_keeps_other_keys() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let settings = JsonSettings::new(dir.path().join("settings.json"));

    settings.set("base_path", "/old")?;
    settings.set("theme", "dark")?;
    settings.set("base_path", "/new")?;

    assert_eq!(settings.get("base_path")?.as_deref(), Some("/new"));
    assert_eq!(settings.get("theme")?.as_deref(), Some("dark"));
    Ok(())
}

#[test]
fn test_set_creates_parent_directories() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("nested/config/settings.json");
    let settings = JsonSettings::new(&path);

    settings.set("base_path", "/data")?;
    assert!(path.exists());

    // The file is a plain JSON object, readable by anything
    let raw = std::fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(parsed["base_path"], "/data");
    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json at all")?;

    let settings = JsonSettings::new(&path);
    let err = settings.get("base_path").unwrap_err();
    assert!(
        err.to_string().contains("Malformed settings file"),
        "unexpected error: {err:#}"
    );
    Ok(())
}
