use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Key under which the last-used ground-truth directory is remembered.
pub const BASE_PATH_KEY: &str = "base_path";

/// Read/write persistence for individual string settings. Only the command
/// layer touches this; pipeline and store code take directories as explicit
/// parameters instead of reading persisted state.
pub trait SettingsStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Settings kept in a flat JSON object on disk. Reads tolerate a missing
/// file; writes create it along with its directory.
#[derive(Debug, Clone)]
pub struct JsonSettings {
    path: PathBuf,
}

impl JsonSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file {:?}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed settings file {:?}", self.path))
    }
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut settings = self.load()?;
        settings.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let content =
            serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file {:?}", self.path))?;
        Ok(())
    }
}

/// Default settings location under the user's home directory.
pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Neither HOME nor USERPROFILE is set")?;
    Ok(Path::new(&home).join(".config/tesslab/settings.json"))
}
