use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{GroundTruthPair, PairRepository};

const TOMBSTONE_FILE: &str = "removed_pairs.txt";

/// Pair repository over a flat ground-truth directory. The directory itself
/// is the database: a pair is `<base>.tif` (or `.png`) plus `<base>.gt.txt`,
/// and removals are tombstoned in `removed_pairs.txt` rather than tracked in
/// any index.
#[derive(Debug, Clone)]
pub struct DirPairStore {
    root: PathBuf,
}

impl DirPairStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up one live pair by base name.
    pub fn pair(&self, base: &str) -> anyhow::Result<GroundTruthPair> {
        self.pairs()?
            .into_iter()
            .find(|p| p.base == base)
            .with_context(|| format!("No ground truth pair named {:?} in {:?}", base, self.root))
    }

    fn tombstone_path(&self) -> PathBuf {
        self.root.join(TOMBSTONE_FILE)
    }

    fn tombstones(&self) -> anyhow::Result<Vec<String>> {
        let path = self.tombstone_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(content.lines().map(str::to_string).collect())
    }

    /// Append `base` to the tombstone file unless it is already recorded.
    fn tombstone(&self, base: &str) -> anyhow::Result<()> {
        if self.is_removed(base)? {
            return Ok(());
        }
        let path = self.tombstone_path();
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open tombstone file {:?}", path))?;
        writeln!(file, "{base}").with_context(|| format!("Failed to append to {:?}", path))?;
        tracing::info!("tombstoned pair {base}");
        Ok(())
    }
}

impl PairRepository for DirPairStore {
    fn pairs(&self) -> anyhow::Result<Vec<GroundTruthPair>> {
        let mut images: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut texts: BTreeMap<String, PathBuf> = BTreeMap::new();

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read ground truth directory {:?}", self.root))?;
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(base) = name.strip_suffix(".gt.txt") {
                texts.insert(base.to_string(), path);
            } else if let Some(base) = name
                .strip_suffix(".tif")
                .or_else(|| name.strip_suffix(".png"))
            {
                if let Some(previous) = images.insert(base.to_string(), path.clone()) {
                    bail!(
                        "Duplicate image for base name {:?}: {:?} and {:?}",
                        base,
                        previous,
                        path
                    );
                }
            }
        }

        let removed = self.tombstones()?;
        let mut pairs = Vec::new();
        for (base, image_path) in &images {
            if removed.iter().any(|r| r == base) {
                continue;
            }
            let Some(text_path) = texts.get(base) else {
                bail!("Ground truth file not found for {:?}", image_path);
            };
            pairs.push(GroundTruthPair {
                base: base.clone(),
                image_path: image_path.clone(),
                text_path: text_path.clone(),
            });
        }
        for (base, text_path) in &texts {
            if removed.iter().any(|r| r == base) {
                continue;
            }
            if !images.contains_key(base) {
                bail!("Image file not found for {:?}", text_path);
            }
        }
        Ok(pairs)
    }

    fn read_text(&self, pair: &GroundTruthPair) -> anyhow::Result<String> {
        fs::read_to_string(&pair.text_path)
            .with_context(|| format!("Failed to read transcription {:?}", pair.text_path))
    }

    fn write_text(&self, pair: &GroundTruthPair, text: &str) -> anyhow::Result<()> {
        fs::write(&pair.text_path, text)
            .with_context(|| format!("Failed to write transcription {:?}", pair.text_path))
    }

    fn remove(&self, pair: &GroundTruthPair) -> anyhow::Result<()> {
        remove_if_present(&pair.image_path)?;
        remove_if_present(&pair.text_path)?;
        self.tombstone(&pair.base)
    }

    fn is_removed(&self, base: &str) -> anyhow::Result<bool> {
        Ok(self.tombstones()?.iter().any(|r| r == base))
    }
}

fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("Failed to remove {:?}", path)),
    }
}
