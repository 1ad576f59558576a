mod dir;
pub mod settings;

use std::path::PathBuf;

pub use dir::DirPairStore;
pub use settings::{BASE_PATH_KEY, JsonSettings, SettingsStore, default_settings_path};

/// One reviewed unit: an image and its single-line transcription, sharing a
/// base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthPair {
    pub base: String,
    pub image_path: PathBuf,
    pub text_path: PathBuf,
}

/// Storage interface for ground-truth pairs.
pub trait PairRepository {
    /// Discover every live pair, sorted by base name. An image without its
    /// transcription, or a transcription without its image, is an error;
    /// tombstoned base names are excluded from both the listing and the
    /// consistency check.
    fn pairs(&self) -> anyhow::Result<Vec<GroundTruthPair>>;

    /// Load a pair's transcription text.
    fn read_text(&self, pair: &GroundTruthPair) -> anyhow::Result<String>;

    /// Overwrite a pair's transcription text.
    fn write_text(&self, pair: &GroundTruthPair, text: &str) -> anyhow::Result<()>;

    /// Delete the pair's files and tombstone its base name so the pair never
    /// reappears. Removing the same pair again records nothing new.
    fn remove(&self, pair: &GroundTruthPair) -> anyhow::Result<()>;

    /// Whether a base name has been tombstoned.
    fn is_removed(&self, base: &str) -> anyhow::Result<bool>;
}

/// Sequential navigation over a pair listing: the interface a review surface
/// drives. Movement clamps at both ends rather than wrapping.
#[derive(Debug)]
pub struct PairCursor {
    pairs: Vec<GroundTruthPair>,
    index: usize,
}

impl PairCursor {
    pub fn new(pairs: Vec<GroundTruthPair>) -> Self {
        Self { pairs, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&GroundTruthPair> {
        self.pairs.get(self.index)
    }

    /// Advance and return the new current pair; stays put at the end.
    pub fn next_pair(&mut self) -> Option<&GroundTruthPair> {
        if self.index + 1 < self.pairs.len() {
            self.index += 1;
        }
        self.current()
    }

    /// Step back and return the new current pair; stays put at the start.
    pub fn previous_pair(&mut self) -> Option<&GroundTruthPair> {
        if self.index > 0 {
            self.index -= 1;
        }
        self.current()
    }

    /// Drop the current pair from the ordering, landing on whatever followed
    /// it (or the new last pair). The repository removal happens elsewhere;
    /// this only adjusts navigation.
    pub fn remove_current(&mut self) -> Option<GroundTruthPair> {
        if self.index >= self.pairs.len() {
            return None;
        }
        let removed = self.pairs.remove(self.index);
        if self.index >= self.pairs.len() && self.index > 0 {
            self.index = self.pairs.len() - 1;
        }
        Some(removed)
    }
}
