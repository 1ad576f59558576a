use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::FailurePolicy;

/// One fine-tuning run: which model to start from and where its data lives.
///
/// Three directories carry everything. The ground-truth directory holds the
/// image/transcription pairs and every intermediate artifact derived from
/// them, the tessdata directory holds the read-only reference models, and the
/// output directory receives checkpoints, the finetuned model and the job
/// log. The job is immutable once built; every derived path below is a pure
/// function of these fields.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub model_name: String,
    pub ground_truth_dir: PathBuf,
    pub tessdata_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TrainingJob {
    /// Job with the conventional output directory `<base>/<model>_finetuned`.
    pub fn new(
        model_name: impl Into<String>,
        ground_truth_dir: impl Into<PathBuf>,
        tessdata_dir: impl Into<PathBuf>,
    ) -> Self {
        let model_name = model_name.into();
        let ground_truth_dir = ground_truth_dir.into();
        let output_dir = ground_truth_dir.join(format!("{model_name}_finetuned"));
        Self {
            model_name,
            ground_truth_dir,
            tessdata_dir: tessdata_dir.into(),
            output_dir,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// `<tessdata>/<model>.traineddata`, the read-only starting model.
    pub fn reference_model_path(&self) -> PathBuf {
        self.tessdata_dir
            .join(format!("{}.traineddata", self.model_name))
    }

    /// `<base>/<model>.lstm`, the weights snapshot extracted from the
    /// reference model.
    pub fn base_lstm_path(&self) -> PathBuf {
        self.ground_truth_dir
            .join(format!("{}.lstm", self.model_name))
    }

    /// `<base>/all-lstmf-list.txt`, the training feature-file manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.ground_truth_dir.join("all-lstmf-list.txt")
    }

    /// `<base>/unicharset`.
    pub fn unicharset_path(&self) -> PathBuf {
        self.ground_truth_dir.join("unicharset")
    }

    /// `<out>/<model>`, the prefix training checkpoints are written under.
    pub fn model_output_prefix(&self) -> PathBuf {
        self.output_dir.join(&self.model_name)
    }

    /// `<out>/<model>_checkpoint`, produced by fine-tuning.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_checkpoint", self.model_name))
    }

    /// `<out>/<model>.traineddata`, the deployable finetuned model.
    pub fn finetuned_model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.traineddata", self.model_name))
    }

    /// `<out>/<model>_finetuned.log`, the append-only job log.
    pub fn log_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_finetuned.log", self.model_name))
    }
}

/// Tunables for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Iteration cap passed to the trainer.
    pub iterations: u32,
    /// Empty the output directory before fine-tuning. The job log survives
    /// the purge.
    pub purge_output: bool,
    /// What a failed step does to the rest of the run.
    pub failure_policy: FailurePolicy,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            iterations: 1000,
            purge_output: true,
            failure_policy: FailurePolicy::Lenient,
        }
    }
}

/// Where the external Tesseract training programs live.
///
/// `None` resolves program names through `PATH`; a directory supports
/// installs that are not on `PATH` and lets tests substitute stand-ins.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    pub bin_dir: Option<PathBuf>,
}

impl Toolchain {
    pub fn resolve(&self, program: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }
}
