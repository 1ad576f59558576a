use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::TrainingJob;
use crate::pipeline::{RunContext, StepStatus, TrainStep};
use crate::training::{boxfile, commands};

/// Step 1: snapshot the reference model's LSTM weights into the
/// ground-truth directory.
pub struct ExtractBaseLstm;

impl TrainStep for ExtractBaseLstm {
    fn name(&self) -> &str {
        "extract base lstm"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let spec = commands::extract_base_lstm(&ctx.toolchain, job);
        Ok(StepStatus::from_outcome(ctx.run_command(&spec)?))
    }
}

/// Step 2: make sure the output directory exists. Idempotent.
pub struct PrepareOutputDir;

impl TrainStep for PrepareOutputDir {
    fn name(&self) -> &str {
        "prepare output directory"
    }

    fn run(&self, job: &TrainingJob, _ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        fs::create_dir_all(&job.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", job.output_dir))?;
        tracing::info!("output directory ready: {:?}", job.output_dir);
        Ok(StepStatus::Completed)
    }
}

/// Step 3: a `.box` annotation for every ground-truth image. Per-file
/// failures are logged and counted; one bad pair never sinks the batch.
pub struct GenerateBoxFiles;

impl TrainStep for GenerateBoxFiles {
    fn name(&self) -> &str {
        "generate box files"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let images = ground_truth_images(&job.ground_truth_dir)?;
        let mut failures = 0usize;
        for image in &images {
            let transcription = image.with_extension("gt.txt");
            let output = image.with_extension("box");
            match boxfile::generate(image, &transcription, &output) {
                Ok(()) => tracing::info!("generated box file {:?}", output),
                Err(err) => {
                    failures += 1;
                    tracing::error!("box generation failed for {:?}: {:#}", image, err);
                    ctx.log_line(&format!(
                        "box generation failed for {}: {:#}",
                        image.display(),
                        err
                    ))?;
                }
            }
        }
        Ok(batch_status(failures, images.len(), "box files"))
    }
}

/// Step 4: run the recognizer in training mode over every image, then write
/// the manifest listing every feature file present.
pub struct GenerateLstmfFiles;

impl TrainStep for GenerateLstmfFiles {
    fn name(&self) -> &str {
        "generate lstmf files"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let images = ground_truth_images(&job.ground_truth_dir)?;
        let mut failures = 0usize;
        for image in &images {
            let stem = image.with_extension("");
            let spec = commands::extract_features(&ctx.toolchain, image, &stem);
            if !ctx.run_command(&spec)?.success() {
                failures += 1;
            }
        }
        let listed = write_manifest(job)?;
        tracing::info!(
            "manifest {:?} lists {listed} feature file(s)",
            job.manifest_path()
        );
        Ok(batch_status(failures, images.len(), "feature extractions"))
    }
}

/// Step 5: distill the distinct-character inventory out of every
/// transcription.
pub struct ExtractUnicharset;

impl TrainStep for ExtractUnicharset {
    fn name(&self) -> &str {
        "extract unicharset"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let transcriptions = transcription_files(&job.ground_truth_dir)?;
        if transcriptions.is_empty() {
            return Ok(StepStatus::Failed {
                exit_code: None,
                detail: String::from("no .gt.txt transcriptions found"),
            });
        }
        let spec = commands::extract_unicharset(
            &ctx.toolchain,
            job,
            transcriptions.iter().map(PathBuf::as_path),
        );
        Ok(StepStatus::from_outcome(ctx.run_command(&spec)?))
    }
}

/// Step 6: fine-tune from the base snapshot. Optionally clears previous
/// output first; the job log itself survives the purge.
pub struct FineTune {
    pub iterations: u32,
    pub purge_output: bool,
}

impl TrainStep for FineTune {
    fn name(&self) -> &str {
        "fine tune"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        if self.purge_output {
            purge_dir_except(&job.output_dir, ctx.log_path())?;
            tracing::info!("cleared previous output in {:?}", job.output_dir);
        }
        tracing::info!(
            "fine-tuning {} for up to {} iterations",
            job.model_name,
            self.iterations
        );
        let spec = commands::fine_tune(&ctx.toolchain, job, self.iterations);
        Ok(StepStatus::from_outcome(ctx.run_command(&spec)?))
    }
}

/// Step 7: convert the training checkpoint into a deployable model.
pub struct ConvertCheckpoint;

impl TrainStep for ConvertCheckpoint {
    fn name(&self) -> &str {
        "convert checkpoint"
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let spec = commands::convert_checkpoint(&ctx.toolchain, job);
        Ok(StepStatus::from_outcome(ctx.run_command(&spec)?))
    }
}

/// Step 8: error metrics for the finetuned model over the training set.
/// Advisory: a failed evaluation never voids the model built before it.
pub struct EvaluateModel;

impl TrainStep for EvaluateModel {
    fn name(&self) -> &str {
        "evaluate model"
    }

    fn fatal(&self) -> bool {
        false
    }

    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus> {
        let spec = commands::evaluate(&ctx.toolchain, job);
        Ok(StepStatus::from_outcome(ctx.run_command(&spec)?))
    }
}

fn batch_status(failures: usize, total: usize, what: &str) -> StepStatus {
    if failures > 0 {
        StepStatus::Failed {
            exit_code: None,
            detail: format!("{failures} of {total} {what} failed"),
        }
    } else {
        StepStatus::Completed
    }
}

/// Every `.tif` and `.png` in the ground-truth directory, sorted by name.
fn ground_truth_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read ground truth directory {:?}", dir))?;
    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("tif") | Some("png")
        ) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Every `.gt.txt` in the ground-truth directory, sorted by name.
fn transcription_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read ground truth directory {:?}", dir))?;
    let mut texts = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_text = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".gt.txt"));
        if is_text {
            texts.push(path);
        }
    }
    texts.sort();
    Ok(texts)
}

/// Rewrite the manifest with the absolute path of every `.lstmf` under the
/// ground-truth directory, one per line. The external toolchain takes the
/// lines in filesystem enumeration order, so no sorting here. Rewriting from
/// scratch keeps repeated runs from accumulating duplicates.
fn write_manifest(job: &TrainingJob) -> anyhow::Result<usize> {
    let dir = fs::canonicalize(&job.ground_truth_dir).with_context(|| {
        format!(
            "Failed to resolve ground truth directory {:?}",
            job.ground_truth_dir
        )
    })?;
    let entries = fs::read_dir(&dir)
        .with_context(|| format!("Failed to read ground truth directory {:?}", dir))?;
    let mut lines = String::new();
    let mut count = 0usize;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("lstmf") {
            lines.push_str(&path.display().to_string());
            lines.push('\n');
            count += 1;
        }
    }
    fs::write(job.manifest_path(), lines)
        .with_context(|| format!("Failed to write manifest {:?}", job.manifest_path()))?;
    Ok(count)
}

/// Delete everything inside `dir` except the file named like `keep`.
fn purge_dir_except(dir: &Path, keep: &Path) -> anyhow::Result<()> {
    let keep_name = keep.file_name();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read output directory {:?}", dir))?;
    for entry in entries {
        let entry = entry?;
        if Some(entry.file_name().as_os_str()) == keep_name {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        }
    }
    Ok(())
}
