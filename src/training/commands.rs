use std::path::Path;

use crate::models::{Toolchain, TrainingJob};
use crate::runner::CommandSpec;

/// `combine_tessdata -e <tessdata>/<model>.traineddata <base>/<model>.lstm`
pub fn extract_base_lstm(toolchain: &Toolchain, job: &TrainingJob) -> CommandSpec {
    CommandSpec::new(toolchain.resolve("combine_tessdata"))
        .arg("-e")
        .arg(job.reference_model_path())
        .arg(job.base_lstm_path())
}

/// `tesseract <image> <stem> --psm 6 lstm.train`
///
/// Runs the recognizer in training mode over one image; writes
/// `<stem>.lstmf` next to it.
pub fn extract_features(toolchain: &Toolchain, image: &Path, output_stem: &Path) -> CommandSpec {
    CommandSpec::new(toolchain.resolve("tesseract"))
        .arg(image)
        .arg(output_stem)
        .arg("--psm")
        .arg("6")
        .arg("lstm.train")
}

/// `unicharset_extractor --output_unicharset <base>/unicharset <texts...>`
pub fn extract_unicharset<'a>(
    toolchain: &Toolchain,
    job: &TrainingJob,
    transcriptions: impl IntoIterator<Item = &'a Path>,
) -> CommandSpec {
    let mut spec = CommandSpec::new(toolchain.resolve("unicharset_extractor"))
        .arg("--output_unicharset")
        .arg(job.unicharset_path());
    for path in transcriptions {
        spec = spec.arg(path);
    }
    spec
}

/// `lstmtraining --model_output <out>/<model> --continue_from <base lstm>
/// --traineddata <reference> --train_listfile <manifest> --max_iterations N`
pub fn fine_tune(toolchain: &Toolchain, job: &TrainingJob, iterations: u32) -> CommandSpec {
    CommandSpec::new(toolchain.resolve("lstmtraining"))
        .arg("--model_output")
        .arg(job.model_output_prefix())
        .arg("--continue_from")
        .arg(job.base_lstm_path())
        .arg("--traineddata")
        .arg(job.reference_model_path())
        .arg("--train_listfile")
        .arg(job.manifest_path())
        .arg("--max_iterations")
        .arg(iterations.to_string())
}

/// `lstmtraining --stop_training --continue_from <checkpoint> --traineddata
/// <reference> --model_output <finetuned>`
///
/// Converts the training checkpoint into a deployable model.
pub fn convert_checkpoint(toolchain: &Toolchain, job: &TrainingJob) -> CommandSpec {
    CommandSpec::new(toolchain.resolve("lstmtraining"))
        .arg("--stop_training")
        .arg("--continue_from")
        .arg(job.checkpoint_path())
        .arg("--traineddata")
        .arg(job.reference_model_path())
        .arg("--model_output")
        .arg(job.finetuned_model_path())
}

/// `lstmeval --model <finetuned> --eval_listfile <manifest> --traineddata
/// <reference>`
pub fn evaluate(toolchain: &Toolchain, job: &TrainingJob) -> CommandSpec {
    CommandSpec::new(toolchain.resolve("lstmeval"))
        .arg("--model")
        .arg(job.finetuned_model_path())
        .arg("--eval_listfile")
        .arg(job.manifest_path())
        .arg("--traineddata")
        .arg(job.reference_model_path())
}
