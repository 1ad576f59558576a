//! Integration tests for the toolchain invocation shapes.
//!
//! Flag names and argument order are contracts with the external programs,
//! so each builder is pinned to its exact rendering.

use std::path::Path;

use tesslab::training::commands;
use tesslab::{Toolchain, TrainingJob};

fn job() -> TrainingJob {
    TrainingJob::new("deu", "/data/gt", "/usr/share/tessdata")
}

#[test]
fn test_extract_base_lstm_shape() {
    let spec = commands::extract_base_lstm(&Toolchain::default(), &job());
    assert_eq!(
        spec.display(),
        "combine_tessdata -e /usr/share/tessdata/deu.traineddata /data/gt/deu.lstm"
    );
}

#[test]
fn test_extract_features_shape() {
    let spec = commands::extract_features(
        &Toolchain::default(),
        Path::new("/data/gt/line_0.tif"),
        Path::new("/data/gt/line_0"),
    );
    assert_eq!(
        spec.display(),
        "tesseract /data/gt/line_0.tif /data/gt/line_0 --psm 6 lstm.train"
    );
}

#[test]
fn test_extract_unicharset_shape() {
    let texts = [
        Path::new("/data/gt/line_0.gt.txt"),
        Path::new("/data/gt/line_1.gt.txt"),
    ];
    let spec = commands::extract_unicharset(&Toolchain::default(), &job(), texts);
    assert_eq!(
        spec.display(),
        "unicharset_extractor --output_unicharset /data/gt/unicharset \
         /data/gt/line_0.gt.txt /data/gt/line_1.gt.txt"
    );
}

#[test]
fn test_fine_tune_shape() {
    let spec = commands::fine_tune(&Toolchain::default(), &job(), 400);
    assert_eq!(
        spec.display(),
        "lstmtraining --model_output /data/gt/deu_finetuned/deu \
         --continue_from /data/gt/deu.lstm \
         --traineddata /usr/share/tessdata/deu.traineddata \
         --train_listfile /data/gt/all-lstmf-list.txt \
         --max_iterations 400"
    );
}

#[test]
fn test_convert_checkpoint_shape() {
    let spec = commands::convert_checkpoint(&Toolchain::default(), &job());
    assert_eq!(
        spec.display(),
        "lstmtraining --stop_training \
         --continue_from /data/gt/deu_finetuned/deu_checkpoint \
         --traineddata /usr/share/tessdata/deu.traineddata \
         --model_output /data/gt/deu_finetuned/deu.traineddata"
    );
}

#[test]
fn test_evaluate_shape() {
    let spec = commands::evaluate(&Toolchain::default(), &job());
    assert_eq!(
        spec.display(),
        "lstmeval --model /data/gt/deu_finetuned/deu.traineddata \
         --eval_listfile /data/gt/all-lstmf-list.txt \
         --traineddata /usr/share/tessdata/deu.traineddata"
    );
}

#[test]
fn test_custom_output_dir_flows_into_shapes() {
    let job = job().with_output_dir("/models/out");
    let spec = commands::convert_checkpoint(&Toolchain::default(), &job);
    assert_eq!(
        spec.display(),
        "lstmtraining --stop_training \
         --continue_from /models/out/deu_checkpoint \
         --traineddata /usr/share/tessdata/deu.traineddata \
         --model_output /models/out/deu.traineddata"
    );
}

#[test]
fn test_toolchain_dir_prefixes_programs() {
    let toolchain = Toolchain {
        bin_dir: Some("/opt/tesseract/bin".into()),
    };
    let spec = commands::extract_base_lstm(&toolchain, &job());
    assert!(
        spec.display()
            .starts_with("/opt/tesseract/bin/combine_tessdata -e")
    );
}
