use image::{ImageBuffer, Rgb};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tesslab::{Toolchain, TrainingJob};

/// Creates a ground-truth directory holding `count` image/transcription
/// pairs named line_0, line_1, ... The directory is cleaned up on drop.
pub fn create_ground_truth_dir(count: usize) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    for i in 0..count {
        write_pair(dir.path(), &format!("line_{i}"), "sample text", 100, 50);
    }
    dir
}

/// Writes one `<base>.tif` plus `<base>.gt.txt` pair.
pub fn write_pair(dir: &Path, base: &str, text: &str, width: u32, height: u32) {
    write_image(&dir.join(format!("{base}.tif")), width, height);
    fs::write(dir.join(format!("{base}.gt.txt")), text).expect("Failed to write transcription");
}

/// Writes a white test image of the given size, format taken from the
/// extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 255u8, 255u8]));
    img.save(path).expect("Failed to save test image");
}

/// Creates a tessdata directory containing a placeholder
/// `<model>.traineddata`.
pub fn create_tessdata_dir(model: &str) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(dir.path().join(format!("{model}.traineddata")), b"stub")
        .expect("Failed to write reference model");
    dir
}

/// Writes stand-in executables for the five external training programs and
/// returns a toolchain resolving against them.
///
/// Each stand-in echoes its invocation, creates the artifact its real
/// counterpart would produce and exits 0. When `fail_program` names one of
/// them, that program instead prints to stderr and exits 2.
pub fn stub_toolchain(dir: &Path, fail_program: Option<&str>) -> Toolchain {
    write_stub(dir, "combine_tessdata", "echo \"combine_tessdata $@\"\n: > \"$3\"\n");
    write_stub(dir, "tesseract", "echo \"tesseract $@\"\n: > \"$2.lstmf\"\n");
    write_stub(
        dir,
        "unicharset_extractor",
        "echo \"unicharset_extractor $@\"\n: > \"$2\"\n",
    );
    write_stub(
        dir,
        "lstmtraining",
        "echo \"lstmtraining $@\"\nif [ \"$1\" = \"--stop_training\" ]; then : > \"$7\"; else : > \"$2_checkpoint\"; fi\n",
    );
    write_stub(
        dir,
        "lstmeval",
        "echo \"lstmeval $@\"\necho \"char error rate 1.5\"\n",
    );
    if let Some(name) = fail_program {
        write_stub(dir, name, "echo \"stub failure\" >&2\nexit 2\n");
    }
    Toolchain {
        bin_dir: Some(dir.to_path_buf()),
    }
}

fn write_stub(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("Failed to write stub program");
    let mut perms = fs::metadata(&path)
        .expect("Failed to stat stub program")
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("Failed to mark stub program executable");
}

/// Job over `ground_truth` with the default output directory layout.
pub fn make_job(model: &str, ground_truth: &Path, tessdata: &Path) -> TrainingJob {
    TrainingJob::new(model, ground_truth, tessdata)
}

/// The timestamped step records a run appended to its log, in order.
pub fn step_records_in(log: &str) -> Vec<String> {
    log.lines()
        .filter(|line| line.starts_with('[') && line.contains("] step "))
        .map(str::to_string)
        .collect()
}

/// Path of the tombstone file inside a ground-truth directory.
pub fn tombstone_file(dir: &Path) -> PathBuf {
    dir.join("removed_pairs.txt")
}
