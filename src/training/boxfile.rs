use anyhow::{Context, bail};
use std::fs;
use std::path::Path;
use unicode_bidi::BidiInfo;
use unicode_normalization::UnicodeNormalization;

/// Read a transcription file and reduce it to its single line.
///
/// Surrounding whitespace is discarded; what remains must be exactly one
/// non-empty line. The line comes back NFC-normalized so that visually
/// identical transcriptions train identically.
pub fn read_single_line(path: &Path) -> anyhow::Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcription {:?}", path))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("{:?}: transcription is empty, expected exactly one line", path);
    }
    let mut lines = trimmed.lines();
    let line = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        bail!(
            "{:?}: transcription must contain exactly one line, found {}",
            path,
            trimmed.lines().count()
        );
    }
    Ok(line.nfc().collect())
}

/// Reorder logical text into display order, so right-to-left and
/// mixed-direction lines come out the way a reader sees them.
pub fn display_order(text: &str) -> String {
    let bidi = BidiInfo::new(text, None);
    let mut out = String::with_capacity(text.len());
    for paragraph in &bidi.paragraphs {
        out.push_str(&bidi.reorder_line(paragraph, paragraph.range.clone()));
    }
    out
}

/// Render the two-line box record for an image of the given size: the whole
/// image as one `WordStr` region carrying the display text, then the
/// end-of-line marker box. The feature extractor consumes this layout
/// verbatim, so it is byte-exact.
pub fn render(width: u32, height: u32, display_text: &str) -> String {
    format!("WordStr 0 0 {width} {height} 0 #{display_text}\n\t 0 0 {width} {height} 0\n")
}

/// Generate the box file for `image` from its paired transcription.
pub fn generate(image: &Path, transcription: &Path, output: &Path) -> anyhow::Result<()> {
    let (width, height) = image::image_dimensions(image)
        .with_context(|| format!("Failed to read image dimensions of {:?}", image))?;
    let line = read_single_line(transcription)?;
    let content = render(width, height, &display_order(&line));
    fs::write(output, content).with_context(|| format!("Failed to write box file {:?}", output))?;
    Ok(())
}
