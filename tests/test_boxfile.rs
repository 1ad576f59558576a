//! Integration tests for box-file annotation generation.
//!
//! Tests cover:
//! - The exact two-line record layout
//! - Single-line enforcement on transcriptions
//! - NFC normalization and display-order reordering

mod common;

use std::fs;

use common::*;
use tesslab::training::boxfile;

#[test]
fn test_writes_exact_two_line_record() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "sample", "abc", 100, 50);

    let output = dir.path().join("sample.box");
    boxfile::generate(
        &dir.path().join("sample.tif"),
        &dir.path().join("sample.gt.txt"),
        &output,
    )?;

    let content = fs::read_to_string(&output)?;
    assert_eq!(content, "WordStr 0 0 100 50 0 #abc\n\t 0 0 100 50 0\n");
    Ok(())
}

#[test]
fn test_dimensions_come_from_the_image() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "wide", "text", 640, 32);

    let output = dir.path().join("wide.box");
    boxfile::generate(
        &dir.path().join("wide.tif"),
        &dir.path().join("wide.gt.txt"),
        &output,
    )?;

    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("WordStr 0 0 640 32 0 #text\n"));
    assert!(content.ends_with("\t 0 0 640 32 0\n"));
    Ok(())
}

#[test]
fn test_trailing_newline_in_transcription_is_fine() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "sample", "abc\n", 100, 50);

    let output = dir.path().join("sample.box");
    boxfile::generate(
        &dir.path().join("sample.tif"),
        &dir.path().join("sample.gt.txt"),
        &output,
    )?;

    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("WordStr 0 0 100 50 0 #abc\n"));
    Ok(())
}

#[test]
fn test_empty_transcription_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "empty", "", 100, 50);

    let err = boxfile::generate(
        &dir.path().join("empty.tif"),
        &dir.path().join("empty.gt.txt"),
        &dir.path().join("empty.box"),
    )
    .unwrap_err();
    assert!(
        err.to_string().contains("empty"),
        "unexpected error: {err:#}"
    );
    Ok(())
}

#[test]
fn test_multi_line_transcription_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "multi", "first\nsecond", 100, 50);

    let err = boxfile::generate(
        &dir.path().join("multi.tif"),
        &dir.path().join("multi.gt.txt"),
        &dir.path().join("multi.box"),
    )
    .unwrap_err();
    assert!(
        err.to_string().contains("exactly one line"),
        "unexpected error: {err:#}"
    );
    Ok(())
}

#[test]
fn test_text_is_nfc_normalized() -> anyhow::Result<()> {
    // "e" followed by a combining acute accent composes to a single scalar
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "accent", "Cafe\u{0301}", 100, 50);

    let output = dir.path().join("accent.box");
    boxfile::generate(
        &dir.path().join("accent.tif"),
        &dir.path().join("accent.gt.txt"),
        &output,
    )?;

    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("WordStr 0 0 100 50 0 #Caf\u{e9}\n"));
    Ok(())
}

#[test]
fn test_rtl_text_is_reordered_for_display() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_pair(dir.path(), "hebrew", "\u{5e9}\u{5dc}\u{5d5}\u{5dd}", 100, 50);

    let output = dir.path().join("hebrew.box");
    boxfile::generate(
        &dir.path().join("hebrew.tif"),
        &dir.path().join("hebrew.gt.txt"),
        &output,
    )?;

    // Logical shin-lamed-vav-mem comes out visually reversed
    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("WordStr 0 0 100 50 0 #\u{5dd}\u{5d5}\u{5dc}\u{5e9}\n"));
    Ok(())
}

#[test]
fn test_display_order_leaves_ltr_untouched() {
    assert_eq!(boxfile::display_order("abc 123"), "abc 123");
}
