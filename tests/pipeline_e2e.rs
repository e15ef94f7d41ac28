//! End-to-end pipeline behavior with scripted extraction and OCR, so the
//! accept/reject path is exercised without any capture or model stack.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};

use platewatch::{
    DedupThrottle, EventRecorder, Frame, ImageExt, Pipeline, PlateExtractor, PlateImage,
    PlateRegion, PlateRegistry, TextRecognizer, WriteMode,
};

/// Treats the whole frame as the plate.
struct FullFrameExtractor;

impl PlateExtractor for FullFrameExtractor {
    fn name(&self) -> &'static str {
        "full-frame"
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<PlateImage>> {
        let region = PlateRegion {
            x: 0,
            y: 0,
            width: frame.width(),
            height: frame.height(),
        };
        Ok(Some(frame.crop(region)?))
    }
}

/// Plays back a fixed script of OCR outcomes, one per frame.
struct ScriptedRecognizer {
    script: VecDeque<Result<String>>,
}

impl ScriptedRecognizer {
    fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn recognize(&mut self, _plate: &PlateImage) -> Result<String> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("script exhausted")))
    }
}

fn frame() -> Frame {
    Frame::from_rgb8(vec![200u8; 32 * 16 * 3], 32, 16).expect("frame")
}

fn build_pipeline(dir: &Path, mode: WriteMode, script: Vec<Result<String>>) -> Result<Pipeline> {
    let recorder = EventRecorder::open(
        dir.join("detections.log"),
        mode,
        dir.join("plates"),
        ImageExt::Png,
    )?;
    Ok(Pipeline::new(
        Box::new(FullFrameExtractor),
        Box::new(ScriptedRecognizer::new(script)),
        DedupThrottle::new(Duration::from_secs(60)),
        PlateRegistry::open(dir.join("registered_plates.txt")),
        recorder,
    ))
}

fn read_log(dir: &Path) -> Result<String> {
    Ok(fs::read_to_string(dir.join("detections.log"))?)
}

fn image_count(dir: &Path) -> usize {
    fs::read_dir(dir.join("plates"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn repeat_sighting_inside_cooldown_records_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![Ok("KA01AB1234".to_string()), Ok("KA01AB1234".to_string())],
    )?;

    pipeline.process_frame(&frame());
    pipeline.process_frame(&frame());

    let stats = pipeline.stats();
    assert_eq!(stats.frames_processed, 2);
    assert_eq!(stats.events_recorded, 1);
    assert_eq!(stats.throttle_rejections, 1);

    assert_eq!(read_log(dir.path())?.lines().count(), 1);
    assert_eq!(image_count(dir.path()), 1);
    Ok(())
}

#[test]
fn distinct_plates_in_the_same_second_both_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![Ok("AAA 111".to_string()), Ok("BBB 222".to_string())],
    )?;

    pipeline.process_frame(&frame());
    pipeline.process_frame(&frame());

    let stats = pipeline.stats();
    assert_eq!(stats.events_recorded, 2);
    assert_eq!(stats.throttle_rejections, 0);

    let log = read_log(dir.path())?;
    assert!(log.contains("Plate: AAA111"));
    assert!(log.contains("Plate: BBB222"));
    // Same-second detections of different plates still get distinct image
    // names because the plate text is part of the file name.
    assert_eq!(image_count(dir.path()), 2);
    Ok(())
}

#[test]
fn text_with_no_alphanumerics_is_discarded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![Ok("$$$ ---".to_string())],
    )?;

    pipeline.process_frame(&frame());

    let stats = pipeline.stats();
    assert_eq!(stats.normalization_empty, 1);
    assert_eq!(stats.events_recorded, 0);
    assert!(read_log(dir.path())?.is_empty());
    assert_eq!(image_count(dir.path()), 0);
    Ok(())
}

#[test]
fn recognition_failures_do_not_stop_the_loop() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![
            Err(anyhow!("ocr jitter")),
            Err(anyhow!("ocr jitter")),
            Err(anyhow!("ocr jitter")),
            Ok("KA05MN999".to_string()),
        ],
    )?;

    for _ in 0..4 {
        pipeline.process_frame(&frame());
    }

    let stats = pipeline.stats();
    assert_eq!(stats.frames_processed, 4);
    assert_eq!(stats.recognition_failures, 3);
    assert_eq!(stats.events_recorded, 1);
    assert!(read_log(dir.path())?.contains("Plate: KA05MN999"));
    Ok(())
}

#[test]
fn prepend_mode_puts_newest_detection_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Prepend,
        vec![Ok("FIRST1".to_string()), Ok("SECOND2".to_string())],
    )?;

    pipeline.process_frame(&frame());
    pipeline.process_frame(&frame());

    let log = read_log(dir.path())?;
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Plate: SECOND2"));
    assert!(lines[1].contains("Plate: FIRST1"));
    Ok(())
}

#[test]
fn registry_membership_sets_the_status_label() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("registered_plates.txt"), "KNOWN1\n")?;

    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![Ok("KNOWN1".to_string()), Ok("STRAY2".to_string())],
    )?;

    pipeline.process_frame(&frame());
    pipeline.process_frame(&frame());

    let log = read_log(dir.path())?;
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Plate: KNOWN1 | Status: Registered"));
    assert!(lines[1].contains("Plate: STRAY2 | Status: Not Registered"));
    Ok(())
}

#[test]
fn persistence_failure_is_counted_and_the_loop_recovers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = build_pipeline(
        dir.path(),
        WriteMode::Append,
        vec![
            Ok("LOST99".to_string()),
            Ok("LOST99".to_string()),
            Ok("SAVED1".to_string()),
        ],
    )?;

    // Turn the log path into a directory so the write fails.
    let log_path = dir.path().join("detections.log");
    fs::remove_file(&log_path)?;
    fs::create_dir(&log_path)?;
    pipeline.process_frame(&frame());

    // The plate stays accepted for its cooldown even though persistence
    // failed, so a repeat sighting is throttled, not retried.
    pipeline.process_frame(&frame());

    fs::remove_dir(&log_path)?;
    pipeline.process_frame(&frame());

    let stats = pipeline.stats();
    assert_eq!(stats.persistence_failures, 1);
    assert_eq!(stats.throttle_rejections, 1);
    assert_eq!(stats.events_recorded, 1);

    let log = read_log(dir.path())?;
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("Plate: SAVED1"));
    Ok(())
}
