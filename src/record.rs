//! Durable recording of accepted detections.
//!
//! Every accepted detection produces exactly two artifacts:
//! 1. One line in the detection log:
//!    `<YYYY-MM-DD HH:MM:SS> | Plate: <text> | Status: <Registered|Not Registered>`
//! 2. One plate crop on disk, named
//!    `plate_<text>_<YYYYMMDD_HHMMSS>.<ext>`, where the timestamp keeps
//!    same-second detections of *different* plates from colliding (the
//!    plate text is the discriminator).
//!
//! The log supports two write modes. `append` is a plain O_APPEND write.
//! `prepend` rewrites the whole file with the newest line first; that is a
//! read-modify-write and is only safe because the pipeline has a single
//! consumer thread doing all recording. Nothing here takes a lock.
//!
//! Failures below this module (full disk, permissions, unplugged storage)
//! are recoverable by contract: callers log them and keep the loop alive.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};

use crate::frame::PlateImage;

/// Wall-clock format used in log lines.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock format used in image file names.
pub const IMAGE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How new lines are placed in the detection log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// New lines go at the end of the file.
    Append,
    /// New lines go at the top; the file is rewritten on every event.
    Prepend,
}

impl WriteMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            other => bail!("unknown log write mode '{}' (expected append or prepend)", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
        }
    }
}

/// Encoding used for saved plate crops. The extension also selects the
/// format written by the image encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageExt {
    Jpg,
    Png,
}

impl ImageExt {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => bail!("unknown image extension '{}' (expected jpg or png)", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

/// One accepted detection, stamped with local wall-clock time at creation.
#[derive(Clone, Debug)]
pub struct DetectionEvent {
    pub plate: String,
    pub timestamp: DateTime<Local>,
    pub registered: bool,
}

impl DetectionEvent {
    pub fn new(plate: String, registered: bool) -> Self {
        Self {
            plate,
            timestamp: Local::now(),
            registered,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.registered {
            "Registered"
        } else {
            "Not Registered"
        }
    }

    /// The detection-log line for this event, without a trailing newline.
    pub fn log_line(&self) -> String {
        format!(
            "{} | Plate: {} | Status: {}",
            self.timestamp.format(LOG_TIMESTAMP_FORMAT),
            self.plate,
            self.status_label()
        )
    }

    /// The file name the plate crop is stored under.
    pub fn image_file_name(&self, ext: ImageExt) -> String {
        format!(
            "plate_{}_{}.{}",
            self.plate,
            self.timestamp.format(IMAGE_TIMESTAMP_FORMAT),
            ext.as_str()
        )
    }
}

/// The line-oriented detection log.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    mode: WriteMode,
}

impl EventLog {
    /// Open (creating if needed) the log file. Parent directories are
    /// created so a fresh deployment can point at a path that does not
    /// exist yet.
    pub fn open<P: AsRef<Path>>(path: P, mode: WriteMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open detection log {}", path.display()))?;
        Ok(Self { path, mode })
    }

    /// Write one event line according to the configured mode.
    pub fn write_line(&self, line: &str) -> Result<()> {
        match self.mode {
            WriteMode::Append => self.append(line),
            WriteMode::Prepend => self.prepend(line),
        }
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open detection log {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("failed to append to detection log {}", self.path.display()))
    }

    fn prepend(&self, line: &str) -> Result<()> {
        let existing = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read detection log {}", self.path.display())
                })
            }
        };
        let mut contents = String::with_capacity(line.len() + 1 + existing.len());
        contents.push_str(line);
        contents.push('\n');
        contents.push_str(&existing);
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to rewrite detection log {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}

/// Directory of saved plate crops.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    ext: ImageExt,
}

impl ImageStore {
    pub fn open<P: AsRef<Path>>(dir: P, ext: ImageExt) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create image directory {}", dir.display()))?;
        Ok(Self { dir, ext })
    }

    /// Encode and store the plate crop for `event`. Recreates the directory
    /// if it vanished mid-run; directory creation is idempotent.
    pub fn save(&self, event: &DetectionEvent, plate: &PlateImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create image directory {}", self.dir.display()))?;
        let path = self.dir.join(event.image_file_name(self.ext));
        image::save_buffer(
            &path,
            plate.pixels(),
            plate.width(),
            plate.height(),
            image::ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("failed to write plate image {}", path.display()))?;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ext(&self) -> ImageExt {
        self.ext
    }
}

/// Bundles the detection log and the image store behind one call.
#[derive(Debug)]
pub struct EventRecorder {
    log: EventLog,
    images: ImageStore,
}

impl EventRecorder {
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        log_path: P,
        mode: WriteMode,
        image_dir: Q,
        ext: ImageExt,
    ) -> Result<Self> {
        Ok(Self {
            log: EventLog::open(log_path, mode)?,
            images: ImageStore::open(image_dir, ext)?,
        })
    }

    /// Persist one accepted detection: log line first, then the crop.
    /// Returns the path the crop was written to.
    pub fn record(&self, event: &DetectionEvent, plate: &PlateImage) -> Result<PathBuf> {
        self.log.write_line(&event.log_line())?;
        self.images.save(event, plate)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, PlateRegion};
    use chrono::TimeZone;

    fn fixed_event(plate: &str, registered: bool) -> DetectionEvent {
        DetectionEvent {
            plate: plate.to_string(),
            timestamp: Local
                .with_ymd_and_hms(2024, 3, 9, 14, 5, 9)
                .single()
                .expect("valid local time"),
            registered,
        }
    }

    fn tiny_plate() -> PlateImage {
        let frame = Frame::from_rgb8(vec![220u8; 16 * 8 * 3], 16, 8).expect("frame");
        frame
            .crop(PlateRegion {
                x: 0,
                y: 0,
                width: 16,
                height: 8,
            })
            .expect("crop")
    }

    #[test]
    fn log_line_matches_expected_shape() {
        let event = fixed_event("AB12C3", true);
        assert_eq!(
            event.log_line(),
            "2024-03-09 14:05:09 | Plate: AB12C3 | Status: Registered"
        );

        let event = fixed_event("ZZ99", false);
        assert_eq!(
            event.log_line(),
            "2024-03-09 14:05:09 | Plate: ZZ99 | Status: Not Registered"
        );
    }

    #[test]
    fn image_file_name_carries_plate_and_timestamp() {
        let event = fixed_event("AB12C3", false);
        assert_eq!(
            event.image_file_name(ImageExt::Jpg),
            "plate_AB12C3_20240309_140509.jpg"
        );
        assert_eq!(
            event.image_file_name(ImageExt::Png),
            "plate_AB12C3_20240309_140509.png"
        );
    }

    #[test]
    fn append_keeps_chronological_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = EventLog::open(dir.path().join("detections.log"), WriteMode::Append)?;

        log.write_line("first")?;
        log.write_line("second")?;

        let contents = fs::read_to_string(log.path())?;
        assert_eq!(contents, "first\nsecond\n");
        Ok(())
    }

    #[test]
    fn prepend_puts_newest_line_first() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = EventLog::open(dir.path().join("detections.log"), WriteMode::Prepend)?;

        log.write_line("first")?;
        log.write_line("second")?;

        let contents = fs::read_to_string(log.path())?;
        assert_eq!(contents, "second\nfirst\n");
        Ok(())
    }

    #[test]
    fn open_creates_missing_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b").join("detections.log");
        let log = EventLog::open(&nested, WriteMode::Append)?;

        log.write_line("entry")?;
        assert!(nested.is_file());
        Ok(())
    }

    #[test]
    fn parse_rejects_unknown_mode_and_ext() {
        assert!(WriteMode::parse("sideways").is_err());
        assert!(ImageExt::parse("tiff").is_err());
        assert_eq!(WriteMode::parse("prepend").unwrap(), WriteMode::Prepend);
        assert_eq!(ImageExt::parse("jpeg").unwrap(), ImageExt::Jpg);
        assert_eq!(ImageExt::parse("png").unwrap(), ImageExt::Png);
    }

    #[test]
    fn image_store_writes_named_crop() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ImageStore::open(dir.path().join("plates"), ImageExt::Png)?;
        let event = fixed_event("AB12C3", false);

        let path = store.save(&event, &tiny_plate())?;
        assert!(path.is_file());
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("plate_AB12C3_20240309_140509.png")
        );
        assert!(fs::metadata(&path)?.len() > 0);
        Ok(())
    }

    #[test]
    fn image_store_recreates_deleted_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let images = dir.path().join("plates");
        let store = ImageStore::open(&images, ImageExt::Jpg)?;

        fs::remove_dir_all(&images)?;
        let path = store.save(&fixed_event("ZZ99", true), &tiny_plate())?;
        assert!(path.is_file());
        Ok(())
    }

    #[test]
    fn recorder_writes_line_and_image_together() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let recorder = EventRecorder::open(
            dir.path().join("detections.log"),
            WriteMode::Append,
            dir.path().join("plates"),
            ImageExt::Jpg,
        )?;
        let event = fixed_event("AB12C3", true);

        let image_path = recorder.record(&event, &tiny_plate())?;

        let contents = fs::read_to_string(recorder.log().path())?;
        assert_eq!(
            contents,
            "2024-03-09 14:05:09 | Plate: AB12C3 | Status: Registered\n"
        );
        assert!(image_path.is_file());
        Ok(())
    }
}
