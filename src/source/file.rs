//! Local video-file frame source.
//!
//! This module provides `FileSource` for replaying frames from a local
//! video file, typically recorded footage being run back through the
//! pipeline.
//!
//! The file source is responsible for:
//! - Reading and decoding frames from a local file (no network access)
//! - Replaying them as tightly packed RGB8 frames
//!
//! The file source MUST NOT:
//! - Fetch remote URLs
//! - Write decoded frames back to disk
//!
//! A file is finite: once it is exhausted the source keeps returning an
//! error and reports itself unhealthy. The pipeline treats that like any
//! other acquisition failure and keeps running until stopped.

use anyhow::{anyhow, Result};

#[cfg(feature = "file-ffmpeg")]
use super::file_ffmpeg::FfmpegDecoder;
use crate::frame::Frame;
use crate::source::synthetic::SyntheticCapture;
use crate::source::SourceStats;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/var/lib/platewatch/footage.mp4").
    pub path: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Frame width (used by synthetic frames; decoded files report their own).
    pub width: u32,
    /// Frame height (used by synthetic frames; decoded files report their own).
    pub height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticCapture),
    #[cfg(feature = "file-ffmpeg")]
    Ffmpeg(FfmpegDecoder),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file replay only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticCapture::new(
                    "FileSource",
                    &config.path,
                    config.width,
                    config.height,
                )),
            })
        } else {
            #[cfg(feature = "file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegDecoder::new(config)?),
                })
            }
            #[cfg(not(feature = "file-ffmpeg"))]
            {
                Err(anyhow!("file replay requires the file-ffmpeg feature"))
            }
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            FileBackend::Synthetic(_) => true,
            #[cfg(feature = "file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            FileBackend::Synthetic(source) => SourceStats {
                frames_captured: source.frames_captured(),
                endpoint: source.endpoint().to_string(),
            },
            #[cfg(feature = "file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> FileConfig {
        FileConfig {
            path: "stub://footage".to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn file_source_replays_frames() -> Result<()> {
        let mut source = FileSource::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert!(source.is_healthy());
        Ok(())
    }

    #[test]
    fn url_schemes_are_rejected() {
        let config = FileConfig {
            path: "https://example.com/footage.mp4".to_string(),
            ..stub_config()
        };
        assert!(FileSource::new(config).is_err());

        let config = FileConfig {
            path: String::new(),
            ..stub_config()
        };
        assert!(FileSource::new(config).is_err());
    }

    #[test]
    fn local_path_detection() {
        assert!(is_local_file_path("/var/lib/platewatch/footage.mp4"));
        assert!(is_local_file_path("relative/footage.mp4"));
        assert!(is_local_file_path("stub://footage"));
        assert!(!is_local_file_path("rtsp://camera/stream"));
        assert!(!is_local_file_path("   "));
    }
}
