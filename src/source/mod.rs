//! Frame acquisition sources.
//!
//! This module provides the capture side of the pipeline:
//! - Network cameras via RTSP (feature: camera-gstreamer)
//! - Local V4L2 webcams (feature: webcam-v4l2)
//! - Local video files (feature: file-ffmpeg)
//! - Synthetic stub frames for any kind via `stub://` endpoints
//!
//! Native backends are optional and feature-gated; every kind falls back
//! to the deterministic synthetic renderer when its endpoint starts with
//! `stub://`, so the daemon, demo and tests run without any capture stack
//! installed.
//!
//! All sources produce tightly packed RGB8 [`Frame`]s and expose the same
//! four operations: connect, next_frame, is_healthy, stats. Acquisition
//! failures are per-frame errors; the pipeline logs them and retries
//! rather than exiting.

mod camera;
mod file;
#[cfg(feature = "file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub(crate) mod synthetic;
mod webcam;

pub use camera::{CameraConfig, CameraSource};
pub use file::{FileConfig, FileSource};
pub use synthetic::{FLAKY_STARTUP_FAILURES, SCENE_PERIOD_FRAMES, SyntheticCapture};
pub use webcam::{WebcamConfig, WebcamSource};

use anyhow::{bail, Result};
#[cfg(any(feature = "camera-gstreamer", feature = "webcam-v4l2"))]
use std::time::Duration;

use crate::config::SourceSettings;
use crate::frame::Frame;

/// Which capture backend family a deployment uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    Webcam,
    File,
}

impl SourceKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "camera" => Ok(Self::Camera),
            "webcam" => Ok(Self::Webcam),
            "file" => Ok(Self::File),
            other => bail!(
                "unknown source kind '{}' (expected camera, webcam or file)",
                other
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Webcam => "webcam",
            Self::File => "file",
        }
    }
}

/// Statistics every source reports uniformly.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub endpoint: String,
}

/// A configured frame source of any kind.
///
/// Thin dispatch wrapper so the pipeline can hold one value regardless of
/// which backend family the deployment selected.
pub enum FrameSource {
    Camera(CameraSource),
    Webcam(WebcamSource),
    File(FileSource),
}

impl FrameSource {
    /// Build the source described by the settings. Fails fast when the
    /// endpoint needs a native backend that is not compiled in.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self> {
        match settings.kind {
            SourceKind::Camera => Ok(Self::Camera(CameraSource::new(CameraConfig {
                url: settings.endpoint.clone(),
                target_fps: settings.target_fps,
                width: settings.width,
                height: settings.height,
            })?)),
            SourceKind::Webcam => Ok(Self::Webcam(WebcamSource::new(WebcamConfig {
                device: settings.endpoint.clone(),
                target_fps: settings.target_fps,
                width: settings.width,
                height: settings.height,
            })?)),
            SourceKind::File => Ok(Self::File(FileSource::new(FileConfig {
                path: settings.endpoint.clone(),
                target_fps: settings.target_fps,
                width: settings.width,
                height: settings.height,
            })?)),
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        match self {
            Self::Camera(source) => source.connect(),
            Self::Webcam(source) => source.connect(),
            Self::File(source) => source.connect(),
        }
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        match self {
            Self::Camera(source) => source.next_frame(),
            Self::Webcam(source) => source.next_frame(),
            Self::File(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match self {
            Self::Camera(source) => source.is_healthy(),
            Self::Webcam(source) => source.is_healthy(),
            Self::File(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match self {
            Self::Camera(source) => source.stats(),
            Self::Webcam(source) => source.stats(),
            Self::File(source) => source.stats(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Camera(_) => SourceKind::Camera,
            Self::Webcam(_) => SourceKind::Webcam,
            Self::File(_) => SourceKind::File,
        }
    }
}

/// Names of the native capture backends compiled into this build. Logged
/// at daemon startup so deployments can tell a missing feature from a
/// missing device.
pub fn native_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();
    if cfg!(feature = "camera-gstreamer") {
        backends.push("camera-gstreamer");
    }
    if cfg!(feature = "webcam-v4l2") {
        backends.push("webcam-v4l2");
    }
    if cfg!(feature = "file-ffmpeg") {
        backends.push("file-ffmpeg");
    }
    backends
}

/// Stall thresholds for live backends scale with the frame interval so
/// low-rate streams are not flagged prematurely; `floor_ms` stops fast
/// streams from thrashing on tiny timeouts.
#[cfg(any(feature = "camera-gstreamer", feature = "webcam-v4l2"))]
pub(crate) fn stall_threshold(target_fps: u32, factor: u32, floor_ms: u32) -> Duration {
    let interval_ms = 1000 / target_fps.max(1);
    Duration::from_millis(u64::from(interval_ms.saturating_mul(factor).max(floor_ms)))
}
