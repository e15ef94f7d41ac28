//! Local webcam frame source.
//!
//! This module provides `WebcamSource` for capturing frames from V4L2
//! device nodes (e.g., /dev/video0).
//!
//! The webcam source is responsible for:
//! - Opening the device and negotiating an RGB format
//! - Capturing frames in-memory via mmap buffers
//! - Reporting capture health
//!
//! The webcam source MUST NOT:
//! - Write frames to disk
//! - Retain frames beyond handoff to the pipeline

use anyhow::Result;

use crate::frame::Frame;
use crate::source::synthetic::SyntheticCapture;
use crate::source::SourceStats;

/// Configuration for a webcam source.
#[derive(Clone, Debug)]
pub struct WebcamConfig {
    /// Device path (e.g., "/dev/video0").
    pub device: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Webcam frame source.
///
/// Uses libv4l for real devices, with a synthetic fallback for `stub://`
/// paths.
pub struct WebcamSource {
    backend: WebcamBackend,
}

enum WebcamBackend {
    Synthetic(SyntheticCapture),
    #[cfg(feature = "webcam-v4l2")]
    Device(DeviceWebcam),
}

impl WebcamSource {
    pub fn new(config: WebcamConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: WebcamBackend::Synthetic(SyntheticCapture::new(
                    "WebcamSource",
                    &config.device,
                    config.width,
                    config.height,
                )),
            })
        } else {
            #[cfg(feature = "webcam-v4l2")]
            {
                Ok(Self {
                    backend: WebcamBackend::Device(DeviceWebcam::new(config)),
                })
            }
            #[cfg(not(feature = "webcam-v4l2"))]
            {
                anyhow::bail!("webcam capture requires the webcam-v4l2 feature")
            }
        }
    }

    /// Connect to the device.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            WebcamBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "webcam-v4l2")]
            WebcamBackend::Device(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            WebcamBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "webcam-v4l2")]
            WebcamBackend::Device(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            WebcamBackend::Synthetic(_) => true,
            #[cfg(feature = "webcam-v4l2")]
            WebcamBackend::Device(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            WebcamBackend::Synthetic(source) => SourceStats {
                frames_captured: source.frames_captured(),
                endpoint: source.endpoint().to_string(),
            },
            #[cfg(feature = "webcam-v4l2")]
            WebcamBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production webcam source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "webcam-v4l2")]
struct DeviceWebcam {
    config: WebcamConfig,
    state: Option<DeviceWebcamState>,
    frame_count: u64,
    last_frame_at: Option<std::time::Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "webcam-v4l2")]
#[ouroboros::self_referencing]
struct DeviceWebcamState {
    device: v4l::Device,
    #[borrows(device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this>,
}

#[cfg(feature = "webcam-v4l2")]
impl DeviceWebcam {
    fn new(config: WebcamConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use anyhow::Context;
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open webcam device {}", self.config.device))?;
        let mut format = device.format().context("read webcam format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "WebcamSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read webcam format after set failure")?
            }
        };

        if format.fourcc != v4l::FourCC::new(b"RGB3") {
            anyhow::bail!(
                "webcam {} negotiated {} instead of RGB3",
                self.config.device,
                format.fourcc
            );
        }

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "WebcamSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceWebcamStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create webcam buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "WebcamSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use anyhow::Context;
        use v4l::io::traits::CaptureStream;

        let width = self.active_width;
        let height = self.active_height;
        let state = self.state.as_mut().context("webcam not connected")?;
        let (buf, meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture webcam frame")
            })?;

        let expected = width as usize * height as usize * 3;
        let used = (meta.bytesused as usize).min(buf.len());
        if used < expected {
            anyhow::bail!(
                "webcam frame truncated: {} of {} bytes",
                used,
                expected
            );
        }
        let pixels = buf[..expected].to_vec();

        self.frame_count += 1;
        self.last_frame_at = Some(std::time::Instant::now());

        Frame::from_rgb8(pixels, width, height)
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= super::stall_threshold(self.config.target_fps, 6, 2_000)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            endpoint: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> WebcamConfig {
        WebcamConfig {
            device: "stub://bench".to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn webcam_source_produces_frames() -> Result<()> {
        let mut source = WebcamSource::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert!(source.is_healthy());
        Ok(())
    }

    #[test]
    fn webcam_source_counts_frames() -> Result<()> {
        let mut source = WebcamSource::new(stub_config())?;
        source.connect()?;

        source.next_frame()?;
        source.next_frame()?;
        source.next_frame()?;

        let stats = source.stats();
        assert_eq!(stats.frames_captured, 3);
        assert_eq!(stats.endpoint, "stub://bench");
        Ok(())
    }

    #[cfg(not(feature = "webcam-v4l2"))]
    #[test]
    fn device_path_requires_the_v4l2_feature() {
        let config = WebcamConfig {
            device: "/dev/video0".to_string(),
            ..stub_config()
        };
        assert!(WebcamSource::new(config).is_err());
    }
}
