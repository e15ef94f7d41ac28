//! Deterministic synthetic capture backend.
//!
//! Every source kind accepts a `stub://<name>` endpoint that swaps its
//! native backend for this renderer, which keeps the daemon, the demo and
//! the test suite runnable on machines with no camera stack installed.
//!
//! The renderer produces a rotating set of scenes, one scene per
//! [`SCENE_PERIOD_FRAMES`] frames. Most scenes carry a bright plate-like
//! band across the lower third whose pattern varies per scene, so the stub
//! extractor finds a region and the stub recognizer derives stable text for
//! it. Every fourth scene has no band at all, exercising the
//! no-plate-in-frame path. Rendering is a pure function of (scene, width,
//! height): two captures pointed at stub endpoints produce byte-identical
//! frames at the same frame index.
//!
//! Endpoints whose name begins with `flaky` (for example
//! `stub://flaky-gate`) fail their first [`FLAKY_STARTUP_FAILURES`]
//! captures before settling into the normal rotation, so the driver's
//! tolerance of acquisition errors can be exercised without a misbehaving
//! device.

use anyhow::{bail, Result};

use crate::frame::Frame;

/// Frames per synthetic scene before the renderer rotates to the next one.
pub const SCENE_PERIOD_FRAMES: u64 = 50;

/// How many captures a `stub://flaky…` endpoint fails before delivering
/// its first frame.
pub const FLAKY_STARTUP_FAILURES: u32 = 3;

/// Synthetic frame generator behind `stub://` endpoints.
#[derive(Debug)]
pub struct SyntheticCapture {
    label: &'static str,
    endpoint: String,
    width: u32,
    height: u32,
    frame_count: u64,
    faults_left: u32,
}

impl SyntheticCapture {
    pub fn new(label: &'static str, endpoint: &str, width: u32, height: u32) -> Self {
        let flaky = endpoint
            .strip_prefix("stub://")
            .is_some_and(|name| name.starts_with("flaky"));
        Self {
            label,
            endpoint: endpoint.to_string(),
            width,
            height,
            frame_count: 0,
            faults_left: if flaky { FLAKY_STARTUP_FAILURES } else { 0 },
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!("{}: connected to {} (synthetic)", self.label, self.endpoint);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        if self.faults_left > 0 {
            self.faults_left -= 1;
            bail!(
                "{}: injected capture fault on {} ({} left)",
                self.label,
                self.endpoint,
                self.faults_left
            );
        }
        self.frame_count += 1;
        let scene = self.frame_count / SCENE_PERIOD_FRAMES;
        render_scene(scene, self.width, self.height)
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Whether the given scene renders a plate band. Three scenes out of four
/// do.
pub(crate) fn scene_has_plate(scene: u64) -> bool {
    scene % 4 != 3
}

/// Render one scene as an RGB8 frame. Background values stay below 100;
/// plate-band values sit in 200..240 so brightness-based extraction has a
/// clean margin between the two.
pub(crate) fn render_scene(scene: u64, width: u32, height: u32) -> Result<Frame> {
    let has_plate = scene_has_plate(scene);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let v = if has_plate && in_plate_band(x, y, width, height) {
                200 + (((x / 3) as u64 + scene * 7) % 40) as u8
            } else {
                (((x + y) as u64 + scene * 29) % 97) as u8
            };
            pixels.extend_from_slice(&[v, v, v]);
        }
    }
    Frame::from_rgb8(pixels, width, height)
}

fn in_plate_band(x: u32, y: u32, width: u32, height: u32) -> bool {
    let x0 = width / 4;
    let y0 = (height as u64 * 2 / 3) as u32;
    x >= x0 && x < x0 + width / 2 && y >= y0 && y < y0 + height / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_deterministic_across_instances() -> Result<()> {
        let mut a = SyntheticCapture::new("camera", "stub://gate", 64, 48);
        let mut b = SyntheticCapture::new("camera", "stub://gate", 64, 48);
        a.connect()?;
        b.connect()?;

        for _ in 0..3 {
            let fa = a.next_frame()?;
            let fb = b.next_frame()?;
            assert_eq!(fa.pixels(), fb.pixels());
        }
        Ok(())
    }

    #[test]
    fn scene_rotates_after_period() -> Result<()> {
        let mut capture = SyntheticCapture::new("camera", "stub://gate", 64, 48);
        capture.connect()?;

        let first = capture.next_frame()?;
        for _ in 0..(SCENE_PERIOD_FRAMES - 1) {
            capture.next_frame()?;
        }
        let later = capture.next_frame()?;
        assert_ne!(first.pixels(), later.pixels());
        Ok(())
    }

    #[test]
    fn every_fourth_scene_is_plateless() {
        assert!(scene_has_plate(0));
        assert!(scene_has_plate(1));
        assert!(scene_has_plate(2));
        assert!(!scene_has_plate(3));
        assert!(scene_has_plate(4));
        assert!(!scene_has_plate(7));
    }

    #[test]
    fn plate_band_is_brighter_than_background() -> Result<()> {
        let frame = render_scene(0, 64, 48)?;
        // Inside the band: x in [16, 48), y in [32, 38).
        assert!(frame.luma(20, 33) >= 200);
        // Outside the band.
        assert!(frame.luma(2, 2) < 100);

        let plateless = render_scene(3, 64, 48)?;
        assert!(plateless.luma(20, 33) < 100);
        Ok(())
    }

    #[test]
    fn band_content_differs_between_scenes() -> Result<()> {
        let a = render_scene(0, 64, 48)?;
        let b = render_scene(1, 64, 48)?;
        assert_ne!(a.pixels(), b.pixels());
        Ok(())
    }

    #[test]
    fn flaky_endpoint_fails_first_captures_then_recovers() -> Result<()> {
        let mut capture = SyntheticCapture::new("camera", "stub://flaky-gate", 64, 48);
        capture.connect()?;

        for _ in 0..FLAKY_STARTUP_FAILURES {
            assert!(capture.next_frame().is_err());
        }
        let frame = capture.next_frame()?;
        assert_eq!(frame.width(), 64);
        // Failed captures are not counted as frames.
        assert_eq!(capture.frames_captured(), 1);
        Ok(())
    }

    #[test]
    fn plain_stub_endpoints_never_fault() -> Result<()> {
        let mut capture = SyntheticCapture::new("camera", "stub://gate", 64, 48);
        capture.connect()?;
        capture.next_frame()?;
        Ok(())
    }
}
