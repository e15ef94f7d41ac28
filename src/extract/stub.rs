//! Brightness-band stub extractor.

use anyhow::Result;

use crate::extract::PlateExtractor;
use crate::frame::{Frame, PlateImage, PlateRegion};

/// Pixels at or above this luma count as plate-bright.
const BRIGHTNESS_THRESHOLD: u8 = 180;

/// Candidate boxes narrower or shorter than this are noise, not plates.
const MIN_REGION_WIDTH: u32 = 24;
const MIN_REGION_HEIGHT: u32 = 6;

/// Heuristic extractor: finds the bounding box of the dominant bright
/// horizontal band in the frame.
///
/// Plates are bright, roughly rectangular and wider than tall, so a row
/// qualifies when at least a quarter of its pixels exceed the brightness
/// threshold. The box spanning all qualifying rows is the candidate. This
/// is deliberately simple; it is exact on synthetic scenes and "good
/// enough to demo" on real footage with a plate filling the lower frame.
pub struct StubExtractor;

impl StubExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlateExtractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<PlateImage>> {
        match find_bright_band(frame) {
            Some(region) => Ok(Some(frame.crop(region)?)),
            None => Ok(None),
        }
    }
}

fn find_bright_band(frame: &Frame) -> Option<PlateRegion> {
    let width = frame.width();
    let height = frame.height();
    let row_quorum = (width / 4).max(1);

    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    let mut min_y = u32::MAX;
    let mut max_y = 0u32;

    for y in 0..height {
        let mut bright = 0u32;
        let mut row_min = u32::MAX;
        let mut row_max = 0u32;
        for x in 0..width {
            if frame.luma(x, y) >= BRIGHTNESS_THRESHOLD {
                bright += 1;
                row_min = row_min.min(x);
                row_max = row_max.max(x);
            }
        }
        if bright >= row_quorum {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            min_x = min_x.min(row_min);
            max_x = max_x.max(row_max);
        }
    }

    if min_y == u32::MAX {
        return None;
    }

    let region = PlateRegion {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    };
    if region.width < MIN_REGION_WIDTH || region.height < MIN_REGION_HEIGHT {
        return None;
    }
    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synthetic::render_scene;

    #[test]
    fn finds_the_synthetic_plate_band() -> Result<()> {
        let frame = render_scene(0, 64, 48)?;
        let mut extractor = StubExtractor::new();

        let plate = extractor.extract(&frame)?.expect("band present");
        let region = plate.region();
        // The synthetic band spans x in [16, 48) and y in [32, 38).
        assert_eq!(region.x, 16);
        assert_eq!(region.y, 32);
        assert_eq!(region.width, 32);
        assert_eq!(region.height, 6);
        assert_eq!(plate.pixels().len(), (32 * 6 * 3) as usize);
        Ok(())
    }

    #[test]
    fn plateless_scene_yields_none() -> Result<()> {
        let frame = render_scene(3, 64, 48)?;
        let mut extractor = StubExtractor::new();
        assert!(extractor.extract(&frame)?.is_none());
        Ok(())
    }

    #[test]
    fn dark_frame_yields_none() -> Result<()> {
        let frame = Frame::from_rgb8(vec![10u8; 64 * 48 * 3], 64, 48)?;
        let mut extractor = StubExtractor::new();
        assert!(extractor.extract(&frame)?.is_none());
        Ok(())
    }

    #[test]
    fn small_bright_speck_is_ignored() -> Result<()> {
        // One bright pixel never reaches the per-row quorum.
        let mut pixels = vec![10u8; 64 * 48 * 3];
        let idx = ((20 * 64) + 30) * 3;
        pixels[idx] = 255;
        pixels[idx + 1] = 255;
        pixels[idx + 2] = 255;
        let frame = Frame::from_rgb8(pixels, 64, 48)?;

        let mut extractor = StubExtractor::new();
        assert!(extractor.extract(&frame)?.is_none());
        Ok(())
    }
}
