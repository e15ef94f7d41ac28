#![cfg(feature = "extract-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::extract::PlateExtractor;
use crate::frame::{Frame, PlateImage, PlateRegion};

/// Candidate boxes scoring below this are ignored.
const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// Boxes smaller than this (in pixels) cannot hold readable plate text.
const MIN_BOX_WIDTH: u32 = 8;
const MIN_BOX_HEIGHT: u32 = 4;

/// Tract-based plate locator for ONNX detection models.
///
/// The model takes a 1x3xHxW float input scaled to [0, 1] and emits
/// candidate boxes as rows of five floats: centre x, centre y, width and
/// height (normalized to [0, 1]) followed by a confidence score. The
/// highest-scoring box above the threshold becomes the crop.
///
/// This backend loads a local model file and performs inference in-memory.
/// It does not perform any network I/O.
pub struct TractExtractor {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
    score_threshold: f32,
}

impl TractExtractor {
    /// Load an ONNX model from disk and prepare it for inference against
    /// `width` x `height` frames.
    pub fn load<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }

        let pixels = frame.pixels();
        let width = self.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn best_box(&self, outputs: &TVec<TValue>) -> Result<Option<[f32; 5]>> {
        let output = outputs
            .get(0)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat = view
            .as_slice()
            .ok_or_else(|| anyhow!("model output tensor was not contiguous"))?;

        let best = flat
            .chunks_exact(5)
            .filter(|row| row[4] >= self.score_threshold)
            .max_by(|a, b| a[4].total_cmp(&b[4]));

        Ok(best.map(|row| [row[0], row[1], row[2], row[3], row[4]]))
    }
}

impl PlateExtractor for TractExtractor {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<PlateImage>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        let Some(candidate) = self.best_box(&outputs)? else {
            return Ok(None);
        };
        let Some(region) = region_from_box(candidate, frame.width(), frame.height()) else {
            return Ok(None);
        };
        Ok(Some(frame.crop(region)?))
    }

    fn warm_up(&mut self) -> Result<()> {
        let zeros = Tensor::zero::<f32>(&[1, 3, self.height as usize, self.width as usize])
            .context("failed to build warm-up tensor")?;
        self.model
            .run(tvec!(zeros.into()))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }
}

/// Map a normalized (cx, cy, w, h, score) box to pixel coordinates,
/// clamped to the frame. Degenerate or sub-readable boxes become `None`.
fn region_from_box(candidate: [f32; 5], frame_width: u32, frame_height: u32) -> Option<PlateRegion> {
    let fw = frame_width as f32;
    let fh = frame_height as f32;
    let [cx, cy, bw, bh, _score] = candidate;
    if !(cx.is_finite() && cy.is_finite() && bw.is_finite() && bh.is_finite()) {
        return None;
    }

    let x0 = ((cx - bw / 2.0) * fw).floor().max(0.0) as u32;
    let y0 = ((cy - bh / 2.0) * fh).floor().max(0.0) as u32;
    let x1 = (((cx + bw / 2.0) * fw).ceil().max(0.0) as u32).min(frame_width);
    let y1 = (((cy + bh / 2.0) * fh).ceil().max(0.0) as u32).min(frame_height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let region = PlateRegion {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    };
    if region.width < MIN_BOX_WIDTH || region.height < MIN_BOX_HEIGHT {
        return None;
    }
    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_box_maps_to_pixel_region() {
        let region = region_from_box([0.5, 0.75, 0.5, 0.125, 0.9], 640, 480).expect("region");
        assert_eq!(region.x, 160);
        assert_eq!(region.y, 330);
        assert_eq!(region.width, 320);
        assert_eq!(region.height, 60);
    }

    #[test]
    fn out_of_frame_box_is_clamped() {
        let region = region_from_box([0.0, 0.0, 0.5, 0.5, 0.9], 640, 480).expect("region");
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert_eq!(region.width, 160);
        assert_eq!(region.height, 120);
    }

    #[test]
    fn degenerate_boxes_are_rejected() {
        assert!(region_from_box([0.5, 0.5, 0.0, 0.0, 0.9], 640, 480).is_none());
        assert!(region_from_box([2.0, 2.0, 0.1, 0.1, 0.9], 640, 480).is_none());
        assert!(region_from_box([f32::NAN, 0.5, 0.1, 0.1, 0.9], 640, 480).is_none());
    }
}
