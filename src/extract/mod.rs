//! Plate extraction backends.
//!
//! An extractor scans a frame for a license-plate region and returns the
//! cropped candidate, or `None` when the frame holds no plate. Finding
//! nothing is the common case and is not an error; errors are reserved for
//! backend failures (a model that cannot run, a malformed frame).
//!
//! Two backends exist:
//! - `stub`: brightness-band heuristic, no dependencies, used by tests,
//!   the demo and synthetic deployments
//! - `tract`: ONNX plate-detection models via tract (feature: extract-tract)
//!
//! Extractors MUST NOT write frames to disk or keep them beyond the
//! `extract` call.

mod stub;
#[cfg(feature = "extract-tract")]
mod tract;

pub use stub::StubExtractor;
#[cfg(feature = "extract-tract")]
pub use tract::TractExtractor;

use anyhow::Result;

use crate::config::ExtractorSettings;
use crate::frame::{Frame, PlateImage};

/// Plate extractor backend trait.
pub trait PlateExtractor: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Locate and crop the most likely plate region in a frame.
    ///
    /// Returns `Ok(None)` when the frame has no plate candidate.
    /// Implementations must treat the frame as read-only and ephemeral.
    fn extract(&mut self, frame: &Frame) -> Result<Option<PlateImage>>;

    /// Optional warm-up hook, called once before the pipeline starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the extractor selected by the settings. `frame_width` and
/// `frame_height` are the dimensions model-based backends are compiled
/// against; frames of any other size make them error per-frame.
pub fn build(
    settings: &ExtractorSettings,
    frame_width: u32,
    frame_height: u32,
) -> Result<Box<dyn PlateExtractor>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubExtractor::new())),
        "tract" => build_tract(settings, frame_width, frame_height),
        other => anyhow::bail!(
            "unknown extractor backend '{}' (expected stub or tract)",
            other
        ),
    }
}

#[cfg(feature = "extract-tract")]
fn build_tract(
    settings: &ExtractorSettings,
    frame_width: u32,
    frame_height: u32,
) -> Result<Box<dyn PlateExtractor>> {
    let model_path = settings
        .model_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("extractor backend 'tract' requires model_path"))?;
    Ok(Box::new(TractExtractor::load(
        model_path,
        frame_width,
        frame_height,
    )?))
}

#[cfg(not(feature = "extract-tract"))]
fn build_tract(
    _settings: &ExtractorSettings,
    _frame_width: u32,
    _frame_height: u32,
) -> Result<Box<dyn PlateExtractor>> {
    anyhow::bail!("extractor backend 'tract' requires the extract-tract feature")
}
