//! Plate text recognition backends.
//!
//! A recognizer turns a cropped plate image into raw text. The raw string
//! is whatever the engine read, separators and stray punctuation included;
//! [`crate::normalize::normalize`] reduces it to the canonical plate
//! identity downstream. Recognizer failures are per-crop errors the
//! pipeline logs and survives.
//!
//! Two backends exist:
//! - `stub`: derives deterministic plate-shaped text from the crop's
//!   content, used by tests, the demo and synthetic deployments
//! - `tesseract`: real OCR via leptess (feature: ocr-tesseract)

mod stub;
#[cfg(feature = "ocr-tesseract")]
mod tesseract;

pub use stub::StubRecognizer;
#[cfg(feature = "ocr-tesseract")]
pub use tesseract::TesseractRecognizer;

use anyhow::Result;

use crate::config::OcrSettings;
use crate::frame::PlateImage;

/// Text recognizer backend trait.
pub trait TextRecognizer: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Read the text off a plate crop. The returned string is raw engine
    /// output, not yet normalized.
    fn recognize(&mut self, plate: &PlateImage) -> Result<String>;

    /// Optional warm-up hook, called once before the pipeline starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the recognizer selected by the settings.
pub fn build(settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubRecognizer::new())),
        "tesseract" => build_tesseract(settings),
        other => anyhow::bail!(
            "unknown ocr backend '{}' (expected stub or tesseract)",
            other
        ),
    }
}

#[cfg(feature = "ocr-tesseract")]
fn build_tesseract(settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    Ok(Box::new(TesseractRecognizer::new(&settings.lang)?))
}

#[cfg(not(feature = "ocr-tesseract"))]
fn build_tesseract(_settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>> {
    anyhow::bail!("ocr backend 'tesseract' requires the ocr-tesseract feature")
}
