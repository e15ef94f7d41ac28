#![cfg(feature = "ocr-tesseract")]

use std::io::Cursor;

use anyhow::{Context, Result};
use leptess::{LepTess, Variable};

use crate::frame::PlateImage;
use crate::ocr::TextRecognizer;

/// Characters plates can legally carry; everything else confuses the
/// engine more than it helps.
const PLATE_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tesseract-based recognizer via leptess.
///
/// Crops are handed to the engine as in-memory PNG; nothing touches disk.
/// The engine is configured for a single line of whitelisted plate
/// characters.
pub struct TesseractRecognizer {
    engine: LepTess,
}

impl TesseractRecognizer {
    pub fn new(lang: &str) -> Result<Self> {
        let mut engine = LepTess::new(None, lang)
            .with_context(|| format!("initialize tesseract for language '{}'", lang))?;
        engine
            .set_variable(Variable::TesseditCharWhitelist, PLATE_CHARS)
            .context("set tesseract character whitelist")?;
        // PSM 7: treat the crop as a single text line.
        engine
            .set_variable(Variable::TesseditPagesegMode, "7")
            .context("set tesseract page segmentation mode")?;
        Ok(Self { engine })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&mut self, plate: &PlateImage) -> Result<String> {
        let mut encoded = Cursor::new(Vec::new());
        image::write_buffer_with_format(
            &mut encoded,
            plate.pixels(),
            plate.width(),
            plate.height(),
            image::ExtendedColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .context("encode plate crop for OCR")?;

        self.engine
            .set_image_from_mem(encoded.get_ref())
            .context("hand plate crop to tesseract")?;
        let text = self
            .engine
            .get_utf8_text()
            .context("read tesseract output")?;

        Ok(text.trim().to_string())
    }
}
