//! Deterministic stub recognizer.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::frame::PlateImage;
use crate::ocr::TextRecognizer;

/// Stub recognizer: derives plate-shaped text from a hash of the crop.
///
/// The same crop always reads as the same text and different crops almost
/// always read differently, which is exactly what dedup and registry tests
/// need. The output deliberately contains a separator ("ABC 123") so the
/// normalizer has real work to do on the stub path too.
pub struct StubRecognizer;

impl StubRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&mut self, plate: &PlateImage) -> Result<String> {
        let digest = Sha256::digest(plate.pixels());

        let letters: String = digest[..3]
            .iter()
            .map(|b| char::from(b'A' + b % 26))
            .collect();
        let number = (u32::from(digest[3]) << 8 | u32::from(digest[4])) % 1000;

        Ok(format!("{} {:03}", letters, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, PlateRegion};

    fn crop_of(fill: u8) -> PlateImage {
        let frame = Frame::from_rgb8(vec![fill; 32 * 8 * 3], 32, 8).expect("frame");
        frame
            .crop(PlateRegion {
                x: 0,
                y: 0,
                width: 32,
                height: 8,
            })
            .expect("crop")
    }

    #[test]
    fn same_crop_reads_the_same() -> Result<()> {
        let mut recognizer = StubRecognizer::new();
        let a = recognizer.recognize(&crop_of(210))?;
        let b = recognizer.recognize(&crop_of(210))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn different_crops_read_differently() -> Result<()> {
        let mut recognizer = StubRecognizer::new();
        let a = recognizer.recognize(&crop_of(210))?;
        let b = recognizer.recognize(&crop_of(230))?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn output_is_plate_shaped() -> Result<()> {
        let mut recognizer = StubRecognizer::new();
        let text = recognizer.recognize(&crop_of(210))?;

        let (letters, digits) = text.split_once(' ').expect("separator");
        assert_eq!(letters.len(), 3);
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(digits.len(), 3);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        Ok(())
    }
}
