//! Frame and plate-image types.
//!
//! - `Frame`: an RGB8 raster produced by a frame source. Owned by the loop
//!   iteration that captured it and discarded after processing.
//! - `PlateRegion`: a rectangle inside a frame, in pixel coordinates.
//! - `PlateImage`: the cropped sub-region an extractor hands to OCR. Carries
//!   its source region so recorders and diagnostics can refer back to it.
//!
//! Pixel data is tightly packed RGB (3 bytes per pixel, row-major, no
//! padding). Constructors validate the buffer length so downstream code can
//! index without re-checking.

use anyhow::{anyhow, Result};

/// An in-memory RGB8 frame.
#[derive(Clone, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a tightly packed RGB8 buffer. Fails if the length does not match
    /// `width * height * 3`.
    pub fn from_rgb8(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Copy a row-padded RGB8 buffer (`stride` bytes per row) into a tightly
    /// packed frame. Decoders commonly align rows; the padding is dropped.
    pub fn from_strided_rgb8(data: &[u8], stride: usize, width: u32, height: u32) -> Result<Self> {
        let row_bytes = (width as usize)
            .checked_mul(3)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if stride < row_bytes {
            return Err(anyhow!(
                "stride {} is smaller than a {}-pixel RGB row",
                stride,
                width
            ));
        }
        if stride == row_bytes && data.len() == row_bytes * height as usize {
            return Self::from_rgb8(data.to_vec(), width, height);
        }

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .ok_or_else(|| anyhow!("row {} is out of bounds", row))?,
            );
        }
        Self::from_rgb8(pixels, width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Average brightness of the pixel at (x, y). Panics are avoided by the
    /// constructor's length validation; callers must stay in bounds.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        let r = self.pixels[idx] as u16;
        let g = self.pixels[idx + 1] as u16;
        let b = self.pixels[idx + 2] as u16;
        ((r + g + b) / 3) as u8
    }

    /// Copy out a rectangular sub-region as a `PlateImage`.
    pub fn crop(&self, region: PlateRegion) -> Result<PlateImage> {
        let x_end = region
            .x
            .checked_add(region.width)
            .ok_or_else(|| anyhow!("crop region overflows"))?;
        let y_end = region
            .y
            .checked_add(region.height)
            .ok_or_else(|| anyhow!("crop region overflows"))?;
        if region.width == 0 || region.height == 0 {
            return Err(anyhow!("crop region is empty"));
        }
        if x_end > self.width || y_end > self.height {
            return Err(anyhow!(
                "crop region {}x{}+{}+{} exceeds frame {}x{}",
                region.width,
                region.height,
                region.x,
                region.y,
                self.width,
                self.height
            ));
        }

        let row_bytes = region.width as usize * 3;
        let mut pixels = Vec::with_capacity(row_bytes * region.height as usize);
        for row in region.y..y_end {
            let start = ((row as usize * self.width as usize) + region.x as usize) * 3;
            pixels.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }

        Ok(PlateImage {
            width: region.width,
            height: region.height,
            pixels,
            region,
        })
    }
}

/// A rectangle inside a frame, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A cropped plate candidate, owned by the iteration that produced it until
/// it is either discarded or persisted by the recorder.
#[derive(Clone, Debug)]
pub struct PlateImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    region: PlateRegion,
}

impl PlateImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Where this crop came from in the source frame.
    pub fn region(&self) -> PlateRegion {
        self.region
    }
}
