// Core pixel types shared by the decoder, the handoff slot and the render loop.

use image::{Rgb, RgbImage};

use crate::error::DecodeError;

/// One RGB triple, 8 bits per channel, no alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::new(0, 0, 0);
    pub const WHITE: Pixel = Pixel::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Pack as 0x00RRGGBB, the layout minifb expects.
    #[inline]
    pub fn to_u32(self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }
}

/// An owned, decoded pixmap.
///
/// `width > 0 && height > 0` iff the buffer holds pixel data. The invalid state is
/// `width == -1, height == -1` with no storage; it is also the `Default`.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: i32,
    height: i32,
    pixels: Vec<Pixel>, // row-major, length = width * height
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::invalid()
    }
}

impl FrameBuffer {
    /// The canonical empty frame: nothing to draw.
    pub const fn invalid() -> Self {
        Self {
            width: -1,
            height: -1,
            pixels: Vec::new(),
        }
    }

    /// Take ownership of `pixels` as a `width x height` image.
    pub fn new(width: i32, height: i32, pixels: Vec<Pixel>) -> Result<Self, DecodeError> {
        let expected = pixel_count(width as i64, height as i64)?;
        if pixels.len() != expected {
            return Err(DecodeError::TruncatedData {
                expected: expected * 3,
                actual: pixels.len() * 3,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame of one flat color, e.g. black to blank a panel.
    pub fn solid(width: i32, height: i32, pixel: Pixel) -> Result<Self, DecodeError> {
        let count = pixel_count(width as i64, height as i64)?;
        Self::new(width, height, vec![pixel; count])
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.pixels.is_empty()
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Read one pixel. Anything outside the image (including every read on an
    /// invalid frame) is black.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Pixel {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return Pixel::BLACK;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied().unwrap_or(Pixel::BLACK)
    }

    /// Release the storage and go back to the invalid state.
    pub fn reset(&mut self) {
        *self = Self::invalid();
    }

    /// Build from an `image` RGB buffer (camera frames, test fixtures).
    pub fn from_rgb_image(img: &RgbImage) -> Result<Self, DecodeError> {
        let (w, h) = img.dimensions();
        let width = i32::try_from(w).map_err(|_| DecodeError::InvalidDimensions {
            width: w as i64,
            height: h as i64,
        })?;
        let height = i32::try_from(h).map_err(|_| DecodeError::InvalidDimensions {
            width: w as i64,
            height: h as i64,
        })?;
        let pixels = img
            .pixels()
            .map(|Rgb([r, g, b])| Pixel::new(*r, *g, *b))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Copy into an `image` RGB buffer; `None` for the invalid frame.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if !self.is_valid() {
            return None;
        }
        let raw = self
            .pixels
            .iter()
            .flat_map(|p| [p.red, p.green, p.blue])
            .collect();
        RgbImage::from_raw(self.width as u32, self.height as u32, raw)
    }
}

/// `width * height` for positive dimensions, rejecting overflow.
pub(crate) fn pixel_count(width: i64, height: i64) -> Result<usize, DecodeError> {
    let invalid = DecodeError::InvalidDimensions { width, height };
    if width <= 0 || height <= 0 || width > i32::MAX as i64 || height > i32::MAX as i64 {
        return Err(invalid);
    }
    let count = (width as usize).checked_mul(height as usize).ok_or(invalid)?;
    // Three bytes per pixel must also be addressable.
    count
        .checked_mul(3)
        .map(|_| count)
        .ok_or(DecodeError::InvalidDimensions { width, height })
}
