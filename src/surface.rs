// Display sink contract plus an in-memory double-buffered implementation.

use std::path::Path;

use image::RgbImage;

use crate::error::DisplayError;
use crate::types::{FrameBuffer, Pixel};

/// Where composited frames go: a matrix driver, a window, or memory.
///
/// Writes land in an off-screen buffer; `present` makes that buffer visible and hands
/// back a fresh writable one.
pub trait DisplaySink {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Set one off-screen pixel. Coordinates outside the surface are ignored.
    fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel);

    /// Swap the off-screen buffer to visible.
    fn present(&mut self) -> Result<(), DisplayError>;

    /// `false` once the sink can no longer show anything (e.g. its window was closed).
    fn is_open(&self) -> bool {
        true
    }
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) {
        (**self).set_pixel(x, y, pixel)
    }
    fn present(&mut self) -> Result<(), DisplayError> {
        (**self).present()
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Two pixel buffers that trade places on every `present`, like a matrix driver's
/// swap-on-vsync. After a swap the new back buffer holds what was visible before.
pub struct MemorySurface {
    width: usize,
    height: usize,
    front: Vec<Pixel>,
    back: Vec<Pixel>,
    presents: u64,
}

impl MemorySurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            front: vec![Pixel::BLACK; width * height],
            back: vec![Pixel::BLACK; width * height],
            presents: 0,
        }
    }

    /// Number of `present` calls so far.
    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// A visible pixel, or `None` outside the surface.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        self.offset_of(x, y).map(|i| self.front[i])
    }

    /// An off-screen pixel, or `None` outside the surface.
    pub fn back_pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        self.offset_of(x, y).map(|i| self.back[i])
    }

    /// Copy of the visible buffer.
    pub fn visible(&self) -> FrameBuffer {
        FrameBuffer::new(self.width as i32, self.height as i32, self.front.clone())
            .unwrap_or_default()
    }

    /// Write the visible buffer as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), DisplayError> {
        let path = path.as_ref();
        let img: RgbImage = self
            .visible()
            .to_rgb_image()
            .ok_or_else(|| DisplayError::Snapshot("surface has no pixels".to_string()))?;
        img.save(path)
            .map_err(|e| DisplayError::Snapshot(format!("write '{}': {e}", path.display())))
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return None;
        };
        self.offset_of(x, y)
    }

    fn offset_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

impl DisplaySink for MemorySurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) {
        if let Some(i) = self.index(x, y) {
            self.back[i] = pixel;
        }
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        std::mem::swap(&mut self.front, &mut self.back);
        self.presents += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_invisible_until_present() {
        let mut s = MemorySurface::new(4, 2);
        s.set_pixel(1, 1, Pixel::WHITE);
        assert_eq!(s.pixel(1, 1), Some(Pixel::BLACK));
        assert_eq!(s.back_pixel(1, 1), Some(Pixel::WHITE));
        s.present().unwrap();
        assert_eq!(s.pixel(1, 1), Some(Pixel::WHITE));
        assert_eq!(s.presents(), 1);
        // the old front comes back as the writable buffer
        assert_eq!(s.back_pixel(1, 1), Some(Pixel::BLACK));
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut s = MemorySurface::new(2, 2);
        s.set_pixel(-1, 0, Pixel::WHITE);
        s.set_pixel(2, 0, Pixel::WHITE);
        s.set_pixel(0, 2, Pixel::WHITE);
        s.present().unwrap();
        assert!(s.visible().pixels().iter().all(|p| *p == Pixel::BLACK));
        assert_eq!(s.pixel(2, 0), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn huge_read_coordinates_are_outside() {
        let mut s = MemorySurface::new(2, 2);
        s.set_pixel(0, 0, Pixel::WHITE);
        s.present().unwrap();
        assert_eq!(s.pixel(0, 0), Some(Pixel::WHITE));
        assert_eq!(s.pixel(1 << 32, 0), None);
        assert_eq!(s.pixel(0, (1 << 32) + 1), None);
        assert_eq!(s.back_pixel(usize::MAX, 0), None);
    }

    #[test]
    fn snapshot_round_trips_through_png() {
        let mut s = MemorySurface::new(3, 1);
        s.set_pixel(2, 0, Pixel::new(9, 8, 7));
        s.present().unwrap();

        let path = std::env::temp_dir().join(format!(
            "pixmap_panels_snapshot_{}.png",
            std::process::id()
        ));
        s.save_png(&path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(2, 0).0, [9, 8, 7]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn works_through_a_mutable_reference() {
        fn paint(mut sink: impl DisplaySink) {
            sink.set_pixel(0, 0, Pixel::WHITE);
            sink.present().unwrap();
        }
        let mut s = MemorySurface::new(1, 1);
        paint(&mut s);
        assert_eq!(s.pixel(0, 0), Some(Pixel::WHITE));
    }
}
