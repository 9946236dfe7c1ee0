// Desktop window standing in for the LED matrix.
// Pixel writes go to an off-screen 0x00RRGGBB buffer; `present` pushes it to the window.

use minifb::{Key, Scale, Window, WindowOptions};

use crate::error::DisplayError;
use crate::surface::DisplaySink;
use crate::types::Pixel;

pub struct WindowSink {
    window: Window, // the on-screen window you see
    width: usize,
    height: usize,
    back: Vec<u32>,
}

impl WindowSink {
    /// Open a window the size of the surface, magnified by `scale` (1, 2, 4, 8, 16 or 32)
    /// so a 128x16 panel chain is actually visible.
    pub fn new(title: &str, width: usize, height: usize, scale: u8) -> Result<Self, DisplayError> {
        let options = WindowOptions {
            scale: match scale {
                0 | 1 => Scale::X1,
                2 => Scale::X2,
                3 | 4 => Scale::X4,
                5..=8 => Scale::X8,
                9..=16 => Scale::X16,
                _ => Scale::X32,
            },
            ..WindowOptions::default()
        };
        let window = Window::new(title, width, height, options)
            .map_err(|e| DisplayError::WindowInit(e.to_string()))?;
        tracing::info!(width, height, scale, "opened window");
        Ok(Self {
            window,
            width,
            height,
            back: vec![0u32; width * height],
        })
    }

    /// True while ESC is held down.
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }
}

impl DisplaySink for WindowSink {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        self.back[y * self.width + x] = pixel.to_u32();
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.window
            .update_with_buffer(&self.back, self.width, self.height)
            .map_err(|e| DisplayError::WindowUpdate(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.window.is_open() && !self.esc_pressed()
    }
}
