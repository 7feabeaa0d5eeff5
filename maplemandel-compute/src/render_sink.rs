//! Outward capability the engine renders into.

use std::sync::{Mutex, PoisonError};

use maplemandel_core::{Color, PixelRect};

/// Receiver of render output.
///
/// Called synchronously from the render thread. Emissions for one job may
/// arrive out of raster order and coarse blocks are later overdrawn by finer
/// ones; the last color emitted for a pixel is its final color. Implementations
/// must return promptly and must not call back into the engine.
pub trait RenderSink: Send + Sync {
    fn emit_pixel(&self, x: u32, y: u32, color: Color);

    /// Uniformly colored rectangle with top-left corner (x, y).
    fn emit_block(&self, x: u32, y: u32, width: u32, height: u32, color: Color);
}

/// Row-major in-memory image, usable as a presentation buffer.
#[derive(Debug)]
pub struct BufferSink {
    width: u32,
    height: u32,
    pixels: Mutex<Vec<Color>>,
}

impl BufferSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Mutex::new(vec![Color::default(); width as usize * height as usize]),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy of the current contents.
    pub fn pixels(&self) -> Vec<Color> {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        pixels.get(self.index(x, y)).copied()
    }

    /// Contents packed as 0xAARRGGBB.
    pub fn to_argb(&self) -> Vec<u32> {
        self.pixels().into_iter().map(Color::to_argb).collect()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl RenderSink for BufferSink {
    fn emit_pixel(&self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        let mut pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        pixels[index] = color;
    }

    fn emit_block(&self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let rect = PixelRect::new(x, y, width.min(self.width - x), height.min(self.height - y));
        let mut pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        for py in rect.y..rect.y + rect.height {
            let start = self.index(rect.x, py);
            pixels[start..start + rect.width as usize].fill(color);
        }
    }
}
