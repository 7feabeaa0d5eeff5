use serde::{Deserialize, Serialize};

/// Rectangle in pixel space (always u32 coordinates)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square block of edge `edge` anchored at (x, y), clipped to an image.
    ///
    /// Returns `None` when the anchor lies outside the image.
    pub fn clipped_block(x: u32, y: u32, edge: u32, image_size: (u32, u32)) -> Option<Self> {
        let (width, height) = image_size;
        if x >= width || y >= height {
            return None;
        }
        Some(Self::new(
            x,
            y,
            edge.min(width - x),
            edge.min(height - y),
        ))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px - self.x < self.width && py >= self.y && py - self.y < self.height
    }

    /// Row-major iteration over the covered pixels.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |py| (self.x..self.x + self.width).map(move |px| (px, py)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_inside_image_is_unclipped() {
        let rect = PixelRect::clipped_block(16, 32, 16, (100, 100)).unwrap();
        assert_eq!(rect, PixelRect::new(16, 32, 16, 16));
        assert_eq!(rect.area(), 256);
    }

    #[test]
    fn block_on_right_and_bottom_edges_is_clipped() {
        let rect = PixelRect::clipped_block(96, 96, 16, (100, 100)).unwrap();
        assert_eq!(rect, PixelRect::new(96, 96, 4, 4));
    }

    #[test]
    fn anchor_outside_image_yields_none() {
        assert_eq!(PixelRect::clipped_block(100, 0, 8, (100, 100)), None);
        assert_eq!(PixelRect::clipped_block(0, 7, 8, (10, 7)), None);
    }

    #[test]
    fn contains_respects_bounds() {
        let rect = PixelRect::new(10, 20, 100, 50);
        assert!(rect.contains(10, 20));
        assert!(rect.contains(109, 69));
        assert!(!rect.contains(110, 70));
        assert!(!rect.contains(9, 20));
        assert!(!rect.contains(50, 19));
    }

    #[test]
    fn pixels_cover_area_in_row_major_order() {
        let rect = PixelRect::new(2, 3, 2, 2);
        let all: Vec<_> = rect.pixels().collect();
        assert_eq!(all, vec![(2, 3), (3, 3), (2, 4), (3, 4)]);
    }
}
