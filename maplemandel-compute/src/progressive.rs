//! Coarse-to-fine pixel ordering.
//!
//! The image is covered by a sequence of square grids whose edge halves from
//! pass to pass. Each anchor pixel is evaluated exactly once, in the first
//! pass whose grid contains it, and paints the block it anchors until finer
//! passes overdraw the rest of that block.

use maplemandel_core::PixelRect;

/// One refinement pass with square blocks of edge `edge()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressivePass {
    edge: u32,
    first: bool,
}

impl ProgressivePass {
    /// Passes from `coarsest_block` down to single pixels.
    ///
    /// `coarsest_block` is rounded up to a power of two.
    pub fn sequence(coarsest_block: u32) -> Vec<ProgressivePass> {
        let coarsest = coarsest_block.max(1).next_power_of_two();
        let mut passes = Vec::new();
        let mut edge = coarsest;
        loop {
            passes.push(ProgressivePass {
                edge,
                first: edge == coarsest,
            });
            if edge == 1 {
                break;
            }
            edge /= 2;
        }
        passes
    }

    pub fn edge(&self) -> u32 {
        self.edge
    }

    /// Single-pixel pass; every color it emits is final.
    pub fn is_final(&self) -> bool {
        self.edge == 1
    }

    /// Whether (x, y) was already evaluated by a coarser pass.
    fn covered_by_coarser(&self, x: u32, y: u32) -> bool {
        let coarser = self.edge * 2;
        !self.first && x % coarser == 0 && y % coarser == 0
    }

    /// Blocks whose anchors this pass evaluates, in raster order, clipped
    /// to the image.
    pub fn blocks(&self, image_size: (u32, u32)) -> impl Iterator<Item = PixelRect> {
        let (width, height) = image_size;
        let pass = *self;
        let edge = pass.edge;
        (0..height)
            .step_by(edge as usize)
            .flat_map(move |y| (0..width).step_by(edge as usize).map(move |x| (x, y)))
            .filter(move |&(x, y)| !pass.covered_by_coarser(x, y))
            .filter_map(move |(x, y)| PixelRect::clipped_block(x, y, edge, image_size))
    }
}
