//! Segment bookkeeping and rendering
//!
//! Counts segment roots, assigns reproducible colors, and paints the
//! forest's leaves into an RGB image.

use crate::error::SegmentResult;
use cvsu_core::{PixelFormat, PixelImage, PixelType};
use cvsu_forest::{QuadForest, TreeId, has_segment, segment_find, segment_of, segment_of_mut};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Count segment roots and assign each a color
///
/// Walks the pool in order, and for every leaf whose segment record is
/// its own root draws an RGB triple from a generator seeded with a fixed
/// constant, so colors are reproducible across runs. The root count is
/// stored in the forest's segment counter.
pub fn refresh_segments(forest: &mut QuadForest) -> SegmentResult<()> {
    let mut rng = StdRng::seed_from_u64(1234);
    let mut count = 0;
    for index in 0..forest.len() {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() || !has_segment(forest, id) {
            continue;
        }
        if segment_find(forest, id) == Some(id) {
            let color = [rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>(), 0];
            if let Some(segment) = segment_of_mut(forest, id) {
                segment.color = color;
            }
            count += 1;
        }
    }
    forest.set_segments(count);
    Ok(())
}

/// Collect segment roots in pool order
pub fn get_segments(forest: &mut QuadForest) -> Vec<TreeId> {
    let mut roots = Vec::new();
    for index in 0..forest.len() {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        if has_segment(forest, id) && segment_find(forest, id) == Some(id) {
            roots.push(id);
        }
    }
    roots
}

/// Paint the forest's leaves into a fresh RGB image
///
/// With `use_regions` unset each leaf fills with its own mean intensity;
/// set, leaves fill with their segment root's merged mean, or with the
/// root's assigned color when `use_colors` is also set. Pixels outside
/// the root grid stay black.
pub fn draw_image(
    forest: &mut QuadForest,
    use_regions: bool,
    use_colors: bool,
) -> SegmentResult<PixelImage> {
    let mut target = PixelImage::new_continuous(
        PixelType::U8,
        PixelFormat::Rgb,
        forest.width(),
        forest.height(),
    )?;

    for index in 0..forest.len() {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        let (x, y, size) = {
            let tree = forest.tree(id);
            (tree.x, tree.y, tree.size)
        };
        let color: [u8; 3] = if !use_regions {
            let mean = forest.tree(id).stat.mean as u8;
            [mean, mean, mean]
        } else {
            let Some(root) = segment_find(forest, id) else {
                continue;
            };
            let Some(segment) = segment_of(forest, root) else {
                continue;
            };
            if use_colors {
                [segment.color[0], segment.color[1], segment.color[2]]
            } else {
                let mean = segment.stat.mean as u8;
                [mean, mean, mean]
            }
        };
        for row in y..y + size {
            let samples = target.row_mut::<u8>(row)?;
            for pixel in
                samples[(x as usize) * 3..((x + size) as usize) * 3].chunks_exact_mut(3)
            {
                pixel.copy_from_slice(&color);
            }
        }
    }
    Ok(target)
}
