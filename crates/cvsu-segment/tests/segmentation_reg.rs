//! Segmentation regression test
//!
//! Verifies the end-to-end scenarios:
//! 1. Deviation segmentation of a uniform 32x32 image yields one segment
//!    and no subdivisions
//! 2. A perfect vertical step edge at x=16 yields exactly two segments
//!    with the expected bounding boxes
//! 3. The refreshed segment count equals the number of distinct roots
//!    over all leaves
//! 4. Overlap segmentation agrees on the same inputs
//! 5. Rendering paints segment regions consistently

use cvsu_core::{PixelFormat, PixelImage, PixelType};
use cvsu_forest::{TreeId, segment_find, segment_of};
use cvsu_segment::{
    QuadForest, draw_image, get_segments, refresh_segments, segment_with_deviation,
    segment_with_overlap,
};
use cvsu_test::RegParams;

fn uniform_image(width: u32, height: u32, value: u8) -> PixelImage {
    let mut image =
        PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
    for y in 0..height {
        image.row_mut::<u8>(y).unwrap().fill(value);
    }
    image
}

fn step_edge_image(width: u32, height: u32, edge_x: u32) -> PixelImage {
    let mut image =
        PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let value = if x < edge_x { 40.0 } else { 200.0 };
            image.set_sample(x, y, 0, value).unwrap();
        }
    }
    image
}

#[test]
fn deviation_segmentation_uniform() {
    let mut rp = RegParams::new("segmentation_uniform");

    let image = uniform_image(32, 32, 128);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_deviation(&mut forest, 10.0, 1.0).unwrap();

    rp.compare_values(1.0, forest.segments() as f64, 0.0);
    // no subdivisions: the pool still holds only the four roots
    rp.compare_values(4.0, forest.len() as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn deviation_segmentation_step_edge() {
    let mut rp = RegParams::new("segmentation_step");

    let image = step_edge_image(32, 32, 16);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_deviation(&mut forest, 10.0, 1.0).unwrap();

    rp.compare_values(2.0, forest.segments() as f64, 0.0);

    let roots = get_segments(&mut forest);
    rp.compare_values(2.0, roots.len() as f64, 0.0);
    let mut boxes: Vec<(u32, u32, u32, u32)> = roots
        .iter()
        .map(|id| {
            let segment = segment_of(&forest, *id).unwrap();
            (segment.x1, segment.y1, segment.x2, segment.y2)
        })
        .collect();
    boxes.sort();
    assert_eq!(boxes, vec![(0, 0, 16, 32), (16, 0, 32, 32)]);

    // the two sides carry their own mean intensities
    let mut means: Vec<f64> = roots
        .iter()
        .map(|id| segment_of(&forest, *id).unwrap().stat.mean)
        .collect();
    means.sort_by(f64::total_cmp);
    rp.compare_values(40.0, means[0], 0.0);
    rp.compare_values(200.0, means[1], 0.0);

    assert!(rp.cleanup());
}

#[test]
fn refresh_matches_distinct_roots() {
    let mut rp = RegParams::new("segmentation_refresh");

    let image = step_edge_image(32, 32, 16);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_deviation(&mut forest, 10.0, 1.0).unwrap();

    // count distinct find results over all leaves
    let mut roots = Vec::new();
    for index in 0..forest.len() {
        let id = TreeId(index as u32);
        if !forest.tree(id).is_leaf() {
            continue;
        }
        if let Some(root) = segment_find(&mut forest, id)
            && !roots.contains(&root)
        {
            roots.push(root);
        }
    }
    rp.compare_values(roots.len() as f64, forest.segments() as f64, 0.0);

    // refreshing again does not change the count
    refresh_segments(&mut forest).unwrap();
    rp.compare_values(roots.len() as f64, forest.segments() as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn overlap_segmentation_agrees() {
    let mut rp = RegParams::new("segmentation_overlap");

    let image = uniform_image(32, 32, 128);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_overlap(&mut forest, 2.0, 0.5, 0.5).unwrap();
    rp.compare_values(1.0, forest.segments() as f64, 0.0);

    let image = step_edge_image(32, 32, 16);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_overlap(&mut forest, 2.0, 0.5, 0.5).unwrap();
    rp.compare_values(2.0, forest.segments() as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn draw_image_renders_regions() {
    let mut rp = RegParams::new("segmentation_draw");

    let image = step_edge_image(32, 32, 16);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();
    segment_with_deviation(&mut forest, 10.0, 1.0).unwrap();

    // region means reproduce the two plateaus
    let means = draw_image(&mut forest, true, false).unwrap();
    rp.compare_values(40.0, means.get_sample(0, 0, 0).unwrap(), 0.0);
    rp.compare_values(40.0, means.get_sample(15, 31, 1).unwrap(), 0.0);
    rp.compare_values(200.0, means.get_sample(16, 0, 2).unwrap(), 0.0);
    rp.compare_values(200.0, means.get_sample(31, 31, 0).unwrap(), 0.0);

    // colored rendering is uniform within a segment and differs across
    // the edge
    let colors = draw_image(&mut forest, true, true).unwrap();
    let left: Vec<f64> = (0..3).map(|c| colors.get_sample(3, 3, c).unwrap()).collect();
    let left_far: Vec<f64> = (0..3).map(|c| colors.get_sample(12, 28, c).unwrap()).collect();
    let right: Vec<f64> = (0..3).map(|c| colors.get_sample(20, 3, c).unwrap()).collect();
    assert_eq!(left, left_far);
    assert_ne!(left, right);

    assert!(rp.cleanup());
}
