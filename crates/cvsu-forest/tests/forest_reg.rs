//! Quad forest regression test
//!
//! Verifies:
//! 1. Forest creation produces the expected root grid
//! 2. Subdivision tiles parents exactly and preserves merged statistics
//! 3. Union-find find/union over a chain of trees (path compression,
//!    rank bound, bounding box union)
//! 4. Parsing-round tokens invalidate annotations across updates
//! 5. Propagation conserves pooled mass over full passes

use cvsu_core::{PixelFormat, PixelImage, PixelType, Statistics};
use cvsu_forest::{
    QuadForest, TreeId, boundary_create, boundary_find, boundary_union, has_segment,
    segment_create, segment_find, segment_of, segment_union,
};
use cvsu_test::RegParams;

/// Create a synthetic 8-bit grayscale image with smooth variation.
fn create_test_grayscale_image(width: u32, height: u32) -> PixelImage {
    let mut image =
        PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let fx = x as f64 / width as f64;
            let fy = y as f64 / height as f64;
            let value = (128.0
                + 60.0 * (fx * std::f64::consts::TAU).sin()
                + 40.0 * (fy * 2.0 * std::f64::consts::TAU).cos())
            .clamp(0.0, 255.0);
            image.set_sample(x, y, 0, value).unwrap();
        }
    }
    image
}

#[test]
fn forest_creation_grid() {
    let mut rp = RegParams::new("forest_create");

    // --- 32x32 image, max 16, min 4: 2x2 roots ---
    let image = create_test_grayscale_image(32, 32);
    let forest = QuadForest::new(&image, 16, 4).unwrap();
    rp.compare_values(2.0, forest.rows() as f64, 0.0);
    rp.compare_values(2.0, forest.cols() as f64, 0.0);
    rp.compare_values(4.0, forest.root_count() as f64, 0.0);
    rp.compare_values(0.0, forest.grid_dx() as f64, 0.0);

    // --- 100x60 image, max 16: 6x3 roots centered ---
    let image = create_test_grayscale_image(100, 60);
    let forest = QuadForest::new(&image, 16, 4).unwrap();
    rp.compare_values(6.0, forest.cols() as f64, 0.0);
    rp.compare_values(3.0, forest.rows() as f64, 0.0);
    rp.compare_values(2.0, forest.grid_dx() as f64, 0.0);
    rp.compare_values(6.0, forest.grid_dy() as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn forest_division_invariants() {
    let mut rp = RegParams::new("forest_divide");

    let image = create_test_grayscale_image(64, 64);
    let mut forest = QuadForest::new(&image, 32, 4).unwrap();
    forest.update().unwrap();

    // divide every root, then every child of the first root
    for id in forest.roots().collect::<Vec<_>>() {
        forest.divide(id).unwrap();
    }
    let first_children = {
        let root = forest.tree(TreeId(0));
        [
            root.nw.unwrap(),
            root.ne.unwrap(),
            root.sw.unwrap(),
            root.se.unwrap(),
        ]
    };
    for id in first_children {
        forest.divide(id).unwrap();
    }

    // every divided node's children tile it exactly and their merged
    // statistics reproduce the parent's cached record
    let mut checked = 0;
    for index in 0..forest.len() {
        let id = TreeId(index as u32);
        let tree = forest.tree(id);
        let (Some(nw), Some(ne), Some(sw), Some(se)) = (tree.nw, tree.ne, tree.sw, tree.se)
        else {
            continue;
        };
        let (x1, y1, x2, y2) = tree.rect();
        let half = tree.size / 2;
        let nw_tree = forest.tree(nw);
        let ne_tree = forest.tree(ne);
        let sw_tree = forest.tree(sw);
        let se_tree = forest.tree(se);
        assert_eq!(nw_tree.rect(), (x1, y1, x1 + half, y1 + half));
        assert_eq!(ne_tree.rect(), (x1 + half, y1, x2, y1 + half));
        assert_eq!(sw_tree.rect(), (x1, y1 + half, x1 + half, y2));
        assert_eq!(se_tree.rect(), (x1 + half, y1 + half, x2, y2));

        let merged = Statistics::combine(
            &Statistics::combine(&nw_tree.stat, &ne_tree.stat),
            &Statistics::combine(&sw_tree.stat, &se_tree.stat),
        );
        rp.compare_values(tree.stat.n, merged.n, 0.0);
        rp.compare_values(tree.stat.mean, merged.mean, 1e-9);
        rp.compare_values(tree.stat.variance, merged.variance, 1e-6);
        checked += 1;
    }
    rp.compare_values(8.0, checked as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn union_find_chain() {
    let mut rp = RegParams::new("forest_unionfind");

    let image = create_test_grayscale_image(32, 32);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();

    let (a, b, c, d) = (TreeId(0), TreeId(1), TreeId(2), TreeId(3));
    for id in [a, b, c, d] {
        segment_create(&mut forest, id);
    }

    // find is idempotent before any union
    rp.compare_values(0.0, segment_find(&mut forest, a).unwrap().0 as f64, 0.0);
    assert_eq!(
        segment_find(&mut forest, a),
        segment_find(&mut forest, a).and_then(|root| segment_find(&mut forest, root)),
    );

    segment_union(&mut forest, a, b);
    segment_union(&mut forest, c, d);
    segment_union(&mut forest, b, c);

    let root = segment_find(&mut forest, a).unwrap();
    for id in [b, c, d] {
        assert_eq!(segment_find(&mut forest, id), Some(root));
    }
    let record = segment_of(&forest, root).unwrap();
    assert!(record.rank <= 2, "rank {} after chain unions", record.rank);
    // the survivor's bounding box covers all four trees
    rp.compare_values(0.0, record.x1 as f64, 0.0);
    rp.compare_values(0.0, record.y1 as f64, 0.0);
    rp.compare_values(32.0, record.x2 as f64, 0.0);
    rp.compare_values(32.0, record.y2 as f64, 0.0);
    // merged statistics count every pixel once
    rp.compare_values(1024.0, record.stat.n, 0.0);

    // boundary records follow the same discipline
    for id in [a, b] {
        boundary_create(&mut forest, id);
    }
    boundary_union(&mut forest, a, b);
    let boundary_root = boundary_find(&mut forest, a).unwrap();
    assert_eq!(boundary_find(&mut forest, b), Some(boundary_root));

    assert!(rp.cleanup());
}

#[test]
fn tokens_invalidate_annotations_across_updates() {
    let mut rp = RegParams::new("forest_tokens");

    let image = create_test_grayscale_image(32, 32);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();

    segment_create(&mut forest, TreeId(0));
    rp.compare_values(1.0, has_segment(&forest, TreeId(0)) as u32 as f64, 0.0);

    // a new round makes the record stale without clearing storage
    forest.update().unwrap();
    rp.compare_values(0.0, has_segment(&forest, TreeId(0)) as u32 as f64, 0.0);
    assert!(segment_find(&mut forest, TreeId(0)).is_none());

    // re-creating in the new round starts a fresh single-tree segment
    segment_create(&mut forest, TreeId(0));
    assert_eq!(segment_find(&mut forest, TreeId(0)), Some(TreeId(0)));

    assert!(rp.cleanup());
}

#[test]
fn propagation_conserves_mass() {
    let mut rp = RegParams::new("forest_propagation");

    let image = create_test_grayscale_image(64, 64);
    let mut forest = QuadForest::new(&image, 16, 4).unwrap();
    forest.update().unwrap();

    for id in forest.ids() {
        forest.prime_with_dev(id);
    }
    let before: f64 = forest.ids().map(|id| forest.tree(id).pool).sum();
    let acc_total: f64 = forest.ids().map(|id| forest.tree(id).acc).sum();
    for id in forest.ids() {
        forest.propagate(id);
    }
    let after: f64 = forest.ids().map(|id| forest.tree(id).pool).sum();
    rp.compare_values(before + acc_total, after, 1e-9);

    assert!(rp.cleanup());
}
