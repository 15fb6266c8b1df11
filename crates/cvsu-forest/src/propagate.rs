//! Synchronous propagation primitives
//!
//! One round is three phases over every node in pool order: prime (seed
//! `acc`/`pool` from a chosen source), propagate (each node sends a
//! quarter of `acc` to each 4-neighbor, keeping the share at image
//! borders), accumulate (`pool` becomes the next `acc`). Between rounds
//! `prime_with_pool` carries the pooled value forward at half weight. The
//! squared companions `acc2`/`pool2` follow the same flow so a deviation
//! estimate can be derived from the propagated field.

use crate::forest::QuadForest;
use crate::tree::TreeId;

impl QuadForest {
    /// Carry the pooled value into the next round at half weight
    pub fn prime_with_pool(&mut self, id: TreeId) {
        let tree = self.tree_mut(id);
        tree.acc = tree.pool / 2.0;
        tree.pool = tree.acc;
        // pool2 already holds squared values
        tree.acc2 = tree.pool2 / 2.0;
        tree.pool2 = tree.acc2;
    }

    /// Seed with a constant value
    pub fn prime_with_constant(&mut self, id: TreeId, constant: f64) {
        let tree = self.tree_mut(id);
        tree.acc = constant / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = constant * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed with the edge response magnitude
    pub fn prime_with_mag(&mut self, id: TreeId) {
        let mag = self.edge_values(id).mag;
        let tree = self.tree_mut(id);
        tree.acc = mag / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = mag * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed with the horizontal edge response
    pub fn prime_with_dx(&mut self, id: TreeId) {
        let dx = self.edge_values(id).dx;
        let tree = self.tree_mut(id);
        tree.acc = dx / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = dx * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed with the vertical edge response
    pub fn prime_with_dy(&mut self, id: TreeId) {
        let dy = self.edge_values(id).dy;
        let tree = self.tree_mut(id);
        tree.acc = dy / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = dy * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed edge-gated: the constant on nodes flagged as edges, zero
    /// elsewhere
    pub fn prime_with_edge(&mut self, id: TreeId, constant: f64) {
        let has_edge = self.edge_values(id).has_edge;
        let tree = self.tree_mut(id);
        if has_edge {
            tree.acc = constant / 2.0;
            tree.pool = tree.acc;
            tree.acc2 = constant * tree.acc;
            tree.pool2 = tree.acc2;
        } else {
            tree.acc = 0.0;
            tree.pool = 0.0;
            tree.acc2 = 0.0;
            tree.pool2 = 0.0;
        }
    }

    /// Seed with the horizontal difference of neighbor dy responses
    ///
    /// `dy` of the east and west neighbors minus `dy` of the north and
    /// south neighbors.
    pub fn prime_with_hdiff(&mut self, id: TreeId) {
        let (n, e, s, w) = {
            let tree = self.tree(id);
            (tree.n, tree.e, tree.s, tree.w)
        };
        let mut value = 0.0;
        value += w.map_or(0.0, |link| self.edge_values(link).dy);
        value += e.map_or(0.0, |link| self.edge_values(link).dy);
        value -= n.map_or(0.0, |link| self.edge_values(link).dy);
        value -= s.map_or(0.0, |link| self.edge_values(link).dy);
        let tree = self.tree_mut(id);
        tree.acc = value / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = value * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed with the node's intensity deviation
    pub fn prime_with_dev(&mut self, id: TreeId) {
        let tree = self.tree_mut(id);
        let deviation = tree.stat.deviation;
        tree.acc = deviation / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = deviation * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Seed with the node's intensity mean
    pub fn prime_with_mean(&mut self, id: TreeId) {
        let tree = self.tree_mut(id);
        let mean = tree.stat.mean;
        tree.acc = mean / 2.0;
        tree.pool = tree.acc;
        tree.acc2 = mean * tree.acc;
        tree.pool2 = tree.acc2;
    }

    /// Finish a round: the pooled value becomes the accumulator
    pub fn accumulate(&mut self, id: TreeId) {
        let tree = self.tree_mut(id);
        tree.acc = tree.pool;
        tree.acc2 = tree.pool2;
    }

    fn send(&mut self, from: TreeId, to: Option<TreeId>, pool: f64, pool2: f64) {
        let target = self.tree_mut(to.unwrap_or(from));
        target.pool += pool;
        target.pool2 += pool2;
    }

    /// Send a quarter of `acc` to each of the four neighbors
    ///
    /// Shares aimed past the image border return to the node's own pool,
    /// so a full pass conserves the total pooled mass.
    pub fn propagate(&mut self, id: TreeId) {
        let (acc, acc2, n, e, s, w) = {
            let tree = self.tree(id);
            (tree.acc, tree.acc2, tree.n, tree.e, tree.s, tree.w)
        };
        let pool = acc / 4.0;
        let pool2 = acc2 / 4.0;
        self.send(id, n, pool, pool2);
        self.send(id, e, pool, pool2);
        self.send(id, s, pool, pool2);
        self.send(id, w, pool, pool2);
    }

    /// Propagate to the vertical neighbors only
    pub fn propagate_v(&mut self, id: TreeId) {
        let (acc, acc2, n, s) = {
            let tree = self.tree(id);
            (tree.acc, tree.acc2, tree.n, tree.s)
        };
        let pool = acc / 4.0;
        let pool2 = acc2 / 4.0;
        self.send(id, n, pool, pool2);
        self.send(id, s, pool, pool2);
    }

    /// Propagate to the horizontal neighbors only
    pub fn propagate_h(&mut self, id: TreeId) {
        let (acc, acc2, e, w) = {
            let tree = self.tree(id);
            (tree.acc, tree.acc2, tree.e, tree.w)
        };
        let pool = acc / 4.0;
        let pool2 = acc2 / 4.0;
        self.send(id, e, pool, pool2);
        self.send(id, w, pool, pool2);
    }

    /// Propagate in proportion to the edge response components
    ///
    /// The vertical neighbors receive the `|dx|` share and the horizontal
    /// neighbors the `|dy|` share, so mass diffuses along the edge rather
    /// than across it. Below magnitude 0.01 the split is even.
    pub fn propagate_m(&mut self, id: TreeId) {
        let response = self.edge_values(id);
        let dx = response.dx.abs();
        let dy = response.dy.abs();
        let magnitude = dx + dy;
        let (mx, my) = if magnitude < 0.01 {
            (0.5, 0.5)
        } else {
            (dx / magnitude, dy / magnitude)
        };
        let (acc, acc2, n, e, s, w) = {
            let tree = self.tree(id);
            (tree.acc, tree.acc2, tree.n, tree.e, tree.s, tree.w)
        };
        // halved only; the other half splits between the two directions
        let pool = acc / 2.0;
        let pool2 = acc2 / 2.0;
        self.send(id, n, mx * pool, mx * pool2);
        self.send(id, s, mx * pool, mx * pool2);
        self.send(id, e, my * pool, my * pool2);
        self.send(id, w, my * pool, my * pool2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsu_core::{PixelFormat, PixelImage, PixelType};

    fn flat_forest(width: u32, height: u32, max_size: u32) -> QuadForest {
        let image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        let mut forest = QuadForest::new(&image, max_size, 4).unwrap();
        forest.update().unwrap();
        forest
    }

    #[test]
    fn test_prime_with_constant() {
        let mut forest = flat_forest(32, 32, 16);
        forest.prime_with_constant(TreeId(0), 8.0);
        let tree = forest.tree(TreeId(0));
        assert_eq!(tree.acc, 4.0);
        assert_eq!(tree.pool, 4.0);
        assert_eq!(tree.acc2, 32.0);
        assert_eq!(tree.pool2, 32.0);
    }

    #[test]
    fn test_propagate_conserves_mass() {
        let mut forest = flat_forest(64, 64, 16);
        for id in forest.ids() {
            forest.prime_with_constant(id, 1.0);
        }
        let before: f64 = forest.ids().map(|id| forest.tree(id).pool).sum();
        for id in forest.ids() {
            forest.propagate(id);
        }
        let after: f64 = forest.ids().map(|id| forest.tree(id).pool).sum();
        assert!((before * 2.0 - after).abs() < 1e-9);
        // pool doubles because priming kept acc == pool and the pass
        // distributes the full acc on top
    }

    #[test]
    fn test_border_shares_return_home() {
        let mut forest = flat_forest(32, 32, 16);
        // corner root: two of four shares return to its own pool
        forest.prime_with_constant(TreeId(0), 8.0);
        forest.propagate(TreeId(0));
        let corner = forest.tree(TreeId(0));
        assert_eq!(corner.pool, 4.0 + 2.0 * 1.0);
        assert_eq!(forest.tree(TreeId(1)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(2)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(3)).pool, 0.0);
    }

    #[test]
    fn test_directional_propagation() {
        let mut forest = flat_forest(48, 48, 16);
        // center root of the 3x3 grid
        let center = TreeId(4);
        forest.prime_with_constant(center, 8.0);
        forest.propagate_h(center);
        assert_eq!(forest.tree(TreeId(3)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(5)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(1)).pool, 0.0);
        assert_eq!(forest.tree(TreeId(7)).pool, 0.0);

        forest.prime_with_constant(center, 8.0);
        forest.propagate_v(center);
        assert_eq!(forest.tree(TreeId(1)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(7)).pool, 1.0);
    }

    #[test]
    fn test_magnitude_weighted_split_is_even_without_response() {
        let mut forest = flat_forest(48, 48, 16);
        let center = TreeId(4);
        forest.prime_with_constant(center, 8.0);
        forest.propagate_m(center);
        // no edge response recorded: even split of acc/2 to all four
        assert_eq!(forest.tree(TreeId(1)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(3)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(5)).pool, 1.0);
        assert_eq!(forest.tree(TreeId(7)).pool, 1.0);
    }

    #[test]
    fn test_accumulate_and_carry() {
        let mut forest = flat_forest(32, 32, 16);
        forest.prime_with_constant(TreeId(0), 8.0);
        forest.propagate(TreeId(0));
        forest.accumulate(TreeId(0));
        let tree = forest.tree(TreeId(0));
        assert_eq!(tree.acc, tree.pool);
        forest.prime_with_pool(TreeId(0));
        let tree = forest.tree(TreeId(0));
        assert_eq!(tree.acc, 3.0);
        assert_eq!(tree.pool, 3.0);
    }

    #[test]
    fn test_prime_with_dev_and_mean() {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 16, 16).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                image.set_sample(x, y, 0, if x < 8 { 0.0 } else { 100.0 }).unwrap();
            }
        }
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        forest.prime_with_mean(TreeId(0));
        assert_eq!(forest.tree(TreeId(0)).acc, 25.0);
        forest.prime_with_dev(TreeId(0));
        assert_eq!(forest.tree(TreeId(0)).acc, 25.0);
    }
}
