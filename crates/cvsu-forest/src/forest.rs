//! QuadForest - the grid of root quad trees over an image
//!
//! A forest owns the source image, a derived grey copy, the integral
//! image, and an append-only pool of tree nodes. The first `rows * cols`
//! pool slots are the roots, tiled with centering offsets so the grid sits
//! symmetrically inside the image. All structural references between
//! nodes are pool indices, so appending children during subdivision never
//! invalidates anything.
//!
//! The forest also carries the parsing-round token: `update` starts a new
//! round, and annotations initialized in earlier rounds become stale
//! without being cleared.

use crate::annotation::{AnnotationKind, Direction, EdgeResponse};
use crate::error::{ForestError, ForestResult};
use crate::tree::{QuadTree, TreeId};
use crate::unionfind::segment_create;
use cvsu_core::{PixelFormat, PixelImage, PixelType, Statistics, pick_channel, rgb24_to_grey8};
use cvsu_integral::{IntegralImage, hscan_fisher, vscan_fisher};

/// Grid of root quad trees with shared source, integral image and node
/// pool
///
/// # Examples
///
/// ```
/// use cvsu_core::{PixelFormat, PixelImage, PixelType};
/// use cvsu_forest::QuadForest;
///
/// let image = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 64, 64).unwrap();
/// let mut forest = QuadForest::new(&image, 16, 4).unwrap();
/// forest.update().unwrap();
/// assert_eq!(forest.root_count(), 16);
/// ```
#[derive(Debug)]
pub struct QuadForest {
    original: PixelImage,
    source: PixelImage,
    integral: IntegralImage,
    rows: u32,
    cols: u32,
    tree_max_size: u32,
    tree_min_size: u32,
    dx: u32,
    dy: u32,
    pub(crate) trees: Vec<QuadTree>,
    token: u32,
    segments: u32,
    next_id: u32,
}

fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

impl QuadForest {
    /// Create a forest over the image
    ///
    /// `tree_max_size` is the root tile side, `tree_min_size` the smallest
    /// size subdivision may produce; both must be powers of two with
    /// `min <= max <= min(W, H)`. The source must be a U8 image in Grey,
    /// Yuv or Rgb format; the forest converts it into its internal grey
    /// copy.
    pub fn new(source: &PixelImage, tree_max_size: u32, tree_min_size: u32) -> ForestResult<Self> {
        let width = source.width();
        let height = source.height();
        if !is_power_of_two(tree_max_size) || !is_power_of_two(tree_min_size) {
            return Err(ForestError::InvalidParameters(format!(
                "tree sizes must be powers of two, got max {} min {}",
                tree_max_size, tree_min_size
            )));
        }
        if tree_min_size > tree_max_size {
            return Err(ForestError::InvalidParameters(format!(
                "tree_min_size {} exceeds tree_max_size {}",
                tree_min_size, tree_max_size
            )));
        }
        if tree_max_size > width.min(height) {
            return Err(ForestError::InvalidParameters(format!(
                "tree_max_size {} exceeds image extent {}x{}",
                tree_max_size, width, height
            )));
        }
        if source.ty() != PixelType::U8 {
            return Err(ForestError::Core(cvsu_core::Error::BadType {
                expected: "U8",
                actual: source.ty().name(),
            }));
        }
        match source.format() {
            PixelFormat::Grey | PixelFormat::Yuv | PixelFormat::Rgb => {}
            other => {
                return Err(ForestError::UnsupportedFormat(format!("{:?}", other)));
            }
        }

        let mut grey =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height)
                .map_err(ForestError::Core)?;
        refresh_source(source, &mut grey)?;
        let integral = IntegralImage::from_pix(&grey)?;

        let cols = width / tree_max_size;
        let rows = height / tree_max_size;
        let dx = (width - cols * tree_max_size) / 2;
        let dy = (height - rows * tree_max_size) / 2;

        let mut forest = Self {
            original: source.clone(),
            source: grey,
            integral,
            rows,
            cols,
            tree_max_size,
            tree_min_size,
            dx,
            dy,
            trees: Vec::with_capacity((rows * cols * 8) as usize),
            token: 1,
            segments: 0,
            next_id: 0,
        };
        forest.build_roots();
        Ok(forest)
    }

    fn build_roots(&mut self) {
        self.trees.clear();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let x = self.dx + col * self.tree_max_size;
                let y = self.dy + row * self.tree_max_size;
                let stat = self.integral.rect_statistics(
                    x as i32,
                    y as i32,
                    self.tree_max_size as i32,
                    self.tree_max_size as i32,
                );
                self.trees
                    .push(QuadTree::new(x, y, self.tree_max_size, 0, stat));
            }
        }
        self.wire_root_neighbors();
    }

    fn wire_root_neighbors(&mut self) {
        let cols = self.cols as usize;
        for row in 0..self.rows as usize {
            for col in 0..cols {
                let pos = row * cols + col;
                self.trees[pos].w = (col > 0).then(|| TreeId((pos - 1) as u32));
                self.trees[pos].n = (row > 0).then(|| TreeId((pos - cols) as u32));
                self.trees[pos].e =
                    (col + 1 < cols).then(|| TreeId((pos + 1) as u32));
                self.trees[pos].s =
                    (row + 1 < self.rows as usize).then(|| TreeId((pos + cols) as u32));
            }
        }
    }

    /// Rebuild the root grid for new tree sizes
    ///
    /// A no-op when the sizes match the current configuration. The source
    /// and integral image are reused.
    pub fn reload(&mut self, tree_max_size: u32, tree_min_size: u32) -> ForestResult<()> {
        if tree_max_size == self.tree_max_size && tree_min_size == self.tree_min_size {
            return Ok(());
        }
        if !is_power_of_two(tree_max_size) || !is_power_of_two(tree_min_size) {
            return Err(ForestError::InvalidParameters(
                "tree sizes must be powers of two".to_string(),
            ));
        }
        if tree_min_size > tree_max_size
            || tree_max_size > self.width().min(self.height())
        {
            return Err(ForestError::InvalidParameters(
                "tree sizes out of range for image".to_string(),
            ));
        }
        self.tree_max_size = tree_max_size;
        self.tree_min_size = tree_min_size;
        self.cols = self.width() / tree_max_size;
        self.rows = self.height() / tree_max_size;
        self.dx = (self.width() - self.cols * tree_max_size) / 2;
        self.dy = (self.height() - self.rows * tree_max_size) / 2;
        self.token += 1;
        self.segments = 0;
        self.build_roots();
        Ok(())
    }

    /// Swap in a new source frame of identical geometry
    ///
    /// Takes effect at the next [`QuadForest::update`].
    pub fn replace_original(&mut self, source: &PixelImage) -> ForestResult<()> {
        if source.width() != self.original.width()
            || source.height() != self.original.height()
            || source.ty() != self.original.ty()
            || source.format() != self.original.format()
        {
            return Err(ForestError::InvalidParameters(
                "replacement frame must match the original geometry".to_string(),
            ));
        }
        self.original = source.clone();
        Ok(())
    }

    /// Start a new parsing round
    ///
    /// Re-converts the original into the internal grey source, updates the
    /// integral image, discards every child produced in earlier rounds,
    /// and re-derives root statistics. Annotations from earlier rounds
    /// become stale through the token.
    pub fn update(&mut self) -> ForestResult<()> {
        refresh_source(&self.original, &mut self.source)?;
        self.integral.update(&self.source)?;
        self.trees.truncate((self.rows * self.cols) as usize);
        self.token += 1;
        self.segments = 0;
        for index in 0..self.trees.len() {
            let (x, y) = (self.trees[index].x, self.trees[index].y);
            let stat = self.integral.rect_statistics(
                x as i32,
                y as i32,
                self.tree_max_size as i32,
                self.tree_max_size as i32,
            );
            let tree = &mut self.trees[index];
            tree.stat = stat;
            tree.nw = None;
            tree.ne = None;
            tree.sw = None;
            tree.se = None;
            tree.acc = 0.0;
            tree.acc2 = 0.0;
            tree.pool = 0.0;
            tree.pool2 = 0.0;
        }
        self.wire_root_neighbors();
        Ok(())
    }

    /// Image width in pixels
    #[inline]
    pub fn width(&self) -> u32 {
        self.source.width()
    }

    /// Image height in pixels
    #[inline]
    pub fn height(&self) -> u32 {
        self.source.height()
    }

    /// Root grid rows
    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Root grid columns
    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Root tile side length
    #[inline]
    pub fn tree_max_size(&self) -> u32 {
        self.tree_max_size
    }

    /// Smallest size subdivision may produce
    #[inline]
    pub fn tree_min_size(&self) -> u32 {
        self.tree_min_size
    }

    /// Horizontal centering offset of the root grid
    #[inline]
    pub fn grid_dx(&self) -> u32 {
        self.dx
    }

    /// Vertical centering offset of the root grid
    #[inline]
    pub fn grid_dy(&self) -> u32 {
        self.dy
    }

    /// Current parsing-round token
    #[inline]
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Segment count from the latest refresh
    #[inline]
    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Record the segment count; used by the segmentation layer
    #[inline]
    pub fn set_segments(&mut self, count: u32) {
        self.segments = count;
    }

    /// The internal grey source image
    #[inline]
    pub fn source(&self) -> &PixelImage {
        &self.source
    }

    /// The original image the forest was created over
    #[inline]
    pub fn original(&self) -> &PixelImage {
        &self.original
    }

    /// The integral image over the grey source
    #[inline]
    pub fn integral(&self) -> &IntegralImage {
        &self.integral
    }

    /// Number of nodes in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Number of root nodes
    #[inline]
    pub fn root_count(&self) -> u32 {
        self.rows * self.cols
    }

    /// All node ids in pool order
    pub fn ids(&self) -> impl Iterator<Item = TreeId> + use<> {
        (0..self.trees.len() as u32).map(TreeId)
    }

    /// Root ids in row-major order
    pub fn roots(&self) -> impl Iterator<Item = TreeId> + use<> {
        (0..self.root_count()).map(TreeId)
    }

    /// Borrow a node
    #[inline]
    pub fn tree(&self, id: TreeId) -> &QuadTree {
        &self.trees[id.index()]
    }

    /// Borrow a node mutably
    #[inline]
    pub fn tree_mut(&mut self, id: TreeId) -> &mut QuadTree {
        &mut self.trees[id.index()]
    }

    /// Deterministic id source for union-find records
    pub(crate) fn next_record_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Subdivide a node into four children
    ///
    /// A no-op on already-divided nodes and on nodes too small to split
    /// (`size < 2 * tree_min_size`). Child statistics come from O(1)
    /// integral image lookups; neighbor links are cached into the children
    /// afterwards.
    pub fn divide(&mut self, id: TreeId) -> ForestResult<()> {
        let (size, is_leaf) = {
            let tree = self.tree(id);
            (tree.size, tree.is_leaf())
        };
        if !is_leaf || size < 2 * self.tree_min_size {
            return Ok(());
        }
        let stats = self.child_statistics(id)?;
        self.attach_children(id, stats);
        Ok(())
    }

    fn attach_children(&mut self, id: TreeId, stats: [Statistics; 4]) {
        let (x, y, size, level) = {
            let tree = self.tree(id);
            (tree.x, tree.y, tree.size, tree.level)
        };
        let half = size / 2;
        let coords = [(x, y), (x + half, y), (x, y + half), (x + half, y + half)];
        let mut children = [TreeId(0); 4];
        for (i, (cx, cy)) in coords.into_iter().enumerate() {
            let mut node = QuadTree::new(cx, cy, half, level + 1, stats[i]);
            node.parent = Some(id);
            children[i] = TreeId(self.trees.len() as u32);
            self.trees.push(node);
        }
        {
            let tree = self.tree_mut(id);
            tree.nw = Some(children[0]);
            tree.ne = Some(children[1]);
            tree.sw = Some(children[2]);
            tree.se = Some(children[3]);
        }
        self.cache_neighbors(id);
    }

    /// Wire neighbor links for a freshly divided node
    ///
    /// Inter-sibling links are exact. External links point to the
    /// neighbor's adjacent child when it has one, else to the coarser
    /// neighbor itself; same-level children get symmetric back-links.
    fn cache_neighbors(&mut self, id: TreeId) {
        let (nw, ne, sw, se, n, e, s, w) = {
            let tree = self.tree(id);
            let (Some(nw), Some(ne), Some(sw), Some(se)) = (tree.nw, tree.ne, tree.sw, tree.se)
            else {
                return;
            };
            (nw, ne, sw, se, tree.n, tree.e, tree.s, tree.w)
        };

        self.trees[nw.index()].e = Some(ne);
        self.trees[nw.index()].s = Some(sw);
        self.trees[ne.index()].w = Some(nw);
        self.trees[ne.index()].s = Some(se);
        self.trees[sw.index()].e = Some(se);
        self.trees[sw.index()].n = Some(nw);
        self.trees[se.index()].w = Some(sw);
        self.trees[se.index()].n = Some(ne);

        if let Some(n) = n {
            let (n_sw, n_se) = (self.trees[n.index()].sw, self.trees[n.index()].se);
            match n_sw {
                Some(peer) => {
                    self.trees[nw.index()].n = Some(peer);
                    self.trees[peer.index()].s = Some(nw);
                }
                None => self.trees[nw.index()].n = Some(n),
            }
            match n_se {
                Some(peer) => {
                    self.trees[ne.index()].n = Some(peer);
                    self.trees[peer.index()].s = Some(ne);
                }
                None => self.trees[ne.index()].n = Some(n),
            }
        }
        if let Some(e) = e {
            let (e_nw, e_sw) = (self.trees[e.index()].nw, self.trees[e.index()].sw);
            match e_nw {
                Some(peer) => {
                    self.trees[ne.index()].e = Some(peer);
                    self.trees[peer.index()].w = Some(ne);
                }
                None => self.trees[ne.index()].e = Some(e),
            }
            match e_sw {
                Some(peer) => {
                    self.trees[se.index()].e = Some(peer);
                    self.trees[peer.index()].w = Some(se);
                }
                None => self.trees[se.index()].e = Some(e),
            }
        }
        if let Some(s) = s {
            let (s_nw, s_ne) = (self.trees[s.index()].nw, self.trees[s.index()].ne);
            match s_nw {
                Some(peer) => {
                    self.trees[sw.index()].s = Some(peer);
                    self.trees[peer.index()].n = Some(sw);
                }
                None => self.trees[sw.index()].s = Some(s),
            }
            match s_ne {
                Some(peer) => {
                    self.trees[se.index()].s = Some(peer);
                    self.trees[peer.index()].n = Some(se);
                }
                None => self.trees[se.index()].s = Some(s),
            }
        }
        if let Some(w) = w {
            let (w_ne, w_se) = (self.trees[w.index()].ne, self.trees[w.index()].se);
            match w_ne {
                Some(peer) => {
                    self.trees[nw.index()].w = Some(peer);
                    self.trees[peer.index()].e = Some(nw);
                }
                None => self.trees[nw.index()].w = Some(w),
            }
            match w_se {
                Some(peer) => {
                    self.trees[sw.index()].w = Some(peer);
                    self.trees[peer.index()].e = Some(sw);
                }
                None => self.trees[sw.index()].w = Some(w),
            }
        }
    }

    /// Statistics of the four child quadrants in NW, NE, SW, SE order
    ///
    /// Divided nodes return their children's cached statistics; leaves
    /// derive the quadrants from the integral image, or from single
    /// pixels when the children would be one sample wide.
    pub fn child_statistics(&self, id: TreeId) -> ForestResult<[Statistics; 4]> {
        let tree = self.tree(id);
        if let (Some(nw), Some(ne), Some(sw), Some(se)) = (tree.nw, tree.ne, tree.sw, tree.se) {
            return Ok([
                self.tree(nw).stat,
                self.tree(ne).stat,
                self.tree(sw).stat,
                self.tree(se).stat,
            ]);
        }
        if tree.size < 2 {
            return Err(ForestError::InvalidParameters(
                "unit trees have no child statistics".to_string(),
            ));
        }
        let (x, y) = (tree.x, tree.y);
        let half = tree.size / 2;
        let coords = [(x, y), (x + half, y), (x, y + half), (x + half, y + half)];
        if half < 2 {
            let mut stats = [Statistics::zero(); 4];
            for (i, (cx, cy)) in coords.into_iter().enumerate() {
                let value = self.source.get_sample(cx, cy, 0).unwrap_or(0.0);
                stats[i] = Statistics::from_sums(1.0, value, value * value);
            }
            return Ok(stats);
        }
        Ok(coords.map(|(cx, cy)| {
            self.integral
                .rect_statistics(cx as i32, cy as i32, half as i32, half as i32)
        }))
    }

    /// Statistics of the square of side `size * (1 + 2 * multiplier)`
    /// centered on the node, clipped to the image
    pub fn neighborhood_statistics(
        &self,
        id: TreeId,
        multiplier: f64,
    ) -> ForestResult<Statistics> {
        if multiplier <= 0.0 {
            return Err(ForestError::InvalidParameters(
                "neighborhood multiplier must be positive".to_string(),
            ));
        }
        let tree = self.tree(id);
        let margin = (multiplier * tree.size as f64) as i32;
        let side = tree.size as i32 + 2 * margin;
        Ok(self.integral.rect_statistics(
            tree.x as i32 - margin,
            tree.y as i32 - margin,
            side,
            side,
        ))
    }

    /// Subdivide when the candidate children's intensity intervals
    /// overlap too little
    ///
    /// Each child contributes the interval `[mean - s, mean + s]` clamped
    /// to [0, 255], with `s = max(alpha, alpha * deviation)`. The overlap
    /// measure is the ratio of interval intersection to union; below the
    /// threshold the node divides, otherwise it becomes a segment leaf.
    pub fn divide_with_overlap(
        &mut self,
        id: TreeId,
        alpha: f64,
        overlap_threshold: f64,
    ) -> ForestResult<()> {
        if alpha <= 0.0 || overlap_threshold <= 0.0 {
            return Err(ForestError::InvalidParameters(
                "alpha and overlap threshold must be positive".to_string(),
            ));
        }
        if !self.tree(id).is_leaf() {
            return Ok(());
        }
        if self.tree(id).size < 2 * self.tree_min_size {
            segment_create(self, id);
            return Ok(());
        }

        let stats = self.child_statistics(id)?;
        let mut x1min = 0.0;
        let mut x1max = 0.0;
        let mut x2min = 0.0;
        let mut x2max = 0.0;
        for (i, stat) in stats.iter().enumerate() {
            let spread = (alpha * stat.deviation).max(alpha);
            let x1 = (stat.mean - spread).max(0.0);
            let x2 = (stat.mean + spread).min(255.0);
            if i == 0 {
                x1min = x1;
                x1max = x1;
                x2min = x2;
                x2max = x2;
            } else {
                if x1 < x1min {
                    x1min = x1;
                } else if x1 > x1max {
                    x1max = x1;
                }
                if x2 < x2min {
                    x2min = x2;
                } else if x2 > x2max {
                    x2max = x2;
                }
            }
        }
        let intersection = if x1max > x2min {
            0.0
        } else {
            (x2min - x1max).max(1.0)
        };
        let union = (x2max - x1min).max(1.0);
        if intersection / union < overlap_threshold {
            self.attach_children(id, stats);
        } else {
            segment_create(self, id);
        }
        Ok(())
    }

    /// Box-Fisher edge response of the node
    ///
    /// Scans a sliding two-box window horizontally and vertically across
    /// the node (`box_length = max(size / 2, 4)`) and stores dx, dy,
    /// magnitude and angle into the `EdgeResponse` annotation. The
    /// response is zero when the scan window falls outside the image.
    pub fn edge_response(&mut self, id: TreeId) -> ForestResult<(f64, f64)> {
        let (x, y, size) = {
            let tree = self.tree(id);
            (tree.x, tree.y, tree.size)
        };
        let box_width = size;
        let box_length = ((size as f64) / 2.0).max(4.0) as u32;
        let dx = hscan_fisher(&self.integral, x, y, box_length, box_width);
        let dy = vscan_fisher(&self.integral, x, y, box_length, box_width);
        let mag = (dx * dx + dy * dy).sqrt();
        let mut ang = dx.atan2(dy);
        if ang < 0.0 {
            ang += 2.0 * std::f64::consts::PI;
        }
        let token = self.token;
        let entry = self
            .tree_mut(id)
            .annotation
            .ensure_has(AnnotationKind::EdgeResponse);
        if entry.token != token {
            entry.token = token;
            if let Some(response) = entry.value.as_edge_response_mut() {
                *response = EdgeResponse::default();
            }
        }
        if let Some(response) = entry.value.as_edge_response_mut() {
            response.dx = dx;
            response.dy = dy;
            response.mag = mag;
            response.ang = ang;
        }
        Ok((dx, dy))
    }

    /// Edge responses of the four child quadrants in NW, NE, SW, SE order
    pub fn child_edge_response(&self, id: TreeId) -> ForestResult<([f64; 4], [f64; 4])> {
        let tree = self.tree(id);
        if tree.size < 2 {
            return Err(ForestError::InvalidParameters(
                "unit trees have no child responses".to_string(),
            ));
        }
        let half = tree.size / 2;
        let box_length = ((half as f64) / 2.0).max(4.0) as u32;
        let coords = [
            (tree.x, tree.y),
            (tree.x + half, tree.y),
            (tree.x, tree.y + half),
            (tree.x + half, tree.y + half),
        ];
        let mut dx = [0.0; 4];
        let mut dy = [0.0; 4];
        for (i, (cx, cy)) in coords.into_iter().enumerate() {
            dx[i] = hscan_fisher(&self.integral, cx, cy, box_length, half);
            dy[i] = vscan_fisher(&self.integral, cx, cy, box_length, half);
        }
        Ok((dx, dy))
    }

    /// The current-round edge response values of a node, or zeros
    pub fn edge_values(&self, id: TreeId) -> EdgeResponse {
        self.tree(id)
            .annotation
            .current(AnnotationKind::EdgeResponse, self.token)
            .and_then(|value| value.as_edge_response())
            .copied()
            .unwrap_or_default()
    }

    /// Collect the direct same-or-finer neighbors of a node
    ///
    /// Child-bearing neighbors are descended into the quadrants adjacent
    /// to the node, so the result holds only leaves.
    pub fn neighbors_of(&self, id: TreeId) -> Vec<TreeId> {
        let mut neighbors = Vec::new();
        let tree = self.tree(id);
        let links = [
            (tree.n, Direction::N),
            (tree.e, Direction::E),
            (tree.s, Direction::S),
            (tree.w, Direction::W),
        ];
        for (link, direction) in links {
            if let Some(neighbor) = link {
                self.add_neighbors(&mut neighbors, neighbor, direction);
            }
        }
        neighbors
    }

    fn add_neighbors(&self, out: &mut Vec<TreeId>, id: TreeId, direction: Direction) {
        let tree = self.tree(id);
        let (Some(nw), Some(ne), Some(sw), Some(se)) = (tree.nw, tree.ne, tree.sw, tree.se)
        else {
            out.push(id);
            return;
        };
        // descend into the children facing the original node
        match direction {
            Direction::N => {
                self.add_neighbors(out, sw, direction);
                self.add_neighbors(out, se, direction);
            }
            Direction::E => {
                self.add_neighbors(out, nw, direction);
                self.add_neighbors(out, sw, direction);
            }
            Direction::S => {
                self.add_neighbors(out, nw, direction);
                self.add_neighbors(out, ne, direction);
            }
            Direction::W => {
                self.add_neighbors(out, ne, direction);
                self.add_neighbors(out, se, direction);
            }
            _ => {}
        }
    }
}

/// Convert the original image into the internal grey source
fn refresh_source(original: &PixelImage, grey: &mut PixelImage) -> ForestResult<()> {
    match original.format() {
        PixelFormat::Grey => grey.copy_from(original).map_err(ForestError::Core),
        PixelFormat::Yuv => pick_channel(original, grey, 0).map_err(ForestError::Core),
        PixelFormat::Rgb => rgb24_to_grey8(original, grey).map_err(ForestError::Core),
        other => Err(ForestError::UnsupportedFormat(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_image(width: u32, height: u32, value: u8) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, width, height).unwrap();
        for y in 0..height {
            image.row_mut::<u8>(y).unwrap().fill(value);
        }
        image
    }

    fn quadrant_image(size: u32, values: [u8; 4]) -> PixelImage {
        let mut image =
            PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, size, size).unwrap();
        let half = size / 2;
        for y in 0..size {
            for x in 0..size {
                let quadrant = match (x < half, y < half) {
                    (true, true) => 0,
                    (false, true) => 1,
                    (true, false) => 2,
                    (false, false) => 3,
                };
                image.set_sample(x, y, 0, values[quadrant] as f64).unwrap();
            }
        }
        image
    }

    #[test]
    fn test_create_grid() {
        let image = grey_image(32, 32, 50);
        let forest = QuadForest::new(&image, 16, 4).unwrap();
        assert_eq!(forest.rows(), 2);
        assert_eq!(forest.cols(), 2);
        assert_eq!(forest.root_count(), 4);
        assert_eq!(forest.len(), 4);
        assert_eq!(forest.grid_dx(), 0);
        // roots carry statistics already at creation
        assert_eq!(forest.tree(TreeId(0)).stat.mean, 50.0);
    }

    #[test]
    fn test_create_centered_grid() {
        let image = grey_image(40, 36, 0);
        let forest = QuadForest::new(&image, 16, 4).unwrap();
        assert_eq!(forest.cols(), 2);
        assert_eq!(forest.rows(), 2);
        assert_eq!(forest.grid_dx(), 4);
        assert_eq!(forest.grid_dy(), 2);
        assert_eq!(forest.tree(TreeId(0)).x, 4);
        assert_eq!(forest.tree(TreeId(0)).y, 2);
    }

    #[test]
    fn test_create_validation() {
        let image = grey_image(32, 32, 0);
        assert!(QuadForest::new(&image, 12, 4).is_err());
        assert!(QuadForest::new(&image, 16, 3).is_err());
        assert!(QuadForest::new(&image, 64, 4).is_err());
        assert!(QuadForest::new(&image, 4, 16).is_err());
    }

    #[test]
    fn test_root_neighbor_wiring() {
        let image = grey_image(32, 32, 0);
        let forest = QuadForest::new(&image, 16, 4).unwrap();
        let top_left = forest.tree(TreeId(0));
        assert_eq!(top_left.n, None);
        assert_eq!(top_left.w, None);
        assert_eq!(top_left.e, Some(TreeId(1)));
        assert_eq!(top_left.s, Some(TreeId(2)));
        let bottom_right = forest.tree(TreeId(3));
        assert_eq!(bottom_right.n, Some(TreeId(1)));
        assert_eq!(bottom_right.w, Some(TreeId(2)));
        assert_eq!(bottom_right.e, None);
        assert_eq!(bottom_right.s, None);
    }

    #[test]
    fn test_divide_creates_exact_children() {
        let image = quadrant_image(32, [10, 20, 30, 40]);
        let mut forest = QuadForest::new(&image, 32, 4).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(0)).unwrap();
        assert_eq!(forest.len(), 5);
        let root = forest.tree(TreeId(0));
        let children = [
            root.nw.unwrap(),
            root.ne.unwrap(),
            root.sw.unwrap(),
            root.se.unwrap(),
        ];
        for (i, child) in children.iter().enumerate() {
            let node = forest.tree(*child);
            assert_eq!(node.size, 16);
            assert_eq!(node.level, 1);
            assert_eq!(node.parent, Some(TreeId(0)));
            assert_eq!(node.stat.mean, [10.0, 20.0, 30.0, 40.0][i]);
            assert_eq!(node.stat.deviation, 0.0);
        }
        // children tile the parent exactly
        let (nw, ne, sw, se) = (
            forest.tree(children[0]),
            forest.tree(children[1]),
            forest.tree(children[2]),
            forest.tree(children[3]),
        );
        assert_eq!((nw.x, nw.y), (0, 0));
        assert_eq!((ne.x, ne.y), (16, 0));
        assert_eq!((sw.x, sw.y), (0, 16));
        assert_eq!((se.x, se.y), (16, 16));
    }

    #[test]
    fn test_divide_merges_back_to_parent_stat() {
        let image = quadrant_image(32, [10, 20, 30, 40]);
        let mut forest = QuadForest::new(&image, 32, 4).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(0)).unwrap();
        let stats = forest.child_statistics(TreeId(0)).unwrap();
        let merged = Statistics::combine(
            &Statistics::combine(&stats[0], &stats[1]),
            &Statistics::combine(&stats[2], &stats[3]),
        );
        let parent = forest.tree(TreeId(0)).stat;
        assert!((merged.mean - parent.mean).abs() < 1e-9);
        assert!((merged.variance - parent.variance).abs() < 1e-6);
        assert_eq!(merged.n, parent.n);
    }

    #[test]
    fn test_divide_respects_min_size() {
        let image = grey_image(16, 16, 0);
        let mut forest = QuadForest::new(&image, 16, 8).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(0)).unwrap();
        assert_eq!(forest.len(), 5);
        let child = forest.tree(TreeId(0)).nw.unwrap();
        // children are at min size; further division is a no-op
        forest.divide(child).unwrap();
        assert_eq!(forest.len(), 5);
        assert!(forest.tree(child).is_leaf());
    }

    #[test]
    fn test_sibling_neighbor_links() {
        let image = grey_image(32, 32, 0);
        let mut forest = QuadForest::new(&image, 32, 4).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(0)).unwrap();
        let root = forest.tree(TreeId(0));
        let (nw, ne, sw, se) = (
            root.nw.unwrap(),
            root.ne.unwrap(),
            root.sw.unwrap(),
            root.se.unwrap(),
        );
        assert_eq!(forest.tree(nw).e, Some(ne));
        assert_eq!(forest.tree(nw).s, Some(sw));
        assert_eq!(forest.tree(nw).n, None);
        assert_eq!(forest.tree(se).n, Some(ne));
        assert_eq!(forest.tree(se).w, Some(sw));
        assert_eq!(forest.tree(ne).w, Some(nw));
        assert_eq!(forest.tree(sw).n, Some(nw));
    }

    #[test]
    fn test_cross_tree_neighbor_links() {
        let image = grey_image(32, 32, 0);
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        // divide the top-left root only; its children's east neighbors
        // fall back to the coarser root 1
        forest.divide(TreeId(0)).unwrap();
        let ne = forest.tree(TreeId(0)).ne.unwrap();
        let se = forest.tree(TreeId(0)).se.unwrap();
        assert_eq!(forest.tree(ne).e, Some(TreeId(1)));
        assert_eq!(forest.tree(se).e, Some(TreeId(1)));
        // after dividing root 1, its new west children back-link to the
        // finer peers
        forest.divide(TreeId(1)).unwrap();
        let peer_nw = forest.tree(TreeId(1)).nw.unwrap();
        let peer_sw = forest.tree(TreeId(1)).sw.unwrap();
        assert_eq!(forest.tree(peer_nw).w, Some(ne));
        assert_eq!(forest.tree(ne).e, Some(peer_nw));
        assert_eq!(forest.tree(peer_sw).w, Some(se));
        assert_eq!(forest.tree(se).e, Some(peer_sw));
    }

    #[test]
    fn test_update_discards_children() {
        let image = grey_image(32, 32, 0);
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        let token_before = forest.token();
        forest.divide(TreeId(0)).unwrap();
        forest.divide(TreeId(3)).unwrap();
        assert_eq!(forest.len(), 12);
        forest.update().unwrap();
        assert_eq!(forest.len(), 4);
        assert!(forest.tree(TreeId(0)).is_leaf());
        assert_eq!(forest.token(), token_before + 1);
    }

    #[test]
    fn test_reload_changes_grid() {
        let image = grey_image(32, 32, 0);
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(0)).unwrap();
        forest.reload(8, 4).unwrap();
        assert_eq!(forest.root_count(), 16);
        assert_eq!(forest.len(), 16);
        // same sizes are a no-op
        forest.reload(8, 4).unwrap();
        assert_eq!(forest.len(), 16);
    }

    #[test]
    fn test_neighborhood_statistics() {
        let image = grey_image(32, 32, 70);
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        // interior tree with multiplier 0.5: 32x32 window clipped to image
        let stat = forest.neighborhood_statistics(TreeId(3), 0.5).unwrap();
        assert_eq!(stat.mean, 70.0);
        // window (8, 8) of side 32 clips to 24x24 inside the 32x32 image
        assert_eq!(stat.n, 24.0 * 24.0);
        assert!(forest.neighborhood_statistics(TreeId(0), 0.0).is_err());
    }

    #[test]
    fn test_divide_with_overlap() {
        // strongly contrasting quadrants divide
        let contrasty = quadrant_image(32, [0, 250, 0, 250]);
        let mut forest = QuadForest::new(&contrasty, 32, 4).unwrap();
        forest.update().unwrap();
        forest.divide_with_overlap(TreeId(0), 2.0, 0.5).unwrap();
        assert!(!forest.tree(TreeId(0)).is_leaf());

        // uniform content becomes a segment leaf instead
        let flat = grey_image(32, 32, 128);
        let mut forest = QuadForest::new(&flat, 32, 4).unwrap();
        forest.update().unwrap();
        forest.divide_with_overlap(TreeId(0), 2.0, 0.5).unwrap();
        assert!(forest.tree(TreeId(0)).is_leaf());
        assert!(crate::unionfind::has_segment(&forest, TreeId(0)));
    }

    #[test]
    fn test_edge_response_on_step_edge() {
        let mut image = grey_image(64, 64, 20);
        for y in 0..64 {
            for x in 32..64 {
                image.set_sample(x, y, 0, 220.0).unwrap();
            }
        }
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        // root row 1, col 1 spans x in [16, 32): its scan crosses the edge
        let edge_root = TreeId(5);
        forest.edge_response(edge_root).unwrap();
        let response = forest.edge_values(edge_root);
        assert!(response.dx.abs() > 1.0);
        assert!(response.dy.abs() < 1e-9);
        assert!(response.mag >= response.dx.abs());

        // far corner sees no edge
        let flat_root = TreeId(0);
        forest.edge_response(flat_root).unwrap();
        let response = forest.edge_values(flat_root);
        assert!(response.mag.abs() < 1e-9);
    }

    #[test]
    fn test_neighbors_of_descends() {
        let image = grey_image(32, 32, 0);
        let mut forest = QuadForest::new(&image, 16, 4).unwrap();
        forest.update().unwrap();
        forest.divide(TreeId(1)).unwrap();
        // root 0's east neighbor has children; enumeration descends into
        // the two west children
        let neighbors = forest.neighbors_of(TreeId(0));
        let east_nw = forest.tree(TreeId(1)).nw.unwrap();
        let east_sw = forest.tree(TreeId(1)).sw.unwrap();
        assert!(neighbors.contains(&east_nw));
        assert!(neighbors.contains(&east_sw));
        assert!(!neighbors.contains(&TreeId(1)));
        // the undivided south neighbor is returned as-is
        assert!(neighbors.contains(&TreeId(2)));
    }
}
