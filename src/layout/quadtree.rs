//! Barnes-Hut quadtree for charge repulsion.
//!
//! Cells aggregate the charge of the nodes inside them and its
//! charge-weighted center. A node far enough from a cell (relative to the
//! cell's side length) interacts with the aggregate instead of visiting
//! every node in it.

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Debug, Clone, Copy)]
pub(super) struct QuadBounds {
    cx: f64,
    cy: f64,
    half: f64,
}

impl QuadBounds {
    fn from_points(xs: &[f64], ys: &[f64]) -> Option<Self> {
        // min/max skip NaN, so check every coordinate up front
        if !xs.iter().chain(ys).all(|v| v.is_finite()) {
            return None;
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (&x, &y) in xs.iter().zip(ys) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if !min_x.is_finite() {
            return None;
        }

        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        Some(Self {
            cx: (min_x + max_x) / 2.0,
            cy: (min_y + max_y) / 2.0,
            half: span / 2.0 + 1.0,
        })
    }

    fn contains(self, x: f64, y: f64) -> bool {
        (x - self.cx).abs() <= self.half && (y - self.cy).abs() <= self.half
    }

    fn side(self) -> f64 {
        self.half * 2.0
    }

    fn quadrant_for(self, x: f64, y: f64) -> usize {
        match (x >= self.cx, y >= self.cy) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half / 2.0;
        let (dx, dy) = match quadrant {
            0 => (-quarter, -quarter),
            1 => (quarter, -quarter),
            2 => (-quarter, quarter),
            _ => (quarter, quarter),
        };
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            half: quarter,
        }
    }
}

/// Positions and charges of every node, indexed alike.
#[derive(Clone, Copy)]
pub(super) struct Bodies<'a> {
    pub xs: &'a [f64],
    pub ys: &'a [f64],
    pub charges: &'a [f64],
}

pub(super) struct QuadNode {
    bounds: QuadBounds,
    /// Charge-weighted center.
    cx: f64,
    cy: f64,
    /// Sum of node charges in this cell.
    charge: f64,
    /// Node indices, only populated on leaves.
    indices: Vec<usize>,
    children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    /// Build a tree over all nodes. Returns None if any coordinate is not
    /// finite.
    pub(super) fn build(bodies: Bodies<'_>) -> Option<Self> {
        let bounds = QuadBounds::from_points(bodies.xs, bodies.ys)?;
        let indices = (0..bodies.xs.len()).collect();
        Some(Self::build_node(bounds, indices, bodies, 0))
    }

    fn build_node(bounds: QuadBounds, indices: Vec<usize>, bodies: Bodies<'_>, depth: usize) -> Self {
        let Bodies { xs, ys, charges } = bodies;
        let (mut sx, mut sy, mut charge) = (0.0, 0.0, 0.0);
        for &i in &indices {
            charge += charges[i];
            sx += charges[i] * xs[i];
            sy += charges[i] * ys[i];
        }
        let (cx, cy) = if charge != 0.0 {
            (sx / charge, sy / charge)
        } else {
            (bounds.cx, bounds.cy)
        };

        let mut node = Self {
            bounds,
            cx,
            cy,
            charge,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &i in &node.indices {
            buckets[bounds.quadrant_for(xs[i], ys[i])].push(i);
        }
        if buckets.iter().filter(|b| !b.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                bodies,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Accumulate the charge displacement acting on node `index` into
    /// `out`. Coincident nodes exert nothing.
    pub(super) fn accumulate(&self, bodies: Bodies<'_>, index: usize, theta2: f64, out: &mut (f64, f64)) {
        if self.charge == 0.0 {
            return;
        }
        let Bodies { xs, ys, charges } = bodies;
        let (x, y) = (xs[index], ys[index]);

        if self.is_leaf() {
            for &other in &self.indices {
                if other == index {
                    continue;
                }
                let dx = xs[other] - x;
                let dy = ys[other] - y;
                let dn = dx * dx + dy * dy;
                if dn > 0.0 {
                    let k = charges[other] / dn;
                    out.0 += dx * k;
                    out.1 += dy * k;
                }
            }
            return;
        }

        let dx = self.cx - x;
        let dy = self.cy - y;
        let dn = dx * dx + dy * dy;
        let side = self.bounds.side();
        if !self.bounds.contains(x, y) && side * side / theta2 < dn {
            let k = self.charge / dn;
            out.0 += dx * k;
            out.1 += dy * k;
            return;
        }

        for child in self.children.iter().flatten() {
            child.accumulate(bodies, index, theta2, out);
        }
    }
}
