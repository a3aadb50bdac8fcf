//! CART regression tree.
//!
//! Nodes are stored flat in pre-order. A node with `feature == -1` is a leaf.
//! Traversal sends a row left when its value is `<= threshold` or NaN.
//!
//! Split gain uses the L2-regularized form
//! `GL²/(nL+λ) + GR²/(nR+λ) − G²/(n+λ)` where `G` is the target sum; with
//! `λ = 0` this is plain variance reduction. Leaf values are `G/(n+λ)`.

use serde::{Deserialize, Serialize};

/// Minimum gain for a split to be kept.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Growth limits for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf values.
    pub l2: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            l2: 0.0,
        }
    }
}

/// A single node of a fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes).
    pub feature: i32,
    pub threshold: f64,
    /// Index of left child (-1 for leaf nodes).
    pub left: i32,
    /// Index of right child (-1 for leaf nodes).
    pub right: i32,
    /// Prediction at this node. Internal nodes keep theirs for inspection.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct Split {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl RegressionTree {
    /// Grow a tree on the rows at `indices` (repeats allowed, as in a
    /// bootstrap sample). `indices` must be non-empty.
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, indices.to_vec(), 0, params);
        tree
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.feature == -1).count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            let node = &nodes[idx];
            if node.feature == -1 {
                return 0;
            }
            1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };
            if node.feature == -1 {
                return node.value;
            }
            let v = row.get(node.feature as usize).copied().unwrap_or(f64::NAN);
            idx = if v.is_nan() || v <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let g: f64 = indices.iter().map(|&i| y[i]).sum();
        let n = indices.len();
        let value = g / (n as f64 + params.l2);

        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            value,
        });

        let depth_left = params.max_depth.map_or(true, |d| depth < d);
        if !depth_left || n < params.min_samples_split.max(2) {
            return id;
        }
        let Some(split) = best_split(x, y, &indices, g, params) else {
            return id;
        };

        let left = self.grow(x, y, split.left, depth + 1, params);
        let right = self.grow(x, y, split.right, depth + 1, params);
        let node = &mut self.nodes[id];
        node.feature = split.feature as i32;
        node.threshold = split.threshold;
        node.left = left as i32;
        node.right = right as i32;
        id
    }
}

fn score(g: f64, n: usize, l2: f64) -> f64 {
    g * g / (n as f64 + l2)
}

/// Best split over all features. Ties keep the first candidate found, in
/// feature order then threshold order.
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    g_total: f64,
    params: &TreeParams,
) -> Option<Split> {
    let n = indices.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let n_features = x.get(indices[0]).map_or(0, Vec::len);
    let parent = score(g_total, n, params.l2);

    let mut best: Option<(f64, usize, usize, Vec<usize>)> = None;

    for feature in 0..n_features {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut g_left = 0.0;
        for k in 1..n {
            g_left += y[order[k - 1]];
            let (lo, hi) = (x[order[k - 1]][feature], x[order[k]][feature]);
            if k < min_leaf || n - k < min_leaf || lo >= hi {
                continue;
            }
            let gain = score(g_left, k, params.l2) + score(g_total - g_left, n - k, params.l2)
                - parent;
            if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |(b, ..)| gain > *b) {
                best = Some((gain, feature, k, order.clone()));
            }
        }
    }

    best.map(|(_, feature, k, order)| {
        let (lo, hi) = (x[order[k - 1]][feature], x[order[k]][feature]);
        let mid = lo + (hi - lo) / 2.0;
        let threshold = if mid < hi { mid } else { lo };
        Split {
            feature,
            threshold,
            left: order[..k].to_vec(),
            right: order[k..].to_vec(),
        }
    })
}
