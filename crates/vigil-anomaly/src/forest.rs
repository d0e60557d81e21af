//! # Isolation Forest
//!
//! A multivariate outlier model: an ensemble of randomly built binary
//! trees where anomalous points isolate in fewer splits than typical
//! points. The decision value follows the familiar convention — negative
//! for outliers, positive for inliers — with the zero line placed at the
//! contamination quantile of the training scores, so a contamination of
//! 0.10 marks roughly 10% of the training data as outliers.
//!
//! Training is seeded and therefore fully deterministic for a given batch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Euler–Mascheroni constant, used in the average-path-length correction.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One node of an isolation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Axis-aligned random split.
    Internal {
        feature: usize,
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Unsplit region holding `size` training points.
    Leaf { size: usize },
}

impl Node {
    fn path_length(&self, point: &[f64], depth: f64) -> f64 {
        match self {
            Node::Leaf { size } => depth + average_path_length(*size),
            Node::Internal {
                feature,
                split,
                left,
                right,
            } => {
                if point[*feature] < *split {
                    left.path_length(point, depth + 1.0)
                } else {
                    right.path_length(point, depth + 1.0)
                }
            }
        }
    }
}

/// Trained isolation forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    subsample_size: usize,
    /// Decision offset at the contamination quantile of training scores.
    offset: f64,
}

impl IsolationForest {
    /// Fit a forest on standardized training data.
    ///
    /// `max_samples` caps the per-tree subsample (the conventional 256);
    /// `contamination` places the decision boundary so that roughly that
    /// fraction of the training data scores as an outlier; `seed` makes
    /// training reproducible.
    pub fn fit(
        data: &[Vec<f64>],
        n_trees: usize,
        max_samples: usize,
        contamination: f64,
        seed: u64,
    ) -> Self {
        let n = data.len();
        let psi = max_samples.min(n).max(2);
        let height_limit = (psi as f64).log2().ceil();
        let mut rng = StdRng::seed_from_u64(seed);

        let trees: Vec<Node> = (0..n_trees)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, psi).into_vec();
                let rows: Vec<&Vec<f64>> = sample.iter().map(|&i| &data[i]).collect();
                build_tree(&rows, 0.0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample_size: psi,
            offset: 0.0,
        };
        let mut training_scores: Vec<f64> =
            data.iter().map(|row| forest.raw_score(row)).collect();
        training_scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = quantile(&training_scores, contamination);
        forest
    }

    /// Raw sample score in (-1, 0): more negative is more anomalous.
    fn raw_score(&self, point: &[f64]) -> f64 {
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point, 0.0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let normalizer = average_path_length(self.subsample_size);
        -(2.0_f64.powf(-avg_path / normalizer))
    }

    /// Decision value for one point: negative for outliers, positive for
    /// inliers, zero on the contamination boundary.
    pub fn decision(&self, point: &[f64]) -> f64 {
        self.raw_score(point) - self.offset
    }

    /// Decision values for a batch.
    pub fn decisions(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|row| self.decision(row)).collect()
    }

    /// Number of trees in the ensemble.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the forest holds no trees.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

fn build_tree(rows: &[&Vec<f64>], depth: f64, height_limit: f64, rng: &mut StdRng) -> Node {
    if rows.len() <= 1 || depth >= height_limit {
        return Node::Leaf { size: rows.len() };
    }

    let width = rows[0].len();
    // Only features with spread are splittable.
    let splittable: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|f| {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in rows {
                min = min.min(row[f]);
                max = max.max(row[f]);
            }
            (max > min).then_some((f, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf { size: rows.len() };
    }
    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];

    let split = rng.gen_range(min..max);
    let (left_rows, right_rows): (Vec<&Vec<f64>>, Vec<&Vec<f64>>) =
        rows.iter().copied().partition(|row| row[feature] < split);

    Node::Internal {
        feature,
        split,
        left: Box::new(build_tree(&left_rows, depth + 1.0, height_limit, rng)),
        right: Box::new(build_tree(&right_rows, depth + 1.0, height_limit, rng)),
    }
}

/// Expected path length of an unsuccessful BST search over `n` points —
/// the standard correction term for unsplit regions.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolation quantile over an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
