use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{validate_training_data, ModelError, Regressor};

/// Configuration for the bagged tree ensemble
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    /// Number of bootstrap trees
    pub n_estimators: usize,
    /// Seed for bootstrap sampling; fixed so predictions are reproducible
    pub seed: u64,
    /// Maximum tree depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum rows a node needs before it may split
    pub min_samples_split: usize,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

/// CART regression tree splitting on squared-error reduction.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    width: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl TreeBuilder<'_> {
    fn grow(&self, indices: &mut [usize], depth: usize) -> Node {
        let value = mean_of(self.targets, indices);
        let depth_exhausted = self.max_depth.map_or(false, |max| depth >= max);
        if indices.len() < self.min_samples_split || depth_exhausted || self.is_pure(indices) {
            return Node::Leaf(value);
        }

        let Some((feature, threshold)) = self.best_split(indices) else {
            return Node::Leaf(value);
        };

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[i][feature] <= threshold);
        Node::Split {
            feature,
            threshold,
            left: Box::new(self.grow(&mut left, depth + 1)),
            right: Box::new(self.grow(&mut right, depth + 1)),
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&i| self.targets[i] == first)
    }

    /// Lowest total squared error over all features and midpoints between
    /// distinct consecutive values. Ties keep the earliest candidate.
    fn best_split(&self, indices: &mut [usize]) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..self.width {
            indices.sort_by(|&a, &b| {
                self.features[a][feature].total_cmp(&self.features[b][feature])
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = self.targets[indices[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = self.features[indices[pos]][feature];
                let next = self.features[indices[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = (pos + 1) as f64;
                let right_n = (n - pos - 1) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);

                if best.map_or(true, |(_, _, best_sse)| sse < best_sse) {
                    best = Some((feature, (here + next) / 2.0, sse));
                }
            }
        }

        best.filter(|(_, _, sse)| *sse < parent_sse)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

impl RegressionTree {
    fn grow(
        features: &[Vec<f64>],
        targets: &[f64],
        width: usize,
        indices: &mut [usize],
        config: &RandomForestConfig,
    ) -> Self {
        let builder = TreeBuilder {
            features,
            targets,
            width,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
        };
        Self {
            root: builder.grow(indices, 0),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.root.predict(row)
    }
}

/// Bootstrap-aggregated regression trees.
#[derive(Debug, Clone, Default)]
pub struct RandomForestRegressor {
    config: RandomForestConfig,
    trees: Vec<RegressionTree>,
    width: usize,
}

impl RandomForestRegressor {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            width: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
        let width = validate_training_data(features, targets)?;
        let n = targets.len();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let trees: Vec<RegressionTree> = (0..self.config.n_estimators.max(1))
            .map(|_| {
                let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::grow(features, targets, width, &mut sample, &self.config)
            })
            .collect();

        self.trees = trees;
        self.width = width;
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.width {
            return Err(ModelError::DimensionMismatch {
                expected: self.width,
                found: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        Ok(total / self.trees.len() as f64)
    }
}
