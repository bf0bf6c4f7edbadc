//! Forest adapter: multi-output random-forest regressor.
//!
//! One forest of CART regression trees is fitted per output vital, each on
//! its own bootstrap samples, so every output dimension is modelled
//! independently from the same 5 input features. Inputs are used as-is
//! (no scaling).
//!
//! # Determinism
//!
//! All randomness (bootstrap draws, feature subsets) comes from a
//! `ChaCha8Rng` seeded from [`ForestConfig::seed`] and the output index.
//! Training the same pairs with the same config yields the same model, and
//! prediction is a pure function of the model and the input.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{TrainingPair, VitalField, Vitals, FEATURE_COUNT};
use crate::ports::{ForecastError, Forecaster};
use crate::VitalcastError;

/// Hyperparameters for the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Trees per output forest.
    pub n_trees: usize,
    /// Maximum tree depth (`None` = grow until pure).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    /// Features considered per split (`None` = all).
    pub max_features: Option<usize>,
    /// Draw bootstrap samples (otherwise every tree sees every pair).
    pub bootstrap: bool,
    /// Seed for all training randomness.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Check that the hyperparameters are usable.
    ///
    /// # Errors
    /// Returns `Validation` describing the first bad value.
    pub fn validate(&self) -> Result<(), VitalcastError> {
        if self.n_trees == 0 {
            return Err(VitalcastError::Validation("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(VitalcastError::Validation(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(VitalcastError::Validation(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if let Some(k) = self.max_features {
            if k == 0 || k > FEATURE_COUNT {
                return Err(VitalcastError::Validation(format!(
                    "max_features must be in 1..={FEATURE_COUNT}, got {k}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: u32,
        right: u32,
    },
}

/// A single CART regression tree stored as a node arena (root at 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Walk from the root. `None` if the arena is malformed.
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> Option<f64> {
        let mut idx = 0usize;
        // A well-formed tree never revisits a node.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx)? {
                Node::Leaf { value } => return Some(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = *x.get(*feature)?;
                    idx = if v <= *threshold { *left } else { *right } as usize;
                }
            }
        }
        None
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, budget: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) if budget > 0 => {
                    1 + walk(nodes, *left as usize, budget - 1)
                        .max(walk(nodes, *right as usize, budget - 1))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0, self.nodes.len())
    }
}

/// Mean that is exact when every value is identical.
fn incremental_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut mean = 0.0;
    let mut n = 0usize;
    for v in values {
        n += 1;
        mean += (v - mean) / n as f64;
    }
    (n > 0).then_some(mean)
}

struct TreeBuilder<'a> {
    x: &'a [[f64; FEATURE_COUNT]],
    y: &'a [f64],
    config: &'a ForestConfig,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<'a> TreeBuilder<'a> {
    fn new(x: &'a [[f64; FEATURE_COUNT]], y: &'a [f64], config: &'a ForestConfig) -> Self {
        Self {
            x,
            y,
            config,
            nodes: Vec::new(),
        }
    }

    fn finish(self) -> RegressionTree {
        RegressionTree { nodes: self.nodes }
    }

    fn leaf(&mut self, samples: &[usize]) -> u32 {
        let value = incremental_mean(samples.iter().map(|&i| self.y[i])).unwrap_or(0.0);
        self.nodes.push(Node::Leaf { value });
        (self.nodes.len() - 1) as u32
    }

    fn build(&mut self, samples: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> u32 {
        let n = samples.len();
        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        let first = samples.first().map(|&i| self.y[i]);
        let constant = samples.iter().all(|&i| Some(self.y[i]) == first);

        if depth_reached
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || constant
        {
            return self.leaf(samples);
        }

        let features = self.candidate_features(rng);
        let Some(best) = self.best_split(samples, &features) else {
            return self.leaf(samples);
        };

        samples.sort_by(|&a, &b| self.x[a][best.feature].total_cmp(&self.x[b][best.feature]));
        let split_at = samples.partition_point(|&i| self.x[i][best.feature] <= best.threshold);

        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });

        let (left_samples, right_samples) = samples.split_at_mut(split_at);
        let left = self.build(left_samples, depth + 1, rng);
        let right = self.build(right_samples, depth + 1, rng);

        self.nodes[node_idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx as u32
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.config.max_features {
            Some(k) if k < FEATURE_COUNT => {
                let mut picked = rand::seq::index::sample(rng, FEATURE_COUNT, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..FEATURE_COUNT).collect(),
        }
    }

    /// Split maximising the reduction in sum of squared errors.
    fn best_split(&self, samples: &[usize], features: &[usize]) -> Option<BestSplit> {
        let n = samples.len();
        let min_leaf = self.config.min_samples_leaf;
        let total: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = samples.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = total_sq - total * total / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order = samples.to_vec();

        for &feature in features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 1..n {
                let prev = order[pos - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                if pos < min_leaf || n - pos < min_leaf {
                    continue;
                }
                let lo = self.x[prev][feature];
                let hi = self.x[order[pos]][feature];
                if lo >= hi {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / pos as f64;
                let right_sse = right_sq - right_sum * right_sum / (n - pos) as f64;
                let gain = parent_sse - (left_sse + right_sse);

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best.filter(|b| b.gain > f64::EPSILON * parent_sse.abs().max(1.0))
    }
}

/// Bagged trees for one output dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionForest {
    trees: Vec<RegressionTree>,
}

impl RegressionForest {
    fn fit(
        x: &[[f64; FEATURE_COUNT]],
        y: &[f64],
        config: &ForestConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n = x.len();
        let trees = (0..config.n_trees)
            .map(|_| {
                let mut samples: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut builder = TreeBuilder::new(x, y, config);
                builder.build(&mut samples, 0, rng);
                builder.finish()
            })
            .collect();
        Self { trees }
    }

    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> Option<f64> {
        let outputs: Option<Vec<f64>> = self.trees.iter().map(|t| t.predict(x)).collect();
        incremental_mean(outputs?)
    }
}

/// Trained next-vitals forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    config: ForestConfig,
    forests: Vec<RegressionForest>,
    training_pairs: usize,
    trained_at: DateTime<Utc>,
}

impl ForecastModel {
    /// Fit one forest per output vital.
    ///
    /// # Errors
    /// Returns `InsufficientData` for an empty pair set, or `Validation` for a
    /// bad config or non-finite training values.
    pub fn train(pairs: &[TrainingPair], config: &ForestConfig) -> Result<Self, VitalcastError> {
        config.validate()?;
        if pairs.is_empty() {
            return Err(VitalcastError::InsufficientData(
                "no training pairs".to_string(),
            ));
        }
        if let Some(i) = pairs
            .iter()
            .position(|p| !p.features.is_finite() || !p.target.is_finite())
        {
            return Err(VitalcastError::Validation(format!(
                "training pair {i} contains a non-finite value"
            )));
        }

        tracing::info!(
            "Training forecaster on {} pairs ({} trees per output, seed={})",
            pairs.len(),
            config.n_trees,
            config.seed
        );

        let x: Vec<[f64; FEATURE_COUNT]> = pairs.iter().map(|p| p.features.to_array()).collect();
        let forests = VitalField::ALL
            .into_iter()
            .map(|field| {
                let y: Vec<f64> = pairs.iter().map(|p| p.target.get(field)).collect();
                let seed = config.seed.wrapping_add(field.index() as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let forest = RegressionForest::fit(&x, &y, config, &mut rng);
                tracing::debug!(
                    "Fitted {} forest: max depth {}",
                    field.name(),
                    forest.trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
                );
                forest
            })
            .collect();

        Ok(Self {
            config: config.clone(),
            forests,
            training_pairs: pairs.len(),
            trained_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    #[must_use]
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Total node count across all trees (size indicator).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.forests
            .iter()
            .flat_map(|f| f.trees.iter())
            .map(|t| t.nodes.len())
            .sum()
    }
}

impl Forecaster for ForecastModel {
    fn predict(&self, features: &Vitals) -> Result<Vitals, ForecastError> {
        for field in VitalField::ALL {
            if !features.get(field).is_finite() {
                return Err(ForecastError::NonFinite(field.name()));
            }
        }
        if self.forests.len() != FEATURE_COUNT {
            return Err(ForecastError::DimensionMismatch {
                expected: FEATURE_COUNT,
                got: self.forests.len(),
            });
        }

        let x = features.to_array();
        let mut out = [0.0; FEATURE_COUNT];
        for field in VitalField::ALL {
            let value = self.forests[field.index()].predict(&x).ok_or_else(|| {
                ForecastError::EmptyModel(format!("no usable trees for {}", field.name()))
            })?;
            if !value.is_finite() {
                return Err(ForecastError::NonFiniteOutput(field.name()));
            }
            out[field.index()] = value;
        }
        Ok(Vitals::from_array(out))
    }

    fn training_pairs(&self) -> usize {
        self.training_pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(hr: f64, sys: f64, dia: f64, spo2: f64, temp: f64) -> Vitals {
        Vitals {
            heart_rate: hr,
            bp_systolic: sys,
            bp_diastolic: dia,
            oxygen_saturation: spo2,
            temperature: temp,
        }
    }

    fn ramp(n: usize) -> Vec<TrainingPair> {
        (0..n)
            .map(|i| {
                let hr = 60.0 + i as f64;
                TrainingPair {
                    features: vitals(hr, 120.0, 80.0, 98.0, 36.5),
                    target: vitals(hr + 1.0, 120.0, 80.0, 98.0, 36.5),
                }
            })
            .collect()
    }

    #[test]
    fn test_single_pair_is_memorized_exactly() {
        let pair = TrainingPair {
            features: vitals(70.0, 120.0, 80.0, 98.0, 36.5),
            target: vitals(72.0, 122.0, 81.0, 97.0, 36.7),
        };
        let model = ForecastModel::train(&[pair], &ForestConfig::default()).expect("train");

        let predicted = model.predict(&pair.features).expect("predict");
        assert_eq!(predicted, pair.target);
        assert_eq!(model.training_pairs(), 1);
    }

    #[test]
    fn test_training_is_reproducible_for_a_seed() {
        let pairs = ramp(40);
        let config = ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        };
        let a = ForecastModel::train(&pairs, &config).expect("train");
        let b = ForecastModel::train(&pairs, &config).expect("train");

        assert_eq!(a.forests, b.forests);
        let probe = vitals(75.5, 120.0, 80.0, 98.0, 36.5);
        assert_eq!(
            a.predict(&probe).expect("predict"),
            b.predict(&probe).expect("predict")
        );
    }

    #[test]
    fn test_learns_one_step_ramp() {
        let model = ForecastModel::train(&ramp(40), &ForestConfig::default()).expect("train");
        let predicted = model
            .predict(&vitals(80.0, 120.0, 80.0, 98.0, 36.5))
            .expect("predict");

        assert!((predicted.heart_rate - 81.0).abs() < 2.0, "got {}", predicted.heart_rate);
        // Constant targets stay exact.
        assert!((predicted.bp_systolic - 120.0).abs() < f64::EPSILON);
        assert!((predicted.temperature - 36.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_depth_limit_and_feature_subsets() {
        let config = ForestConfig {
            n_trees: 5,
            max_depth: Some(2),
            max_features: Some(2),
            ..ForestConfig::default()
        };
        let model = ForecastModel::train(&ramp(30), &config).expect("train");
        for forest in &model.forests {
            for tree in &forest.trees {
                assert!(tree.depth() <= 2);
            }
        }
        assert!(model.predict(&vitals(70.0, 120.0, 80.0, 98.0, 36.5)).is_ok());
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let model = ForecastModel::train(&ramp(5), &ForestConfig::default()).expect("train");
        let err = model
            .predict(&vitals(70.0, 120.0, 80.0, f64::NAN, 36.5))
            .expect_err("must fail");
        assert_eq!(err, ForecastError::NonFinite("oxygen_saturation"));
    }

    #[test]
    fn test_structurally_broken_model_fails_cleanly() {
        let mut model = ForecastModel::train(&ramp(5), &ForestConfig::default()).expect("train");
        model.forests.pop();
        assert!(matches!(
            model.predict(&vitals(70.0, 120.0, 80.0, 98.0, 36.5)),
            Err(ForecastError::DimensionMismatch { expected: 5, got: 4 })
        ));
    }

    #[test]
    fn test_invalid_config_and_empty_pairs() {
        let bad = ForestConfig {
            n_trees: 0,
            ..ForestConfig::default()
        };
        assert!(matches!(
            ForecastModel::train(&ramp(3), &bad),
            Err(VitalcastError::Validation(_))
        ));
        assert!(matches!(
            ForecastModel::train(&[], &ForestConfig::default()),
            Err(VitalcastError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_incremental_mean_is_exact_for_repeats() {
        let value = 36.7;
        assert_eq!(incremental_mean(std::iter::repeat(value).take(100)), Some(value));
        assert_eq!(incremental_mean(std::iter::empty()), None);
    }
}
