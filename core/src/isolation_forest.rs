//! Isolation forest over a single numeric column.
//!
//! Each tree is grown on a random subsample by splitting at a uniform
//! point between the current min and max until the point is isolated or
//! the height limit ceil(log2(sample_size)) is reached. Points that are
//! isolated in few splits score close to 1.
//!
//! Rows scoring above the (1 - contamination) quantile of the scores are
//! flagged, which caps the flag count at round-up(contamination × n).
//!
//! All randomness comes from the detector stream of the RngBank, rebuilt
//! on every call, so the same seed and input always give the same flags.

use crate::{
    anomaly::AnomalyDetector,
    config::DetectorConfig,
    error::{MarketError, MarketResult},
    rng::{RngBank, StreamRng, StreamSlot},
    stats::quantile,
};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

pub struct IsolationForestDetector {
    pub contamination: f64,
    pub n_trees: usize,
    pub sample_size: usize,
    seed: u64,
}

enum Node {
    Leaf { size: usize },
    Split { value: f64, left: Box<Node>, right: Box<Node> },
}

impl IsolationForestDetector {
    pub fn new(config: &DetectorConfig, seed: u64) -> Self {
        Self {
            contamination: config.contamination,
            n_trees:       config.n_trees,
            sample_size:   config.sample_size,
            seed,
        }
    }

    fn fail(&self, reason: String) -> MarketError {
        MarketError::DetectorFailure { detector: "isolation_forest", reason }
    }

    fn check(&self, values: &[f64]) -> MarketResult<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(self.fail(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_trees == 0 {
            return Err(self.fail("n_trees must be positive".into()));
        }
        if self.sample_size < 2 {
            return Err(self.fail(format!("sample_size must be at least 2, got {}", self.sample_size)));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(self.fail(format!("non-finite price at row {pos}")));
        }
        Ok(())
    }

    /// Anomaly score in (0, 1] per value. Higher is more isolated.
    pub fn scores(&self, values: &[f64]) -> MarketResult<Vec<f64>> {
        self.check(values)?;
        if values.len() < 2 {
            return Ok(vec![0.0; values.len()]);
        }

        let mut rng = RngBank::new(self.seed).for_stream(StreamSlot::Detector);
        let psi = self.sample_size.min(values.len());
        let height_limit = (psi as f64).log2().ceil() as usize;

        let trees: Vec<Node> = (0..self.n_trees)
            .map(|_| {
                let sample = subsample(values, psi, &mut rng);
                grow(sample, 0, height_limit, &mut rng)
            })
            .collect();

        let norm = average_path_length(psi);
        Ok(values
            .iter()
            .map(|x| {
                let total: f64 = trees.iter().map(|t| path_length(*x, t, 0)).sum();
                let mean_path = total / trees.len() as f64;
                2f64.powf(-mean_path / norm)
            })
            .collect())
    }
}

impl AnomalyDetector for IsolationForestDetector {
    fn name(&self) -> &'static str { "isolation_forest" }

    fn flag(&self, prices: &[f64]) -> MarketResult<Vec<bool>> {
        let scores = self.scores(prices)?;

        // Outliers score strictly above the (1 - contamination) quantile,
        // so a column of identical scores has none.
        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        let Some(cutoff) = quantile(&sorted, 1.0 - self.contamination) else {
            return Ok(Vec::new());
        };

        Ok(scores.iter().map(|s| *s > cutoff).collect())
    }
}

/// Draw `n` values without replacement (partial Fisher-Yates).
fn subsample(values: &[f64], n: usize, rng: &mut StreamRng) -> Vec<f64> {
    let mut pool = values.to_vec();
    for i in 0..n {
        let j = i + rng.next_u64_below((pool.len() - i) as u64) as usize;
        pool.swap(i, j);
    }
    pool.truncate(n);
    pool
}

fn grow(values: Vec<f64>, depth: usize, limit: usize, rng: &mut StreamRng) -> Node {
    if depth >= limit || values.len() <= 1 {
        return Node::Leaf { size: values.len() };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min >= max {
        return Node::Leaf { size: values.len() };
    }

    let value = rng.uniform(min, max);
    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|v| *v < value);

    Node::Split {
        value,
        left:  Box::new(grow(left, depth + 1, limit, rng)),
        right: Box::new(grow(right, depth + 1, limit, rng)),
    }
}

fn path_length(x: f64, node: &Node, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split { value, left, right } => {
            if x < *value {
                path_length(x, left, depth + 1)
            } else {
                path_length(x, right, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
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
