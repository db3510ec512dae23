//! Anomaly detection over the price column.
//!
//! RULE: Every detector implements AnomalyDetector and sees only prices.
//! `flag_anomalies` is the single entry point for callers; it never
//! propagates a detector error. A failing detector yields an all-clear
//! table plus a diagnostic string.

use crate::{
    config::{DetectorConfig, DetectorStrategy},
    error::{MarketError, MarketResult},
    isolation_forest::IsolationForestDetector,
    stats::{mean, sample_std},
    table::{MarketTable, Observation},
};
use serde::{Deserialize, Serialize};

/// Scores a price column and returns one flag per price, in input order.
pub trait AnomalyDetector {
    fn name(&self) -> &'static str;

    fn flag(&self, prices: &[f64]) -> MarketResult<Vec<bool>>;
}

/// Flags `price > mean + k·stddev` over the supplied subset.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdDetector {
    pub sigmas: f64,
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self { sigmas: 2.0 }
    }
}

impl ThresholdDetector {
    pub fn threshold(&self, prices: &[f64]) -> Option<f64> {
        Some(mean(prices)? + self.sigmas * sample_std(prices)?)
    }
}

impl AnomalyDetector for ThresholdDetector {
    fn name(&self) -> &'static str { "threshold" }

    fn flag(&self, prices: &[f64]) -> MarketResult<Vec<bool>> {
        Ok(match self.threshold(prices) {
            Some(limit) => prices.iter().map(|p| *p > limit).collect(),
            None        => vec![false; prices.len()],
        })
    }
}

/// Build the detector selected by configuration.
pub fn detector_for(config: &DetectorConfig, seed: u64) -> Box<dyn AnomalyDetector> {
    match config.strategy {
        DetectorStrategy::Threshold       => Box::new(ThresholdDetector::default()),
        DetectorStrategy::IsolationForest => Box::new(IsolationForestDetector::new(config, seed)),
    }
}

// ── Flagged working copy ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedObservation {
    #[serde(flatten)]
    pub observation: Observation,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub detector: String,
    pub rows: Vec<FlaggedObservation>,
    /// Set when the detector failed and every row was left unflagged.
    pub diagnostic: Option<String>,
}

impl DetectionOutcome {
    pub fn anomaly_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_anomaly).count()
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &FlaggedObservation> {
        self.rows.iter().filter(|r| r.is_anomaly)
    }
}

/// Run `detector` on the price column of `table` and attach the flags.
pub fn flag_anomalies(detector: &dyn AnomalyDetector, table: &MarketTable) -> DetectionOutcome {
    let prices = table.prices();

    let result = detector.flag(&prices).and_then(|flags| {
        if flags.len() == prices.len() {
            Ok(flags)
        } else {
            Err(MarketError::DetectorFailure {
                detector: detector.name(),
                reason:   format!("returned {} flags for {} prices", flags.len(), prices.len()),
            })
        }
    });

    let (flags, diagnostic) = match result {
        Ok(flags) => (flags, None),
        Err(e) => {
            log::warn!("anomaly: detector '{}' failed, reporting no anomalies: {e}", detector.name());
            (vec![false; prices.len()], Some(e.to_string()))
        }
    };

    let rows = table
        .rows()
        .iter()
        .zip(flags)
        .map(|(observation, is_anomaly)| FlaggedObservation {
            observation: observation.clone(),
            is_anomaly,
        })
        .collect();

    DetectionOutcome {
        detector: detector.name().to_string(),
        rows,
        diagnostic,
    }
}
