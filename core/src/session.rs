//! The analysis session. Owns the one generated table for its lifetime.
//!
//! RULES:
//!   - The table is generated exactly once, in build().
//!   - Consumers receive it by reference; nothing mutates it afterwards.
//!   - Filtering and anomaly flags always produce working copies.

use crate::{
    anomaly::{detector_for, flag_anomalies, AnomalyDetector, DetectionOutcome},
    config::MarketConfig,
    error::MarketResult,
    generator::MarketGenerator,
    insights::{extract_insights, Insight},
    summary::{summarize, StatisticalSummary},
    table::{MarketFilter, MarketTable},
    views::{self, AnalysisView, ViewPayload},
};

pub struct MarketSession {
    pub config: MarketConfig,
    table:      MarketTable,
    detector:   Box<dyn AnomalyDetector>,
}

impl MarketSession {
    /// Validate the config and generate the table.
    pub fn build(config: MarketConfig) -> MarketResult<Self> {
        let table = MarketGenerator::new(&config).generate()?;
        let detector = detector_for(&config.detector, config.seed);

        log::info!(
            "session: generated {} observations (seed={}, {}..={}, detector={})",
            table.len(),
            config.seed,
            config.start_date,
            config.end_date,
            detector.name()
        );

        Ok(Self { config, table, detector })
    }

    /// Swap the anomaly strategy without regenerating the table.
    pub fn with_detector(mut self, detector: Box<dyn AnomalyDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn table(&self) -> &MarketTable {
        &self.table
    }

    pub fn detector(&self) -> &dyn AnomalyDetector {
        self.detector.as_ref()
    }

    pub fn insights(&self) -> Vec<Insight> {
        extract_insights(&self.table, &self.config.insights)
    }

    pub fn summary(&self) -> StatisticalSummary {
        summarize(&self.table)
    }

    pub fn filtered(&self, filter: &MarketFilter) -> MarketTable {
        self.table.filtered(filter)
    }

    pub fn flag_anomalies(&self, filter: &MarketFilter) -> DetectionOutcome {
        flag_anomalies(self.detector(), &self.filtered(filter))
    }

    /// Recompute one view for a new selection. Cheap relative to build().
    pub fn view(&self, view: AnalysisView, filter: &MarketFilter) -> ViewPayload {
        let working = self.filtered(filter);
        if working.is_empty() {
            log::warn!(
                "session: selection {}/{} matches no observations",
                filter.product,
                filter.region
            );
        }

        match view {
            AnalysisView::Overview         => ViewPayload::Overview(views::overview(&working)),
            AnalysisView::PriceAnalysis    => ViewPayload::PriceAnalysis(views::price_analysis(&working)),
            AnalysisView::AnomalyDetection => {
                ViewPayload::AnomalyDetection(views::anomaly_detection(&working, self.detector()))
            }
            AnalysisView::Reports          => ViewPayload::Reports(views::reports(&working)),
        }
    }

    /// First product and region of the catalog; the runner's default selection.
    pub fn default_filter(&self) -> Option<MarketFilter> {
        Some(MarketFilter::new(
            self.config.products.first()?.name.clone(),
            self.config.regions.first()?.clone(),
        ))
    }
}
