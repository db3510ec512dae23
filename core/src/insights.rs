//! Insight extraction: short human-readable alerts over the full table.

use crate::{
    config::InsightConfig,
    scenario::ScenarioType,
    stats::{distinct, mean},
    table::{MarketTable, Observation},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub companies: Vec<String>,
    pub products: Vec<String>,
    pub regions: Vec<String>,
}

pub fn extract_insights(table: &MarketTable, config: &InsightConfig) -> Vec<Insight> {
    let mut insights = Vec::new();

    let normal_prices: Vec<f64> = table
        .with_scenario(ScenarioType::Normal)
        .map(|row| row.price)
        .collect();

    // Without a normal baseline there is nothing to compare against.
    let Some(normal_mean) = mean(&normal_prices) else {
        return insights;
    };
    let limit = normal_mean * config.price_increase_ratio;

    let high: Vec<&Observation> = table
        .with_scenario(ScenarioType::UnjustifiedPriceIncrease)
        .filter(|row| row.price > limit)
        .collect();

    if !high.is_empty() {
        insights.push(Insight {
            kind: InsightKind::Warning,
            title: "Unjustified price increase".into(),
            description: format!(
                "Abnormal price increase detected in {} records (above {:.2}, {:.0}% of the normal mean {:.2})",
                high.len(),
                limit,
                config.price_increase_ratio * 100.0,
                normal_mean
            ),
            companies: distinct(high.iter().copied(), |r| r.company.clone()),
            products:  distinct(high.iter().copied(), |r| r.product.clone()),
            regions:   distinct(high.iter().copied(), |r| r.region.clone()),
        });
    }

    insights
}
