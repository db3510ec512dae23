//! Statistical summary of a generated table. Pure and read-only.

use crate::{
    scenario::ScenarioType,
    stats::{distinct, group_by, mean},
    table::MarketTable,
    types::SimDate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: SimDate,
    pub end: SimDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    pub products_count: usize,
    pub regions_count: usize,
    pub companies_count: usize,
    pub total_complaints: u64,
    pub avg_price_by_product: BTreeMap<String, f64>,
    pub scenario_distribution: BTreeMap<ScenarioType, usize>,
}

pub fn summarize(table: &MarketTable) -> StatisticalSummary {
    let rows = table.rows();

    let date_range = match (
        rows.iter().map(|r| r.date).min(),
        rows.iter().map(|r| r.date).max(),
    ) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    };

    let avg_price_by_product = group_by(rows, |r| r.product.clone(), |r| r.price)
        .into_iter()
        .filter_map(|(product, prices)| mean(&prices).map(|m| (product, m)))
        .collect();

    let mut scenario_distribution = BTreeMap::new();
    for row in rows {
        *scenario_distribution.entry(row.scenario_type).or_insert(0) += 1;
    }

    StatisticalSummary {
        total_records: rows.len(),
        date_range,
        products_count: distinct(rows, |r| r.product.as_str()).len(),
        regions_count: distinct(rows, |r| r.region.as_str()).len(),
        companies_count: distinct(rows, |r| r.company.as_str()).len(),
        total_complaints: rows.iter().map(|r| r.complaint_count as u64).sum(),
        avg_price_by_product,
        scenario_distribution,
    }
}
