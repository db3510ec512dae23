//! The generated observation table and the working copies derived from it.

use crate::{
    scenario::ScenarioType,
    types::{CompanyName, ProductName, RegionName, SimDate},
};
use serde::{Deserialize, Serialize};

/// One row of the generated market table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date:            SimDate,
    pub product:         ProductName,
    pub region:          RegionName,
    pub company:         CompanyName,
    pub price:           f64,
    pub complaint_count: u32,
    pub market_share:    f64,
    pub scenario_type:   ScenarioType,
}

/// Product + region selection supplied by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFilter {
    pub product: ProductName,
    pub region:  RegionName,
}

impl MarketFilter {
    pub fn new(product: impl Into<String>, region: impl Into<String>) -> Self {
        Self { product: product.into(), region: region.into() }
    }

    pub fn matches(&self, row: &Observation) -> bool {
        row.product == self.product && row.region == self.region
    }
}

/// Immutable once generated. Consumers filter into new tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    rows: Vec<Observation>,
}

impl MarketTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Working copy holding only the selected product in the selected region.
    pub fn filtered(&self, filter: &MarketFilter) -> MarketTable {
        MarketTable::new(
            self.rows
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect(),
        )
    }

    pub fn with_scenario(&self, scenario: ScenarioType) -> impl Iterator<Item = &Observation> {
        self.rows.iter().filter(move |row| row.scenario_type == scenario)
    }

    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.price).collect()
    }
}

impl FromIterator<Observation> for MarketTable {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
