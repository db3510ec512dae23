//! Market data generator: the full date × product × region × company table.
//!
//! ITERATION ORDER (fixed, never reordered):
//!   date → product → region → company
//!
//! Each cell draws from three independent streams (price, complaints,
//! market share), so a rule change in one concern leaves the other
//! columns of the table untouched.

use crate::{
    config::MarketConfig,
    error::MarketResult,
    rng::{RngBank, StreamSlot},
    scenario::CellKey,
    stats::round2,
    table::{MarketTable, Observation},
};

pub struct MarketGenerator<'a> {
    config: &'a MarketConfig,
}

impl<'a> MarketGenerator<'a> {
    pub fn new(config: &'a MarketConfig) -> Self {
        Self { config }
    }

    /// Generate the complete table. Same config and seed → identical table.
    pub fn generate(&self) -> MarketResult<MarketTable> {
        self.config.validate()?;

        let bank = RngBank::new(self.config.seed);
        let mut price_rng = bank.for_stream(StreamSlot::Price);
        let mut complaint_rng = bank.for_stream(StreamSlot::Complaints);
        let mut share_rng = bank.for_stream(StreamSlot::MarketShare);
        let rules = &self.config.scenarios;

        let dates = self.config.dates();
        let mut rows = Vec::with_capacity(self.config.cell_count());

        for date in &dates {
            for product in &self.config.products {
                for region in &self.config.regions {
                    for company in &self.config.companies {
                        let key = CellKey {
                            date:    *date,
                            product: &product.name,
                            region,
                            company,
                        };

                        let priced = rules.price(&key, product.base_price, &mut price_rng);
                        let complaint_count = rules.complaints(&key, &mut complaint_rng);
                        let market_share = rules.market_share(&key, &mut share_rng);

                        rows.push(Observation {
                            date:            *date,
                            product:         product.name.clone(),
                            region:          region.clone(),
                            company:         company.clone(),
                            price:           round2(priced.price),
                            complaint_count,
                            market_share:    round2(market_share),
                            scenario_type:   priced.scenario,
                        });
                    }
                }
            }
        }

        log::debug!(
            "generator: seed={} days={} rows={}",
            self.config.seed,
            dates.len(),
            rows.len()
        );

        Ok(MarketTable::new(rows))
    }
}

/// Convenience wrapper over `MarketGenerator`.
pub fn generate_market(config: &MarketConfig) -> MarketResult<MarketTable> {
    MarketGenerator::new(config).generate()
}
