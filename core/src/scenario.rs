//! Scenario rule set: the distortions injected into the synthetic market.
//!
//! Three independent ordered rule lists:
//!   1. Price rules      : multiplier or noise, plus the scenario label
//!   2. Complaint rules  : extra Poisson complaints on top of the base draw
//!   3. Share rules      : replacement normal for the market-share draw
//!
//! RULES:
//!   - Every list is evaluated top to bottom, first match wins.
//!   - Precedence is the Vec order. Nothing else encodes priority.
//!   - A price rule may never carry the `Normal` label; that label
//!     belongs to the fallback alone.

use crate::{
    rng::StreamRng,
    types::SimDate,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Labels ───────────────────────────────────────────────────────────────────

/// Closed set of scenario labels. Exactly one applies per observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    UnjustifiedPriceIncrease,
    SuspiciousPriceDrop,
    SynchronizedPriceChange,
    GeographicPriceDisparity,
    SeverePriceVolatility,
    Normal,
}

impl ScenarioType {
    pub const ALL: [ScenarioType; 6] = [
        ScenarioType::UnjustifiedPriceIncrease,
        ScenarioType::SuspiciousPriceDrop,
        ScenarioType::SynchronizedPriceChange,
        ScenarioType::GeographicPriceDisparity,
        ScenarioType::SeverePriceVolatility,
        ScenarioType::Normal,
    ];

    /// Human-readable label shown on reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnjustifiedPriceIncrease => "unjustified price increase",
            Self::SuspiciousPriceDrop      => "suspicious price drop (dumping)",
            Self::SynchronizedPriceChange  => "synchronized price change (collusion)",
            Self::GeographicPriceDisparity => "geographic price disparity",
            Self::SeverePriceVolatility    => "severe price volatility",
            Self::Normal                   => "normal",
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Predicates ───────────────────────────────────────────────────────────────

/// Conjunction of optional constraints. An empty name list matches anything;
/// date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<SimDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<SimDate>,
}

impl Predicate {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn products(mut self, names: &[&str]) -> Self {
        self.products = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn regions(mut self, names: &[&str]) -> Self {
        self.regions = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn companies(mut self, names: &[&str]) -> Self {
        self.companies = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn on_or_after(mut self, date: SimDate) -> Self {
        self.from = Some(date);
        self
    }

    pub fn on_or_before(mut self, date: SimDate) -> Self {
        self.to = Some(date);
        self
    }

    pub fn matches(&self, key: &CellKey<'_>) -> bool {
        fn allows(list: &[String], value: &str) -> bool {
            list.is_empty() || list.iter().any(|v| v == value)
        }

        allows(&self.products, key.product)
            && allows(&self.regions, key.region)
            && allows(&self.companies, key.company)
            && self.from.map_or(true, |from| key.date >= from)
            && self.to.map_or(true, |to| key.date <= to)
    }
}

/// The (date, product, region, company) coordinate of one observation.
#[derive(Debug, Clone, Copy)]
pub struct CellKey<'a> {
    pub date:    SimDate,
    pub product: &'a str,
    pub region:  &'a str,
    pub company: &'a str,
}

// ── Effects ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceEffect {
    /// Deterministic multiplier, no draw.
    Scale { factor: f64 },
    /// Multiply by (1 + N(0, sigma)).
    Noise { sigma: f64 },
}

impl PriceEffect {
    pub fn multiplier(&self, rng: &mut StreamRng) -> f64 {
        match self {
            Self::Scale { factor } => *factor,
            Self::Noise { sigma }  => 1.0 + rng.normal(0.0, *sigma),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRule {
    pub label:  ScenarioType,
    pub when:   Predicate,
    pub effect: PriceEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintRule {
    pub when:       Predicate,
    /// Lambda of the extra Poisson draw.
    pub extra_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRule {
    pub when:    Predicate,
    pub mean:    f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareDistribution {
    pub mean:    f64,
    pub std_dev: f64,
}

/// Outcome of the price rules for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedCell {
    pub price:    f64,
    pub scenario: ScenarioType,
}

// ── Rule set ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRuleSet {
    pub price_rules:         Vec<ScenarioRule>,
    pub fallback:            PriceEffect,
    pub price_floor_ratio:   f64,
    pub complaint_base_mean: f64,
    pub complaint_rules:     Vec<ComplaintRule>,
    pub share_base:          ShareDistribution,
    pub share_rules:         Vec<ShareRule>,
    pub share_min:           f64,
    pub share_max:           f64,
}

impl ScenarioRuleSet {
    /// The first price rule matching `key`, if any.
    pub fn matching_rule(&self, key: &CellKey<'_>) -> Option<&ScenarioRule> {
        self.price_rules.iter().find(|rule| rule.when.matches(key))
    }

    /// Label only. Draws nothing.
    pub fn classify(&self, key: &CellKey<'_>) -> ScenarioType {
        self.matching_rule(key)
            .map(|rule| rule.label)
            .unwrap_or(ScenarioType::Normal)
    }

    /// Apply the winning price effect and the floor.
    pub fn price(&self, key: &CellKey<'_>, base_price: f64, rng: &mut StreamRng) -> PricedCell {
        let (effect, scenario) = match self.matching_rule(key) {
            Some(rule) => (&rule.effect, rule.label),
            None       => (&self.fallback, ScenarioType::Normal),
        };
        let raw = base_price * effect.multiplier(rng);
        PricedCell {
            price: raw.max(base_price * self.price_floor_ratio),
            scenario,
        }
    }

    pub fn complaints(&self, key: &CellKey<'_>, rng: &mut StreamRng) -> u32 {
        let base = rng.poisson(self.complaint_base_mean);
        let extra = self
            .complaint_rules
            .iter()
            .find(|rule| rule.when.matches(key))
            .map(|rule| rng.poisson(rule.extra_mean))
            .unwrap_or(0);
        base + extra
    }

    pub fn market_share(&self, key: &CellKey<'_>, rng: &mut StreamRng) -> f64 {
        let (mean, std_dev) = match self.share_rules.iter().find(|rule| rule.when.matches(key)) {
            Some(rule) => (rule.mean, rule.std_dev),
            None       => (self.share_base.mean, self.share_base.std_dev),
        };
        rng.normal(mean, std_dev).clamp(self.share_min, self.share_max)
    }

    /// Every name referenced by any predicate, for catalog cross-checks.
    pub fn referenced_names(&self) -> Vec<(&'static str, &str)> {
        let predicates = self
            .price_rules
            .iter()
            .map(|r| &r.when)
            .chain(self.complaint_rules.iter().map(|r| &r.when))
            .chain(self.share_rules.iter().map(|r| &r.when));

        let mut names = Vec::new();
        for p in predicates {
            names.extend(p.products.iter().map(|n| ("product", n.as_str())));
            names.extend(p.regions.iter().map(|n| ("region", n.as_str())));
            names.extend(p.companies.iter().map(|n| ("company", n.as_str())));
        }
        names
    }
}
