use crate::{
    error::{MarketError, MarketResult},
    scenario::{
        ComplaintRule, PriceEffect, Predicate, ScenarioRule, ScenarioRuleSet, ScenarioType,
        ShareDistribution, ShareRule,
    },
    types::SimDate,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub base_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStrategy {
    Threshold,
    IsolationForest,
}

impl FromStr for DetectorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threshold"        => Ok(Self::Threshold),
            "isolation_forest" => Ok(Self::IsolationForest),
            _ => Err(format!("Unknown detector strategy: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub strategy: DetectorStrategy,
    /// Outlier fraction for the isolation forest.
    pub contamination: f64,
    pub n_trees: usize,
    pub sample_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy:      DetectorStrategy::Threshold,
            contamination: 0.1,
            n_trees:       100,
            sample_size:   256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Flag increases priced above this multiple of the normal-row mean.
    pub price_increase_ratio: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self { price_increase_ratio: 1.3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    seed: u64,
    start_date: SimDate,
    end_date: SimDate,
    products: Vec<ProductConfig>,
    regions: Vec<String>,
    companies: Vec<String>,
    #[serde(default)]
    detector: DetectorConfig,
    #[serde(default)]
    insights: InsightConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub seed: u64,
    pub start_date: SimDate,
    pub end_date: SimDate,
    pub products: Vec<ProductConfig>,
    pub regions: Vec<String>,
    pub companies: Vec<String>,
    pub scenarios: ScenarioRuleSet,
    pub detector: DetectorConfig,
    pub insights: InsightConfig,
}

impl MarketConfig {
    /// Load from the data/ directory.
    /// In tests, use MarketConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let catalog_path = format!("{data_dir}/market/catalog.json");
        let catalog_content = std::fs::read_to_string(&catalog_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
        let catalog: CatalogFile = serde_json::from_str(&catalog_content)?;

        let scenario_path = format!("{data_dir}/market/scenarios.json");
        let scenario_content = std::fs::read_to_string(&scenario_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {scenario_path}: {e}"))?;
        let scenarios: ScenarioRuleSet = serde_json::from_str(&scenario_content)?;

        Ok(Self {
            seed:       catalog.seed,
            start_date: catalog.start_date,
            end_date:   catalog.end_date,
            products:   catalog.products,
            regions:    catalog.regions,
            companies:  catalog.companies,
            scenarios,
            detector:   catalog.detector,
            insights:   catalog.insights,
        })
    }

    /// The full market: 8 products × 8 regions × 8 companies over 2024.
    pub fn default_full() -> Self {
        Self {
            seed:       42,
            start_date: ymd(2024, 1, 1),
            end_date:   ymd(2024, 12, 31),
            products: vec![
                product("Sugar", 3.5),
                product("Rice", 8.0),
                product("Cooking Oil", 15.0),
                product("Flour", 2.5),
                product("Coffee", 25.0),
                product("Tea", 12.0),
                product("Milk", 4.0),
                product("Bread", 1.0),
            ],
            regions: names(&[
                "Riyadh", "Jeddah", "Dammam", "Makkah",
                "Madinah", "Qassim", "Asir", "Hail",
            ]),
            companies: names(&[
                "National Food Co.",
                "Modern Marketing Est.",
                "Integrated Distribution Co.",
                "Central Markets Group",
                "United Consumer Co.",
                "Advanced Trading Est.",
                "Major Retail Co.",
                "Comprehensive Supply Group",
            ]),
            scenarios: default_scenarios(),
            detector:  DetectorConfig::default(),
            insights:  InsightConfig::default(),
        }
    }

    /// Config with hardcoded defaults for use in unit tests:
    /// 5 products × 5 regions × 4 companies over Q1 2024.
    pub fn default_test() -> Self {
        let full = Self::default_full();
        Self {
            end_date:  ymd(2024, 3, 31),
            products:  full.products[..5].to_vec(),
            regions:   full.regions[..5].to_vec(),
            companies: full.companies[..4].to_vec(),
            ..full
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the generator cannot honor.
    pub fn validate(&self) -> MarketResult<()> {
        if self.start_date > self.end_date {
            return Err(MarketError::InvalidDateRange {
                start: self.start_date,
                end:   self.end_date,
            });
        }

        let product_names: Vec<&str> = self.products.iter().map(|p| p.name.as_str()).collect();
        for (name, list) in [
            ("products", product_names.clone()),
            ("regions", self.regions.iter().map(String::as_str).collect()),
            ("companies", self.companies.iter().map(String::as_str).collect()),
        ] {
            if list.is_empty() {
                return Err(MarketError::EmptyEnumeration { name });
            }
            if let Some(dup) = first_duplicate(&list) {
                return Err(MarketError::InvalidParameter {
                    name,
                    reason: format!("'{dup}' listed more than once"),
                });
            }
        }

        for p in &self.products {
            if !(p.base_price.is_finite() && p.base_price > 0.0) {
                return Err(MarketError::InvalidBasePrice {
                    product: p.name.clone(),
                    price:   p.base_price,
                });
            }
        }

        let rules = &self.scenarios;
        if !(rules.price_floor_ratio > 0.0) {
            return Err(MarketError::InvalidParameter {
                name:   "price_floor_ratio",
                reason: format!("must be positive, got {}", rules.price_floor_ratio),
            });
        }
        // Floored prices must survive rounding to cents.
        for p in &self.products {
            let floor = p.base_price * rules.price_floor_ratio;
            if floor < MIN_PRICE {
                return Err(MarketError::InvalidParameter {
                    name:   "price_floor_ratio",
                    reason: format!(
                        "floor {floor} for '{}' rounds below {MIN_PRICE}",
                        p.name
                    ),
                });
            }
        }

        let sigmas = rules
            .price_rules
            .iter()
            .map(|r| &r.effect)
            .chain(std::iter::once(&rules.fallback))
            .filter_map(|effect| match effect {
                PriceEffect::Noise { sigma } => Some(*sigma),
                PriceEffect::Scale { .. }    => None,
            });
        check_non_negative("sigma", sigmas)?;
        check_non_negative(
            "std_dev",
            rules
                .share_rules
                .iter()
                .map(|r| r.std_dev)
                .chain(std::iter::once(rules.share_base.std_dev)),
        )?;
        check_non_negative(
            "extra_mean",
            rules
                .complaint_rules
                .iter()
                .map(|r| r.extra_mean)
                .chain(std::iter::once(rules.complaint_base_mean)),
        )?;

        if !(rules.share_min < rules.share_max) {
            return Err(MarketError::InvalidParameter {
                name:   "share_min",
                reason: format!("{} is not below share_max {}", rules.share_min, rules.share_max),
            });
        }
        if rules.price_rules.iter().any(|r| r.label == ScenarioType::Normal) {
            return Err(MarketError::InvalidParameter {
                name:   "price_rules",
                reason: "the normal label is reserved for the fallback".into(),
            });
        }

        for (kind, name) in rules.referenced_names() {
            let known = match kind {
                "product" => product_names.contains(&name),
                "region"  => self.regions.iter().any(|r| r == name),
                _         => self.companies.iter().any(|c| c == name),
            };
            if !known {
                log::warn!("config: scenario rule references unknown {kind} '{name}'");
            }
        }

        Ok(())
    }

    pub fn base_price(&self, product: &str) -> Option<f64> {
        self.products
            .iter()
            .find(|p| p.name == product)
            .map(|p| p.base_price)
    }

    /// Every day from start to end, inclusive.
    pub fn dates(&self) -> Vec<SimDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }

    /// Expected row count of the generated table.
    pub fn cell_count(&self) -> usize {
        self.dates().len() * self.products.len() * self.regions.len() * self.companies.len()
    }
}

/// The five price scenarios, two complaint boosts and two share skews.
pub fn default_scenarios() -> ScenarioRuleSet {
    ScenarioRuleSet {
        price_rules: vec![
            ScenarioRule {
                label:  ScenarioType::UnjustifiedPriceIncrease,
                when:   Predicate::any()
                    .regions(&["Riyadh"])
                    .companies(&["National Food Co."])
                    .on_or_after(ymd(2024, 6, 1))
                    .on_or_before(ymd(2024, 8, 31)),
                effect: PriceEffect::Scale { factor: 1.4 },
            },
            ScenarioRule {
                label:  ScenarioType::SuspiciousPriceDrop,
                when:   Predicate::any()
                    .regions(&["Jeddah"])
                    .companies(&["Modern Marketing Est."])
                    .on_or_after(ymd(2024, 3, 1))
                    .on_or_before(ymd(2024, 5, 31)),
                effect: PriceEffect::Scale { factor: 0.6 },
            },
            ScenarioRule {
                label:  ScenarioType::SynchronizedPriceChange,
                when:   Predicate::any()
                    .products(&["Sugar", "Flour"])
                    .companies(&[
                        "Integrated Distribution Co.",
                        "Central Markets Group",
                        "United Consumer Co.",
                    ])
                    .on_or_after(ymd(2024, 9, 1)),
                effect: PriceEffect::Scale { factor: 1.25 },
            },
            ScenarioRule {
                label:  ScenarioType::GeographicPriceDisparity,
                when:   Predicate::any().regions(&["Hail"]).products(&["Cooking Oil"]),
                effect: PriceEffect::Scale { factor: 1.3 },
            },
            ScenarioRule {
                label:  ScenarioType::SeverePriceVolatility,
                when:   Predicate::any()
                    .companies(&["Comprehensive Supply Group"])
                    .products(&["Coffee"]),
                effect: PriceEffect::Noise { sigma: 0.2 },
            },
        ],
        fallback:            PriceEffect::Noise { sigma: 0.05 },
        price_floor_ratio:   0.5,
        complaint_base_mean: 2.0,
        complaint_rules: vec![
            ComplaintRule {
                when: Predicate::any()
                    .regions(&["Riyadh"])
                    .companies(&["National Food Co."])
                    .on_or_after(ymd(2024, 6, 1)),
                extra_mean: 5.0,
            },
            ComplaintRule {
                when: Predicate::any()
                    .companies(&["Modern Marketing Est."])
                    .products(&["Milk", "Bread"]),
                extra_mean: 3.0,
            },
        ],
        share_base: ShareDistribution { mean: 12.5, std_dev: 3.0 },
        share_rules: vec![
            ShareRule {
                when: Predicate::any()
                    .companies(&["National Food Co."])
                    .regions(&["Riyadh"])
                    .products(&["Sugar", "Flour"]),
                mean:    35.0,
                std_dev: 5.0,
            },
            ShareRule {
                when:    Predicate::any().regions(&["Jeddah"]).products(&["Coffee"]),
                mean:    8.0,
                std_dev: 2.0,
            },
        ],
        share_min: 1.0,
        share_max: 50.0,
    }
}

/// Smallest price a generated row may carry after rounding.
pub const MIN_PRICE: f64 = 0.01;

fn check_non_negative(name: &'static str, values: impl Iterator<Item = f64>) -> MarketResult<()> {
    for value in values {
        if !(value.is_finite() && value >= 0.0) {
            return Err(MarketError::InvalidParameter {
                name,
                reason: format!("must be a finite non-negative number, got {value}"),
            });
        }
    }
    Ok(())
}

fn ymd(y: i32, m: u32, d: u32) -> SimDate {
    SimDate::from_ymd_opt(y, m, d).unwrap_or(SimDate::MIN)
}

fn product(name: &str, base_price: f64) -> ProductConfig {
    ProductConfig { name: name.into(), base_price }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn first_duplicate<'a>(list: &[&'a str]) -> Option<&'a str> {
    list.iter()
        .enumerate()
        .find(|(i, name)| list[..*i].contains(*name))
        .map(|(_, name)| *name)
}
