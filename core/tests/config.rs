use marketwatch_core::{
    config::{DetectorStrategy, MarketConfig, MIN_PRICE},
    error::MarketError,
    generator::generate_market,
    scenario::{PriceEffect, Predicate, ScenarioRule, ScenarioType},
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn data_directory_matches_in_code_defaults() {
    let loaded = MarketConfig::load(DATA_DIR).expect("load data/market");
    assert_eq!(loaded, MarketConfig::default_full());
}

#[test]
fn missing_data_directory_names_the_file() {
    let err = MarketConfig::load("/nonexistent/market-data").unwrap_err();
    assert!(
        err.to_string().contains("catalog.json"),
        "Error should name the missing file, got: {err}"
    );
}

#[test]
fn inverted_date_range_is_rejected() {
    let mut config = MarketConfig::default_test();
    std::mem::swap(&mut config.start_date, &mut config.end_date);
    let err = generate_market(&config).unwrap_err();
    assert!(matches!(err, MarketError::InvalidDateRange { .. }), "got {err:?}");
}

#[test]
fn single_day_range_is_allowed() {
    let mut config = MarketConfig::default_test();
    config.end_date = config.start_date;
    let table = generate_market(&config).unwrap();
    assert_eq!(table.len(), 5 * 5 * 4);
}

#[test]
fn empty_enumerations_are_rejected() {
    let mut no_regions = MarketConfig::default_test();
    no_regions.regions.clear();
    assert!(matches!(
        generate_market(&no_regions),
        Err(MarketError::EmptyEnumeration { name: "regions" })
    ));

    let mut no_products = MarketConfig::default_test();
    no_products.products.clear();
    assert!(matches!(
        no_products.validate(),
        Err(MarketError::EmptyEnumeration { name: "products" })
    ));
}

#[test]
fn duplicate_company_is_rejected() {
    let mut config = MarketConfig::default_test();
    let first = config.companies[0].clone();
    config.companies.push(first);
    assert!(matches!(
        config.validate(),
        Err(MarketError::InvalidParameter { name: "companies", .. })
    ));
}

#[test]
fn non_positive_base_price_is_rejected() {
    let mut config = MarketConfig::default_test();
    config.products[2].base_price = 0.0;
    match config.validate() {
        Err(MarketError::InvalidBasePrice { product, .. }) => assert_eq!(product, "Cooking Oil"),
        other => panic!("expected InvalidBasePrice, got {other:?}"),
    }
}

#[test]
fn normal_label_is_reserved_for_the_fallback() {
    let mut config = MarketConfig::default_test();
    config.scenarios.price_rules.push(ScenarioRule {
        label:  ScenarioType::Normal,
        when:   Predicate::any(),
        effect: PriceEffect::Scale { factor: 1.0 },
    });
    assert!(config.validate().is_err());
}

#[test]
fn share_bounds_must_be_ordered() {
    let mut config = MarketConfig::default_test();
    config.scenarios.share_min = 60.0;
    assert!(config.validate().is_err());
}

#[test]
fn unknown_names_in_rules_only_warn() {
    let mut config = MarketConfig::default_test();
    config.scenarios.price_rules.push(ScenarioRule {
        label:  ScenarioType::GeographicPriceDisparity,
        when:   Predicate::any().regions(&["Atlantis"]),
        effect: PriceEffect::Scale { factor: 2.0 },
    });
    assert!(config.validate().is_ok());
}

#[test]
fn detector_strategy_parses_from_cli_names() {
    assert_eq!("threshold".parse::<DetectorStrategy>(), Ok(DetectorStrategy::Threshold));
    assert_eq!("isolation_forest".parse::<DetectorStrategy>(), Ok(DetectorStrategy::IsolationForest));
    assert!("svm".parse::<DetectorStrategy>().is_err());
}

#[test]
fn compact_profile_is_a_subset_of_full() {
    let full = MarketConfig::default_full();
    let compact = MarketConfig::default_test();
    assert_eq!(compact.seed, full.seed);
    assert_eq!(compact.products[..], full.products[..5]);
    assert_eq!(compact.companies[..], full.companies[..4]);
    assert_eq!(compact.scenarios, full.scenarios);
    assert_eq!(compact.dates().len(), 91);
}

#[test]
fn floor_that_rounds_to_zero_is_rejected() {
    // 0.008 × 0.5 = 0.004 would round to a price of 0.00.
    let mut config = MarketConfig::default_test();
    config.products[0].base_price = 0.008;
    assert!(matches!(
        generate_market(&config),
        Err(MarketError::InvalidParameter { name: "price_floor_ratio", .. })
    ));
}

#[test]
fn smallest_accepted_base_price_generates_positive_prices() {
    let mut config = MarketConfig::default_test();
    config.products[0].base_price = 0.02;
    let table = generate_market(&config).unwrap();
    let sugar: Vec<f64> = table
        .rows()
        .iter()
        .filter(|r| r.product == "Sugar")
        .map(|r| r.price)
        .collect();
    assert_eq!(sugar.len(), 91 * 5 * 4);
    assert!(sugar.iter().all(|p| *p >= MIN_PRICE), "Sugar priced below a cent");
}

#[test]
fn negative_spreads_are_rejected() {
    let mut noisy = MarketConfig::default_test();
    noisy.scenarios.fallback = PriceEffect::Noise { sigma: -0.05 };
    assert!(matches!(
        noisy.validate(),
        Err(MarketError::InvalidParameter { name: "sigma", .. })
    ));

    let mut shares = MarketConfig::default_test();
    shares.scenarios.share_rules[0].std_dev = -5.0;
    assert!(matches!(
        shares.validate(),
        Err(MarketError::InvalidParameter { name: "std_dev", .. })
    ));

    let mut complaints = MarketConfig::default_test();
    complaints.scenarios.complaint_rules[1].extra_mean = f64::NAN;
    assert!(matches!(
        complaints.validate(),
        Err(MarketError::InvalidParameter { name: "extra_mean", .. })
    ));
}

#[test]
fn zero_spread_is_allowed_and_draws_the_mean() {
    let mut config = MarketConfig::default_test();
    config.scenarios.share_base.std_dev = 0.0;
    config.scenarios.share_rules.clear();
    let table = generate_market(&config).unwrap();
    assert!(table.rows().iter().all(|r| r.market_share == 12.5));
}
