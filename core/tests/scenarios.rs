use marketwatch_core::{
    config::MarketConfig,
    generator::generate_market,
    scenario::{CellKey, PriceEffect, Predicate, ScenarioRule, ScenarioType},
};

fn overlapping_rules() -> Vec<ScenarioRule> {
    vec![
        ScenarioRule {
            label:  ScenarioType::UnjustifiedPriceIncrease,
            when:   Predicate::any().regions(&["Riyadh"]),
            effect: PriceEffect::Scale { factor: 1.4 },
        },
        ScenarioRule {
            label:  ScenarioType::GeographicPriceDisparity,
            when:   Predicate::any(),
            effect: PriceEffect::Scale { factor: 1.3 },
        },
    ]
}

#[test]
fn first_matching_rule_wins() {
    let mut config = MarketConfig::default_test();
    config.scenarios.price_rules = overlapping_rules();
    let table = generate_market(&config).unwrap();

    for row in table.rows() {
        let expected = if row.region == "Riyadh" {
            ScenarioType::UnjustifiedPriceIncrease
        } else {
            ScenarioType::GeographicPriceDisparity
        };
        assert_eq!(row.scenario_type, expected, "Wrong label for {row:?}");
    }
    assert_eq!(table.with_scenario(ScenarioType::Normal).count(), 0);
}

#[test]
fn reordering_rules_changes_the_winner() {
    let mut config = MarketConfig::default_test();
    let mut rules = overlapping_rules();
    rules.reverse();
    config.scenarios.price_rules = rules;
    let table = generate_market(&config).unwrap();

    assert!(
        table
            .rows()
            .iter()
            .all(|r| r.scenario_type == ScenarioType::GeographicPriceDisparity),
        "The catch-all rule now precedes the Riyadh rule and must win everywhere"
    );
}

#[test]
fn rule_one_rows_are_never_relabelled() {
    // Add a lower-precedence rule that also covers the rule-1 cells.
    let mut config = MarketConfig::default_full();
    config.scenarios.price_rules.push(ScenarioRule {
        label:  ScenarioType::SeverePriceVolatility,
        when:   Predicate::any().regions(&["Riyadh"]),
        effect: PriceEffect::Noise { sigma: 0.2 },
    });
    let table = generate_market(&config).unwrap();

    let june = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let august = chrono::NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
    for row in table.rows() {
        let in_rule_one = row.region == "Riyadh"
            && row.company == "National Food Co."
            && row.date >= june
            && row.date <= august;
        assert_eq!(
            in_rule_one,
            row.scenario_type == ScenarioType::UnjustifiedPriceIncrease,
            "Rule-1 membership and label disagree for {row:?}"
        );
    }
}

#[test]
fn no_matching_rule_means_normal() {
    let mut config = MarketConfig::default_test();
    config.scenarios.price_rules.clear();
    let table = generate_market(&config).unwrap();
    assert_eq!(table.with_scenario(ScenarioType::Normal).count(), table.len());
}

#[test]
fn price_rule_change_leaves_complaints_and_shares_untouched() {
    let baseline = generate_market(&MarketConfig::default_test()).unwrap();

    let mut config = MarketConfig::default_test();
    config.scenarios.price_rules = overlapping_rules();
    let changed = generate_market(&config).unwrap();

    for (a, b) in baseline.rows().iter().zip(changed.rows()) {
        assert_eq!(a.complaint_count, b.complaint_count);
        assert_eq!(a.market_share, b.market_share);
    }
}

#[test]
fn generated_labels_agree_with_classify() {
    let config = MarketConfig::default_full();
    let table = generate_market(&config).unwrap();

    for row in table.rows() {
        let key = CellKey {
            date:    row.date,
            product: &row.product,
            region:  &row.region,
            company: &row.company,
        };
        assert_eq!(config.scenarios.classify(&key), row.scenario_type, "Label mismatch for {row:?}");
    }
}
