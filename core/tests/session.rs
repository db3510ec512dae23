use marketwatch_core::{
    anomaly::ThresholdDetector,
    config::{DetectorStrategy, MarketConfig},
    isolation_forest::IsolationForestDetector,
    session::MarketSession,
    table::MarketFilter,
    views::{AnalysisView, ViewPayload},
};

fn build_test_session() -> MarketSession {
    let _ = env_logger::builder().is_test(true).try_init();
    MarketSession::build(MarketConfig::default_test()).expect("build compact session")
}

#[test]
fn session_generates_once_and_filters_copies() {
    let session = build_test_session();
    assert_eq!(session.table().len(), 9100);

    let filter = MarketFilter::new("Sugar", "Riyadh");
    let working = session.filtered(&filter);
    // 91 days × 4 companies
    assert_eq!(working.len(), 364);
    assert!(working.rows().iter().all(|r| filter.matches(r)));
    assert_eq!(session.table().len(), 9100, "Filtering must not shrink the session table");
}

#[test]
fn default_filter_is_first_product_and_region() {
    let session = build_test_session();
    let filter = session.default_filter().unwrap();
    assert_eq!(filter, MarketFilter::new("Sugar", "Riyadh"));
}

#[test]
fn overview_view_for_selection() {
    let session = build_test_session();
    let payload = session.view(AnalysisView::Overview, &MarketFilter::new("Rice", "Jeddah"));
    let ViewPayload::Overview(v) = payload else {
        panic!("expected overview payload");
    };
    assert_eq!(v.company_count, 4);
    assert_eq!(v.daily_price_trend.len(), 91);
    assert!(v.avg_price.unwrap() > 0.0);
    assert!(v.max_price.unwrap() >= v.avg_price.unwrap());
}

#[test]
fn reports_view_kpis_and_concentration() {
    let session = build_test_session();
    let payload = session.view(AnalysisView::Reports, &MarketFilter::new("Sugar", "Riyadh"));
    let ViewPayload::Reports(v) = payload else {
        panic!("expected reports payload");
    };
    assert_eq!(v.kpis.total_records, 364);
    assert_eq!(v.company_report.len(), 4);
    assert_eq!(v.concentration.len(), 1);
    // National Food holds ~35% of Riyadh sugar; the others ~12.5% each.
    let hhi = v.concentration[0].hhi;
    assert!((1400.0..2000.0).contains(&hhi), "HHI was {hhi}");
}

#[test]
fn unknown_selection_yields_empty_views() {
    let session = build_test_session();
    let filter = MarketFilter::new("Saffron", "Riyadh");

    let ViewPayload::Overview(v) = session.view(AnalysisView::Overview, &filter) else {
        panic!("expected overview payload");
    };
    assert_eq!(v.avg_price, None);
    assert_eq!(v.company_count, 0);

    let ViewPayload::AnomalyDetection(a) = session.view(AnalysisView::AnomalyDetection, &filter) else {
        panic!("expected anomaly payload");
    };
    assert_eq!(a.anomaly_count, 0);
}

#[test]
fn detector_can_be_swapped_without_regenerating() {
    let mut config = MarketConfig::default_test();
    let session = MarketSession::build(config.clone()).unwrap();
    assert_eq!(session.detector().name(), "threshold");

    config.detector.strategy = DetectorStrategy::IsolationForest;
    let before = session.table().clone();
    let session = session.with_detector(Box::new(IsolationForestDetector::new(&config.detector, 42)));
    assert_eq!(session.detector().name(), "isolation_forest");
    assert_eq!(session.table(), &before);

    let outcome = session.flag_anomalies(&MarketFilter::new("Sugar", "Riyadh"));
    // Never more than ceil(0.1 × 364) rows above the 90th-percentile score.
    assert!(outcome.anomaly_count() <= 37, "flagged {}", outcome.anomaly_count());
    assert_eq!(outcome.rows.len(), 364);

    let session = session.with_detector(Box::new(ThresholdDetector::default()));
    assert_eq!(session.detector().name(), "threshold");
}

#[test]
fn payload_serializes_with_view_tag() {
    let session = build_test_session();
    let payload = session.view(AnalysisView::PriceAnalysis, &MarketFilter::new("Flour", "Dammam"));
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["view"], "price_analysis");
    assert_eq!(json["distribution_by_company"].as_array().unwrap().len(), 4);
}

#[test]
fn summary_and_insights_come_from_the_full_table() {
    let session = build_test_session();
    assert_eq!(session.summary().total_records, 9100);
    assert!(session.insights().is_empty());
}

#[test]
fn isolation_forest_flags_nothing_in_a_fixed_price_market() {
    // Hail × Cooking Oil is always base × 1.3 = 19.5.
    let mut config = MarketConfig::default_full();
    config.detector.strategy = DetectorStrategy::IsolationForest;
    let session = MarketSession::build(config).unwrap();

    let ViewPayload::AnomalyDetection(v) =
        session.view(AnalysisView::AnomalyDetection, &MarketFilter::new("Cooking Oil", "Hail"))
    else {
        panic!("expected anomaly payload");
    };
    assert_eq!(v.series.len(), 2928);
    assert!(v.series.iter().all(|p| p.price == 19.5));
    assert_eq!(v.anomaly_count, 0, "Identical prices must not be flagged");
    assert!(v.diagnostic.is_none());
}
