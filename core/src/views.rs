//! View models for the four analysis views.
//!
//! Every builder takes the product + region working copy the presentation
//! layer selected. Nothing here draws, routes or formats; the runner turns
//! these structs into text or JSON.

use crate::{
    anomaly::{flag_anomalies, AnomalyDetector, DetectionOutcome, FlaggedObservation},
    stats::{distinct, group_by, mean, round2, sample_std, FiveNumber},
    table::{MarketTable, Observation},
    types::SimDate,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisView {
    Overview,
    PriceAnalysis,
    AnomalyDetection,
    Reports,
}

impl AnalysisView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview         => "overview",
            Self::PriceAnalysis    => "price_analysis",
            Self::AnomalyDetection => "anomaly_detection",
            Self::Reports          => "reports",
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview"          => Ok(Self::Overview),
            "price_analysis"    => Ok(Self::PriceAnalysis),
            "anomaly_detection" => Ok(Self::AnomalyDetection),
            "reports"           => Ok(Self::Reports),
            _ => Err(format!("Unknown analysis view: {s}")),
        }
    }
}

// ── Shared shapes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupValue {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: SimDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    pub key: String,
    pub count: u64,
}

// ── Overview ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewView {
    pub avg_price: Option<f64>,
    pub total_complaints: u64,
    pub company_count: usize,
    pub max_price: Option<f64>,
    pub daily_price_trend: Vec<DailyValue>,
    pub price_by_company: Vec<GroupValue>,
    pub complaints_by_company: Vec<GroupCount>,
}

pub fn overview(table: &MarketTable) -> OverviewView {
    let rows = table.rows();
    let prices = table.prices();

    OverviewView {
        avg_price: mean(&prices),
        total_complaints: rows.iter().map(|r| r.complaint_count as u64).sum(),
        company_count: distinct(rows, |r| r.company.as_str()).len(),
        max_price: prices.iter().copied().reduce(f64::max),
        daily_price_trend: group_by(rows, |r| r.date, |r| r.price)
            .into_iter()
            .filter_map(|(date, p)| mean(&p).map(|value| DailyValue { date, value }))
            .collect(),
        price_by_company: group_means(table, |r| r.price),
        complaints_by_company: group_by(rows, |r| r.company.clone(), |r| r.complaint_count as u64)
            .into_iter()
            .map(|(key, counts)| GroupCount { key, count: counts.iter().sum() })
            .collect(),
    }
}

// ── Price analysis ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDistribution {
    pub company: String,
    #[serde(flatten)]
    pub summary: FiveNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysisView {
    pub distribution_by_company: Vec<PriceDistribution>,
    pub price_by_region: Vec<GroupValue>,
    /// Sample stddev per company, most unstable first.
    pub instability_by_company: Vec<GroupValue>,
}

pub fn price_analysis(table: &MarketTable) -> PriceAnalysisView {
    let rows = table.rows();
    let by_company = group_by(rows, |r| r.company.clone(), |r| r.price);

    let distribution_by_company = by_company
        .iter()
        .filter_map(|(company, prices)| {
            FiveNumber::of(prices).map(|summary| PriceDistribution {
                company: company.clone(),
                summary,
            })
        })
        .collect();

    let mut instability_by_company: Vec<GroupValue> = by_company
        .iter()
        .filter_map(|(company, prices)| {
            sample_std(prices).map(|value| GroupValue { key: company.clone(), value })
        })
        .collect();
    instability_by_company.sort_by(|a, b| b.value.total_cmp(&a.value));

    PriceAnalysisView {
        distribution_by_company,
        price_by_region: group_by(rows, |r| r.region.clone(), |r| r.price)
            .into_iter()
            .filter_map(|(key, p)| mean(&p).map(|value| GroupValue { key, value }))
            .collect(),
        instability_by_company,
    }
}

// ── Anomaly detection ────────────────────────────────────────────────────────

/// One point of the price-over-time scatter, flagged or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedPrice {
    pub date: SimDate,
    pub company: String,
    pub price: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyView {
    pub detector: String,
    pub anomaly_count: usize,
    pub anomalies: Vec<FlaggedObservation>,
    pub anomalies_by_company: Vec<GroupCount>,
    /// Every row of the selection, in row order.
    pub series: Vec<FlaggedPrice>,
    pub diagnostic: Option<String>,
}

pub fn anomaly_detection(table: &MarketTable, detector: &dyn AnomalyDetector) -> AnomalyView {
    anomaly_view(flag_anomalies(detector, table))
}

pub fn anomaly_view(outcome: DetectionOutcome) -> AnomalyView {
    let series = outcome
        .rows
        .iter()
        .map(|r| FlaggedPrice {
            date: r.observation.date,
            company: r.observation.company.clone(),
            price: r.observation.price,
            is_anomaly: r.is_anomaly,
        })
        .collect();
    let anomalies: Vec<FlaggedObservation> = outcome.anomalies().cloned().collect();
    let anomalies_by_company = group_by(&anomalies, |a| a.observation.company.clone(), |_| 1u64)
        .into_iter()
        .map(|(key, ones)| GroupCount { key, count: ones.len() as u64 })
        .collect();

    AnomalyView {
        detector: outcome.detector,
        anomaly_count: anomalies.len(),
        anomalies,
        anomalies_by_company,
        series,
        diagnostic: outcome.diagnostic,
    }
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyReport {
    pub company: String,
    pub price_mean: f64,
    pub price_std: Option<f64>,
    pub price_min: f64,
    pub price_max: f64,
    pub complaint_count_sum: u64,
    pub market_share_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportKpis {
    pub total_records: usize,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub avg_complaints: Option<f64>,
    pub max_market_share: Option<f64>,
    pub min_market_share: Option<f64>,
}

/// Columns the reports view can chart over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMetric {
    Price,
    ComplaintCount,
    MarketShare,
}

impl ReportMetric {
    pub const ALL: [ReportMetric; 3] = [Self::Price, Self::ComplaintCount, Self::MarketShare];

    pub fn of(&self, row: &Observation) -> f64 {
        match self {
            Self::Price          => row.price,
            Self::ComplaintCount => row.complaint_count as f64,
            Self::MarketShare    => row.market_share,
        }
    }
}

/// One company's daily values of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: ReportMetric,
    pub company: String,
    pub points: Vec<DailyValue>,
}

/// Herfindahl-Hirschman index of one product in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub product: String,
    pub region: String,
    pub hhi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsView {
    pub company_report: Vec<CompanyReport>,
    pub kpis: ReportKpis,
    pub concentration: Vec<Concentration>,
    /// Per metric, per company, in first-appearance order.
    pub metric_over_time: Vec<MetricSeries>,
}

pub fn reports(table: &MarketTable) -> ReportsView {
    let rows = table.rows();

    let company_report = group_by(rows, |r| r.company.clone(), |r| r)
        .into_iter()
        .filter_map(|(company, group)| {
            let prices: Vec<f64> = group.iter().map(|r| r.price).collect();
            let shares: Vec<f64> = group.iter().map(|r| r.market_share).collect();
            Some(CompanyReport {
                company,
                price_mean: round2(mean(&prices)?),
                price_std: sample_std(&prices).map(round2),
                price_min: prices.iter().copied().reduce(f64::min)?,
                price_max: prices.iter().copied().reduce(f64::max)?,
                complaint_count_sum: group.iter().map(|r| r.complaint_count as u64).sum(),
                market_share_mean: round2(mean(&shares)?),
            })
        })
        .collect();

    let prices = table.prices();
    let shares: Vec<f64> = rows.iter().map(|r| r.market_share).collect();
    let complaints: Vec<f64> = rows.iter().map(|r| r.complaint_count as f64).collect();

    ReportsView {
        company_report,
        kpis: ReportKpis {
            total_records: rows.len(),
            price_min: prices.iter().copied().reduce(f64::min),
            price_max: prices.iter().copied().reduce(f64::max),
            avg_complaints: mean(&complaints),
            max_market_share: shares.iter().copied().reduce(f64::max),
            min_market_share: shares.iter().copied().reduce(f64::min),
        },
        concentration: concentration(table),
        metric_over_time: ReportMetric::ALL
            .iter()
            .flat_map(|metric| metric_over_time(table, *metric))
            .collect(),
    }
}

/// Daily mean of `metric` per company.
pub fn metric_over_time(table: &MarketTable, metric: ReportMetric) -> Vec<MetricSeries> {
    group_by(table.rows(), |r| r.company.clone(), |r| r)
        .into_iter()
        .map(|(company, group)| MetricSeries {
            metric,
            company,
            points: group_by(group.iter().copied(), |r| r.date, |r| metric.of(r))
                .into_iter()
                .filter_map(|(date, v)| mean(&v).map(|value| DailyValue { date, value }))
                .collect(),
        })
        .collect()
}

/// HHI per product × region: sum over companies of the squared mean share.
pub fn concentration(table: &MarketTable) -> Vec<Concentration> {
    group_by(
        table.rows(),
        |r| (r.product.clone(), r.region.clone()),
        |r| r,
    )
    .into_iter()
    .map(|((product, region), group)| {
        let hhi = group_by(group.iter().copied(), |r| r.company.as_str(), |r| r.market_share)
            .into_iter()
            .filter_map(|(_, shares)| mean(&shares))
            .map(|share| share * share)
            .sum::<f64>();
        Concentration { product, region, hhi: round2(hhi) }
    })
    .collect()
}

fn group_means(table: &MarketTable, metric: impl Fn(&Observation) -> f64) -> Vec<GroupValue> {
    group_by(table.rows(), |r| r.company.clone(), |r| metric(r))
        .into_iter()
        .filter_map(|(key, values)| mean(&values).map(|value| GroupValue { key, value }))
        .collect()
}

/// One payload per view, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewPayload {
    Overview(OverviewView),
    PriceAnalysis(PriceAnalysisView),
    AnomalyDetection(AnomalyView),
    Reports(ReportsView),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anomaly::ThresholdDetector, scenario::ScenarioType};

    fn row(day: u32, company: &str, price: f64, complaints: u32, share: f64) -> Observation {
        Observation {
            date: SimDate::from_ymd_opt(2024, 1, day).unwrap(),
            product: "Sugar".into(),
            region: "Riyadh".into(),
            company: company.into(),
            price,
            complaint_count: complaints,
            market_share: share,
            scenario_type: ScenarioType::Normal,
        }
    }

    fn sample() -> MarketTable {
        MarketTable::new(vec![
            row(1, "A", 3.0, 1, 20.0),
            row(1, "B", 5.0, 2, 30.0),
            row(2, "A", 4.0, 3, 40.0),
            row(2, "B", 6.0, 0, 10.0),
        ])
    }

    #[test]
    fn overview_aggregates_filtered_rows() {
        let v = overview(&sample());
        assert_eq!(v.avg_price, Some(4.5));
        assert_eq!(v.total_complaints, 6);
        assert_eq!(v.company_count, 2);
        assert_eq!(v.max_price, Some(6.0));
        assert_eq!(v.daily_price_trend.len(), 2);
        assert_eq!(v.daily_price_trend[0].value, 4.0);
        assert_eq!(v.price_by_company[0], GroupValue { key: "A".into(), value: 3.5 });
        assert_eq!(v.complaints_by_company[1], GroupCount { key: "B".into(), count: 2 });
    }

    #[test]
    fn instability_is_sorted_descending() {
        let mut rows = sample().rows().to_vec();
        rows.push(row(3, "B", 12.0, 0, 10.0));
        let v = price_analysis(&MarketTable::new(rows));
        assert_eq!(v.instability_by_company[0].key, "B");
        assert!(v.instability_by_company[0].value >= v.instability_by_company[1].value);
        assert_eq!(v.distribution_by_company[0].summary.median, 3.5);
    }

    #[test]
    fn hhi_sums_squared_mean_shares() {
        // A: mean 30, B: mean 20 → 900 + 400
        let c = concentration(&sample());
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].hhi, 1300.0);
    }

    #[test]
    fn reports_round_to_cents() {
        let v = reports(&sample());
        assert_eq!(v.kpis.total_records, 4);
        assert_eq!(v.kpis.avg_complaints, Some(1.5));
        let a = &v.company_report[0];
        assert_eq!(a.company, "A");
        assert_eq!(a.price_mean, 3.5);
        assert_eq!(a.price_std, Some(0.71));
        assert_eq!(a.complaint_count_sum, 4);
    }

    #[test]
    fn reports_chart_every_metric_per_company() {
        let v = reports(&sample());
        assert_eq!(v.metric_over_time.len(), 3 * 2);

        let shares_b = v
            .metric_over_time
            .iter()
            .find(|s| s.metric == ReportMetric::MarketShare && s.company == "B")
            .unwrap();
        let values: Vec<f64> = shares_b.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![30.0, 10.0]);

        let complaints_a = metric_over_time(&sample(), ReportMetric::ComplaintCount);
        assert_eq!(complaints_a[0].points[1].value, 3.0);
    }

    #[test]
    fn anomaly_series_keeps_every_row() {
        let mut rows = sample().rows().to_vec();
        rows.extend((3..=12).map(|d| row(d, "A", 3.0, 0, 20.0)));
        rows.push(row(13, "B", 50.0, 0, 20.0));
        let v = anomaly_detection(&MarketTable::new(rows), &ThresholdDetector::default());

        assert_eq!(v.series.len(), 15);
        assert_eq!(v.anomaly_count, 1);
        assert_eq!(v.series.iter().filter(|p| p.is_anomaly).count(), 1);
        assert!(v.series[14].is_anomaly);
        assert_eq!(v.series[14].price, 50.0);
    }

    #[test]
    fn empty_working_copy_reports_no_anomalies() {
        let v = anomaly_detection(&MarketTable::default(), &ThresholdDetector::default());
        assert_eq!(v.anomaly_count, 0);
        assert!(v.diagnostic.is_none());
    }

    #[test]
    fn view_names_round_trip() {
        for view in [
            AnalysisView::Overview,
            AnalysisView::PriceAnalysis,
            AnalysisView::AnomalyDetection,
            AnalysisView::Reports,
        ] {
            assert_eq!(view.as_str().parse::<AnalysisView>(), Ok(view));
        }
        assert!("charts".parse::<AnalysisView>().is_err());
    }
}
