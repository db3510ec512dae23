//! market-runner: headless dashboard runner for MarketWatch.
//!
//! Usage:
//!   market-runner --seed 42 --profile full --view overview --product Sugar --region Riyadh
//!   market-runner --data-dir ./data --view anomaly_detection --detector isolation_forest --json
//!   market-runner --profile compact --ipc-mode

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use marketwatch_core::{
    config::{DetectorStrategy, MarketConfig},
    session::MarketSession,
    table::MarketFilter,
    views::{AnalysisView, ViewPayload},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetSummary,
    GetInsights,
    View {
        view: AnalysisView,
        product: String,
        region: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json = args.iter().any(|a| a == "--json");
    let profile = string_arg(&args, "--profile").unwrap_or("full");
    let data_dir = string_arg(&args, "--data-dir");

    let mut config = match (data_dir, profile) {
        (Some(dir), _)    => MarketConfig::load(dir)?,
        (None, "full")    => MarketConfig::default_full(),
        (None, "compact") => MarketConfig::default_test(),
        (None, other)     => return Err(anyhow!("Unknown profile: {other}")),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.start_date = parse_arg::<NaiveDate>(&args, "--start", config.start_date);
    config.end_date = parse_arg::<NaiveDate>(&args, "--end", config.end_date);
    config.detector.contamination = parse_arg(&args, "--contamination", config.detector.contamination);
    if let Some(name) = string_arg(&args, "--detector") {
        config.detector.strategy = name.parse::<DetectorStrategy>().map_err(|e| anyhow!(e))?;
    }

    if !ipc_mode && !json {
        println!("MarketWatch: market-runner");
        println!("  seed:      {}", config.seed);
        println!("  range:     {} .. {}", config.start_date, config.end_date);
        println!("  profile:   {}", data_dir.unwrap_or(profile));
        println!("  detector:  {:?}", config.detector.strategy);
        println!();
    }

    let session = MarketSession::build(config)?;

    if ipc_mode {
        return run_ipc_loop(&session);
    }

    let view = match string_arg(&args, "--view") {
        Some(name) => name.parse::<AnalysisView>().map_err(|e| anyhow!(e))?,
        None       => AnalysisView::Overview,
    };
    let default_filter = session
        .default_filter()
        .ok_or_else(|| anyhow!("catalog has no products or regions"))?;
    let filter = MarketFilter::new(
        string_arg(&args, "--product").unwrap_or(default_filter.product.as_str()),
        string_arg(&args, "--region").unwrap_or(default_filter.region.as_str()),
    );
    let payload = session.view(view, &filter);

    if json {
        let out = serde_json::json!({
            "summary":  session.summary(),
            "insights": session.insights(),
            "filter":   filter,
            "payload":  payload,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&session)?;
        print_view(&filter, &payload);
    }

    Ok(())
}

fn run_ipc_loop(session: &MarketSession) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unparseable command: {}", buffer.trim_end());
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetSummary => {
                writeln!(stdout, "{}", serde_json::to_string(&session.summary())?)?;
            }
            IpcCommand::GetInsights => {
                writeln!(stdout, "{}", serde_json::to_string(&session.insights())?)?;
            }
            IpcCommand::View { view, product, region } => {
                let payload = session.view(view, &MarketFilter::new(product, region));
                writeln!(stdout, "{}", serde_json::to_string(&payload)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(session: &MarketSession) -> Result<()> {
    let summary = session.summary();

    println!("=== MARKET SUMMARY ===");
    println!("  records:        {}", summary.total_records);
    if let Some(range) = &summary.date_range {
        println!("  dates:          {} .. {}", range.start, range.end);
    }
    println!("  products:       {}", summary.products_count);
    println!("  regions:        {}", summary.regions_count);
    println!("  companies:      {}", summary.companies_count);
    println!("  complaints:     {}", summary.total_complaints);

    println!();
    println!("=== AVERAGE PRICE BY PRODUCT ===");
    for (product, price) in &summary.avg_price_by_product {
        println!("  {product:<14} {price:>8.2}");
    }

    println!();
    println!("=== SCENARIO DISTRIBUTION ===");
    for (scenario, count) in &summary.scenario_distribution {
        println!("  {:<40} {count:>8}", scenario.label());
    }

    println!();
    println!("=== INSIGHTS ===");
    let insights = session.insights();
    if insights.is_empty() {
        println!("  (No insights for this market)");
    }
    for insight in insights {
        println!("  [{:?}] {}: {}", insight.kind, insight.title, insight.description);
        println!("    companies: {}", insight.companies.join(", "));
        println!("    products:  {}", insight.products.join(", "));
        println!("    regions:   {}", insight.regions.join(", "));
    }
    println!();
    Ok(())
}

fn print_view(filter: &MarketFilter, payload: &ViewPayload) {
    println!("=== {} / {} ===", filter.product, filter.region);
    match payload {
        ViewPayload::Overview(v) => {
            println!("  avg price:      {}", fmt_opt(v.avg_price));
            println!("  max price:      {}", fmt_opt(v.max_price));
            println!("  complaints:     {}", v.total_complaints);
            println!("  companies:      {}", v.company_count);
            for g in &v.price_by_company {
                println!("  {:<30} {:>8.2}", g.key, g.value);
            }
        }
        ViewPayload::PriceAnalysis(v) => {
            for d in &v.distribution_by_company {
                let s = &d.summary;
                println!(
                    "  {:<30} min {:.2} | q1 {:.2} | med {:.2} | q3 {:.2} | max {:.2}",
                    d.company, s.min, s.q1, s.median, s.q3, s.max
                );
            }
            println!("  -- instability (stddev) --");
            for g in &v.instability_by_company {
                println!("  {:<30} {:>8.3}", g.key, g.value);
            }
        }
        ViewPayload::AnomalyDetection(v) => {
            if let Some(diag) = &v.diagnostic {
                println!("  detector '{}' failed: {diag}", v.detector);
            }
            if v.anomaly_count == 0 {
                println!("  No anomalies in the selected period");
            } else {
                println!("  {} anomalies ({})", v.anomaly_count, v.detector);
                for a in &v.anomalies {
                    let o = &a.observation;
                    println!("  {} | {} | {:.2}", o.date, o.company, o.price);
                }
            }
        }
        ViewPayload::Reports(v) => {
            for r in &v.company_report {
                println!(
                    "  {:<30} mean {:.2} | std {} | min {:.2} | max {:.2} | complaints {} | share {:.2}",
                    r.company, r.price_mean, fmt_opt(r.price_std),
                    r.price_min, r.price_max, r.complaint_count_sum, r.market_share_mean
                );
            }
            println!("  records: {}", v.kpis.total_records);
            for c in &v.concentration {
                println!("  HHI {} / {}: {:.0}", c.product, c.region, c.hhi);
            }
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
