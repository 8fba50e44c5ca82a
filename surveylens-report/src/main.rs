//! surveylens-report - survey dashboard in the terminal
//!
//! Renders the same snapshot a store dashboard shows: answer
//! distributions, response time series and the feedback table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use surveylens_core::analytics::{
    total_answers, AggregationUnit, CustomRange, DashboardAnalyticsEngine, DashboardControls,
    DashboardSnapshot, FeedbackField, QuestionPanel, SortDirection, WindowKind,
};
use surveylens_core::format::{format_bucket_tick, format_share};
use surveylens_core::{parse_records, Config, JsonDirSource, SurveyResultSource};

#[derive(Parser, Debug)]
#[command(name = "surveylens-report")]
#[command(about = "Survey dashboard report for one shop")]
#[command(version)]
struct Args {
    /// Read survey results from a JSON file instead of the results directory
    #[arg(long, conflicts_with_all = ["company", "shop"])]
    input: Option<PathBuf>,

    /// Company id (with --shop)
    #[arg(long, requires = "shop")]
    company: Option<String>,

    /// Shop id (with --company)
    #[arg(long, requires = "company")]
    shop: Option<String>,

    /// Time window: 3days, week, month, 3months, custom, all
    #[arg(long)]
    window: Option<WindowKind>,

    /// Custom window start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Custom window end date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Time-series unit: day, week, month, all
    #[arg(long)]
    unit: Option<AggregationUnit>,

    /// Feedback column to sort by
    #[arg(long)]
    sort_key: Option<FeedbackField>,

    /// Sort direction: asc or desc
    #[arg(long)]
    direction: Option<SortDirection>,

    /// Feedback column filter as field=query (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Reference time for relative windows (RFC 3339, default: now)
    #[arg(long)]
    now: Option<String>,

    /// Export format (json = JSON)
    #[arg(long)]
    export: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = surveylens_core::logging::init(&config.logging).ok();

    let records = match (&args.input, &args.company, &args.shop) {
        (Some(path), _, _) => {
            let payload = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_records(&payload).context("failed to parse survey results")?
        }
        (None, Some(company), Some(shop)) => {
            let source = JsonDirSource::new(config.source.results_dir());
            source
                .fetch(company, shop)
                .context("failed to fetch survey results")?
        }
        _ => anyhow::bail!("Specify --input <file> or --company <id> --shop <id>"),
    };

    let controls = build_controls(&args, config.dashboard.default_controls())?;
    let now = match &args.now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --now timestamp: {}", raw))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let mut engine = DashboardAnalyticsEngine::from_config(&config.dashboard)
        .context("invalid dashboard configuration")?;
    engine.load(records);
    let snapshot = engine.snapshot(&controls, now);

    match args.export.as_deref() {
        Some("json") => print_json(&snapshot)?,
        Some(other) => anyhow::bail!("Unknown export format: {}. Use 'json'", other),
        None => print_terminal(&snapshot),
    }

    Ok(())
}

fn build_controls(args: &Args, mut controls: DashboardControls) -> Result<DashboardControls> {
    if let Some(window) = args.window {
        controls.window = window;
    }
    if args.start.is_some() || args.end.is_some() {
        let (Some(start), Some(end)) = (&args.start, &args.end) else {
            anyhow::bail!("--start and --end must be given together");
        };
        controls.custom_range = CustomRange::new(start.as_str(), end.as_str());
        if args.window.is_none() {
            controls.window = WindowKind::Custom;
        }
    }
    if let Some(unit) = args.unit {
        controls.aggregation_unit = unit;
    }
    if let Some(key) = args.sort_key {
        controls.sort_key = key;
    }
    if let Some(direction) = args.direction {
        controls.sort_direction = direction;
    }
    for filter in &args.filters {
        let (field, query) = filter
            .split_once('=')
            .with_context(|| format!("Invalid filter {:?}. Use field=query", filter))?;
        let field: FeedbackField = field.trim().parse().map_err(anyhow::Error::msg)?;
        controls.set_filter(field, query);
    }
    Ok(controls)
}

fn print_terminal(snapshot: &DashboardSnapshot) {
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", "SURVEY DASHBOARD");
    println!("╰{}╯", "─".repeat(60));
    println!(
        "   Window: {:<14} Unit: {}",
        snapshot.window.kind().label(),
        snapshot.aggregation_unit.as_str()
    );
    println!();

    if snapshot.is_empty() {
        println!("  No survey results yet.");
        println!();
        return;
    }

    for panel in &snapshot.panels {
        print_panel(panel);
    }

    print_feedback(snapshot);

    let diagnostics = &snapshot.diagnostics;
    println!("DIAGNOSTICS");
    println!(
        "   Records: {:<10} In window: {}",
        diagnostics.total_records, diagnostics.windowed_records
    );
    println!(
        "   Bad timestamps: {:<3} Duplicate feedback: {}",
        diagnostics.malformed_timestamps, diagnostics.duplicate_feedback_rows
    );
    println!();
}

fn print_panel(panel: &QuestionPanel) {
    let title = if panel.question.text.is_empty() {
        panel.question.id.as_str()
    } else {
        panel.question.text.as_str()
    };
    println!("{}", title.to_uppercase());

    if panel.answers.is_empty() {
        println!("   No responses in this window.");
        println!();
        return;
    }

    let total = total_answers(&panel.answers);
    for answer in &panel.answers {
        let share = answer.share(total);
        println!(
            "   {:<24} {:>5}  {:>6}  {}",
            truncate(&answer.option, 24),
            answer.count,
            format_share(share, 1),
            bar(share, 20)
        );
    }

    if !panel.series.is_empty() {
        let ticks: Vec<String> = panel
            .series
            .iter()
            .map(|p| format!("{} {}", format_bucket_tick(&p.bucket_label), p.count))
            .collect();
        println!("   Over time: {}", ticks.join(" · "));
    }
    println!();
}

fn print_feedback(snapshot: &DashboardSnapshot) {
    let feedback = &snapshot.feedback;

    println!("FEEDBACK");
    if feedback.rows.is_empty() {
        println!("   No feedback in this window.");
    } else {
        println!("   {:<16}  {:>4}  {}", "Answered", "Star", "Comment");
        for row in &feedback.rows {
            println!(
                "   {:<16}  {:>4}  {}",
                row.answer_time_display,
                row.star_display,
                truncate(&row.comment_display, 50)
            );
        }
    }
    println!();

    if !feedback.star_histogram.is_empty() {
        println!("STARS");
        for (star, count) in feedback.star_histogram.iter() {
            let share = feedback.star_histogram.share(star);
            println!(
                "   {:<5} {:>5}  {:>6}  {}",
                "★".repeat(star as usize),
                count,
                format_share(share, 1),
                bar(share, 20)
            );
        }
        if let Some(average) = feedback.star_histogram.average() {
            println!("   Average: {:.2}", average);
        }
        println!();
    }
}

fn print_json(snapshot: &DashboardSnapshot) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

fn bar(share: f64, width: usize) -> String {
    let filled = (share * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
