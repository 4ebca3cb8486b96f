use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use participation_prep::config::{self, Overrides, Settings};
use participation_prep::models::Metrics;
use participation_prep::pipeline;
use participation_prep::summary::{self, GroupStats};

#[derive(Parser)]
#[command(
    name = "participation_prep",
    about = "Normalize forum participation posts into a static JSON dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (TOML); missing is fine
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Raw thread array
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,
    /// Attachment manifest
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,
    /// Processed dataset path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Summary artifact path (written with --insights)
    #[arg(long, global = true)]
    summary_output: Option<PathBuf>,
    /// Also write per-homework and per-model aggregates
    #[arg(long, global = true)]
    insights: bool,
    /// Course id used in deep links
    #[arg(long, global = true)]
    course_id: Option<u64>,
    /// Forum base URL for deep links
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Forum region path segment (e.g. "us")
    #[arg(long, global = true)]
    region: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process raw threads into the published dataset (default)
    Run,
    /// Homework and model tables for an already written dataset
    Overview {
        /// Max rows per table
        #[arg(short = 'n', long, default_value = "30")]
        limit: usize,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            input: self.input.clone(),
            manifest: self.manifest.clone(),
            output: self.output.clone(),
            summary_output: self.summary_output.clone(),
            insights: self.insights.then_some(true),
            course_id: self.course_id,
            base_url: self.base_url.clone(),
            region: self.region.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = config::load_settings(&cli.config, &cli.overrides())
        .with_context(|| format!("loading settings ({})", cli.config.display()))?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&settings),
        Commands::Overview { limit } => overview(&settings, limit),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run(settings: &Settings) -> anyhow::Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let report = pipeline::run(settings, &pb)
        .with_context(|| format!("processing {}", settings.input.display()))?;

    println!(
        "Processed {} records: {} posts written, {} skipped.",
        report.total_records,
        report.posts_written,
        report.skipped.len()
    );
    for s in &report.skipped {
        println!(
            "  skipped #{} (id {}): {}",
            s.index,
            s.id.as_deref().unwrap_or("-"),
            s.reason
        );
    }
    println!("Dataset: {}", report.output.display());
    if let Some(path) = &report.summary_output {
        println!("Summary: {}", path.display());
    }
    Ok(())
}

/// Only the metrics block of each published post is needed here.
#[derive(Deserialize)]
struct MetricsOnly {
    metrics: Metrics,
}

fn overview(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let path = &settings.output;
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading {} (run the pipeline first)", path.display()))?;
    let rows: Vec<MetricsOnly> = serde_json::from_str(&body)
        .with_context(|| format!("parsing {}", path.display()))?;
    if rows.is_empty() {
        println!("No posts in {}.", path.display());
        return Ok(());
    }

    let s = summary::summarize(rows.iter().map(|r| &r.metrics));

    println!("--- Homework ---");
    print_table("Homework", &s.homework_in_order(), limit);
    println!("\n--- Models ---");
    print_table("Model", &s.models_by_count(), limit);

    let unlabelled = rows.iter().filter(|r| r.metrics.homework_id.is_none()).count();
    let no_model = rows.iter().filter(|r| r.metrics.model_name.is_none()).count();
    println!(
        "\n{} posts | {} without homework | {} without model",
        s.total_posts, unlabelled, no_model
    );
    Ok(())
}

fn print_table(label: &str, groups: &[(&String, &GroupStats)], limit: usize) {
    println!(
        "{:>3} | {:<22} | {:>5} | {:>9} | {:<14} | {:<14} | {:<20}",
        "#", label, "Posts", "Avg words", "Depth l/m/h", "Action l/m/h", "Top focus"
    );
    println!("{}", "-".repeat(105));

    for (i, (name, g)) in groups.iter().take(limit).enumerate() {
        let top_focus = g
            .focus
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(f, _)| f.as_str())
            .unwrap_or("-");
        println!(
            "{:>3} | {:<22} | {:>5} | {:>9.0} | {:<14} | {:<14} | {:<20}",
            i + 1,
            truncate(name, 22),
            g.post_count,
            g.mean_words(),
            buckets(&g.depth),
            buckets(&g.actionability),
            truncate(top_focus, 20)
        );
    }
    if groups.len() > limit {
        println!("... {} more", groups.len() - limit);
    }
}

fn buckets(counts: &std::collections::BTreeMap<String, usize>) -> String {
    let get = |k: &str| counts.get(k).copied().unwrap_or(0);
    format!("{}/{}/{}", get("low"), get("medium"), get("high"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
