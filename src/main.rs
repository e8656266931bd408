// src/main.rs

mod cli;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use cli::Args;
use git_strata::config::PipelineConfig;
use git_strata::health::HealthCategory;
use git_strata::pipeline::{PipelineInput, PipelineOutput, PipelineRunner};
use git_strata::temporal::ScrubberPosition;
use git_strata::{analyzer, time_bin};
use serde::Serialize;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    output: &'a PipelineOutput,
    temporal: Vec<git_strata::temporal::TemporalFileView<'a>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let config = args.apply(config);
    config.validate()?;

    let history = analyzer::analyze(&args.repo, !args.quiet)
        .with_context(|| format!("failed to analyze repository at {}", args.repo.display()))?;
    println!(
        "Analysis finished in {:.2?}. Found {} events in {} commits.",
        start_time.elapsed(),
        history.events.len(),
        history.commits_analyzed
    );
    if let (Some(start), Some(end)) = (
        DateTime::from_timestamp(history.start_time, 0),
        DateTime::from_timestamp(history.end_time, 0),
    ) {
        println!("Repository history spans from {} to {}.", start.to_rfc2822(), end.to_rfc2822());
    }

    let threshold = config.coupling.threshold;
    let top_partners = config.coupling.top_partners;
    let scrubber = ScrubberPosition::new(config.scrubber_position);
    let granularity = config.granularity;

    let runner = PipelineRunner::new(config);
    let output = runner.submit(Arc::new(PipelineInput::from_events(history.events))).join()?;
    print_summary(&output, scrubber, threshold, top_partners, granularity)?;

    if let Some(path) = &args.json {
        let report = Report { output: &output, temporal: output.temporal_view(scrubber) };
        fs::write(path, serde_json::to_vec_pretty(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn print_summary(
    output: &PipelineOutput,
    scrubber: ScrubberPosition,
    threshold: f64,
    top_partners: usize,
    granularity: time_bin::Granularity,
) -> Result<()> {
    let root = output.tree.root();
    println!("\nTree: {} nodes, {} files, {} events", output.tree.len(), root.file_count, root.event_count);

    let grid = &output.activity;
    println!(
        "Activity: {} directories x {} {:?} bins (max {:?} per cell {})",
        grid.directories.len(),
        grid.bins.len(),
        granularity,
        grid.metric,
        grid.max_value
    );
    for (row, directory) in grid.directories.iter().enumerate() {
        let busiest = grid.cells[row].iter().max_by_key(|cell| cell.value(grid.metric));
        let label = match busiest {
            Some(cell) => time_bin::label(cell.bin_start, granularity)?,
            None => "-".to_string(),
        };
        let path = if directory.path.is_empty() { "/" } else { directory.path.as_str() };
        println!("  {:<40} {:>6} events, busiest {}", path, directory.total, label);
    }

    let mut coupled: Vec<(&str, f64)> = output
        .coupling
        .files()
        .map(|file| (file, output.coupling.metrics(file).max_strength))
        .filter(|&(_, strength)| strength > threshold)
        .collect();
    coupled.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    println!("Coupling: {} files with partners above {:.2}", coupled.len(), threshold);
    for (file, _) in coupled.iter().take(top_partners) {
        let partners: Vec<String> = output
            .coupling
            .partners_above(file, threshold)
            .take(3)
            .map(|p| format!("{} ({:.2})", p.path, p.strength))
            .collect();
        println!("  {:<40} {}", file, partners.join(", "));
    }

    let mut critical: Vec<_> = output
        .files
        .iter()
        .filter(|f| f.lifecycle.is_alive() && f.health.category == HealthCategory::Critical)
        .collect();
    critical.sort_by_key(|f| (f.health.score, f.lifecycle.path.clone()));
    println!("Health: {} files, {} critical", output.files.len(), critical.len());
    for file in critical.iter().take(10) {
        println!("  {:<40} {:>3}  {}", file.lifecycle.path, file.health.score, file.insight);
    }

    let views = output.temporal_view(scrubber);
    let visible = views.iter().filter(|v| v.is_visible).count();
    let dormant = views.iter().filter(|v| v.is_dormant).count();
    println!(
        "Timeline at {:.0}%: {} of {} files visible, {} dormant",
        scrubber.value(),
        visible,
        views.len(),
        dormant
    );

    let warnings = output.warning_count();
    if warnings > 0 {
        println!("Warnings: {} records dropped or flagged", warnings);
    }
    Ok(())
}
