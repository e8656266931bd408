// src/cli.rs

use clap::Parser;
use git_strata::activity::ActivityMetric;
use git_strata::config::PipelineConfig;
use git_strata::time_bin::Granularity;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the git repository to analyze
    #[arg(short, long)]
    pub repo: PathBuf,

    /// TOML file with pipeline settings; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Width of the activity time bins
    #[arg(long, value_enum)]
    pub granularity: Option<Granularity>,

    /// Metric used to scale activity cells
    #[arg(long, value_enum)]
    pub metric: Option<ActivityMetric>,

    /// Number of directories kept in the activity grid
    #[arg(long)]
    pub top_dirs: Option<usize>,

    /// Include empty bins between the first and last activity
    #[arg(long)]
    pub fill_gaps: bool,

    /// Timeline position (0-100) for the visibility summary
    #[arg(long)]
    pub scrubber: Option<f64>,

    /// Minimum coupling strength reported for a file pair
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Write all derived views as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(granularity) = self.granularity {
            config.granularity = granularity;
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(top_dirs) = self.top_dirs {
            config.top_directories = top_dirs;
        }
        if self.fill_gaps {
            config.fill_gaps = true;
        }
        if let Some(scrubber) = self.scrubber {
            config.scrubber_position = scrubber;
        }
        if let Some(threshold) = self.threshold {
            config.coupling.threshold = threshold;
        }
        config
    }
}
