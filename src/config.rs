// src/config.rs

use crate::activity::{ActivityMetric, AggregateOptions, DEFAULT_TOP_DIRECTORIES, DEFAULT_TOP_N};
use crate::coupling::{EdgeOptions, STRONG_COUPLING};
use crate::error::{Result, StrataError};
use crate::time_bin::Granularity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    pub min_co_changes: usize,
    pub max_files_per_commit: usize,
    /// Partners at or below this strength are hidden from reports
    pub threshold: f64,
    pub top_partners: usize,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        let edges = EdgeOptions::default();
        Self {
            min_co_changes: edges.min_co_changes,
            max_files_per_commit: edges.max_files_per_commit,
            threshold: STRONG_COUPLING,
            top_partners: 10,
        }
    }
}

/// Parameters of one pipeline run, usually read from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub granularity: Granularity,
    pub metric: ActivityMetric,
    pub top_directories: usize,
    pub top_n: usize,
    pub fill_gaps: bool,
    pub scrubber_position: f64,
    pub coupling: CouplingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            metric: ActivityMetric::default(),
            top_directories: DEFAULT_TOP_DIRECTORIES,
            top_n: DEFAULT_TOP_N,
            fill_gaps: false,
            scrubber_position: 100.0,
            coupling: CouplingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| StrataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_directories == 0 {
            return Err(StrataError::Config("top_directories must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.coupling.threshold) {
            return Err(StrataError::Config(format!(
                "coupling.threshold must be within [0, 1], got {}",
                self.coupling.threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.scrubber_position) {
            return Err(StrataError::Config(format!(
                "scrubber_position must be within [0, 100], got {}",
                self.scrubber_position
            )));
        }
        Ok(())
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            granularity: self.granularity,
            metric: self.metric,
            top_directories: self.top_directories,
            top_n: self.top_n,
            fill_gaps: self.fill_gaps,
        }
    }

    pub fn edge_options(&self) -> EdgeOptions {
        EdgeOptions {
            min_co_changes: self.coupling.min_co_changes,
            max_files_per_commit: self.coupling.max_files_per_commit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = PipelineConfig::from_toml(
            r#"
            granularity = "month"
            metric = "authors"

            [coupling]
            threshold = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(config.granularity, Granularity::Month);
        assert_eq!(config.metric, ActivityMetric::Authors);
        assert_eq!(config.coupling.threshold, 0.7);
        assert_eq!(config.coupling.min_co_changes, 2);
        assert_eq!(config.top_directories, 20);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(PipelineConfig::from_toml("top_directories = 0"), Err(StrataError::Config(_))));
        assert!(matches!(
            PipelineConfig::from_toml("[coupling]\nthreshold = 2.0"),
            Err(StrataError::Config(_))
        ));
        assert!(matches!(PipelineConfig::from_toml("granularity = \"decade\""), Err(StrataError::Config(_))));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, "fill_gaps = true\n").unwrap();
        assert!(PipelineConfig::load(&path).unwrap().fill_gaps);
        assert!(matches!(PipelineConfig::load(&dir.path().join("missing.toml")), Err(StrataError::Io(_))));
    }
}
