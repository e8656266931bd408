// src/health.rs

//! Per-file health score.
//!
//! The score is a weighted blend of three sub-scores, each on a 0-100 scale:
//!
//! | factor  | weight | input                          |
//! |---------|--------|--------------------------------|
//! | churn   | 40%    | share of operations that are modifications |
//! | authors | 30%    | distinct authors               |
//! | age     | 30%    | days since last modification   |
//!
//! Churn curve (c = churn rate):
//! - `c <= 0.3`: 100 down to 90
//! - `0.3 < c <= 0.5`: 90 down to 70
//! - `0.5 < c <= 0.7`: 70 down to 40
//! - `c > 0.7`: 40 down to 0, reached at `c = 0.9`
//!
//! Author curve (n = authors): 0, 30, 60 for n = 0, 1, 2; then +10 per author
//! up to 90 at n = 5; beyond that `90 + 10 * log10(n - 4)`, capped at 100.
//!
//! Age curve (d = dormant days): 100 at d = 0; 100 to 90 over the first 180
//! days; 90 to 80 up to day 365; past a year the score drops into a band
//! that starts at 70 and decays toward 60 with a one-year time constant.
//! The band goes below 70 on purpose, so a heavily churned single-author
//! file dormant for more than a year still lands in the critical range.
//!
//! Composite `<= 30` is critical, `<= 60` medium, anything else healthy.

use serde::{Deserialize, Serialize};

pub const CHURN_WEIGHT: f64 = 0.4;
pub const AUTHOR_WEIGHT: f64 = 0.3;
pub const AGE_WEIGHT: f64 = 0.3;

pub const CRITICAL_MAX: u8 = 30;
pub const MEDIUM_MAX: u8 = 60;

/// Days without modification after which a file counts as dormant.
pub const DORMANT_DAYS: i64 = 180;
/// Days without modification after which a file counts as abandoned.
pub const STALE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.modified + self.added + self.deleted + self.renamed
    }

    /// Share of operations that are modifications; 0 with no operations.
    pub fn churn_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.modified as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub total_commits: usize,
    pub unique_authors: usize,
    pub operations: OperationCounts,
    pub age_days: i64,
    pub days_since_last_modified: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Critical,
    Medium,
    Healthy,
}

impl HealthCategory {
    pub fn from_score(score: u8) -> Self {
        if score <= CRITICAL_MAX {
            Self::Critical
        } else if score <= MEDIUM_MAX {
            Self::Medium
        } else {
            Self::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusFactor {
    HighRisk,
    MediumRisk,
    LowRisk,
}

impl BusFactor {
    pub fn from_authors(authors: usize) -> Self {
        match authors {
            0 | 1 => Self::HighRisk,
            2 | 3 => Self::MediumRisk,
            _ => Self::LowRisk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactor {
    pub score: f64,
    pub weight: f64,
}

impl WeightedFactor {
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthFactors {
    pub churn: WeightedFactor,
    pub authors: WeightedFactor,
    pub age: WeightedFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreResult {
    pub score: u8,
    pub category: HealthCategory,
    pub churn_rate: f64,
    pub bus_factor: BusFactor,
    pub days_since_last_modified: i64,
    pub factors: HealthFactors,
}

/// Linear interpolation of `x` in `[x0, x1]` onto `[y0, y1]`.
fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

pub fn churn_score(churn_rate: f64) -> f64 {
    let c = churn_rate.clamp(0.0, 1.0);
    let score = if c <= 0.3 {
        lerp(c, 0.0, 0.3, 100.0, 90.0)
    } else if c <= 0.5 {
        lerp(c, 0.3, 0.5, 90.0, 70.0)
    } else if c <= 0.7 {
        lerp(c, 0.5, 0.7, 70.0, 40.0)
    } else {
        lerp(c, 0.7, 0.9, 40.0, 0.0)
    };
    score.clamp(0.0, 100.0)
}

pub fn author_score(authors: usize) -> f64 {
    match authors {
        0 => 0.0,
        1 => 30.0,
        2 => 60.0,
        3..=5 => 60.0 + 10.0 * (authors - 2) as f64,
        _ => (90.0 + 10.0 * ((authors - 4) as f64).log10()).min(100.0),
    }
}

pub fn age_score(days_since_last_modified: i64) -> f64 {
    let d = days_since_last_modified as f64;
    if days_since_last_modified <= 0 {
        100.0
    } else if days_since_last_modified <= DORMANT_DAYS {
        lerp(d, 0.0, 180.0, 100.0, 90.0)
    } else if days_since_last_modified <= STALE_DAYS {
        lerp(d, 180.0, 365.0, 90.0, 80.0)
    } else {
        60.0 + 10.0 * (-(d - 365.0) / 365.0).exp()
    }
}

/// Scores one file.
pub fn score(inputs: &HealthInputs) -> HealthScoreResult {
    let churn_rate = inputs.operations.churn_rate();
    let factors = HealthFactors {
        churn: WeightedFactor { score: churn_score(churn_rate), weight: CHURN_WEIGHT },
        authors: WeightedFactor { score: author_score(inputs.unique_authors), weight: AUTHOR_WEIGHT },
        age: WeightedFactor { score: age_score(inputs.days_since_last_modified), weight: AGE_WEIGHT },
    };
    let composite = factors.churn.contribution() + factors.authors.contribution() + factors.age.contribution();
    let score = composite.round().clamp(0.0, 100.0) as u8;

    HealthScoreResult {
        score,
        category: HealthCategory::from_score(score),
        churn_rate,
        bus_factor: BusFactor::from_authors(inputs.unique_authors),
        days_since_last_modified: inputs.days_since_last_modified,
        factors,
    }
}

struct InsightRule {
    applies: fn(&HealthScoreResult) -> bool,
    message: &'static str,
}

fn is_critical(r: &HealthScoreResult) -> bool {
    r.category == HealthCategory::Critical
}

fn is_medium(r: &HealthScoreResult) -> bool {
    r.category == HealthCategory::Medium
}

fn single_owner(r: &HealthScoreResult) -> bool {
    r.bus_factor == BusFactor::HighRisk
}

// Checked top to bottom; the first match wins.
const INSIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        applies: |r| is_critical(r) && r.churn_rate > 0.7,
        message: "Critical: almost every change rewrites this file; consider splitting it or stabilizing its API.",
    },
    InsightRule {
        applies: |r| is_critical(r) && single_owner(r),
        message: "Critical: a single author holds all knowledge of this file; share ownership before it blocks work.",
    },
    InsightRule {
        applies: |r| is_critical(r) && r.days_since_last_modified > STALE_DAYS,
        message: "Critical: untouched for over a year; verify it is still needed or schedule a review.",
    },
    InsightRule {
        applies: is_critical,
        message: "Critical: several risk factors combine here; prioritize a review.",
    },
    InsightRule {
        applies: |r| is_medium(r) && r.churn_rate > 0.5,
        message: "Moderate: frequent rework; watch for growing complexity.",
    },
    InsightRule {
        applies: |r| is_medium(r) && single_owner(r),
        message: "Moderate: limited ownership; pair another contributor on upcoming changes.",
    },
    InsightRule {
        applies: |r| is_medium(r) && r.days_since_last_modified > DORMANT_DAYS,
        message: "Moderate: dormant for months; check that it still matches current conventions.",
    },
    InsightRule {
        applies: is_medium,
        message: "Moderate: no single dominant risk; keep an eye on it.",
    },
    InsightRule {
        applies: single_owner,
        message: "Healthy, but maintained by a single author.",
    },
    InsightRule {
        applies: |_| true,
        message: "Healthy: stable, shared and actively maintained.",
    },
];

/// Canned explanation for a score, picked by the first matching rule.
pub fn insight(result: &HealthScoreResult) -> &'static str {
    INSIGHT_RULES
        .iter()
        .find(|rule| (rule.applies)(result))
        .map_or("", |rule| rule.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(m: usize, a: usize, d: usize, authors: usize, dormant: i64) -> HealthInputs {
        HealthInputs {
            total_commits: m + a + d,
            unique_authors: authors,
            operations: OperationCounts { modified: m, added: a, deleted: d, renamed: 0 },
            age_days: dormant + 30,
            days_since_last_modified: dormant,
        }
    }

    #[test]
    fn churn_breakpoints() {
        assert_eq!(churn_score(0.0), 100.0);
        assert!((churn_score(0.3) - 90.0).abs() < 1e-9);
        assert!((churn_score(0.5) - 70.0).abs() < 1e-9);
        assert!((churn_score(0.7) - 40.0).abs() < 1e-9);
        assert!((churn_score(0.8) - 20.0).abs() < 1e-9);
        assert_eq!(churn_score(0.9), 0.0);
        assert_eq!(churn_score(1.0), 0.0);
        assert!((churn_score(0.4) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn author_curve() {
        assert_eq!(author_score(0), 0.0);
        assert_eq!(author_score(1), 30.0);
        assert_eq!(author_score(2), 60.0);
        assert_eq!(author_score(3), 70.0);
        assert_eq!(author_score(5), 90.0);
        assert!(author_score(6) > 90.0 && author_score(6) < 100.0);
        assert_eq!(author_score(14), 100.0);
        assert_eq!(author_score(500), 100.0);
    }

    #[test]
    fn age_curve() {
        assert_eq!(age_score(0), 100.0);
        assert!((age_score(90) - 95.0).abs() < 1e-9);
        assert!((age_score(180) - 90.0).abs() < 1e-9);
        assert!((age_score(365) - 80.0).abs() < 1e-9);
        assert!(age_score(366) <= 70.0);
        assert!(age_score(3650) > 60.0);
        assert!(age_score(730) < age_score(400));
    }

    #[test]
    fn high_churn_single_author_dormant_is_critical() {
        let result = score(&inputs(90, 5, 5, 1, 400));
        assert!((result.churn_rate - 0.9).abs() < 1e-9);
        assert_eq!(result.factors.authors.score, 30.0);
        assert!(result.factors.age.score <= 80.0);
        assert!(result.score <= 30, "score was {}", result.score);
        assert_eq!(result.category, HealthCategory::Critical);
        assert_eq!(result.bus_factor, BusFactor::HighRisk);
        assert!(insight(&result).contains("rewrites"));
    }

    #[test]
    fn healthy_file() {
        let result = score(&inputs(2, 8, 0, 6, 10));
        assert_eq!(result.category, HealthCategory::Healthy);
        assert_eq!(result.bus_factor, BusFactor::LowRisk);
        assert!(insight(&result).starts_with("Healthy:"));
    }

    #[test]
    fn no_operations_means_zero_churn() {
        let result = score(&HealthInputs::default());
        assert_eq!(result.churn_rate, 0.0);
        assert_eq!(result.factors.churn.score, 100.0);
        // 40 (churn) + 0 (authors) + 30 (age)
        assert_eq!(result.score, 70);
    }

    #[test]
    fn weights_sum_to_one() {
        let result = score(&inputs(1, 1, 0, 2, 0));
        let weights = result.factors.churn.weight + result.factors.authors.weight + result.factors.age.weight;
        assert!((weights - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bus_factor_thresholds() {
        assert_eq!(BusFactor::from_authors(0), BusFactor::HighRisk);
        assert_eq!(BusFactor::from_authors(1), BusFactor::HighRisk);
        assert_eq!(BusFactor::from_authors(2), BusFactor::MediumRisk);
        assert_eq!(BusFactor::from_authors(3), BusFactor::MediumRisk);
        assert_eq!(BusFactor::from_authors(4), BusFactor::LowRisk);
    }

    #[test]
    fn category_boundaries() {
        assert_eq!(HealthCategory::from_score(30), HealthCategory::Critical);
        assert_eq!(HealthCategory::from_score(31), HealthCategory::Medium);
        assert_eq!(HealthCategory::from_score(60), HealthCategory::Medium);
        assert_eq!(HealthCategory::from_score(61), HealthCategory::Healthy);
    }

    #[test]
    fn insight_rule_order() {
        // Critical with a single author but low churn: the bus-factor rule fires
        // because the churn rule does not match, even though the file is also stale.
        let result = score(&inputs(1, 9, 0, 1, 2000));
        let critical = HealthScoreResult {
            score: 20,
            category: HealthCategory::Critical,
            churn_rate: 0.1,
            bus_factor: BusFactor::HighRisk,
            days_since_last_modified: 1000,
            factors: result.factors,
        };
        assert!(insight(&critical).contains("single author"));

        let medium_single = HealthScoreResult { category: HealthCategory::Medium, score: 50, ..critical };
        assert!(insight(&medium_single).contains("limited ownership"));
    }
}
