//! Cross-project standardization of one metric: quartile letter-ranks and
//! deviation scores (mean 50, spread 10 per standard deviation), computed
//! per project column so differently-scaled projects become comparable.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::stats;
use crate::table::{Cell, ColumnKey, Metric, MetricTable, Phase};

/// One user's value of a single metric in a single project, plus the
/// activity figures thresholds are checked against.
#[derive(Debug, Clone)]
pub struct RatingSample {
    pub project_id: String,
    pub account_id: String,
    pub biography: Option<String>,
    pub value: Cell,
    /// Monitored worktime the user spent on the project.
    pub worktime_hour: f64,
    /// Annotation tasks the user worked on the project.
    pub task_count: f64,
}

/// Minimum activity for a sample to contribute to a project's statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingThresholds {
    pub min_worktime_hour: f64,
    pub min_task_count: f64,
}

/// Configuration for rank and deviation computation.
#[derive(Debug, Clone)]
pub struct StandardizeOptions {
    /// Deviation columns need strictly more than this many contributing
    /// values; at or below it the whole column is unranked.
    pub min_sample_count: usize,
    /// Per-project activity thresholds; projects without an entry accept
    /// every sample.
    pub thresholds: HashMap<String, RatingThresholds>,
    /// Users whose biography is listed here are dropped entirely before any
    /// statistics.
    pub exclude_biographies: Vec<String>,
}

impl Default for StandardizeOptions {
    fn default() -> Self {
        StandardizeOptions {
            min_sample_count: 3,
            thresholds: HashMap::new(),
            exclude_biographies: Vec::new(),
        }
    }
}

/// Quartile letter-rank of a value within its project column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rank {
    A,
    B,
    C,
    D,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's letter-ranks across projects. Projects where the user was
/// excluded or the column was unrankable carry `None`.
#[derive(Debug, Clone, Serialize)]
pub struct RankRow {
    pub account_id: String,
    pub ranks: BTreeMap<String, Option<Rank>>,
}

/// One user's deviation scores across projects, with their mean and the
/// count of projects that produced a score.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationRow {
    pub account_id: String,
    pub scores: BTreeMap<String, Option<f64>>,
    pub mean: Option<f64>,
    pub project_count: usize,
}

fn biography_excluded(sample: &RatingSample, options: &StandardizeOptions) -> bool {
    sample
        .biography
        .as_ref()
        .is_some_and(|b| options.exclude_biographies.contains(b))
}

/// Whether a sample contributes to its project's statistics: it must carry
/// a numeric value and clear the project's activity thresholds.
fn contributes(sample: &RatingSample, options: &StandardizeOptions) -> bool {
    if !sample.value.is_number() {
        return false;
    }
    match options.thresholds.get(&sample.project_id) {
        Some(t) => {
            sample.worktime_hour >= t.min_worktime_hour && sample.task_count >= t.min_task_count
        }
        None => true,
    }
}

/// Retained samples grouped by project, after biography exclusion.
fn by_project<'a>(
    samples: &'a [RatingSample],
    options: &StandardizeOptions,
) -> BTreeMap<&'a str, Vec<&'a RatingSample>> {
    let mut grouped: BTreeMap<&str, Vec<&RatingSample>> = BTreeMap::new();
    for s in samples {
        if biography_excluded(s, options) {
            continue;
        }
        grouped.entry(s.project_id.as_str()).or_default().push(s);
    }
    grouped
}

fn account_ids<'a>(grouped: &BTreeMap<&'a str, Vec<&'a RatingSample>>) -> BTreeSet<&'a str> {
    grouped
        .values()
        .flatten()
        .map(|s| s.account_id.as_str())
        .collect()
}

/// Letter-ranks per project column. A column needs at least 4 contributing
/// values; below that every value in the column is unranked.
pub fn quartile_ranks(samples: &[RatingSample], options: &StandardizeOptions) -> Vec<RankRow> {
    let grouped = by_project(samples, options);
    let accounts = account_ids(&grouped);

    let mut rows: BTreeMap<&str, RankRow> = accounts
        .iter()
        .map(|&a| {
            (
                a,
                RankRow {
                    account_id: a.to_string(),
                    ranks: BTreeMap::new(),
                },
            )
        })
        .collect();

    for (project, project_samples) in &grouped {
        let mut values: Vec<f64> = project_samples
            .iter()
            .filter(|s| contributes(s, options))
            .filter_map(|s| s.value.number())
            .collect();
        values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());

        let quartiles = if values.len() >= 4 {
            Some((
                stats::quantile_sorted(&values, 0.25).unwrap(),
                stats::quantile_sorted(&values, 0.50).unwrap(),
                stats::quantile_sorted(&values, 0.75).unwrap(),
            ))
        } else {
            log::debug!(
                "project {project}: {} contributing values, below the 4 needed for ranking",
                values.len()
            );
            None
        };

        for s in project_samples {
            let rank = match (&quartiles, s.value.number()) {
                (&Some((q1, q2, q3)), Some(v)) if contributes(s, options) => Some(if v < q1 {
                    Rank::A
                } else if v < q2 {
                    Rank::B
                } else if v < q3 {
                    Rank::C
                } else {
                    Rank::D
                }),
                _ => None,
            };
            if let Some(row) = rows.get_mut(s.account_id.as_str()) {
                row.ranks.insert(project.to_string(), rank);
            }
        }
    }

    rows.into_values().collect()
}

/// Deviation scores per project column: `(x - mean) / std * 10 + 50` with
/// population standard deviation. A column with too few values is unranked;
/// a column where every value agrees (std exactly 0) scores 50 everywhere.
pub fn deviation_scores(
    samples: &[RatingSample],
    options: &StandardizeOptions,
) -> Vec<DeviationRow> {
    let grouped = by_project(samples, options);
    let accounts = account_ids(&grouped);

    let mut rows: BTreeMap<&str, DeviationRow> = accounts
        .iter()
        .map(|&a| {
            (
                a,
                DeviationRow {
                    account_id: a.to_string(),
                    scores: BTreeMap::new(),
                    mean: None,
                    project_count: 0,
                },
            )
        })
        .collect();

    enum ColumnStats {
        Unranked,
        Degenerate,
        Spread { mean: f64, std: f64 },
    }

    for (project, project_samples) in &grouped {
        let values: Vec<f64> = project_samples
            .iter()
            .filter(|s| contributes(s, options))
            .filter_map(|s| s.value.number())
            .collect();

        let column = if values.len() <= options.min_sample_count {
            log::debug!(
                "project {project}: {} contributing values, at or below the minimum of {}",
                values.len(),
                options.min_sample_count
            );
            ColumnStats::Unranked
        } else {
            let mean = stats::mean(&values).unwrap();
            let std = stats::population_std_dev(&values).unwrap();
            if std == 0.0 {
                let all_equal = values.iter().all(|&v| v == values[0]);
                if all_equal {
                    ColumnStats::Degenerate
                } else {
                    // Float underflow only; treat as unrankable
                    ColumnStats::Unranked
                }
            } else {
                ColumnStats::Spread { mean, std }
            }
        };

        for s in project_samples {
            let score = match (&column, s.value.number()) {
                (ColumnStats::Degenerate, Some(_)) if contributes(s, options) => Some(50.0),
                (ColumnStats::Spread { mean, std }, Some(v)) if contributes(s, options) => {
                    Some((v - mean) / std * 10.0 + 50.0)
                }
                _ => None,
            };
            if let Some(row) = rows.get_mut(s.account_id.as_str()) {
                row.scores.insert(project.to_string(), score);
            }
        }
    }

    let mut result: Vec<DeviationRow> = rows.into_values().collect();
    for row in &mut result {
        let scored: Vec<f64> = row.scores.values().flatten().copied().collect();
        row.project_count = scored.len();
        row.mean = stats::mean(&scored);
    }
    result
}

/// Extracts rating samples for one metric column from a derived per-user
/// table. Activity figures come from the monitored-worktime total and the
/// annotation-phase task count.
pub fn samples_from_table(
    table: &MetricTable,
    project_id: &str,
    metric: ColumnKey,
) -> Vec<RatingSample> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let account_id = row.key().account_id()?.to_string();
            Some(RatingSample {
                project_id: project_id.to_string(),
                account_id,
                biography: row.attrs.biography.clone(),
                value: table.cell(i, metric),
                worktime_hour: table
                    .cell(i, ColumnKey::sum(Metric::MonitoredWorktimeHour))
                    .number()
                    .unwrap_or(0.0),
                task_count: table
                    .cell(i, ColumnKey::phase(Metric::TaskCount, Phase::Annotation))
                    .number()
                    .unwrap_or(0.0),
            })
        })
        .collect()
}
