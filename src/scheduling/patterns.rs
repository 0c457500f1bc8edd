//! Historical pattern analytics over the completion archive.
//!
//! Every function is pure and takes the archive in archive-id order; that
//! order decides mode tie-breaks (see [`Tally`]).

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::models::{ArchivedTask, Priority};

/// Insertion-ordered frequency counter.
///
/// [`Tally::mode`] returns the first-encountered key among those with the
/// highest count, so ties resolve in favour of whatever appeared earliest
/// in the input.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    counts: Vec<(K, usize)>,
}

impl<K> Default for Tally<K> {
    fn default() -> Self {
        Self { counts: Vec::new() }
    }
}

impl<K: PartialEq> Tally<K> {
    /// Count one occurrence of `key`.
    pub fn add(&mut self, key: K) {
        if let Some((_, count)) = self.counts.iter_mut().find(|(k, _)| *k == key) {
            *count += 1;
        } else {
            self.counts.push((key, 1));
        }
    }

    /// Most frequent key; earliest first occurrence wins ties.
    #[must_use]
    pub fn mode(&self) -> Option<&K> {
        let mut best: Option<&(K, usize)> = None;
        for entry in &self.counts {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, _)| key)
    }

    /// Total number of occurrences counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Distinct keys with their counts, in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.counts.iter().map(|(k, n)| (k, *n))
    }
}

impl<K: PartialEq> FromIterator<K> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::default();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}

/// Estimated-versus-actual statistics for one category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EstimationStats {
    /// Archived tasks with a recorded actual duration.
    pub sample_size: usize,
    /// Mean estimated minutes, one decimal.
    pub avg_estimated_minutes: f64,
    /// Mean actual minutes, one decimal.
    pub avg_actual_minutes: f64,
    /// `avg_actual / avg_estimated`, two decimals; `1.0` when nothing was estimated.
    pub suggested_multiplier: f64,
}

/// Per-category estimation accuracy over archived tasks that have an
/// actual duration. Categories without such tasks are absent.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Minute sums and sample counts stay far below 2^52.
pub fn estimation_accuracy(archive: &[ArchivedTask]) -> BTreeMap<String, EstimationStats> {
    let mut groups: BTreeMap<&str, (usize, u64, i64)> = BTreeMap::new();
    for task in archive {
        let Some(actual) = task.actual_duration_minutes else {
            continue;
        };
        let estimated = u64::from(task.effort.minutes());
        let entry = groups.entry(task.category.as_str()).or_default();
        entry.0 += 1;
        entry.1 += estimated;
        entry.2 += actual;
    }

    groups
        .into_iter()
        .map(|(category, (n, estimated, actual))| {
            let avg_estimated = estimated as f64 / n as f64;
            let avg_actual = actual as f64 / n as f64;
            let multiplier = if avg_estimated > 0.0 {
                round_to(avg_actual / avg_estimated, 2)
            } else {
                1.0
            };
            (
                category.to_owned(),
                EstimationStats {
                    sample_size: n,
                    avg_estimated_minutes: round_to(avg_estimated, 1),
                    avg_actual_minutes: round_to(avg_actual, 1),
                    suggested_multiplier: multiplier,
                },
            )
        })
        .collect()
}

/// Just the per-category multipliers of [`estimation_accuracy`].
#[must_use]
pub fn estimation_multipliers(archive: &[ArchivedTask]) -> BTreeMap<String, f64> {
    estimation_accuracy(archive)
        .into_iter()
        .map(|(category, stats)| (category, stats.suggested_multiplier))
        .collect()
}

/// Completion-hour histogram for one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionPattern {
    /// Hour of day (0-23) with the most completions.
    pub most_common_hour: Option<u32>,
    /// Completions per hour of day.
    pub hour_distribution: BTreeMap<u32, usize>,
    /// Archived tasks in the category.
    pub sample_size: usize,
}

/// Per-category completion-hour patterns over the whole archive.
#[must_use]
pub fn completion_patterns(archive: &[ArchivedTask]) -> BTreeMap<String, CompletionPattern> {
    let mut groups: BTreeMap<&str, Tally<u32>> = BTreeMap::new();
    for task in archive {
        groups
            .entry(task.category.as_str())
            .or_default()
            .add(task.completed_at.hour());
    }

    groups
        .into_iter()
        .map(|(category, hours)| {
            (
                category.to_owned(),
                CompletionPattern {
                    most_common_hour: hours.mode().copied(),
                    hour_distribution: hours.iter().map(|(h, n)| (*h, n)).collect(),
                    sample_size: hours.total(),
                },
            )
        })
        .collect()
}

/// How much history backs a priority suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Ten or more matching tasks.
    High,
    /// Four to nine.
    Medium,
    /// One to three.
    Low,
    /// No history.
    None,
}

impl Confidence {
    /// Confidence level for a sample of `n` tasks.
    #[must_use]
    pub fn from_sample_size(n: usize) -> Self {
        match n {
            10.. => Self::High,
            4..=9 => Self::Medium,
            1..=3 => Self::Low,
            0 => Self::None,
        }
    }
}

/// Suggested priority for new work in a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrioritySuggestion {
    /// Category the suggestion applies to.
    pub category: String,
    /// Most common historical priority, absent without history.
    pub suggested_priority: Option<Priority>,
    /// Confidence derived from the sample size.
    pub confidence: Confidence,
    /// Matching archived tasks.
    pub sample_size: usize,
    /// Matching tasks per priority.
    pub priority_distribution: BTreeMap<Priority, usize>,
}

/// Suggest a priority from archived tasks of exactly `category`, optionally
/// narrowed to those whose title or description contains `keyword`
/// (case-insensitive). An empty keyword does not filter.
#[must_use]
pub fn priority_suggestion(
    archive: &[ArchivedTask],
    category: &str,
    keyword: Option<&str>,
) -> PrioritySuggestion {
    let needle = keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase);

    let tally: Tally<Priority> = archive
        .iter()
        .filter(|task| task.category == category)
        .filter(|task| {
            needle.as_deref().is_none_or(|needle| {
                task.title.to_lowercase().contains(needle)
                    || task.description.to_lowercase().contains(needle)
            })
        })
        .map(|task| task.priority)
        .collect();

    let sample_size = tally.total();
    PrioritySuggestion {
        category: category.to_owned(),
        suggested_priority: tally.mode().copied(),
        confidence: Confidence::from_sample_size(sample_size),
        sample_size,
        priority_distribution: tally.iter().map(|(p, n)| (*p, n)).collect(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
