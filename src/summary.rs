use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::EngineError;
use crate::types::{EditKind, GrammarAnalysis, PhonemeAnalysis};

const TOP_N: usize = 5;
const MOST_IMPROVED_PER_THRESHOLD: f64 = 15.0;

/// Aggregate view over a batch of analyses.
#[derive(Debug, Clone, Serialize)]
pub struct WeaknessSummary {
    pub counts: SummaryCounts,
    pub per_sle: Option<MetricDistribution>,
    pub per_strict: Option<MetricDistribution>,
    pub top_substitutions: Vec<PairCount>,
    pub top_insertions: Vec<SymbolCount>,
    pub top_deletions: Vec<SymbolCount>,
    pub pronunciation_weaknesses: Vec<CategoryCount>,
    pub grammar_weaknesses: Vec<CategoryCount>,
    pub edits_per_100w: Option<MetricDistribution>,
    pub latency_ms_p50: Option<u64>,
    pub badge: Badge,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryCounts {
    pub phoneme_attempts: u32,
    pub phoneme_with_reference: u32,
    pub grammar_attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f32,
    pub p50: f32,
    pub p90: f32,
    pub p95: f32,
    pub p99: f32,
}

/// Substitution pair written `expected->observed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCount {
    pub pair: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolCount {
    pub symbol: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    #[serde(rename = "Most Improved")]
    MostImproved,
    #[serde(rename = "Keep Going")]
    KeepGoing,
}

pub fn summarize(phoneme: &[PhonemeAnalysis], grammar: &[GrammarAnalysis]) -> WeaknessSummary {
    let per_sle: Vec<f64> = phoneme
        .iter()
        .filter_map(|a| a.sle.as_ref().map(|s| s.per_sle))
        .collect();
    let per_strict: Vec<f64> = phoneme
        .iter()
        .filter_map(|a| a.align.as_ref().map(|s| s.per_strict))
        .collect();

    let mut substitutions: HashMap<String, u32> = HashMap::new();
    let mut insertions: HashMap<String, u32> = HashMap::new();
    let mut deletions: HashMap<String, u32> = HashMap::new();
    for op in phoneme
        .iter()
        .filter_map(|a| a.align.as_ref())
        .flat_map(|align| align.ops_raw.iter())
    {
        match (op.kind, op.expected.as_deref(), op.observed.as_deref()) {
            (EditKind::Substitute, Some(expected), Some(observed)) => {
                *substitutions.entry(format!("{expected}->{observed}")).or_default() += 1;
            }
            (EditKind::Insert, _, Some(observed)) => {
                *insertions.entry(observed.to_string()).or_default() += 1;
            }
            (EditKind::Delete, Some(expected), _) => {
                *deletions.entry(expected.to_string()).or_default() += 1;
            }
            _ => {}
        }
    }

    let mut pronunciation: HashMap<String, u32> = HashMap::new();
    for category in phoneme.iter().flat_map(|a| a.weakness_categories.iter()) {
        *pronunciation.entry(category.clone()).or_default() += 1;
    }
    let mut grammar_categories: HashMap<String, u32> = HashMap::new();
    for category in grammar.iter().flat_map(|a| a.categories.iter()) {
        *grammar_categories.entry(category.clone()).or_default() += 1;
    }

    let edits_per_100w: Vec<f64> = grammar
        .iter()
        .map(|a| {
            let words = a.gec.final_text.split_whitespace().count().max(1);
            a.gec.applied_edits as f64 * 100.0 / words as f64
        })
        .collect();

    let mut latencies: Vec<f64> = grammar.iter().map(|a| a.metrics.latency_ms as f64).collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let latency_ms_p50 = (!latencies.is_empty())
        .then(|| percentile_sorted(&latencies, 0.5).round() as u64);

    let per_sle_mean = (!per_sle.is_empty()).then(|| mean(&per_sle));
    let badge = match per_sle_mean {
        Some(value) if value < MOST_IMPROVED_PER_THRESHOLD => Badge::MostImproved,
        _ => Badge::KeepGoing,
    };

    WeaknessSummary {
        counts: SummaryCounts {
            phoneme_attempts: to_u32(phoneme.len()),
            phoneme_with_reference: to_u32(per_sle.len()),
            grammar_attempts: to_u32(grammar.len()),
        },
        per_sle: distribution_or_none(&per_sle),
        per_strict: distribution_or_none(&per_strict),
        top_substitutions: ranked(substitutions, TOP_N)
            .into_iter()
            .map(|(pair, count)| PairCount { pair, count })
            .collect(),
        top_insertions: ranked(insertions, TOP_N)
            .into_iter()
            .map(|(symbol, count)| SymbolCount { symbol, count })
            .collect(),
        top_deletions: ranked(deletions, TOP_N)
            .into_iter()
            .map(|(symbol, count)| SymbolCount { symbol, count })
            .collect(),
        pronunciation_weaknesses: ranked(pronunciation, usize::MAX)
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
        grammar_weaknesses: ranked(grammar_categories, usize::MAX)
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
        edits_per_100w: distribution_or_none(&edits_per_100w),
        latency_ms_p50,
        badge,
    }
}

/// Highest count first, ties by key.
fn ranked(counts: HashMap<String, u32>, top_n: usize) -> Vec<(String, u32)> {
    let mut entries: Vec<(String, u32)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mean_value = mean(&sorted);
    let p50_value = percentile_sorted(&sorted, 0.5);
    let p90_value = percentile_sorted(&sorted, 0.9);
    let p95_value = percentile_sorted(&sorted, 0.95);
    let p99_value = percentile_sorted(&sorted, 0.99);

    Some(MetricDistribution {
        mean: checked_f32(mean_value, "summary.mean").ok()?,
        p50: checked_f32(p50_value, "summary.p50").ok()?,
        p90: checked_f32(p90_value, "summary.p90").ok()?,
        p95: checked_f32(p95_value, "summary.p95").ok()?,
        p99: checked_f32(p99_value, "summary.p99").ok()?,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentile_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }

    let clamped = percentile.clamp(0.0, 1.0);
    let max_index = (sorted_values.len() - 1) as f64;
    let rank = clamped * max_index;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = rank - lower as f64;
        sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn checked_f32(value: f64, metric_name: &str) -> Result<f32, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::invalid_input(format!(
            "metric '{metric_name}' produced non-finite value: {value}"
        )));
    }
    if value < f32::MIN as f64 || value > f32::MAX as f64 {
        return Err(EngineError::invalid_input(format!(
            "metric '{metric_name}' out of f32 range: {value}"
        )));
    }
    Ok(value as f32)
}
