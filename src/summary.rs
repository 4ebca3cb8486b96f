//! Per-homework and per-model aggregates, the input for insight generation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::model;
use crate::models::Metrics;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub post_count: usize,
    pub total_words: usize,
    pub depth: BTreeMap<String, usize>,
    pub actionability: BTreeMap<String, usize>,
    pub focus: BTreeMap<String, usize>,
}

impl GroupStats {
    fn add(&mut self, m: &Metrics) {
        self.post_count += 1;
        self.total_words += m.word_count;
        if let Some(b) = m.depth_bucket {
            *self.depth.entry(b.as_str().to_string()).or_default() += 1;
        }
        if let Some(b) = m.actionability_bucket {
            *self.actionability.entry(b.as_str().to_string()).or_default() += 1;
        }
        if let Some(f) = m.primary_focus {
            *self.focus.entry(f.as_str().to_string()).or_default() += 1;
        }
    }

    pub fn mean_words(&self) -> f64 {
        if self.post_count == 0 {
            0.0
        } else {
            self.total_words as f64 / self.post_count as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub generated_at: Option<String>,
    pub total_posts: usize,
    pub skipped_records: usize,
    pub homework: BTreeMap<String, GroupStats>,
    pub models: BTreeMap<String, GroupStats>,
}

impl DatasetSummary {
    /// Homework groups ordered by assignment number rather than lexically.
    pub fn homework_in_order(&self) -> Vec<(&String, &GroupStats)> {
        let mut groups: Vec<_> = self.homework.iter().collect();
        groups.sort_by_key(|(id, _)| {
            let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
            (digits.parse::<u64>().unwrap_or(u64::MAX), id.to_string())
        });
        groups
    }

    /// Model groups ordered by post count, largest first.
    pub fn models_by_count(&self) -> Vec<(&String, &GroupStats)> {
        let mut groups: Vec<_> = self.models.iter().collect();
        groups.sort_by(|a, b| b.1.post_count.cmp(&a.1.post_count).then(a.0.cmp(b.0)));
        groups
    }
}

/// Group posts by homework (skipping unlabelled ones) and by model (skipping
/// unknown and unspecified models).
pub fn summarize<'a>(metrics: impl IntoIterator<Item = &'a Metrics>) -> DatasetSummary {
    let mut summary = DatasetSummary::default();
    for m in metrics {
        summary.total_posts += 1;
        if let Some(hw) = &m.homework_id {
            summary.homework.entry(hw.clone()).or_default().add(m);
        }
        if let Some(name) = m.model_name.as_deref().filter(|n| !model::is_generic(n)) {
            summary.models.entry(name.to_string()).or_default().add(m);
        }
    }
    summary
}
