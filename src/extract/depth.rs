use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::keywords::KeywordSet;
use crate::models::Bucket;

static REASONING_TERMS: LazyLock<KeywordSet> = LazyLock::new(|| {
    KeywordSet::new(&[
        "analysis", "analyz*", "reasoning", "derivation", "deriv*", "step by step",
        "carefully", "detailed", "intuition", "discussion", "proof",
    ])
});
static OUTCOME_TERMS: LazyLock<KeywordSet> = LazyLock::new(|| {
    KeywordSet::new(&[
        "correct*", "incorrect*", "error*", "mistake*", "wrong", "succeed*", "success*",
        "fail*", "bug*",
    ])
});
static NUMBERED_STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*(?:\(?\d{1,2}[.):]|\(?[a-h]\)|(?:step|part|q|question|problem)\s*\d{1,2}\b)").unwrap()
});

/// Score cut-offs and bonuses for the depth bucket.
///
/// The score is the word count plus a bonus for each kind of signal present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DepthThresholds {
    pub medium_at: usize,
    pub high_at: usize,
    pub reasoning_bonus: usize,
    pub outcome_bonus: usize,
    pub structure_bonus: usize,
    /// Numbered lines needed before the write-up counts as structured.
    pub min_numbered_steps: usize,
}

impl Default for DepthThresholds {
    fn default() -> Self {
        Self {
            medium_at: 200,
            high_at: 600,
            reasoning_bonus: 150,
            outcome_bonus: 50,
            structure_bonus: 100,
            min_numbered_steps: 3,
        }
    }
}

pub fn depth_score(document: &str, word_count: usize, t: &DepthThresholds) -> usize {
    let mut score = word_count;
    if REASONING_TERMS.any(document) {
        score += t.reasoning_bonus;
    }
    if OUTCOME_TERMS.any(document) {
        score += t.outcome_bonus;
    }
    if NUMBERED_STEP_RE.find_iter(document).count() >= t.min_numbered_steps {
        score += t.structure_bonus;
    }
    score
}

pub fn depth_bucket(document: &str, word_count: usize, t: &DepthThresholds) -> Option<Bucket> {
    if document.trim().is_empty() {
        return None;
    }
    let score = depth_score(document, word_count, t);
    Some(if score >= t.high_at {
        Bucket::High
    } else if score >= t.medium_at {
        Bucket::Medium
    } else {
        Bucket::Low
    })
}
