use std::sync::LazyLock;

use serde::Deserialize;

use super::keywords::KeywordSet;
use crate::models::Bucket;

static ACTIONABLE_PHRASES: LazyLock<KeywordSet> = LazyLock::new(|| {
    KeywordSet::new(&[
        "should", "recommend*", "suggest*", "could", "would", "might be better", "improv*",
        "chang*", "consider*", "it would help", "we could", "instead", "next time", "tip*",
        "fix*", "correct it", "try using",
    ])
});

/// Distinct-phrase cut-offs for the actionability bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActionabilityThresholds {
    pub medium_min_hits: usize,
    pub high_min_hits: usize,
}

impl Default for ActionabilityThresholds {
    fn default() -> Self {
        Self {
            medium_min_hits: 1,
            high_min_hits: 4,
        }
    }
}

pub fn recommendation_hits(text: &str) -> usize {
    ACTIONABLE_PHRASES.distinct_hits(text)
}

/// Bucket by how many distinct recommendation phrases appear in the title and
/// document. `None` only for an empty document.
pub fn actionability_bucket(
    title: &str,
    document: &str,
    t: &ActionabilityThresholds,
) -> Option<Bucket> {
    if document.trim().is_empty() {
        return None;
    }
    let hits = recommendation_hits(&format!("{}\n{}", title, document));
    Some(if hits >= t.high_min_hits {
        Bucket::High
    } else if hits >= t.medium_min_hits {
        Bucket::Medium
    } else {
        Bucket::Low
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_hits() {
        let t = ActionabilityThresholds::default();
        assert_eq!(actionability_bucket("", "The model solved it.", &t), Some(Bucket::Low));
        assert_eq!(
            actionability_bucket("", "You should give it the full problem.", &t),
            Some(Bucket::Medium)
        );
        assert_eq!(
            actionability_bucket(
                "Tips",
                "I recommend splitting prompts; consider asking for units; it would help to improve the wording.",
                &t
            ),
            Some(Bucket::High)
        );
    }

    #[test]
    fn title_counts_but_empty_document_is_none() {
        let t = ActionabilityThresholds::default();
        assert_eq!(actionability_bucket("You should read this", "", &t), None);
        assert_eq!(
            actionability_bucket("You should read this", "ok", &t),
            Some(Bucket::Medium)
        );
    }

    #[test]
    fn repeated_phrase_counts_once() {
        assert_eq!(recommendation_hits("should should should"), 1);
    }
}
