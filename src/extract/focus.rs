use std::sync::LazyLock;

use serde::Deserialize;

use super::keywords::KeywordSet;
use crate::models::Focus;

static FOCUS_KEYWORDS: LazyLock<Vec<(Focus, KeywordSet)>> = LazyLock::new(|| {
    vec![
        (
            Focus::ModelPerformance,
            KeywordSet::new(&[
                "hallucinat*", "correct*", "incorrect*", "mistake*", "error*", "accura*",
                "reasoning", "solve*", "solution*", "wrong",
            ]),
        ),
        (
            Focus::AssignmentFeedback,
            KeywordSet::new(&[
                "assignment*", "question wording", "ambiguous", "ambiguity",
                "clarity of the question", "problem statement", "unclear", "typo*",
            ]),
        ),
        (
            Focus::PromptingStrategy,
            KeywordSet::new(&[
                "prompt*", "system prompt", "zero shot", "few shot", "chain of thought", "cot",
                "step by step", "turn by turn", "one shot*",
            ]),
        ),
        (
            Focus::MetaReflection,
            KeywordSet::new(&[
                "reflection", "reflect*", "experience", "takeaway*", "take away*", "lesson*",
                "learned", "meta", "overall",
            ]),
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FocusThresholds {
    /// Distinct keyword hits a category needs before it can be chosen.
    pub min_score: usize,
}

impl Default for FocusThresholds {
    fn default() -> Self {
        Self { min_score: 1 }
    }
}

pub fn focus_scores(text: &str) -> Vec<(Focus, usize)> {
    FOCUS_KEYWORDS
        .iter()
        .map(|(focus, words)| (*focus, words.distinct_hits(text)))
        .collect()
}

/// Highest-scoring category; ties go to the earlier entry of [`Focus::PRIORITY`].
pub fn primary_focus(title: &str, document: &str, t: &FocusThresholds) -> Option<Focus> {
    if title.trim().is_empty() && document.trim().is_empty() {
        return None;
    }
    let scores = focus_scores(&format!("{}\n{}", title, document));
    let score_of = |f: Focus| {
        scores
            .iter()
            .find(|(g, _)| *g == f)
            .map_or(0, |(_, s)| *s)
    };

    let mut best = (Focus::MixedOther, 0);
    for focus in Focus::PRIORITY {
        let score = score_of(focus);
        if score > best.1 {
            best = (focus, score);
        }
    }

    if best.1 < t.min_score.max(1) {
        Some(Focus::MixedOther)
    } else {
        Some(best.0)
    }
}
