pub mod actionability;
pub mod depth;
pub mod focus;
pub mod homework;
pub mod keywords;
pub mod model;

use serde::Deserialize;

use crate::models::Metrics;
use actionability::ActionabilityThresholds;
use depth::DepthThresholds;
use focus::FocusThresholds;

/// Tunable cut-offs for the bucket and focus classifiers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub depth: DepthThresholds,
    pub actionability: ActionabilityThresholds,
    pub focus: FocusThresholds,
}

impl Heuristics {
    pub fn validate(&self) -> Result<(), String> {
        if self.depth.medium_at >= self.depth.high_at {
            return Err(format!(
                "heuristics.depth.medium_at ({}) must be below high_at ({})",
                self.depth.medium_at, self.depth.high_at
            ));
        }
        if self.actionability.medium_min_hits >= self.actionability.high_min_hits {
            return Err(format!(
                "heuristics.actionability.medium_min_hits ({}) must be below high_min_hits ({})",
                self.actionability.medium_min_hits, self.actionability.high_min_hits
            ));
        }
        Ok(())
    }
}

/// Whitespace-delimited token count.
pub fn word_count(document: &str) -> usize {
    document.split_whitespace().count()
}

/// Run every extractor over one post. Pure: same text, same metrics.
pub fn extract_all(title: &str, document: &str, heuristics: &Heuristics) -> Metrics {
    let word_count = word_count(document);
    Metrics {
        homework_id: homework::homework_id(title, document),
        model_name: model::model_name(title, document),
        word_count,
        depth_bucket: depth::depth_bucket(document, word_count, &heuristics.depth),
        actionability_bucket: actionability::actionability_bucket(
            title,
            document,
            &heuristics.actionability,
        ),
        primary_focus: focus::primary_focus(title, document, &heuristics.focus),
    }
}
