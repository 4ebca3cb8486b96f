//! Data shapes that flow through the pipeline.
//!
//! Raw threads are read leniently straight from JSON values; everything after
//! normalization is strongly typed and serialized with field names the site
//! depends on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Read-only view over one untrusted thread object.
///
/// Accessors never fail on wrong types except for the integer identity
/// fields, which the normalizer treats as required.
#[derive(Debug, Clone, Copy)]
pub struct RawThread<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawThread<'a> {
    pub fn from_value(value: &'a Value) -> Result<Self, RecordError> {
        value
            .as_object()
            .map(|fields| RawThread { fields })
            .ok_or(RecordError::NotAnObject)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// String field; numbers are rendered, anything else is absent.
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Required non-negative integer, accepting numeric strings.
    pub fn required_uint(&self, key: &'static str) -> Result<u64, RecordError> {
        let value = self.get(key).ok_or(RecordError::MissingField(key))?;
        as_uint(value).ok_or_else(|| RecordError::InvalidField {
            field: key,
            value: value.to_string(),
        })
    }

    /// Optional integer; malformed values degrade to `None`.
    pub fn uint_field(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(as_uint)
    }

    pub fn bool_field(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_u64().is_some_and(|n| n != 0),
            _ => false,
        }
    }

    pub fn object(&self, key: &str) -> Option<RawThread<'a>> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|fields| RawThread { fields })
    }
}

fn as_uint(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLite {
    pub id: Option<u64>,
    pub name: String,
    pub course_role: Option<String>,
}

/// An attachment reference found in (or attached to) a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub filename: String,
    /// Character offset into `document`.
    pub position: usize,
    /// False for manifest files that had no marker in the text.
    pub inline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl FileRef {
    pub fn inline(filename: impl Into<String>, position: usize, url: Option<String>) -> Self {
        FileRef {
            filename: filename.into(),
            position,
            inline: true,
            url,
            saved_as: None,
            transcript: None,
        }
    }
}

/// Thread metadata passed through to the output untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMeta {
    pub course_id: Option<u64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub subsubcategory: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_private: bool,
    pub is_pinned: bool,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPost {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub document: String,
    pub created_at: Option<String>,
    pub user: UserLite,
    pub view_count: u64,
    pub reply_count: u64,
    pub file_refs: Vec<FileRef>,
    #[serde(flatten)]
    pub meta: ThreadMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Low,
    Medium,
    High,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Low => "low",
            Bucket::Medium => "medium",
            Bucket::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Focus {
    #[serde(rename = "model_performance")]
    ModelPerformance,
    #[serde(rename = "assignment_feedback")]
    AssignmentFeedback,
    #[serde(rename = "prompting_strategy")]
    PromptingStrategy,
    #[serde(rename = "meta_reflection")]
    MetaReflection,
    #[serde(rename = "mixed/other")]
    MixedOther,
}

impl Focus {
    /// Tie-break order, highest priority first.
    pub const PRIORITY: [Focus; 4] = [
        Focus::ModelPerformance,
        Focus::AssignmentFeedback,
        Focus::PromptingStrategy,
        Focus::MetaReflection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::ModelPerformance => "model_performance",
            Focus::AssignmentFeedback => "assignment_feedback",
            Focus::PromptingStrategy => "prompting_strategy",
            Focus::MetaReflection => "meta_reflection",
            Focus::MixedOther => "mixed/other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub homework_id: Option<String>,
    pub model_name: Option<String>,
    pub word_count: usize,
    pub depth_bucket: Option<Bucket>,
    pub actionability_bucket: Option<Bucket>,
    pub primary_focus: Option<Focus>,
}

/// Final output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedPost {
    #[serde(flatten)]
    pub post: NormalizedPost,
    pub ed_url: Option<String>,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ManifestFile {
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub saved_as: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub thread_id: Option<u64>,
    #[serde(default)]
    pub thread_title: Option<String>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

/// Downloaded attachments keyed by thread number.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: HashMap<String, ManifestEntry>) -> Self {
        Manifest { entries }
    }

    pub fn files_for(&self, number: u64) -> &[ManifestFile] {
        self.entries
            .get(&number.to_string())
            .map(|e| e.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
