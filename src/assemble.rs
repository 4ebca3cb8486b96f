use std::collections::HashMap;
use std::sync::LazyLock;

use indicatif::ProgressBar;
use rayon::prelude::*;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PipelineError, RecordError};
use crate::extract::{self, Heuristics};
use crate::link::{LinkResolver, ThreadRef};
use crate::models::{Manifest, ProcessedPost, RawThread};
use crate::normalize;

static HOMEWORK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^HW\d+$").unwrap());

/// Records handed to the worker pool per batch.
const CHUNK_SIZE: usize = 500;

/// A raw record that could not be turned into a post.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position in the input array.
    pub index: usize,
    /// The raw `id` value as written in the input, if there was one.
    pub id: Option<String>,
    pub reason: RecordError,
}

#[derive(Debug)]
pub struct Assembly {
    /// Posts in input order.
    pub posts: Vec<ProcessedPost>,
    pub skipped: Vec<SkippedRecord>,
}

pub struct Assembler {
    heuristics: Heuristics,
    links: Box<dyn LinkResolver>,
}

impl Assembler {
    pub fn new(heuristics: Heuristics, links: Box<dyn LinkResolver>) -> Self {
        Assembler { heuristics, links }
    }

    /// Normalize, measure and link one raw thread.
    pub fn process_record(&self, raw: &Value, manifest: &Manifest) -> Result<ProcessedPost, RecordError> {
        let attachments = RawThread::from_value(raw)
            .ok()
            .and_then(|r| r.uint_field("number"))
            .map(|n| manifest.files_for(n))
            .unwrap_or(&[]);

        let post = normalize::normalize(raw, attachments)?;
        let metrics = extract::extract_all(&post.title, &post.document, &self.heuristics);
        let ed_url = self.links.resolve(&ThreadRef {
            id: post.id,
            number: post.number,
            course_id: post.meta.course_id,
        });

        Ok(ProcessedPost {
            post,
            ed_url,
            metrics,
        })
    }

    /// Process the whole corpus, keeping input order. Malformed records are
    /// skipped and reported; colliding ids or numbers fail the run.
    pub fn assemble(
        &self,
        threads: &[Value],
        manifest: &Manifest,
        pb: &ProgressBar,
    ) -> Result<Assembly, PipelineError> {
        let mut posts = Vec::with_capacity(threads.len());
        let mut sources = Vec::with_capacity(threads.len());
        let mut skipped = Vec::new();

        for (chunk_no, chunk) in threads.chunks(CHUNK_SIZE).enumerate() {
            let results: Vec<_> = chunk
                .par_iter()
                .map(|raw| self.process_record(raw, manifest))
                .collect();

            for (offset, (raw, result)) in chunk.iter().zip(results).enumerate() {
                let index = chunk_no * CHUNK_SIZE + offset;
                match result {
                    Ok(post) => {
                        posts.push(post);
                        sources.push(index);
                    }
                    Err(reason) => {
                        let id = raw.get("id").filter(|v| !v.is_null()).map(Value::to_string);
                        warn!(index, id = ?id, %reason, "skipping malformed record");
                        skipped.push(SkippedRecord { index, id, reason });
                    }
                }
            }
            pb.inc(chunk.len() as u64);
        }

        check_integrity(&posts, &sources)?;
        Ok(Assembly { posts, skipped })
    }
}

/// Unique ids and numbers are required; everything else is only logged.
pub fn check_integrity(posts: &[ProcessedPost], sources: &[usize]) -> Result<(), PipelineError> {
    let source = |i: usize| sources.get(i).copied().unwrap_or(i);
    let mut ids: HashMap<u64, usize> = HashMap::with_capacity(posts.len());
    let mut numbers: HashMap<u64, usize> = HashMap::with_capacity(posts.len());

    for (i, p) in posts.iter().enumerate() {
        if let Some(first) = ids.insert(p.post.id, i) {
            return Err(PipelineError::DatasetIntegrity {
                field: "id",
                value: p.post.id,
                first: source(first),
                second: source(i),
            });
        }
        if let Some(first) = numbers.insert(p.post.number, i) {
            return Err(PipelineError::DatasetIntegrity {
                field: "number",
                value: p.post.number,
                first: source(first),
                second: source(i),
            });
        }
        check_soft_invariants(p);
    }
    debug!(posts = posts.len(), "integrity pass ok");
    Ok(())
}

fn check_soft_invariants(p: &ProcessedPost) {
    let id = p.post.id;
    let doc_len = p.post.document.chars().count();

    if p.metrics.word_count != extract::word_count(&p.post.document) {
        warn!(id, word_count = p.metrics.word_count, "word count does not match document");
    }
    if let Some(hw) = &p.metrics.homework_id {
        if !HOMEWORK_LABEL_RE.is_match(hw) {
            warn!(id, homework_id = %hw, "homework id outside HW<digits> format");
        }
    }
    for r in p.post.file_refs.iter().filter(|r| r.position > doc_len) {
        warn!(id, filename = %r.filename, position = r.position, doc_len, "file ref beyond document end");
    }
    if let Some(ts) = &p.post.created_at {
        if chrono::DateTime::parse_from_rfc3339(ts).is_err() {
            warn!(id, created_at = %ts, "created_at is not RFC 3339");
        }
    }
}
