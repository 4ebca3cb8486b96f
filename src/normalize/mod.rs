pub mod markup;

use serde_json::Value;

use crate::error::RecordError;
use crate::models::{FileRef, ManifestFile, NormalizedPost, RawThread, ThreadMeta, UserLite};

/// Author name used when a thread carries no usable user object.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Flatten one raw thread into a post.
///
/// Only `id` and `number` are required; every other field falls back to an
/// empty/zero/null default. Attachment markers are resolved against the
/// manifest files downloaded for this thread.
pub fn normalize(value: &Value, attachments: &[ManifestFile]) -> Result<NormalizedPost, RecordError> {
    let raw = RawThread::from_value(value)?;
    let id = raw.required_uint("id")?;
    let number = raw.required_uint("number")?;

    let title = raw
        .str_field("title")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    let stripped = match raw.str_field("content").filter(|c| !c.trim().is_empty()) {
        Some(content) => markup::strip_markup(&content),
        None => markup::plain_text(&raw.str_field("document").unwrap_or_default()),
    };
    let doc_len = stripped.text.chars().count();
    let file_refs = resolve_attachments(stripped.file_refs, attachments, doc_len);

    Ok(NormalizedPost {
        id,
        number,
        title,
        document: stripped.text,
        created_at: raw.str_field("created_at"),
        user: read_user(&raw),
        view_count: raw.uint_field("view_count").unwrap_or(0),
        reply_count: raw.uint_field("reply_count").unwrap_or(0),
        file_refs,
        meta: ThreadMeta {
            course_id: raw.uint_field("course_id"),
            category: raw.str_field("category"),
            subcategory: raw.str_field("subcategory"),
            subsubcategory: raw.str_field("subsubcategory"),
            kind: raw.str_field("type"),
            is_private: raw.bool_field("is_private"),
            is_pinned: raw.bool_field("is_pinned"),
            is_anonymous: raw.bool_field("is_anonymous"),
        },
    })
}

fn read_user(raw: &RawThread) -> UserLite {
    match raw.object("user") {
        Some(user) => UserLite {
            id: user.uint_field("id"),
            name: user
                .str_field("name")
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            course_role: user.str_field("course_role"),
        },
        None => UserLite {
            id: None,
            name: UNKNOWN_AUTHOR.to_string(),
            course_role: None,
        },
    }
}

/// Enrich inline refs with download metadata, matching by original filename in
/// order. Manifest files never referenced inline are appended at the end of
/// the document.
fn resolve_attachments(
    mut refs: Vec<FileRef>,
    attachments: &[ManifestFile],
    doc_len: usize,
) -> Vec<FileRef> {
    let mut used = vec![false; attachments.len()];

    for r in &mut refs {
        let found = attachments
            .iter()
            .enumerate()
            .find(|(i, f)| !used[*i] && f.original_filename == r.filename);
        if let Some((i, file)) = found {
            used[i] = true;
            r.saved_as = file.saved_as.clone();
            r.transcript = file.transcript.clone();
            if r.url.is_none() {
                r.url = file.url.clone();
            }
        }
    }

    for (file, _) in attachments.iter().zip(&used).filter(|(_, u)| !**u) {
        if file.original_filename.trim().is_empty() {
            continue;
        }
        refs.push(FileRef {
            filename: file.original_filename.clone(),
            position: doc_len,
            inline: false,
            url: file.url.clone(),
            saved_as: file.saved_as.clone(),
            transcript: file.transcript.clone(),
        });
    }

    refs
}
