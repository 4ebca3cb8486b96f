use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::models::{Manifest, ManifestEntry};

/// Read the raw thread array. Absence or anything but a JSON array is fatal.
pub fn load_threads(path: &Path) -> Result<Vec<Value>, PipelineError> {
    let missing = |reason: String| PipelineError::MissingInput {
        path: path.to_path_buf(),
        reason,
    };
    let raw = fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
    match serde_json::from_str::<Value>(&raw).map_err(|e| missing(format!("invalid JSON: {}", e)))? {
        Value::Array(threads) => {
            info!(path = %path.display(), threads = threads.len(), "loaded threads");
            Ok(threads)
        }
        other => Err(missing(format!(
            "expected a JSON array of threads, found {}",
            json_kind(&other)
        ))),
    }
}

/// Read the attachment manifest, falling back to an empty one with a warning.
/// Entries that do not parse are dropped individually.
pub fn load_manifest(path: &Path) -> Manifest {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "attachment manifest unavailable, continuing without attachments");
            return Manifest::default();
        }
    };
    let object = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(path = %path.display(), found = json_kind(&other), "attachment manifest is not an object, ignoring it");
            return Manifest::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "attachment manifest is not valid JSON, ignoring it");
            return Manifest::default();
        }
    };

    let mut entries = HashMap::with_capacity(object.len());
    for (number, entry) in object {
        match serde_json::from_value::<ManifestEntry>(entry) {
            Ok(entry) => {
                entries.insert(number, entry);
            }
            Err(e) => warn!(thread = %number, error = %e, "dropping unreadable manifest entry"),
        }
    }
    info!(path = %path.display(), threads = entries.len(), "loaded attachment manifest");
    Manifest::new(entries)
}

/// Serialize `value` as pretty JSON and replace `path` in one rename, so
/// readers see either the old file or the complete new one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    let output_err = |source| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(output_err)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, body.as_bytes()).map_err(output_err)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(output_err(e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
