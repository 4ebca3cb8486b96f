use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use indicatif::ProgressBar;
use participation_prep::config::Settings;
use participation_prep::{pipeline, PipelineError};
use serde_json::Value;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn settings(dir: &Path, input: &str) -> Settings {
    Settings {
        input: fixture(input),
        manifest: fixture("manifest.json"),
        output: dir.join("public/data/posts_processed.json"),
        summary_output: dir.join("public/data/posts_summary.json"),
        ..Default::default()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn binary(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_participation_prep"));
    cmd.current_dir(dir)
        .arg("--config")
        .arg(dir.join("absent.toml"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn processes_fixture_and_skips_bad_record() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "threads.json");
    let report = pipeline::run(&s, &ProgressBar::hidden()).unwrap();

    assert_eq!(report.total_records, 3);
    assert_eq!(report.posts_written, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);

    let posts = read_json(&s.output);
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 2);

    let first = &posts[0];
    assert_eq!(first["id"], 7001);
    assert_eq!(first["user"]["name"], "Ada");
    assert_eq!(first["category"], "General");
    assert_eq!(first["ed_url"], "https://edstem.org/us/courses/84647/discussion/7001");
    assert_eq!(first["metrics"]["homework_id"], "HW7");
    assert_eq!(first["metrics"]["model_name"], "Claude Opus 4.5");
    assert!(!first["document"].as_str().unwrap().contains('<'));

    let refs = first["file_refs"].as_array().unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0]["filename"], "log.pdf");
    assert_eq!(refs[0]["inline"], true);
    assert_eq!(refs[0]["saved_as"], "files/thread_42/log.pdf");
    assert_eq!(refs[1]["filename"], "notes.txt");
    assert_eq!(refs[1]["inline"], false);
    let doc_len = first["document"].as_str().unwrap().chars().count() as u64;
    assert_eq!(refs[1]["position"], doc_len);

    let second = &posts[1];
    assert_eq!(second["id"], 7003);
    assert_eq!(second["ed_url"], Value::Null);
    assert_eq!(second["user"]["name"], "Unknown");
    assert_eq!(second["metrics"]["homework_id"], "HW3");
    assert_eq!(second["metrics"]["model_name"], "Gemini 2.5 Pro");
}

#[test]
fn rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "threads.json");
    pipeline::run(&s, &ProgressBar::hidden()).unwrap();
    let first = fs::read(&s.output).unwrap();
    pipeline::run(&s, &ProgressBar::hidden()).unwrap();
    assert_eq!(first, fs::read(&s.output).unwrap());
}

#[test]
fn missing_manifest_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = settings(dir.path(), "threads.json");
    s.manifest = dir.path().join("no_manifest.json");
    pipeline::run(&s, &ProgressBar::hidden()).unwrap();

    let posts = read_json(&s.output);
    let refs = posts[0]["file_refs"].as_array().unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0]["url"], "https://static.example/log.pdf");
    assert!(refs[0].get("saved_as").is_none());
}

#[test]
fn duplicate_ids_abort_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "duplicate_ids.json");
    let err = pipeline::run(&s, &ProgressBar::hidden()).unwrap_err();
    assert!(matches!(err, PipelineError::DatasetIntegrity { field: "id", .. }));
    assert!(!s.output.exists());
}

#[test]
fn binary_writes_dataset_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let out = binary(dir.path())
        .arg("--input")
        .arg(fixture("threads.json"))
        .arg("--manifest")
        .arg(fixture("manifest.json"))
        .args(["--course-id", "555", "--insights"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("2 posts written, 1 skipped"), "{}", stdout);

    let posts = read_json(&dir.path().join("public/data/posts_processed.json"));
    assert_eq!(posts[0]["ed_url"], "https://edstem.org/us/courses/555/discussion/7001");
    assert_eq!(posts[1]["ed_url"], "https://edstem.org/us/courses/555/discussion/7003");

    let summary = read_json(&dir.path().join("public/data/posts_summary.json"));
    assert_eq!(summary["total_posts"], 2);
    assert_eq!(summary["skipped_records"], 1);
    assert_eq!(summary["models"]["Claude Opus 4.5"]["post_count"], 1);

    let out = binary(dir.path()).arg("overview").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("HW7"));
    assert!(stdout.contains("Gemini 2.5 Pro"));
}

#[test]
fn binary_fails_on_missing_input_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let out = binary(dir.path())
        .arg("--input")
        .arg(dir.path().join("nope.json"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.json"));

    let target = dir.path().join("published.json");
    fs::write(&target, "[]\n").unwrap();
    let out = binary(dir.path())
        .arg("--input")
        .arg(fixture("duplicate_ids.json"))
        .arg("--output")
        .arg(&target)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("duplicate id 1"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "[]\n");
}
