//! Layered settings: built-in defaults, an optional TOML file, `PREP_*`
//! environment variables, then command-line overrides.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::extract::Heuristics;
use crate::link::LinkConfig;

pub const DEFAULT_CONFIG_FILE: &str = "participation.toml";
const ENV_PREFIX: &str = "PREP";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Raw thread array written by the fetch tool.
    pub input: PathBuf,
    /// Attachment manifest; optional at run time.
    pub manifest: PathBuf,
    pub output: PathBuf,
    pub summary_output: PathBuf,
    /// Write the aggregate summary next to the dataset.
    pub insights: bool,
    pub links: LinkConfig,
    pub heuristics: Heuristics,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("threads.json"),
            manifest: PathBuf::from("files/manifest.json"),
            output: PathBuf::from("public/data/posts_processed.json"),
            summary_output: PathBuf::from("public/data/posts_summary.json"),
            insights: false,
            links: LinkConfig::default(),
            heuristics: Heuristics::default(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub summary_output: Option<PathBuf>,
    pub insights: Option<bool>,
    pub course_id: Option<u64>,
    pub base_url: Option<String>,
    pub region: Option<String>,
}

pub fn load_settings(config_file: &Path, overrides: &Overrides) -> Result<Settings, PipelineError> {
    load_with_env(config_file, overrides, env_source())
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_with_env(
    config_file: &Path,
    overrides: &Overrides,
    env: Environment,
) -> Result<Settings, PipelineError> {
    let path_str = |p: &PathBuf| p.to_string_lossy().into_owned();
    let course_id = match overrides.course_id {
        Some(id) => Some(i64::try_from(id).map_err(|_| {
            PipelineError::Config(format!("course id {} is out of range", id))
        })?),
        None => None,
    };

    let settings: Settings = Config::builder()
        .add_source(File::from(config_file).required(false))
        .add_source(env)
        .set_override_option("input", overrides.input.as_ref().map(path_str))?
        .set_override_option("manifest", overrides.manifest.as_ref().map(path_str))?
        .set_override_option("output", overrides.output.as_ref().map(path_str))?
        .set_override_option("summary_output", overrides.summary_output.as_ref().map(path_str))?
        .set_override_option("insights", overrides.insights)?
        .set_override_option("links.course_id", course_id)?
        .set_override_option("links.base_url", overrides.base_url.clone())?
        .set_override_option("links.region", overrides.region.clone())?
        .build()?
        .try_deserialize()?;

    settings.heuristics.validate().map_err(PipelineError::Config)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env() -> Environment {
        env_source().source(Some(HashMap::new()))
    }

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_with_env(&dir.path().join("absent.toml"), &Overrides::default(), no_env()).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn file_then_env_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("participation.toml");
        std::fs::write(
            &file,
            r#"
input = "data/threads.json"
insights = true

[links]
course_id = 84647

[heuristics.depth]
high_at = 900
"#,
        )
        .unwrap();

        let env = env_source().source(Some(HashMap::from([
            ("PREP_OUTPUT".to_string(), "site/posts.json".to_string()),
            ("PREP_HEURISTICS__ACTIONABILITY__HIGH_MIN_HITS".to_string(), "6".to_string()),
        ])));
        let overrides = Overrides {
            input: Some(PathBuf::from("cli.json")),
            region: Some("au".into()),
            ..Default::default()
        };
        let s = load_with_env(&file, &overrides, env).unwrap();

        assert_eq!(s.input, PathBuf::from("cli.json"));
        assert_eq!(s.output, PathBuf::from("site/posts.json"));
        assert!(s.insights);
        assert_eq!(s.links.course_id, Some(84647));
        assert_eq!(s.links.region, "au");
        assert_eq!(s.links.base_url, "https://edstem.org");
        assert_eq!(s.heuristics.depth.high_at, 900);
        assert_eq!(s.heuristics.depth.medium_at, 200);
        assert_eq!(s.heuristics.actionability.high_min_hits, 6);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.toml");
        std::fs::write(&file, "[heuristics.depth]\nmedium_at = 700\nhigh_at = 600\n").unwrap();
        let err = load_with_env(&file, &Overrides::default(), no_env()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn course_id_flag() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            course_id: Some(12),
            ..Default::default()
        };
        let s = load_with_env(&dir.path().join("none.toml"), &overrides, no_env()).unwrap();
        assert_eq!(s.links.course_id, Some(12));
    }
}
