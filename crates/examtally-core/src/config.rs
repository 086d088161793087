//! Run configuration loaded from `examtally.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::ConsolidationConfig;
use crate::model::{ExamOrdering, ScorePolicy};

/// Output formats understood by the emitters.
pub const KNOWN_FORMATS: &[&str] = &["csv", "json", "html"];

/// Top-level examtally configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamtallyConfig {
    /// Directory searched recursively for CSV exports.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Directory the tables and reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Max exports parsed concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub score_policy: ScorePolicy,
    #[serde(default)]
    pub exam_order: ExamOrdering,
    /// Any of "csv", "json", "html", or "all".
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./exports")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examtally-results")
}
fn default_parallelism() -> usize {
    4
}
fn default_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

impl Default for ExamtallyConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            parallelism: default_parallelism(),
            score_policy: ScorePolicy::default(),
            exam_order: ExamOrdering::default(),
            formats: default_formats(),
        }
    }
}

impl ExamtallyConfig {
    /// Engine settings derived from this configuration.
    pub fn consolidation(&self) -> ConsolidationConfig {
        ConsolidationConfig {
            parallelism: self.parallelism,
            score_policy: self.score_policy,
            exam_order: self.exam_order.clone(),
        }
    }

    /// Expand "all" and reject unknown format names.
    pub fn resolved_formats(&self) -> Result<Vec<String>> {
        resolve_formats(&self.formats)
    }
}

/// Normalize a format list: lowercase, "all" expanded, duplicates dropped.
pub fn resolve_formats<S: AsRef<str>>(formats: &[S]) -> Result<Vec<String>> {
    let mut resolved: Vec<String> = Vec::new();
    for format in formats {
        let format = format.as_ref().trim().to_lowercase();
        let expanded: Vec<String> = match format.as_str() {
            "all" => KNOWN_FORMATS.iter().map(|f| f.to_string()).collect(),
            f if KNOWN_FORMATS.contains(&f) => vec![format.clone()],
            "" => continue,
            other => anyhow::bail!(
                "unknown output format '{other}' (expected one of: {}, all)",
                KNOWN_FORMATS.join(", ")
            ),
        };
        for f in expanded {
            if !resolved.contains(&f) {
                resolved.push(f);
            }
        }
    }
    anyhow::ensure!(!resolved.is_empty(), "at least one output format is required");
    Ok(resolved)
}

/// Load configuration from `./examtally.toml`, or defaults when absent.
///
/// Environment variable overrides: `EXAMTALLY_INPUT_DIR`, `EXAMTALLY_OUTPUT_DIR`.
pub fn load_config() -> Result<ExamtallyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default location.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamtallyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examtally.toml");
        local.exists().then_some(local)
    };

    let mut config = match config_path {
        Some(path) => parse_config_file(&path)?,
        None => ExamtallyConfig::default(),
    };

    if let Ok(dir) = std::env::var("EXAMTALLY_INPUT_DIR") {
        config.input_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("EXAMTALLY_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }

    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<ExamtallyConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<ExamtallyConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ExamtallyConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("./exports"));
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.score_policy, ScorePolicy::Correct);
        assert_eq!(config.exam_order, ExamOrdering::Name);
        assert_eq!(config.formats, vec!["csv"]);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
input_dir = "data/zipgrade"
output_dir = "out"
parallelism = 8
score_policy = "points"
formats = ["csv", "html"]

[exam_order]
by = "explicit"
exams = ["M2", "M1"]
"#;
        let config: ExamtallyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("data/zipgrade"));
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.score_policy, ScorePolicy::Points);
        assert_eq!(
            config.exam_order,
            ExamOrdering::Explicit {
                exams: vec!["M2".into(), "M1".into()]
            }
        );

        let engine = config.consolidation();
        assert_eq!(engine.parallelism, 8);
        assert_eq!(engine.score_policy, ScorePolicy::Points);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: ExamtallyConfig = toml::from_str("[exam_order]\nby = \"date\"\n").unwrap();
        assert_eq!(config.exam_order, ExamOrdering::Date);
        assert_eq!(config.output_dir, PathBuf::from("./examtally-results"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nope/examtally.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examtally.toml");
        std::fs::write(&path, "parallelism = 2\nscore_policy = \"points\"\n").unwrap();
        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.score_policy, ScorePolicy::Points);
    }

    #[test]
    fn invalid_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examtally.toml");
        std::fs::write(&path, "parallelism = \"many\"\n").unwrap();
        let err = parse_config_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
    }

    #[test]
    fn formats_resolve() {
        assert_eq!(resolve_formats(&["all"]).unwrap(), vec!["csv", "json", "html"]);
        assert_eq!(resolve_formats(&["CSV", "csv", "html"]).unwrap(), vec!["csv", "html"]);
        assert!(resolve_formats(&["xlsx"]).is_err());
        assert!(resolve_formats::<&str>(&[]).is_err());
    }
}
