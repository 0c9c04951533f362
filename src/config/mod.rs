//! Configuration loading for westgard

mod schema;

pub use schema::{Config, ReaderConfig, RuleSeverity, DEFAULT_HISTORY_FILENAME};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".westgardrc.json";

/// Find and load the config file. Searches the working directory then parents.
///
/// A relative `history` path is resolved against the directory of the
/// config file it came from.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if path.exists() {
            Some(path)
        } else {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    } else {
        find_config_in_parents(work_dir)
    };

    let Some(path) = path else {
        log::debug!("no {} found, using defaults", CONFIG_FILENAME);
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let mut config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config: {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());

    if let Some(history) = config.history.take() {
        let base = path.parent().unwrap_or(Path::new("."));
        config.history = Some(if history.is_absolute() {
            history
        } else {
            base.join(history)
        });
    }

    config.rules = canonical_rules(std::mem::take(&mut config.rules))
        .with_context(|| format!("Invalid rules in config: {}", path.display()))?;

    for label in config.unknown_rules() {
        log::warn!("{}: unknown rule '{}' ignored", path.display(), label);
    }

    Ok(config)
}

/// Key rule overrides by their chart label ("41s" becomes "41S").
///
/// Two spellings of the same rule must agree on the severity.
fn canonical_rules(
    rules: HashMap<String, RuleSeverity>,
) -> Result<HashMap<String, RuleSeverity>> {
    let mut canonical: HashMap<String, RuleSeverity> = HashMap::with_capacity(rules.len());
    for (label, severity) in rules {
        let key = match crate::Violation::from_label(&label) {
            Some(rule) => rule.label().to_string(),
            None => label,
        };
        if let Some(previous) = canonical.insert(key.clone(), severity) {
            if previous != severity {
                anyhow::bail!(
                    "rule {} is configured more than once with different severities",
                    key
                );
            }
        }
    }
    Ok(canonical)
}

/// Search for .westgardrc.json in directory and its parents
fn find_config_in_parents(mut dir: &Path) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Build a GlobSet from ignore patterns for path matching
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| anyhow::anyhow!("{}", e))
}

/// Check if a path should be ignored based on config glob patterns
pub fn is_ignored(path: &Path, ignore_set: &GlobSet) -> bool {
    ignore_set.is_match(path)
}

/// Default config written by `westgard init`
pub fn default_config_json() -> Result<String> {
    let mut config = Config {
        history: Some(PathBuf::from(DEFAULT_HISTORY_FILENAME)),
        ..Config::default()
    };
    for rule in crate::Violation::RULES {
        config
            .rules
            .insert(rule.label().to_string(), RuleSeverity::Error);
    }
    serde_json::to_string_pretty(&config).context("serializing default config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Level, Severity, Violation};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(config.rules.is_empty());
        assert_eq!(config.history_path(), PathBuf::from(DEFAULT_HISTORY_FILENAME));
        assert_eq!(config.reader.first_result_column, 6);
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(Path::new("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_config_found_in_parent_and_history_resolved() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("runs").join("2020");
        fs::create_dir_all(&nested).unwrap();
        let mut file = fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"{{
                "history": "qc/history.json",
                "rules": {{ "41S": "warning", "8x": "off" }},
                "reader": {{ "firstResultColumn": 4 }}
            }}"#
        )
        .unwrap();

        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.history_path(), dir.path().join("qc/history.json"));
        assert_eq!(config.reader.first_result_column, 4);
        // Unspecified reader fields keep their defaults
        assert_eq!(config.reader.sample_type_column, 3);
        assert_eq!(config.severity_of(Violation::Shift41S), Some(Severity::Warning));
        assert_eq!(config.severity_of(Violation::Bias8X), None);
        assert_eq!(config.severity_of(Violation::Outlier13S), Some(Severity::Error));
        assert_eq!(config.severity_of(Violation::None), None);
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{ not json").unwrap();
        let err = load_config(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON in config"));
    }

    #[test]
    fn test_cli_history_overrides_config() {
        let config = Config {
            history: Some(PathBuf::from("a.json")),
            ..Config::default()
        }
        .merge_with_cli(Some(PathBuf::from("b.json")));
        assert_eq!(config.history_path(), PathBuf::from("b.json"));
    }

    #[test]
    fn test_unknown_rules_listed() {
        let config: Config =
            serde_json::from_str(r#"{ "rules": { "12S": "warning", "R4S": "info" } }"#).unwrap();
        assert_eq!(config.unknown_rules(), vec!["12S"]);
        assert_eq!(config.severity_of(Violation::Range4S), Some(Severity::Info));
    }

    #[test]
    fn test_rule_keys_are_canonical() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "rules": { "41s": "warning", "r4s": "off", "12S": "info" } }"#,
        )
        .unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.rules.get("41S"), Some(&RuleSeverity::Warning));
        assert_eq!(config.rules.get("R4S"), Some(&RuleSeverity::Off));
        assert!(config.rules.get("41s").is_none());
        assert_eq!(config.unknown_rules(), vec!["12S"]);
    }

    #[test]
    fn test_conflicting_rule_spellings_fail() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "rules": { "41S": "warning", "41s": "error" } }"#,
        )
        .unwrap();
        let err = load_config(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("configured more than once"));
    }

    #[test]
    fn test_agreeing_rule_spellings_merge() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "rules": { "8X": "off", "8x": "off" } }"#,
        )
        .unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.severity_of(Violation::Bias8X), None);
    }

    #[test]
    fn test_chart_label_wins_over_case_variant() {
        let mut config = Config::default();
        config.rules.insert("41s".to_string(), RuleSeverity::Off);
        config.rules.insert("41S".to_string(), RuleSeverity::Info);
        assert_eq!(config.severity_of(Violation::Shift41S), Some(Severity::Info));
    }

    #[test]
    fn test_level_labels_case_insensitive() {
        let reader = ReaderConfig::default();
        assert_eq!(reader.level_for("QC LV I"), Level::Level1);
        assert_eq!(reader.level_for(" qc lv ii "), Level::Level2);
        assert_eq!(reader.level_for("Patient"), Level::Unclassified);
        assert_eq!(reader.level_for(""), Level::Unclassified);
    }

    #[test]
    fn test_is_ignored_archive() {
        let set = build_ignore_set(&["**/archive/**".to_string()]).unwrap();
        assert!(is_ignored(Path::new("runs/archive/qc_01_02_20.csv"), &set));
        assert!(!is_ignored(Path::new("runs/qc_01_02_20.csv"), &set));
    }

    #[test]
    fn test_default_config_round_trips() {
        let json = default_config_json().unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.rules.len(), 5);
        assert!(config.unknown_rules().is_empty());
        assert!(json.contains("levelLabels"));
    }
}
