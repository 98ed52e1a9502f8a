//! Intent Layer configuration.
//!
//! Loaded from an optional TOML file, then overridden by `INTENT_*`
//! environment variables. Every field has a default, so an empty file and
//! an empty environment both yield a working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{FileSelection, IntentError, IntentFileKind, IntentResult};

/// Thresholds above which an ancestor node is recommended for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentReviewThresholds {
    /// Updated child nodes that signal a cross-cutting change
    pub min_children: usize,
    /// Added plus removed files across children
    pub min_structural_changes: usize,
    /// Changed files across children
    pub min_changed_files: usize,
}

impl Default for ParentReviewThresholds {
    fn default() -> Self {
        Self {
            min_children: 3,
            min_structural_changes: 5,
            min_changed_files: 10,
        }
    }
}

/// Re-fetch behaviour before acting on a checkbox edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Compare the event body with a fresh read before acting
    pub enabled: bool,
    /// Wait this long before the fresh read
    pub settle_delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_delay_ms: 0,
        }
    }
}

impl DebounceConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Intent file kinds under management
    pub files: FileSelection,
    /// One kind is a symlink to the other instead of a duplicate
    pub symlink: bool,
    /// Which kind holds the real content in symlink mode
    pub symlink_source: IntentFileKind,
    /// Propose brand-new nodes for uncovered directories
    pub new_nodes: bool,
    /// Render the approval checkbox on proposal comments
    pub checkbox: bool,
    /// Gitignore-syntax file listing paths excluded from updates
    pub ignore_file: String,
    pub parent_review: ParentReviewThresholds,
    pub debounce: DebounceConfig,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            files: FileSelection::Agents,
            symlink: false,
            symlink_source: IntentFileKind::Agents,
            new_nodes: true,
            checkbox: true,
            ignore_file: ".intentlayerignore".to_string(),
            parent_review: ParentReviewThresholds::default(),
            debounce: DebounceConfig::default(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> IntentResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(IntentError::Config(format!("{key}: expected a boolean, got {other}"))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> IntentResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IntentError::Config(format!("{key}: expected a number, got {value}")))
}

impl IntentConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> IntentResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| IntentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> IntentResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Defaults overridden by environment variables.
    ///
    /// Reads:
    /// - INTENT_FILES (agents | claude | both)
    /// - INTENT_SYMLINK, INTENT_SYMLINK_SOURCE
    /// - INTENT_NEW_NODES, INTENT_CHECKBOX, INTENT_IGNORE_FILE
    /// - INTENT_PARENT_MIN_CHILDREN, INTENT_PARENT_MIN_STRUCTURAL, INTENT_PARENT_MIN_FILES
    /// - INTENT_DEBOUNCE, INTENT_DEBOUNCE_SETTLE_MS
    pub fn from_env() -> IntentResult<Self> {
        Self::default().with_env()
    }

    /// Apply `INTENT_*` environment overrides on top of `self`.
    pub fn with_env(self) -> IntentResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> IntentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("INTENT_FILES") {
            self.files = v.parse().map_err(IntentError::Config)?;
        }
        if let Some(v) = lookup("INTENT_SYMLINK") {
            self.symlink = parse_bool("INTENT_SYMLINK", &v)?;
        }
        if let Some(v) = lookup("INTENT_SYMLINK_SOURCE") {
            self.symlink_source = v.parse().map_err(IntentError::Config)?;
        }
        if let Some(v) = lookup("INTENT_NEW_NODES") {
            self.new_nodes = parse_bool("INTENT_NEW_NODES", &v)?;
        }
        if let Some(v) = lookup("INTENT_CHECKBOX") {
            self.checkbox = parse_bool("INTENT_CHECKBOX", &v)?;
        }
        if let Some(v) = lookup("INTENT_IGNORE_FILE") {
            self.ignore_file = v;
        }
        if let Some(v) = lookup("INTENT_PARENT_MIN_CHILDREN") {
            self.parent_review.min_children = parse_num("INTENT_PARENT_MIN_CHILDREN", &v)?;
        }
        if let Some(v) = lookup("INTENT_PARENT_MIN_STRUCTURAL") {
            self.parent_review.min_structural_changes =
                parse_num("INTENT_PARENT_MIN_STRUCTURAL", &v)?;
        }
        if let Some(v) = lookup("INTENT_PARENT_MIN_FILES") {
            self.parent_review.min_changed_files = parse_num("INTENT_PARENT_MIN_FILES", &v)?;
        }
        if let Some(v) = lookup("INTENT_DEBOUNCE") {
            self.debounce.enabled = parse_bool("INTENT_DEBOUNCE", &v)?;
        }
        if let Some(v) = lookup("INTENT_DEBOUNCE_SETTLE_MS") {
            self.debounce.settle_delay_ms = parse_num("INTENT_DEBOUNCE_SETTLE_MS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> IntentResult<()> {
        let t = &self.parent_review;
        if t.min_children == 0 || t.min_structural_changes == 0 || t.min_changed_files == 0 {
            return Err(IntentError::Config(
                "parent review thresholds must be greater than zero".to_string(),
            ));
        }
        if self.symlink && self.files != FileSelection::Both {
            return Err(IntentError::Config(
                "symlink mode requires files = \"both\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Kind that becomes the hierarchy node when a directory holds both.
    pub fn primary_kind(&self) -> IntentFileKind {
        if self.symlink {
            self.symlink_source
        } else {
            self.files.primary()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = IntentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.parent_review.min_children, 3);
        assert_eq!(config.parent_review.min_structural_changes, 5);
        assert_eq!(config.parent_review.min_changed_files, 10);
        assert!(config.debounce.enabled);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(IntentConfig::from_toml_str("").unwrap(), IntentConfig::default());
    }

    #[test]
    fn toml_overrides_nested_tables() {
        let config = IntentConfig::from_toml_str(
            r#"
files = "both"
symlink = true
symlink_source = "claude"
new_nodes = false

[parent_review]
min_children = 4

[debounce]
settle_delay_ms = 1500
"#,
        )
        .unwrap();
        assert_eq!(config.files, FileSelection::Both);
        assert_eq!(config.primary_kind(), IntentFileKind::Claude);
        assert!(!config.new_nodes);
        assert_eq!(config.parent_review.min_children, 4);
        assert_eq!(config.parent_review.min_changed_files, 10);
        assert_eq!(config.debounce.settle_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn env_overrides() {
        let config = IntentConfig::default()
            .with_overrides(lookup(&[
                ("INTENT_FILES", "both"),
                ("INTENT_CHECKBOX", "false"),
                ("INTENT_PARENT_MIN_FILES", "20"),
            ]))
            .unwrap();
        assert_eq!(config.files, FileSelection::Both);
        assert!(!config.checkbox);
        assert_eq!(config.parent_review.min_changed_files, 20);
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let err = IntentConfig::default()
            .with_overrides(lookup(&[("INTENT_SYMLINK", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, IntentError::Config(_)));

        let err = IntentConfig::default()
            .with_overrides(lookup(&[("INTENT_PARENT_MIN_CHILDREN", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn symlink_requires_both_kinds() {
        let config = IntentConfig {
            symlink: true,
            ..IntentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
