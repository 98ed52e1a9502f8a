//! Ignore-pattern filtering for changed files.
//!
//! The aggregator only needs an `ignores(path)` predicate. Closures satisfy
//! it directly; [`IgnoreFilter`] wraps a gitignore-syntax matcher built from
//! the repository's `.intentlayerignore` file.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::domain::{IntentError, IntentResult};

/// Predicate deciding whether a changed file is excluded from updates.
pub trait IgnoreMatcher {
    fn ignores(&self, path: &str) -> bool;
}

impl<F> IgnoreMatcher for F
where
    F: Fn(&str) -> bool,
{
    fn ignores(&self, path: &str) -> bool {
        self(path)
    }
}

/// Gitignore-syntax matcher over repository-relative paths.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    matcher: Gitignore,
}

impl IgnoreFilter {
    /// A filter that ignores nothing.
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// Build from individual pattern lines.
    pub fn from_patterns<I, S>(patterns: I) -> IntentResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("");
        for line in patterns {
            builder
                .add_line(None, line.as_ref())
                .map_err(|e| IntentError::Config(format!("invalid ignore pattern: {e}")))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| IntentError::Config(format!("invalid ignore patterns: {e}")))?;
        Ok(Self { matcher })
    }

    /// Build from the contents of an ignore file.
    pub fn parse(contents: &str) -> IntentResult<Self> {
        Self::from_patterns(contents.lines())
    }

    /// Load an ignore file; a missing file yields an empty filter.
    pub fn from_file(path: &Path) -> IntentResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                debug!(path = %path.display(), "loaded ignore file");
                Self::parse(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}

impl IgnoreMatcher for IgnoreFilter {
    fn ignores(&self, path: &str) -> bool {
        if self.matcher.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, false)
            .is_ignore()
    }
}
