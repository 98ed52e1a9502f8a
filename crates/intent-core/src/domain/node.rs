//! Intent file kinds and repository path helpers.

use serde::{Deserialize, Serialize};

/// The two supported intent file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentFileKind {
    Agents,
    Claude,
}

impl IntentFileKind {
    pub const ALL: [IntentFileKind; 2] = [IntentFileKind::Agents, IntentFileKind::Claude];

    /// File name on disk.
    pub fn file_name(self) -> &'static str {
        match self {
            IntentFileKind::Agents => "AGENTS.md",
            IntentFileKind::Claude => "CLAUDE.md",
        }
    }

    /// The other kind.
    pub fn other(self) -> Self {
        match self {
            IntentFileKind::Agents => IntentFileKind::Claude,
            IntentFileKind::Claude => IntentFileKind::Agents,
        }
    }

    /// Kind for a bare file name, if it is an intent file.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.file_name() == name)
    }

    /// Kind for a repository path, judged by its last segment.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::from_file_name(file_name(path))
    }
}

impl std::str::FromStr for IntentFileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agents" | "agents.md" => Ok(IntentFileKind::Agents),
            "claude" | "claude.md" => Ok(IntentFileKind::Claude),
            other => Err(format!("unknown intent file kind: {other}")),
        }
    }
}

impl std::fmt::Display for IntentFileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Which intent file kinds a repository manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSelection {
    #[default]
    Agents,
    Claude,
    Both,
}

impl FileSelection {
    pub fn includes(self, kind: IntentFileKind) -> bool {
        match self {
            FileSelection::Agents => kind == IntentFileKind::Agents,
            FileSelection::Claude => kind == IntentFileKind::Claude,
            FileSelection::Both => true,
        }
    }

    /// Kind used when a brand-new node is proposed.
    pub fn primary(self) -> IntentFileKind {
        match self {
            FileSelection::Claude => IntentFileKind::Claude,
            FileSelection::Agents | FileSelection::Both => IntentFileKind::Agents,
        }
    }
}

impl std::str::FromStr for FileSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agents" => Ok(FileSelection::Agents),
            "claude" => Ok(FileSelection::Claude),
            "both" => Ok(FileSelection::Both),
            other => Err(format!("unknown file selection: {other}")),
        }
    }
}

/// One detected intent file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFile {
    /// Repository-relative path
    pub path: String,
    pub kind: IntentFileKind,
    /// Raw link target when the file is a symlink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<String>,
}

impl IntentFile {
    /// A regular (non-symlink) intent file. Returns `None` for other names.
    pub fn new(path: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let kind = IntentFileKind::from_path(&path)?;
        Some(Self {
            path,
            kind,
            symlink_target: None,
        })
    }

    /// Mark this file as a symlink to `target`.
    pub fn with_symlink_target(mut self, target: impl Into<String>) -> Self {
        self.symlink_target = Some(target.into());
        self
    }

    pub fn directory(&self) -> &str {
        parent_dir(&self.path)
    }

    pub fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }
}

/// Directory part of a repository path; `""` for root-level paths.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Last segment of a repository path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Number of path segments.
pub fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

/// Join a directory and a file name, treating `""` as the root.
pub fn join_path(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{directory}/{name}")
    }
}

/// Whether `ancestor` is a strict ancestor directory of `dir`.
///
/// The root directory `""` is an ancestor of every non-root directory.
pub fn is_strict_ancestor_dir(ancestor: &str, dir: &str) -> bool {
    if ancestor == dir {
        return false;
    }
    ancestor.is_empty()
        || (dir.len() > ancestor.len()
            && dir.starts_with(ancestor)
            && dir.as_bytes()[ancestor.len()] == b'/')
}
