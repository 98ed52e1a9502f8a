//! The `INTENT_LAYER` marker: durable proposal state inside a comment.
//!
//! Wire format (stable; old comments must keep decoding):
//!
//! ```text
//! <!-- INTENT_LAYER node=<v> otherNode=<v> appliedCommit=<v> headSha=<v> -->
//! ```
//!
//! Values are percent-encoded. `otherNode` is optional. `appliedCommit` is
//! required but may be empty, meaning "not applied". Unknown keys are
//! ignored on decode.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

pub const MARKER_PREFIX: &str = "<!-- INTENT_LAYER";
pub const MARKER_SUFFIX: &str = "-->";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!-- INTENT_LAYER((?: [^\s=]+=\S*)*) ?-->").expect("marker pattern compiles")
});

/// State carried by a proposal comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerData {
    pub node_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_node_path: Option<String>,
    /// PR head commit the proposal was generated against
    pub head_sha: String,
    /// Commit that applied the proposal; `None` while proposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_commit: Option<String>,
}

impl MarkerData {
    pub fn new(node_path: impl Into<String>, head_sha: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            other_node_path: None,
            head_sha: head_sha.into(),
            applied_commit: None,
        }
    }

    pub fn with_other_node(mut self, other: impl Into<String>) -> Self {
        self.other_node_path = Some(other.into());
        self
    }

    pub fn with_applied_commit(mut self, sha: Option<String>) -> Self {
        self.applied_commit = sha;
        self
    }

    pub fn is_applied(&self) -> bool {
        self.applied_commit.is_some()
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{key}={}", urlencoding::encode(value))
}

/// Render the marker comment.
pub fn encode_marker(data: &MarkerData) -> String {
    let mut fields = vec![pair("node", &data.node_path)];
    if let Some(other) = &data.other_node_path {
        fields.push(pair("otherNode", other));
    }
    fields.push(pair("appliedCommit", data.applied_commit.as_deref().unwrap_or("")));
    fields.push(pair("headSha", &data.head_sha));
    format!("{MARKER_PREFIX} {} {MARKER_SUFFIX}", fields.join(" "))
}

/// Find and decode the first marker in `body`.
///
/// Returns `None` when there is no complete marker, a required key is
/// missing, or a value is not valid percent-encoded UTF-8.
pub fn decode_marker(body: &str) -> Option<MarkerData> {
    let captures = MARKER_RE.captures(body)?;
    let mut fields = HashMap::new();
    for token in captures.get(1)?.as_str().split_whitespace() {
        let (key, raw) = token.split_once('=')?;
        fields.insert(key, urlencoding::decode(raw).ok()?.into_owned());
    }

    let node_path = fields.remove("node").filter(|n| !n.is_empty())?;
    let head_sha = fields.remove("headSha")?;
    let applied_commit = fields.remove("appliedCommit")?;
    Some(MarkerData {
        node_path,
        other_node_path: fields.remove("otherNode").filter(|o| !o.is_empty()),
        head_sha,
        applied_commit: Some(applied_commit).filter(|c| !c.is_empty()),
    })
}

/// Replace the marker in `body`, or prepend one if there is none.
pub fn replace_marker(body: &str, data: &MarkerData) -> String {
    let marker = encode_marker(data);
    if MARKER_RE.is_match(body) {
        MARKER_RE.replace(body, NoExpand(&marker)).into_owned()
    } else {
        format!("{marker}\n{body}")
    }
}
