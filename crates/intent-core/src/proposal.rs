//! Proposed create/update/delete operations on intent nodes.
//!
//! Proposals arrive as JSON from the decision model. Each one is validated
//! on its own: a malformed entry is rejected and recorded, the rest go on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::{parent_dir, IntentError, IntentFileKind, IntentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Create,
    Update,
    Delete,
}

impl UpdateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateAction::Create => "create",
            UpdateAction::Update => "update",
            UpdateAction::Delete => "delete",
        }
    }

    /// Commit message tag, e.g. `[INTENT:ADD]`.
    pub fn commit_tag(self) -> &'static str {
        match self {
            UpdateAction::Create => "[INTENT:ADD]",
            UpdateAction::Update => "[INTENT:UPDATE]",
            UpdateAction::Delete => "[INTENT:DELETE]",
        }
    }
}

impl std::fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UpdateAction {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(UpdateAction::Create),
            "update" => Ok(UpdateAction::Update),
            "delete" => Ok(UpdateAction::Delete),
            other => Err(IntentError::MalformedInput(format!("unknown action: {other}"))),
        }
    }
}

/// One proposed change to an intent node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentUpdate {
    pub node_path: String,
    /// Other-kind file kept in sync with `node_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_node_path: Option<String>,
    pub action: UpdateAction,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_content: Option<String>,
}

impl IntentUpdate {
    /// Check that the path names an intent file and that the content
    /// fields match the action.
    pub fn validate(&self) -> IntentResult<()> {
        let malformed = |msg: &str| {
            Err(IntentError::MalformedInput(format!(
                "{} {}: {msg}",
                self.action, self.node_path
            )))
        };

        let Some(kind) = IntentFileKind::from_path(&self.node_path) else {
            return malformed("path is not an intent file");
        };
        if let Some(other) = &self.other_node_path {
            if IntentFileKind::from_path(other) != Some(kind.other())
                || parent_dir(other) != parent_dir(&self.node_path)
            {
                return malformed("other node must be the other intent file in the same directory");
            }
        }

        let has_current = self.current_content.is_some();
        let has_suggested = self
            .suggested_content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        match self.action {
            UpdateAction::Create if !has_suggested => malformed("create requires suggested content"),
            UpdateAction::Create if has_current => malformed("create must not carry current content"),
            UpdateAction::Update if !has_suggested => malformed("update requires suggested content"),
            UpdateAction::Update if !has_current => malformed("update requires current content"),
            UpdateAction::Delete if !has_current => malformed("delete requires current content"),
            UpdateAction::Delete if self.suggested_content.is_some() => {
                malformed("delete must not carry suggested content")
            }
            _ => Ok(()),
        }
    }

}

/// A proposal that failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedProposal {
    pub index: usize,
    pub node_path: Option<String>,
    pub error: String,
}

/// Outcome of [`parse_proposals`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedProposals {
    pub updates: Vec<IntentUpdate>,
    pub rejected: Vec<RejectedProposal>,
}

/// Strip a surrounding ```json fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse `{"updates": [...]}` (or a bare array) into validated updates.
///
/// Only an unreadable document is an error; bad items are collected in
/// `rejected`.
pub fn parse_proposals(json: &str) -> IntentResult<ParsedProposals> {
    let document: Value = serde_json::from_str(strip_code_fence(json))
        .map_err(|e| IntentError::MalformedInput(format!("proposal document: {e}")))?;
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("updates") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(IntentError::MalformedInput(
                    "proposal document has no \"updates\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(IntentError::MalformedInput(
                "proposal document must be an object or array".to_string(),
            ))
        }
    };

    let mut parsed = ParsedProposals::default();
    for (index, item) in items.into_iter().enumerate() {
        let node_path = item
            .get("nodePath")
            .and_then(Value::as_str)
            .map(str::to_string);
        let result = serde_json::from_value::<IntentUpdate>(item)
            .map_err(|e| IntentError::MalformedInput(e.to_string()))
            .and_then(|update| update.validate().map(|_| update));
        match result {
            Ok(update) => parsed.updates.push(update),
            Err(err) => {
                warn!(index, node = ?node_path, error = %err, "rejected proposal");
                parsed.rejected.push(RejectedProposal {
                    index,
                    node_path,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(action: UpdateAction, current: Option<&str>, suggested: Option<&str>) -> IntentUpdate {
        IntentUpdate {
            node_path: "src/AGENTS.md".into(),
            other_node_path: None,
            action,
            reason: "r".into(),
            current_content: current.map(str::to_string),
            suggested_content: suggested.map(str::to_string),
        }
    }

    #[test]
    fn action_content_consistency() {
        assert!(update(UpdateAction::Create, None, Some("# x\n")).validate().is_ok());
        assert!(update(UpdateAction::Create, None, None).validate().is_err());
        assert!(update(UpdateAction::Create, Some("old"), Some("new")).validate().is_err());
        assert!(update(UpdateAction::Update, Some("old"), Some("new")).validate().is_ok());
        assert!(update(UpdateAction::Update, None, Some("new")).validate().is_err());
        assert!(update(UpdateAction::Delete, Some("old"), None).validate().is_ok());
        assert!(update(UpdateAction::Delete, Some("old"), Some("new")).validate().is_err());
    }

    #[test]
    fn validation_errors_name_action_and_path() {
        let err = update(UpdateAction::Update, None, Some("x")).validate().unwrap_err();
        assert!(matches!(err, IntentError::MalformedInput(_)));
        assert!(err.to_string().contains("update src/AGENTS.md"));
    }

    #[test]
    fn other_node_must_be_sibling_of_other_kind() {
        let mut u = update(UpdateAction::Create, None, Some("x"));
        u.other_node_path = Some("src/CLAUDE.md".into());
        assert!(u.validate().is_ok());

        u.other_node_path = Some("lib/CLAUDE.md".into());
        assert!(u.validate().is_err());
        u.other_node_path = Some("src/AGENTS.md".into());
        assert!(u.validate().is_err());
    }

    #[test]
    fn non_intent_paths_are_rejected() {
        let mut u = update(UpdateAction::Create, None, Some("x"));
        u.node_path = "src/README.md".into();
        assert!(u.validate().is_err());
    }

    #[test]
    fn parse_isolates_bad_items() {
        let json = r##"{"updates": [
            {"nodePath": "AGENTS.md", "action": "update", "reason": "api changed",
             "currentContent": "old", "suggestedContent": "new"},
            {"nodePath": "src/AGENTS.md", "action": "create"},
            {"nodePath": "lib/AGENTS.md", "action": "explode"},
            {"nodePath": "docs/CLAUDE.md", "action": "create", "suggestedContent": "# docs\n"}
        ]}"##;
        let parsed = parse_proposals(json).unwrap();
        assert_eq!(parsed.updates.len(), 2);
        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(parsed.rejected[0].index, 1);
        assert_eq!(parsed.rejected[1].node_path.as_deref(), Some("lib/AGENTS.md"));
    }

    #[test]
    fn parse_accepts_fenced_and_bare_arrays() {
        let fenced = "```json\n[{\"nodePath\": \"AGENTS.md\", \"action\": \"delete\", \"currentContent\": \"x\"}]\n```";
        let parsed = parse_proposals(fenced).unwrap();
        assert_eq!(parsed.updates[0].action, UpdateAction::Delete);
    }

    #[test]
    fn unreadable_document_is_an_error() {
        assert!(parse_proposals("not json").is_err());
        assert!(parse_proposals(r#"{"proposals": []}"#).is_err());
        assert!(parse_proposals(r#"{"updates": []}"#).unwrap().updates.is_empty());
    }
}
