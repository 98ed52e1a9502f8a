//! Proposal comment bodies: rendering, parsing and the status line.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::checkbox::UNCHECKED_LINE;
use super::codec::{encode_marker, MarkerData};
use super::fence::first_unfenced;
use crate::domain::{IntentError, IntentResult};
use crate::proposal::{IntentUpdate, UpdateAction};

const STATUS_PREFIX: &str = "**Status:**";
const CONTENT_SUMMARY: &str = "<summary>Suggested content</summary>";
const CONTENT_LANG: &str = "markdown";
/// Fence attribute: content uses CRLF line endings
const CRLF_ATTR: &str = "newline=crlf";
/// Fence attribute: content has no final line ending
const NO_EOL_ATTR: &str = "eol=none";

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\*\*Status:\*\* ([^\r\n]*)\r?$").expect("status pattern compiles")
});

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\*\*Action:\*\* ([A-Za-z]+)").expect("action pattern compiles")
});

/// Lifecycle status shown on a proposal comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommentStatus {
    Committed { sha: String },
    Reverted,
    /// Permanently inapplicable, e.g. the target file is gone
    Resolved { reason: String },
}

impl CommentStatus {
    fn render(&self) -> String {
        match self {
            CommentStatus::Committed { sha } => format!("{STATUS_PREFIX} COMMITTED in `{sha}`"),
            CommentStatus::Reverted => format!("{STATUS_PREFIX} REVERTED"),
            CommentStatus::Resolved { reason } => format!("{STATUS_PREFIX} RESOLVED: {reason}"),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix("COMMITTED in ") {
            return Some(CommentStatus::Committed {
                sha: rest.trim_matches('`').to_string(),
            });
        }
        if text == "REVERTED" {
            return Some(CommentStatus::Reverted);
        }
        text.strip_prefix("RESOLVED: ").map(|reason| CommentStatus::Resolved {
            reason: reason.to_string(),
        })
    }
}

/// Replace the status line, or append one. Lines inside fenced content
/// are never touched.
pub fn set_status(body: &str, status: &CommentStatus) -> String {
    let line = status.render();
    match first_unfenced(&STATUS_RE, body).and_then(|c| c.get(1)) {
        Some(current) => {
            let start = current.start() - STATUS_PREFIX.len() - 1;
            format!("{}{line}{}", &body[..start], &body[current.end()..])
        }
        None => format!("{}\n\n{line}\n", body.trim_end()),
    }
}

/// Current status line, if any.
pub fn comment_status(body: &str) -> Option<CommentStatus> {
    let caps = first_unfenced(&STATUS_RE, body)?;
    CommentStatus::parse(caps.get(1)?.as_str())
}

/// A backtick fence longer than any run inside `content`.
fn fence_for(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// Render the comment body for one proposal.
pub fn render_proposal_comment(
    update: &IntentUpdate,
    marker: &MarkerData,
    checkbox_enabled: bool,
) -> String {
    let mut body = String::new();
    body.push_str(&encode_marker(marker));
    body.push('\n');
    body.push_str(&format!(
        "### Intent Layer: {} `{}`\n\n",
        update.action, update.node_path
    ));
    match &update.other_node_path {
        Some(other) => body.push_str(&format!(
            "**Node:** `{}` (kept in sync with `{other}`)\n",
            update.node_path
        )),
        None => body.push_str(&format!("**Node:** `{}`\n", update.node_path)),
    }
    body.push_str(&format!("**Action:** {}\n", update.action));
    if !update.reason.is_empty() {
        body.push_str(&format!("**Reason:** {}\n", update.reason));
    }

    if let Some(content) = &update.suggested_content {
        let fence = fence_for(content);
        let mut info = CONTENT_LANG.to_string();
        if content.contains("\r\n") {
            info.push(' ');
            info.push_str(CRLF_ATTR);
        }
        if !content.is_empty() && !content.ends_with('\n') {
            info.push(' ');
            info.push_str(NO_EOL_ATTR);
        }
        body.push_str(&format!("\n<details>\n{CONTENT_SUMMARY}\n\n{fence}{info}\n"));
        body.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&format!("{fence}\n\n</details>\n"));
    }

    if checkbox_enabled {
        body.push('\n');
        body.push_str(UNCHECKED_LINE);
        body.push('\n');
    }
    body
}

/// Action and content recovered from a proposal comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalContent {
    pub action: UpdateAction,
    /// Content exactly as rendered, line endings included
    pub suggested_content: Option<String>,
}

fn extract_fenced_content(body: &str) -> IntentResult<Option<String>> {
    let Some(start) = body.find(CONTENT_SUMMARY) else {
        return Ok(None);
    };
    let mut lines = body[start + CONTENT_SUMMARY.len()..]
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l));

    let (fence, info) = loop {
        match lines.next() {
            Some(line) if line.starts_with("```") => {
                let ticks = line.len() - line.trim_start_matches('`').len();
                break (&line[..ticks], &line[ticks..]);
            }
            Some(_) => continue,
            None => return Ok(None),
        }
    };
    let attrs: Vec<&str> = info.split_whitespace().collect();
    let newline = if attrs.contains(&CRLF_ATTR) { "\r\n" } else { "\n" };

    let mut content = String::new();
    for line in lines {
        if line.trim_end() == fence {
            if attrs.contains(&NO_EOL_ATTR) && content.ends_with(newline) {
                content.truncate(content.len() - newline.len());
            }
            return Ok(Some(content));
        }
        content.push_str(line);
        content.push_str(newline);
    }
    Err(IntentError::MalformedInput(
        "suggested content fence is not closed".to_string(),
    ))
}

/// Recover the action and suggested content for an apply.
pub fn parse_proposal_comment(body: &str) -> IntentResult<ProposalContent> {
    let action: UpdateAction = ACTION_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| IntentError::MalformedInput("comment has no action line".to_string()))?
        .as_str()
        .parse()?;
    let suggested_content = extract_fenced_content(body)?;
    if action != UpdateAction::Delete && suggested_content.is_none() {
        return Err(IntentError::MalformedInput(format!(
            "{action} proposal has no suggested content"
        )));
    }
    Ok(ProposalContent {
        action,
        suggested_content,
    })
}
