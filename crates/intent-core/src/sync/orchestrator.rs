//! Checkbox-gated apply and revert.
//!
//! Each proposal comment moves through three states, all recorded in the
//! comment itself:
//!
//! ```text
//! Proposed (no appliedCommit) --check--> Applied (appliedCommit = sha)
//! Applied --uncheck--> Proposed          (content restored from the parent
//!                                         of appliedCommit)
//! any --target file vanished--> Resolved (checkbox removed)
//! ```
//!
//! Every write passes the live blob SHA, so a racing delivery fails with a
//! retryable `Conflict` instead of clobbering newer state. Nothing here
//! retries on its own.

use intent_hosting::HostingClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{DebounceConfig, IntentConfig};
use crate::domain::{join_path, parent_dir, IntentError, IntentFileKind, IntentResult};
use crate::marker::{
    checkbox_state, decode_marker, parse_proposal_comment, remove_checkbox, replace_marker,
    set_status, CheckboxState, CommentStatus, MarkerData,
};
use crate::proposal::{IntentUpdate, UpdateAction};
use crate::telemetry::short_digest;

const REVERT_TAG: &str = "[INTENT:REVERT]";

/// Where and how approved proposals are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub branch: String,
    /// Only the source kind is written; the other kind links to it
    pub symlink: bool,
    pub symlink_source: IntentFileKind,
    pub debounce: DebounceConfig,
}

impl ApplyOptions {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            symlink: false,
            symlink_source: IntentFileKind::Agents,
            debounce: DebounceConfig::default(),
        }
    }

    pub fn from_config(branch: impl Into<String>, config: &IntentConfig) -> Self {
        Self {
            branch: branch.into(),
            symlink: config.symlink,
            symlink_source: config.symlink_source,
            debounce: config.debounce,
        }
    }
}

/// A comment edit observed by a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxEvent {
    pub comment_id: u64,
    /// Body as delivered with the event
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoMarker,
    NoCheckbox,
    /// The comment changed again after this event was sent
    Unstable,
}

/// Effect of one write on one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PathChange {
    Written { commit_sha: String },
    Deleted { commit_sha: String },
    /// Content already matched; nothing was committed
    Unchanged,
}

impl PathChange {
    pub fn commit_sha(&self) -> Option<&str> {
        match self {
            PathChange::Written { commit_sha } | PathChange::Deleted { commit_sha } => {
                Some(commit_sha)
            }
            PathChange::Unchanged => None,
        }
    }
}

/// Outcome for the second managed file. Its failure never undoes the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondaryResult {
    pub path: String,
    pub change: Option<PathChange>,
    pub error: Option<String>,
}

impl SecondaryResult {
    fn from_result(path: &str, result: IntentResult<PathChange>) -> Self {
        match result {
            Ok(change) => Self {
                path: path.to_string(),
                change: Some(change),
                error: None,
            },
            Err(err) => {
                warn!(node = %path, error = %err, "secondary write failed");
                Self {
                    path: path.to_string(),
                    change: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub node_path: String,
    pub action: UpdateAction,
    /// Commit recorded as `appliedCommit`
    pub commit_sha: String,
    pub secondary: Option<SecondaryResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertResult {
    pub node_path: String,
    pub primary: PathChange,
    pub secondary: Option<SecondaryResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckboxOutcome {
    /// Desired state already holds; no network call was made
    NoOp,
    Skipped { reason: SkipReason },
    Applied(ApplyResult),
    Reverted(RevertResult),
    Resolved { node_path: String, reason: String },
}

/// Drives proposal comments through their lifecycle.
pub struct SyncOrchestrator<C> {
    client: C,
    options: ApplyOptions,
}

impl<C: HostingClient> SyncOrchestrator<C> {
    pub fn new(client: C, options: ApplyOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Primary and optional secondary write targets for a node pair.
    fn targets(&self, node_path: &str, other: Option<&str>) -> (String, Option<String>) {
        if !self.options.symlink {
            return (node_path.to_string(), other.map(str::to_string));
        }
        // The link file is never written; the source sits beside it.
        let source = join_path(
            parent_dir(node_path),
            self.options.symlink_source.file_name(),
        );
        (source, None)
    }

    /// React to a checkbox edit on a proposal comment.
    #[instrument(skip(self, event), fields(comment = event.comment_id))]
    pub async fn handle_checkbox_event(&self, event: &CheckboxEvent) -> IntentResult<CheckboxOutcome> {
        let Some(marker) = decode_marker(&event.body) else {
            debug!("comment has no intent marker");
            return Ok(CheckboxOutcome::Skipped {
                reason: SkipReason::NoMarker,
            });
        };
        let state = checkbox_state(&event.body);
        let wants_apply = match (state, marker.is_applied()) {
            (CheckboxState::Absent, _) => {
                debug!(node = %marker.node_path, "comment has no checkbox");
                return Ok(CheckboxOutcome::Skipped {
                    reason: SkipReason::NoCheckbox,
                });
            }
            (CheckboxState::Checked, false) => true,
            (CheckboxState::Unchecked, true) => false,
            (CheckboxState::Checked, true) | (CheckboxState::Unchecked, false) => {
                debug!(node = %marker.node_path, ?state, "checkbox already matches marker");
                return Ok(CheckboxOutcome::NoOp);
            }
        };

        let body = if self.options.debounce.enabled {
            let delay = self.options.debounce.settle_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let fresh = self.client.get_comment(event.comment_id).await?;
            if fresh.body != event.body {
                info!(
                    node = %marker.node_path,
                    event_digest = %short_digest(&event.body),
                    current_digest = %short_digest(&fresh.body),
                    "comment changed since event; skipping"
                );
                return Ok(CheckboxOutcome::Skipped {
                    reason: SkipReason::Unstable,
                });
            }
            fresh.body
        } else {
            event.body.clone()
        };

        if wants_apply {
            self.apply_from_comment(event.comment_id, &body, &marker).await
        } else {
            self.revert_from_comment(event.comment_id, &body, &marker).await
        }
    }

    async fn apply_from_comment(
        &self,
        comment_id: u64,
        body: &str,
        marker: &MarkerData,
    ) -> IntentResult<CheckboxOutcome> {
        let proposal =
            parse_proposal_comment(body).map_err(|e| e.context("apply", &marker.node_path))?;
        let update = IntentUpdate {
            node_path: marker.node_path.clone(),
            other_node_path: marker.other_node_path.clone(),
            action: proposal.action,
            reason: format!("approved in comment {comment_id}"),
            current_content: None,
            suggested_content: proposal.suggested_content,
        };

        let result = match self.apply_update(&update).await {
            Ok(result) => result,
            Err(IntentError::NotFound(_)) => {
                return self.resolve(comment_id, body, marker).await;
            }
            Err(err) => return Err(err),
        };

        let applied = marker
            .clone()
            .with_applied_commit(Some(result.commit_sha.clone()));
        let updated = set_status(
            &replace_marker(body, &applied),
            &CommentStatus::Committed {
                sha: result.commit_sha.clone(),
            },
        );
        self.client.update_comment(comment_id, &updated).await?;
        info!(node = %marker.node_path, commit = %result.commit_sha, "proposal committed");
        Ok(CheckboxOutcome::Applied(result))
    }

    async fn revert_from_comment(
        &self,
        comment_id: u64,
        body: &str,
        marker: &MarkerData,
    ) -> IntentResult<CheckboxOutcome> {
        let result = match self.revert_applied(marker).await {
            Ok(result) => result,
            Err(IntentError::NotFound(_)) => {
                return self.resolve(comment_id, body, marker).await;
            }
            Err(err) => return Err(err),
        };

        let cleared = marker.clone().with_applied_commit(None);
        let updated = set_status(&replace_marker(body, &cleared), &CommentStatus::Reverted);
        self.client.update_comment(comment_id, &updated).await?;
        info!(node = %marker.node_path, "proposal reverted");
        Ok(CheckboxOutcome::Reverted(result))
    }

    async fn resolve(
        &self,
        comment_id: u64,
        body: &str,
        marker: &MarkerData,
    ) -> IntentResult<CheckboxOutcome> {
        let reason = format!(
            "`{}` no longer exists on `{}`",
            marker.node_path, self.options.branch
        );
        let updated = set_status(
            &remove_checkbox(body),
            &CommentStatus::Resolved {
                reason: reason.clone(),
            },
        );
        self.client.update_comment(comment_id, &updated).await?;
        warn!(node = %marker.node_path, "target file vanished; proposal resolved");
        Ok(CheckboxOutcome::Resolved {
            node_path: marker.node_path.clone(),
            reason,
        })
    }

    /// Write one proposal to the branch.
    ///
    /// A create on an existing file fails with `Conflict`; an update or
    /// delete of a missing file fails with `NotFound`.
    #[instrument(skip(self, update), fields(node = %update.node_path, action = %update.action))]
    pub async fn apply_update(&self, update: &IntentUpdate) -> IntentResult<ApplyResult> {
        let (primary, secondary) =
            self.targets(&update.node_path, update.other_node_path.as_deref());
        let message = commit_message(update.action.commit_tag(), &primary, &update.reason);

        let change = self
            .write_primary(&primary, update, &message)
            .await
            .map_err(|e| e.context(update.action.as_str(), &primary))?;
        let commit_sha = change
            .commit_sha()
            .map(str::to_string)
            .ok_or_else(|| IntentError::Upstream(format!("no commit produced for {primary}")))?;
        info!(node = %primary, commit = %commit_sha, "primary file written");

        let secondary = match secondary {
            Some(path) => {
                let message = commit_message(update.action.commit_tag(), &path, &update.reason);
                let result = self
                    .write_secondary(&path, update, &message)
                    .await
                    .map_err(|e| e.context(update.action.as_str(), &path));
                Some(SecondaryResult::from_result(&path, result))
            }
            None => None,
        };

        Ok(ApplyResult {
            node_path: update.node_path.clone(),
            action: update.action,
            commit_sha,
            secondary,
        })
    }

    async fn write_primary(
        &self,
        path: &str,
        update: &IntentUpdate,
        message: &str,
    ) -> IntentResult<PathChange> {
        let branch = &self.options.branch;
        let live = self.client.get_content(path, branch).await?;
        match (update.action, live) {
            (UpdateAction::Create, Some(_)) => Err(IntentError::conflict(
                path,
                format!("{path} already exists on {branch}"),
            )),
            (UpdateAction::Create, None) => {
                let content = suggested(update)?;
                let sha = self
                    .client
                    .create_or_update_content(path, content, message, branch, None)
                    .await?;
                Ok(PathChange::Written { commit_sha: sha })
            }
            (UpdateAction::Update | UpdateAction::Delete, None) => {
                Err(IntentError::NotFound(path.to_string()))
            }
            (UpdateAction::Update, Some(file)) => {
                let content = suggested(update)?;
                let sha = self
                    .client
                    .create_or_update_content(path, content, message, branch, Some(&file.sha))
                    .await?;
                Ok(PathChange::Written { commit_sha: sha })
            }
            (UpdateAction::Delete, Some(file)) => {
                let sha = self
                    .client
                    .delete_content(path, message, branch, &file.sha)
                    .await?;
                Ok(PathChange::Deleted { commit_sha: sha })
            }
        }
    }

    /// Mirror the primary write with identical content, creating or
    /// updating as needed.
    async fn write_secondary(
        &self,
        path: &str,
        update: &IntentUpdate,
        message: &str,
    ) -> IntentResult<PathChange> {
        let branch = &self.options.branch;
        let live = self.client.get_content(path, branch).await?;
        match (update.action, live) {
            (UpdateAction::Delete, None) => Ok(PathChange::Unchanged),
            (UpdateAction::Delete, Some(file)) => {
                let sha = self
                    .client
                    .delete_content(path, message, branch, &file.sha)
                    .await?;
                Ok(PathChange::Deleted { commit_sha: sha })
            }
            (UpdateAction::Create | UpdateAction::Update, live) => {
                let content = suggested(update)?;
                if live.as_ref().is_some_and(|f| f.content == content) {
                    return Ok(PathChange::Unchanged);
                }
                let prior = live.as_ref().map(|f| f.sha.as_str());
                let sha = self
                    .client
                    .create_or_update_content(path, content, message, branch, prior)
                    .await?;
                Ok(PathChange::Written { commit_sha: sha })
            }
        }
    }

    /// Undo an applied proposal using the parent of its applied commit.
    ///
    /// Each managed path is restored to its parent-commit content, or
    /// deleted if it did not exist there. A primary file that the applied
    /// commit wrote but that is gone from the branch fails with `NotFound`.
    #[instrument(skip(self, marker), fields(node = %marker.node_path))]
    pub async fn revert_applied(&self, marker: &MarkerData) -> IntentResult<RevertResult> {
        let applied = marker.applied_commit.as_deref().ok_or_else(|| {
            IntentError::MalformedInput(format!("revert {}: no applied commit", marker.node_path))
        })?;
        let commit = self.client.get_commit(applied).await?;
        let parent = commit.first_parent().ok_or_else(|| {
            IntentError::MalformedInput(format!("revert {}: commit {applied} has no parent", marker.node_path))
        })?;

        let (primary, secondary) =
            self.targets(&marker.node_path, marker.other_node_path.as_deref());

        let primary_change = self
            .revert_path(&primary, applied, parent)
            .await
            .map_err(|e| e.context("revert", &primary))?;

        let secondary = match secondary {
            Some(path) => {
                let result = self
                    .revert_path(&path, applied, parent)
                    .await
                    .map_err(|e| e.context("revert", &path));
                Some(SecondaryResult::from_result(&path, result))
            }
            None => None,
        };

        Ok(RevertResult {
            node_path: marker.node_path.clone(),
            primary: primary_change,
            secondary,
        })
    }

    async fn revert_path(&self, path: &str, applied: &str, parent: &str) -> IntentResult<PathChange> {
        let branch = &self.options.branch;
        let at_applied = self.client.get_content(path, applied).await?;
        let live = self.client.get_content(path, branch).await?;
        if at_applied.is_some() && live.is_none() {
            return Err(IntentError::NotFound(path.to_string()));
        }
        let prior = self.client.get_content(path, parent).await?;
        let message = commit_message(REVERT_TAG, path, "");

        match (prior, live) {
            (Some(prior), Some(live)) if prior.content == live.content => Ok(PathChange::Unchanged),
            (Some(prior), live) => {
                let sha = self
                    .client
                    .create_or_update_content(
                        path,
                        &prior.content,
                        &message,
                        branch,
                        live.as_ref().map(|f| f.sha.as_str()),
                    )
                    .await?;
                debug!(node = %path, "restored prior content");
                Ok(PathChange::Written { commit_sha: sha })
            }
            (None, Some(live)) => {
                let sha = self
                    .client
                    .delete_content(path, &message, branch, &live.sha)
                    .await?;
                debug!(node = %path, "deleted file absent before apply");
                Ok(PathChange::Deleted { commit_sha: sha })
            }
            (None, None) => Ok(PathChange::Unchanged),
        }
    }
}

fn suggested(update: &IntentUpdate) -> IntentResult<&str> {
    update.suggested_content.as_deref().ok_or_else(|| {
        IntentError::MalformedInput(format!("{} has no suggested content", update.action))
    })
}

fn commit_message(tag: &str, path: &str, reason: &str) -> String {
    if reason.is_empty() {
        format!("{tag} {path}")
    } else {
        format!("{tag} {path} - {reason}")
    }
}
