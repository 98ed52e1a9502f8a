//! Integration tests for the checkbox-gated apply/revert orchestrator.

use std::sync::Arc;

use intent_core::marker::{comment_status, decode_marker, set_checkbox};
use intent_core::sync::PathChange;
use intent_core::{
    checkbox_state, render_proposal_comment, ApplyOptions, BatchMode, CheckboxEvent,
    CheckboxOutcome, CheckboxState, CommentStatus, DebounceConfig, ErrorClass, IntentError,
    IntentFileKind, IntentUpdate, MarkerData, SkipReason, SyncOrchestrator, UpdateAction,
};
use intent_hosting::fakes::MemoryHosting;
use intent_hosting::HostingClient;

const PR: u64 = 7;

fn setup() -> (Arc<MemoryHosting>, SyncOrchestrator<Arc<MemoryHosting>>) {
    let hosting = Arc::new(MemoryHosting::new());
    let orch = SyncOrchestrator::new(hosting.clone(), ApplyOptions::new("main"));
    (hosting, orch)
}

fn create(path: &str, content: &str) -> IntentUpdate {
    IntentUpdate {
        node_path: path.into(),
        other_node_path: None,
        action: UpdateAction::Create,
        reason: "new package".into(),
        current_content: None,
        suggested_content: Some(content.into()),
    }
}

fn delete(path: &str, current: &str) -> IntentUpdate {
    IntentUpdate {
        node_path: path.into(),
        other_node_path: None,
        action: UpdateAction::Delete,
        reason: "package removed".into(),
        current_content: Some(current.into()),
        suggested_content: None,
    }
}

fn update(path: &str, current: &str, content: &str) -> IntentUpdate {
    IntentUpdate {
        node_path: path.into(),
        other_node_path: None,
        action: UpdateAction::Update,
        reason: "api changed".into(),
        current_content: Some(current.into()),
        suggested_content: Some(content.into()),
    }
}

/// Post a proposal comment and return its id plus the body with the box ticked.
fn post_checked(hosting: &MemoryHosting, update: &IntentUpdate) -> (u64, String) {
    let mut marker = MarkerData::new(&update.node_path, "head1");
    marker.other_node_path = update.other_node_path.clone();
    let body = set_checkbox(&render_proposal_comment(update, &marker, true), true);
    let id = hosting.seed_comment(PR, &body);
    (id, body)
}

/// Simulate the user unticking the box; returns the event.
fn untick(hosting: &MemoryHosting, id: u64) -> CheckboxEvent {
    toggle(hosting, id, false)
}

fn toggle(hosting: &MemoryHosting, id: u64, checked: bool) -> CheckboxEvent {
    let body = set_checkbox(&hosting.comment_body(id).unwrap(), checked);
    hosting.edit_comment(id, &body);
    CheckboxEvent { comment_id: id, body }
}

// ── Apply ──

#[tokio::test]
async fn checking_a_create_proposal_commits_and_records_the_sha() {
    let (hosting, orch) = setup();
    let (id, body) = post_checked(&hosting, &create("src/AGENTS.md", "# src\n"));

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();

    let CheckboxOutcome::Applied(result) = outcome else {
        panic!("expected apply");
    };
    assert_eq!(hosting.file("main", "src/AGENTS.md").as_deref(), Some("# src\n"));
    assert_eq!(hosting.head("main").as_deref(), Some(result.commit_sha.as_str()));

    let stored = hosting.comment_body(id).unwrap();
    let marker = decode_marker(&stored).unwrap();
    assert_eq!(marker.applied_commit.as_deref(), Some(result.commit_sha.as_str()));
    assert_eq!(
        comment_status(&stored),
        Some(CommentStatus::Committed {
            sha: result.commit_sha.clone()
        })
    );
    assert_eq!(checkbox_state(&stored), CheckboxState::Checked);
}

#[tokio::test]
async fn create_on_existing_file_is_a_conflict_naming_the_path() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "src/AGENTS.md", "# existing\n");

    let err = orch
        .apply_update(&create("src/AGENTS.md", "# new\n"))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(err.to_string().contains("src/AGENTS.md"));
    assert_eq!(hosting.file("main", "src/AGENTS.md").as_deref(), Some("# existing\n"));
    assert_eq!(hosting.write_count(), 0);
}

#[tokio::test]
async fn dual_management_writes_identical_content_to_both_files() {
    let (hosting, orch) = setup();
    let mut u = create("AGENTS.md", "# root\n");
    u.other_node_path = Some("CLAUDE.md".into());

    let result = orch.apply_update(&u).await.unwrap();
    assert_eq!(hosting.file("main", "AGENTS.md").as_deref(), Some("# root\n"));
    assert_eq!(hosting.file("main", "CLAUDE.md").as_deref(), Some("# root\n"));
    let secondary = result.secondary.unwrap();
    assert!(secondary.is_ok());
    assert_ne!(
        secondary.change.as_ref().and_then(PathChange::commit_sha),
        Some(result.commit_sha.as_str())
    );
}

#[tokio::test]
async fn symlink_mode_writes_only_the_source() {
    let hosting = Arc::new(MemoryHosting::new());
    hosting.seed_file("main", "CLAUDE.md", "# old\n");
    hosting.seed_symlink("main", "AGENTS.md", "CLAUDE.md");
    let mut options = ApplyOptions::new("main");
    options.symlink = true;
    options.symlink_source = IntentFileKind::Claude;
    let orch = SyncOrchestrator::new(hosting.clone(), options);

    let mut u = update("AGENTS.md", "# old\n", "# new\n");
    u.other_node_path = Some("CLAUDE.md".into());
    let result = orch.apply_update(&u).await.unwrap();

    assert!(result.secondary.is_none());
    assert_eq!(hosting.file("main", "CLAUDE.md").as_deref(), Some("# new\n"));
    // still a symlink, so not visible as a regular file
    assert_eq!(hosting.file("main", "AGENTS.md"), None);
    assert_eq!(hosting.write_count(), 1);
}

#[tokio::test]
async fn symlink_mode_never_rewrites_the_link_file() {
    let hosting = Arc::new(MemoryHosting::new());
    hosting.seed_file("main", "svc/CLAUDE.md", "# old\n");
    hosting.seed_symlink("main", "svc/AGENTS.md", "CLAUDE.md");
    let mut options = ApplyOptions::new("main");
    options.symlink = true;
    options.symlink_source = IntentFileKind::Claude;
    let orch = SyncOrchestrator::new(hosting.clone(), options);

    // no otherNode: the source must still be derived from the directory
    orch.apply_update(&update("svc/AGENTS.md", "# old\n", "# new\n"))
        .await
        .unwrap();

    assert_eq!(hosting.file("main", "svc/CLAUDE.md").as_deref(), Some("# new\n"));
    let link = hosting.get_content("svc/AGENTS.md", "main").await.unwrap().unwrap();
    assert_eq!(link.symlink_target.as_deref(), Some("CLAUDE.md"));
}

#[tokio::test]
async fn stale_write_surfaces_a_retryable_conflict() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "AGENTS.md", "# a\n");
    let (id, body) = post_checked(&hosting, &update("AGENTS.md", "# a\n", "# b\n"));
    hosting.race_next_read("main", "AGENTS.md", "# theirs\n");

    let err = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body: body.clone() })
        .await
        .unwrap_err();

    assert!(matches!(err, IntentError::Conflict { ref path, .. } if path == "AGENTS.md"));
    assert!(err.is_retryable());
    assert_eq!(hosting.file("main", "AGENTS.md").as_deref(), Some("# theirs\n"));
    assert_eq!(hosting.comment_body(id).as_deref(), Some(body.as_str()));
}

#[tokio::test]
async fn protocol_like_content_survives_apply_revert_reapply() {
    let (hosting, orch) = setup();
    let content = "# pkg\n\n**Status:** experimental\n\n- [ ] Apply this change\n";
    let (id, body) = post_checked(&hosting, &create("pkg/AGENTS.md", content));

    orch.handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert_eq!(hosting.file("main", "pkg/AGENTS.md").as_deref(), Some(content));
    let stored = hosting.comment_body(id).unwrap();
    assert!(stored.contains("**Status:** experimental\n"));
    assert!(matches!(comment_status(&stored), Some(CommentStatus::Committed { .. })));

    let outcome = orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();
    assert!(matches!(outcome, CheckboxOutcome::Reverted(_)));
    assert_eq!(hosting.file("main", "pkg/AGENTS.md"), None);

    let outcome = orch
        .handle_checkbox_event(&toggle(&hosting, id, true))
        .await
        .unwrap();
    assert!(matches!(outcome, CheckboxOutcome::Applied(_)));
    assert_eq!(hosting.file("main", "pkg/AGENTS.md").as_deref(), Some(content));
}

// ── Revert ──

#[tokio::test]
async fn unchecking_an_applied_delete_restores_the_file() {
    let (hosting, orch) = setup();
    let original = "# docs\n\nKept verbatim.\n";
    hosting.seed_file("main", "docs/AGENTS.md", original);
    let (id, body) = post_checked(&hosting, &delete("docs/AGENTS.md", original));

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert!(matches!(outcome, CheckboxOutcome::Applied(_)));
    assert_eq!(hosting.file("main", "docs/AGENTS.md"), None);

    let outcome = orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();
    let CheckboxOutcome::Reverted(result) = outcome else {
        panic!("expected revert");
    };
    assert!(matches!(result.primary, PathChange::Written { .. }));
    assert_eq!(hosting.file("main", "docs/AGENTS.md").as_deref(), Some(original));
}

#[tokio::test]
async fn unchecking_a_created_node_deletes_it() {
    let (hosting, orch) = setup();
    let (id, body) = post_checked(&hosting, &create("pkg/AGENTS.md", "# pkg\n"));
    orch.handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();

    let outcome = orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();

    let CheckboxOutcome::Reverted(result) = outcome else {
        panic!("expected revert");
    };
    assert!(matches!(result.primary, PathChange::Deleted { .. }));
    assert_eq!(hosting.file("main", "pkg/AGENTS.md"), None);

    let stored = hosting.comment_body(id).unwrap();
    assert_eq!(decode_marker(&stored).unwrap().applied_commit, None);
    assert_eq!(comment_status(&stored), Some(CommentStatus::Reverted));
}

#[tokio::test]
async fn unchecking_an_update_restores_exact_prior_content() {
    let (hosting, orch) = setup();
    let original = "# api\n\nOriginal  text with  spacing.\n";
    hosting.seed_file("main", "api/AGENTS.md", original);
    let (id, body) = post_checked(&hosting, &update("api/AGENTS.md", original, "# api v2\n"));

    orch.handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert_eq!(hosting.file("main", "api/AGENTS.md").as_deref(), Some("# api v2\n"));

    orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();
    assert_eq!(hosting.file("main", "api/AGENTS.md").as_deref(), Some(original));
}

#[tokio::test]
async fn secondary_revert_failure_keeps_primary_revert() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "AGENTS.md", "# a\n");
    hosting.seed_file("main", "CLAUDE.md", "# a\n");
    let mut u = update("AGENTS.md", "# a\n", "# b\n");
    u.other_node_path = Some("CLAUDE.md".into());
    let (id, body) = post_checked(&hosting, &u);
    orch.handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();

    hosting.fail_writes_to("CLAUDE.md");
    let outcome = orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();

    let CheckboxOutcome::Reverted(result) = outcome else {
        panic!("expected revert");
    };
    assert_eq!(hosting.file("main", "AGENTS.md").as_deref(), Some("# a\n"));
    assert_eq!(hosting.file("main", "CLAUDE.md").as_deref(), Some("# b\n"));
    let secondary = result.secondary.unwrap();
    assert!(!secondary.is_ok());
    assert!(secondary.error.unwrap().contains("CLAUDE.md"));
}

#[tokio::test]
async fn vanished_target_resolves_the_proposal() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "AGENTS.md", "# a\n");
    let (id, body) = post_checked(&hosting, &update("AGENTS.md", "# a\n", "# b\n"));
    orch.handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();

    hosting.remove_file("main", "AGENTS.md");
    let outcome = orch.handle_checkbox_event(&untick(&hosting, id)).await.unwrap();

    assert!(matches!(outcome, CheckboxOutcome::Resolved { ref node_path, .. } if node_path == "AGENTS.md"));
    let stored = hosting.comment_body(id).unwrap();
    assert_eq!(checkbox_state(&stored), CheckboxState::Absent);
    assert!(matches!(comment_status(&stored), Some(CommentStatus::Resolved { .. })));
}

#[tokio::test]
async fn update_of_missing_file_resolves_on_apply() {
    let (hosting, orch) = setup();
    let (id, body) = post_checked(&hosting, &update("gone/AGENTS.md", "# x\n", "# y\n"));

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert!(matches!(outcome, CheckboxOutcome::Resolved { .. }));
    assert_eq!(hosting.file("main", "gone/AGENTS.md"), None);
}

// ── No-ops and debounce ──

#[tokio::test]
async fn unchecked_without_applied_commit_makes_no_network_call() {
    let (hosting, orch) = setup();
    let marker = MarkerData::new("AGENTS.md", "head1");
    let body = render_proposal_comment(&create("AGENTS.md", "# a\n"), &marker, true);

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: 99, body })
        .await
        .unwrap();
    assert_eq!(outcome, CheckboxOutcome::NoOp);
    assert_eq!(hosting.call_count(), 0);
}

#[tokio::test]
async fn checked_and_already_applied_is_a_no_op() {
    let (hosting, orch) = setup();
    let marker = MarkerData::new("AGENTS.md", "head1").with_applied_commit(Some("abc".into()));
    let body = set_checkbox(
        &render_proposal_comment(&create("AGENTS.md", "# a\n"), &marker, true),
        true,
    );

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: 1, body })
        .await
        .unwrap();
    assert_eq!(outcome, CheckboxOutcome::NoOp);
    assert_eq!(hosting.call_count(), 0);
}

#[tokio::test]
async fn missing_marker_or_checkbox_is_skipped() {
    let (hosting, orch) = setup();
    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent {
            comment_id: 1,
            body: "- [x] Apply this change".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckboxOutcome::Skipped {
            reason: SkipReason::NoMarker
        }
    );

    let marker = MarkerData::new("AGENTS.md", "head1");
    let body = render_proposal_comment(&create("AGENTS.md", "# a\n"), &marker, false);
    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: 1, body })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckboxOutcome::Skipped {
            reason: SkipReason::NoCheckbox
        }
    );
    assert_eq!(hosting.call_count(), 0);
}

#[tokio::test]
async fn superseded_event_is_skipped_as_unstable() {
    let (hosting, orch) = setup();
    let (id, body) = post_checked(&hosting, &create("AGENTS.md", "# a\n"));
    // user unticks again before the first delivery is processed
    hosting.edit_comment(id, &set_checkbox(&body, false));

    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckboxOutcome::Skipped {
            reason: SkipReason::Unstable
        }
    );
    assert_eq!(hosting.write_count(), 0);
    assert_eq!(hosting.file("main", "AGENTS.md"), None);
}

#[tokio::test(start_paused = true)]
async fn settle_delay_waits_before_refetch() {
    let hosting = Arc::new(MemoryHosting::new());
    let mut options = ApplyOptions::new("main");
    options.debounce = DebounceConfig {
        enabled: true,
        settle_delay_ms: 2_000,
    };
    let orch = SyncOrchestrator::new(hosting.clone(), options);
    let (id, body) = post_checked(&hosting, &create("AGENTS.md", "# a\n"));

    let started = tokio::time::Instant::now();
    let outcome = orch
        .handle_checkbox_event(&CheckboxEvent { comment_id: id, body })
        .await
        .unwrap();
    assert!(matches!(outcome, CheckboxOutcome::Applied(_)));
    assert!(started.elapsed() >= std::time::Duration::from_millis(2_000));
}

// ── Batch ──

#[tokio::test]
async fn batch_isolates_failures_by_default() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "b/AGENTS.md", "# b\n");
    let updates = vec![
        create("a/AGENTS.md", "# a\n"),
        create("b/AGENTS.md", "# dup\n"),
        create("c/AGENTS.md", "# c\n"),
    ];

    let report = orch.apply_batch(&updates, BatchMode::ContinueOnError).await;
    assert_eq!(report.applied(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.not_attempted, 0);
    assert!(hosting.file("main", "c/AGENTS.md").is_some());
}

#[tokio::test]
async fn batch_can_stop_on_first_error() {
    let (hosting, orch) = setup();
    let mut bad = create("a/AGENTS.md", "# a\n");
    bad.suggested_content = None;
    let updates = vec![bad, create("b/AGENTS.md", "# b\n")];

    let report = orch.apply_batch(&updates, BatchMode::StopOnFirstError).await;
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.not_attempted, 1);
    assert_eq!(hosting.write_count(), 0);
}

#[tokio::test]
async fn conflicts_are_retryable_for_the_caller() {
    let (hosting, orch) = setup();
    hosting.seed_file("main", "AGENTS.md", "# a\n");
    let err = orch.apply_update(&create("AGENTS.md", "# b\n")).await.unwrap_err();
    assert!(matches!(err, IntentError::Conflict { ref path, .. } if path == "AGENTS.md"));
    assert!(err.is_retryable());
}
