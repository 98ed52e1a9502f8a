//! Integration tests for the comment protocol, symlink validation and publishing.

use intent_core::marker::set_checkbox;
use intent_core::{
    decode_marker, encode_marker, ensure_symlinks_valid, publish_proposals, replace_marker,
    validate_symlinks, IntentConfig, IntentError, IntentFile, IntentUpdate, MarkerData,
    UpdateAction,
};
use intent_hosting::fakes::MemoryHosting;

// ── Marker format ──

#[test]
fn marker_round_trips_awkward_paths() {
    let paths = [
        "AGENTS.md",
        "docs/with space/AGENTS.md",
        "weird/100%/AGENTS.md",
        "eq=dir/a==b/AGENTS.md",
        "unicode/ünï/AGENTS.md",
        "trailing space /AGENTS.md",
    ];
    for path in paths {
        for applied in [None, Some("0123abcd".to_string())] {
            let data = MarkerData::new(path, "f00d").with_applied_commit(applied);
            assert_eq!(decode_marker(&encode_marker(&data)).as_ref(), Some(&data), "{path}");
        }
    }
}

#[test]
fn legacy_marker_without_other_node_still_decodes() {
    let body = "<!-- INTENT_LAYER node=src%2FAGENTS.md appliedCommit=abc headSha=def -->\n\
                ### Intent Layer: update `src/AGENTS.md`\n";
    let data = decode_marker(body).unwrap();
    assert_eq!(data.node_path, "src/AGENTS.md");
    assert_eq!(data.applied_commit.as_deref(), Some("abc"));
    assert_eq!(data.head_sha, "def");
}

#[test]
fn replacing_the_marker_preserves_the_checkbox() {
    let body = format!(
        "{}\ntext\n- [ ] Apply this change\n",
        encode_marker(&MarkerData::new("AGENTS.md", "h"))
    );
    let checked = set_checkbox(&body, true);
    let applied = MarkerData::new("AGENTS.md", "h").with_applied_commit(Some("c1".into()));
    let replaced = replace_marker(&checked, &applied);
    assert!(replaced.contains("- [x] Apply this change"));
    assert_eq!(decode_marker(&replaced), Some(applied));
}

// ── Symlink validation ──

#[test]
fn independent_pair_in_symlink_mode_is_invalid() {
    let files: Vec<IntentFile> = ["AGENTS.md", "CLAUDE.md", "src/AGENTS.md"]
        .into_iter()
        .filter_map(IntentFile::new)
        .collect();

    let result = validate_symlinks(&files, true);
    assert!(!result.valid);
    assert_eq!(result.conflicting_directories(), vec![String::new()]);

    let err = ensure_symlinks_valid(&files, true).unwrap_err();
    assert!(matches!(err, IntentError::SymlinkConflict { ref directories } if directories.len() == 1));
}

#[test]
fn every_conflicting_directory_is_reported() {
    let files: Vec<IntentFile> = [
        "a/AGENTS.md",
        "a/CLAUDE.md",
        "b/AGENTS.md",
        "b/CLAUDE.md",
        "c/AGENTS.md",
    ]
    .into_iter()
    .filter_map(IntentFile::new)
    .collect();
    let err = ensure_symlinks_valid(&files, true).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains('a') && msg.contains('b'));
    match err {
        IntentError::SymlinkConflict { directories } => assert_eq!(directories, vec!["a", "b"]),
        other => panic!("unexpected error: {other}"),
    }
}

// ── Publishing ──

fn create(path: &str, content: &str) -> IntentUpdate {
    IntentUpdate {
        node_path: path.into(),
        other_node_path: None,
        action: UpdateAction::Create,
        reason: "uncovered directory".into(),
        current_content: None,
        suggested_content: Some(content.into()),
    }
}

#[tokio::test]
async fn publishing_twice_updates_instead_of_duplicating() {
    let hosting = MemoryHosting::new();
    let config = IntentConfig::default();

    let first = publish_proposals(&hosting, 5, "head1", &[create("a/AGENTS.md", "# a\n")], &config)
        .await
        .unwrap();
    assert_eq!(first.created.len(), 1);

    let second =
        publish_proposals(&hosting, 5, "head1", &[create("a/AGENTS.md", "# a v2\n")], &config)
            .await
            .unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, first.created);
    assert_eq!(hosting.comment_count(5), 1);
    assert!(hosting.comment_body(first.created[0]).unwrap().contains("# a v2"));

    let new_head =
        publish_proposals(&hosting, 5, "head2", &[create("a/AGENTS.md", "# a\n")], &config)
            .await
            .unwrap();
    assert_eq!(new_head.created.len(), 1);
    assert_eq!(hosting.comment_count(5), 2);
}

#[tokio::test]
async fn applied_comments_are_left_alone() {
    let hosting = MemoryHosting::new();
    let marker = MarkerData::new("a/AGENTS.md", "head1").with_applied_commit(Some("c1".into()));
    let id = hosting.seed_comment(5, &encode_marker(&marker));

    let report = publish_proposals(
        &hosting,
        5,
        "head1",
        &[create("a/AGENTS.md", "# other\n")],
        &IntentConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(hosting.comment_body(id).unwrap(), encode_marker(&marker));
}

#[tokio::test]
async fn invalid_proposals_are_not_published() {
    let hosting = MemoryHosting::new();
    let mut bad = create("a/AGENTS.md", "# a\n");
    bad.suggested_content = None;

    let report = publish_proposals(&hosting, 5, "h", &[bad, create("b/AGENTS.md", "# b\n")], &IntentConfig::default())
        .await
        .unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.skipped[0].0, "a/AGENTS.md");
}

#[tokio::test]
async fn checkbox_config_controls_rendering() {
    let hosting = MemoryHosting::new();
    let config = IntentConfig {
        checkbox: false,
        ..IntentConfig::default()
    };
    let report = publish_proposals(&hosting, 5, "h", &[create("a/AGENTS.md", "# a\n")], &config)
        .await
        .unwrap();
    let body = hosting.comment_body(report.created[0]).unwrap();
    assert!(!body.contains("Apply this change"));
}
