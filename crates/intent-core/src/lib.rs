//! Intent Layer Core Library
//!
//! Keeps directory-scoped `AGENTS.md` / `CLAUDE.md` files in step with
//! pull-request changes. Diffs flow one way through the decision engine
//! (hierarchy, coverage, aggregation, candidates); approved proposals flow
//! back through the checkbox-gated apply/revert orchestrator.

pub mod analysis;
pub mod config;
pub mod detect;
pub mod domain;
pub mod hierarchy;
pub mod ignore_filter;
pub mod marker;
pub mod proposal;
pub mod symlink;
pub mod sync;
pub mod telemetry;

pub use analysis::{
    aggregate_changes, analyze, decide_updates, direct_candidates, fetch_current_contents,
    new_node_candidates, parent_review_candidates, AnalysisReport, ChangeSummary,
    ChangedFileCoverage, CoverageKey, CoverageMap, CoverageSummary, NewNodeCandidate,
    NodeUpdateCandidate, ParentReviewCandidate, UpdateDecision, LOCALIZED_CHANGES_REASON,
};

pub use config::{DebounceConfig, IntentConfig, ParentReviewThresholds};

pub use detect::{detect_from_tree, detect_local, detect_remote, TreeScan};

pub use domain::{
    ChangeStatus, DiffEntry, ErrorClass, FileSelection, IntentError, IntentFile, IntentFileKind,
    IntentResult,
};

pub use hierarchy::{resolve_coverage, IntentHierarchy, IntentNode, NodeId};

pub use ignore_filter::{IgnoreFilter, IgnoreMatcher};

pub use marker::{
    checkbox_state, decode_marker, encode_marker, parse_proposal_comment, render_proposal_comment,
    replace_marker, set_checkbox, set_status, CheckboxState, CommentStatus, MarkerData,
};

pub use proposal::{parse_proposals, IntentUpdate, ParsedProposals, RejectedProposal, UpdateAction};

pub use symlink::{
    ensure_symlinks_valid, resolve_symlinks, validate_symlinks, SymlinkConflict,
    SymlinkRelationship, SymlinkValidation,
};

pub use sync::{
    publish_proposals, ApplyOptions, ApplyResult, BatchMode, BatchReport, CheckboxEvent,
    CheckboxOutcome, RevertResult, SkipReason, SyncOrchestrator,
};

pub use telemetry::init_tracing;

/// Intent Layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
