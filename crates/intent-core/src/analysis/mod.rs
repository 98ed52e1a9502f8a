//! Diff analysis: coverage aggregation and update-candidate decisions.
//!
//! Data flows one way: diff entries are mapped to covering nodes
//! ([`aggregate_changes`]), then turned into direct, parent-review and
//! new-node candidates ([`decide_updates`]).

pub mod aggregate;
pub mod candidates;
pub mod new_nodes;
pub mod report;

pub use aggregate::{
    aggregate_changes, ChangedFileCoverage, CoverageKey, CoverageMap, CoverageSummary,
};
pub use candidates::{
    direct_candidates, parent_review_candidates, ChangeSummary, NodeUpdateCandidate,
    ParentReviewCandidate, LOCALIZED_CHANGES_REASON,
};
pub use new_nodes::{new_node_candidates, NewNodeCandidate};
pub use report::{analyze, decide_updates, fetch_current_contents, AnalysisReport, UpdateDecision};
